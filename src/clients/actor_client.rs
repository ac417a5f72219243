use crate::framework::{FrameworkError, Page, ResourceClient, StoredRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for record-specific clients to inherit the read operations of the store.
///
/// Writes carry domain meaning (a taken id, a lost race) and stay on the
/// concrete client; reads only need their transport errors translated.
#[async_trait]
pub trait ActorClient<T: StoredRecord>: Send + Sync {
    /// The record-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic ResourceClient.
    fn inner(&self) -> &ResourceClient<T>;

    /// Map framework errors to the specific record error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch a record by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Records matching `filter` created at or after `since`, newest first.
    #[tracing::instrument(skip(self))]
    async fn query_recent(
        &self,
        filter: T::Filter,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner()
            .query_recent(filter, since)
            .await
            .map_err(Self::map_error)
    }

    /// One sorted page of the records matching `filter`, plus the match count.
    #[tracing::instrument(skip(self))]
    async fn list(
        &self,
        filter: T::Filter,
        sort: T::Sort,
        limit: usize,
        offset: usize,
    ) -> Result<Page<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner()
            .list(filter, sort, limit, offset)
            .await
            .map_err(Self::map_error)
    }
}
