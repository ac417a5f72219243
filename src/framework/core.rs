//! # Record Store Actor
//!
//! This module defines the generic building blocks of the in-process record store.
//!
//! ## Key Types
//!
//! - [`StoredRecord`]: The trait that every persisted record type implements.
//! - [`ResourceActor`]: The actor that owns the records and applies requests one at a time.
//! - [`ResourceClient`]: The cloneable handle used to talk to the actor.
//! - [`FrameworkError`]: Transport failures and store-level outcomes (e.g., AlreadyExists).

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any record must implement to be kept by a [`ResourceActor`].
///
/// # Architecture Note
/// The store only knows how to key, version and scan records. Everything
/// domain-specific (what a status is, how a mutation changes a record, how a
/// filter matches) is delegated back to the record through associated types, so
/// the message loop is written once and the compiler keeps payloads apart.
///
/// `State` is the value checked by conditional writes. A conditional update
/// is applied only when the persisted state equals the caller's expectation.
pub trait StoredRecord: Clone + Send + Sync + 'static {
    /// The unique key of the record.
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// The value compared by [`ResourceClient::conditional_update`].
    type State: PartialEq + Clone + Send + Sync + Debug;

    /// A change applied by a successful conditional update.
    type Mutation: Send + Sync + Debug;

    /// Match criteria used by scans.
    type Filter: Send + Sync + Debug;

    /// Ordering used by [`ResourceClient::list`].
    type Sort: Send + Sync + Debug;

    fn id(&self) -> &Self::Id;

    fn state(&self) -> Self::State;

    /// Creation time, used by recency queries.
    fn created_at(&self) -> DateTime<Utc>;

    /// Apply a mutation. Called only after the state check succeeded.
    fn apply(&mut self, mutation: Self::Mutation);

    fn matches(&self, filter: &Self::Filter) -> bool;

    fn compare(&self, other: &Self, sort: &Self::Sort) -> Ordering;
}

// =============================================================================
// 2. THE GENERIC MESSAGES & ERRORS
// =============================================================================

/// Errors produced by the store or by the channel in front of it.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Store call timed out")]
    TimedOut,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Item already exists: {0}")]
    AlreadyExists(String),
    #[error("State mismatch for {id}: current state is {actual}")]
    StateMismatch { id: String, actual: String },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Type alias for the one-shot response channel used by the actor.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// One page of a [`ResourceRequest::List`] scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of records matching the filter, ignoring limit and offset.
    pub total: usize,
}

/// Requests understood by the store actor.
///
/// The variants are the complete store surface: atomic insert, keyed lookup,
/// compare-and-set on state, recency scan and paged listing.
#[derive(Debug)]
pub enum ResourceRequest<T: StoredRecord> {
    InsertIfAbsent {
        record: T,
        respond_to: Response<()>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>>,
    },
    ConditionalUpdate {
        id: T::Id,
        expected: T::State,
        mutation: T::Mutation,
        respond_to: Response<T>,
    },
    QueryRecent {
        filter: T::Filter,
        since: DateTime<Utc>,
        respond_to: Response<Vec<T>>,
    },
    List {
        filter: T::Filter,
        sort: T::Sort,
        limit: usize,
        offset: usize,
        respond_to: Response<Page<T>>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// The actor that owns a collection of records.
///
/// **Concurrency Model**:
/// Requests are processed sequentially by a single task, so the existence
/// check in `InsertIfAbsent` and the state check in `ConditionalUpdate` happen
/// atomically with their writes. Two racing conditional updates on the same
/// record cannot both observe the expected state.
pub struct ResourceActor<T: StoredRecord> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
}

impl<T: StoredRecord> ResourceActor<T> {
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    /// Runs the actor's event loop, processing messages until every client is dropped.
    pub async fn run(mut self) {
        // Extract just the type name (e.g., "Order" instead of "order_intake::model::order::Order")
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::InsertIfAbsent { record, respond_to } => {
                    let id = record.id().clone();
                    // A caller that gave up must not find a half-finished write later.
                    if respond_to.is_closed() {
                        debug!(entity_type, %id, "Caller gone, insert skipped");
                        continue;
                    }
                    if self.store.contains_key(&id) {
                        debug!(entity_type, %id, "Insert rejected, id taken");
                        let _ = respond_to.send(Err(FrameworkError::AlreadyExists(id.to_string())));
                        continue;
                    }
                    self.store.insert(id.clone(), record);
                    info!(entity_type, %id, size = self.store.len(), "Inserted");
                    let _ = respond_to.send(Ok(()));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let found = item.is_some();
                    debug!(entity_type, %id, found, "Get");
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::ConditionalUpdate {
                    id,
                    expected,
                    mutation,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?expected, ?mutation, "ConditionalUpdate");
                    if respond_to.is_closed() {
                        debug!(entity_type, %id, "Caller gone, update skipped");
                        continue;
                    }
                    let Some(item) = self.store.get_mut(&id) else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                        continue;
                    };
                    let actual = item.state();
                    if actual != expected {
                        debug!(entity_type, %id, ?actual, ?expected, "State mismatch");
                        let _ = respond_to.send(Err(FrameworkError::StateMismatch {
                            id: id.to_string(),
                            actual: format!("{actual:?}"),
                        }));
                        continue;
                    }
                    item.apply(mutation);
                    info!(entity_type, %id, state = ?item.state(), "Updated");
                    let _ = respond_to.send(Ok(item.clone()));
                }
                ResourceRequest::QueryRecent {
                    filter,
                    since,
                    respond_to,
                } => {
                    let mut hits: Vec<T> = self
                        .store
                        .values()
                        .filter(|r| r.created_at() >= since && r.matches(&filter))
                        .cloned()
                        .collect();
                    hits.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
                    debug!(entity_type, ?filter, hits = hits.len(), "QueryRecent");
                    let _ = respond_to.send(Ok(hits));
                }
                ResourceRequest::List {
                    filter,
                    sort,
                    limit,
                    offset,
                    respond_to,
                } => {
                    let mut matching: Vec<&T> =
                        self.store.values().filter(|r| r.matches(&filter)).collect();
                    let total = matching.len();
                    matching.sort_by(|a, b| a.compare(b, &sort));
                    let items: Vec<T> = matching
                        .into_iter()
                        .skip(offset)
                        .take(limit)
                        .cloned()
                        .collect();
                    debug!(entity_type, ?filter, ?sort, total, count = items.len(), "List");
                    let _ = respond_to.send(Ok(Page { items, total }));
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// A type-safe client for a [`ResourceActor`].
///
/// Cheap to clone. When a timeout is configured, a call that has not been
/// answered in time fails with [`FrameworkError::TimedOut`] and its response
/// channel is dropped, which makes the actor skip the write if it is still queued.
#[derive(Clone)]
pub struct ResourceClient<T: StoredRecord> {
    sender: mpsc::Sender<ResourceRequest<T>>,
    timeout: Option<Duration>,
}

impl<T: StoredRecord> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self {
            sender,
            timeout: None,
        }
    }

    /// Returns a client whose calls abort after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn call<R>(
        &self,
        request: impl FnOnce(Response<R>) -> ResourceRequest<T>,
    ) -> Result<R, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        let exchange = async {
            self.sender
                .send(request(respond_to))
                .await
                .map_err(|_| FrameworkError::ActorClosed)?;
            response.await.map_err(|_| FrameworkError::ActorDropped)?
        };
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| FrameworkError::TimedOut)?,
            None => exchange.await,
        }
    }

    pub async fn insert_if_absent(&self, record: T) -> Result<(), FrameworkError> {
        self.call(|respond_to| ResourceRequest::InsertIfAbsent { record, respond_to })
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::Get { id, respond_to })
            .await
    }

    pub async fn conditional_update(
        &self,
        id: T::Id,
        expected: T::State,
        mutation: T::Mutation,
    ) -> Result<T, FrameworkError> {
        self.call(|respond_to| ResourceRequest::ConditionalUpdate {
            id,
            expected,
            mutation,
            respond_to,
        })
        .await
    }

    /// Records matching `filter` created at or after `since`, newest first.
    pub async fn query_recent(
        &self,
        filter: T::Filter,
        since: DateTime<Utc>,
    ) -> Result<Vec<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::QueryRecent {
            filter,
            since,
            respond_to,
        })
        .await
    }

    pub async fn list(
        &self,
        filter: T::Filter,
        sort: T::Sort,
        limit: usize,
        offset: usize,
    ) -> Result<Page<T>, FrameworkError> {
        self.call(|respond_to| ResourceRequest::List {
            filter,
            sort,
            limit,
            offset,
            respond_to,
        })
        .await
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- Domain Definition ---

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: u32,
        owner: String,
        open: bool,
        created_at: DateTime<Utc>,
    }

    #[derive(Debug)]
    enum TicketChange {
        Close,
    }

    #[derive(Debug, Default)]
    struct ByOwner(Option<String>);

    #[derive(Debug)]
    struct ById;

    impl StoredRecord for Ticket {
        type Id = u32;
        type State = bool;
        type Mutation = TicketChange;
        type Filter = ByOwner;
        type Sort = ById;

        fn id(&self) -> &u32 {
            &self.id
        }

        fn state(&self) -> bool {
            self.open
        }

        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }

        fn apply(&mut self, mutation: TicketChange) {
            match mutation {
                TicketChange::Close => self.open = false,
            }
        }

        fn matches(&self, filter: &ByOwner) -> bool {
            filter.0.as_ref().map_or(true, |owner| owner == &self.owner)
        }

        fn compare(&self, other: &Self, _sort: &ById) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    fn ticket(id: u32, owner: &str) -> Ticket {
        Ticket {
            id,
            owner: owner.to_string(),
            open: true,
            created_at: Utc::now(),
        }
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_insert_if_absent_rejects_taken_id() {
        let (actor, client) = ResourceActor::new(10);
        tokio::spawn(actor.run());

        client.insert_if_absent(ticket(1, "ann")).await.unwrap();
        let again = client.insert_if_absent(ticket(1, "bob")).await;
        assert_eq!(again, Err(FrameworkError::AlreadyExists("1".into())));

        // First write wins
        let stored = client.get(1).await.unwrap().unwrap();
        assert_eq!(stored.owner, "ann");
    }

    #[tokio::test]
    async fn test_conditional_update_checks_state() {
        let (actor, client) = ResourceActor::new(10);
        tokio::spawn(actor.run());
        client.insert_if_absent(ticket(7, "ann")).await.unwrap();

        let closed = client
            .conditional_update(7, true, TicketChange::Close)
            .await
            .unwrap();
        assert!(!closed.open);

        let stale = client.conditional_update(7, true, TicketChange::Close).await;
        assert!(matches!(stale, Err(FrameworkError::StateMismatch { .. })));

        let missing = client.conditional_update(8, true, TicketChange::Close).await;
        assert_eq!(missing, Err(FrameworkError::NotFound("8".into())));
    }

    #[tokio::test]
    async fn test_list_pages_and_counts_total() {
        let (actor, client) = ResourceActor::new(64);
        tokio::spawn(actor.run());
        for id in 1..=25 {
            let owner = if id % 5 == 0 { "bob" } else { "ann" };
            client.insert_if_absent(ticket(id, owner)).await.unwrap();
        }

        let page = client
            .list(ByOwner(Some("ann".into())), ById, 5, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 20);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].id, 13);

        let past_end = client.list(ByOwner::default(), ById, 5, 100).await.unwrap();
        assert_eq!(past_end.total, 25);
        assert!(past_end.items.is_empty());
    }

    #[tokio::test]
    async fn test_query_recent_respects_since() {
        let (actor, client) = ResourceActor::new(10);
        tokio::spawn(actor.run());

        let mut old = ticket(1, "ann");
        old.created_at = Utc::now() - chrono::Duration::minutes(10);
        client.insert_if_absent(old).await.unwrap();
        client.insert_if_absent(ticket(2, "ann")).await.unwrap();

        let since = Utc::now() - chrono::Duration::minutes(1);
        let recent = client
            .query_recent(ByOwner(Some("ann".into())), since)
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 2);
    }

    #[tokio::test]
    async fn test_closed_actor_reports_error() {
        let (actor, client) = ResourceActor::<Ticket>::new(1);
        drop(actor);
        assert_eq!(client.get(1).await, Err(FrameworkError::ActorClosed));
    }

    #[tokio::test]
    async fn test_timeout_fails_call() {
        // Actor never runs, so the call can only time out
        let (_actor, client) = ResourceActor::<Ticket>::new(1);
        let client = client.with_timeout(Duration::from_millis(20));
        assert_eq!(client.get(1).await, Err(FrameworkError::TimedOut));
    }

    #[tokio::test]
    async fn test_abandoned_insert_is_skipped() {
        let (actor, client) = ResourceActor::<Ticket>::new(4);
        let hasty = client.clone().with_timeout(Duration::from_millis(20));
        assert_eq!(
            hasty.insert_if_absent(ticket(1, "ann")).await,
            Err(FrameworkError::TimedOut)
        );

        // The queued insert is still in the channel when the actor starts
        tokio::spawn(actor.run());
        assert_eq!(client.get(1).await, Ok(None));
    }
}
