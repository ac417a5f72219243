//! # Mock Store
//!
//! Utilities for testing store callers in isolation.
//!
//! [`MockClient`] hands out a real [`ResourceClient`] whose requests are answered
//! from a queue of scripted expectations instead of a running [`ResourceActor`](crate::framework::ResourceActor).
//! This is how failure paths (a store that refuses writes, a lost race) are
//! reproduced deterministically.

use crate::framework::{FrameworkError, Page, ResourceClient, ResourceRequest, StoredRecord};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted answer for one store request.
enum Expectation<T: StoredRecord> {
    Insert {
        response: Result<(), FrameworkError>,
    },
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    ConditionalUpdate {
        id: T::Id,
        response: Result<T, FrameworkError>,
    },
    QueryRecent {
        response: Result<Vec<T>, FrameworkError>,
    },
    List {
        response: Result<Page<T>, FrameworkError>,
    },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

/// A mock store with expectation tracking.
///
/// Expectations are consumed in order. A request that does not match the next
/// expectation panics the responder task, which the caller observes as
/// [`FrameworkError::ActorDropped`].
///
/// # Example
/// ```ignore
/// let mut mock = MockClient::<Order>::new();
/// mock.expect_query_recent().return_ok(vec![]);
/// mock.expect_insert().return_err(FrameworkError::Unavailable("disk full".into()));
///
/// let store = mock.client();
/// // Use store in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
pub struct MockClient<T: StoredRecord> {
    client: ResourceClient<T>,
    expectations: Expectations<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: StoredRecord> MockClient<T> {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let expectations_clone = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone
                    .lock()
                    .map(|mut exps| exps.pop_front())
                    .unwrap_or(None);

                match (request, expectation) {
                    (
                        ResourceRequest::InsertIfAbsent { respond_to, .. },
                        Some(Expectation::Insert { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (ResourceRequest::Get { id, respond_to }, Some(Expectation::Get { id: want, response })) => {
                        assert_eq!(id, want, "Get for unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::ConditionalUpdate { id, respond_to, .. },
                        Some(Expectation::ConditionalUpdate { id: want, response }),
                    ) => {
                        assert_eq!(id, want, "ConditionalUpdate for unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::QueryRecent { respond_to, .. },
                        Some(Expectation::QueryRecent { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (ResourceRequest::List { respond_to, .. }, Some(Expectation::List { response })) => {
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    pub fn expect_insert(&mut self) -> ExpectationBuilder<T, ()> {
        ExpectationBuilder::new(self.expectations.clone(), |response| {
            Expectation::Insert { response }
        })
    }

    pub fn expect_get(&mut self, id: T::Id) -> ExpectationBuilder<T, Option<T>> {
        ExpectationBuilder::new(self.expectations.clone(), move |response| {
            Expectation::Get { id, response }
        })
    }

    pub fn expect_conditional_update(&mut self, id: T::Id) -> ExpectationBuilder<T, T> {
        ExpectationBuilder::new(self.expectations.clone(), move |response| {
            Expectation::ConditionalUpdate { id, response }
        })
    }

    pub fn expect_query_recent(&mut self) -> ExpectationBuilder<T, Vec<T>> {
        ExpectationBuilder::new(self.expectations.clone(), |response| {
            Expectation::QueryRecent { response }
        })
    }

    pub fn expect_list(&mut self) -> ExpectationBuilder<T, Page<T>> {
        ExpectationBuilder::new(self.expectations.clone(), |response| {
            Expectation::List { response }
        })
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = self.expectations.lock().map(|exps| exps.len()).unwrap_or(0);
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

impl<T: StoredRecord> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Finishes an expectation with the response the mock should send.
pub struct ExpectationBuilder<T: StoredRecord, R> {
    expectations: Expectations<T>,
    make: Box<dyn FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send>,
}

impl<T: StoredRecord, R> ExpectationBuilder<T, R> {
    fn new(
        expectations: Expectations<T>,
        make: impl FnOnce(Result<R, FrameworkError>) -> Expectation<T> + Send + 'static,
    ) -> Self {
        Self {
            expectations,
            make: Box::new(make),
        }
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: R) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<R, FrameworkError>) {
        let expectation = (self.make)(response);
        if let Ok(mut exps) = self.expectations.lock() {
            exps.push_back(expectation);
        }
    }
}

/// Creates a client and the raw receiver behind it.
///
/// Use this when a test needs to inspect the request itself (its payload, or
/// whether the caller is still waiting) rather than only script the answer.
pub fn create_mock_client<T: StoredRecord>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Order, OrderId};

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Order>::new();
        let id = OrderId::new(2026, 1);

        mock.expect_get(id.clone()).return_ok(None);
        mock.expect_insert()
            .return_err(FrameworkError::Unavailable("disk full".into()));

        let client = mock.client();
        assert_eq!(client.get(id.clone()).await, Ok(None));

        let order = crate::model::order::tests::sample_order(id);
        let result = client.insert_if_absent(order).await;
        assert_eq!(result, Err(FrameworkError::Unavailable("disk full".into())));

        mock.verify();
    }

    #[tokio::test]
    async fn test_raw_receiver_sees_request() {
        let (client, mut receiver) = create_mock_client::<Order>(4);
        let id = OrderId::new(2026, 9);

        let task = {
            let id = id.clone();
            tokio::spawn(async move { client.get(id).await })
        };

        match receiver.recv().await {
            Some(ResourceRequest::Get { id: got, respond_to }) => {
                assert_eq!(got, id);
                respond_to.send(Ok(None)).unwrap();
            }
            other => panic!("Expected Get request, got {:?}", other.map(|_| ())),
        }
        assert_eq!(task.await.unwrap(), Ok(None));
    }
}
