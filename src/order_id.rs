//! Human-readable order identifiers, `ORD-<year>-<sequence>`.
//!
//! The generator only proposes candidates. Uniqueness comes from the store:
//! the manager confirms each candidate with an insert-if-absent. When a
//! candidate is taken, the counter is behind the store (another process
//! shares it, or this one restarted), and the manager moves it past the
//! highest stored sequence with [`OrderIdGenerator::advance_past`].
//!
//! A sequence is consumed when it is handed out, whatever happens to the write
//! that used it. A create that fails in the store leaves a gap; the number is
//! never reissued, so an id seen once in a log or a response can only ever
//! name one order.

use crate::config::SequenceReset;
use crate::model::OrderId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Per-scope sequence counters.
///
/// Each scope (a year under [`SequenceReset::PerYear`], one shared scope under
/// [`SequenceReset::Never`]) owns its own atomic, so issuing IDs for different
/// years never contends beyond the brief map lookup.
#[derive(Debug)]
pub struct OrderIdGenerator {
    reset: SequenceReset,
    scopes: Mutex<HashMap<i32, Arc<AtomicU64>>>,
}

impl OrderIdGenerator {
    pub fn new(reset: SequenceReset) -> Self {
        Self {
            reset,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// The next candidate for `year`. Strictly increasing within a scope.
    pub fn next(&self, year: i32) -> OrderId {
        let sequence = self.counter(year).fetch_add(1, Ordering::SeqCst) + 1;
        OrderId::new(year, sequence)
    }

    /// Last sequence handed out for `year`'s scope.
    pub fn current(&self, year: i32) -> u64 {
        self.counter(year).load(Ordering::SeqCst)
    }

    /// Moves `year`'s scope so the next candidate is above `sequence`.
    /// Never moves a counter backwards.
    pub fn advance_past(&self, year: i32, sequence: u64) {
        self.counter(year).fetch_max(sequence, Ordering::SeqCst);
    }

    /// The id year that bounds `year`'s scope in the store, `None` when the
    /// sequence spans every year.
    pub fn scope_year(&self, year: i32) -> Option<i32> {
        match self.reset {
            SequenceReset::PerYear => Some(year),
            SequenceReset::Never => None,
        }
    }

    fn counter(&self, year: i32) -> Arc<AtomicU64> {
        let scope = self.scope_year(year).unwrap_or(0);
        // A panic while holding the lock cannot leave the map inconsistent
        let mut scopes = self.scopes.lock().unwrap_or_else(|e| e.into_inner());
        scopes.entry(scope).or_default().clone()
    }
}

impl Default for OrderIdGenerator {
    fn default() -> Self {
        Self::new(SequenceReset::PerYear)
    }
}
