//! Request multiplexing over a single connection
//!
//! Every outgoing request is tagged with a sequence id and parked here until
//! the response carrying that id arrives. The id counter and the table live
//! in one struct so allocation and registration happen under a single lock.

use std::collections::HashMap;

use fc_core::CommandError;
use fc_protocol::SequenceId;

/// Callback run once with the outcome of a request
pub type Completion = Box<dyn FnOnce(Result<Vec<String>, CommandError>) + Send>;

/// Outstanding requests indexed by sequence id
pub struct RequestTable {
    /// Id handed to the next request
    next_id: SequenceId,
    /// Requests awaiting a response
    pending: HashMap<SequenceId, Completion>,
}

impl RequestTable {
    /// Create an empty table starting at id 0
    pub fn new() -> Self {
        Self {
            next_id: SequenceId::new(0),
            pending: HashMap::new(),
        }
    }

    /// Start allocating at `id`
    #[cfg(test)]
    pub(crate) fn with_next_id(id: SequenceId) -> Self {
        Self {
            next_id: id,
            pending: HashMap::new(),
        }
    }

    /// Allocate an id, park `completion` under it and advance the counter
    ///
    /// Ids still in flight after a full wrap are skipped.
    pub fn register(&mut self, completion: Completion) -> SequenceId {
        let mut id = self.next_id;
        while self.pending.contains_key(&id) {
            id = id.next();
        }
        self.pending.insert(id, completion);
        self.next_id = id.next();
        id
    }

    /// Remove and return the completion parked under `id`
    pub fn take(&mut self, id: SequenceId) -> Option<Completion> {
        self.pending.remove(&id)
    }

    /// Remove every outstanding completion
    pub fn drain(&mut self) -> Vec<(SequenceId, Completion)> {
        self.pending.drain().collect()
    }

    /// Id the next request will try first
    pub fn next_id(&self) -> SequenceId {
        self.next_id
    }

    /// Whether a request with `id` is outstanding
    pub fn is_pending(&self, id: SequenceId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Number of outstanding requests
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for RequestTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    fn noop() -> Completion {
        Box::new(|_| {})
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut table = RequestTable::new();
        assert_eq!(table.register(noop()), SequenceId::new(0));
        assert_eq!(table.register(noop()), SequenceId::new(1));
        assert_eq!(table.next_id(), SequenceId::new(2));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_wraparound_to_zero() {
        let mut table = RequestTable::with_next_id(SequenceId::MAX);
        let last = table.register(noop());
        assert_eq!(last, SequenceId::MAX);
        assert_eq!(table.next_id(), SequenceId::new(0));

        table.take(last);
        assert_eq!(table.register(noop()), SequenceId::new(0));
    }

    #[test]
    fn test_skips_ids_in_flight() {
        let mut table = RequestTable::new();
        let stuck = table.register(noop());
        assert_eq!(stuck, SequenceId::new(0));

        // Simulate a full wrap with request 0 still outstanding
        table.next_id = SequenceId::new(0);
        let id = table.register(noop());
        assert_eq!(id, SequenceId::new(1));
        assert_eq!(table.next_id(), SequenceId::new(2));
        assert!(table.is_pending(stuck));
    }

    #[test]
    fn test_take_runs_once() {
        let mut table = RequestTable::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let id = table.register(Box::new(move |result| {
            *sink.lock() = Some(result);
        }));

        let completion = table.take(id).unwrap();
        assert!(table.take(id).is_none());
        completion(Ok(vec!["BF4".into()]));
        assert_eq!(*seen.lock(), Some(Ok(vec!["BF4".to_string()])));
    }

    #[test]
    fn test_drain_empties_table() {
        let mut table = RequestTable::new();
        let failures = Arc::new(Mutex::new(0));
        for _ in 0..3 {
            let failures = Arc::clone(&failures);
            table.register(Box::new(move |result| {
                assert_eq!(result, Err(CommandError::ConnectionClosed));
                *failures.lock() += 1;
            }));
        }

        for (_, completion) in table.drain() {
            completion(Err(CommandError::ConnectionClosed));
        }
        assert!(table.is_empty());
        assert_eq!(*failures.lock(), 3);
        // Counter keeps advancing across teardown
        assert_eq!(table.next_id(), SequenceId::new(3));
    }
}
