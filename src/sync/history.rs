use std::collections::BTreeMap;

use log::debug;

/// Operations accepted by the sequencer, keyed by the revision they were
/// applied at. Only used to rebase submissions made against an older
/// revision, so old entries can be dropped once nothing refers to them.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionHistory<O> {
    operations: BTreeMap<u64, O>,
    retention: Option<usize>,
}

impl<O> RevisionHistory<O> {
    /// Keeps at most `retention` entries, or everything if `None`.
    #[must_use]
    pub fn new(retention: Option<usize>) -> Self {
        Self {
            operations: BTreeMap::new(),
            retention,
        }
    }

    pub fn record(&mut self, revision: u64, operation: O) {
        self.operations.insert(revision, operation);

        if let Some(retention) = self.retention {
            while self.operations.len() > retention {
                if let Some((revision, _)) = self.operations.pop_first() {
                    debug!("Dropping operation at revision {revision} from history");
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, revision: u64) -> Option<&O> { self.operations.get(&revision) }

    /// Drops every entry older than `revision`.
    pub fn prune_before(&mut self, revision: u64) {
        self.operations = self.operations.split_off(&revision);
    }

    /// The oldest revision still retained.
    #[must_use]
    pub fn oldest(&self) -> Option<u64> { self.operations.keys().next().copied() }

    #[must_use]
    pub fn len(&self) -> usize { self.operations.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.operations.is_empty() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_retention() {
        let mut history = RevisionHistory::new(Some(2));
        history.record(0, "a");
        history.record(1, "b");
        history.record(2, "c");

        assert_eq!(history.len(), 2);
        assert_eq!(history.get(0), None);
        assert_eq!(history.get(2), Some(&"c"));
        assert_eq!(history.oldest(), Some(1));
    }

    #[test]
    fn test_prune_before() {
        let mut history = RevisionHistory::new(None);
        for revision in 0..5 {
            history.record(revision, revision * 10);
        }

        history.prune_before(3);

        assert_eq!(history.oldest(), Some(3));
        assert_eq!(history.get(4), Some(&40));
        assert_eq!(history.len(), 2);
    }
}
