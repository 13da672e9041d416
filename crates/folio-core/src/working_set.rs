use std::fmt;

use folio_types::{sort_newest_first, Namespace, ProjectId, ProjectRecord};

/// Load state of the working set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded yet, or the session changed since the last load.
    Empty,
    Loading,
    Loaded,
    LoadFailed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::LoadFailed => "load-failed",
        };
        f.write_str(s)
    }
}

/// The in-memory projection of one namespace's metadata collection.
///
/// Records are kept newest first. The set remembers which namespace it was
/// loaded for so a stale projection is never served after a session change.
#[derive(Debug)]
pub(crate) struct WorkingSet {
    state: LoadState,
    namespace: Option<Namespace>,
    records: Vec<ProjectRecord>,
}

impl WorkingSet {
    pub(crate) fn new() -> Self {
        Self {
            state: LoadState::Empty,
            namespace: None,
            records: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> LoadState {
        self.state
    }

    pub(crate) fn reset(&mut self) {
        self.state = LoadState::Empty;
        self.namespace = None;
        self.records.clear();
    }

    pub(crate) fn begin_load(&mut self, namespace: Namespace) {
        self.state = LoadState::Loading;
        self.namespace = Some(namespace);
        self.records.clear();
    }

    pub(crate) fn finish_load(&mut self, mut records: Vec<ProjectRecord>) {
        sort_newest_first(&mut records);
        self.records = records;
        self.state = LoadState::Loaded;
    }

    pub(crate) fn fail_load(&mut self) {
        self.records.clear();
        self.state = LoadState::LoadFailed;
    }

    pub(crate) fn is_loaded_for(&self, namespace: &Namespace) -> bool {
        self.state == LoadState::Loaded && self.namespace.as_ref() == Some(namespace)
    }

    /// Records, if the set is loaded for `namespace`.
    pub(crate) fn records_for(&self, namespace: &Namespace) -> Option<&[ProjectRecord]> {
        self.is_loaded_for(namespace).then_some(self.records.as_slice())
    }

    pub(crate) fn contains(&self, id: &ProjectId) -> bool {
        self.records.iter().any(|r| &r.id == id)
    }

    /// The collection that would result from adding `record`.
    pub(crate) fn with_record(&self, record: ProjectRecord) -> Vec<ProjectRecord> {
        let mut next = self.records.clone();
        next.push(record);
        sort_newest_first(&mut next);
        next
    }

    /// The collection that would result from removing `id`, or `None` if no
    /// record has that id.
    pub(crate) fn without(&self, id: &ProjectId) -> Option<Vec<ProjectRecord>> {
        if !self.contains(id) {
            return None;
        }
        Some(self.records.iter().filter(|r| &r.id != id).cloned().collect())
    }

    /// Replace the records with a collection that was just persisted for
    /// `namespace`. Returns `false` and changes nothing if the set has since
    /// moved to another namespace.
    pub(crate) fn commit(&mut self, namespace: &Namespace, records: Vec<ProjectRecord>) -> bool {
        if !self.is_loaded_for(namespace) {
            return false;
        }
        self.records = records;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::{Timestamp, NO_MEDIA};

    fn record(id: &str, ts: u64) -> ProjectRecord {
        ProjectRecord {
            id: ProjectId::new(id).unwrap(),
            title: id.to_uppercase(),
            description: String::new(),
            media_type: NO_MEDIA.into(),
            created_at: Timestamp::from_millis(ts),
        }
    }

    fn loaded(records: Vec<ProjectRecord>) -> WorkingSet {
        let mut ws = WorkingSet::new();
        ws.begin_load(Namespace::Guest);
        ws.finish_load(records);
        ws
    }

    #[test]
    fn load_sorts_newest_first() {
        let ws = loaded(vec![record("a", 1), record("c", 3), record("b", 2)]);
        let ids: Vec<_> = ws.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        assert_eq!(ws.state(), LoadState::Loaded);
    }

    #[test]
    fn records_only_served_for_loaded_namespace() {
        let ws = loaded(vec![record("a", 1)]);
        assert_eq!(ws.records_for(&Namespace::Guest).map(<[_]>::len), Some(1));
        let other = Namespace::User(folio_types::UserId::new("u1").unwrap());
        assert!(ws.records_for(&other).is_none());
    }

    #[test]
    fn with_record_keeps_order() {
        let ws = loaded(vec![record("a", 1), record("b", 2)]);
        let next = ws.with_record(record("c", 3));
        assert_eq!(next[0].id.as_str(), "c");
        assert_eq!(next.len(), 3);
        // The set itself is untouched until commit.
        assert_eq!(ws.records.len(), 2);
    }

    #[test]
    fn without_absent_id_is_none() {
        let ws = loaded(vec![record("a", 1)]);
        assert!(ws.without(&ProjectId::new("zzz").unwrap()).is_none());
        assert_eq!(ws.without(&ProjectId::new("a").unwrap()), Some(vec![]));
    }

    #[test]
    fn commit_refused_after_reset() {
        let mut ws = loaded(vec![record("a", 1)]);
        let next = ws.with_record(record("b", 2));
        ws.reset();
        assert!(!ws.commit(&Namespace::Guest, next));
        assert_eq!(ws.state(), LoadState::Empty);
        assert!(ws.records.is_empty());
    }

    #[test]
    fn failed_load_is_empty() {
        let mut ws = WorkingSet::new();
        ws.begin_load(Namespace::Guest);
        ws.fail_load();
        assert_eq!(ws.state(), LoadState::LoadFailed);
        assert!(ws.records_for(&Namespace::Guest).is_none());
    }
}
