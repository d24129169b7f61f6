//! Session list derivation.

use crate::cache::SessionMap;
use intellisphere_protocol::SessionId;

/// One row of the session list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    /// 1-based display position; not stable across renders.
    pub number: usize,
    pub label: String,
    pub id: SessionId,
    pub created_at: i64,
    pub active: bool,
}

/// Sorted, labelled view over a domain's cached sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionListView {
    rows: Vec<SessionRow>,
}

impl SessionListView {
    /// Newest first, labelled `Session 1..N`; only the row equal to `current`
    /// is active.
    pub fn derive(sessions: &SessionMap, current: Option<&SessionId>) -> Self {
        let mut entries: Vec<_> = sessions.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at.cmp(&a.created_at).then_with(|| b_id.cmp(a_id))
        });
        let rows = entries
            .into_iter()
            .enumerate()
            .map(|(idx, (id, meta))| SessionRow {
                number: idx + 1,
                label: format!("Session {}", idx + 1),
                id: id.clone(),
                created_at: meta.created_at,
                active: current == Some(id),
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[SessionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row by its display number.
    pub fn by_number(&self, number: usize) -> Option<&SessionRow> {
        number
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
    }

    pub fn active(&self) -> Option<&SessionRow> {
        self.rows.iter().find(|row| row.active)
    }

    /// Index of the active row, if any.
    pub fn active_index(&self) -> Option<usize> {
        self.rows.iter().position(|row| row.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SessionMeta;
    use pretty_assertions::assert_eq;

    fn map(entries: &[(&str, i64)]) -> SessionMap {
        entries
            .iter()
            .map(|(id, at)| (SessionId::new(*id), SessionMeta::new(*at)))
            .collect()
    }

    #[test]
    fn labels_follow_sort_order() {
        let sessions = map(&[("a", 100), ("b", 300), ("c", 200)]);
        let view = SessionListView::derive(&sessions, Some(&SessionId::new("c")));
        let labels: Vec<_> = view
            .rows()
            .iter()
            .map(|row| (row.label.as_str(), row.id.as_str(), row.active))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Session 1", "b", false),
                ("Session 2", "c", true),
                ("Session 3", "a", false),
            ]
        );
        assert_eq!(view.active_index(), Some(1));
    }

    #[test]
    fn labels_renumber_after_removal() {
        let mut sessions = map(&[("a", 100), ("b", 300), ("c", 200)]);
        sessions.remove(&SessionId::new("b"));
        let view = SessionListView::derive(&sessions, None);
        let numbers: Vec<_> = view.rows().iter().map(|row| row.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(view.by_number(1).map(|row| row.id.as_str()), Some("c"));
        assert_eq!(view.by_number(0), None);
        assert_eq!(view.by_number(3), None);
        assert!(view.active().is_none());
    }

    #[test]
    fn dangling_pointer_marks_no_row() {
        let sessions = map(&[("a", 1)]);
        let view = SessionListView::derive(&sessions, Some(&SessionId::new("zzz")));
        assert_eq!(view.active_index(), None);
    }
}
