use dashmap::DashMap;

use crate::models::Message;

/// Ordered conversation transcripts keyed by caller-supplied session id.
///
/// Transcripts are append-only; the only mutations besides `append` are
/// whole-session removals.
pub trait SessionStore: Send + Sync {
    /// Creates an empty transcript if none exists.
    fn ensure(&self, session_id: &str);

    /// Appends one message, creating the session if needed.
    fn append(&self, session_id: &str, message: Message);

    /// Appends only to an existing session. Returns `false` when it is gone.
    fn append_if_present(&self, session_id: &str, message: Message) -> bool;

    fn list(&self, session_id: &str) -> Option<Vec<Message>>;

    /// Returns `false` when the session did not exist.
    fn delete(&self, session_id: &str) -> bool;

    fn list_ids(&self) -> Vec<String>;

    /// Removes every session and returns how many were removed.
    fn clear_all(&self) -> usize;
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Vec<Message>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn ensure(&self, session_id: &str) {
        self.sessions.entry(session_id.to_string()).or_default();
    }

    fn append(&self, session_id: &str, message: Message) {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .push(message);
    }

    fn append_if_present(&self, session_id: &str, message: Message) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut messages) => {
                messages.push(message);
                true
            }
            None => false,
        }
    }

    fn list(&self, session_id: &str) -> Option<Vec<Message>> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    fn delete(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    fn list_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    fn clear_all(&self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn ensure_is_idempotent() {
        let store = MemorySessionStore::new();
        store.ensure("s1");
        store.append("s1", Message::user("hi"));
        store.ensure("s1");

        assert_eq!(store.list("s1").unwrap().len(), 1);
    }

    #[test]
    fn append_keeps_insertion_order_and_auto_creates() {
        let store = MemorySessionStore::new();
        store.append("s1", Message::user("one"));
        store.append("s1", Message::assistant("two"));
        store.append("s1", Message::user("three"));

        let messages = store.list("s1").unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn append_if_present_never_creates() {
        let store = MemorySessionStore::new();
        assert!(!store.append_if_present("s1", Message::assistant("late")));
        assert!(store.list("s1").is_none());

        store.ensure("s1");
        assert!(store.append_if_present("s1", Message::assistant("ok")));
        assert_eq!(store.list("s1").unwrap(), vec![Message::assistant("ok")]);
    }

    #[test]
    fn unknown_session_lists_nothing() {
        let store = MemorySessionStore::new();
        assert!(store.list("missing").is_none());
        assert!(!store.delete("missing"));
    }

    #[test]
    fn delete_removes_from_listing() {
        let store = MemorySessionStore::new();
        store.ensure("a");
        store.ensure("b");

        assert!(store.delete("a"));
        assert!(store.list("a").is_none());
        assert_eq!(store.list_ids(), vec!["b".to_string()]);
    }

    #[test]
    fn clear_all_reports_count() {
        let store = MemorySessionStore::new();
        store.ensure("a");
        store.ensure("b");
        store.ensure("c");

        assert_eq!(store.clear_all(), 3);
        assert!(store.list_ids().is_empty());
        assert_eq!(store.clear_all(), 0);
    }
}
