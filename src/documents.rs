use std::sync::Arc;

use dashmap::DashMap;

use crate::models::Document;

/// Extracted document text keyed by session id.
///
/// Shares the session id namespace but not the session lifecycle: removing a
/// session leaves its document in place.
pub trait DocumentStore: Send + Sync {
    /// Stores the document, replacing any previous one for this id.
    fn put(&self, session_id: &str, document: Document);

    fn get(&self, session_id: &str) -> Option<Arc<Document>>;

    fn delete(&self, session_id: &str) -> bool;
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, Arc<Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn put(&self, session_id: &str, document: Document) {
        self.documents
            .insert(session_id.to_string(), Arc::new(document));
    }

    fn get(&self, session_id: &str) -> Option<Arc<Document>> {
        self.documents.get(session_id).map(|entry| entry.value().clone())
    }

    fn delete(&self, session_id: &str) -> bool {
        self.documents.remove(session_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn doc(filename: &str, text: &str) -> Document {
        Document {
            filename: filename.to_string(),
            text: text.to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn reupload_overwrites() {
        let store = MemoryDocumentStore::new();
        store.put("s1", doc("a.pdf", "first"));
        store.put("s1", doc("b.pdf", "second"));

        let stored = store.get("s1").unwrap();
        assert_eq!(stored.filename, "b.pdf");
        assert_eq!(stored.text, "second");
    }

    #[test]
    fn documents_are_isolated_per_session() {
        let store = MemoryDocumentStore::new();
        store.put("s1", doc("a.pdf", "alpha"));

        assert!(store.get("s2").is_none());
        assert_eq!(store.get("s1").unwrap().text, "alpha");
    }

    #[test]
    fn delete_reports_presence() {
        let store = MemoryDocumentStore::new();
        store.put("s1", doc("a.pdf", "alpha"));

        assert!(store.delete("s1"));
        assert!(!store.delete("s1"));
        assert!(store.get("s1").is_none());
    }
}
