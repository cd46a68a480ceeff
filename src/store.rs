use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Document identifier. `0` is the forest root sentinel (top level), never a
/// real document.
pub type DocId = u64;

pub const TOP_LEVEL: DocId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Published,
    Draft,
    Pending,
    Scheduled,
    Private,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Published => "published",
            DocStatus::Draft => "draft",
            DocStatus::Pending => "pending",
            DocStatus::Scheduled => "scheduled",
            DocStatus::Private => "private",
        }
    }

    /// Capitalized form for status badges.
    pub fn label(&self) -> &'static str {
        match self {
            DocStatus::Published => "Published",
            DocStatus::Draft => "Draft",
            DocStatus::Pending => "Pending",
            DocStatus::Scheduled => "Scheduled",
            DocStatus::Private => "Private",
        }
    }
}

fn default_kind() -> String {
    "page".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub status: DocStatus,
    /// Parent document id, 0 for top-level documents.
    #[serde(default)]
    pub parent: DocId,
    #[serde(default)]
    pub menu_order: i64,
    pub created: DateTime<Utc>,
    #[serde(default = "default_kind")]
    pub kind: String,
}

/// Read-only view over the document collection. The navigator never mutates
/// documents; creation and deletion belong to the surrounding system.
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: DocId) -> Option<Document>;

    /// Direct children of `parent`, in the store's native (possibly unstable)
    /// order. Callers that need a stable order must sort.
    fn children_of(&self, parent: DocId) -> Vec<DocId>;

    fn child_count(&self, parent: DocId) -> usize;

    /// Ancestor chain of `id`, root first, excluding `id` itself. Empty for
    /// top-level documents and unknown ids.
    fn ancestors_of(&self, id: DocId) -> Vec<DocId>;

    /// Free-text title search, capped at `limit` results.
    fn search_titles(&self, query: &str, limit: usize) -> Vec<DocId>;
}

/// In-memory store backing the service and the tests. Holds one document
/// kind; documents of other kinds are invisible to every query.
pub struct MemoryStore {
    docs: DashMap<DocId, Document>,
    kind: String,
}

impl MemoryStore {
    pub fn new(kind: impl Into<String>) -> Self {
        MemoryStore {
            docs: DashMap::new(),
            kind: kind.into(),
        }
    }

    pub fn insert(&self, doc: Document) {
        self.docs.insert(doc.id, doc);
    }

    pub fn remove(&self, id: DocId) -> Option<Document> {
        self.docs.remove(&id).map(|(_, doc)| doc)
    }

    pub fn load(&self, docs: Vec<Document>) {
        for doc in docs {
            self.insert(doc);
        }
    }

    pub fn from_json(kind: impl Into<String>, json: &str) -> anyhow::Result<Self> {
        let docs: Vec<Document> = serde_json::from_str(json)?;
        let store = MemoryStore::new(kind);
        store.load(docs);
        Ok(store)
    }

    fn visible(&self, doc: &Document) -> bool {
        doc.kind == self.kind
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: DocId) -> Option<Document> {
        self.docs
            .get(&id)
            .filter(|doc| self.visible(doc))
            .map(|doc| doc.value().clone())
    }

    fn children_of(&self, parent: DocId) -> Vec<DocId> {
        self.docs
            .iter()
            .filter(|entry| entry.parent == parent && self.visible(entry.value()))
            .map(|entry| entry.id)
            .collect()
    }

    fn child_count(&self, parent: DocId) -> usize {
        self.docs
            .iter()
            .filter(|entry| entry.parent == parent && self.visible(entry.value()))
            .count()
    }

    fn ancestors_of(&self, id: DocId) -> Vec<DocId> {
        let mut chain = Vec::new();
        let mut current = match self.get(id) {
            Some(doc) => doc.parent,
            None => return chain,
        };
        while current != TOP_LEVEL {
            let Some(doc) = self.get(current) else { break };
            chain.push(doc.id);
            // Guard against parent cycles introduced by bad seed data.
            if chain.len() > self.docs.len() {
                chain.clear();
                break;
            }
            current = doc.parent;
        }
        chain.reverse();
        chain
    }

    fn search_titles(&self, query: &str, limit: usize) -> Vec<DocId> {
        let needle = query.to_lowercase();
        let mut matches: Vec<(usize, String, DocId)> = self
            .docs
            .iter()
            .filter(|entry| self.visible(entry.value()))
            .filter_map(|entry| {
                let haystack = entry.title.to_lowercase();
                haystack
                    .find(&needle)
                    .map(|pos| (pos, haystack.clone(), entry.id))
            })
            .collect();
        // Earlier match position wins, then title, then id.
        matches.sort();
        matches.into_iter().take(limit).map(|(_, _, id)| id).collect()
    }
}
