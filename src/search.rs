use crate::render::LinkBuilder;
use crate::store::{DocId, DocumentStore};
use serde::Serialize;

/// Queries shorter than this never reach the store.
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct ParentMatch {
    pub id: DocId,
    pub title: String,
    pub url: String,
}

/// Resolves free text to candidate parents, capped at `limit`. The client
/// navigates to the first match only; there is deliberately no
/// disambiguation step.
pub fn find_parent(
    store: &dyn DocumentStore,
    links: &LinkBuilder,
    query: &str,
    limit: usize,
) -> Vec<ParentMatch> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }
    store
        .search_titles(query, limit)
        .into_iter()
        .filter_map(|id| store.get(id))
        .map(|doc| ParentMatch {
            id: doc.id,
            title: doc.title,
            url: links.level_url(doc.id),
        })
        .collect()
}
