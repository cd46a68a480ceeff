use crate::store::{DocId, DocStatus, Document, DocumentStore};
use serde::{Deserialize, Serialize};

/// Sort key for one level. Unrecognized input falls back to `Order`; a bad
/// sort field is never a user-visible error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Order,
    Title,
    Date,
}

impl SortField {
    pub fn parse(value: &str) -> Self {
        match value {
            "order" | "menu_order" => SortField::Order,
            "title" => SortField::Title,
            "date" => SortField::Date,
            _ => SortField::Order,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Order => "order",
            SortField::Title => "title",
            SortField::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "desc" => SortDir::Desc,
            _ => SortDir::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Limited(usize),
    /// Return the whole level as one page (used by child-expansion fetches).
    All,
}

/// Canonical, already-validated level query. Built once per request at the
/// entry point; every component downstream consumes it as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelQuery {
    pub parent: DocId,
    pub orderby: SortField,
    pub order: SortDir,
    pub page: usize,
    pub per_page: PageSize,
}

impl LevelQuery {
    /// Normalizes raw request input into a valid query: unknown sort fields
    /// and directions fall back to defaults, page and per_page are clamped
    /// to at least 1. Out-of-range pages are allowed; they produce an empty
    /// window later, not an error here.
    pub fn normalize(
        parent: DocId,
        orderby: Option<&str>,
        order: Option<&str>,
        page: Option<usize>,
        per_page: PageSize,
    ) -> Self {
        let per_page = match per_page {
            PageSize::Limited(n) => PageSize::Limited(n.max(1)),
            PageSize::All => PageSize::All,
        };
        LevelQuery {
            parent,
            orderby: SortField::parse(orderby.unwrap_or("order")),
            order: SortDir::parse(order.unwrap_or("asc")),
            page: page.unwrap_or(1).max(1),
            per_page,
        }
    }

    /// The same level with pagination removed, as used when expanding a node
    /// in place.
    pub fn unpaged(parent: DocId, orderby: SortField, order: SortDir) -> Self {
        LevelQuery {
            parent,
            orderby,
            order,
            page: 1,
            per_page: PageSize::All,
        }
    }
}

/// One document as it appears in a level listing. Child counts are resolved
/// here so rendering never goes back to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocId,
    pub title: String,
    pub status: DocStatus,
    pub child_count: usize,
    pub has_children: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelPage {
    pub items: Vec<DocumentSummary>,
    pub total_count: usize,
    pub page_count: usize,
    pub page: usize,
}

fn sort_key(doc: &Document, field: SortField) -> LevelSortKey {
    match field {
        SortField::Order => LevelSortKey::Order(doc.menu_order),
        SortField::Title => LevelSortKey::Title(doc.title.to_lowercase()),
        SortField::Date => LevelSortKey::Date(doc.created.timestamp_millis()),
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum LevelSortKey {
    Order(i64),
    Title(String),
    Date(i64),
}

/// Orders the direct children of `query.parent` deterministically: the sort
/// key with the requested direction, ties broken by ascending id. The store's
/// native iteration order never leaks through.
fn ordered_children(store: &dyn DocumentStore, query: &LevelQuery) -> Vec<Document> {
    let mut docs: Vec<Document> = store
        .children_of(query.parent)
        .into_iter()
        .filter_map(|id| store.get(id))
        .collect();
    docs.sort_by(|a, b| {
        let key = sort_key(a, query.orderby).cmp(&sort_key(b, query.orderby));
        let key = match query.order {
            SortDir::Asc => key,
            SortDir::Desc => key.reverse(),
        };
        key.then(a.id.cmp(&b.id))
    });
    docs
}

pub fn page_count(total: usize, per_page: PageSize) -> usize {
    match per_page {
        PageSize::Limited(n) => total.div_ceil(n).max(1),
        PageSize::All => 1,
    }
}

/// Computes one level: direct children of `query.parent` only (never
/// recursive), sorted deterministically, sliced to the requested page window.
/// Cost stays proportional to the fan-out of one node regardless of forest
/// depth or size.
pub fn compute_level(store: &dyn DocumentStore, query: &LevelQuery) -> LevelPage {
    let docs = ordered_children(store, query);
    let total_count = docs.len();
    let page_count = page_count(total_count, query.per_page);

    let window: Vec<Document> = match query.per_page {
        PageSize::Limited(n) => {
            let offset = (query.page - 1).saturating_mul(n);
            docs.into_iter().skip(offset).take(n).collect()
        }
        PageSize::All => docs,
    };

    let items = window
        .into_iter()
        .map(|doc| {
            let child_count = store.child_count(doc.id);
            DocumentSummary {
                id: doc.id,
                title: doc.title,
                status: doc.status,
                child_count,
                has_children: child_count > 0,
            }
        })
        .collect();

    LevelPage {
        items,
        total_count,
        page_count,
        page: query.page,
    }
}
