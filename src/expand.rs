use crate::level::{LevelQuery, SortDir, SortField, compute_level};
use crate::render::{LinkBuilder, NodeDescriptor, render_node};
use crate::store::{DocId, DocumentStore};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("forbidden")]
    Forbidden,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server error: {0}")]
    Server(String),
}

/// Source of a node's children. The service-backed implementation is
/// [`HttpChildFetcher`]; tests and in-process embedding use
/// [`LocalChildFetcher`].
pub trait ChildFetcher: Send + Sync {
    fn fetch_children(
        &self,
        parent: DocId,
        orderby: SortField,
        order: SortDir,
    ) -> impl Future<Output = Result<Vec<NodeDescriptor>, FetchError>> + Send;
}

#[derive(Debug, Clone, Default)]
enum LoadState {
    #[default]
    NotLoaded,
    Loading,
    Loaded(Vec<NodeDescriptor>),
}

/// Per-node expansion bookkeeping. Created when the node is first rendered
/// collapsed, discarded with the controller.
#[derive(Debug, Default)]
struct NodeState {
    has_children: bool,
    expanded: bool,
    load: LoadState,
    last_error: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Node is now expanded. `fetched` is true only for the first load;
    /// `children` may be 0 when the children vanished between render and
    /// expand, which renders as an empty marker rather than an error.
    Expanded { fetched: bool, children: usize },
    Collapsed,
    /// A fetch for this node is already in flight; the toggle is a no-op.
    InFlight,
    /// Fetch failed; node stays collapsed with an inline error, retryable.
    Failed(String),
    /// Leaf nodes carry no toggle affordance.
    NotToggleable,
}

/// Expand/collapse state machine for one browsing view. Sort is ambient for
/// the whole session, so it is fixed per controller; a sort change reloads
/// the view and builds a fresh controller. Fetches for different nodes run
/// independently; a node never has two fetches in flight.
pub struct TreeController<F: ChildFetcher> {
    fetcher: F,
    orderby: SortField,
    order: SortDir,
    nodes: DashMap<DocId, NodeState>,
}

impl<F: ChildFetcher> TreeController<F> {
    pub fn new(fetcher: F, orderby: SortField, order: SortDir) -> Self {
        TreeController {
            fetcher,
            orderby,
            order,
            nodes: DashMap::new(),
        }
    }

    /// Registers a freshly rendered (collapsed) node.
    pub fn note_rendered(&self, node: &NodeDescriptor) {
        self.nodes.entry(node.id).or_insert_with(|| NodeState {
            has_children: node.has_children,
            ..NodeState::default()
        });
    }

    pub fn is_expanded(&self, id: DocId) -> bool {
        self.nodes.get(&id).map(|n| n.expanded).unwrap_or(false)
    }

    /// Cached children, once loaded. Collapsing does not drop the cache.
    pub fn cached_children(&self, id: DocId) -> Option<Vec<NodeDescriptor>> {
        self.nodes.get(&id).and_then(|n| match &n.load {
            LoadState::Loaded(children) => Some(children.clone()),
            _ => None,
        })
    }

    pub fn last_error(&self, id: DocId) -> Option<String> {
        self.nodes.get(&id).and_then(|n| n.last_error.clone())
    }

    pub async fn toggle(&self, id: DocId) -> ToggleOutcome {
        // First phase under the map guard: decide what this toggle means.
        // The guard must not be held across the fetch await.
        enum Action {
            Fetch,
            Done(ToggleOutcome),
        }
        let action = {
            let Some(mut node) = self.nodes.get_mut(&id) else {
                return ToggleOutcome::NotToggleable;
            };
            if !node.has_children {
                Action::Done(ToggleOutcome::NotToggleable)
            } else if node.expanded {
                node.expanded = false;
                Action::Done(ToggleOutcome::Collapsed)
            } else {
                match &node.load {
                    LoadState::Loaded(children) => {
                        let count = children.len();
                        node.expanded = true;
                        Action::Done(ToggleOutcome::Expanded {
                            fetched: false,
                            children: count,
                        })
                    }
                    LoadState::Loading => Action::Done(ToggleOutcome::InFlight),
                    LoadState::NotLoaded => {
                        node.load = LoadState::Loading;
                        node.last_error = None;
                        Action::Fetch
                    }
                }
            }
        };
        match action {
            Action::Done(outcome) => outcome,
            Action::Fetch => {
                let result = self.fetcher.fetch_children(id, self.orderby, self.order).await;
                let Some(mut node) = self.nodes.get_mut(&id) else {
                    return ToggleOutcome::NotToggleable;
                };
                match result {
                    Ok(children) => {
                        let count = children.len();
                        node.load = LoadState::Loaded(children);
                        node.expanded = true;
                        ToggleOutcome::Expanded {
                            fetched: true,
                            children: count,
                        }
                    }
                    Err(err) => {
                        let message = err.to_string();
                        node.load = LoadState::NotLoaded;
                        node.expanded = false;
                        node.last_error = Some(message.clone());
                        ToggleOutcome::Failed(message)
                    }
                }
            }
        }
    }
}

/// Fetcher that queries a store in the same process, bypassing HTTP.
pub struct LocalChildFetcher {
    store: Arc<dyn DocumentStore>,
    links: LinkBuilder,
}

impl LocalChildFetcher {
    pub fn new(store: Arc<dyn DocumentStore>, links: LinkBuilder) -> Self {
        LocalChildFetcher { store, links }
    }
}

impl ChildFetcher for LocalChildFetcher {
    async fn fetch_children(
        &self,
        parent: DocId,
        orderby: SortField,
        order: SortDir,
    ) -> Result<Vec<NodeDescriptor>, FetchError> {
        let query = LevelQuery::unpaged(parent, orderby, order);
        let level = compute_level(self.store.as_ref(), &query);
        Ok(level
            .items
            .iter()
            .map(|item| render_node(item, &self.links))
            .collect())
    }
}

/// Fetcher that posts to a running navigator service's children endpoint.
pub struct HttpChildFetcher {
    client: reqwest::Client,
    base_url: String,
    nonce: String,
}

#[derive(serde::Deserialize)]
struct ChildrenEnvelope {
    success: bool,
    data: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChildrenData {
    nodes: Vec<NodeDescriptor>,
}

impl HttpChildFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, nonce: impl Into<String>) -> Self {
        HttpChildFetcher {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            nonce: nonce.into(),
        }
    }
}

impl ChildFetcher for HttpChildFetcher {
    async fn fetch_children(
        &self,
        parent: DocId,
        orderby: SortField,
        order: SortDir,
    ) -> Result<Vec<NodeDescriptor>, FetchError> {
        let url = format!("{}/navigator/children", self.base_url);
        let body = serde_json::json!({
            "nonce": self.nonce,
            "parent": parent,
            "orderby": orderby.as_str(),
            "order": order.as_str(),
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Forbidden);
        }
        if !response.status().is_success() {
            return Err(FetchError::Server(response.status().to_string()));
        }
        let envelope: ChildrenEnvelope = response
            .json()
            .await
            .map_err(|e| FetchError::Server(e.to_string()))?;
        if !envelope.success {
            return Err(FetchError::Server("request rejected".to_string()));
        }
        let data: ChildrenData = serde_json::from_value(envelope.data)
            .map_err(|e| FetchError::Server(e.to_string()))?;
        Ok(data.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn node(id: DocId, has_children: bool) -> NodeDescriptor {
        NodeDescriptor {
            id,
            title: format!("Node {id}"),
            status: DocStatus::Published.as_str().to_string(),
            status_label: DocStatus::Published.label().to_string(),
            has_children,
            child_count: if has_children { 1 } else { 0 },
            child_count_label: has_children.then(|| "1 child".to_string()),
            edit_url: String::new(),
            view_url: String::new(),
            show_as_parent_url: String::new(),
            delete_url: String::new(),
        }
    }

    /// Scripted fetcher: counts invocations, optionally sleeps or fails per
    /// parent id.
    struct MockFetcher {
        calls: AtomicUsize,
        fail_for: Option<DocId>,
        slow_for: Option<DocId>,
        empty_for: Option<DocId>,
    }

    impl MockFetcher {
        fn new() -> Self {
            MockFetcher {
                calls: AtomicUsize::new(0),
                fail_for: None,
                slow_for: None,
                empty_for: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ChildFetcher for MockFetcher {
        async fn fetch_children(
            &self,
            parent: DocId,
            _orderby: SortField,
            _order: SortDir,
        ) -> Result<Vec<NodeDescriptor>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow_for == Some(parent) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            if self.fail_for == Some(parent) {
                return Err(FetchError::Transport("connection reset".to_string()));
            }
            if self.empty_for == Some(parent) {
                return Ok(Vec::new());
            }
            Ok(vec![node(parent * 10, false), node(parent * 10 + 1, false)])
        }
    }

    fn controller(fetcher: MockFetcher) -> TreeController<MockFetcher> {
        let controller = TreeController::new(fetcher, SortField::Order, SortDir::Asc);
        controller.note_rendered(&node(1, true));
        controller.note_rendered(&node(2, true));
        controller.note_rendered(&node(3, false));
        controller
    }

    #[tokio::test]
    async fn first_expand_fetches_once_then_reuses_cache() {
        let controller = controller(MockFetcher::new());
        // [expand, collapse, expand, expand]
        assert_eq!(
            controller.toggle(1).await,
            ToggleOutcome::Expanded {
                fetched: true,
                children: 2
            }
        );
        assert_eq!(controller.toggle(1).await, ToggleOutcome::Collapsed);
        assert_eq!(
            controller.toggle(1).await,
            ToggleOutcome::Expanded {
                fetched: false,
                children: 2
            }
        );
        assert_eq!(controller.toggle(1).await, ToggleOutcome::Collapsed);
        assert_eq!(controller.fetcher.calls(), 1);
        assert!(controller.cached_children(1).is_some());
    }

    #[tokio::test]
    async fn leaf_nodes_are_not_toggleable() {
        let controller = controller(MockFetcher::new());
        assert_eq!(controller.toggle(3).await, ToggleOutcome::NotToggleable);
        assert_eq!(controller.toggle(99).await, ToggleOutcome::NotToggleable);
        assert_eq!(controller.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn toggle_while_loading_is_a_no_op() {
        let mut fetcher = MockFetcher::new();
        fetcher.slow_for = Some(1);
        let controller = Arc::new(controller(fetcher));

        let slow = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.toggle(1).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.toggle(1).await, ToggleOutcome::InFlight);
        assert_eq!(
            slow.await.unwrap(),
            ToggleOutcome::Expanded {
                fetched: true,
                children: 2
            }
        );
        // Exactly one fetch despite the second toggle.
        assert_eq!(controller.fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_node_collapsed_and_retryable() {
        let mut fetcher = MockFetcher::new();
        fetcher.fail_for = Some(1);
        let controller = controller(fetcher);

        match controller.toggle(1).await {
            ToggleOutcome::Failed(message) => assert!(message.contains("connection reset")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!controller.is_expanded(1));
        assert!(controller.last_error(1).is_some());

        // A retry issues a new fetch against a now-healthy fetcher.
        let controller = TreeController {
            nodes: controller.nodes,
            fetcher: MockFetcher::new(),
            orderby: SortField::Order,
            order: SortDir::Asc,
        };
        assert_eq!(
            controller.toggle(1).await,
            ToggleOutcome::Expanded {
                fetched: true,
                children: 2
            }
        );
    }

    #[tokio::test]
    async fn vanished_children_expand_to_empty_marker() {
        let mut fetcher = MockFetcher::new();
        fetcher.empty_for = Some(1);
        let controller = controller(fetcher);
        // has_children was true at render time, but the children are gone.
        assert_eq!(
            controller.toggle(1).await,
            ToggleOutcome::Expanded {
                fetched: true,
                children: 0
            }
        );
        assert!(controller.is_expanded(1));
        assert_eq!(controller.cached_children(1).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn sibling_fetches_resolve_independently() {
        let mut fetcher = MockFetcher::new();
        fetcher.slow_for = Some(1);
        fetcher.fail_for = Some(1);
        let controller = controller(fetcher);

        let (slow, fast) = futures::join!(controller.toggle(1), controller.toggle(2));
        assert!(matches!(slow, ToggleOutcome::Failed(_)));
        assert_eq!(
            fast,
            ToggleOutcome::Expanded {
                fetched: true,
                children: 2
            }
        );
        assert!(controller.is_expanded(2));
        assert!(!controller.is_expanded(1));
    }

    #[tokio::test]
    async fn local_fetcher_renders_store_children() {
        use crate::render::ViewMode;
        use crate::store::{Document, MemoryStore};
        use chrono::{TimeZone, Utc};

        let store = MemoryStore::new("page");
        for (id, parent, title) in [(1, 0, "Root"), (2, 1, "B child"), (3, 1, "A child")] {
            store.insert(Document {
                id,
                title: title.to_string(),
                status: DocStatus::Published,
                parent,
                menu_order: 0,
                created: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                kind: "page".to_string(),
            });
        }
        let fetcher = LocalChildFetcher::new(
            Arc::new(store),
            LinkBuilder::new("/admin", ViewMode::Standalone),
        );
        let children = fetcher
            .fetch_children(1, SortField::Title, SortDir::Asc)
            .await
            .unwrap();
        let titles: Vec<&str> = children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["A child", "B child"]);
    }
}
