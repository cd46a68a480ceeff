use crate::auth::{Session, SessionManager};
use crate::config::NavConfig;
use crate::level::{DocumentSummary, LevelQuery, PageSize, compute_level};
use crate::prefs::PreferenceStore;
use crate::render::{
    Crumb, LinkBuilder, NodeDescriptor, breadcrumbs, children_fragment, render_node,
};
use crate::search::find_parent;
use crate::store::{DocId, DocumentStore, TOP_LEVEL};
use actix_web::{HttpResponse, HttpServer, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

pub struct AppState {
    pub config: NavConfig,
    pub store: Arc<dyn DocumentStore>,
    pub prefs: PreferenceStore,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(config: NavConfig, store: Arc<dyn DocumentStore>) -> anyhow::Result<Self> {
        config.validate()?;
        let prefs = PreferenceStore::new(config.default_per_page);
        Ok(AppState {
            config,
            store,
            prefs,
            sessions: SessionManager::new(),
        })
    }

    fn links(&self) -> LinkBuilder {
        LinkBuilder::new(&self.config.base_url, self.config.view_mode)
    }

    fn authorize(&self, nonce: &str) -> Result<Session, HttpResponse> {
        self.sessions.verify_editor(nonce).ok_or_else(forbidden)
    }
}

/// Permission failures answer 403 with a failure envelope, distinct from
/// empty results (which are success responses).
fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().json(json!({
        "success": false,
        "data": "forbidden",
    }))
}

fn success(data: serde_json::Value) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "data": data,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LevelViewParams {
    pub nonce: String,
    pub parent: Option<DocId>,
    pub paged: Option<usize>,
    pub per_page: Option<usize>,
    pub orderby: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LevelView {
    pub parent: DocId,
    pub breadcrumbs: Vec<Crumb>,
    pub nodes: Vec<NodeDescriptor>,
    pub total_count: usize,
    pub page_count: usize,
    pub page: usize,
    pub per_page: usize,
    pub orderby: String,
    pub order: String,
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

/// The level view: one page of siblings under the selected parent, plus the
/// breadcrumb trail. Everything is recomputed from current store state; no
/// server-side caching between requests.
#[get("/navigator")]
pub async fn level_view(
    params: web::Query<LevelViewParams>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let session = match state.authorize(&params.nonce) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let per_page = state.prefs.resolve_per_page(session.user, params.per_page);
    let query = LevelQuery::normalize(
        params.parent.unwrap_or(TOP_LEVEL),
        params.orderby.as_deref(),
        params.order.as_deref(),
        params.paged,
        PageSize::Limited(per_page),
    );
    let level = compute_level(state.store.as_ref(), &query);
    let links = state.links();
    let nodes = render_nodes(&level.items, &links);
    let view = LevelView {
        parent: query.parent,
        breadcrumbs: breadcrumbs(state.store.as_ref(), &links, query.parent),
        nodes,
        total_count: level.total_count,
        page_count: level.page_count,
        page: level.page,
        per_page,
        orderby: query.orderby.as_str().to_string(),
        order: query.order.as_str().to_string(),
    };
    HttpResponse::Ok().json(view)
}

fn render_nodes(items: &[DocumentSummary], links: &LinkBuilder) -> Vec<NodeDescriptor> {
    items.iter().map(|item| render_node(item, links)).collect()
}

#[derive(Debug, Deserialize)]
pub struct ChildrenRequest {
    pub nonce: String,
    pub parent: DocId,
    pub orderby: Option<String>,
    pub order: Option<String>,
}

/// Child fetch for in-place expansion: the whole level under `parent` as one
/// unpaged window. A level that turns out empty (children deleted since the
/// toggle was rendered) is a success with the empty marker, not an error.
#[post("/navigator/children")]
pub async fn children(
    request: web::Json<ChildrenRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    if let Err(response) = state.authorize(&request.nonce) {
        return response;
    }
    if request.parent == TOP_LEVEL {
        return success(json!({
            "html": children_fragment(&[]),
            "nodes": Vec::<NodeDescriptor>::new(),
        }));
    }
    let query = LevelQuery::normalize(
        request.parent,
        request.orderby.as_deref(),
        request.order.as_deref(),
        None,
        PageSize::All,
    );
    let level = compute_level(state.store.as_ref(), &query);
    let nodes = render_nodes(&level.items, &state.links());
    success(json!({
        "html": children_fragment(&nodes),
        "nodes": nodes,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FindParentRequest {
    pub nonce: String,
    pub q: String,
}

#[post("/navigator/find_parent")]
pub async fn find_parent_endpoint(
    request: web::Json<FindParentRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    if let Err(response) = state.authorize(&request.nonce) {
        return response;
    }
    let results = find_parent(
        state.store.as_ref(),
        &state.links(),
        &request.q,
        state.config.search_limit,
    );
    success(json!({ "results": results }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(level_view)
        .service(children)
        .service(find_parent_endpoint);
}

pub async fn startup(config: NavConfig, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    println!("Starting server at {}:{}", config.host, config.port);

    // default level is info
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(configure)
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}
