//! HTTP surface: the endpoints, their routing table and the axum app.
//!
//! axum only provides the listener and request plumbing here. Every request
//! lands in one fallback handler that asks the [`PathRouter`] which
//! [`Endpoint`] the path belongs to.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Router,
};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::{Backend, Config};
use crate::error::Error;
use crate::html::{self, Page};
use crate::kv::open_redis;
use crate::router::PathRouter;
use crate::sql::open_database;
use crate::store::{format_listing, CounterStore, Stores};

/// Body served for robots.txt.
pub const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /secret/\n";

/// Title of the index page.
pub const TITLE: &str = "Robotoscope";

/// What a request is answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Count the client as a robot and serve robots.txt.
    CollectRobot,
    /// Count the client as a cheater and refuse.
    ReportCheater,
    /// Plain-text listing of robots.
    ShowRobots,
    /// Plain-text listing of cheaters.
    ShowCheaters,
    /// HTML page with both listings.
    ShowIndex,
}

/// The service's routing table. The catch-all `/` must stay last.
pub fn default_routes() -> Result<PathRouter<Endpoint>, regex::Error> {
    PathRouter::new()
        .route("/robots.txt", Endpoint::CollectRobot)?
        .route("/secret/*", Endpoint::ReportCheater)?
        .route("/list.txt", Endpoint::ShowRobots)?
        .route("/cheaters.txt", Endpoint::ShowCheaters)?
        .route("/", Endpoint::ShowIndex)
}

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    stores: Stores,
    routes: Arc<PathRouter<Endpoint>>,
}

impl AppState {
    /// Wrap `stores` and a finished routing table.
    pub fn new(stores: Stores, routes: PathRouter<Endpoint>) -> Self {
        Self {
            stores,
            routes: Arc::new(routes),
        }
    }
}

/// The axum app: every request goes through the routing table.
pub fn build_app(state: AppState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    // Patterns are written against decoded paths.
    let path = percent_decode_str(uri.path()).decode_utf8_lossy();
    let Some(endpoint) = state.routes.dispatch(&path).copied() else {
        debug!(%path, "no route");
        return StatusCode::NOT_FOUND.into_response();
    };
    debug!(%path, ?endpoint, "dispatch");

    let user_agent = headers
        .get(header::USER_AGENT)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();

    match endpoint {
        Endpoint::CollectRobot => match count(&*state.stores.robots, &user_agent).await {
            Ok(()) => ROBOTS_TXT.into_response(),
            Err(resp) => resp,
        },
        Endpoint::ReportCheater => match count(&*state.stores.cheaters, &user_agent).await {
            Ok(()) => StatusCode::PAYMENT_REQUIRED.into_response(),
            Err(resp) => resp,
        },
        Endpoint::ShowRobots => listing(&*state.stores.robots, "robots").await,
        Endpoint::ShowCheaters => listing(&*state.stores.cheaters, "cheaters").await,
        Endpoint::ShowIndex => index(&state.stores).await,
    }
}

/// Count `user_agent` unless the client sent none.
async fn count(store: &dyn CounterStore, user_agent: &str) -> Result<(), Response> {
    if user_agent.is_empty() {
        return Ok(());
    }
    store.count(user_agent).await.map_err(|err| {
        error!(%user_agent, error = %err, retryable = err.is_retryable(), "count failed");
        internal_error("cannot count robot")
    })
}

async fn listing(store: &dyn CounterStore, name: &str) -> Response {
    match store.list().await {
        Ok(robots) => format_listing(&robots).into_response(),
        Err(err) => {
            error!(store = name, error = %err, retryable = err.is_retryable(), "list failed");
            internal_error("cannot list robots")
        }
    }
}

async fn index(stores: &Stores) -> Response {
    let lists = async {
        let robots = stores.robots.list().await?;
        let cheaters = stores.cheaters.list().await?;
        Ok::<_, Error>(Page {
            title: TITLE.to_string(),
            robots,
            cheaters,
        })
    };

    match lists.await.and_then(|page| html::render(&page)) {
        Ok(body) => Html(body).into_response(),
        Err(err) => {
            error!(error = %err, "index failed");
            internal_error("cannot render page")
        }
    }
}

fn internal_error(message: &'static str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{message}\n")).into_response()
}

/// Connect the configured backend and create both stores on it.
pub async fn open_stores(backend: &Backend) -> Result<Stores, Error> {
    let stores = match backend {
        Backend::Memory => {
            info!("Counting in memory");
            Stores::memory()
        }
        Backend::Redis(url) => Stores::redis(open_redis(url).await?)?,
        Backend::Sql(url) => Stores::sql(open_database(url).await?).await?,
    };
    Ok(stores)
}

/// Open the stores and serve until the listener fails.
pub async fn run(config: Config) -> Result<(), Error> {
    let stores = open_stores(&config.backend).await?;
    let app = build_app(AppState::new(stores, default_routes()?));

    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(listen = %config.listen, "robotoscope starting");

    axum::serve(listener, app).await?;
    Ok(())
}
