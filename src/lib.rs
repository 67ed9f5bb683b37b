pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::handler::Handler;
use axum::http::HeaderValue;
use axum::middleware as mw;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use database::Database;
use handlers::{
    admin, assignments, auth as auth_handlers, dashboard, engineers, evaluations, health, reports,
};
use middleware::{authenticate, require_admin, require_coach, require_lead, require_report_access};

/// Shared application state. The connection manager is an owned, injected
/// instance rather than a module-level singleton so tests can run several
/// portals side by side.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(auth_handlers::me))
        .route("/api/dashboard", get(dashboard::summary))
        .route(
            "/api/engineers",
            get(engineers::list)
                .post(engineers::create.layer(mw::from_fn(require_lead))),
        )
        .route(
            "/api/engineers/:id",
            get(engineers::get)
                .put(engineers::update.layer(mw::from_fn(require_lead)))
                .delete(engineers::deactivate.layer(mw::from_fn(require_lead))),
        )
        .route(
            "/api/assignments",
            get(assignments::list.layer(mw::from_fn(require_lead)))
                .post(assignments::create.layer(mw::from_fn(require_lead))),
        )
        .route(
            "/api/assignments/:id/end",
            put(assignments::end.layer(mw::from_fn(require_lead))),
        )
        .route(
            "/api/reports/engineers",
            get(reports::engineers.layer(mw::from_fn(require_report_access))),
        )
        .route(
            "/api/evaluations",
            get(evaluations::list)
                .post(evaluations::create.layer(mw::from_fn(require_coach))),
        )
        .route(
            "/api/evaluations/:id",
            get(evaluations::get)
                .put(evaluations::update.layer(mw::from_fn(require_coach)))
                .delete(evaluations::remove.layer(mw::from_fn(require_coach))),
        )
        .route(
            "/api/evaluations/:id/cases",
            post(evaluations::add_case.layer(mw::from_fn(require_coach))),
        )
        .route(
            "/api/evaluations/cases/:id",
            put(evaluations::update_case.layer(mw::from_fn(require_coach)))
                .delete(evaluations::remove_case.layer(mw::from_fn(require_coach))),
        )
        .nest("/api/admin", admin_routes())
        .layer(mw::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        // Public
        .route("/health", get(health::health))
        .route("/api/auth/login", post(auth_handlers::login))
        .route("/api/auth/logout", post(auth_handlers::logout))
        .merge(protected)
        // Global middleware
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn admin_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/:id", delete(admin::remove_user))
        .route("/users/:id/roles", put(admin::update_roles))
        .route("/backup", post(admin::backup))
        .route("/database/switch", post(admin::switch_database))
        .route_layer(mw::from_fn(require_admin))
}

fn cors_layer() -> CorsLayer {
    let cfg = config::config();
    if cfg.environment == config::Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cfg
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
