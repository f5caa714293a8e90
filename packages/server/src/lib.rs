pub mod cache;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod import;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod stats;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::TtlCache;
use crate::config::{AppConfig, CorsConfig};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Student Management API",
        version = "1.0.0",
        description = "Students, classes, courses and weighted scores, with CSV score import and export"
    ),
    tags(
        (name = "Auth", description = "Login and staff accounts"),
        (name = "Classes", description = "Class CRUD operations"),
        (name = "Courses", description = "Course CRUD operations"),
        (name = "Students", description = "Student CRUD operations and transcripts"),
        (name = "Scores", description = "Score CRUD operations"),
        (name = "Score Files", description = "CSV import, export and template"),
        (name = "Dashboard", description = "Aggregate statistics"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Connect to the database, sync the schema, seed roles and the bootstrap admin,
/// and assemble the shared state.
pub async fn bootstrap(config: AppConfig) -> anyhow::Result<AppState> {
    let db = database::init_db(&config.database.url).await?;
    seed::seed_role_permissions(&db).await?;
    seed::ensure_admin_user(&db, &config.auth).await?;

    Ok(AppState {
        db,
        config: Arc::new(config),
        stats_cache: Arc::new(TtlCache::new()),
    })
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    let cors = cors_layer(&state.config.server.cors);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}

/// CORS for the browser UI. An empty origin list allows no cross-origin callers.
pub fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .allow_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(cfg.max_age))
}
