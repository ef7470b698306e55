use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod forms;
pub mod payments;
pub mod routes;
pub mod storage;

use config::Config;
use db::DbPool;
use error::AppError;
use payments::PaymentGateway;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub storage: Storage,
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentGateway>,
}

/// Builds the full router. Rate limiting is layered on by the binary since it
/// needs the peer address.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        // Public API
        .route("/api/public/home", get(routes::home::home))
        .route("/api/public/shelters", get(routes::shelters::list_public_shelters))
        .route("/api/public/shelters/{id}", get(routes::shelters::get_public_shelter))
        .route("/api/public/shelters/{id}/projects", get(routes::projects::list_shelter_projects))
        .route("/api/public/projects/{id}", get(routes::projects::get_project))
        .route("/api/public/animals/{id}", get(routes::animals::get_public_animal))
        .route("/api/public/donations", post(routes::donations::anonymous_checkout))
        .route("/api/public/donations/success", get(routes::donations::checkout_success))
        // Authenticated API
        .route("/api/me", get(auth::me).put(auth::update_me))
        .route("/api/dashboard", get(routes::dashboard::dashboard))
        .route("/api/shelters", post(routes::shelters::register_shelter))
        .route("/api/shelters/{id}/logo", put(routes::shelters::set_logo))
        .route("/api/shelters/{id}/logo/upload", post(routes::shelters::logo_upload_url))
        .route(
            "/api/shelters/{id}/animals",
            get(routes::animals::list_shelter_animals).post(routes::animals::save_animal),
        )
        .route("/api/shelters/{id}/projects", post(routes::projects::save_project))
        .route("/api/shelters/{id}/projects/image", post(routes::projects::image_upload_url))
        .route("/api/animals/{id}", put(routes::animals::update_animal))
        .route("/api/animals/{id}/status", put(routes::animals::update_status))
        .route("/api/animals/{id}/history", get(routes::animals::status_history))
        .route("/api/animals/{id}/photos", post(routes::animals::add_photo))
        .route("/api/animals/{id}/photos/upload", post(routes::animals::photo_upload_url))
        .route(
            "/api/animals/{id}/applications",
            get(routes::applications::list_animal_applications).post(routes::applications::create_application),
        )
        .route("/api/applications", get(routes::applications::list_my_applications))
        .route("/api/applications/{id}/review", put(routes::applications::review_application))
        .route("/api/applications/{id}/withdraw", put(routes::applications::withdraw_application))
        .route("/api/projects/{id}/status", put(routes::projects::update_status))
        .route(
            "/api/donations",
            get(routes::donations::list_my_donations).post(routes::donations::checkout),
        )
        .route("/api/admin/shelters", get(routes::shelters::list_my_shelters))
        .route("/api/admin/shelters/{id}/verification", put(routes::shelters::set_verification))
        .route("/api/admin/profiles/{id}/role", put(routes::admin::set_role))
        // Auth
        .route("/auth/login/{provider}", get(auth::login))
        .route("/auth/callback/{provider}", get(auth::callback))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/dev/login", post(auth::dev_login))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid ALLOWED_ORIGINS entry: {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Rejects API calls without a valid session, except under `/api/public/`.
async fn require_auth(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();
    if req.method() == Method::OPTIONS
        || !path.starts_with("/api/")
        || path.starts_with("/api/public/")
    {
        return next.run(req).await;
    }

    if let Some(token) = auth::extract_token_from_headers(req.headers()) {
        if auth::validate_token_str(&token, &state.config.jwt).is_ok() {
            return next.run(req).await;
        }
    }

    AppError::Unauthorized.into_response()
}

async fn health_check() -> &'static str {
    "OK"
}
