use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    config::AppConfig, environment::Environment, error::EnvironmentError, fingerprint::fingerprint,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub environment: &'static Environment,
    etag: HeaderValue,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        environment: &'static Environment,
    ) -> Result<Self, EnvironmentError> {
        let etag = HeaderValue::from_str(&format!("\"{}\"", fingerprint(environment)?))?;
        Ok(Self {
            config,
            environment,
            etag,
        })
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    service: String,
}

#[derive(Debug, Serialize)]
struct ProviderResponse {
    domain: String,
    issuer: String,
    jwks_url: String,
    audience: String,
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    #[serde(default)]
    callback_path: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .route("/environment", get(environment))
        .route("/auth/provider", get(provider))
        .route("/auth/login", get(login))
        .route("/auth/logout", get(logout))
        .with_state(state)
}

async fn live(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        service: state.config.service_name,
    })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ready",
            timestamp: Utc::now().to_rfc3339(),
            service: state.config.service_name,
        }),
    )
}

async fn environment(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cache_headers = [
        (header::ETAG, state.etag.clone()),
        (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
    ];

    let unchanged = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|tags| {
            tags.split(',')
                .map(str::trim)
                .any(|tag| {
                    tag == "*" || tag.trim_start_matches("W/").as_bytes() == state.etag.as_bytes()
                })
        });
    if unchanged {
        return (StatusCode::NOT_MODIFIED, cache_headers).into_response();
    }

    (cache_headers, Json(state.environment)).into_response()
}

async fn provider(State(state): State<AppState>) -> Json<ProviderResponse> {
    let auth0 = &state.environment.auth0;
    Json(ProviderResponse {
        domain: auth0.domain(),
        issuer: auth0.issuer(),
        jwks_url: auth0.jwks_url(),
        audience: auth0.audience.clone(),
        client_id: auth0.client_id.clone(),
    })
}

async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, StatusCode> {
    let link = state
        .environment
        .auth0
        .login_url(&query.callback_path)
        .map_err(|err| {
            warn!(error = %err, "cannot build login link");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    Ok(Redirect::to(link.as_str()))
}

async fn logout(State(state): State<AppState>) -> Result<Redirect, StatusCode> {
    let link = state.environment.auth0.logout_url().map_err(|err| {
        warn!(error = %err, "cannot build logout link");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Redirect::to(link.as_str()))
}
