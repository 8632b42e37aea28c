//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::{Extension, Request},
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Method,
    },
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domains::analysis::JobController;
use crate::domains::auth::{SessionStore, SESSION_COOKIE, SESSION_TTL};
use crate::server::routes::{
    analyze_handler, feedback_handler, get_job_handler, health_handler, history_handler,
    submit_job_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<JobController>,
    pub sessions: Arc<SessionStore>,
}

/// Per-request session id, resolved by the session middleware.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Middleware that resolves the session cookie and stashes the id in
/// request extensions. A newly minted session is attached to the
/// response as a cookie.
async fn resolve_session(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // probes carry no cookies; do not mint sessions for them
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let presented = cookie_session_id(request.headers());
    let (session, is_new) = state.sessions.ensure(presented.as_deref()).await;
    let session_id = session.session_id.clone();
    request.extensions_mut().insert(SessionId(session_id.clone()));

    let mut response = next.run(request).await;
    if is_new {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(&session_id)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

fn cookie_session_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.trim().to_string())
    })
}

fn session_cookie(session_id: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        session_id,
        SESSION_TTL.as_secs()
    )
}

/// Build the Axum application router
pub fn build_app(controller: Arc<JobController>, sessions: Arc<SessionStore>) -> Router {
    let app_state = AppState {
        controller,
        sessions,
    };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/jobs", post(submit_job_handler))
        .route("/api/jobs/:job_id", get(get_job_handler))
        .route("/api/history", get(history_handler))
        .route("/api/feedback", post(feedback_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(resolve_session))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
