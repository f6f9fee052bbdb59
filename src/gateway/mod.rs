//! Axum-based HTTP gateway: the operator- and user-facing surface.
//!
//! Thin by design: every handler resolves the caller through the
//! [`AuthGate`] first, then delegates to the core modules. Rejections are
//! uniform: one fixed 403 body regardless of why a secret failed, so the
//! surface leaks nothing about which check tripped. Execution failures
//! map to generic 500 lines; script output never reaches a response.
//!
//! Request hygiene follows the usual layering:
//! - Request body size limit (64KB max)
//! - Request timeout to bound slow privileged-script chains

use crate::auth::AuthGate;
use crate::config::Config;
use crate::error::Error;
use crate::identity::{AccountManager, IdentityResolver};
use crate::provision::{BulkProvisioner, BulkRequest};
use crate::session::SessionLauncher;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB) — prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (120s) — bulk provisioning shells out once per identity
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Fixed body for every authorization failure.
const MISSING_AUTH_RESPONSE: &str = "Invalid auth-key provided";

/// Cookie handed to the session proxy layer.
const SESSION_COOKIE_NAME: &str = "code-server-session";

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: AuthGate,
    pub resolver: IdentityResolver,
    pub accounts: AccountManager,
    pub launcher: SessionLauncher,
    pub provisioner: BulkProvisioner,
}

/// Build the route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/user", get(handle_user_page).post(handle_password_change))
        .route("/bulk", get(handle_bulk_page).post(handle_bulk_run))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.bind_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "gateway listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "failed to install ctrl-c handler");
    }
}

fn reject_auth() -> Response {
    (StatusCode::FORBIDDEN, MISSING_AUTH_RESPONSE).into_response()
}

/// Map a core failure to a generic 500 line. The detailed error (and any
/// script output) stays in the logs.
fn failure_response(err: &Error) -> Response {
    let body = match err {
        Error::MalformedPort => "Could not parse the stored session port",
        Error::PortOutOfRange => "Session reported an invalid port... aborting",
        Error::BlankOutput {
            what: "session hash",
        } => "Could not find a session hash, try relaunching the session?",
        Error::BlankOutput { .. } => "Could not find a cached session port",
        _ => "Operation failed",
    };
    tracing::warn!(%err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

async fn handle_index() -> &'static str {
    "devgate"
}

#[derive(Debug, serde::Deserialize)]
struct UserQuery {
    key: Option<String>,
    action: Option<String>,
}

/// GET /user?key={secret}[&action=launch|generate]
///
/// Without an action, renders the user's control panel. `launch` drives
/// the session scripts and redirects into the proxied session with the
/// auth-hash cookie set; `generate` installs and returns a fresh SSH key.
async fn handle_user_page(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Response {
    let Some(username) = state.gate.authorize(query.key.as_deref(), false).await else {
        return reject_auth();
    };
    let auth_key = query.key.as_deref().unwrap_or_default();

    match query.action.as_deref() {
        Some("launch") => match state.launcher.launch(&username).await {
            Ok(info) => {
                tracing::info!(%username, port = info.port, "session launched");
                let cookie = format!(
                    "{SESSION_COOKIE_NAME}={}",
                    urlencoding::encode(&info.session_hash)
                );
                (
                    [(header::SET_COOKIE, cookie)],
                    Redirect::to(&format!("/code/{username}/")),
                )
                    .into_response()
            }
            Err(err) => failure_response(&err),
        },
        Some("generate") => match state.accounts.generate_ssh_key(&username).await {
            Ok(public_key) => Html(render_result_page(auth_key, &public_key)).into_response(),
            Err(err) => failure_response(&err),
        },
        _ => {
            let is_admin = state.resolver.is_admin(&username).await;
            Html(render_user_page(
                auth_key,
                &username,
                &state.config.hostname,
                is_admin,
            ))
            .into_response()
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct PasswordForm {
    auth_key: Option<String>,
    new_password: Option<String>,
}

/// POST /user
/// Changes the caller's account password. Admin-gated.
async fn handle_password_change(
    State(state): State<AppState>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let Some(username) = state.gate.authorize(form.auth_key.as_deref(), true).await else {
        return reject_auth();
    };
    let auth_key = form.auth_key.as_deref().unwrap_or_default();

    let password = form.new_password.unwrap_or_default();
    if password.chars().count() < state.config.password_min_length {
        return Html(render_result_page(
            auth_key,
            &format!(
                "Password is shorter than minimum length ({})",
                state.config.password_min_length
            ),
        ))
        .into_response();
    }

    match state.accounts.update_password(&username, &password).await {
        Ok(()) => Html(render_result_page(auth_key, "Done")).into_response(),
        Err(err) => failure_response(&err),
    }
}

#[derive(Debug, serde::Deserialize)]
struct BulkQuery {
    key: Option<String>,
}

/// GET /bulk
/// Renders the batch provisioning form. Admin-gated.
async fn handle_bulk_page(
    State(state): State<AppState>,
    Query(query): Query<BulkQuery>,
) -> Response {
    let Some(_username) = state.gate.authorize(query.key.as_deref(), true).await else {
        return reject_auth();
    };
    Html(render_bulk_page(query.key.as_deref().unwrap_or_default())).into_response()
}

#[derive(Debug, serde::Deserialize)]
struct BulkForm {
    auth_key: Option<String>,
    usernames: Option<String>,
    generate_url: Option<String>,
    purge_existing_urls: Option<String>,
}

/// POST /bulk
/// Runs a provisioning batch. Admin-gated.
async fn handle_bulk_run(State(state): State<AppState>, Form(form): Form<BulkForm>) -> Response {
    let Some(_username) = state.gate.authorize(form.auth_key.as_deref(), true).await else {
        return reject_auth();
    };
    let auth_key = form.auth_key.as_deref().unwrap_or_default();

    let usernames = form.usernames.unwrap_or_default();
    if usernames.is_empty() {
        return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
    }

    let request = BulkRequest {
        usernames,
        generate_url: form.generate_url.is_some(),
        purge_existing: form.purge_existing_urls.is_some(),
    };
    match state.provisioner.run(&request).await {
        Ok(outcome) => Html(render_bulk_result(
            auth_key,
            &outcome.summary(),
            &outcome.csv(&state.config.url_base()),
        ))
        .into_response(),
        Err(err) => failure_response(&err),
    }
}

// ── Page rendering ──────────────────────────────────────────────────

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>{title}</title></head>\n<body>{body}</body></html>"
    )
}

fn render_user_page(auth_key: &str, username: &str, hostname: &str, is_admin: bool) -> String {
    let encoded_key = urlencoding::encode(auth_key).into_owned();
    let admin_section = if is_admin {
        format!("<p><a href=\"/bulk?key={encoded_key}\">Bulk user creation</a></p>")
    } else {
        String::new()
    };
    page(
        "Control panel",
        &format!(
            "<h1>Welcome, {username}</h1>\
             <p>Host: {hostname}</p>\
             <p><a href=\"/user?key={encoded_key}&action=launch\">Launch session</a></p>\
             <p><a href=\"/user?key={encoded_key}&action=generate\">Generate SSH key</a></p>\
             <form method=\"post\" action=\"/user\">\
             <input type=\"hidden\" name=\"auth_key\" value=\"{auth_key}\">\
             <input type=\"password\" name=\"new_password\" placeholder=\"New password\">\
             <button type=\"submit\">Change password</button>\
             </form>\
             {admin_section}"
        ),
    )
}

fn render_result_page(auth_key: &str, log_output: &str) -> String {
    let encoded_key = urlencoding::encode(auth_key).into_owned();
    page(
        "Result",
        &format!(
            "<pre>{log_output}</pre>\
             <p><a href=\"/user?key={encoded_key}\">Back</a></p>"
        ),
    )
}

fn render_bulk_page(auth_key: &str) -> String {
    page(
        "Bulk user creation",
        &format!(
            "<h1>Bulk user creation</h1>\
             <form method=\"post\" action=\"/bulk\">\
             <input type=\"hidden\" name=\"auth_key\" value=\"{auth_key}\">\
             <textarea name=\"usernames\" rows=\"12\" placeholder=\"one username per line\"></textarea><br>\
             <label><input type=\"checkbox\" name=\"generate_url\" value=\"1\"> Generate login URLs</label><br>\
             <label><input type=\"checkbox\" name=\"purge_existing_urls\" value=\"1\"> Purge existing URLs</label><br>\
             <button type=\"submit\">Create users</button>\
             </form>"
        ),
    )
}

fn render_bulk_result(auth_key: &str, summary: &str, csv: &str) -> String {
    let encoded_key = urlencoding::encode(auth_key).into_owned();
    page(
        "Result",
        &format!(
            "<p>{summary}</p>\
             <p>Save as <code>logins.csv</code>:</p>\
             <pre>{csv}</pre>\
             <p><a href=\"/user?key={encoded_key}\">Back</a></p>"
        ),
    )
}
