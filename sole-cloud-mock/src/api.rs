//! HTTP surface of the mock cloud
//!
//! One router stands in for all three hosted services the client talks to:
//! the path-addressed JSON database (REST plus streaming reads), the
//! password sign-in endpoint, and the multipart image upload host. Uploaded
//! images are served back under `/files/{name}`.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::{MockState, TOKEN_TTL_SECS, subtree};

/// Upload formats the image host accepts
const SUPPORTED_FORMATS: [image::ImageFormat; 3] = [
    image::ImageFormat::Png,
    image::ImageFormat::Jpeg,
    image::ImageFormat::WebP,
];

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/accounts:signInWithPassword", post(sign_in))
        .route("/upload", post(upload_image))
        .route("/files/{name}", get(serve_file))
        .route(
            "/{*path}",
            get(db_read)
                .post(db_append)
                .patch(db_merge)
                .delete(db_delete),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

// ---------- database ----------

#[derive(Deserialize)]
struct DbQuery {
    auth: Option<String>,
}

/// The REST surface requires a `.json` suffix on every node path
fn node_path(raw: &str) -> Option<String> {
    raw.strip_suffix(".json")
        .map(|s| s.trim_matches('/').to_string())
}

fn db_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// A request carrying an auth token must carry a valid one
fn check_db_access(state: &MockState, query: &DbQuery) -> Result<(), Response> {
    match &query.auth {
        Some(token) if !state.verify_token(token) => {
            Err(db_error(StatusCode::UNAUTHORIZED, "Permission denied"))
        }
        _ => Ok(()),
    }
}

async fn db_read(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
    Query(query): Query<DbQuery>,
    headers: HeaderMap,
) -> Response {
    let Some(node) = node_path(&path) else {
        return db_error(StatusCode::NOT_FOUND, "append .json to your request URI");
    };
    if let Err(denied) = check_db_access(&state, &query) {
        return denied;
    }

    let wants_stream = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"));
    if wants_stream {
        stream_node(state, node).await.into_response()
    } else {
        Json(state.read(&node).await).into_response()
    }
}

/// Streaming read: an initial full `put`, then a full `put` per change
async fn stream_node(
    state: Arc<MockState>,
    node: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // subscribe before the initial read so no change lands in between
    let rx = state.subscribe_changes();
    let initial = put_event(state.read(&node).await);

    let updates = stream::unfold((rx, node), |(mut rx, node)| async move {
        loop {
            match rx.recv().await {
                Ok(tree) => {
                    let event = put_event(subtree(&tree, &node));
                    return Some((Ok::<_, Infallible>(event), (rx, node)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "stream fell behind, resuming from latest");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    let events = stream::once(async move { Ok(initial) }).chain(updates);
    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn put_event(data: Value) -> Event {
    Event::default()
        .event("put")
        .data(json!({ "path": "/", "data": data }).to_string())
}

async fn db_append(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
    Query(query): Query<DbQuery>,
    Json(body): Json<Value>,
) -> Response {
    state.counters.appends.fetch_add(1, Ordering::Relaxed);
    let Some(node) = node_path(&path) else {
        return db_error(StatusCode::NOT_FOUND, "append .json to your request URI");
    };
    if let Err(denied) = check_db_access(&state, &query) {
        return denied;
    }

    let key = state.append(&node, body).await;
    tracing::debug!(%node, %key, "appended record");
    Json(json!({ "name": key })).into_response()
}

async fn db_merge(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
    Query(query): Query<DbQuery>,
    Json(body): Json<Value>,
) -> Response {
    state.counters.patches.fetch_add(1, Ordering::Relaxed);
    let Some(node) = node_path(&path) else {
        return db_error(StatusCode::NOT_FOUND, "append .json to your request URI");
    };
    if let Err(denied) = check_db_access(&state, &query) {
        return denied;
    }

    let Value::Object(entries) = body else {
        return db_error(
            StatusCode::BAD_REQUEST,
            "Invalid data; couldn't parse JSON object",
        );
    };
    let echoed = entries.clone();
    state.merge(&node, entries).await;
    tracing::debug!(%node, "merged record");
    Json(Value::Object(echoed)).into_response()
}

async fn db_delete(
    State(state): State<Arc<MockState>>,
    Path(path): Path<String>,
    Query(query): Query<DbQuery>,
) -> Response {
    state.counters.deletes.fetch_add(1, Ordering::Relaxed);
    let Some(node) = node_path(&path) else {
        return db_error(StatusCode::NOT_FOUND, "append .json to your request URI");
    };
    if let Err(denied) = check_db_access(&state, &query) {
        return denied;
    }

    state.delete(&node).await;
    tracing::debug!(%node, "deleted node");
    Json(Value::Null).into_response()
}

// ---------- auth ----------

#[derive(Deserialize)]
struct AuthQuery {
    key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInBody {
    email: String,
    password: String,
}

async fn sign_in(
    State(state): State<Arc<MockState>>,
    Query(query): Query<AuthQuery>,
    Json(body): Json<SignInBody>,
) -> Response {
    state.counters.sign_ins.fetch_add(1, Ordering::Relaxed);
    if query.key.as_deref() != Some(state.config.api_key.as_str()) {
        return auth_error("API key not valid. Please pass a valid API key.");
    }

    let Some(user) = state.authenticate(&body.email, &body.password) else {
        tracing::debug!(email = %body.email, "sign-in rejected");
        return auth_error("INVALID_LOGIN_CREDENTIALS");
    };
    let token = match state.issue_token(&body.email, &user.local_id) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("failed to sign id token: {e}");
            return auth_error("TOKEN_SIGNING_FAILED");
        }
    };

    tracing::debug!(email = %body.email, "sign-in ok");
    Json(json!({
        "kind": "identitytoolkit#VerifyPasswordResponse",
        "localId": user.local_id,
        "email": body.email,
        "displayName": "",
        "idToken": token,
        "registered": true,
        "refreshToken": Uuid::new_v4().simple().to_string(),
        "expiresIn": TOKEN_TTL_SECS.to_string(),
    }))
    .into_response()
}

fn auth_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "code": 400,
                "message": message,
                "errors": [{ "message": message, "domain": "global", "reason": "invalid" }]
            }
        })),
    )
        .into_response()
}

// ---------- image upload ----------

async fn upload_image(State(state): State<Arc<MockState>>, mut multipart: Multipart) -> Response {
    state.counters.uploads.fetch_add(1, Ordering::Relaxed);

    let mut file: Option<Vec<u8>> = None;
    let mut preset: Option<String> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or("").to_string();
                match name.as_str() {
                    "file" => match field.bytes().await {
                        Ok(bytes) => file = Some(bytes.to_vec()),
                        Err(e) => return upload_error(&format!("Failed to read file: {e}")),
                    },
                    "upload_preset" => match field.text().await {
                        Ok(text) => preset = Some(text),
                        Err(e) => return upload_error(&format!("Failed to read preset: {e}")),
                    },
                    _ => {}
                }
            }
            Ok(None) => break,
            Err(e) => return upload_error(&format!("Malformed multipart body: {e}")),
        }
    }

    if preset.as_deref() != Some(state.config.upload_preset.as_str()) {
        return upload_error("Upload preset not found");
    }
    let Some(bytes) = file.filter(|b| !b.is_empty()) else {
        return upload_error("Missing required parameter - file");
    };
    let format = match image::guess_format(&bytes) {
        Ok(format) if SUPPORTED_FORMATS.contains(&format) => format,
        _ => return upload_error("Invalid image file"),
    };

    let ext = format.extensions_str().first().copied().unwrap_or("bin");
    let size = bytes.len();
    let name = state.store_image(bytes, ext, format.to_mime_type()).await;
    let public_id = name
        .strip_suffix(&format!(".{ext}"))
        .unwrap_or(&name)
        .to_string();
    let url = state.file_url(&name);
    tracing::debug!(%name, size, "stored upload");

    Json(json!({
        "public_id": public_id,
        "secure_url": url,
        "url": url,
        "bytes": size,
        "format": ext,
        "resource_type": "image",
        "created_at": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

fn upload_error(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": { "message": message } })),
    )
        .into_response()
}

async fn serve_file(State(state): State<Arc<MockState>>, Path(name): Path<String>) -> Response {
    match state.image(&name).await {
        Some(image) => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        None => (StatusCode::NOT_FOUND, "file not found").into_response(),
    }
}
