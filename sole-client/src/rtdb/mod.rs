//! Realtime database client
//!
//! Path-addressed access to the hosted JSON store: keyed append, partial
//! update, delete, and a live SSE subscription. Reads flow only through the
//! subscription; there is no one-shot fetch.

pub mod stream;

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{ClientError, ClientResult, StoreConfig};

pub use stream::{DbSnapshot, EventOutcome, SseEvent, SseParser, apply_event};

/// Client for the hosted realtime database
///
/// Cheap to clone; all clones share the HTTP connection pool and see auth
/// token changes immediately.
#[derive(Debug, Clone)]
pub struct RealtimeDb {
    client: Client,
    base_url: String,
    auth_token: Arc<RwLock<Option<String>>>,
    timeout: StdDuration,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DbErrorBody {
    error: String,
}

impl RealtimeDb {
    /// Create a database client sharing the store's HTTP client
    pub fn new(client: Client, config: &StoreConfig) -> Self {
        Self {
            client,
            base_url: config.database_url.clone(),
            auth_token: Arc::new(RwLock::new(None)),
            timeout: StdDuration::from_secs(config.timeout),
        }
    }

    /// Set or clear the auth token attached to writes
    pub fn set_auth_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.auth_token.write() {
            *guard = token;
        }
    }

    fn current_token(&self) -> Option<String> {
        self.auth_token.read().ok().and_then(|guard| guard.clone())
    }

    /// REST URL of a node: base + path + ".json"
    fn node_url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.current_token() {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    /// Append a record under a generated key, returning the key
    pub async fn push<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<String> {
        let request = self
            .apply_auth(self.client.post(self.node_url(path)).json(body))
            .timeout(self.timeout);
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Write(e.to_string()))?;
        let response = Self::check_write(response).await?;

        let body: PushResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Write(e.to_string()))?;
        tracing::debug!(path = %path, key = %body.name, "Pushed record");
        Ok(body.name)
    }

    /// Partially update the node at a path; null children are deleted
    pub async fn update<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<()> {
        let request = self
            .apply_auth(self.client.patch(self.node_url(path)).json(body))
            .timeout(self.timeout);
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Write(e.to_string()))?;
        Self::check_write(response).await?;
        tracing::debug!(path = %path, "Updated node");
        Ok(())
    }

    /// Delete the node at a path
    pub async fn remove(&self, path: &str) -> ClientResult<()> {
        let request = self
            .apply_auth(self.client.delete(self.node_url(path)))
            .timeout(self.timeout);
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Write(e.to_string()))?;
        Self::check_write(response).await?;
        tracing::debug!(path = %path, "Removed node");
        Ok(())
    }

    async fn check_write(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<DbErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(ClientError::Write(message))
    }

    /// Open a live subscription to the node at a path
    ///
    /// The returned [`Subscription`] owns the stream; dropping it (or calling
    /// [`Subscription::unsubscribe`]) tears everything down. The streaming
    /// request itself carries no timeout.
    pub async fn subscribe(&self, path: &str) -> ClientResult<Subscription> {
        let request = self
            .apply_auth(self.client.get(self.node_url(path)))
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Subscription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<DbErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(ClientError::Subscription(message));
        }

        let (tx, rx) = watch::channel(DbSnapshot::Connecting);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_path = path.to_string();
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            let mut parser = SseParser::default();
            let mut value = serde_json::Value::Null;

            loop {
                let chunk = tokio::select! {
                    _ = task_cancel.cancelled() => {
                        tracing::debug!(path = %task_path, "Subscription closed");
                        break;
                    }
                    next = body.next() => next,
                };

                let bytes = match chunk {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        tracing::error!(path = %task_path, error = %e, "Stream read error");
                        let _ = tx.send(DbSnapshot::Failed(e.to_string()));
                        break;
                    }
                    None => {
                        tracing::warn!(path = %task_path, "Stream closed by server");
                        let _ = tx.send(DbSnapshot::Failed("stream closed by server".to_string()));
                        break;
                    }
                };

                for event in parser.feed(&bytes) {
                    match apply_event(&mut value, &event) {
                        Ok(EventOutcome::Updated) => {
                            let _ = tx.send(DbSnapshot::Value(value.clone()));
                        }
                        Ok(EventOutcome::Ignored) => {}
                        Ok(EventOutcome::Ended(reason)) => {
                            tracing::warn!(path = %task_path, reason = %reason, "Subscription ended by server");
                            let _ = tx.send(DbSnapshot::Failed(reason));
                            return;
                        }
                        Err(e) => {
                            tracing::error!(path = %task_path, error = %e, "Bad stream payload");
                            let _ = tx.send(DbSnapshot::Failed(e.to_string()));
                            return;
                        }
                    }
                }
            }
        });

        tracing::info!(path = %path, "Subscribed to node");
        Ok(Subscription { rx, cancel })
    }
}

/// Handle to a live subscription
///
/// Dropping the handle cancels the background stream task.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<DbSnapshot>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Current snapshot of the subscribed node
    pub fn snapshot(&self) -> DbSnapshot {
        self.rx.borrow().clone()
    }

    /// Fresh receiver for awaiting snapshot changes
    pub fn receiver(&self) -> watch::Receiver<DbSnapshot> {
        self.rx.clone()
    }

    /// Explicitly release the subscription
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
