//! In-memory state for the mock cloud
//!
//! One JSON tree stands in for the realtime database, a user table backs the
//! sign-in endpoint, and an image map backs uploads. Every committed write
//! broadcasts the full tree so streaming connections can re-emit it.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

/// Seconds an issued id token stays valid
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Push key symbols in ascii order, so key order is creation order
pub const PUSH_ALPHABET: &[u8; 64] =
    b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Mock service configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Secret signing the issued id tokens
    pub jwt_secret: String,
    /// API key the sign-in endpoint expects
    pub api_key: String,
    /// Unsigned preset the upload endpoint expects
    pub upload_preset: String,
    /// (email, password) accounts known to the auth service
    pub users: Vec<(String, String)>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "sole-mock-secret".to_string(),
            api_key: "mock-api-key".to_string(),
            upload_preset: "sole-unsigned".to_string(),
            users: vec![("admin@sole.test".to_string(), "shoe-store-admin".to_string())],
        }
    }
}

/// A registered account
#[derive(Debug, Clone)]
pub struct MockUser {
    pub password: String,
    pub local_id: String,
}

/// An uploaded image, keyed by its served file name
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Claims carried by the mock id tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Requests received per endpoint
///
/// Integration tests assert exact call counts against these.
#[derive(Debug, Default)]
pub struct CallCounters {
    pub sign_ins: AtomicU64,
    pub uploads: AtomicU64,
    pub appends: AtomicU64,
    pub patches: AtomicU64,
    pub deletes: AtomicU64,
}

impl CallCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            sign_ins: self.sign_ins.load(Ordering::Relaxed),
            uploads: self.uploads.load(Ordering::Relaxed),
            appends: self.appends.load(Ordering::Relaxed),
            patches: self.patches.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub sign_ins: u64,
    pub uploads: u64,
    pub appends: u64,
    pub patches: u64,
    pub deletes: u64,
}

/// Shared state behind the mock routes
#[derive(Debug)]
pub struct MockState {
    pub config: MockConfig,
    /// Base URL the server is reachable at, used to build file URLs
    pub base_url: String,
    /// The whole database tree; null means empty
    db: RwLock<Value>,
    /// Full tree, broadcast after every committed write
    changes: broadcast::Sender<Value>,
    users: HashMap<String, MockUser>,
    images: RwLock<HashMap<String, StoredImage>>,
    keys: Mutex<PushKeyGen>,
    pub counters: CallCounters,
}

impl MockState {
    pub fn new(config: MockConfig, base_url: String) -> Self {
        let users = config
            .users
            .iter()
            .map(|(email, password)| {
                let user = MockUser {
                    password: password.clone(),
                    local_id: Uuid::new_v4().simple().to_string(),
                };
                (email.clone(), user)
            })
            .collect();
        let (changes, _) = broadcast::channel(64);
        Self {
            config,
            base_url,
            db: RwLock::new(Value::Null),
            changes,
            users,
            images: RwLock::new(HashMap::new()),
            keys: Mutex::new(PushKeyGen::default()),
            counters: CallCounters::default(),
        }
    }

    /// Receiver seeing the full tree after each committed write
    pub fn subscribe_changes(&self) -> broadcast::Receiver<Value> {
        self.changes.subscribe()
    }

    /// Clone of the subtree at `path`, null when absent
    pub async fn read(&self, path: &str) -> Value {
        subtree(&*self.db.read().await, path)
    }

    /// Append `body` under a fresh push key; returns the key
    pub async fn append(&self, path: &str, body: Value) -> String {
        let key = self.next_push_key();
        let data = sanitize(body);
        let snapshot = {
            let mut tree = self.db.write().await;
            let mut segs = segments(path);
            segs.push(key.as_str());
            write_node(&mut tree, &segs, data);
            tree.clone()
        };
        self.notify(snapshot);
        key
    }

    /// Merge children into the node at `path`; a null child deletes that key
    pub async fn merge(&self, path: &str, entries: Map<String, Value>) {
        let snapshot = {
            let mut tree = self.db.write().await;
            for (child, value) in entries {
                let mut segs = segments(path);
                segs.push(child.as_str());
                write_node(&mut tree, &segs, sanitize(value));
            }
            prune_empty(&mut tree);
            tree.clone()
        };
        self.notify(snapshot);
    }

    /// Delete the node at `path`
    pub async fn delete(&self, path: &str) {
        let snapshot = {
            let mut tree = self.db.write().await;
            write_node(&mut tree, &segments(path), Value::Null);
            prune_empty(&mut tree);
            tree.clone()
        };
        self.notify(snapshot);
    }

    fn notify(&self, tree: Value) {
        // nobody listening is fine
        let _ = self.changes.send(tree);
    }

    fn next_push_key(&self) -> String {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.next_key(Utc::now().timestamp_millis())
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Option<&MockUser> {
        self.users.get(email).filter(|user| user.password == password)
    }

    /// Sign an id token for a signed-in account
    pub fn issue_token(
        &self,
        email: &str,
        local_id: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: local_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
    }

    /// Whether `token` was issued by this mock and has not expired
    pub fn verify_token(&self, token: &str) -> bool {
        jsonwebtoken::decode::<TokenClaims>(
            token,
            &jsonwebtoken::DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256),
        )
        .is_ok()
    }

    /// Store image bytes deduplicated by content hash; returns the served name
    pub async fn store_image(
        &self,
        bytes: Vec<u8>,
        ext: &str,
        content_type: &'static str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let hash = hex::encode(hasher.finalize());
        let name = format!("{hash}.{ext}");
        let mut images = self.images.write().await;
        images
            .entry(name.clone())
            .or_insert(StoredImage { bytes, content_type });
        name
    }

    pub async fn image(&self, name: &str) -> Option<StoredImage> {
        self.images.read().await.get(name).cloned()
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{name}", self.base_url)
    }
}

/// Push key generator in the style of the hosted database
///
/// 20 symbols: 8 encoding the millisecond timestamp, 12 random. Keys issued
/// in the same millisecond bump the random tail so ascii order always matches
/// creation order.
#[derive(Debug, Default)]
pub struct PushKeyGen {
    last_millis: i64,
    last_random: [u8; 12],
}

impl PushKeyGen {
    pub fn next_key(&mut self, now_millis: i64) -> String {
        if now_millis <= self.last_millis {
            for slot in self.last_random.iter_mut().rev() {
                if *slot < 63 {
                    *slot += 1;
                    break;
                }
                *slot = 0;
            }
        } else {
            self.last_millis = now_millis;
            let mut rng = rand::thread_rng();
            for slot in self.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }

        let mut timestamp = [0u8; 8];
        let mut rest = self.last_millis;
        for slot in timestamp.iter_mut().rev() {
            *slot = (rest % 64) as u8;
            rest /= 64;
        }

        let mut key = String::with_capacity(20);
        for idx in timestamp {
            key.push(PUSH_ALPHABET[idx as usize] as char);
        }
        for idx in self.last_random {
            key.push(PUSH_ALPHABET[idx as usize] as char);
        }
        key
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Clone of the subtree at `path`, null when absent
pub(crate) fn subtree(tree: &Value, path: &str) -> Value {
    let mut node = tree;
    for seg in segments(path) {
        match node.get(seg) {
            Some(child) => node = child,
            None => return Value::Null,
        }
    }
    node.clone()
}

/// Set or delete the node at `path`; writing null removes it
fn write_node(node: &mut Value, path: &[&str], data: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = data;
        return;
    };
    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        if rest.is_empty() && data.is_null() {
            map.remove(*head);
        } else if let Some(child) = map.get_mut(*head) {
            write_node(child, rest, data);
        } else if !data.is_null() {
            let mut child = Value::Null;
            write_node(&mut child, rest, data);
            map.insert((*head).to_string(), child);
        }
    }
}

/// Strip null children recursively; the store never keeps explicit nulls
fn sanitize(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, sanitize(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Drop empty objects so an emptied collection reads back as null
fn prune_empty(node: &mut Value) {
    if let Value::Object(map) = node {
        for child in map.values_mut() {
            prune_empty(child);
        }
        map.retain(|_, v| !v.is_null());
        if map.is_empty() {
            *node = Value::Null;
        }
    }
}
