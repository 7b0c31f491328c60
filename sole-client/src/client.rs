//! Store client facade
//!
//! Wires one configuration into the auth, database, and upload clients and
//! holds the signed-in session. An embedding app keeps a single `StoreClient`
//! and pulls catalog feeds and mutators off it per view.

use reqwest::Client;
use std::sync::{Arc, RwLock};

use crate::auth::{AuthClient, AuthSession};
use crate::catalog::CatalogFeed;
use crate::mutation::ProductMutator;
use crate::rtdb::RealtimeDb;
use crate::upload::ImageUploader;
use crate::{ClientResult, StoreConfig};

/// Entry point to the hosted storefront services
///
/// Cloning is cheap; clones share the HTTP connection pool and the
/// auth session, so signing in on one clone authenticates them all.
#[derive(Debug, Clone)]
pub struct StoreClient {
    config: StoreConfig,
    db: RealtimeDb,
    auth: AuthClient,
    uploader: ImageUploader,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl StoreClient {
    pub fn new(config: StoreConfig) -> Self {
        let http = Client::new();
        let db = RealtimeDb::new(http.clone(), &config);
        let auth = AuthClient::new(http.clone(), &config);
        let uploader = ImageUploader::new(http, &config);
        Self {
            config,
            db,
            auth,
            uploader,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Sign in with email and password
    ///
    /// On success the session's id token is attached to every subsequent
    /// database write until `sign_out`.
    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<AuthSession> {
        let session = self.auth.sign_in(email, password).await?;
        self.db.set_auth_token(Some(session.id_token.clone()));
        if let Ok(mut guard) = self.session.write() {
            *guard = Some(session.clone());
        }
        Ok(session)
    }

    /// Drop the session client-side; writes go back to unauthenticated
    pub fn sign_out(&self) {
        self.db.set_auth_token(None);
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
    }

    /// Whether a session is held and its token has not expired
    pub fn is_signed_in(&self) -> bool {
        self.session
            .read()
            .is_ok_and(|guard| guard.as_ref().is_some_and(|s| !s.is_expired()))
    }

    pub fn session(&self) -> Option<AuthSession> {
        self.session.read().ok().and_then(|guard| guard.clone())
    }

    /// Open a live feed over the configured product collection
    pub async fn catalog(&self) -> CatalogFeed {
        CatalogFeed::subscribe(&self.db, &self.config.products_path).await
    }

    /// Fresh mutation state machine; one per admin form
    pub fn mutator(&self) -> ProductMutator {
        ProductMutator::new(
            self.db.clone(),
            self.uploader.clone(),
            self.config.products_path.clone(),
        )
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
