//! Live catalog feed
//!
//! Subscribes to the product collection and keeps a materialized product
//! list current. Every snapshot from the store replaces the list wholesale;
//! the list is a disposable cache with no authority of its own. A failed
//! subscription degrades to an empty, not-loading state and stays there; it
//! never retries and never takes the caller down.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::rtdb::{DbSnapshot, RealtimeDb};
use shared::{CatalogStats, Product, filter_products};

/// Published catalog state
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    /// Products in store key order (chronological for generated keys)
    pub products: Vec<Product>,
    /// True until the first snapshot or failure arrives
    pub loading: bool,
}

/// Handle to the live product list
///
/// Dropping the feed (or calling [`CatalogFeed::unsubscribe`]) releases the
/// underlying subscription and its background tasks.
#[derive(Debug)]
pub struct CatalogFeed {
    rx: watch::Receiver<CatalogState>,
    cancel: CancellationToken,
}

impl CatalogFeed {
    /// Subscribe to the product collection at `path`
    ///
    /// Never fails: a subscription error is logged and the feed settles on
    /// the empty, not-loading state.
    pub async fn subscribe(db: &RealtimeDb, path: &str) -> Self {
        let (tx, rx) = watch::channel(CatalogState {
            products: Vec::new(),
            loading: true,
        });
        let cancel = CancellationToken::new();

        match db.subscribe(path).await {
            Ok(subscription) => {
                let task_cancel = cancel.clone();
                tokio::spawn(async move {
                    let mut db_rx = subscription.receiver();
                    loop {
                        tokio::select! {
                            _ = task_cancel.cancelled() => break,
                            changed = db_rx.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                        }

                        let snapshot = db_rx.borrow_and_update().clone();
                        match snapshot {
                            DbSnapshot::Connecting => {}
                            DbSnapshot::Value(value) => {
                                let products = materialize(&value);
                                tracing::debug!(count = products.len(), "Catalog snapshot applied");
                                let _ = tx.send(CatalogState {
                                    products,
                                    loading: false,
                                });
                            }
                            DbSnapshot::Failed(reason) => {
                                tracing::error!(error = %reason, "Catalog subscription failed");
                                let _ = tx.send(CatalogState {
                                    products: Vec::new(),
                                    loading: false,
                                });
                                break;
                            }
                        }
                    }
                    subscription.unsubscribe();
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to subscribe to catalog");
                let _ = tx.send(CatalogState {
                    products: Vec::new(),
                    loading: false,
                });
            }
        }

        CatalogFeed { rx, cancel }
    }

    /// Current catalog state
    pub fn state(&self) -> CatalogState {
        self.rx.borrow().clone()
    }

    /// Current product list
    pub fn products(&self) -> Vec<Product> {
        self.rx.borrow().products.clone()
    }

    /// Summary statistics over the current list
    pub fn stats(&self) -> CatalogStats {
        CatalogStats::compute(&self.rx.borrow().products)
    }

    /// Case-insensitive name/category search over the current list
    pub fn search(&self, query: &str) -> Vec<Product> {
        filter_products(&self.rx.borrow().products, query)
    }

    /// Wait for the next state change; false once the feed is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Fresh receiver for presentation layers that watch the state
    pub fn receiver(&self) -> watch::Receiver<CatalogState> {
        self.rx.clone()
    }

    /// Explicitly release the subscription
    pub fn unsubscribe(self) {}
}

impl Drop for CatalogFeed {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Materialize a product list from the subscribed node's value
///
/// Each key becomes the product id; key order is preserved, which for
/// generated keys is chronological. Records that fail to deserialize are
/// skipped with a warning instead of poisoning the whole snapshot.
fn materialize(value: &serde_json::Value) -> Vec<Product> {
    let serde_json::Value::Object(entries) = value else {
        return Vec::new();
    };

    let mut products = Vec::with_capacity(entries.len());
    for (key, record) in entries {
        match serde_json::from_value::<Product>(record.clone()) {
            Ok(mut product) => {
                product.id = Some(key.clone());
                products.push(product);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Skipping malformed product record");
            }
        }
    }
    products
}
