//! Key material store.
//!
//! Holds the verification keys built from the most recent successful key set
//! fetch. The mapping is an immutable [`KeyMaterial`] snapshot behind an
//! `Arc`; population builds a complete new snapshot and swaps the `Arc` under
//! the write lock, so a reader sees either the old mapping or the new one and
//! never a partially built one.

use crate::auth::jwks::PublishedKey;
use crate::observability::metrics;
use jsonwebtoken::DecodingKey;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// One immutable generation of verification keys, indexed by `kid`.
pub struct KeyMaterial {
    keys: HashMap<String, DecodingKey>,

    /// When the key set behind this snapshot was fetched. `None` when empty.
    fetched_at: Option<Instant>,
}

impl KeyMaterial {
    /// An empty snapshot, as held before first population.
    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
            fetched_at: None,
        }
    }

    /// Build a snapshot from published keys.
    ///
    /// Keys that fail structural validation are skipped. When a `kid` appears
    /// more than once the first usable occurrence wins.
    pub fn from_published(published: &[PublishedKey]) -> Self {
        let mut keys = HashMap::with_capacity(published.len());

        for key in published {
            match key.to_verification_key() {
                Ok(verification_key) => match keys.entry(verification_key.kid) {
                    Entry::Vacant(slot) => {
                        slot.insert(verification_key.key);
                    }
                    Entry::Occupied(slot) => {
                        tracing::warn!(
                            target: "wishlist.auth.store",
                            kid = %slot.key(),
                            "Duplicate kid in key set, keeping first"
                        );
                    }
                },
                Err(rejection) => {
                    tracing::warn!(
                        target: "wishlist.auth.store",
                        kid = ?key.kid,
                        reason = %rejection,
                        "Skipping unusable published key"
                    );
                }
            }
        }

        Self {
            keys,
            fetched_at: Some(Instant::now()),
        }
    }

    /// Verification key for `kid`, if this snapshot holds one.
    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key IDs held by this snapshot, in no particular order.
    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Time since the key set behind this snapshot was fetched.
    ///
    /// `None` for the empty snapshot.
    pub fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }
}

impl Default for KeyMaterial {
    fn default() -> Self {
        Self::empty()
    }
}

/// Process-wide holder of the current [`KeyMaterial`] snapshot.
///
/// Constructed once at startup and shared by handle with the authentication
/// gate. Starts empty.
pub struct KeyMaterialStore {
    current: RwLock<Arc<KeyMaterial>>,
}

impl KeyMaterialStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(KeyMaterial::empty())),
        }
    }

    /// Replace the mapping with one built from `published`.
    ///
    /// Returns the number of usable keys. If none of the published keys are
    /// usable the current snapshot is kept and 0 is returned, so a bad fetch
    /// never wipes working keys.
    pub async fn populate(&self, published: &[PublishedKey]) -> usize {
        let material = KeyMaterial::from_published(published);
        let count = material.len();

        if count == 0 {
            tracing::warn!(
                target: "wishlist.auth.store",
                published = published.len(),
                "No usable keys in key set, keeping current key material"
            );
            return 0;
        }

        *self.current.write().await = Arc::new(material);

        metrics::set_jwks_keys_cached(count);
        tracing::info!(target: "wishlist.auth.store", key_count = count, "Key material replaced");

        count
    }

    /// Verification key for `kid` from the current snapshot.
    pub async fn lookup(&self, kid: &str) -> Option<DecodingKey> {
        self.current.read().await.get(kid).cloned()
    }

    /// The current snapshot. Stays valid and unchanged if the store is
    /// repopulated afterwards.
    pub async fn snapshot(&self) -> Arc<KeyMaterial> {
        Arc::clone(&*self.current.read().await)
    }

    /// Whether population has never succeeded (or the store was invalidated).
    pub async fn is_empty(&self) -> bool {
        self.current.read().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.current.read().await.len()
    }

    /// Reset to empty; the next authentication attempt re-fetches.
    pub async fn invalidate(&self) {
        *self.current.write().await = Arc::new(KeyMaterial::empty());
        metrics::set_jwks_keys_cached(0);
        tracing::info!(target: "wishlist.auth.store", "Key material invalidated");
    }
}

impl Default for KeyMaterialStore {
    fn default() -> Self {
        Self::new()
    }
}
