use crate::acquirer::TokenAcquirer;
use crate::error::TokenError;
use crate::tenant::TenantCredential;
use chrono::{DateTime, Utc};
use log::{debug, info};
use moka::Expiry;
use moka::future::Cache as MokaCache;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time before expiry at which a cached token stops being served
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// Bearer token held for one tenant
#[derive(Clone)]
pub struct CachedToken {
    pub tenant_id: String,
    pub bearer_value: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
    /// How long the entry may be served, lifetime minus the safety margin
    valid_for: Duration,
}

impl CachedToken {
    /// Whether the token may still be served at `now`
    #[cfg(test)]
    pub fn is_servable_at(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        match chrono::Duration::from_std(safety_margin) {
            Ok(margin) => now < self.expires_at - margin,
            Err(_) => false,
        }
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("tenant_id", &self.tenant_id)
            .field("bearer_value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

struct SafetyMarginExpiry;

impl Expiry<String, Arc<CachedToken>> for SafetyMarginExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<CachedToken>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.valid_for)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<CachedToken>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.valid_for)
    }
}

/// Per-tenant token store.
///
/// Entries expire `safety_margin` before the provider-reported expiry. A miss
/// goes to the [`TokenAcquirer`]; concurrent misses for the same tenant wait
/// on a single acquisition. Failed acquisitions are not cached.
#[derive(Clone)]
pub struct TokenCache {
    cache: MokaCache<String, Arc<CachedToken>>,
    acquirer: TokenAcquirer,
    safety_margin: Duration,
}

impl TokenCache {
    pub fn new(acquirer: TokenAcquirer, safety_margin: Duration, max_tenants: u64) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(max_tenants)
            .expire_after(SafetyMarginExpiry)
            .build();

        Self {
            cache,
            acquirer,
            safety_margin,
        }
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }

    /// Return a servable token for the tenant, acquiring one if needed
    pub async fn get_token(
        &self,
        credential: &TenantCredential,
    ) -> Result<Arc<CachedToken>, Arc<TokenError>> {
        let tenant_id = credential.tenant_id.clone();
        self.cache
            .try_get_with(tenant_id, self.acquire(credential))
            .await
    }

    /// Drop the tenant's token so the next `get_token` acquires a new one
    pub async fn evict(&self, tenant_id: &str) {
        debug!("Evicting cached token for tenant '{}'", tenant_id);
        self.cache.invalidate(tenant_id).await;
    }

    /// Drop the tenant's token only while it is still `bearer_value`, so a
    /// stale rejection does not discard a token another call just acquired.
    /// Returns whether an entry was dropped.
    pub async fn evict_if_current(&self, tenant_id: &str, bearer_value: &str) -> bool {
        match self.cache.get(tenant_id).await {
            Some(token) if token.bearer_value == bearer_value => {
                self.evict(tenant_id).await;
                true
            }
            Some(_) => {
                debug!(
                    "Cached token for tenant '{}' was already replaced, keeping it",
                    tenant_id
                );
                false
            }
            None => false,
        }
    }

    /// Whether a servable token is cached for the tenant
    pub fn contains(&self, tenant_id: &str) -> bool {
        self.cache.contains_key(tenant_id)
    }

    /// Number of tenants with a cached token
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn acquire(&self, credential: &TenantCredential) -> Result<Arc<CachedToken>, TokenError> {
        let token = self.acquirer.acquire(credential).await?;
        let lifetime = chrono::Duration::from_std(token.expires_in).map_err(|e| {
            TokenError::InvalidResponse {
                tenant_id: credential.tenant_id.clone(),
                reason: format!("token lifetime out of range: {e}"),
            }
        })?;
        let valid_for = token.expires_in.saturating_sub(self.safety_margin);

        info!(
            "Cached new token for tenant '{}' (lifetime {}s, served for {}s)",
            credential.tenant_id,
            token.expires_in.as_secs(),
            valid_for.as_secs()
        );

        Ok(Arc::new(CachedToken {
            tenant_id: credential.tenant_id.clone(),
            bearer_value: token.access_token,
            expires_at: Utc::now() + lifetime,
            scope: self.acquirer.scope().to_string(),
            valid_for,
        }))
    }
}
