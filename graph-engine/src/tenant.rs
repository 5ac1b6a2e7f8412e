use crate::error::GraphError;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// Application credentials registered for one Microsoft 365 tenant
#[derive(Debug)]
pub struct TenantCredential {
    /// Directory (tenant) ID, also the token cache key
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub is_active: bool,
}

impl TenantCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            is_active: true,
        }
    }

    /// Mark the credential as deactivated by an administrator
    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub(crate) fn secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

/// Source of tenant credentials. The engine only ever reads from it.
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Look up a tenant regardless of its active flag
    async fn lookup(&self, tenant: &str) -> Option<Arc<TenantCredential>>;

    /// Look up a tenant that is allowed to be used
    async fn lookup_active(&self, tenant: &str) -> Option<Arc<TenantCredential>> {
        self.lookup(tenant).await.filter(|credential| credential.is_active)
    }

    /// Resolve a tenant for a Graph operation, distinguishing unknown from
    /// deactivated tenants
    async fn resolve(&self, tenant: &str) -> Result<Arc<TenantCredential>, GraphError> {
        match self.lookup(tenant).await {
            None => Err(GraphError::TenantNotFound(tenant.to_string())),
            Some(credential) if !credential.is_active => {
                Err(GraphError::TenantInactive(tenant.to_string()))
            }
            Some(credential) => Ok(credential),
        }
    }
}
