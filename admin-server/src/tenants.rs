use crate::config::{TenantRecord, DEFAULT_TENANT_ALIAS};
use async_trait::async_trait;
use graph_engine::{TenantCredential, TenantRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Duplicate tenant key '{0}'")]
    DuplicateKey(String),
    #[error("Tenant key '{0}' is reserved")]
    ReservedKey(String),
    #[error("Tenant '{key}' is missing {field}")]
    MissingField { key: String, field: &'static str },
}

#[derive(Debug)]
struct TenantEntry {
    key: String,
    display_name: String,
    credential: Arc<TenantCredential>,
}

/// Public view of a configured tenant
#[derive(Debug, Clone, PartialEq)]
pub struct TenantInfo {
    pub key: String,
    pub display_name: String,
    pub tenant_id: String,
    pub is_active: bool,
}

/// Tenant registry backed by the configuration file.
///
/// Tenants are addressed by their configured key or their directory ID. The
/// `default` alias resolves to the first active tenant in file order.
#[derive(Debug, Default)]
pub struct StaticTenantRegistry {
    entries: Vec<TenantEntry>,
}

impl StaticTenantRegistry {
    pub fn from_records(records: Vec<TenantRecord>) -> Result<Self, RegistryError> {
        let mut keys = HashSet::new();
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            if record.key == DEFAULT_TENANT_ALIAS {
                return Err(RegistryError::ReservedKey(record.key));
            }
            for (field, value) in [
                ("key", &record.key),
                ("tenant_id", &record.tenant_id),
                ("client_id", &record.client_id),
                ("client_secret", &record.client_secret),
            ] {
                if value.trim().is_empty() {
                    return Err(RegistryError::MissingField {
                        key: record.key.clone(),
                        field,
                    });
                }
            }
            if !keys.insert(record.key.clone()) {
                return Err(RegistryError::DuplicateKey(record.key));
            }

            let mut credential =
                TenantCredential::new(record.tenant_id, record.client_id, record.client_secret);
            if !record.is_active {
                credential = credential.deactivated();
            }
            entries.push(TenantEntry {
                key: record.key,
                display_name: record.display_name,
                credential: Arc::new(credential),
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured tenants in file order
    pub fn tenants(&self) -> Vec<TenantInfo> {
        self.entries
            .iter()
            .map(|entry| TenantInfo {
                key: entry.key.clone(),
                display_name: entry.display_name.clone(),
                tenant_id: entry.credential.tenant_id.clone(),
                is_active: entry.credential.is_active,
            })
            .collect()
    }

    fn find(&self, tenant: &str) -> Option<&TenantEntry> {
        if tenant == DEFAULT_TENANT_ALIAS {
            return self.entries.iter().find(|entry| entry.credential.is_active);
        }
        self.entries
            .iter()
            .find(|entry| entry.key == tenant)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|entry| entry.credential.tenant_id == tenant)
            })
    }
}

#[async_trait]
impl TenantRegistry for StaticTenantRegistry {
    async fn lookup(&self, tenant: &str) -> Option<Arc<TenantCredential>> {
        self.find(tenant).map(|entry| entry.credential.clone())
    }
}
