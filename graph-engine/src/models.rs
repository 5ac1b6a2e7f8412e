//! Graph payloads exchanged by the typed operations.
//!
//! Graph resources keep their camelCase wire names. Operator-facing request
//! bodies are snake_case and converted to the Graph shape before sending.

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// One page of a Graph collection
#[derive(Debug, Clone, Deserialize)]
pub struct ODataPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignedLicense {
    pub sku_id: String,
    #[serde(default)]
    pub disabled_plans: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GraphUser {
    #[serde(default)]
    pub id: String,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub office_location: Option<String>,
    pub mobile_phone: Option<String>,
    pub usage_location: Option<String>,
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub assigned_licenses: Vec<AssignedLicense>,
}

/// Operator request to create a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub display_name: String,
    pub user_principal_name: String,
    pub mail_nickname: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub account_enabled: bool,
    #[serde(default = "default_true")]
    pub force_change_password: bool,
    #[serde(default)]
    pub usage_location: Option<String>,
}

fn default_true() -> bool {
    true
}

impl NewUser {
    /// Reason the request cannot be sent to Graph, if any
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("display_name", &self.display_name),
            ("user_principal_name", &self.user_principal_name),
            ("mail_nickname", &self.mail_nickname),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(format!("Field '{field}' must not be empty"));
            }
        }
        if !self.user_principal_name.contains('@') {
            return Err(format!(
                "Field 'user_principal_name' must be an address, got '{}'",
                self.user_principal_name
            ));
        }
        Ok(())
    }

    /// Body of `POST /users`
    pub fn to_graph_payload(&self) -> Value {
        let mut payload = json!({
            "accountEnabled": self.account_enabled,
            "displayName": self.display_name,
            "mailNickname": self.mail_nickname,
            "userPrincipalName": self.user_principal_name,
            "passwordProfile": {
                "forceChangePasswordNextSignIn": self.force_change_password,
                "password": self.password,
            },
        });
        if let Some(location) = &self.usage_location {
            payload["usageLocation"] = Value::String(location.clone());
        }
        payload
    }
}

/// Partial user update. Accepted in snake_case, sent to Graph in camelCase
/// with unset fields left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_enabled: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch that only flips the sign-in flag
    pub fn account_enabled(enabled: bool) -> Self {
        Self {
            account_enabled: Some(enabled),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrepaidUnits {
    #[serde(default)]
    pub enabled: i64,
    #[serde(default)]
    pub suspended: i64,
    #[serde(default)]
    pub warning: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedSku {
    pub sku_id: String,
    #[serde(default)]
    pub sku_part_number: String,
    #[serde(default)]
    pub capability_status: Option<String>,
    #[serde(default)]
    pub consumed_units: i64,
    #[serde(default)]
    pub prepaid_units: PrepaidUnits,
}

/// Product names of well-known SKU part numbers
static SKU_NAMES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("sku_names.json")).unwrap_or_else(|e| {
        warn!("Bundled SKU name table is unreadable: {}", e);
        HashMap::new()
    })
});

/// Product name of a SKU, the part number itself when it is not known
pub fn sku_display_name(sku_part_number: &str) -> &str {
    SKU_NAMES
        .get(sku_part_number)
        .map(String::as_str)
        .unwrap_or(sku_part_number)
}

/// License seat usage of one subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LicenseSummary {
    pub sku_id: String,
    pub sku_part_number: String,
    /// Product name shown to operators
    pub sku_name: String,
    pub consumed_units: i64,
    pub enabled_units: i64,
    pub available_units: i64,
}

impl From<&SubscribedSku> for LicenseSummary {
    fn from(sku: &SubscribedSku) -> Self {
        Self {
            sku_id: sku.sku_id.clone(),
            sku_part_number: sku.sku_part_number.clone(),
            sku_name: sku_display_name(&sku.sku_part_number).to_string(),
            consumed_units: sku.consumed_units,
            enabled_units: sku.prepaid_units.enabled,
            available_units: sku.prepaid_units.enabled - sku.consumed_units,
        }
    }
}

/// Operator request to add or remove licenses on a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LicenseChange {
    pub user_id: String,
    pub sku_ids: Vec<String>,
}

impl LicenseChange {
    /// Body of `POST /users/{id}/assignLicense` adding the SKUs
    pub fn assign_payload(&self) -> Value {
        let add: Vec<Value> = self
            .sku_ids
            .iter()
            .map(|sku| json!({ "skuId": sku, "disabledPlans": [] }))
            .collect();
        json!({ "addLicenses": add, "removeLicenses": [] })
    }

    /// Body of `POST /users/{id}/assignLicense` removing the SKUs
    pub fn remove_payload(&self) -> Value {
        json!({ "addLicenses": [], "removeLicenses": self.sku_ids })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: String,
    pub authentication_type: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_initial: bool,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub supported_services: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRole {
    pub id: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub role_template_id: Option<String>,
}

/// Member of a directory role, usually a user or a service principal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryObject {
    pub id: String,
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoleAssignment {
    pub role_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedDomain {
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_initial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub display_name: Option<String>,
    pub country_letter_code: Option<String>,
    pub preferred_language: Option<String>,
    pub created_date_time: Option<String>,
    #[serde(default)]
    pub verified_domains: Vec<VerifiedDomain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Succeeded,
    Failed,
}

/// Outcome of one item of a batch, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchItemResult {
    pub index: usize,
    pub user_principal_name: String,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<GraphUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItemResult {
    pub fn succeeded(index: usize, user_principal_name: &str, user: GraphUser) -> Self {
        Self {
            index,
            user_principal_name: user_principal_name.to_string(),
            status: BatchItemStatus::Succeeded,
            user: Some(user),
            error: None,
        }
    }

    pub fn failed(index: usize, user_principal_name: &str, error: impl fmt::Display) -> Self {
        Self {
            index,
            user_principal_name: user_principal_name.to_string(),
            status: BatchItemStatus::Failed,
            user: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchItemStatus::Succeeded
    }
}

/// Result of checking a tenant's application credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CredentialCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregation window of the usage reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum ReportPeriod {
    #[default]
    D7,
    D30,
    D90,
    D180,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::D7 => "D7",
            ReportPeriod::D30 => "D30",
            ReportPeriod::D90 => "D90",
            ReportPeriod::D180 => "D180",
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "D7" => Ok(ReportPeriod::D7),
            "D30" => Ok(ReportPeriod::D30),
            "D90" => Ok(ReportPeriod::D90),
            "D180" => Ok(ReportPeriod::D180),
            _ => Err(format!(
                "Invalid report period '{value}', expected one of D7, D30, D90, D180"
            )),
        }
    }
}
