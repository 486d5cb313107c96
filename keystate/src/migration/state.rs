//! Persisted shapes of the account record and the state aggregate.
//!
//! Schema 3 introduced these to group the loose schema 2 keys per account; schema 4 moves
//! part of the settings back out into per-user keys. Field names are the camelCase names
//! found in the stored JSON.
//!
//! Every shape carries an `extra` map with the fields this library does not interpret
//! (account keys, security stamps, settings owned by other app modules). They are written
//! back exactly as read.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server endpoints an account (or the login screen) talks to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentUrls {
    /// Self-hosted base URL; the specific URLs below override it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// API server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    /// Identity server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Icons server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<String>,
    /// Notifications server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<String>,
    /// Web vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_vault: Option<String>,
    /// Fields not interpreted here, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Who the account belongs to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    /// Account identifier, also the key of the account in [`State::accounts`]
    pub user_id: String,
    /// Account email
    pub email: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Key derivation function
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_type: Option<i32>,
    /// Key derivation iterations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_iterations: Option<i32>,
    /// Whether the email was verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    /// Whether the account has premium features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_premium: Option<bool>,
    /// Fields not interpreted here, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Session tokens
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTokens {
    /// Access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Fields not interpreted here, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-account settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    /// Server environment of the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_urls: Option<EnvironmentUrls>,
    /// Vault timeout in minutes. Schema 3 only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_timeout: Option<i32>,
    /// Vault timeout action. Schema 3 only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_timeout_action: Option<String>,
    /// Fields not interpreted here, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One authenticated user's profile, tokens and settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Identity
    pub profile: AccountProfile,
    /// Session tokens
    #[serde(default)]
    pub tokens: AccountTokens,
    /// Settings
    #[serde(default)]
    pub settings: AccountSettings,
    /// Fields not interpreted here, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Every account on the device plus the active one.
///
/// `accounts` keeps the order in which accounts appear in the stored document, which is
/// the order they were added. Steps that need "the first account" rely on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Accounts by user id, in insertion order
    #[serde(default)]
    pub accounts: IndexMap<String, Account>,
    /// User id of the active account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_user_id: Option<String>,
    /// Fields not interpreted here, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl State {
    /// A state holding a single account, which is also the active one
    #[must_use]
    pub fn with_single_account(account: Account) -> Self {
        let user_id = account.profile.user_id.clone();
        let mut accounts = IndexMap::new();
        accounts.insert(user_id.clone(), account);
        Self {
            accounts,
            active_user_id: Some(user_id),
            extra: Map::new(),
        }
    }
}
