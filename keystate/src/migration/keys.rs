//! Storage keys, one immutable table per schema version.
//!
//! These strings identify data that already lives on users' devices and must never change.
//! Per-user keys are built with [`user_key`].

/// Latest schema version this build migrates to.
pub const LATEST_STATE_VERSION: i32 = 4;

/// Preference-store key holding the schema version marker.
pub const STATE_VERSION_KEY: &str = "stateVersion";

/// Builds the per-user variant of a key: `<field>_<user_id>`.
#[must_use]
pub fn user_key(field: &str, user_id: &str) -> String {
    format!("{field}_{user_id}")
}

/// Schema 1: application globals live in the document store.
pub mod v1 {
    /// Server environment. Sentinel: only schema 1 keeps it in the document store.
    pub const ENVIRONMENT_URLS: &str = "environmentUrls";
    /// UI locale override
    pub const APP_LOCALE: &str = "appLocale";
    /// UI theme
    pub const THEME: &str = "theme";
    /// Website icon fetching opt-out
    pub const DISABLE_FAVICON: &str = "disableFavicon";
    /// Clipboard clearing delay
    pub const CLEAR_CLIPBOARD: &str = "clearClipboard";

    /// Globals moved from the document store to the preference store by `1 → 2`.
    pub const RELOCATED_GLOBALS: [&str; 5] = [
        ENVIRONMENT_URLS,
        APP_LOCALE,
        THEME,
        DISABLE_FAVICON,
        CLEAR_CLIPBOARD,
    ];
}

/// Schema 2: a single signed-in user stored as loose, unsuffixed keys.
pub mod v2 {
    /// Account identifier. Sentinel: absorbed into the account record by `2 → 3`.
    pub const USER_ID: &str = "userId";
    /// Account email
    pub const USER_EMAIL: &str = "userEmail";
    /// Key derivation function
    pub const KDF: &str = "kdf";
    /// Key derivation iterations
    pub const KDF_ITERATIONS: &str = "kdfIterations";
    /// Whether the email was verified
    pub const EMAIL_VERIFIED: &str = "emailVerified";
    /// Session access token
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Session refresh token
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Vault timeout in minutes
    pub const VAULT_TIMEOUT: &str = "vaultTimeout";
    /// What happens when the vault times out
    pub const VAULT_TIMEOUT_ACTION: &str = "vaultTimeoutAction";
    /// PIN protected user key
    pub const PIN_PROTECTED: &str = "pinProtected";
    /// Last successful sync
    pub const LAST_SYNC: &str = "lastSync";
    /// Encrypted user key
    pub const ENC_KEY: &str = "encKey";
    /// Encrypted private key
    pub const ENC_PRIVATE_KEY: &str = "encPrivateKey";
    /// Biometric unlock opt-in (preference store)
    pub const BIOMETRIC_UNLOCK: &str = "biometricUnlock";
    /// Encrypted PIN (preference store)
    pub const PROTECTED_PIN: &str = "protectedPin";
    /// Last user activity (preference store)
    pub const LAST_ACTIVE_TIME: &str = "lastActiveTime";
    /// User key (secure store)
    pub const KEY: &str = "key";
    /// Master password hash (secure store)
    pub const KEY_HASH: &str = "keyHash";

    /// Document-store keys folded into the account record.
    pub const ACCOUNT_FIELDS: [&str; 9] = [
        USER_ID,
        USER_EMAIL,
        KDF,
        KDF_ITERATIONS,
        EMAIL_VERIFIED,
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        VAULT_TIMEOUT,
        VAULT_TIMEOUT_ACTION,
    ];

    /// Document-store keys that become per-user keys in the same store.
    pub const PER_USER_DOCUMENTS: [&str; 4] = [PIN_PROTECTED, LAST_SYNC, ENC_KEY, ENC_PRIVATE_KEY];

    /// Preference-store keys that become per-user keys in the same store.
    pub const PER_USER_PREFERENCES: [&str; 3] = [BIOMETRIC_UNLOCK, PROTECTED_PIN, LAST_ACTIVE_TIME];

    /// Secure-store keys that become per-user keys in the same store.
    pub const PER_USER_SECURE: [&str; 2] = [KEY, KEY_HASH];
}

/// Schema 3: accounts are grouped in the state aggregate.
pub mod v3 {
    /// Document-store key of the state aggregate
    pub const STATE: &str = "state";
    /// Global clipboard setting, still shared by every account
    pub const CLEAR_CLIPBOARD: &str = super::v1::CLEAR_CLIPBOARD;
    /// Global server environment, used before any account signs in
    pub const ENVIRONMENT_URLS: &str = super::v1::ENVIRONMENT_URLS;
}

/// Schema 4: account settings are split back out into per-user preference keys.
pub mod v4 {
    /// Per-user vault timeout (suffixed with the user id)
    pub const VAULT_TIMEOUT: &str = "vaultTimeout";
    /// Per-user vault timeout action (suffixed with the user id)
    pub const VAULT_TIMEOUT_ACTION: &str = "vaultTimeoutAction";
    /// Per-user clipboard setting (suffixed with the user id)
    pub const CLEAR_CLIPBOARD: &str = "clearClipboard";
    /// Environment shown on the login screen before any account is selected
    pub const PRE_AUTH_ENVIRONMENT_URLS: &str = "preAuthEnvironmentUrls";
}
