use std::sync::OnceLock;

use keystate_macros::keystate_export;

static CONFIG_INSTANCE: OnceLock<KeyStateConfig> = OnceLock::new();

/// Environment the host application runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum KeyStateEnvironment {
    /// Internal and QA builds. Debug and trace logs from this library are forwarded.
    Staging,
    /// Store builds
    Production,
}

impl KeyStateEnvironment {
    /// Returns the string representation of the environment
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl std::fmt::Display for KeyStateEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Global configuration for keystate
#[derive(Debug, Clone, uniffi::Object)]
pub struct KeyStateConfig {
    environment: KeyStateEnvironment,
}

#[keystate_export]
impl KeyStateConfig {
    /// Creates a new `KeyStateConfig` with the specified environment
    ///
    /// ## Swift
    ///
    /// ```swift
    /// let config = KeyStateConfig(environment: .production)
    /// ```
    #[uniffi::constructor]
    #[must_use]
    pub fn new(environment: KeyStateEnvironment) -> Self {
        Self { environment }
    }

    /// Gets the configured environment
    #[must_use]
    pub fn environment(&self) -> KeyStateEnvironment {
        self.environment
    }
}

/// Initializes the global keystate configuration.
///
/// Call once at application startup, before running migrations. Subsequent calls are
/// ignored with a warning.
///
/// ## Kotlin
///
/// ```kotlin
/// initKeystateConfig(KeyStateEnvironment.STAGING)
/// ```
#[uniffi::export]
pub fn init_keystate_config(environment: KeyStateEnvironment) {
    match CONFIG_INSTANCE.set(KeyStateConfig::new(environment)) {
        Ok(()) => {
            crate::info!("keystate config initialized with environment: {environment}");
        }
        Err(_) => {
            crate::warn!("keystate config already initialized, ignoring");
        }
    }
}

/// Gets the current environment, defaulting to `Production` when the config was never set.
#[must_use]
pub fn current_environment() -> KeyStateEnvironment {
    configured_environment().unwrap_or_else(|| {
        crate::warn!("keystate config not initialized, defaulting to production");
        KeyStateEnvironment::Production
    })
}

/// Reads the configured environment without logging.
///
/// The logger calls this while handling a record, so it must not log itself.
pub(crate) fn configured_environment() -> Option<KeyStateEnvironment> {
    CONFIG_INSTANCE.get().map(|config| config.environment)
}
