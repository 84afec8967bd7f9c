//! Application settings and the rules an application is created under.

use std::fmt;

/// Licenses are issued as fixed-length keys.
pub const LICENSE_LEN: usize = 40;

/// An application may report under at most this many `;`-separated names.
pub const MAX_APP_NAMES: usize = 3;

/// Why a monitoring application could not be created.
///
/// Every variant is a startup condition: nothing here can happen while
/// requests are being served.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to create monitoring application: license can not be empty")]
    MissingLicense,

    #[error("unable to create monitoring application: license length is {len}, expected 40")]
    InvalidLicense { len: usize },

    #[error("unable to create monitoring application: app name is required")]
    MissingAppName,

    #[error("unable to create monitoring application: at most 3 app names are allowed, got {count}")]
    TooManyAppNames { count: usize },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Settings a monitoring [`Application`](super::Application) is created from.
#[derive(Clone, Default)]
pub struct AppConfig {
    /// Name transactions are reported under. Several names may be given
    /// separated by `;`; the first is the primary one.
    pub app_name: String,
    /// Account credential.
    pub license: String,
    /// When `false` the application hands out transactions as usual but
    /// never reports them.
    pub enabled: bool,
}

impl AppConfig {
    /// Checks the settings before an application is created from them.
    ///
    /// A disabled application may go without a license and an app name, but
    /// a license that is given must still be well formed, and the app name
    /// limit always holds.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let len = self.license.chars().count();
        if len != LICENSE_LEN && (self.enabled || len != 0) {
            return Err(ConfigError::InvalidLicense { len });
        }
        if self.enabled && self.app_name.trim().is_empty() {
            return Err(ConfigError::MissingAppName);
        }
        let count = self.app_name.split(';').count();
        if count > MAX_APP_NAMES {
            return Err(ConfigError::TooManyAppNames { count });
        }
        Ok(())
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("license", &"<redacted>")
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(app_name: &str, license: &str) -> AppConfig {
        AppConfig { app_name: app_name.to_owned(), license: license.to_owned(), enabled: true }
    }

    fn disabled(app_name: &str, license: &str) -> AppConfig {
        AppConfig { app_name: app_name.to_owned(), license: license.to_owned(), enabled: false }
    }

    #[test]
    fn disabled_config_may_omit_license_and_name() {
        assert!(disabled("", "").validate().is_ok());
        assert!(disabled("", &"a".repeat(LICENSE_LEN)).validate().is_ok());
    }

    #[test]
    fn disabled_config_still_rejects_malformed_settings() {
        let err = disabled("api", "short").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLicense { len: 5 }));
        let err = disabled("a;b;c;d;e", "").validate().unwrap_err();
        assert!(matches!(err, ConfigError::TooManyAppNames { count: 5 }));
    }

    #[test]
    fn enabled_config_needs_full_length_license() {
        let err = enabled("api", "short").validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLicense { len: 5 }));
        assert!(enabled("api", &"a".repeat(LICENSE_LEN)).validate().is_ok());
    }

    #[test]
    fn enabled_config_caps_app_names() {
        let license = "a".repeat(LICENSE_LEN);
        assert!(enabled("a;b;c", &license).validate().is_ok());
        let err = enabled("a;b;c;d", &license).validate().unwrap_err();
        assert!(matches!(err, ConfigError::TooManyAppNames { count: 4 }));
        assert!(matches!(enabled(" ", &license).validate(), Err(ConfigError::MissingAppName)));
    }

    #[test]
    fn debug_output_hides_license() {
        let rendered = format!("{:?}", enabled("api", "secret-license"));
        assert!(!rendered.contains("secret-license"));
    }
}
