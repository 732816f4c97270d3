use crate::handlers::callback::HookFailurePolicy;
use crate::session::cookie::{DEFAULT_COOKIE_MAX_AGE_SECONDS, DEFAULT_COOKIE_NAME};
use crate::utils::redirect_validator::UntrustedRedirect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Minimum length of the cookie password used to derive session keys
pub const MIN_COOKIE_PASSWORD_LENGTH: usize = 32;

/// Environment variable naming a directory that may hold an overriding Settings.toml
pub const SECRETS_DIR_ENV: &str = "AUTHKIT_SECRETS_DIR";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: basic_toml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppSettings {
    pub application: ApplicationSettings,
    pub workos: WorkOsSettings,
    pub cookies: CookieSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Public origin of this service; callback redirects are resolved against it
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkOsSettings {
    pub client_id: String,
    pub api_key: String,
    pub api_base_url: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub name: String,
    pub password: String,
    pub max_age_seconds: u64,
    pub secure: bool,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Where users land when the state carries no return path
    pub return_pathname: String,
    /// Extra origins absolute return URLs may point at
    pub allowed_redirect_origins: Vec<String>,
    pub untrusted_redirect: UntrustedRedirect,
    pub success_hook_failure: HookFailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for WorkOsSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_key: String::new(),
            api_base_url: "https://api.workos.com".to_string(),
            redirect_uri: "http://localhost:8080/auth/callback".to_string(),
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            password: String::new(),
            max_age_seconds: DEFAULT_COOKIE_MAX_AGE_SECONDS,
            secure: true,
            domain: None,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            return_pathname: "/".to_string(),
            allowed_redirect_origins: Vec::new(),
            untrusted_redirect: UntrustedRedirect::default(),
            success_hook_failure: HookFailurePolicy::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings from configuration files and environment variables,
    /// initialize logging, and validate the result
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file cannot be read or parsed
    /// - The resulting configuration is invalid
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Self::init_logging(&settings.logging);
        settings.validate()?;

        Ok(settings)
    }

    /// Load base settings. Priority, highest first:
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `AUTHKIT_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    fn load_base_settings() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let default_config_path = PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::load_from_path(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var(SECRETS_DIR_ENV) {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::load_from_path(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ {SECRETS_DIR_ENV} set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a TOML settings file. Missing sections and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        basic_toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_workos_env_overrides(&mut settings.workos);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_auth_env_overrides(&mut settings.auth);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port_str) = std::env::var("PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(base_url) = std::env::var("BASE_URL") {
            app_settings.base_url = base_url;
        }
    }

    fn apply_workos_env_overrides(workos: &mut WorkOsSettings) {
        if let Ok(client_id) = std::env::var("WORKOS_CLIENT_ID") {
            workos.client_id = client_id;
        }
        if let Ok(api_key) = std::env::var("WORKOS_API_KEY") {
            workos.api_key = api_key;
        }
        if let Ok(hostname) = std::env::var("WORKOS_API_HOSTNAME") {
            workos.api_base_url = format!("https://{}", hostname.trim_end_matches('/'));
        }
        if let Ok(redirect_uri) = std::env::var("WORKOS_REDIRECT_URI") {
            workos.redirect_uri = redirect_uri;
        }
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        if let Ok(name) = std::env::var("WORKOS_COOKIE_NAME") {
            cookie_settings.name = name;
        }
        if let Ok(password) = std::env::var("WORKOS_COOKIE_PASSWORD") {
            cookie_settings.password = password;
        }
        if let Ok(max_age_str) = std::env::var("WORKOS_COOKIE_MAX_AGE") {
            if let Ok(max_age) = max_age_str.parse::<u64>() {
                cookie_settings.max_age_seconds = max_age;
            }
        }
        if let Ok(domain) = std::env::var("WORKOS_COOKIE_DOMAIN") {
            cookie_settings.domain = Some(domain).filter(|d| !d.is_empty());
        }
        if let Ok(cookie_secure_str) = std::env::var("COOKIE_SECURE") {
            if let Ok(cookie_secure) = cookie_secure_str.parse::<bool>() {
                cookie_settings.secure = cookie_secure;
            }
        }
    }

    fn apply_auth_env_overrides(auth: &mut AuthSettings) {
        if let Ok(return_pathname) = std::env::var("RETURN_PATHNAME") {
            auth.return_pathname = return_pathname;
        }
        if let Ok(origins) = std::env::var("ALLOWED_REDIRECT_ORIGINS") {
            auth.allowed_redirect_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from .env file without clobbering ones
    /// already set in the process environment
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    if std::env::var_os(key.trim()).is_none() {
                        std::env::set_var(key.trim(), value.trim());
                    }
                }
            }
        }
    }

    fn init_logging(logging: &LoggingSettings) {
        let env = env_logger::Env::default().default_filter_or(logging.level.as_str());
        if env_logger::Builder::from_env(env).try_init().is_err() {
            log::debug!("Logger already initialized");
        }
    }

    /// Check the settings are usable before the server starts
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] describing the first problem found
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.workos.client_id.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "workos.client_id (WORKOS_CLIENT_ID) is required".to_string(),
            ));
        }

        if self.cookies.password.len() < MIN_COOKIE_PASSWORD_LENGTH {
            return Err(SettingsError::Invalid(format!(
                "cookies.password (WORKOS_COOKIE_PASSWORD) must be at least {MIN_COOKIE_PASSWORD_LENGTH} characters"
            )));
        }

        if self.cookies.name.trim().is_empty() {
            return Err(SettingsError::Invalid("cookies.name must not be empty".to_string()));
        }

        self.base_url()?;
        Self::parse_http_url("workos.api_base_url", &self.workos.api_base_url)?;

        if self.auth.return_pathname.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "auth.return_pathname must not be empty".to_string(),
            ));
        }

        for origin in &self.auth.allowed_redirect_origins {
            Self::parse_http_url("auth.allowed_redirect_origins", origin)?;
        }

        Ok(())
    }

    /// Public base URL of this service
    ///
    /// # Errors
    ///
    /// Returns an error if `application.base_url` is not an absolute http(s) URL
    pub fn base_url(&self) -> Result<Url, SettingsError> {
        Self::parse_http_url("application.base_url", &self.application.base_url)
    }

    fn parse_http_url(field: &str, value: &str) -> Result<Url, SettingsError> {
        let url = Url::parse(value)
            .map_err(|e| SettingsError::Invalid(format!("{field} '{value}' is not a URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(SettingsError::Invalid(format!(
                "{field} '{value}' must be an absolute http(s) URL"
            )));
        }
        Ok(url)
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::constants::TEST_COOKIE_PASSWORD;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "BASE_URL",
        "WORKOS_CLIENT_ID",
        "WORKOS_API_KEY",
        "WORKOS_API_HOSTNAME",
        "WORKOS_REDIRECT_URI",
        "WORKOS_COOKIE_NAME",
        "WORKOS_COOKIE_PASSWORD",
        "WORKOS_COOKIE_MAX_AGE",
        "WORKOS_COOKIE_DOMAIN",
        "COOKIE_SECURE",
        "RETURN_PATHNAME",
        "ALLOWED_REDIRECT_ORIGINS",
        SECRETS_DIR_ENV,
    ];

    fn clean_env_vars() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn valid_settings() -> AppSettings {
        let mut settings = AppSettings::default();
        settings.workos.client_id = "client_123".to_string();
        settings.cookies.password = TEST_COOKIE_PASSWORD.to_string();
        settings
    }

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.cookies.name, "wos-session");
        assert_eq!(settings.cookies.max_age_seconds, 34_560_000);
        assert!(settings.cookies.secure);
        assert_eq!(settings.auth.return_pathname, "/");
        assert_eq!(settings.auth.untrusted_redirect, UntrustedRedirect::Reject);
        assert_eq!(settings.auth.success_hook_failure, HookFailurePolicy::Abort);
        assert_eq!(settings.workos.api_base_url, "https://api.workos.com");
        assert_eq!(settings.get_bind_address(), "0.0.0.0:8080");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clean_env_vars();
        std::env::set_var("PORT", "9000");
        std::env::set_var("WORKOS_CLIENT_ID", "client_env");
        std::env::set_var("WORKOS_API_HOSTNAME", "api.example.test");
        std::env::set_var("WORKOS_COOKIE_MAX_AGE", "600");
        std::env::set_var("COOKIE_SECURE", "false");
        std::env::set_var("RETURN_PATHNAME", "/home");
        std::env::set_var(
            "ALLOWED_REDIRECT_ORIGINS",
            "https://a.example.com, https://b.example.com,",
        );

        let mut settings = AppSettings::default();
        AppSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 9000);
        assert_eq!(settings.workos.client_id, "client_env");
        assert_eq!(settings.workos.api_base_url, "https://api.example.test");
        assert_eq!(settings.cookies.max_age_seconds, 600);
        assert!(!settings.cookies.secure);
        assert_eq!(settings.auth.return_pathname, "/home");
        assert_eq!(
            settings.auth.allowed_redirect_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_numeric_env_is_ignored() {
        clean_env_vars();
        std::env::set_var("PORT", "not-a-port");

        let mut settings = AppSettings::default();
        AppSettings::apply_env_overrides(&mut settings);
        assert_eq!(settings.application.port, 8080);

        clean_env_vars();
    }

    #[test]
    fn test_load_partial_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[workos]
client_id = "client_file"

[cookies]
password = "{TEST_COOKIE_PASSWORD}"
secure = false

[auth]
untrusted_redirect = "fallback"
success_hook_failure = "ignore"
"#
        )
        .unwrap();

        let settings = AppSettings::load_from_path(file.path()).unwrap();
        assert_eq!(settings.workos.client_id, "client_file");
        assert_eq!(settings.workos.api_base_url, "https://api.workos.com");
        assert!(!settings.cookies.secure);
        assert_eq!(settings.cookies.name, "wos-session");
        assert_eq!(
            settings.auth.untrusted_redirect,
            UntrustedRedirect::FallbackToDefault
        );
        assert_eq!(settings.auth.success_hook_failure, HookFailurePolicy::Ignore);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_invalid_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workos\nclient_id = ").unwrap();

        assert!(matches!(
            AppSettings::load_from_path(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppSettings::load_from_path(&dir.path().join("Settings.toml")),
            Err(SettingsError::Io { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_complete_settings() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_client_id() {
        let mut settings = valid_settings();
        settings.workos.client_id = String::new();
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_short_password() {
        let mut settings = valid_settings();
        settings.cookies.password = "too-short".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut settings = valid_settings();
        settings.application.base_url = "/relative".to_string();
        assert!(settings.validate().is_err());

        let mut settings = valid_settings();
        settings.auth.allowed_redirect_origins = vec!["ftp://files.example.com".to_string()];
        assert!(settings.validate().is_err());
    }
}
