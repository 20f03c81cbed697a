use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub scripts: ScriptSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5004 }

/// External worker scripts and how to run them
///
/// Each worker is started as `<interpreter> <scripts_dir>/<script> [arg]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptSettings {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    #[serde(default = "default_query_script")]
    pub query_script: String,
    #[serde(default = "default_extraction_script")]
    pub extraction_script: String,
    #[serde(default = "default_email_script")]
    pub email_script: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ScriptSettings {
    pub fn script_path(&self, script: &str) -> PathBuf {
        self.scripts_dir.join(script)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            scripts_dir: default_scripts_dir(),
            query_script: default_query_script(),
            extraction_script: default_extraction_script(),
            email_script: default_email_script(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_interpreter() -> String { "python".to_string() }
fn default_scripts_dir() -> PathBuf { PathBuf::from("python") }
fn default_query_script() -> String { "rag.py".to_string() }
fn default_extraction_script() -> String { "ocr.py".to_string() }
fn default_email_script() -> String { "send_emails.py".to_string() }
fn default_timeout_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    /// Extension the client restricts uploads to. Not enforced server-side.
    #[serde(default = "default_document_extension")]
    pub document_extension: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            document_extension: default_document_extension(),
        }
    }
}

fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_document_extension() -> String { "docx".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            dashboard_url: default_dashboard_url(),
        }
    }
}

fn default_dashboard_url() -> String { "http://localhost:8501".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "full".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with TEACHSMART_)
    /// 4. `PORT`, for hosts that only hand out a bare port variable
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // e.g., TEACHSMART__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("TEACHSMART")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_port_override(settings, std::env::var("PORT").ok())?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TEACHSMART")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize::<Self>()?.validated()
    }

    /// Reject values that would make every request fail
    fn validated(self) -> Result<Self, ConfigError> {
        if self.scripts.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "scripts.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

fn apply_port_override(settings: Config, port: Option<String>) -> Result<Config, ConfigError> {
    let Some(port) = port else {
        return Ok(settings);
    };

    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| ConfigError::Message(format!("PORT is not a valid port: {port}")))?;

    Config::builder()
        .add_source(settings)
        .set_override("server.port", i64::from(port))?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_layout() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 5004);
        assert_eq!(settings.scripts.interpreter, "python");
        assert_eq!(
            settings.scripts.script_path(&settings.scripts.query_script),
            PathBuf::from("python").join("rag.py")
        );
        assert_eq!(settings.scripts.timeout(), Duration::from_secs(300));
        assert_eq!(settings.uploads.document_extension, "docx");
        assert_eq!(settings.client.dashboard_url, "http://localhost:8501");
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "full");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(
            &path,
            "[scripts]\ninterpreter = \"python3\"\ntimeout_secs = 30\n\n[uploads]\ndir = \"/srv/uploads\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.scripts.interpreter, "python3");
        assert_eq!(settings.scripts.timeout_secs, 30);
        assert_eq!(settings.scripts.email_script, "send_emails.py");
        assert_eq!(settings.uploads.dir, PathBuf::from("/srv/uploads"));
        assert_eq!(settings.server.port, 5004);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(&path, "[scripts]\ntimeout_secs = 0\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_port_override() {
        let base = Config::builder().build().unwrap();
        let config = apply_port_override(base, Some("8080".to_string())).unwrap();
        let settings: Settings = config.try_deserialize().unwrap();
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_port_override_rejects_garbage() {
        let base = Config::builder().build().unwrap();
        assert!(apply_port_override(base, Some("http".to_string())).is_err());
    }
}
