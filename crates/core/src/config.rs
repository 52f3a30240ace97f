use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "trialquote.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub notifier: NotifierConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub title_prefix: String,
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub outbox_dir: PathBuf,
    pub subject: String,
    pub body: String,
    pub no_reply: bool,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub output_directory: Option<PathBuf>,
    pub outbox_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub retry_max_attempts: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig {
                directory: PathBuf::from("output"),
                title_prefix: "研究相談用見積".to_string(),
            },
            notifier: NotifierConfig {
                outbox_dir: PathBuf::from("outbox"),
                subject: "概算見積の作成が完了しました".to_string(),
                body: "概算見積の作成が完了しました。\n添付ファイルをご確認ください。".to_string(),
                no_reply: true,
            },
            retry: RetryConfig { max_attempts: 2, backoff_ms: 1000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(output) = patch.output {
            if let Some(directory) = output.directory {
                self.output.directory = directory;
            }
            if let Some(title_prefix) = output.title_prefix {
                self.output.title_prefix = title_prefix;
            }
        }

        if let Some(notifier) = patch.notifier {
            if let Some(outbox_dir) = notifier.outbox_dir {
                self.notifier.outbox_dir = outbox_dir;
            }
            if let Some(subject) = notifier.subject {
                self.notifier.subject = subject;
            }
            if let Some(body) = notifier.body {
                self.notifier.body = body;
            }
            if let Some(no_reply) = notifier.no_reply {
                self.notifier.no_reply = no_reply;
            }
        }

        if let Some(retry) = patch.retry {
            if let Some(max_attempts) = retry.max_attempts {
                self.retry.max_attempts = max_attempts;
            }
            if let Some(backoff_ms) = retry.backoff_ms {
                self.retry.backoff_ms = backoff_ms;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TRIALQUOTE_OUTPUT_DIRECTORY") {
            self.output.directory = PathBuf::from(value);
        }
        if let Some(value) = read_env("TRIALQUOTE_OUTPUT_TITLE_PREFIX") {
            self.output.title_prefix = value;
        }

        if let Some(value) = read_env("TRIALQUOTE_NOTIFIER_OUTBOX_DIR") {
            self.notifier.outbox_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("TRIALQUOTE_NOTIFIER_SUBJECT") {
            self.notifier.subject = value;
        }
        if let Some(value) = read_env("TRIALQUOTE_NOTIFIER_BODY") {
            self.notifier.body = value;
        }
        if let Some(value) = read_env("TRIALQUOTE_NOTIFIER_NO_REPLY") {
            self.notifier.no_reply = parse_bool("TRIALQUOTE_NOTIFIER_NO_REPLY", &value)?;
        }

        if let Some(value) = read_env("TRIALQUOTE_RETRY_MAX_ATTEMPTS") {
            self.retry.max_attempts = parse_u32("TRIALQUOTE_RETRY_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("TRIALQUOTE_RETRY_BACKOFF_MS") {
            self.retry.backoff_ms = parse_u64("TRIALQUOTE_RETRY_BACKOFF_MS", &value)?;
        }

        let log_level =
            read_env("TRIALQUOTE_LOGGING_LEVEL").or_else(|| read_env("TRIALQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TRIALQUOTE_LOGGING_FORMAT").or_else(|| read_env("TRIALQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(directory) = overrides.output_directory {
            self.output.directory = directory;
        }
        if let Some(outbox_dir) = overrides.outbox_dir {
            self.notifier.outbox_dir = outbox_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(max_attempts) = overrides.retry_max_attempts {
            self.retry.max_attempts = max_attempts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_output(&self.output)?;
        validate_notifier(&self.notifier)?;
        validate_retry(&self.retry)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Config file that [`AppConfig::load`] would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation("output.directory must not be empty".to_string()));
    }
    if output.title_prefix.trim().is_empty() {
        return Err(ConfigError::Validation("output.title_prefix must not be empty".to_string()));
    }
    if output.title_prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(
            "output.title_prefix is used in file names and must not contain path separators"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_notifier(notifier: &NotifierConfig) -> Result<(), ConfigError> {
    if notifier.outbox_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("notifier.outbox_dir must not be empty".to_string()));
    }
    if notifier.subject.trim().is_empty() {
        return Err(ConfigError::Validation("notifier.subject must not be empty".to_string()));
    }

    Ok(())
}

fn validate_retry(retry: &RetryConfig) -> Result<(), ConfigError> {
    if retry.max_attempts == 0 || retry.max_attempts > 10 {
        return Err(ConfigError::Validation(
            "retry.max_attempts must be in range 1..=10".to_string(),
        ));
    }

    if retry.backoff_ms > 60_000 {
        return Err(ConfigError::Validation(
            "retry.backoff_ms must not exceed 60000".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    output: Option<OutputPatch>,
    notifier: Option<NotifierPatch>,
    retry: Option<RetryPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputPatch {
    directory: Option<PathBuf>,
    title_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierPatch {
    outbox_dir: Option<PathBuf>,
    subject: Option<String>,
    body: Option<String>,
    no_reply: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RetryPatch {
    max_attempts: Option<u32>,
    backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_delivery_conventions() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| format!("defaults should validate: {err}"))?;

        ensure(config.output.title_prefix == "研究相談用見積", "default title prefix")?;
        ensure(config.notifier.subject == "概算見積の作成が完了しました", "default subject")?;
        ensure(config.notifier.body.ends_with("添付ファイルをご確認ください。"), "default body")?;
        ensure(config.notifier.no_reply, "notifications default to no-reply")?;
        ensure(config.retry.max_attempts == 2, "two read attempts by default")?;
        ensure(config.retry.backoff().as_millis() == 1000, "one second backoff by default")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TRIALQUOTE_OUTBOX", "/var/spool/trialquote");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("trialquote.toml");
            fs::write(
                &path,
                r#"
[notifier]
outbox_dir = "${TEST_TRIALQUOTE_OUTBOX}"
no_reply = false
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.notifier.outbox_dir == PathBuf::from("/var/spool/trialquote"),
                "outbox dir should be interpolated from environment",
            )?;
            ensure(!config.notifier.no_reply, "no_reply should be read from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_TRIALQUOTE_OUTBOX"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_TRIALQUOTE_UNSET"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("trialquote.toml");
        fs::write(&path, "[output]\ndirectory = \"${TEST_TRIALQUOTE_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        let error = match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Ok(_) => return Err("expected interpolation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_TRIALQUOTE_UNSET"),
            "error should name the missing variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIALQUOTE_LOG_LEVEL", "warn");
        env::set_var("TRIALQUOTE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["TRIALQUOTE_LOG_LEVEL", "TRIALQUOTE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIALQUOTE_OUTPUT_DIRECTORY", "from-env");
        env::set_var("TRIALQUOTE_RETRY_BACKOFF_MS", "250");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("trialquote.toml");
            fs::write(
                &path,
                r#"
[output]
directory = "from-file"
title_prefix = "概算見積"

[retry]
max_attempts = 3
backoff_ms = 500

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    output_directory: Some(PathBuf::from("from-override")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.output.directory == PathBuf::from("from-override"),
                "override output directory should win",
            )?;
            ensure(config.output.title_prefix == "概算見積", "file title prefix should apply")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.retry.max_attempts == 3, "file retry attempts should apply")?;
            ensure(config.retry.backoff_ms == 250, "env backoff should win over file")?;
            Ok(())
        })();

        clear_vars(&["TRIALQUOTE_OUTPUT_DIRECTORY", "TRIALQUOTE_RETRY_BACKOFF_MS"]);
        result
    }

    #[test]
    fn invalid_env_numbers_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIALQUOTE_RETRY_MAX_ATTEMPTS", "twice");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. } if key == "TRIALQUOTE_RETRY_MAX_ATTEMPTS"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["TRIALQUOTE_RETRY_MAX_ATTEMPTS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIALQUOTE_RETRY_MAX_ATTEMPTS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("retry.max_attempts")
            );
            ensure(has_message, "validation failure should mention retry.max_attempts")
        })();

        clear_vars(&["TRIALQUOTE_RETRY_MAX_ATTEMPTS"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref path) if *path == missing),
            "error should name the missing file",
        )
    }

    #[test]
    fn title_prefix_with_path_separator_is_rejected() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.output.title_prefix = "見積/2026".to_string();
        let rejected = matches!(
            config.validate(),
            Err(ConfigError::Validation(ref message)) if message.contains("title_prefix")
        );
        ensure(rejected, "path separators in the title prefix should be rejected")
    }
}
