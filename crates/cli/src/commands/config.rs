use std::env;
use std::fs;
use std::path::Path;

use toml::Value;
use trialquote_core::config::{resolve_config_path, AppConfig, LoadOptions};

use super::CommandResult;

const COMMAND: &str = "config";

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::config_failure(COMMAND, error.to_string()),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = [
        (
            "output.directory",
            config.output.directory.display().to_string(),
            source("output.directory", &["TRIALQUOTE_OUTPUT_DIRECTORY"]),
        ),
        (
            "output.title_prefix",
            config.output.title_prefix.clone(),
            source("output.title_prefix", &["TRIALQUOTE_OUTPUT_TITLE_PREFIX"]),
        ),
        (
            "notifier.outbox_dir",
            config.notifier.outbox_dir.display().to_string(),
            source("notifier.outbox_dir", &["TRIALQUOTE_NOTIFIER_OUTBOX_DIR"]),
        ),
        (
            "notifier.subject",
            config.notifier.subject.clone(),
            source("notifier.subject", &["TRIALQUOTE_NOTIFIER_SUBJECT"]),
        ),
        (
            "notifier.body",
            config.notifier.body.replace('\n', "\\n"),
            source("notifier.body", &["TRIALQUOTE_NOTIFIER_BODY"]),
        ),
        (
            "notifier.no_reply",
            config.notifier.no_reply.to_string(),
            source("notifier.no_reply", &["TRIALQUOTE_NOTIFIER_NO_REPLY"]),
        ),
        (
            "retry.max_attempts",
            config.retry.max_attempts.to_string(),
            source("retry.max_attempts", &["TRIALQUOTE_RETRY_MAX_ATTEMPTS"]),
        ),
        (
            "retry.backoff_ms",
            config.retry.backoff_ms.to_string(),
            source("retry.backoff_ms", &["TRIALQUOTE_RETRY_BACKOFF_MS"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["TRIALQUOTE_LOGGING_LEVEL", "TRIALQUOTE_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["TRIALQUOTE_LOGGING_FORMAT", "TRIALQUOTE_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
