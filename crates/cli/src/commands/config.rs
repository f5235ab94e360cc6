use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use restock_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Lists every effective setting with the layer it came from.
pub fn run(options: LoadOptions) -> String {
    let explicit_path = options.config_path.clone();
    let overrides = options.overrides.clone();
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(explicit_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let sources = Sources { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };

    let entries = vec![
        entry(
            "database.url",
            config.database.url.clone(),
            &["RESTOCK_DATABASE_URL"],
            overrides.database_url.is_some(),
        ),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["RESTOCK_DATABASE_MAX_CONNECTIONS"],
            false,
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["RESTOCK_DATABASE_TIMEOUT_SECS"],
            false,
        ),
        entry(
            "forecast.interval_width",
            config.forecast.interval_width.to_string(),
            &["RESTOCK_FORECAST_INTERVAL_WIDTH"],
            overrides.interval_width.is_some(),
        ),
        entry(
            "forecast.default_periods",
            config.forecast.default_periods.to_string(),
            &["RESTOCK_FORECAST_DEFAULT_PERIODS"],
            overrides.default_periods.is_some(),
        ),
        entry(
            "forecast.weekly_seasonality",
            format!("{:?}", config.forecast.weekly_seasonality),
            &["RESTOCK_FORECAST_WEEKLY_SEASONALITY"],
            false,
        ),
        entry(
            "forecast.yearly_seasonality",
            format!("{:?}", config.forecast.yearly_seasonality),
            &["RESTOCK_FORECAST_YEARLY_SEASONALITY"],
            false,
        ),
        entry(
            "recommendation.default_lead_time_days",
            config.recommendation.default_lead_time_days.to_string(),
            &["RESTOCK_RECOMMENDATION_DEFAULT_LEAD_TIME_DAYS"],
            overrides.default_lead_time_days.is_some(),
        ),
        entry(
            "report.parallel",
            config.report.parallel.to_string(),
            &["RESTOCK_REPORT_PARALLEL"],
            overrides.report_parallel.is_some(),
        ),
        entry(
            "report.fill_missing_days",
            config.report.fill_missing_days.to_string(),
            &["RESTOCK_REPORT_FILL_MISSING_DAYS"],
            false,
        ),
        entry(
            "plot.output_dir",
            config.plot.output_dir.display().to_string(),
            &["RESTOCK_PLOT_OUTPUT_DIR"],
            overrides.plot_output_dir.is_some(),
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            &["RESTOCK_LOGGING_LEVEL", "RESTOCK_LOG_LEVEL"],
            overrides.log_level.is_some(),
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["RESTOCK_LOGGING_FORMAT", "RESTOCK_LOG_FORMAT"],
            false,
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for entry in entries {
        let source = if entry.overridden {
            "flag".to_string()
        } else {
            sources.field_source(entry.key, entry.env_keys)
        };
        lines.push(render_line(entry.key, &entry.value, source));
    }
    lines.join("\n")
}

struct Entry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
}

fn entry(
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
) -> Entry {
    Entry { key, value, env_keys, overridden }
}

struct Sources<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl Sources<'_> {
    fn field_source(&self, key_path: &str, env_keys: &[&str]) -> String {
        let set_env = env_keys
            .iter()
            .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
        if let Some(env_key) = set_env {
            return format!("env ({env_key})");
        }

        if let Some(doc) = self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("restock.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/restock.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, Sources};

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: Value = "[forecast]\ninterval_width = 0.9\n".parse().expect("toml");

        assert!(contains_path(&doc, "forecast.interval_width"));
        assert!(!contains_path(&doc, "forecast.default_periods"));
        assert!(!contains_path(&doc, "plot.output_dir"));
    }

    #[test]
    fn file_source_names_the_file() {
        let doc: Value = "[plot]\noutput_dir = \"charts\"\n".parse().expect("toml");
        let path = std::path::Path::new("restock.toml");
        let sources = Sources { doc: Some(&doc), path: Some(path) };

        assert_eq!(
            sources.field_source("plot.output_dir", &["RESTOCK_TEST_UNSET_PLOT_DIR"]),
            "file (restock.toml)"
        );
        assert_eq!(
            sources.field_source("report.parallel", &["RESTOCK_TEST_UNSET_PARALLEL"]),
            "default"
        );
    }
}
