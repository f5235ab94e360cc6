use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::forecast::MAX_HORIZON_DAYS;
use crate::domain::product::DEFAULT_LEAD_TIME_DAYS;

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub forecast: ForecastConfig,
    pub recommendation: RecommendationConfig,
    pub report: ReportConfig,
    pub plot: PlotConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForecastConfig {
    /// Share of the predictive distribution covered by the bounds.
    pub interval_width: f64,
    /// Horizon used by the all-products forecast when none is requested.
    pub default_periods: u32,
    pub weekly_seasonality: SeasonalityMode,
    pub yearly_seasonality: SeasonalityMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationConfig {
    pub default_lead_time_days: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    pub parallel: bool,
    pub fill_missing_days: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlotConfig {
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    Auto,
    Enabled,
    Disabled,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub interval_width: Option<f64>,
    pub default_periods: Option<u32>,
    pub default_lead_time_days: Option<u32>,
    pub report_parallel: Option<bool>,
    pub plot_output_dir: Option<PathBuf>,
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

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://restock.db?mode=rwc".to_string(), max_connections: 5, timeout_secs: 30 }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            interval_width: 0.8,
            default_periods: 30,
            weekly_seasonality: SeasonalityMode::Auto,
            yearly_seasonality: SeasonalityMode::Auto,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { default_lead_time_days: DEFAULT_LEAD_TIME_DAYS }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { parallel: true, fill_missing_days: false }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("static") }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl std::str::FromStr for SeasonalityMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "enabled" | "on" | "true" => Ok(Self::Enabled),
            "disabled" | "off" | "false" => Ok(Self::Disabled),
            other => Err(ConfigError::Validation(format!(
                "unsupported seasonality mode `{other}` (expected auto|enabled|disabled)"
            ))),
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("restock.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(forecast) = patch.forecast {
            if let Some(interval_width) = forecast.interval_width {
                self.forecast.interval_width = interval_width;
            }
            if let Some(default_periods) = forecast.default_periods {
                self.forecast.default_periods = default_periods;
            }
            if let Some(weekly) = forecast.weekly_seasonality {
                self.forecast.weekly_seasonality = weekly;
            }
            if let Some(yearly) = forecast.yearly_seasonality {
                self.forecast.yearly_seasonality = yearly;
            }
        }

        if let Some(recommendation) = patch.recommendation {
            if let Some(days) = recommendation.default_lead_time_days {
                self.recommendation.default_lead_time_days = days;
            }
        }

        if let Some(report) = patch.report {
            if let Some(parallel) = report.parallel {
                self.report.parallel = parallel;
            }
            if let Some(fill_missing_days) = report.fill_missing_days {
                self.report.fill_missing_days = fill_missing_days;
            }
        }

        if let Some(plot) = patch.plot {
            if let Some(output_dir) = plot.output_dir {
                self.plot.output_dir = output_dir;
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
        if let Some(value) = read_env("RESTOCK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("RESTOCK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("RESTOCK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("RESTOCK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RESTOCK_FORECAST_INTERVAL_WIDTH") {
            self.forecast.interval_width = parse_f64("RESTOCK_FORECAST_INTERVAL_WIDTH", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_FORECAST_DEFAULT_PERIODS") {
            self.forecast.default_periods = parse_u32("RESTOCK_FORECAST_DEFAULT_PERIODS", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_FORECAST_WEEKLY_SEASONALITY") {
            self.forecast.weekly_seasonality = value.parse()?;
        }
        if let Some(value) = read_env("RESTOCK_FORECAST_YEARLY_SEASONALITY") {
            self.forecast.yearly_seasonality = value.parse()?;
        }

        if let Some(value) = read_env("RESTOCK_RECOMMENDATION_DEFAULT_LEAD_TIME_DAYS") {
            self.recommendation.default_lead_time_days =
                parse_u32("RESTOCK_RECOMMENDATION_DEFAULT_LEAD_TIME_DAYS", &value)?;
        }

        if let Some(value) = read_env("RESTOCK_REPORT_PARALLEL") {
            self.report.parallel = parse_bool("RESTOCK_REPORT_PARALLEL", &value)?;
        }
        if let Some(value) = read_env("RESTOCK_REPORT_FILL_MISSING_DAYS") {
            self.report.fill_missing_days = parse_bool("RESTOCK_REPORT_FILL_MISSING_DAYS", &value)?;
        }

        if let Some(value) = read_env("RESTOCK_PLOT_OUTPUT_DIR") {
            self.plot.output_dir = PathBuf::from(value);
        }

        let log_level = read_env("RESTOCK_LOGGING_LEVEL").or_else(|| read_env("RESTOCK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RESTOCK_LOGGING_FORMAT").or_else(|| read_env("RESTOCK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(interval_width) = overrides.interval_width {
            self.forecast.interval_width = interval_width;
        }
        if let Some(default_periods) = overrides.default_periods {
            self.forecast.default_periods = default_periods;
        }
        if let Some(days) = overrides.default_lead_time_days {
            self.recommendation.default_lead_time_days = days;
        }
        if let Some(parallel) = overrides.report_parallel {
            self.report.parallel = parallel;
        }
        if let Some(output_dir) = overrides.plot_output_dir {
            self.plot.output_dir = output_dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_forecast(&self.forecast)?;
        validate_recommendation(&self.recommendation)?;
        validate_plot(&self.plot)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("restock.toml"), PathBuf::from("config/restock.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_forecast(forecast: &ForecastConfig) -> Result<(), ConfigError> {
    if !(forecast.interval_width > 0.0 && forecast.interval_width < 1.0) {
        return Err(ConfigError::Validation(
            "forecast.interval_width must be strictly between 0 and 1".to_string(),
        ));
    }

    if forecast.default_periods == 0 || forecast.default_periods > MAX_HORIZON_DAYS {
        return Err(ConfigError::Validation(
            "forecast.default_periods must be in range 1..=3650".to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendation(recommendation: &RecommendationConfig) -> Result<(), ConfigError> {
    if recommendation.default_lead_time_days == 0
        || recommendation.default_lead_time_days > MAX_HORIZON_DAYS
    {
        return Err(ConfigError::Validation(
            "recommendation.default_lead_time_days must be in range 1..=3650".to_string(),
        ));
    }

    Ok(())
}

fn validate_plot(plot: &PlotConfig) -> Result<(), ConfigError> {
    if plot.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("plot.output_dir must not be empty".to_string()));
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

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
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
    database: Option<DatabasePatch>,
    forecast: Option<ForecastPatch>,
    recommendation: Option<RecommendationPatch>,
    report: Option<ReportPatch>,
    plot: Option<PlotPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastPatch {
    interval_width: Option<f64>,
    default_periods: Option<u32>,
    weekly_seasonality: Option<SeasonalityMode>,
    yearly_seasonality: Option<SeasonalityMode>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    default_lead_time_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    parallel: Option<bool>,
    fill_missing_days: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PlotPatch {
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
