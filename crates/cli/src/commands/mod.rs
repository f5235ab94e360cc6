pub mod config;
pub mod doctor;
pub mod forecast;
pub mod import_sales;
pub mod migrate;
pub mod plot;
pub mod product;
pub mod recommend;
pub mod report;
pub mod seed;

use std::future::Future;

use restock_core::config::{AppConfig, LoadOptions};
use restock_core::errors::{ApplicationError, InterfaceError};
use restock_core::service::ReplenishmentService;
use restock_db::{connect_from_config, migrations, DbPool, SqlInventoryStore};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::with_status(command, "ok", None, message, None, 0)
    }

    pub fn success_with_data<T: Serialize>(
        command: &str,
        message: impl Into<String>,
        data: &T,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::with_status(command, "ok", None, message, Some(data), 0),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    /// Neutral outcome for a product without usable data.
    pub fn no_data<T: Serialize>(
        command: &str,
        message: impl Into<String>,
        data: Option<&T>,
    ) -> Self {
        let data = data.and_then(|data| serde_json::to_value(data).ok());
        Self::with_status(command, "no_data", None, message, data, 0)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::with_status(command, "error", Some(error_class), message, None, exit_code)
    }

    /// Maps a service error to its interface class and a user-safe message.
    pub fn from_application_error(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
    ) -> Self {
        warn!(
            event_name = "cli.command.application_error",
            command,
            correlation_id,
            error = %error,
            "command failed"
        );
        let interface = error.into_interface(correlation_id);
        let message = match &interface {
            InterfaceError::BadRequest { message, .. } => {
                format!("{} ({message})", interface.user_message())
            }
            _ => interface.user_message().to_string(),
        };
        match interface {
            InterfaceError::NotFound { .. } => Self::no_data::<Value>(command, message, None),
            InterfaceError::BadRequest { .. } => {
                Self::failure(command, interface.error_class(), message, 7)
            }
            InterfaceError::ServiceUnavailable { .. } => {
                Self::failure(command, interface.error_class(), message, 4)
            }
            InterfaceError::Internal { .. } => {
                Self::failure(command, interface.error_class(), message, 1)
            }
        }
    }

    fn with_status(
        command: &str,
        status: &str,
        error_class: Option<&str>,
        message: impl Into<String>,
        data: Option<Value>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class: error_class.map(str::to_string),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Error triple carried out of async command bodies: class, message, exit code.
pub(crate) type Failure = (&'static str, String, u8);

pub(crate) fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_from_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) type SqlService = ReplenishmentService<SqlInventoryStore>;

/// Runs `body` against a service backed by the configured database.
///
/// Setup failures and service errors both come back as a ready-made
/// `CommandResult`.
pub(crate) fn with_service<T, F, Fut>(
    command: &str,
    config: &AppConfig,
    body: F,
) -> Result<T, CommandResult>
where
    F: FnOnce(SqlService) -> Fut,
    Fut: Future<Output = Result<T, ApplicationError>>,
{
    let runtime = build_runtime(command)?;
    let correlation_id = new_correlation_id();
    debug!(event_name = "cli.command.started", command, correlation_id, "command started");

    let outcome = runtime.block_on(async {
        let pool = open_database(config).await?;
        let store = SqlInventoryStore::from_pool(pool.clone());
        let result = body(ReplenishmentService::from_config(store, config)).await;
        pool.close().await;
        Ok::<_, Failure>(result)
    });

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            Err(CommandResult::from_application_error(command, error, &correlation_id))
        }
        Err((error_class, message, exit_code)) => {
            Err(CommandResult::failure(command, error_class, message, exit_code))
        }
    }
}
