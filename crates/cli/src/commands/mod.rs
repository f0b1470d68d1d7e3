pub mod checkout;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod order;
pub mod price_list;
pub mod seed;

use serde::Serialize;
use serde_json::Value;
use stockroom_core::chrono::Utc;
use stockroom_core::config::{AppConfig, LoadOptions};
use stockroom_core::errors::{FulfillmentError, InterfaceError};
use stockroom_db::{connect_with_config, migrations, DbPool};

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
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps a fulfillment outcome onto the user-facing message and exit code.
    /// The detailed error stays in `data.detail` for operators.
    pub fn fulfillment_failure(command: &str, error: FulfillmentError) -> Self {
        let error_class = error.error_class();
        let detail = error.to_string();
        let correlation_id = format!("{command}-{}", Utc::now().timestamp_millis());
        let interface = error.into_interface(correlation_id.clone());
        let exit_code = match interface {
            InterfaceError::BadRequest { .. } => 6,
            InterfaceError::InsufficientStock { .. } => 7,
            InterfaceError::Conflict { .. } => 8,
            InterfaceError::Internal { .. } => 9,
        };

        Self::failure_with_data(
            command,
            error_class,
            interface.user_message(),
            exit_code,
            Some(serde_json::json!({ "detail": detail, "correlation_id": correlation_id })),
        )
    }
}

/// Loads config and builds the single-threaded runtime every command runs on.
pub(crate) fn prepare(
    command: &str,
) -> Result<(AppConfig, tokio::runtime::Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

/// Connects and brings the schema up to date.
pub(crate) async fn open_pool(command: &str, config: &AppConfig) -> Result<DbPool, CommandResult> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| CommandResult::failure(command, "db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| CommandResult::failure(command, "migration", error.to_string(), 5))?;
    Ok(pool)
}

pub(crate) fn to_data(command: &str, value: &impl Serialize) -> Result<Value, CommandResult> {
    serde_json::to_value(value)
        .map_err(|error| CommandResult::failure(command, "serialization", error.to_string(), 9))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
