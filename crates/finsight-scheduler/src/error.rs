use finsight_client::ApiError;
use finsight_schema::ConsoleAction;
use thiserror::Error;

/// Failures surfaced by the controller and the schedule registry.
///
/// None of these are fatal to the console: fetch failures are retried by the
/// next poll tick, action failures leave local state untouched and may be retried.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("scheduler status fetch failed: {0}")]
    TransientFetch(#[source] ApiError),
    #[error("failed to {action}: {source}")]
    Action {
        action: ConsoleAction,
        #[source]
        source: ApiError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} is already in progress")]
    ActionInFlight(ConsoleAction),
    #[error("status response superseded by a newer request")]
    Superseded,
    #[error("scheduler view is unmounted")]
    Unmounted,
}

impl ControllerError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControllerError::TransientFetch(_)
                | ControllerError::Action { .. }
                | ControllerError::ActionInFlight(_)
        )
    }
}

/// Form errors caught before any request is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },
    #[error("update contains no changes")]
    EmptyUpdate,
}
