use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheduler status as reported by `GET /api/scheduler/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_active: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub stats: Option<SchedulerStats>,
}

impl SchedulerStatus {
    /// Placeholder shown between a successful start/stop and the reconciling fetch.
    pub fn placeholder(is_active: bool) -> Self {
        Self {
            is_active,
            timestamp: Utc::now(),
            stats: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub total_jobs: u32,
    pub running_jobs: u32,
    pub error_count: u32,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub jobs: Vec<SchedulerJob>,
}

/// Background job summary owned by the remote scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerJob {
    pub id: String,
    pub name: String,
    pub cron_expression: String,
    pub is_running: bool,
    pub error_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
}

/// A cron binding of a workflow, as stored by the remote registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub name: String,
    pub workflow_id: String,
    pub cron_expression: String,
    pub is_active: bool,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
}

/// Body of `POST /api/scheduler/workflows`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewSchedule {
    pub name: String,
    pub workflow_id: String,
    pub cron_expression: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Body of `PUT /api/scheduler/workflows/:id`. Absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ScheduleUpdate {
    pub fn toggle(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.workflow_id.is_none()
            && self.cron_expression.is_none()
            && self.is_active.is_none()
    }
}

/// `{ success: bool }` acknowledgement returned by action endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Client-side belief about whether the remote scheduler is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Belief {
    #[default]
    Unknown,
    Active,
    Inactive,
}

impl Belief {
    pub fn from_active(is_active: bool) -> Self {
        if is_active {
            Belief::Active
        } else {
            Belief::Inactive
        }
    }

    /// Tri-state view: `None` while unknown.
    pub fn as_intent(self) -> Option<bool> {
        match self {
            Belief::Unknown => None,
            Belief::Active => Some(true),
            Belief::Inactive => Some(false),
        }
    }
}

impl fmt::Display for Belief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Belief::Unknown => "unknown",
            Belief::Active => "active",
            Belief::Inactive => "inactive",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// Scheduler-side action that produces a user-visible notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleAction {
    Start,
    Stop,
    CreateSchedule,
    UpdateSchedule,
    ToggleSchedule,
    DeleteSchedule,
    RunSchedule,
}

impl fmt::Display for ConsoleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConsoleAction::Start => "start scheduler",
            ConsoleAction::Stop => "stop scheduler",
            ConsoleAction::CreateSchedule => "create schedule",
            ConsoleAction::UpdateSchedule => "update schedule",
            ConsoleAction::ToggleSchedule => "toggle schedule",
            ConsoleAction::DeleteSchedule => "delete schedule",
            ConsoleAction::RunSchedule => "run schedule",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConsoleEvent {
    Notification {
        id: Uuid,
        level: NotificationLevel,
        action: ConsoleAction,
        message: String,
        at: DateTime<Utc>,
    },
    BeliefChanged {
        from: Belief,
        to: Belief,
    },
    StatusFetchFailed {
        error: String,
    },
    SchedulesRefreshed {
        count: usize,
    },
}

impl ConsoleEvent {
    pub fn notification(
        level: NotificationLevel,
        action: ConsoleAction,
        message: impl Into<String>,
    ) -> Self {
        ConsoleEvent::Notification {
            id: Uuid::new_v4(),
            level,
            action,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

fn default_true() -> bool {
    true
}
