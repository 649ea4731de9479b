use std::sync::Arc;

use finsight_bus::BusPublisher;
use finsight_client::{ApiError, SchedulerApi};
use finsight_schema::{
    ConsoleAction, ConsoleEvent, NewSchedule, NotificationLevel, Schedule, ScheduleUpdate,
};
use tokio::sync::RwLock;

use crate::notify::{announce, emit};
use crate::{validate_new_schedule, validate_update, ControllerError, ValidationError};

/// Cached view of the remote workflow schedule list.
///
/// Every successful mutation refetches the list once so `isActive`, `lastRun` and
/// `nextRun` reflect the server. Failed mutations leave the cache untouched.
pub struct ScheduleRegistry {
    api: Arc<dyn SchedulerApi>,
    bus: BusPublisher,
    cache: RwLock<Option<Vec<Schedule>>>,
}

impl ScheduleRegistry {
    pub fn new(api: Arc<dyn SchedulerApi>, bus: BusPublisher) -> Self {
        Self {
            api,
            bus,
            cache: RwLock::new(None),
        }
    }

    /// Cached list, fetched on first use or after a failed refetch.
    pub async fn list(&self) -> Result<Vec<Schedule>, ControllerError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }
        self.refresh().await
    }

    pub async fn cached(&self) -> Option<Vec<Schedule>> {
        self.cache.read().await.clone()
    }

    pub async fn refresh(&self) -> Result<Vec<Schedule>, ControllerError> {
        match self.api.list_schedules().await {
            Ok(schedules) => {
                *self.cache.write().await = Some(schedules.clone());
                emit(
                    &self.bus,
                    ConsoleEvent::SchedulesRefreshed {
                        count: schedules.len(),
                    },
                )
                .await;
                Ok(schedules)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to refresh workflow schedules");
                *self.cache.write().await = None;
                Err(ControllerError::TransientFetch(e))
            }
        }
    }

    /// Drops the cached list and refetches it once.
    pub async fn invalidate(&self) {
        // A failed refetch leaves the cache empty so the next `list` retries.
        let _ = self.refresh().await;
    }

    pub async fn create(&self, schedule: NewSchedule) -> Result<Schedule, ControllerError> {
        validate_new_schedule(&schedule)?;
        let result = self.api.create_schedule(&schedule).await;
        let created = self.finish(ConsoleAction::CreateSchedule, result).await?;
        tracing::info!(schedule_id = %created.id, name = %created.name, "workflow schedule created");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        update: ScheduleUpdate,
    ) -> Result<Schedule, ControllerError> {
        require_id(id)?;
        validate_update(&update)?;
        let result = self.api.update_schedule(id, &update).await;
        self.finish(ConsoleAction::UpdateSchedule, result).await
    }

    pub async fn set_active(&self, id: &str, is_active: bool) -> Result<Schedule, ControllerError> {
        require_id(id)?;
        let result = self
            .api
            .update_schedule(id, &ScheduleUpdate::toggle(is_active))
            .await;
        self.finish(ConsoleAction::ToggleSchedule, result).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ControllerError> {
        require_id(id)?;
        let result = self.api.delete_schedule(id).await;
        self.finish(ConsoleAction::DeleteSchedule, result).await
    }

    /// Triggers an immediate run; the refetch picks up the new `lastRun`.
    pub async fn run_now(&self, id: &str) -> Result<(), ControllerError> {
        require_id(id)?;
        let result = self.api.run_schedule(id).await;
        self.finish(ConsoleAction::RunSchedule, result).await
    }

    async fn finish<T>(
        &self,
        action: ConsoleAction,
        result: Result<T, ApiError>,
    ) -> Result<T, ControllerError> {
        match result {
            Ok(value) => {
                self.invalidate().await;
                announce(&self.bus, NotificationLevel::Success, action, success_message(action))
                    .await;
                Ok(value)
            }
            Err(source) => {
                tracing::warn!(error = %source, %action, "workflow schedule action failed");
                announce(
                    &self.bus,
                    NotificationLevel::Error,
                    action,
                    format!("Failed to {action}: {source}"),
                )
                .await;
                Err(ControllerError::Action { action, source })
            }
        }
    }
}

fn require_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::MissingField("schedule id"));
    }
    Ok(())
}

pub(crate) fn success_message(action: ConsoleAction) -> &'static str {
    match action {
        ConsoleAction::CreateSchedule => "Schedule created",
        ConsoleAction::UpdateSchedule => "Schedule updated",
        ConsoleAction::ToggleSchedule => "Schedule status updated",
        ConsoleAction::DeleteSchedule => "Schedule deleted",
        ConsoleAction::RunSchedule => "Workflow run triggered",
        ConsoleAction::Start => "Scheduler started",
        ConsoleAction::Stop => "Scheduler stopped",
    }
}
