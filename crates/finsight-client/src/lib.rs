//! REST seam to the remote scheduler service.
//!
//! [`SchedulerApi`] is what the controller and the schedule registry depend on;
//! [`HttpSchedulerApi`] is the reqwest implementation of the `/api/scheduler` endpoints.

pub mod error;
pub mod http;

use async_trait::async_trait;
use finsight_schema::{NewSchedule, Schedule, ScheduleUpdate, SchedulerStatus};

pub use error::{ApiError, ApiResult};
pub use http::{HttpSchedulerApi, HttpSchedulerApiBuilder};

#[async_trait]
pub trait SchedulerApi: Send + Sync {
    async fn status(&self) -> ApiResult<SchedulerStatus>;
    async fn start(&self) -> ApiResult<()>;
    async fn stop(&self) -> ApiResult<()>;

    async fn list_schedules(&self) -> ApiResult<Vec<Schedule>>;
    async fn create_schedule(&self, schedule: &NewSchedule) -> ApiResult<Schedule>;
    async fn update_schedule(&self, id: &str, update: &ScheduleUpdate) -> ApiResult<Schedule>;
    async fn delete_schedule(&self, id: &str) -> ApiResult<()>;
    async fn run_schedule(&self, id: &str) -> ApiResult<()>;
}
