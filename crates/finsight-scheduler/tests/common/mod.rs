#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use finsight_bus::EventBus;
use finsight_client::{ApiError, ApiResult, SchedulerApi};
use finsight_scheduler::{ControllerOptions, ScheduleRegistry, SchedulerStatusController};
use finsight_schema::{NewSchedule, Schedule, ScheduleUpdate, SchedulerStatus};
use tokio::sync::oneshot;

pub type StatusGate = oneshot::Sender<ApiResult<SchedulerStatus>>;

/// Scripted scheduler service. Status calls answer from queued gates first,
/// then from the simulated server flag.
#[derive(Default)]
pub struct FakeSchedulerApi {
    pub server_active: AtomicBool,
    pub fail_status: AtomicBool,
    pub fail_start: AtomicBool,
    pub fail_stop: AtomicBool,
    pub fail_mutations: AtomicBool,
    pub status_calls: AtomicUsize,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub run_calls: AtomicUsize,
    status_gates: Mutex<VecDeque<oneshot::Receiver<ApiResult<SchedulerStatus>>>>,
    start_gate: Mutex<Option<oneshot::Receiver<()>>>,
    schedules: Mutex<Vec<Schedule>>,
}

impl FakeSchedulerApi {
    pub fn new(server_active: bool) -> Arc<Self> {
        let api = Self::default();
        api.server_active.store(server_active, Ordering::SeqCst);
        Arc::new(api)
    }

    pub fn gate_status(&self) -> StatusGate {
        let (tx, rx) = oneshot::channel();
        self.status_gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn gate_start(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.start_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn seed(&self, schedules: Vec<Schedule>) {
        *self.schedules.lock().unwrap() = schedules;
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn mutation_result(&self) -> ApiResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(ApiError::Rejected {
                message: Some("registry unavailable".to_string()),
            })
        } else {
            Ok(())
        }
    }
}

pub fn schedule(id: &str, is_active: bool) -> Schedule {
    Schedule {
        id: id.to_string(),
        name: format!("schedule {id}"),
        workflow_id: "wf-etf".to_string(),
        cron_expression: "0 2 * * *".to_string(),
        is_active,
        last_run: None,
        next_run: None,
    }
}

pub fn active(is_active: bool) -> ApiResult<SchedulerStatus> {
    Ok(SchedulerStatus::placeholder(is_active))
}

#[async_trait]
impl SchedulerApi for FakeSchedulerApi {
    async fn status(&self) -> ApiResult<SchedulerStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.status_gates.lock().unwrap().pop_front();
        if let Some(gate) = gate {
            return gate
                .await
                .unwrap_or_else(|_| Err(ApiError::Decode("gate dropped".to_string())));
        }
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(ApiError::Decode("status endpoint unavailable".to_string()));
        }
        active(self.server_active.load(Ordering::SeqCst))
    }

    async fn start(&self) -> ApiResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.start_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected {
                message: Some("scheduler failed to initialize".to_string()),
            });
        }
        self.server_active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> ApiResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected {
                message: Some("scheduler refused to stop".to_string()),
            });
        }
        self.server_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn list_schedules(&self) -> ApiResult<Vec<Schedule>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.schedules.lock().unwrap().clone())
    }

    async fn create_schedule(&self, new: &NewSchedule) -> ApiResult<Schedule> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_result()?;
        let mut schedules = self.schedules.lock().unwrap();
        let created = Schedule {
            id: format!("s-{}", schedules.len() + 1),
            name: new.name.clone(),
            workflow_id: new.workflow_id.clone(),
            cron_expression: new.cron_expression.clone(),
            is_active: new.is_active,
            last_run: None,
            next_run: None,
        };
        schedules.push(created.clone());
        Ok(created)
    }

    async fn update_schedule(&self, id: &str, update: &ScheduleUpdate) -> ApiResult<Schedule> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_result()?;
        let mut schedules = self.schedules.lock().unwrap();
        let Some(found) = schedules.iter_mut().find(|s| s.id == id) else {
            return Err(ApiError::Rejected {
                message: Some(format!("schedule {id} not found")),
            });
        };
        if let Some(is_active) = update.is_active {
            found.is_active = is_active;
        }
        if let Some(name) = &update.name {
            found.name = name.clone();
        }
        if let Some(expr) = &update.cron_expression {
            found.cron_expression = expr.clone();
        }
        Ok(found.clone())
    }

    async fn delete_schedule(&self, id: &str) -> ApiResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_result()?;
        self.schedules.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn run_schedule(&self, _id: &str) -> ApiResult<()> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        self.mutation_result()
    }
}

pub struct Harness {
    pub api: Arc<FakeSchedulerApi>,
    pub bus: EventBus,
    pub registry: Arc<ScheduleRegistry>,
    pub controller: Arc<SchedulerStatusController>,
}

pub fn harness(api: Arc<FakeSchedulerApi>) -> Harness {
    let bus = EventBus::new(64);
    let dyn_api: Arc<dyn SchedulerApi> = api.clone();
    let registry = Arc::new(ScheduleRegistry::new(Arc::clone(&dyn_api), bus.publisher()));
    let controller = SchedulerStatusController::new(
        dyn_api,
        Arc::clone(&registry),
        bus.publisher(),
        ControllerOptions::default(),
    );
    Harness {
        api,
        bus,
        registry,
        controller,
    }
}

/// Sleeps in small steps so paused-clock timers keep advancing.
pub async fn wait_for(counter: &AtomicUsize, at_least: usize) {
    while counter.load(Ordering::SeqCst) < at_least {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
