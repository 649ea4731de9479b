use std::sync::Arc;

use anyhow::Result;
use finsight_bus::{EventBus, Topic};
use finsight_scheduler::SchedulerStatusController;

use crate::render::{event_line, status_lines};

/// Mounts the controller and prints status and events until Ctrl-C.
pub async fn run_watch(controller: &Arc<SchedulerStatusController>, bus: &EventBus) -> Result<()> {
    let mut notifications = bus.subscribe(Topic::Notification).await;
    let mut transitions = bus.subscribe(Topic::BeliefChanged).await;
    let mut failures = bus.subscribe(Topic::StatusFetchFailed).await;
    let mut snapshots = controller.subscribe();

    let poller = controller.spawn_poller();
    let mut last_printed = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = snapshots.borrow_and_update().last_status.clone();
                if let Some(status) = status {
                    if last_printed != Some(status.timestamp) {
                        last_printed = Some(status.timestamp);
                        for line in status_lines(&status) {
                            println!("{line}");
                        }
                    }
                }
            }
            Some(event) = notifications.recv() => print_event(&event),
            Some(event) = transitions.recv() => print_event(&event),
            Some(event) = failures.recv() => print_event(&event),
        }
    }

    tracing::info!("stopping scheduler watch");
    poller.unmount().await;
    Ok(())
}

fn print_event(event: &finsight_schema::ConsoleEvent) {
    if let Some(line) = event_line(event) {
        println!("{line}");
    }
}
