use finsight_bus::BusPublisher;
use finsight_schema::{ConsoleAction, ConsoleEvent, NotificationLevel};

pub(crate) async fn announce(
    bus: &BusPublisher,
    level: NotificationLevel,
    action: ConsoleAction,
    message: impl Into<String>,
) {
    let event = ConsoleEvent::notification(level, action, message);
    if let Err(e) = bus.publish(event).await {
        tracing::error!(error = %e, %action, "failed to publish console notification");
    }
}

pub(crate) async fn emit(bus: &BusPublisher, event: ConsoleEvent) {
    if let Err(e) = bus.publish(event).await {
        tracing::error!(error = %e, "failed to publish console event");
    }
}
