use chrono::{DateTime, Utc};
use finsight_schema::{ConsoleEvent, NotificationLevel, Schedule, SchedulerStatus};

pub fn format_time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

pub fn status_lines(status: &SchedulerStatus) -> Vec<String> {
    let mut lines = vec![format!(
        "Scheduler: {} (as of {})",
        if status.is_active { "running" } else { "stopped" },
        status.timestamp.to_rfc3339()
    )];

    let Some(stats) = &status.stats else {
        return lines;
    };
    lines.push(format!(
        "Jobs: {} total, {} running, {} errors (updated {})",
        stats.total_jobs,
        stats.running_jobs,
        stats.error_count,
        stats.last_update.to_rfc3339()
    ));
    if stats.jobs.is_empty() {
        return lines;
    }

    lines.push(format!(
        "{:<20} {:<24} {:<16} {:<8} {:<8} {:<26}",
        "ID", "NAME", "CRON", "RUNNING", "ERRORS", "NEXT RUN"
    ));
    lines.push("-".repeat(106));
    for job in &stats.jobs {
        lines.push(format!(
            "{:<20} {:<24} {:<16} {:<8} {:<8} {:<26}",
            job.id,
            job.name,
            job.cron_expression,
            if job.is_running { "yes" } else { "no" },
            format!("{}/{}", job.error_count, job.max_retries),
            format_time(job.next_run),
        ));
    }
    lines
}

pub fn schedule_lines(schedules: &[Schedule]) -> Vec<String> {
    if schedules.is_empty() {
        return vec!["No workflow schedules.".to_string()];
    }

    let mut lines = vec![
        format!(
            "{:<16} {:<24} {:<16} {:<16} {:<8} {:<26}",
            "ID", "NAME", "WORKFLOW", "CRON", "ACTIVE", "NEXT RUN"
        ),
        "-".repeat(110),
    ];
    for schedule in schedules {
        lines.push(format!(
            "{:<16} {:<24} {:<16} {:<16} {:<8} {:<26}",
            schedule.id,
            schedule.name,
            schedule.workflow_id,
            schedule.cron_expression,
            if schedule.is_active { "yes" } else { "no" },
            format_time(schedule.next_run),
        ));
    }
    lines
}

/// One-line rendering of bus events for the terminal.
pub fn event_line(event: &ConsoleEvent) -> Option<String> {
    match event {
        ConsoleEvent::Notification { level, message, .. } => {
            let tag = match level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Info => "info",
                NotificationLevel::Error => "error",
            };
            Some(format!("[{tag}] {message}"))
        }
        ConsoleEvent::BeliefChanged { from, to } => Some(format!("scheduler {from} -> {to}")),
        ConsoleEvent::StatusFetchFailed { error } => {
            Some(format!("status unavailable, retrying: {error}"))
        }
        ConsoleEvent::SchedulesRefreshed { .. } => None,
    }
}
