use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use finsight_schema::{NewSchedule, ScheduleUpdate};

use crate::ValidationError;

/// Parses a 5-field (minute-first) or 6/7-field (seconds-first) cron expression.
pub fn parse_cron(expr: &str) -> Result<CronSchedule, ValidationError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("cron expression"));
    }
    CronSchedule::from_str(&normalize_cron_expr(trimmed)).map_err(|e| {
        ValidationError::InvalidCron {
            expr: trimmed.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Next `count` fire times strictly after `after`, for the schedule form preview.
pub fn preview_next_runs(
    expr: &str,
    after: DateTime<Utc>,
    count: usize,
) -> Result<Vec<DateTime<Utc>>, ValidationError> {
    let cron = parse_cron(expr)?;
    Ok(cron.after(&after).take(count).collect())
}

pub fn validate_new_schedule(schedule: &NewSchedule) -> Result<(), ValidationError> {
    if schedule.name.trim().is_empty() {
        return Err(ValidationError::MissingField("name"));
    }
    if schedule.workflow_id.trim().is_empty() {
        return Err(ValidationError::MissingField("workflow"));
    }
    parse_cron(&schedule.cron_expression)?;
    Ok(())
}

pub fn validate_update(update: &ScheduleUpdate) -> Result<(), ValidationError> {
    if update.is_empty() {
        return Err(ValidationError::EmptyUpdate);
    }
    if matches!(&update.name, Some(name) if name.trim().is_empty()) {
        return Err(ValidationError::MissingField("name"));
    }
    if matches!(&update.workflow_id, Some(id) if id.trim().is_empty()) {
        return Err(ValidationError::MissingField("workflow"));
    }
    if let Some(expr) = &update.cron_expression {
        parse_cron(expr)?;
    }
    Ok(())
}

/// Crontab (5 fields, Sunday = 0 or 7) to the `cron` crate's seconds-first form (Sunday = 1).
fn normalize_cron_expr(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 5 {
        return expr.to_string();
    }
    format!("0 {} {}", fields[..4].join(" "), crontab_weekdays(fields[4]))
}

fn crontab_weekdays(field: &str) -> String {
    field
        .split(',')
        .map(|term| weekday_term(term).unwrap_or_else(|| term.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Expands a numeric weekday term (`n`, `a-b`, `*/s`, `a-b/s`, `n/s`) into an explicit day list.
/// Named days and malformed terms return `None` and pass through untouched.
fn weekday_term(term: &str) -> Option<String> {
    let (range, step) = match term.split_once('/') {
        Some((range, step)) => (range, step.parse::<usize>().ok().filter(|s| *s > 0)?),
        None => (term, 1),
    };
    let (first, last) = match range {
        "*" if step == 1 => return Some("*".to_string()),
        "*" => (0, 6),
        _ => match range.split_once('-') {
            Some((a, b)) => (a.parse::<u8>().ok()?, b.parse::<u8>().ok()?),
            None => {
                let day = range.parse::<u8>().ok()?;
                (day, if step > 1 { 6 } else { day })
            }
        },
    };
    if first > last || last > 7 {
        return None;
    }

    let days: BTreeSet<u8> = (first..=last).step_by(step).map(|d| d % 7 + 1).collect();
    Some(
        days.iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}
