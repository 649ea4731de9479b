use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use finsight_scheduler::{preview_next_runs, ScheduleRegistry};
use finsight_schema::{NewSchedule, ScheduleUpdate};

use crate::render::schedule_lines;

#[derive(Subcommand)]
pub enum ScheduleCommands {
    #[command(about = "List workflow schedules")]
    List,
    #[command(about = "Create a workflow schedule")]
    Create {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Workflow ID to trigger")]
        workflow: String,
        #[arg(long, help = "Cron expression, e.g. \"0 2 * * *\"")]
        cron: String,
        #[arg(long, help = "Create the schedule disabled")]
        inactive: bool,
    },
    #[command(about = "Edit a workflow schedule")]
    Update {
        #[arg(help = "Schedule ID")]
        schedule_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        workflow: Option<String>,
        #[arg(long)]
        cron: Option<String>,
    },
    #[command(about = "Enable a workflow schedule")]
    Enable {
        #[arg(help = "Schedule ID")]
        schedule_id: String,
    },
    #[command(about = "Disable a workflow schedule")]
    Disable {
        #[arg(help = "Schedule ID")]
        schedule_id: String,
    },
    #[command(about = "Delete a workflow schedule")]
    Delete {
        #[arg(help = "Schedule ID")]
        schedule_id: String,
    },
    #[command(about = "Run a workflow schedule immediately")]
    Run {
        #[arg(help = "Schedule ID")]
        schedule_id: String,
    },
    #[command(about = "Preview upcoming fire times of a cron expression")]
    Preview {
        #[arg(help = "Cron expression")]
        cron: String,
        #[arg(long, default_value = "5")]
        count: usize,
    },
}

pub async fn handle_schedule_command(cmd: ScheduleCommands, registry: &ScheduleRegistry) -> Result<()> {
    match cmd {
        ScheduleCommands::List => {
            for line in schedule_lines(&registry.list().await?) {
                println!("{line}");
            }
        }
        ScheduleCommands::Create {
            name,
            workflow,
            cron,
            inactive,
        } => {
            let created = registry
                .create(NewSchedule {
                    name,
                    workflow_id: workflow,
                    cron_expression: cron,
                    is_active: !inactive,
                })
                .await?;
            println!("Created schedule '{}' ({}).", created.name, created.id);
        }
        ScheduleCommands::Update {
            schedule_id,
            name,
            workflow,
            cron,
        } => {
            let update = ScheduleUpdate {
                name,
                workflow_id: workflow,
                cron_expression: cron,
                is_active: None,
            };
            registry.update(&schedule_id, update).await?;
            println!("Updated schedule '{schedule_id}'.");
        }
        ScheduleCommands::Enable { schedule_id } => {
            registry.set_active(&schedule_id, true).await?;
            println!("Enabled schedule '{schedule_id}'.");
        }
        ScheduleCommands::Disable { schedule_id } => {
            registry.set_active(&schedule_id, false).await?;
            println!("Disabled schedule '{schedule_id}'.");
        }
        ScheduleCommands::Delete { schedule_id } => {
            registry.delete(&schedule_id).await?;
            println!("Deleted schedule '{schedule_id}'.");
        }
        ScheduleCommands::Run { schedule_id } => {
            registry.run_now(&schedule_id).await?;
            println!("Triggered schedule '{schedule_id}'.");
        }
        ScheduleCommands::Preview { cron, count } => {
            for run in preview_next_runs(&cron, Utc::now(), count)? {
                println!("{}", run.to_rfc3339());
            }
        }
    }
    Ok(())
}
