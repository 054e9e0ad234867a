use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::handlers::{SHEET_TENANTS, STATUS_ACTIVE};
use crate::server::AppState;
use crate::sheets::GoogleSheetsClient;
use crate::util::{parse_date, reminder_message};

/// Tenants further than this from their due date are not reminded.
const REMINDER_WINDOW_DAYS: i64 = 7;

/// Thin wrapper over tokio-cron-scheduler carrying the backup and reminder
/// jobs. Jobs run on the runtime's timer; nothing here touches request state.
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Register a recurring job. `task` is a factory invoked once per tick,
    /// returning the future for that run; it must own its captures (the jobs
    /// below clone their `Arc`s per run) since ticks can outlive the caller.
    pub async fn add_cron_job<F>(&self, cron_expr: &str, name: &str, task: F) -> Result<()>
    where
        F: Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let job_name = name.to_string();
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let name = job_name.clone();
            let fut = task();
            Box::pin(async move {
                info!("Running scheduled task: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create cron job: {}", name))?;

        self.inner
            .add(job)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;

        info!("Scheduled task '{}' with cron: {}", name, cron_expr);
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }
}

/// Cron expression for the backup cadence. Intervals of a day or more run
/// once nightly since the hour field only covers 0-23.
fn backup_cron(frequency_hours: u32) -> String {
    if frequency_hours == 0 || frequency_hours >= 24 {
        "0 0 3 * * *".to_string()
    } else {
        format!("0 0 */{frequency_hours} * * *")
    }
}

/// Start the background jobs: periodic spreadsheet backup (when enabled) and
/// the daily payment-reminder run. Job failures are logged, never fatal.
pub async fn start_background_jobs(state: AppState, sheets: Arc<GoogleSheetsClient>) -> Result<()> {
    let scheduler = Scheduler::new().await?;

    if state.config.backup.enabled {
        let cron = backup_cron(state.config.backup.frequency_hours);
        scheduler
            .add_cron_job(&cron, "spreadsheet-backup", move || {
                let sheets = sheets.clone();
                Box::pin(async move {
                    if let Err(e) = sheets.create_backup().await {
                        error!("Spreadsheet backup failed: {:#}", e);
                    }
                })
            })
            .await?;
    }

    scheduler
        .add_cron_job("0 0 9 * * *", "payment-reminders", move || {
            let state = state.clone();
            Box::pin(async move {
                if let Err(e) = send_payment_reminders(&state).await {
                    error!("Payment reminder run failed: {:#}", e);
                }
            })
        })
        .await?;

    scheduler.start().await
}

/// Send a due-date reminder to every active tenant within the reminder
/// window (or overdue). Per-tenant send failures are logged and skipped.
pub async fn send_payment_reminders(state: &AppState) -> Result<()> {
    let rows = state.store.get_all(SHEET_TENANTS).await?;
    let today = Local::now().date_naive();

    for tenant in &rows {
        if tenant.get("Status").map(String::as_str) != Some(STATUS_ACTIVE) {
            continue;
        }
        let (Some(name), Some(room), Some(phone)) = (
            tenant.get("Nama"),
            tenant.get("Kamar"),
            tenant.get("Telepon"),
        ) else {
            continue;
        };
        let Some(due) = tenant.get("JatuhTempo").and_then(|s| parse_date(s)) else {
            continue;
        };

        let days_until_due = (due - today).num_days();
        if days_until_due > REMINDER_WINDOW_DAYS {
            continue;
        }

        let text = reminder_message(name, room, days_until_due);
        if let Err(e) = state.gateway.send(phone, &text).await {
            warn!("Reminder to {} failed: {:#}", phone, e);
        }
    }
    Ok(())
}
