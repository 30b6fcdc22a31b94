/// Deadline scheduler
///
/// Periodically scans open tasks near or past their deadline and sends
/// reminders through the chat transport.
///
/// # Pass
///
/// ```text
/// DeadlineScheduler::run_pass(now)
///   ├─> Store: open tasks due in [now - lookback, now + 8h]
///   └─> for each task (shutdown checked between tasks):
///         ├─> ReminderKind::classify(due, now)
///         ├─> one-shot kind already recorded? skip
///         ├─> assignee in quiet hours? defer to a later pass
///         ├─> send to assignee unless they muted the kind
///         ├─> overdue: alert admins who accept overdue alerts now
///         └─> record one-shot kind
/// ```
///
/// A record is written only after the assignee delivery succeeds, so a failed
/// send is retried on the next pass. A muted kind is recorded without a
/// send. Failures are isolated per task.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskbot_shared::store::MemoryStore;
/// use taskbot_shared::transport::MockTransport;
/// use taskbot_worker::config::SchedulerConfig;
/// use taskbot_worker::scheduler::DeadlineScheduler;
///
/// # async fn example() {
/// let scheduler = DeadlineScheduler::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(MockTransport::new()),
///     SchedulerConfig::default(),
/// );
///
/// let shutdown = scheduler.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// scheduler.run().await;
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use taskbot_shared::models::settings::NotificationSetting;
use taskbot_shared::models::task::Task;
use taskbot_shared::models::user::User;
use taskbot_shared::store::{Store, StoreError};
use taskbot_shared::transport::{ChatTransport, DeliveryError, InlineButton, OutgoingMessage};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::reminders::{admin_overdue_text, assignee_text, ReminderKind};

/// Farthest deadline a pass looks at, in hours
pub const HORIZON_HOURS: i64 = 8;

/// Error while handling one task
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Assignee {0} not found")]
    AssigneeMissing(i64),
}

/// What happened to one task during a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Reminder delivered to the assignee
    Sent(ReminderKind),

    /// The assignee turned this kind off; recorded without a send
    Muted(ReminderKind),

    /// The assignee is in quiet hours; nothing recorded
    Deferred(ReminderKind),

    /// One-shot reminder already recorded, or nothing due
    Skipped,
}

/// Counters for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub scanned: usize,
    pub sent: usize,
    pub skipped: usize,
    pub muted: usize,
    pub deferred: usize,
    pub failed: usize,

    /// Shutdown was requested before every task was handled
    pub interrupted: bool,
}

/// Deadline scheduler
pub struct DeadlineScheduler {
    store: Arc<dyn Store>,
    transport: Arc<dyn ChatTransport>,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
}

impl DeadlineScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        transport: Arc<dyn ChatTransport>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Gets shutdown token
    ///
    /// Cancelling it stops the loop after the task currently being handled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs passes at the configured interval until shutdown
    ///
    /// The first pass starts immediately.
    pub async fn run(&self) {
        let interval = self.config.interval();
        tracing::info!(
            interval_secs = interval.as_secs(),
            lookback_hours = self.config.overdue_lookback_hours,
            "Deadline scheduler starting"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_pass(Utc::now()).await {
                Ok(summary) => tracing::info!(
                    scanned = summary.scanned,
                    sent = summary.sent,
                    skipped = summary.skipped,
                    muted = summary.muted,
                    deferred = summary.deferred,
                    failed = summary.failed,
                    "Scheduler pass finished"
                ),
                Err(e) => tracing::error!(error = %e, "Scheduler pass failed"),
            }
        }

        tracing::info!("Deadline scheduler shut down");
    }

    /// Runs one pass at `now`
    ///
    /// # Errors
    ///
    /// Returns an error only when the task query itself fails; per-task
    /// failures are logged and counted.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassSummary, SchedulerError> {
        let tasks = self
            .store
            .open_tasks_due_between(now - self.config.lookback(), now + Duration::hours(HORIZON_HOURS))
            .await?;

        let mut summary = PassSummary {
            scanned: tasks.len(),
            ..PassSummary::default()
        };

        for task in &tasks {
            if self.shutdown_token.is_cancelled() {
                tracing::info!("Shutdown requested, stopping pass early");
                summary.interrupted = true;
                break;
            }

            match self.process_task(task, now).await {
                Ok(TaskOutcome::Sent(_)) => summary.sent += 1,
                Ok(TaskOutcome::Muted(_)) => summary.muted += 1,
                Ok(TaskOutcome::Deferred(_)) => summary.deferred += 1,
                Ok(TaskOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(task_id = task.id, error = %e, "Failed to process task reminder");
                }
            }
        }

        Ok(summary)
    }

    async fn process_task(&self, task: &Task, now: DateTime<Utc>) -> Result<TaskOutcome, SchedulerError> {
        let Some(kind) = ReminderKind::classify(task.due_date, now) else {
            return Ok(TaskOutcome::Skipped);
        };

        let record = kind.record_kind();
        if let Some(record) = record {
            if self.store.notification_sent(task.id, record).await? {
                tracing::debug!(task_id = task.id, kind = %kind, "Reminder already sent");
                return Ok(TaskOutcome::Skipped);
            }
        }

        let assignee = self
            .store
            .find_user(task.assignee_id)
            .await?
            .ok_or(SchedulerError::AssigneeMissing(task.assignee_id))?;

        let settings = self.store.notification_settings(assignee.id).await?;
        if settings.is_quiet_at(now) {
            tracing::debug!(task_id = task.id, kind = %kind, "Assignee in quiet hours, reminder deferred");
            return Ok(TaskOutcome::Deferred(kind));
        }

        let muted = !settings.enabled(kind.setting());
        if muted {
            tracing::debug!(task_id = task.id, kind = %kind, "Reminder muted by assignee");
        } else {
            let message =
                OutgoingMessage::new(assignee.external_id.clone(), assignee_text(kind, task))
                    .with_button(InlineButton::open_task(task.id));
            self.transport.send_message(&message).await?;

            tracing::info!(
                task_id = task.id,
                kind = %kind,
                assignee_id = assignee.id,
                "Reminder sent"
            );
        }

        if kind.notifies_admins() {
            self.alert_admins(task, &assignee, now).await;
        }

        if let Some(record) = record {
            if !self.store.record_notification(task.id, record, now).await? {
                tracing::debug!(task_id = task.id, kind = %kind, "Reminder was recorded concurrently");
            }
        }

        Ok(if muted {
            TaskOutcome::Muted(kind)
        } else {
            TaskOutcome::Sent(kind)
        })
    }

    /// Sends the overdue alert to every admin other than the assignee
    ///
    /// Admins who turned overdue alerts off or are in quiet hours are left
    /// out. Failures are logged only; they never block the overdue record.
    async fn alert_admins(&self, task: &Task, assignee: &User, now: DateTime<Utc>) {
        let admins = match self.store.list_admins().await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::warn!(task_id = task.id, error = %e, "Could not load admins for overdue alert");
                return;
            }
        };

        let mut seen = HashSet::from([assignee.external_id.clone()]);
        let text = admin_overdue_text(task, assignee);
        let mut messages: Vec<OutgoingMessage> = Vec::new();
        for admin in admins {
            if !seen.insert(admin.external_id.clone()) {
                continue;
            }
            match self.store.notification_settings(admin.id).await {
                Ok(settings) if settings.accepts(NotificationSetting::Overdue, now) => {}
                Ok(_) => {
                    tracing::debug!(task_id = task.id, admin_id = admin.id, "Overdue alert muted by admin");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(task_id = task.id, admin_id = admin.id, error = %e, "Could not load admin settings");
                    continue;
                }
            }
            messages.push(
                OutgoingMessage::new(admin.external_id, text.clone())
                    .with_button(InlineButton::open_task(task.id)),
            );
        }

        let results = join_all(
            messages
                .iter()
                .map(|message| self.transport.send_message(message)),
        )
        .await;

        for (message, result) in messages.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(
                    task_id = task.id,
                    chat_id = %message.chat_id,
                    error = %e,
                    "Overdue alert to admin failed"
                );
            }
        }
    }
}
