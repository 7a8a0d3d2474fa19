//! Periodic reminder checks for notes and the global reminder.
//!
//! Each reminder moves through INACTIVE → ARMED → FIRED → INACTIVE. Arming
//! stores a timestamp; a poll tick that observes `now >= timestamp` clears
//! the reminder first and then asks the host shell to raise the window, so
//! firing is edge-triggered exactly once no matter how late the tick runs.

use std::sync::{Arc, Weak};

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use crate::{HostShell, Note, NoteStore, NotesError, Result, SharedStore};

#[derive(Debug, Clone)]
pub enum SchedulerCommand {
    /// Run a reminder check immediately
    CheckNow,
    /// Stop the scheduler task
    Stop,
}

/// Drives reminder checks on a fixed period.
///
/// Mirrors the lifecycle of a long-running maintenance task: the scheduler
/// holds only a weak reference to the store, a command channel into the
/// task, and the task handle itself. Ticks run synchronously inside the
/// task, so no two checks ever overlap; a tick that comes due while one is
/// still running is simply skipped.
pub struct ReminderScheduler {
    /// Fixed poll period
    poll_period: Duration,

    /// Channel to send commands to the scheduler task
    command_tx: mpsc::Sender<SchedulerCommand>,

    /// Handle to the scheduler task
    task: Option<JoinHandle<()>>,

    /// Weak reference to the store
    store: Option<Weak<Mutex<NoteStore>>>,

    /// Host shell receiving the show-window signal
    host: Arc<dyn HostShell>,

    /// Whether the scheduler task is running
    is_running: bool,
}

impl ReminderScheduler {
    /// Creates a scheduler with the given poll period and host shell.
    pub fn new(poll_period: Duration, host: Arc<dyn HostShell>) -> Self {
        let (command_tx, _) = mpsc::channel(8);
        Self {
            poll_period,
            command_tx,
            task: None,
            store: None,
            host,
            is_running: false,
        }
    }

    /// Points the scheduler at the shared store.
    pub fn set_store(&mut self, store: &SharedStore) {
        self.store = Some(Arc::downgrade(store));
    }

    /// Starts the scheduler task.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running {
            return Ok(());
        }

        let weak = match &self.store {
            Some(weak) if weak.strong_count() > 0 => weak.clone(),
            _ => {
                error!("Reminder scheduler has no live store reference");
                return Err(NotesError::Application {
                    message: "reminder scheduler has no store reference".to_string(),
                });
            }
        };

        let (command_tx, mut command_rx) = mpsc::channel(8);
        self.command_tx = command_tx;

        let host = Arc::clone(&self.host);
        let period = self.poll_period;

        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            // A tick that comes due mid-check is dropped, never queued.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await; // Initial tick

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let Some(store) = weak.upgrade() else {
                            debug!("Store dropped, reminder scheduler exiting");
                            break;
                        };
                        let mut store = store.lock().await;
                        let fired = run_tick(&mut store, host.as_ref(), Note::now_ms());
                        if fired > 0 {
                            info!("Fired {} reminders", fired);
                        }
                    }
                    Some(cmd) = command_rx.recv() => match cmd {
                        SchedulerCommand::CheckNow => {
                            let Some(store) = weak.upgrade() else { break; };
                            let mut store = store.lock().await;
                            let fired = run_tick(&mut store, host.as_ref(), Note::now_ms());
                            debug!("Manual reminder check fired {} reminders", fired);
                        }
                        SchedulerCommand::Stop => {
                            info!("Reminder scheduler stopping");
                            break;
                        }
                    }
                }
            }
        });

        self.task = Some(task);
        self.is_running = true;
        info!(
            "Reminder scheduler started with a {}s poll period",
            self.poll_period.as_secs()
        );
        Ok(())
    }

    /// Runs a reminder check immediately, regardless of the schedule.
    pub async fn check_now(&self) -> Result<()> {
        if !self.is_running {
            return Err(NotesError::Application {
                message: "reminder scheduler is not running".to_string(),
            });
        }
        self.command_tx
            .send(SchedulerCommand::CheckNow)
            .await
            .map_err(|e| NotesError::Application {
                message: format!("failed to send check command: {e}"),
            })
    }

    /// Stops the scheduler task if it is running.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            if let Err(e) = self.command_tx.send(SchedulerCommand::Stop).await {
                error!("Failed to send stop command to reminder scheduler: {}", e);
                task.abort();
            }
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Reminder scheduler task ended abnormally: {}", e);
                }
            }
            self.is_running = false;
            info!("Reminder scheduler stopped");
        } else {
            debug!("Reminder scheduler is not running");
        }
        Ok(())
    }

    /// Whether the scheduler task is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running
    }
}

/// Runs one reminder poll against the store.
///
/// The global reminder is checked first, then every note in insertion
/// order. Each due reminder is cleared, a show-window signal is emitted for
/// it, and a fired note reminder additionally sets the store's search query
/// to the note's title so the triggering note is visibly surfaced. When
/// several reminders are due in the same tick, each is processed
/// independently and the last one processed determines the resulting query.
///
/// Returns the number of reminders fired.
pub fn run_tick(store: &mut NoteStore, host: &dyn HostShell, now: i64) -> usize {
    let mut fired = 0;

    if let Some(at) = store.take_due_global(now) {
        debug!("Global reminder armed for {} fired", at);
        fired += 1;
        request_front(host);
    }

    for (id, title) in store.take_due_note_reminders(now) {
        debug!("Reminder for note {} fired", id);
        fired += 1;
        request_front(host);
        store.set_search_query(title);
    }

    fired
}

/// Asks the host shell to raise the window; an unavailable shell is logged
/// and otherwise ignored, the reminder having already transitioned to fired.
fn request_front(host: &dyn HostShell) {
    if let Err(e) = host.show_window() {
        warn!("Window not raised: {}", e);
    }
}
