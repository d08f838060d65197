use anyhow::Result;
use chrono::{DateTime, Local, Timelike};
use uuid::Uuid;

use crate::models::Task;

/// Fixed summary line on every reminder, matching the app title bar.
pub const APP_NAME: &str = "Flow.";

/// Delivery backend. The desktop implementation talks to the OS
/// notification service; tests substitute a recording one.
pub trait Notifier {
    fn request_permission(&mut self) -> Result<()>;
    fn deliver(&mut self, summary: &str, body: &str) -> Result<()>;
}

pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn request_permission(&mut self) -> Result<()> {
        // The desktop bus has no grant/deny prompt; probing the server
        // capabilities is the closest launch-time check.
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            let caps = notify_rust::get_capabilities()?;
            log::debug!("notification server capabilities: {caps:?}");
        }
        Ok(())
    }

    fn deliver(&mut self, summary: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(summary)
            .body(body)
            .show()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PendingReminder {
    id: Uuid,
    fire_at: DateTime<Local>,
    body: String,
}

/// Holds at most one pending reminder per task id and fires each exactly
/// once when its trigger time comes around.
pub struct ReminderScheduler {
    backend: Box<dyn Notifier>,
    pending: Vec<PendingReminder>,
}

impl ReminderScheduler {
    pub fn new(backend: Box<dyn Notifier>) -> Self {
        ReminderScheduler {
            backend,
            pending: Vec::new(),
        }
    }

    /// One-shot launch-time probe; the outcome never gates scheduling.
    pub fn request_permission(&mut self) {
        match self.backend.request_permission() {
            Ok(()) => log::debug!("notification server ready"),
            Err(err) => log::warn!("notification permission probe failed: {err}"),
        }
    }

    /// Queues a reminder for the task, replacing any pending one with the
    /// same id. The trigger keeps the date the reminder time carries, not
    /// "next occurrence of this time of day"; a trigger already in the
    /// past never fires.
    pub fn schedule(&mut self, task: &Task) {
        self.schedule_at(task, Local::now());
    }

    pub fn schedule_at(&mut self, task: &Task, now: DateTime<Local>) {
        self.cancel(task.id);
        let fire_at = trigger_instant(task.reminder_time);
        if fire_at <= now {
            log::debug!("reminder for {} already past, not queued", task.id);
            return;
        }
        self.pending.push(PendingReminder {
            id: task.id,
            fire_at,
            body: reminder_body(task),
        });
    }

    /// Fires every reminder whose trigger has come due, dropping each from
    /// the queue whether or not delivery worked.
    pub fn deliver_due(&mut self, now: DateTime<Local>) -> usize {
        let mut fired = 0;
        let mut remaining = Vec::with_capacity(self.pending.len());
        for reminder in self.pending.drain(..) {
            if reminder.fire_at > now {
                remaining.push(reminder);
                continue;
            }
            if let Err(err) = self.backend.deliver(APP_NAME, &reminder.body) {
                log::warn!("failed to deliver reminder for {}: {err}", reminder.id);
            }
            fired += 1;
        }
        self.pending = remaining;
        fired
    }

    fn cancel(&mut self, id: Uuid) {
        self.pending.retain(|r| r.id != id);
    }

    #[cfg(test)]
    pub fn pending_snapshot(&self) -> Vec<(Uuid, DateTime<Local>)> {
        self.pending.iter().map(|r| (r.id, r.fire_at)).collect()
    }
}

fn reminder_body(task: &Task) -> String {
    format!("Reminder: {} at {}", task.title, task.reminder_label())
}

/// Minute-precision trigger: seconds and below are not significant.
fn trigger_instant(time: DateTime<Local>) -> DateTime<Local> {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

#[cfg(test)]
pub mod recorder {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Test backend that records deliveries instead of hitting the bus.
    #[derive(Default, Clone)]
    pub struct RecordingNotifier {
        pub delivered: Rc<RefCell<Vec<(String, String)>>>,
        pub fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn request_permission(&mut self) -> Result<()> {
            Ok(())
        }

        fn deliver(&mut self, summary: &str, body: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("delivery refused");
            }
            self.delivered
                .borrow_mut()
                .push((summary.to_string(), body.to_string()));
            Ok(())
        }
    }
}
