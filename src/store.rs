use chrono::{DateTime, Local};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::Task;
use crate::notify::ReminderScheduler;
use crate::storage::Storage;

/// Grace window between completing a task and dropping it from the
/// collection, so the list can show the change before the row is gone.
pub const REMOVAL_DELAY: Duration = Duration::from_secs(2);

struct PendingRemoval {
    id: Uuid,
    due: Instant,
}

/// Owns the ordered task collection and drives persistence and reminder
/// scheduling. The UI layer goes through this type for every mutation and
/// never touches storage or the scheduler directly.
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Storage,
    scheduler: ReminderScheduler,
    pending_removals: Vec<PendingRemoval>,
}

impl TaskStore {
    pub fn new(storage: Storage, scheduler: ReminderScheduler) -> Self {
        TaskStore {
            tasks: Vec::new(),
            storage,
            scheduler,
            pending_removals: Vec::new(),
        }
    }

    /// Replaces in-memory state with the persisted collection. Missing or
    /// undecodable data leaves the collection as it is.
    pub fn load(&mut self) {
        if let Some(tasks) = self.storage.load() {
            self.tasks = tasks;
        }
    }

    /// The full ordered collection, completed entries included.
    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    /// Only incomplete tasks render.
    pub fn visible(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_completed)
    }

    /// Appends a new task (append order is display order), queues its
    /// reminder, and flushes. Titles are taken as given, blank ones too.
    pub fn add(&mut self, title: &str, reminder_time: DateTime<Local>) -> Uuid {
        let task = Task::new(title, reminder_time);
        let id = task.id;
        self.scheduler.schedule(&task);
        self.tasks.push(task);
        self.storage.save(&self.tasks);
        id
    }

    /// In-place edit of one task's reminder time. The queued reminder keeps
    /// its original trigger and nothing is flushed until the next save
    /// point; an unknown id is a no-op.
    pub fn update_reminder_time(&mut self, id: Uuid, new_time: DateTime<Local>) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.reminder_time = new_time;
        }
    }

    /// Marks the task completed right away, so it leaves the rendered view,
    /// and queues its removal from the collection after [`REMOVAL_DELAY`].
    pub fn complete(&mut self, id: Uuid) {
        self.complete_at(id, Instant::now());
    }

    fn complete_at(&mut self, id: Uuid, now: Instant) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.is_completed = true;
            self.pending_removals.push(PendingRemoval {
                id,
                due: now + REMOVAL_DELAY,
            });
        }
    }

    /// Removes the tasks at the given positions in the full collection,
    /// cancelling any removal timers still running for them, and flushes.
    pub fn delete(&mut self, indices: &[usize]) {
        let mut indices: Vec<usize> = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        for &idx in indices.iter().rev() {
            if idx < self.tasks.len() {
                let task = self.tasks.remove(idx);
                self.pending_removals.retain(|p| p.id != task.id);
            }
        }
        self.storage.save(&self.tasks);
    }

    /// Timed work for one UI frame: removals that have come due, reminders
    /// that have come due.
    pub fn tick(&mut self) {
        self.purge_due(Instant::now());
        self.scheduler.deliver_due(Local::now());
    }

    fn purge_due(&mut self, now: Instant) {
        let due: Vec<Uuid> = self
            .pending_removals
            .iter()
            .filter(|p| p.due <= now)
            .map(|p| p.id)
            .collect();
        if due.is_empty() {
            return;
        }
        self.pending_removals.retain(|p| p.due > now);
        let before = self.tasks.len();
        self.tasks.retain(|t| !due.contains(&t.id));
        if self.tasks.len() != before {
            self.storage.save(&self.tasks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recorder::RecordingNotifier;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn local(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 7, h, m, 0).unwrap()
    }

    /// A reminder time safely in the future so scheduling always queues.
    fn tomorrow(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2099, 1, 1, h, m, 0).unwrap()
    }

    fn store() -> (TaskStore, RecordingNotifier, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let backend = RecordingNotifier::default();
        let scheduler = ReminderScheduler::new(Box::new(backend.clone()));
        (TaskStore::new(storage, scheduler), backend, dir)
    }

    fn reopen(dir: &TempDir) -> TaskStore {
        let storage = Storage::open(dir.path()).unwrap();
        let scheduler = ReminderScheduler::new(Box::new(RecordingNotifier::default()));
        let mut store = TaskStore::new(storage, scheduler);
        store.load();
        store
    }

    #[test]
    fn added_task_is_incomplete_and_visible() {
        let (mut store, _, _dir) = store();
        let id = store.add("Buy milk", tomorrow(9, 0));

        assert_eq!(store.all().len(), 1);
        assert!(!store.all()[0].is_completed);
        let visible: Vec<_> = store.visible().collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, id);
    }

    #[test]
    fn append_order_is_display_order() {
        let (mut store, _, _dir) = store();
        store.add("first", tomorrow(9, 0));
        store.add("second", tomorrow(10, 0));
        store.add("third", tomorrow(11, 0));

        let titles: Vec<_> = store.visible().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn blank_title_is_accepted() {
        let (mut store, _, _dir) = store();
        store.add("", tomorrow(9, 0));
        assert_eq!(store.visible().count(), 1);
    }

    #[test]
    fn add_queues_a_reminder() {
        let (mut store, _, _dir) = store();
        let id = store.add("Stretch", tomorrow(9, 0));
        let pending = store.scheduler.pending_snapshot();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, id);
    }

    #[test]
    fn add_flushes_to_disk() {
        let (mut store, _, dir) = store();
        store.add("Buy milk", tomorrow(9, 0));

        let reloaded = reopen(&dir);
        assert_eq!(reloaded.all().len(), 1);
        assert_eq!(reloaded.all()[0].title, "Buy milk");
    }

    #[test]
    fn reminder_edit_changes_memory_only() {
        let (mut store, _, dir) = store();
        let id = store.add("Tea", tomorrow(9, 0));

        store.update_reminder_time(id, tomorrow(14, 30));

        // In memory: edited. On disk: still the original. Queue: untouched.
        assert_eq!(store.all()[0].reminder_time, tomorrow(14, 30));
        let reloaded = reopen(&dir);
        assert_eq!(reloaded.all()[0].reminder_time, tomorrow(9, 0));
        assert_eq!(store.scheduler.pending_snapshot()[0].1, tomorrow(9, 0));
    }

    #[test]
    fn reminder_edit_of_unknown_id_is_noop() {
        let (mut store, _, _dir) = store();
        store.add("Tea", tomorrow(9, 0));
        store.update_reminder_time(Uuid::new_v4(), tomorrow(14, 30));
        assert_eq!(store.all()[0].reminder_time, tomorrow(9, 0));
    }

    #[test]
    fn completing_hides_now_and_removes_after_delay() {
        let (mut store, _, dir) = store();
        let id = store.add("Buy milk", tomorrow(9, 0));

        let t0 = Instant::now();
        store.complete_at(id, t0);

        // Gone from the rendered view at once, still in the collection.
        assert_eq!(store.visible().count(), 0);
        assert_eq!(store.all().len(), 1);
        assert!(store.all()[0].is_completed);

        // Half-way through the window nothing has been purged.
        store.purge_due(t0 + REMOVAL_DELAY / 2);
        assert_eq!(store.all().len(), 1);

        // After the window the task and its persisted record are gone.
        store.purge_due(t0 + REMOVAL_DELAY);
        assert_eq!(store.all().len(), 0);
        assert_eq!(reopen(&dir).all().len(), 0);
    }

    #[test]
    fn completing_twice_in_the_window_is_harmless() {
        let (mut store, _, _dir) = store();
        let id = store.add("Buy milk", tomorrow(9, 0));

        let t0 = Instant::now();
        store.complete_at(id, t0);
        store.complete_at(id, t0 + Duration::from_millis(500));

        store.purge_due(t0 + REMOVAL_DELAY);
        assert_eq!(store.all().len(), 0);
        // The straggler entry finds nothing left to remove.
        store.purge_due(t0 + REMOVAL_DELAY * 2);
        assert_eq!(store.all().len(), 0);
    }

    #[test]
    fn delete_removes_immediately_and_flushes() {
        let (mut store, _, dir) = store();
        store.add("first", tomorrow(9, 0));
        store.add("second", tomorrow(10, 0));

        store.delete(&[0]);

        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].title, "second");
        assert_eq!(reopen(&dir).all().len(), 1);
    }

    #[test]
    fn delete_with_no_indices_changes_nothing() {
        let (mut store, _, _dir) = store();
        store.add("keep", tomorrow(9, 0));
        store.delete(&[]);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn delete_out_of_range_is_ignored() {
        let (mut store, _, _dir) = store();
        store.add("keep", tomorrow(9, 0));
        store.delete(&[5]);
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn delete_cancels_a_running_removal_timer() {
        let (mut store, _, _dir) = store();
        let id = store.add("Buy milk", tomorrow(9, 0));

        let t0 = Instant::now();
        store.complete_at(id, t0);
        store.delete(&[0]);

        assert!(store.pending_removals.is_empty());
        store.purge_due(t0 + REMOVAL_DELAY);
        assert_eq!(store.all().len(), 0);
    }

    #[test]
    fn load_replaces_state_in_original_order() {
        let (mut store, _, dir) = store();
        store.add("first", tomorrow(9, 0));
        store.add("second", tomorrow(10, 0));

        let reloaded = reopen(&dir);
        let titles: Vec<_> = reloaded.all().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[test]
    fn load_without_data_leaves_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reloaded = reopen(&dir);
        assert!(reloaded.all().is_empty());
    }

    #[test]
    fn completed_record_persisted_mid_window_loads_but_never_renders() {
        let (mut store, _, dir) = store();
        let id = store.add("interrupted", tomorrow(9, 0));
        store.complete_at(id, Instant::now());
        // Force a flush while the removal timer is still running, as if the
        // app had exited inside the window.
        store.delete(&[]);

        let reloaded = reopen(&dir);
        assert_eq!(reloaded.all().len(), 1);
        assert!(reloaded.all()[0].is_completed);
        assert_eq!(reloaded.visible().count(), 0);
    }

    #[test]
    fn buy_milk_scenario() {
        let (mut store, backend, dir) = store();
        let id = store.add("Buy milk", tomorrow(9, 0));

        assert_eq!(store.all().len(), 1);
        assert!(!store.all()[0].is_completed);

        // The reminder that will eventually fire carries the formatted body.
        store.scheduler.deliver_due(tomorrow(9, 1));
        assert_eq!(
            backend.delivered.borrow()[0].1,
            "Reminder: Buy milk at 9:00 AM"
        );

        let t0 = Instant::now();
        store.complete_at(id, t0);
        store.purge_due(t0 + REMOVAL_DELAY);
        assert_eq!(store.all().len(), 0);
        assert_eq!(reopen(&dir).all().len(), 0);
    }

    #[test]
    fn local_times_survive_the_disk_round_trip() {
        let (mut store, _, dir) = store();
        store.add("precise", local(9, 0));
        let reloaded = reopen(&dir);
        assert_eq!(reloaded.all()[0].reminder_time, local(9, 0));
    }
}
