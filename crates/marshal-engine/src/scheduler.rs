//! Recurring schedules.
//!
//! The scheduler owns a registry of jobs, each bound to its own timer
//! task. Registration parses the recurrence expression and starts the
//! timer; unregistration aborts the timer before the entry is released,
//! so no tick can fire after deletion returns. Disabling a job keeps its
//! timer ticking and turns each tick into a no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use marshal_core::types::{Action, Timestamp};
use marshal_dispatch::{DeviceDirectory, Dispatcher};
use marshal_ledger::TaskKind;

use crate::cron;
use crate::error::ScheduleError;

/// What a caller supplies to register a job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSpec {
    pub name: String,
    /// Recurrence expression, restricted to `*/N * * * *`.
    pub schedule: String,
    pub device_id: String,
    pub action: Action,
}

/// A registered recurring job. The timer handle itself stays inside the
/// registry; this view is what callers see.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub name: String,
    pub schedule: String,
    pub interval_ms: u64,
    pub action: Action,
    pub device_id: String,
    pub enabled: bool,
    pub last_run: Option<Timestamp>,
    pub next_run: Option<Timestamp>,
}

struct JobEntry {
    job: ScheduledJob,
    handle: JoinHandle<()>,
}

type JobRegistry = Arc<Mutex<HashMap<Uuid, JobEntry>>>;

/// Owns all scheduled jobs and their timers.
///
/// The registry mutex is the atomicity boundary: enable/disable and
/// unregister take it, and every tick reads its job state under it, so a
/// tick always observes a consistent enabled/timer state.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    directory: Arc<DeviceDirectory>,
    jobs: JobRegistry,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, directory: Arc<DeviceDirectory>) -> Self {
        Self {
            dispatcher,
            directory,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Validate the recurrence expression, start the timer, and insert
    /// the job (enabled) into the registry.
    pub fn register(&self, spec: JobSpec) -> Result<ScheduledJob, ScheduleError> {
        let interval_ms = cron::interval_ms(&spec.schedule)?;
        let id = Uuid::new_v4();

        let job = ScheduledJob {
            id,
            name: spec.name,
            schedule: spec.schedule,
            interval_ms,
            action: spec.action,
            device_id: spec.device_id,
            enabled: true,
            last_run: None,
            next_run: Some(next_run_after(Timestamp::now(), interval_ms)),
        };

        let handle = self.spawn_timer(id, interval_ms);
        self.jobs
            .lock()
            .unwrap()
            .insert(id, JobEntry { job: job.clone(), handle });

        tracing::info!(
            job = %job.name,
            id = %id,
            interval_ms,
            "Scheduled job registered"
        );
        Ok(job)
    }

    /// Toggle dispatching for a job. The timer keeps ticking either way;
    /// a disabled job's ticks return without dispatching.
    pub fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<ScheduledJob, ScheduleError> {
        let mut jobs = self.jobs.lock().unwrap();
        let entry = jobs.get_mut(&id).ok_or(ScheduleError::NotFound(id))?;
        entry.job.enabled = enabled;
        tracing::info!(job = %entry.job.name, enabled, "Scheduled job toggled");
        Ok(entry.job.clone())
    }

    /// Remove a job, aborting its timer before the entry is released.
    pub fn unregister(&self, id: Uuid) -> Result<(), ScheduleError> {
        let mut jobs = self.jobs.lock().unwrap();
        let entry = jobs.remove(&id).ok_or(ScheduleError::NotFound(id))?;
        entry.handle.abort();
        tracing::info!(job = %entry.job.name, id = %id, "Scheduled job unregistered");
        Ok(())
    }

    /// All registered jobs, sorted by name for stable output.
    pub fn list(&self) -> Vec<ScheduledJob> {
        let jobs = self.jobs.lock().unwrap();
        let mut result: Vec<ScheduledJob> = jobs.values().map(|e| e.job.clone()).collect();
        result.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        result
    }

    pub fn get(&self, id: Uuid) -> Option<ScheduledJob> {
        self.jobs.lock().unwrap().get(&id).map(|e| e.job.clone())
    }

    /// Abort every timer and clear the registry.
    pub fn shutdown(&self) {
        let mut jobs = self.jobs.lock().unwrap();
        for (_, entry) in jobs.drain() {
            entry.handle.abort();
        }
        tracing::info!("Scheduler shut down");
    }

    fn spawn_timer(&self, id: Uuid, interval_ms: u64) -> JoinHandle<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let directory = Arc::clone(&self.directory);
        let jobs = Arc::clone(&self.jobs);

        tokio::spawn(async move {
            let period = Duration::from_millis(interval_ms);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                Self::run_tick(&dispatcher, &directory, &jobs, id).await;
            }
        })
    }

    /// One timer fire. Never propagates an error: a failed dispatch is a
    /// Failed task record and the job keeps ticking.
    async fn run_tick(
        dispatcher: &Dispatcher,
        directory: &DeviceDirectory,
        jobs: &JobRegistry,
        id: Uuid,
    ) {
        // Snapshot the job under the registry lock; the lock is dropped
        // before the dispatch await.
        let snapshot = {
            let mut guard = jobs.lock().unwrap();
            match guard.get_mut(&id) {
                Some(entry) => {
                    entry.job.next_run =
                        Some(next_run_after(Timestamp::now(), entry.job.interval_ms));
                    if !entry.job.enabled {
                        tracing::debug!(job = %entry.job.name, "Tick skipped: job disabled");
                        return;
                    }
                    (
                        entry.job.name.clone(),
                        entry.job.device_id.clone(),
                        entry.job.action.clone(),
                    )
                }
                None => return,
            }
        };
        let (name, device_id, action) = snapshot;

        match directory.get(&device_id) {
            Some(device) if device.is_online() => {}
            _ => {
                tracing::debug!(job = %name, device = %device_id, "Tick skipped: device not reachable");
                return;
            }
        }

        let result = dispatcher
            .dispatch_as(&device_id, &action, TaskKind::Scheduled, Some(&name))
            .await;

        if result.success {
            tracing::debug!(job = %name, duration_ms = result.duration_ms, "Scheduled run succeeded");
        } else {
            tracing::warn!(job = %name, "Scheduled run failed");
        }

        let now = Timestamp::now();
        let mut guard = jobs.lock().unwrap();
        if let Some(entry) = guard.get_mut(&id) {
            entry.job.last_run = Some(now);
        }
    }
}

fn next_run_after(now: Timestamp, interval_ms: u64) -> Timestamp {
    Timestamp(now.0 + (interval_ms / 1000) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_core::config::AgentConfig;
    use marshal_core::types::{Device, DeviceStatus};
    use marshal_dispatch::testing::ScriptedTransport;
    use marshal_dispatch::AgentTransport;
    use marshal_ledger::{TaskFilter, TaskLedger, TaskStatus};

    fn setup() -> (Scheduler, Arc<ScriptedTransport>, Arc<TaskLedger>, Arc<DeviceDirectory>) {
        let directory = Arc::new(DeviceDirectory::new());
        directory.upsert(Device::new("d1", "Test box", "192.168.1.20"));
        directory.set_status("d1", DeviceStatus::Online);

        let transport = Arc::new(ScriptedTransport::new());
        let ledger = Arc::new(TaskLedger::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&directory),
            Arc::clone(&transport) as Arc<dyn AgentTransport>,
            Arc::clone(&ledger),
            &AgentConfig::default(),
        ));
        let scheduler = Scheduler::new(dispatcher, Arc::clone(&directory));
        (scheduler, transport, ledger, directory)
    }

    fn spec(name: &str, schedule: &str) -> JobSpec {
        JobSpec {
            name: name.to_string(),
            schedule: schedule.to_string(),
            device_id: "d1".to_string(),
            action: Action::new("window-control", "list"),
        }
    }

    /// Let spawned timer tasks process any due ticks.
    async fn settle() {
        for _ in 0..25 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_register_computes_interval() {
        let (scheduler, _transport, _ledger, _directory) = setup();
        let job = scheduler.register(spec("List windows", "*/5 * * * *")).unwrap();
        assert_eq!(job.interval_ms, 300_000);
        assert!(job.enabled);
        assert!(job.last_run.is_none());
        assert!(job.next_run.is_some());
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_expression() {
        let (scheduler, _transport, _ledger, _directory) = setup();
        for expr in ["0 * * * *", "*/0 * * * *", "*/5 * * *", "every 5 minutes"] {
            assert!(matches!(
                scheduler.register(spec("Bad", expr)),
                Err(ScheduleError::InvalidSchedule(_))
            ));
        }
        assert!(scheduler.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_dispatches_and_updates_run_times() {
        let (scheduler, _transport, ledger, _directory) = setup();
        let job = scheduler.register(spec("List windows", "*/1 * * * *")).unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;

        assert_eq!(ledger.len(), 1);
        let records = ledger.query(&TaskFilter::default());
        assert_eq!(records[0].kind, TaskKind::Scheduled);
        assert_eq!(records[0].name, "List windows");

        let updated = scheduler.get(job.id).unwrap();
        assert!(updated.last_run.is_some());
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_repeat() {
        let (scheduler, _transport, ledger, _directory) = setup();
        scheduler.register(spec("List windows", "*/1 * * * *")).unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;

        assert_eq!(ledger.len(), 3);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_job_keeps_ticking_without_dispatching() {
        let (scheduler, _transport, ledger, _directory) = setup();
        let job = scheduler.register(spec("List windows", "*/5 * * * *")).unwrap();
        scheduler.set_enabled(job.id, false).unwrap();

        // Two full intervals pass with the job disabled.
        tokio::time::advance(Duration::from_secs(601)).await;
        settle().await;
        assert_eq!(ledger.len(), 0);

        // The timer stayed alive: ticks fired (and re-stamped next_run),
        // they just did not dispatch.
        let disabled = scheduler.get(job.id).unwrap();
        assert!(!disabled.enabled);
        assert!(disabled.next_run.unwrap() >= job.next_run.unwrap());

        // Re-enable; the next tick dispatches normally.
        scheduler.set_enabled(job.id, true).unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(ledger.len(), 1);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_leaves_no_orphan_timer() {
        let (scheduler, _transport, ledger, _directory) = setup();
        let job = scheduler.register(spec("List windows", "*/1 * * * *")).unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(ledger.len(), 1);

        scheduler.unregister(job.id).unwrap();

        // Many multiples of the interval later, nothing new fires.
        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(ledger.len(), 1);
        assert!(scheduler.list().is_empty());
        assert!(scheduler.get(job.id).is_none());
    }

    #[tokio::test]
    async fn test_unregister_unknown_job() {
        let (scheduler, _transport, _ledger, _directory) = setup();
        assert!(matches!(
            scheduler.unregister(Uuid::new_v4()),
            Err(ScheduleError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_device_skips_run_without_record() {
        let (scheduler, transport, ledger, directory) = setup();
        scheduler.register(spec("List windows", "*/1 * * * *")).unwrap();
        directory.set_status("d1", DeviceStatus::Offline);

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;

        // Skipped silently: no record, no network call.
        assert_eq!(ledger.len(), 0);
        assert_eq!(transport.call_count(), 0);

        // Device comes back; the next tick dispatches.
        directory.set_status("d1", DeviceStatus::Online);
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(ledger.len(), 1);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_failure_never_stops_the_job() {
        let (scheduler, transport, ledger, _directory) = setup();
        transport.push_remote_error("agent crashed");
        scheduler.register(spec("List windows", "*/1 * * * *")).unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;

        // First tick failed, second succeeded; both were recorded and the
        // timer kept going.
        let records = ledger.query(&TaskFilter::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, TaskStatus::Failed);
        assert_eq!(records[0].status, TaskStatus::Success);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_tick_independently() {
        let (scheduler, _transport, ledger, _directory) = setup();
        scheduler.register(spec("Fast job", "*/1 * * * *")).unwrap();
        scheduler.register(spec("Slow job", "*/5 * * * *")).unwrap();
        settle().await;

        tokio::time::advance(Duration::from_secs(301)).await;
        settle().await;

        let fast = ledger.query(&TaskFilter::default());
        let fast_count = fast.iter().filter(|r| r.name == "Fast job").count();
        let slow_count = fast.iter().filter(|r| r.name == "Slow job").count();
        assert_eq!(fast_count, 5);
        assert_eq!(slow_count, 1);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_all_timers() {
        let (scheduler, _transport, ledger, _directory) = setup();
        scheduler.register(spec("A", "*/1 * * * *")).unwrap();
        scheduler.register(spec("B", "*/1 * * * *")).unwrap();

        scheduler.shutdown();

        tokio::time::advance(Duration::from_secs(300)).await;
        settle().await;
        assert_eq!(ledger.len(), 0);
        assert!(scheduler.list().is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let (scheduler, _transport, _ledger, _directory) = setup();
        scheduler.register(spec("Zeta", "*/5 * * * *")).unwrap();
        scheduler.register(spec("Alpha", "*/5 * * * *")).unwrap();

        let names: Vec<String> = scheduler.list().into_iter().map(|j| j.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        scheduler.shutdown();
    }
}
