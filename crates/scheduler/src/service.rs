//! The periodic driver: owns the tick loop and the per-tick cycle.

use std::{sync::Arc, time::Duration};

use {
    chrono::{DateTime, Utc},
    telegpick_store::store::PicStore,
    tokio::{
        sync::{Mutex, RwLock},
        task::JoinHandle,
    },
    tracing::{debug, error, info},
};

use crate::{
    Result,
    dispatch::{AvatarPushFn, dispatch},
    matcher::find_matches,
};

/// Counts for one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub matched: usize,
    pub pushed: usize,
    pub failed: usize,
}

/// Evaluates every pic's schedules once per tick and pushes the hits.
///
/// The loop alternates between waiting for the next tick boundary and running
/// one full evaluate-and-dispatch cycle. Per-pic and per-rule failures stay
/// inside the cycle; only a failed snapshot load surfaces, and the loop keeps
/// going on the next boundary regardless.
pub struct TickService {
    store: Arc<dyn PicStore>,
    push: AvatarPushFn,
    tick_secs: u64,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    running: RwLock<bool>,
}

impl TickService {
    pub fn new(store: Arc<dyn PicStore>, push: AvatarPushFn, tick_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            store,
            push,
            tick_secs: tick_secs.max(1),
            timer_handle: Mutex::new(None),
            running: RwLock::new(false),
        })
    }

    /// Run one full cycle against `now`.
    ///
    /// Returns an error only when the snapshot itself cannot be loaded; every
    /// per-pic failure is logged and absorbed before this returns.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let snapshot = self.store.load_all_with_schedules().await?;
        let matches = find_matches(&snapshot, now);
        let outcome = dispatch(&matches, &self.push).await;
        Ok(TickReport {
            matched: matches.len(),
            pushed: outcome.pushed,
            failed: outcome.failed,
        })
    }

    /// Start the timer loop.
    pub async fn start(self: &Arc<Self>) {
        *self.running.write().await = true;

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });

        *self.timer_handle.lock().await = Some(handle);
        info!(tick_secs = self.tick_secs, "tick service started");
    }

    /// Stop the timer loop. A cycle already past its snapshot load finishes
    /// its current dispatch on a best-effort basis.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        if let Some(handle) = self.timer_handle.lock().await.take() {
            handle.abort();
        }
        info!("tick service stopped");
    }

    async fn timer_loop(self: Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            tokio::time::sleep(delay_until_next_tick(Utc::now(), self.tick_secs)).await;

            if !*self.running.read().await {
                break;
            }

            match self.run_tick(Utc::now()).await {
                Ok(report) => debug!(
                    matched = report.matched,
                    pushed = report.pushed,
                    failed = report.failed,
                    "tick complete"
                ),
                Err(error) => error!(%error, "tick failed"),
            }
        }
    }
}

/// Time left until the next boundary of the `tick_secs` grid.
///
/// An instant exactly on a boundary waits a full interval, so a boundary is
/// never evaluated twice by the nominal cadence.
fn delay_until_next_tick(now: DateTime<Utc>, tick_secs: u64) -> Duration {
    let tick = tick_secs.max(1) as i64;
    let into = now.timestamp().rem_euclid(tick);
    Duration::from_secs((tick - into) as u64)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use {
        anyhow::anyhow,
        async_trait::async_trait,
        chrono::TimeZone,
        telegpick_store::{
            store_memory::InMemoryStore,
            types::{Pic, PicPatch, PicSnapshot, PicWithSchedules, Schedule, SchedulePatch, User},
        },
    };

    use {super::*, crate::dispatch::PushRequest};

    fn counting_push(fail_pic: Option<&str>) -> (AvatarPushFn, Arc<StdMutex<Vec<String>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let fail_pic = fail_pic.map(str::to_string);
        let push: AvatarPushFn = {
            let seen = Arc::clone(&seen);
            Arc::new(move |request: PushRequest| {
                let seen = Arc::clone(&seen);
                let fail_pic = fail_pic.clone();
                Box::pin(async move {
                    seen.lock().unwrap().push(request.pic_id.clone());
                    if fail_pic.as_deref() == Some(request.pic_id.as_str()) {
                        return Err(anyhow!("boom"));
                    }
                    Ok(())
                })
            })
        };
        (push, seen)
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        use telegpick_store::store::UserStore;

        let store = Arc::new(InMemoryStore::new());
        store
            .create_user(&User {
                id: "u1".into(),
                username: "alice".into(),
                password_hash: "hash".into(),
                phone: "+15550100".into(),
                chat_id: 7,
                link_code_hash: None,
                telegram_linked: true,
            })
            .await
            .unwrap();
        store
    }

    async fn add_pic(store: &InMemoryStore, pic_id: &str, timezone: &str, day_time: &str) {
        store
            .create_pic(&Pic {
                id: pic_id.into(),
                user_id: "u1".into(),
                filename: format!("{pic_id}.jpg"),
                timezone: timezone.into(),
            })
            .await
            .unwrap();
        store
            .create_schedule(&Schedule {
                id: format!("{pic_id}-s"),
                pic_id: pic_id.into(),
                days_of_week: "1111111".into(),
                day_time: day_time.into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tick_counts_matches_and_failures() {
        let store = seeded_store().await;
        add_pic(&store, "p1", "+02:00", "14:00").await;
        add_pic(&store, "p2", "+02:00", "14:00").await;
        add_pic(&store, "p3", "+02:00", "18:00").await;

        let (push, seen) = counting_push(Some("p2"));
        let service = TickService::new(store, push, 60);

        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let report = service.run_tick(now).await.unwrap();
        assert_eq!(report, TickReport {
            matched: 2,
            pushed: 1,
            failed: 1,
        });
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_pic_never_reaches_dispatch() {
        let store = seeded_store().await;
        add_pic(&store, "bad", "2:00", "12:00").await;
        add_pic(&store, "good", "+00:00", "12:00").await;

        let (push, seen) = counting_push(None);
        let service = TickService::new(store, push, 60);

        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let report = service.run_tick(now).await.unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.pushed, 1);
        assert_eq!(seen.lock().unwrap().as_slice(), ["good"]);
    }

    /// Store whose snapshot load always fails; the one error that escapes.
    struct BrokenStore;

    #[async_trait]
    impl PicStore for BrokenStore {
        async fn create_pic(&self, _pic: &Pic) -> telegpick_store::Result<()> {
            Ok(())
        }

        async fn list_for_user(
            &self,
            _user_id: &str,
            _page: u32,
            _limit: u32,
        ) -> telegpick_store::Result<Vec<PicWithSchedules>> {
            Ok(Vec::new())
        }

        async fn get_for_user(
            &self,
            _user_id: &str,
            _pic_id: &str,
        ) -> telegpick_store::Result<Option<Pic>> {
            Ok(None)
        }

        async fn patch_pic(
            &self,
            _user_id: &str,
            _pic_id: &str,
            _patch: &PicPatch,
        ) -> telegpick_store::Result<Pic> {
            Err(telegpick_store::Error::not_found("pic", "none"))
        }

        async fn delete_pic(&self, _user_id: &str, _pic_id: &str) -> telegpick_store::Result<()> {
            Ok(())
        }

        async fn create_schedule(&self, _schedule: &Schedule) -> telegpick_store::Result<()> {
            Ok(())
        }

        async fn patch_schedule(
            &self,
            _pic_id: &str,
            _schedule_id: &str,
            _patch: &SchedulePatch,
        ) -> telegpick_store::Result<Schedule> {
            Err(telegpick_store::Error::not_found("schedule", "none"))
        }

        async fn delete_schedule(
            &self,
            _pic_id: &str,
            _schedule_id: &str,
        ) -> telegpick_store::Result<()> {
            Ok(())
        }

        async fn load_all_with_schedules(&self) -> telegpick_store::Result<Vec<PicSnapshot>> {
            Err(telegpick_store::Error::not_found("snapshot", "unavailable"))
        }
    }

    #[tokio::test]
    async fn snapshot_failure_propagates() {
        let (push, seen) = counting_push(None);
        let service = TickService::new(Arc::new(BrokenStore), push, 60);

        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let err = service.run_tick(now).await.unwrap_err();
        assert!(matches!(err, crate::Error::Store(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_then_stop_terminates_the_loop() {
        let store = seeded_store().await;
        let (push, _seen) = counting_push(None);
        let service = TickService::new(store, push, 60);

        service.start().await;
        service.stop().await;
        assert!(service.timer_handle.lock().await.is_none());
    }

    #[test]
    fn delay_aligns_to_the_grid() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 15).unwrap();
        assert_eq!(delay_until_next_tick(now, 60), Duration::from_secs(45));

        let boundary = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        assert_eq!(delay_until_next_tick(boundary, 60), Duration::from_secs(60));
    }
}
