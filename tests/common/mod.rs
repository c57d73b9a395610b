#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Result};

use brostop_lib::{
    clock::ManualClock,
    config::GuardConfig,
    intervention::{
        GuardDeps, InterventionUi, LockdownRequest, Orchestrator, PleaOutcome, RoastRequest,
        Scheduler, Ticket, Timer, TimerKind, UiAction, UiActionKind,
    },
    platform::DevicePlatform,
    random::{RandomSource, ScriptedRandom},
    roast::{Meme, MemePool},
    sensing::{RawEvent, RawEventKind, ScrollDelta},
    settings::keys,
    store::{ConfigStore, MemoryStore, StoreValue},
};

pub const INSTA: &str = "com.instagram.android";
pub const TIKTOK: &str = "com.zhiliaoapp.musically";
pub const CHROME: &str = "com.android.chrome";
pub const SHADE: &str = "com.android.systemui";
pub const HOST: &str = "app.brostop.android";
pub const START_MS: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct UiLog {
    pub roasts: Vec<RoastRequest>,
    pub outcomes: Vec<(Ticket, PleaOutcome)>,
    pub lockdowns: Vec<LockdownRequest>,
    pub countdowns: Vec<(Ticket, i64)>,
    pub rejections: Vec<Ticket>,
    pub hides: usize,
    pub deny_overlay: bool,
}

#[derive(Clone, Default)]
pub struct FakeUi(pub Arc<Mutex<UiLog>>);

impl FakeUi {
    pub fn log(&self) -> std::sync::MutexGuard<'_, UiLog> {
        self.0.lock().unwrap()
    }
}

impl InterventionUi for FakeUi {
    fn show_roast(&mut self, request: &RoastRequest) -> Result<()> {
        let mut log = self.log();
        if log.deny_overlay {
            bail!("overlay permission denied");
        }
        log.roasts.push(request.clone());
        Ok(())
    }

    fn show_plea_outcome(&mut self, ticket: Ticket, outcome: &PleaOutcome) -> Result<()> {
        self.log().outcomes.push((ticket, outcome.clone()));
        Ok(())
    }

    fn show_lockdown(&mut self, request: &LockdownRequest) -> Result<()> {
        let mut log = self.log();
        if log.deny_overlay {
            bail!("overlay permission denied");
        }
        log.lockdowns.push(request.clone());
        Ok(())
    }

    fn update_countdown(&mut self, ticket: Ticket, remaining_ms: i64) -> Result<()> {
        self.log().countdowns.push((ticket, remaining_ms));
        Ok(())
    }

    fn confession_rejected(&mut self, ticket: Ticket) -> Result<()> {
        self.log().rejections.push(ticket);
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.log().hides += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct PlatformLog {
    pub home_presses: usize,
    pub killed: Vec<String>,
    pub vibrations: Vec<Duration>,
    pub input_method: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakePlatform(pub Arc<Mutex<PlatformLog>>);

impl FakePlatform {
    pub fn log(&self) -> std::sync::MutexGuard<'_, PlatformLog> {
        self.0.lock().unwrap()
    }
}

impl DevicePlatform for FakePlatform {
    fn go_home(&mut self) -> Result<()> {
        self.log().home_presses += 1;
        Ok(())
    }

    fn kill_background_process(&mut self, package: &str) -> Result<bool> {
        self.log().killed.push(package.to_string());
        Ok(true)
    }

    fn vibrate(&mut self, duration: Duration) -> Result<()> {
        self.log().vibrations.push(duration);
        Ok(())
    }

    fn active_input_method(&self) -> Option<String> {
        self.log().input_method.clone()
    }
}

#[derive(Default)]
pub struct SchedulerLog {
    pub pending: HashMap<TimerKind, (Timer, Duration)>,
    pub scheduled: Vec<(Timer, Duration)>,
}

#[derive(Clone, Default)]
pub struct RecordingScheduler(pub Arc<Mutex<SchedulerLog>>);

impl RecordingScheduler {
    pub fn log(&self) -> std::sync::MutexGuard<'_, SchedulerLog> {
        self.0.lock().unwrap()
    }

    pub fn pending(&self, kind: TimerKind) -> Option<(Timer, Duration)> {
        self.log().pending.get(&kind).copied()
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&mut self, timer: Timer, after: Duration) {
        let mut log = self.log();
        log.pending.insert(timer.kind, (timer, after));
        log.scheduled.push((timer, after));
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.log().pending.remove(&kind);
    }
}

/// Random source the test can keep scripting after handing it over.
#[derive(Clone, Default)]
pub struct SharedRandom(pub Arc<Mutex<ScriptedRandom>>);

impl SharedRandom {
    pub fn push(&self, draw: u32) {
        self.0.lock().unwrap().push(draw);
    }
}

impl RandomSource for SharedRandom {
    fn between(&mut self, low: u32, high: u32) -> u32 {
        self.0.lock().unwrap().between(low, high)
    }

    fn index(&mut self, len: usize) -> usize {
        self.0.lock().unwrap().index(len)
    }
}

/// Memory store whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool, what: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            bail!("disk I/O error during {what}");
        }
        Ok(())
    }
}

impl ConfigStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        self.check(&self.fail_reads, "read")?;
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: StoreValue) -> Result<()> {
        self.check(&self.fail_writes, "write")?;
        self.inner.put(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check(&self.fail_writes, "remove")?;
        self.inner.remove(key)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.check(&self.fail_reads, "scan")?;
        self.inner.keys_with_prefix(prefix)
    }
}

pub fn test_pool() -> MemePool {
    let meme = |id: u32, text: &str, tags: &[&str]| Meme {
        id,
        text: text.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        language: "en".to_string(),
    };
    MemePool::new(vec![
        meme(1, "Put it down, bro.", &["he", "savage"]),
        meme(2, "Put it down, sis.", &["she", "savage"]),
        meme(3, "Mercy granted.", &["plea_won"]),
        meme(4, "No mercy.", &["2nd_chance_fail"]),
    ])
}

pub struct Harness {
    pub guard: Orchestrator,
    pub store: Arc<FlakyStore>,
    pub clock: ManualClock,
    pub ui: FakeUi,
    pub platform: FakePlatform,
    pub scheduler: RecordingScheduler,
    pub random: SharedRandom,
}

impl Harness {
    /// Instagram and TikTok monitored, 5 swipes and 60 minutes per session,
    /// 10 minute per-app penalty.
    pub fn new() -> Self {
        let store = Arc::new(FlakyStore::default());
        store
            .set_string_set(
                keys::BLOCKED_PACKAGES,
                [INSTA.to_string(), TIKTOK.to_string()].into_iter().collect(),
            )
            .unwrap();
        store.set_int(keys::MIN_SWIPE, 5).unwrap();
        store.set_int(keys::MAX_SWIPE, 5).unwrap();
        store.set_int(keys::MIN_TIME, 60).unwrap();
        store.set_int(keys::MAX_TIME, 60).unwrap();

        let clock = ManualClock::new(START_MS);
        let ui = FakeUi::default();
        let platform = FakePlatform::default();
        let scheduler = RecordingScheduler::default();
        let random = SharedRandom::default();

        let deps = GuardDeps {
            store: store.clone(),
            clock: Arc::new(clock.clone()),
            random: Box::new(random.clone()),
            ui: Box::new(ui.clone()),
            platform: Box::new(platform.clone()),
            pool: test_pool(),
        };
        let guard = Orchestrator::new(GuardConfig::default(), deps, Box::new(scheduler.clone()));

        Self {
            guard,
            store,
            clock,
            ui,
            platform,
            scheduler,
            random,
        }
    }

    pub fn focus(&mut self, package: &str) {
        self.guard.on_platform_event(&RawEvent::focus(package));
    }

    /// One swipe, spaced past the debounce window.
    pub fn swipe(&mut self, package: &str) {
        self.clock.advance_ms(700);
        self.guard.on_platform_event(&RawEvent::scroll(
            package,
            RawEventKind::ViewScrolled,
            Some(ScrollDelta { x: 0, y: 48 }),
        ));
    }

    pub fn swipes(&mut self, package: &str, count: usize) {
        for _ in 0..count {
            self.swipe(package);
        }
    }

    /// Fires the pending timer of `kind` after moving the clock by its delay.
    pub fn fire(&mut self, kind: TimerKind) {
        let (timer, after) = self
            .scheduler
            .pending(kind)
            .unwrap_or_else(|| panic!("no pending {kind:?} timer"));
        self.scheduler.log().pending.remove(&kind);
        self.clock.advance_ms(after.as_millis() as i64);
        self.guard.on_timer(timer);
    }

    pub fn act(&mut self, kind: UiActionKind) {
        let ticket = self.guard.current_ticket().expect("an overlay is showing");
        self.guard.on_ui_action(UiAction::new(ticket, kind));
    }

    pub fn last_roast(&self) -> RoastRequest {
        self.ui.log().roasts.last().cloned().expect("a roast was shown")
    }

    pub fn last_lockdown(&self) -> LockdownRequest {
        self.ui
            .log()
            .lockdowns
            .last()
            .cloned()
            .expect("a lockdown was shown")
    }

    pub fn set_int(&self, key: &str, value: i64) {
        self.store.set_int(key, value).unwrap();
    }

    pub fn set_bool(&self, key: &str, value: bool) {
        self.store.set_bool(key, value).unwrap();
    }

    pub fn set_string(&self, key: &str, value: &str) {
        self.store.set_string(key, value).unwrap();
    }
}
