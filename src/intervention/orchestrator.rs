use std::{sync::Arc, time::Duration};

use serde::Serialize;
use uuid::Uuid;

use crate::{
    clock::Clock,
    config::GuardConfig,
    penalty::{Penalty, PenaltyManager},
    platform::DevicePlatform,
    random::RandomSource,
    roast::{self, MemePool, RoastSelector, PLEA_LOST_TAG, PLEA_WON_TAG},
    sensing::{AppRouter, EventClassifier, RawEvent, Route, RouteContext, Signal},
    session::{Session, SessionManager},
    settings::{EmergencyMode, Settings},
    store::ConfigStore,
    utils::logging::{APP_SWITCH, INTERVENTION, MONITOR, PENALTY, PLEA, SWIPE},
};
use crate::{log_debug, log_error, log_info, log_warn};

use super::timers::{Scheduler, Timer, TimerBook, TimerKind};
use super::ui::{
    EmergencyOffer, InterventionUi, LockdownRequest, PleaOffer, PleaOutcome, RoastRequest,
    Ticket, UiAction, UiActionKind,
};

const ENABLE_LOGS: bool = true;

/// Sentences offered for the shame unlock. Matched byte for byte.
pub const CONFESSIONS: [&str; 3] = [
    "I am wasting my time scrolling.",
    "I lack self-control and discipline.",
    "I am weak and easily distracted.",
];

/// Everything the orchestrator talks to besides its scheduler.
pub struct GuardDeps {
    pub store: Arc<dyn ConfigStore>,
    pub clock: Arc<dyn Clock>,
    pub random: Box<dyn RandomSource>,
    pub ui: Box<dyn InterventionUi>,
    pub platform: Box<dyn DevicePlatform>,
    pub pool: MemePool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PleaStage {
    Offered,
    NotOffered,
    Revealing { won: bool },
}

#[derive(Debug, Clone)]
struct RoastContext {
    ticket: Ticket,
    /// The session as it stood at the breach, kept for a plea win.
    session: Session,
    penalty: Option<Penalty>,
    stage: PleaStage,
}

impl RoastContext {
    fn package(&self) -> &str {
        &self.session.target_package
    }
}

#[derive(Debug, Clone)]
struct LockdownContext {
    ticket: Ticket,
    package: String,
    penalty: Penalty,
    emergency: EmergencyOffer,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    /// The live session sits in the session manager.
    Monitoring,
    Roast(RoastContext),
    Lockdown(LockdownContext),
    /// Sent home; platform events are ignored until the app is killed.
    Exiting { package: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseKind {
    Idle,
    Monitoring,
    Roast,
    Lockdown,
    Exiting,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardSnapshot {
    pub phase: PhaseKind,
    pub session: Session,
    pub progress_percent: u32,
    pub package: Option<String>,
    pub ticket: Option<Ticket>,
    pub unblock_at: Option<i64>,
    pub remaining_ms: Option<i64>,
}

/// The intervention state machine.
///
/// Platform events, UI actions and fired timers all enter through `&mut self`
/// methods, so every transition happens on one timeline and a second trigger
/// while an overlay is up is a no-op.
pub struct Orchestrator {
    config: GuardConfig,
    store: Arc<dyn ConfigStore>,
    clock: Arc<dyn Clock>,
    random: Box<dyn RandomSource>,
    ui: Box<dyn InterventionUi>,
    platform: Box<dyn DevicePlatform>,
    scheduler: Box<dyn Scheduler>,
    penalties: PenaltyManager,
    roasts: RoastSelector,
    classifier: EventClassifier,
    router: AppRouter,
    sessions: SessionManager,
    timers: TimerBook,
    phase: Phase,
    /// Last settings read successfully; stands in while the store is failing.
    last_settings: Option<Settings>,
}

impl Orchestrator {
    pub fn new(config: GuardConfig, deps: GuardDeps, scheduler: Box<dyn Scheduler>) -> Self {
        let penalties = PenaltyManager::new(deps.store.clone(), deps.clock.clone());
        let router = AppRouter::new(
            config.host_package.clone(),
            config.temporary_prefixes.clone(),
        );
        let classifier = EventClassifier::new(config.debounce);

        Self {
            config,
            store: deps.store,
            clock: deps.clock,
            random: deps.random,
            ui: deps.ui,
            platform: deps.platform,
            scheduler,
            penalties,
            roasts: RoastSelector::new(deps.pool),
            classifier,
            router,
            sessions: SessionManager::new(),
            timers: TimerBook::default(),
            phase: Phase::Idle,
            last_settings: None,
        }
    }

    pub fn penalties(&self) -> &PenaltyManager {
        &self.penalties
    }

    pub fn session(&self) -> &Session {
        self.sessions.session()
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Idle => PhaseKind::Idle,
            Phase::Monitoring => PhaseKind::Monitoring,
            Phase::Roast(_) => PhaseKind::Roast,
            Phase::Lockdown(_) => PhaseKind::Lockdown,
            Phase::Exiting { .. } => PhaseKind::Exiting,
        }
    }

    pub fn is_timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    /// Ticket of the overlay currently showing.
    pub fn current_ticket(&self) -> Option<Ticket> {
        match &self.phase {
            Phase::Roast(ctx) => Some(ctx.ticket),
            Phase::Lockdown(ctx) => Some(ctx.ticket),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> GuardSnapshot {
        let session = self.sessions.session().clone();
        let (package, ticket, unblock_at) = match &self.phase {
            Phase::Idle => (None, None, None),
            Phase::Monitoring => (Some(session.target_package.clone()), None, None),
            Phase::Roast(ctx) => (
                Some(ctx.package().to_string()),
                Some(ctx.ticket),
                ctx.penalty.map(|penalty| penalty.unblock_at),
            ),
            Phase::Lockdown(ctx) => (
                Some(ctx.package.clone()),
                Some(ctx.ticket),
                Some(ctx.penalty.unblock_at),
            ),
            Phase::Exiting { package } => (Some(package.clone()), None, None),
        };

        GuardSnapshot {
            phase: self.phase(),
            progress_percent: session.progress_percent(),
            remaining_ms: unblock_at.map(|at| self.penalties.remaining_ms(at)),
            session,
            package,
            ticket,
            unblock_at,
        }
    }

    pub fn on_platform_event(&mut self, event: &RawEvent) {
        if let Phase::Exiting { package } = &self.phase {
            log_debug!(
                APP_SWITCH,
                "{} from {} ignored while {package} exits",
                event.kind.as_str(),
                event.package
            );
            return;
        }

        if event.kind.is_scroll() && !self.counts_scrolls_from(&event.package) {
            return;
        }

        let now = self.clock.now_ms();
        match self.classifier.classify(event, now) {
            Signal::FocusChanged(package) => self.on_focus(&package),
            Signal::ScrollTick(_) => self.on_scroll_tick(),
            Signal::Ignored => {}
        }
    }

    pub fn on_ui_action(&mut self, action: UiAction) {
        if self.current_ticket() != Some(action.ticket) {
            log_debug!(
                INTERVENTION,
                "{:?} for ticket {} dropped (not showing)",
                action.kind,
                action.ticket
            );
            return;
        }

        match (self.phase(), action.kind) {
            (PhaseKind::Roast, UiActionKind::Declined) => self.on_roast_declined(),
            (PhaseKind::Roast, UiActionKind::PleaRequested) => self.on_plea_requested(),
            (PhaseKind::Lockdown, UiActionKind::EmergencyUnlockRequested) => self.on_emergency_tap(),
            (PhaseKind::Lockdown, UiActionKind::ConfessionSubmitted { text }) => {
                self.on_confession(&text)
            }
            (PhaseKind::Lockdown, UiActionKind::CountdownFinished) => self.on_countdown_reported(),
            (phase, kind) => log_debug!(INTERVENTION, "{kind:?} ignored in {phase:?}"),
        }
    }

    pub fn on_timer(&mut self, timer: Timer) {
        if !self.timers.take_if_current(timer) {
            log_debug!(INTERVENTION, "stale {:?} timer dropped", timer.kind);
            return;
        }

        match timer.kind {
            TimerKind::TimeLimit => {
                log_warn!(MONITOR, "time limit reached");
                self.trigger_intervention("time limit reached");
            }
            TimerKind::LockdownTick => self.on_lockdown_tick(),
            TimerKind::PleaReveal => self.on_plea_reveal(),
            TimerKind::ExitGrace => self.on_exit_grace(),
        }
    }

    /// Cancels every timer, hides any overlay and drops the session.
    pub fn shutdown(&mut self) {
        for kind in TimerKind::ALL {
            self.cancel_timer(kind);
        }
        self.hide_overlay();
        self.sessions.stop();
        self.phase = Phase::Idle;
    }

    fn counts_scrolls_from(&self, package: &str) -> bool {
        matches!(self.phase, Phase::Monitoring) && self.sessions.is_monitoring(package)
    }

    /// Fresh settings, else the last good read. `None` only when the store
    /// has never been readable.
    fn current_settings(&mut self) -> Option<Settings> {
        match Settings::load(self.store.as_ref()) {
            Ok(settings) => {
                self.last_settings = Some(settings.clone());
                Some(settings)
            }
            Err(err) => {
                log_error!(INTERVENTION, "settings unreadable: {err:#}");
                self.last_settings.clone()
            }
        }
    }

    fn load_settings(&mut self) -> Settings {
        self.current_settings().unwrap_or_default()
    }

    fn on_focus(&mut self, package: &str) {
        // Routing on defaults would treat every app as unmonitored and drop
        // the live session.
        let Some(settings) = self.current_settings() else {
            log_warn!(APP_SWITCH, "foreground {package} not routed, no settings available");
            return;
        };
        let input_method = self.platform.active_input_method();
        let route = self.router.route(
            package,
            RouteContext {
                monitored: &settings.monitored_packages,
                active_input_method: input_method.as_deref(),
            },
        );
        log_debug!(APP_SWITCH, "foreground {package}: {route:?}");

        match route {
            Route::SelfIgnored | Route::KeyboardIgnored => {}
            Route::TemporaryWindow => {
                if self.sessions.is_active() {
                    log_debug!(APP_SWITCH, "temporary window {package}, session preserved");
                }
            }
            Route::NonMonitored => self.leave(package),
            Route::Monitored => self.enter(package, &settings),
        }
    }

    fn leave(&mut self, package: &str) {
        match self.phase {
            Phase::Idle | Phase::Exiting { .. } => {}
            Phase::Monitoring => {
                log_debug!(APP_SWITCH, "switched to {package}, session stopped");
                self.reset_to_idle();
            }
            Phase::Roast(_) | Phase::Lockdown(_) => {
                log_info!(INTERVENTION, "overlay left for {package}, dismissed");
                self.reset_to_idle();
            }
        }
    }

    fn enter(&mut self, package: &str, settings: &Settings) {
        let already_here = match &self.phase {
            Phase::Monitoring => self.sessions.is_monitoring(package),
            Phase::Roast(ctx) => ctx.package() == package,
            Phase::Lockdown(ctx) => ctx.package == package,
            Phase::Idle | Phase::Exiting { .. } => false,
        };
        if already_here {
            log_debug!(APP_SWITCH, "re-entered {package}, nothing to do");
            return;
        }

        self.reset_to_idle();

        match self.penalties.active_penalty(package) {
            Ok(Some(penalty)) => self.enter_lockdown(package, penalty, settings),
            Ok(None) => self.start_session(package, settings),
            Err(err) => {
                log_error!(PENALTY, "penalty lookup for {package} failed, assuming none: {err:#}");
                self.start_session(package, settings);
            }
        }
    }

    fn reset_to_idle(&mut self) {
        for kind in [
            TimerKind::TimeLimit,
            TimerKind::LockdownTick,
            TimerKind::PleaReveal,
        ] {
            self.cancel_timer(kind);
        }
        if matches!(self.phase, Phase::Roast(_) | Phase::Lockdown(_)) {
            self.hide_overlay();
        }
        self.sessions.stop();
        self.phase = Phase::Idle;
    }

    fn start_session(&mut self, package: &str, settings: &Settings) {
        let now = self.clock.now_ms();
        let limits = settings.session_limits();
        self.sessions
            .start(package, &limits, self.random.as_mut(), now);
        self.classifier.reset();
        self.phase = Phase::Monitoring;
        self.arm_time_limit();
    }

    fn arm_time_limit(&mut self) {
        let session = self.sessions.session();
        let time_limit_ms = session.time_limit_ms;
        log_debug!(
            MONITOR,
            "monitoring {}: {}s, {} swipes",
            session.target_package,
            time_limit_ms / 1_000,
            session.swipe_limit
        );

        if time_limit_ms == 0 {
            self.cancel_timer(TimerKind::TimeLimit);
            return;
        }
        self.schedule(TimerKind::TimeLimit, Duration::from_millis(time_limit_ms));
    }

    fn on_scroll_tick(&mut self) {
        if self.sessions.increment_scroll() {
            log_warn!(SWIPE, "swipe limit reached");
            self.trigger_intervention("swipe limit reached");
        }
    }

    fn trigger_intervention(&mut self, reason: &str) {
        if !matches!(self.phase, Phase::Monitoring) {
            log_debug!(INTERVENTION, "{reason}: intervention already underway");
            return;
        }

        self.cancel_timer(TimerKind::TimeLimit);
        let Some(session) = self.sessions.stop() else {
            self.phase = Phase::Idle;
            return;
        };
        log_warn!(
            INTERVENTION,
            "intervention for {}: {reason}",
            session.target_package
        );

        let settings = self.load_settings();
        if settings.vibration_enabled {
            if let Err(err) = self.platform.vibrate(self.config.vibration) {
                log_warn!(INTERVENTION, "vibration failed: {err:#}");
            }
        }

        let penalty = match self.penalties.penalize(&session.target_package) {
            Ok(penalty) => penalty,
            Err(err) => {
                log_error!(PENALTY, "failed to apply penalty: {err:#}");
                None
            }
        };

        let plea = (settings.plea_enabled && !session.mercy_used).then(|| PleaOffer {
            bonus_minutes: bonus_minutes(&settings),
            win_percent: self.config.plea_win_percent,
        });
        let message = self
            .roasts
            .select(&settings.roast_profile(), None, self.random.as_mut());

        let ticket = Uuid::new_v4();
        let stage = if plea.is_some() {
            PleaStage::Offered
        } else {
            PleaStage::NotOffered
        };
        let request = RoastRequest {
            ticket,
            package: session.target_package.clone(),
            title: roast::title(&settings.gender).to_string(),
            message,
            penalty,
            plea,
        };

        match self.ui.show_roast(&request) {
            Ok(()) => {
                self.phase = Phase::Roast(RoastContext {
                    ticket,
                    session,
                    penalty,
                    stage,
                });
            }
            Err(err) => {
                log_error!(INTERVENTION, "roast overlay unavailable: {err:#}");
                self.phase = Phase::Idle;
            }
        }
    }

    fn on_roast_declined(&mut self) {
        let Phase::Roast(ctx) = &self.phase else {
            return;
        };
        if let PleaStage::Revealing { .. } = ctx.stage {
            log_debug!(PLEA, "decline ignored, plea outcome pending");
            return;
        }

        let package = ctx.package().to_string();
        log_info!(INTERVENTION, "roast accepted, leaving {package}");
        self.exit_app(package);
    }

    fn on_plea_requested(&mut self) {
        let settings = self.load_settings();
        let win_percent = self.config.plea_win_percent;

        let Phase::Roast(ctx) = &mut self.phase else {
            return;
        };
        if ctx.stage != PleaStage::Offered {
            log_debug!(PLEA, "plea not on offer ({:?})", ctx.stage);
            return;
        }

        ctx.session.mercy_used = true;
        let won = self.random.between(0, 99) < win_percent;
        let tag = if won { PLEA_WON_TAG } else { PLEA_LOST_TAG };
        let message = self
            .roasts
            .select(&settings.roast_profile(), Some(tag), self.random.as_mut());
        ctx.stage = PleaStage::Revealing { won };
        let ticket = ctx.ticket;

        log_info!(PLEA, "plea bargain {}", if won { "won" } else { "lost" });
        if let Err(err) = self
            .ui
            .show_plea_outcome(ticket, &PleaOutcome { won, message })
        {
            log_warn!(PLEA, "plea outcome not shown: {err:#}");
        }

        let delay = self.config.plea_reveal_delay;
        self.schedule(TimerKind::PleaReveal, delay);
    }

    fn on_plea_reveal(&mut self) {
        let Phase::Roast(ctx) = &self.phase else {
            return;
        };
        let PleaStage::Revealing { won } = ctx.stage else {
            return;
        };
        let ctx = ctx.clone();

        if won {
            self.resume_after_plea(ctx);
        } else {
            self.exit_app(ctx.session.target_package);
        }
    }

    fn resume_after_plea(&mut self, ctx: RoastContext) {
        let settings = self.load_settings();
        if let Some(penalty) = ctx.penalty {
            self.pardon(&penalty, ctx.package());
        }
        self.hide_overlay();

        self.sessions.restore(ctx.session);
        self.sessions
            .extend(self.config.plea_bonus_swipes, bonus_minutes(&settings));
        self.classifier.reset();
        self.phase = Phase::Monitoring;
        self.arm_time_limit();
    }

    fn enter_lockdown(&mut self, package: &str, penalty: Penalty, settings: &Settings) {
        let emergency = match settings.emergency_mode {
            EmergencyMode::Weak => EmergencyOffer::Tap,
            EmergencyMode::Shame => EmergencyOffer::Confession {
                sentence: CONFESSIONS[self.random.index(CONFESSIONS.len())].to_string(),
            },
            EmergencyMode::Impossible => EmergencyOffer::Unavailable,
        };
        let remaining_ms = self.penalties.remaining_ms(penalty.unblock_at);
        log_info!(
            PENALTY,
            "{package} locked for {}s more ({:?} scope)",
            remaining_ms / 1_000,
            penalty.scope
        );

        let ticket = Uuid::new_v4();
        let request = LockdownRequest {
            ticket,
            package: package.to_string(),
            scope: penalty.scope,
            unblock_at: penalty.unblock_at,
            remaining_ms,
            emergency: emergency.clone(),
        };
        if let Err(err) = self.ui.show_lockdown(&request) {
            log_error!(INTERVENTION, "lockdown overlay unavailable: {err:#}");
            self.phase = Phase::Idle;
            return;
        }

        self.phase = Phase::Lockdown(LockdownContext {
            ticket,
            package: package.to_string(),
            penalty,
            emergency,
        });
        self.schedule_lockdown_tick(remaining_ms);
    }

    fn schedule_lockdown_tick(&mut self, remaining_ms: i64) {
        let remaining = Duration::from_millis(remaining_ms.max(0) as u64);
        let after = remaining.min(self.config.countdown_tick);
        self.schedule(TimerKind::LockdownTick, after);
    }

    fn on_lockdown_tick(&mut self) {
        let Phase::Lockdown(ctx) = &self.phase else {
            return;
        };
        let ticket = ctx.ticket;
        let remaining_ms = self.penalties.remaining_ms(ctx.penalty.unblock_at);

        if remaining_ms == 0 {
            self.expire_lockdown();
            return;
        }
        if let Err(err) = self.ui.update_countdown(ticket, remaining_ms) {
            log_warn!(INTERVENTION, "countdown update failed: {err:#}");
        }
        self.schedule_lockdown_tick(remaining_ms);
    }

    fn on_countdown_reported(&mut self) {
        let Phase::Lockdown(ctx) = &self.phase else {
            return;
        };
        let remaining_ms = self.penalties.remaining_ms(ctx.penalty.unblock_at);
        let tolerance_ms = self.config.countdown_tick.as_millis() as i64;

        if remaining_ms <= tolerance_ms {
            self.expire_lockdown();
        } else {
            log_warn!(
                PENALTY,
                "countdown reported finished with {remaining_ms}ms left, ignored"
            );
        }
    }

    fn expire_lockdown(&mut self) {
        let Phase::Lockdown(ctx) = &self.phase else {
            return;
        };
        let ctx = ctx.clone();

        log_info!(PENALTY, "lockdown on {} served", ctx.package);
        self.pardon(&ctx.penalty, &ctx.package);
        self.exit_app(ctx.package);
    }

    fn on_emergency_tap(&mut self) {
        let Phase::Lockdown(ctx) = &self.phase else {
            return;
        };
        match ctx.emergency {
            EmergencyOffer::Tap => self.grant_emergency_unlock(),
            EmergencyOffer::Confession { .. } => {
                log_debug!(PENALTY, "emergency tap needs a confession")
            }
            EmergencyOffer::Unavailable => log_debug!(PENALTY, "no emergency exit in this mode"),
        }
    }

    fn on_confession(&mut self, text: &str) {
        let Phase::Lockdown(ctx) = &self.phase else {
            return;
        };
        let ticket = ctx.ticket;
        let accepted = match &ctx.emergency {
            EmergencyOffer::Confession { sentence } => text == sentence.as_str(),
            _ => {
                log_debug!(PENALTY, "confession submitted but none was asked for");
                return;
            }
        };

        if accepted {
            self.grant_emergency_unlock();
        } else {
            log_info!(PENALTY, "confession rejected");
            if let Err(err) = self.ui.confession_rejected(ticket) {
                log_warn!(INTERVENTION, "rejection not shown: {err:#}");
            }
        }
    }

    fn grant_emergency_unlock(&mut self) {
        let Phase::Lockdown(ctx) = &self.phase else {
            return;
        };
        let ctx = ctx.clone();
        log_info!(PENALTY, "emergency unlock for {}", ctx.package);

        self.cancel_timer(TimerKind::LockdownTick);
        self.pardon(&ctx.penalty, &ctx.package);
        self.hide_overlay();
        self.phase = Phase::Idle;

        let settings = self.load_settings();
        self.start_session(&ctx.package, &settings);
    }

    fn exit_app(&mut self, package: String) {
        for kind in [
            TimerKind::TimeLimit,
            TimerKind::LockdownTick,
            TimerKind::PleaReveal,
        ] {
            self.cancel_timer(kind);
        }
        self.hide_overlay();
        self.sessions.stop();

        if let Err(err) = self.platform.go_home() {
            log_warn!(INTERVENTION, "go home failed: {err:#}");
        }
        log_debug!(INTERVENTION, "exiting {package}");
        self.phase = Phase::Exiting { package };

        let grace = self.config.exit_grace;
        self.schedule(TimerKind::ExitGrace, grace);
    }

    fn on_exit_grace(&mut self) {
        let Phase::Exiting { package } = &self.phase else {
            return;
        };
        let package = package.clone();

        match self.platform.kill_background_process(&package) {
            Ok(killed) => log_debug!(INTERVENTION, "{package} killed: {killed}"),
            Err(err) => log_warn!(INTERVENTION, "could not kill {package}: {err:#}"),
        }
        self.phase = Phase::Idle;
    }

    fn pardon(&self, penalty: &Penalty, package: &str) {
        if let Err(err) = self
            .penalties
            .pardon(penalty.scope.is_global(), Some(package))
        {
            log_error!(PENALTY, "pardon for {package} failed: {err:#}");
        }
    }

    fn hide_overlay(&mut self) {
        if let Err(err) = self.ui.hide() {
            log_warn!(INTERVENTION, "overlay hide failed: {err:#}");
        }
    }

    fn schedule(&mut self, kind: TimerKind, after: Duration) {
        let timer = self.timers.arm(kind);
        self.scheduler.schedule(timer, after);
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        if self.timers.disarm(kind) {
            self.scheduler.cancel(kind);
        }
    }
}

fn bonus_minutes(settings: &Settings) -> u32 {
    settings.bonus_minutes.clamp(0, i64::from(u32::MAX)) as u32
}
