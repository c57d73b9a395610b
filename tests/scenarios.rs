mod common;

use brostop_lib::{
    intervention::{EmergencyOffer, PhaseKind, TimerKind, UiActionKind, CONFESSIONS},
    penalty::PenaltyScope,
    settings::keys,
    store::ConfigStore,
};

use common::{Harness, CHROME, INSTA, SHADE, START_MS};

#[test]
fn fixed_budget_breaches_on_fifth_swipe() {
    let mut h = Harness::new();
    h.focus(INSTA);
    assert_eq!(h.guard.phase(), PhaseKind::Monitoring);
    assert_eq!(h.guard.session().swipe_limit, 5);
    assert_eq!(h.guard.session().time_limit_ms, 60 * 60_000);

    h.swipes(INSTA, 4);
    assert_eq!(h.guard.phase(), PhaseKind::Monitoring);
    assert_eq!(h.guard.session().scroll_count, 4);

    h.swipe(INSTA);
    assert_eq!(h.guard.phase(), PhaseKind::Roast);
    assert!(!h.guard.session().active);
    assert!(h.scheduler.pending(TimerKind::TimeLimit).is_none());

    // Session is gone; a sixth swipe changes nothing.
    h.swipe(INSTA);
    assert_eq!(h.guard.phase(), PhaseKind::Roast);
    assert_eq!(h.ui.log().roasts.len(), 1);
    assert_eq!(h.guard.session().scroll_count, 0);
}

#[test]
fn zero_penalty_shows_roast_but_never_locks() {
    let mut h = Harness::new();
    h.set_int(keys::PENALTY_TIME, 0);

    assert!(!h.guard.penalties().apply_penalty().unwrap());

    h.focus(INSTA);
    h.swipes(INSTA, 5);
    let roast = h.last_roast();
    assert!(roast.penalty.is_none());
    assert!(h.store.get(keys::UNBLOCK_TIME).unwrap().is_none());
    assert!(h
        .store
        .keys_with_prefix(keys::APP_PENALTY_PREFIX)
        .unwrap()
        .is_empty());

    h.act(UiActionKind::Declined);
    h.fire(TimerKind::ExitGrace);
    assert!(h.guard.penalties().get_active_penalty(INSTA).unwrap().is_none());

    h.focus(INSTA);
    assert_eq!(h.guard.phase(), PhaseKind::Monitoring);
    assert!(h.ui.log().lockdowns.is_empty());
}

#[test]
fn shame_unlock_needs_exact_sentence() {
    let mut h = Harness::new();
    h.set_string(keys::EMERGENCY_MODE, "shame");
    h.set_int(&keys::app_penalty(INSTA), START_MS + 5 * 60_000);
    h.random.push(1);

    h.focus(INSTA);
    assert_eq!(h.guard.phase(), PhaseKind::Lockdown);
    let lockdown = h.last_lockdown();
    let sentence = match &lockdown.emergency {
        EmergencyOffer::Confession { sentence } => sentence.clone(),
        other => panic!("expected a confession offer, got {other:?}"),
    };
    assert_eq!(sentence, CONFESSIONS[1]);

    // A tap is not enough in shame mode.
    h.act(UiActionKind::EmergencyUnlockRequested);
    assert_eq!(h.guard.phase(), PhaseKind::Lockdown);

    h.act(UiActionKind::ConfessionSubmitted {
        text: sentence.to_lowercase(),
    });
    assert_eq!(h.guard.phase(), PhaseKind::Lockdown);
    assert_eq!(h.ui.log().rejections, vec![lockdown.ticket]);
    assert!(h.guard.penalties().get_active_penalty(INSTA).unwrap().is_some());

    h.act(UiActionKind::ConfessionSubmitted { text: sentence });
    assert_eq!(h.guard.phase(), PhaseKind::Monitoring);
    assert!(h.guard.penalties().get_active_penalty(INSTA).unwrap().is_none());
    let session = h.guard.session();
    assert_eq!(session.target_package, INSTA);
    assert_eq!(session.scroll_count, 0);
    assert!(h.scheduler.pending(TimerKind::LockdownTick).is_none());
    assert!(h.scheduler.pending(TimerKind::TimeLimit).is_some());
}

#[test]
fn won_plea_pardons_and_extends_from_current_count() {
    let mut h = Harness::new();
    h.focus(INSTA);
    h.swipes(INSTA, 5);

    let roast = h.last_roast();
    let offer = roast.plea.clone().expect("plea offered");
    assert_eq!(offer.bonus_minutes, 5);
    assert_eq!(roast.penalty.map(|p| p.scope), Some(PenaltyScope::App));
    assert!(h.guard.penalties().get_active_penalty(INSTA).unwrap().is_some());

    // Scripted draw 0 lands under the 20 % threshold.
    h.random.push(0);
    h.act(UiActionKind::PleaRequested);
    {
        let log = h.ui.log();
        let (ticket, outcome) = log.outcomes.last().expect("outcome shown");
        assert_eq!(*ticket, roast.ticket);
        assert!(outcome.won);
        assert_eq!(outcome.message, "Mercy granted.");
    }
    assert_eq!(h.guard.phase(), PhaseKind::Roast);

    h.fire(TimerKind::PleaReveal);
    assert_eq!(h.guard.phase(), PhaseKind::Monitoring);
    assert!(h.guard.penalties().get_active_penalty(INSTA).unwrap().is_none());

    let session = h.guard.session().clone();
    assert_eq!(session.target_package, INSTA);
    assert_eq!(session.scroll_count, 5);
    assert_eq!(session.swipe_limit, 35);
    assert!(session.mercy_used);
    let (_, after) = h.scheduler.pending(TimerKind::TimeLimit).unwrap();
    assert_eq!(after.as_millis(), 5 * 60_000);

    // Mercy is spent: the next breach offers no plea.
    h.swipes(INSTA, 30);
    assert_eq!(h.guard.phase(), PhaseKind::Roast);
    assert!(h.last_roast().plea.is_none());
}

#[test]
fn temporary_window_preserves_session() {
    let mut h = Harness::new();
    h.focus(INSTA);
    h.swipes(INSTA, 2);
    let before = h.guard.session().clone();
    let limit_timer = h.scheduler.pending(TimerKind::TimeLimit);

    h.focus(SHADE);
    h.focus("com.google.android.googlequicksearchbox");

    assert_eq!(h.guard.phase(), PhaseKind::Monitoring);
    assert_eq!(h.guard.session(), &before);
    assert_eq!(h.scheduler.pending(TimerKind::TimeLimit), limit_timer);

    h.focus(CHROME);
    assert_eq!(h.guard.phase(), PhaseKind::Idle);
    assert!(!h.guard.session().active);
}
