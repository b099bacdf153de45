use aletheia_call::usage::{Plan, UsageTracker, HISTORY_LIMIT};
use chrono::{Duration, TimeZone, Utc};

#[test]
fn test_plan_limits() {
    assert_eq!(Plan::None.daily_minutes(), 0);
    assert_eq!(Plan::Guided.daily_minutes(), 60);
    assert_eq!(Plan::Extended.daily_minutes(), 480);

    assert_eq!(Plan::from_name("Guided"), Plan::Guided);
    assert_eq!(Plan::from_name("extended"), Plan::Extended);
    assert_eq!(Plan::from_name("premium"), Plan::None);
}

#[test]
fn test_no_plan_cannot_start() {
    let tracker = UsageTracker::new(Plan::None);
    assert!(!tracker.can_start_session());
}

#[test]
fn test_minutes_round_up() {
    let mut tracker = UsageTracker::new(Plan::Guided);
    let start = Utc::now();

    tracker.start_session_at(start);
    let minutes = tracker.end_session_at(start + Duration::seconds(61));

    assert_eq!(minutes, 2);
    assert_eq!(tracker.minutes_used_at(start + Duration::seconds(61)), 2);
    assert_eq!(tracker.history().len(), 1);
    assert_eq!(tracker.history()[0].minutes, 2);
}

#[test]
fn test_limit_reached() {
    let mut tracker = UsageTracker::new(Plan::Guided);
    let start = Utc::now();

    tracker.start_session_at(start);
    let end = start + Duration::minutes(60);
    tracker.end_session_at(end);

    assert!(!tracker.can_start_session_at(end));

    tracker.set_plan(Plan::Extended);
    assert!(tracker.can_start_session_at(end));
}

#[test]
fn test_usage_resets_next_day() {
    let mut tracker = UsageTracker::new(Plan::Guided);
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    tracker.start_session_at(start);
    tracker.end_session_at(start + Duration::minutes(60));

    let tomorrow = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
    assert_eq!(tracker.minutes_used_at(tomorrow), 0);
    assert!(tracker.can_start_session_at(tomorrow));
}

#[test]
fn test_end_without_start_charges_nothing() {
    let mut tracker = UsageTracker::new(Plan::Guided);
    assert_eq!(tracker.end_session(), 0);
    assert!(tracker.history().is_empty());
}

#[test]
fn test_history_keeps_most_recent() {
    let mut tracker = UsageTracker::new(Plan::Extended);
    let base = Utc::now();

    for i in 0..(HISTORY_LIMIT as i64 + 3) {
        let start = base + Duration::minutes(i * 2);
        tracker.start_session_at(start);
        tracker.end_session_at(start + Duration::seconds(30));
    }

    let history = tracker.history();
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert!(history[0].ended_at > history[1].ended_at);
}
