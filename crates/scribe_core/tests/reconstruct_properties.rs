//! Property tests for reconstruction
//!
//! These tests verify that:
//! - Reconstruction is a pure function of (events, cutoff)
//! - Starting from the last snapshot gives the same frame as a full scan
//! - Arbitrary, even nonsensical, edit ranges never panic

use proptest::prelude::*;
use scribe_core::{
    reconstruct_at, reconstruct_from_snapshot, reconstruct_until, Color, Event, EventLog,
    StylePatch, Timestamp,
};

/// One step of a generated session: a time delta and an event body.
fn event_body() -> impl Strategy<Value = (u64, u8, i64, i64, String)> {
    (
        0u64..50,
        0u8..4,
        -10i64..40,
        -10i64..40,
        "[a-zé ]{0,4}",
    )
}

fn build_events(steps: Vec<(u64, u8, i64, i64, String)>) -> Vec<Event> {
    let mut time = 1_000u64;
    steps
        .into_iter()
        .map(|(dt, kind, a, b, text)| {
            time += dt;
            let t = Timestamp::from_millis(time);
            match kind {
                0 => Event::insert(t, a, text),
                1 => Event::delete(t, a, b),
                2 => Event::style(
                    t,
                    StylePatch {
                        color: (a % 2 == 0).then(|| Color::from_hex(0x22C55E)),
                        size_pt: (b % 3 == 0).then_some(12.0 + a.unsigned_abs() as f32),
                        gradient: None,
                    },
                ),
                _ => Event::snapshot(t, text),
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn snapshot_shortcut_equals_full_scan(
        steps in proptest::collection::vec(event_body(), 0..60),
        fraction in 0.0f64..=1.0,
    ) {
        let events = build_events(steps);
        prop_assert_eq!(
            reconstruct_at(&events, fraction),
            reconstruct_from_snapshot(&events, fraction)
        );
    }

    #[test]
    fn reconstruction_is_deterministic(
        steps in proptest::collection::vec(event_body(), 0..60),
        fraction in -0.5f64..1.5,
    ) {
        let events = build_events(steps);
        prop_assert_eq!(reconstruct_at(&events, fraction), reconstruct_at(&events, fraction));
    }

    #[test]
    fn full_cutoff_replays_everything(
        steps in proptest::collection::vec(event_body(), 1..60),
    ) {
        let events = build_events(steps);
        let last = events.last().map(Event::time).unwrap_or_default();
        prop_assert_eq!(reconstruct_at(&events, 1.0), reconstruct_until(&events, last));
    }
}

#[test]
fn test_eviction_then_reconstruction() {
    let mut log = EventLog::with_capacity(3);
    log.append(Event::insert(Timestamp::from_millis(0), 0, "a"));
    log.append(Event::insert(Timestamp::from_millis(1), 1, "b"));
    log.append(Event::snapshot(Timestamp::from_millis(2), "ab"));
    log.append(Event::insert(Timestamp::from_millis(3), 2, "c"));

    // The first insert is gone, but the snapshot still anchors the text.
    let events = log.dump();
    assert_eq!(events.len(), 3);
    assert_eq!(reconstruct_at(&events, 1.0).text, "abc");
}
