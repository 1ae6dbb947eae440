//! End-to-end game scenarios driven through the tick loop on a manual clock.
//!
//! Each test builds a small layout, feeds commands through the queue exactly
//! as an input thread would, and checks piece timing, admission, capture
//! arbitration and win detection from the outside.

use std::sync::{Arc, Mutex};

use rtchess_engine::prelude::*;
use rtchess_engine::rtchess_events::event::{GAME_OVER, PIECE_CAPTURED, PIECE_MOVED};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn id(s: &str) -> PieceId {
    PieceId::new(s)
}

fn build(clock: &ManualClock, layout: &[(&str, Cell)]) -> TickLoop {
    let config = EngineConfig::default();
    let library = Arc::new(TemplateLibrary::builtin(&config));
    let setup: Vec<Placement> = layout
        .iter()
        .map(|(code, cell)| Placement::new(code.parse().unwrap(), *cell))
        .collect();
    TickLoop::from_setup(config, library, &setup, Box::new(clock.clone())).unwrap()
}

fn send(tick_loop: &TickLoop, piece: &str, kind: CommandKind, from: Cell, to: Cell) {
    tick_loop.queue().push(Command::movement(
        0,
        id(piece),
        kind,
        from,
        to,
        &Board::default(),
    ));
}

fn tick_at(clock: &ManualClock, tick_loop: &mut TickLoop, now_ms: u64) -> TickReport {
    clock.set(now_ms);
    tick_loop.tick()
}

// ---------------------------------------------------------------------------
// 1. Slide timing
// ---------------------------------------------------------------------------

#[test]
fn pawn_slide_timing_and_cooldown() {
    let clock = ManualClock::new(0);
    let mut tick_loop = build(&clock, &[("PW", Cell::new(6, 4)), ("KB", Cell::new(0, 0))]);

    send(&tick_loop, "PW_0", CommandKind::Move, Cell::new(6, 4), Cell::new(5, 4));
    let report = tick_at(&clock, &mut tick_loop, 0);
    assert_eq!(report.successful().count(), 1);

    let pawn = tick_loop.world().piece(&id("PW_0")).unwrap();
    assert_eq!(pawn.motion().action_duration_ms(), 250);
    assert_eq!(pawn.motion().phase(), Phase::Moving);

    tick_at(&clock, &mut tick_loop, 100);
    let pawn = tick_loop.world().piece(&id("PW_0")).unwrap();
    assert!(!pawn.motion().can_be_captured(100));

    tick_at(&clock, &mut tick_loop, 250);
    let pawn = tick_loop.world().piece(&id("PW_0")).unwrap();
    assert_eq!(pawn.cell(), Cell::new(5, 4));
    assert_eq!(pawn.pos(), Position::from(Cell::new(5, 4)));
    assert_eq!(pawn.motion().phase(), Phase::Idle);
    assert_eq!(pawn.machine().state_name(), "idle");

    for now in [250, 1000, 4000, 4249] {
        assert!(!pawn.motion().can_be_captured(now), "capturable at {now}");
        assert!(!pawn.motion().can_capture(now), "can capture at {now}");
    }
    assert!(pawn.motion().can_be_captured(4250));
    assert!(pawn.motion().can_capture(4250));
}

// ---------------------------------------------------------------------------
// 2. Admission during cooldown
// ---------------------------------------------------------------------------

#[test]
fn command_during_cooldown_is_rejected_without_side_effects() {
    let clock = ManualClock::new(0);
    let mut tick_loop = build(&clock, &[("PW", Cell::new(6, 4)), ("KB", Cell::new(0, 0))]);

    send(&tick_loop, "PW_0", CommandKind::Move, Cell::new(6, 4), Cell::new(5, 4));
    tick_at(&clock, &mut tick_loop, 0);
    tick_at(&clock, &mut tick_loop, 500);
    let before = tick_loop.world().piece(&id("PW_0")).unwrap().motion().state().clone();

    send(&tick_loop, "PW_0", CommandKind::Move, Cell::new(5, 4), Cell::new(4, 4));
    let report = tick_at(&clock, &mut tick_loop, 1000);
    assert!(report.applied.is_empty());
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(
        report.rejections[0].reason,
        AdmissionRejected::InCooldown {
            piece: id("PW_0"),
            until_ms: 4250,
        }
    );

    let pawn = tick_loop.world().piece(&id("PW_0")).unwrap();
    assert_eq!(pawn.motion().state(), &before);
    assert_eq!(pawn.last_move_ms(), Some(0));

    // Once the window closes the same request goes through.
    send(&tick_loop, "PW_0", CommandKind::Move, Cell::new(5, 4), Cell::new(4, 4));
    let report = tick_at(&clock, &mut tick_loop, 4250);
    assert!(report.rejections.is_empty());
    assert_eq!(report.successful().count(), 1);
}

#[test]
fn rejection_reasons_are_specific() {
    let clock = ManualClock::new(0);
    let mut tick_loop = build(
        &clock,
        &[("RW", Cell::new(3, 3)), ("NW", Cell::new(3, 4)), ("KB", Cell::new(7, 7))],
    );

    send(&tick_loop, "RW_0", CommandKind::Move, Cell::new(3, 3), Cell::new(3, 3));
    send(&tick_loop, "RW_0", CommandKind::Move, Cell::new(3, 3), Cell::new(3, 5));
    send(&tick_loop, "RW_0", CommandKind::Jump, Cell::new(3, 3), Cell::new(7, 3));
    send(&tick_loop, "RW_0", CommandKind::Move, Cell::new(3, 3), Cell::new(3, 4));
    send(&tick_loop, "XX_9", CommandKind::Move, Cell::new(3, 3), Cell::new(2, 3));
    let report = tick_at(&clock, &mut tick_loop, 0);

    let reasons: Vec<_> = report.rejections.iter().map(|r| r.reason.clone()).collect();
    assert!(matches!(reasons[0], AdmissionRejected::SamePosition { .. }));
    assert!(matches!(
        reasons[1],
        AdmissionRejected::DistanceExceeded { distance: 2, max: 1, .. }
    ));
    assert!(matches!(
        reasons[2],
        AdmissionRejected::DistanceExceeded { distance: 4, max: 3, .. }
    ));
    assert!(matches!(reasons[3], AdmissionRejected::OwnPieceOccupied { .. }));
    assert!(matches!(reasons[4], AdmissionRejected::UnknownPiece { .. }));
    assert!(report.applied.is_empty());
}

// ---------------------------------------------------------------------------
// 3. Contested landing
// ---------------------------------------------------------------------------

fn contested_jumps(first: (&str, Cell), second: (&str, Cell)) -> (TickLoop, ManualClock) {
    let clock = ManualClock::new(0);
    let mut tick_loop = build(
        &clock,
        &[("RW", Cell::new(3, 2)), ("RB", Cell::new(3, 7))],
    );
    let target = Cell::new(3, 5);

    tick_at(&clock, &mut tick_loop, 0);
    send(&tick_loop, first.0, CommandKind::Jump, first.1, target);
    assert_eq!(tick_at(&clock, &mut tick_loop, 100).successful().count(), 1);
    send(&tick_loop, second.0, CommandKind::Jump, second.1, target);
    assert_eq!(tick_at(&clock, &mut tick_loop, 300).successful().count(), 1);

    let report = tick_at(&clock, &mut tick_loop, 1100);
    assert!(report.captures.is_empty(), "second jumper is still airborne");
    (tick_loop, clock)
}

#[test]
fn later_jumper_wins_contested_cell() {
    let (mut tick_loop, clock) =
        contested_jumps(("RW_0", Cell::new(3, 2)), ("RB_1", Cell::new(3, 7)));

    let report = tick_at(&clock, &mut tick_loop, 1300);
    assert_eq!(
        report.captures,
        vec![Capture {
            captured: id("RW_0"),
            captured_side: Side::White,
            capturing: id("RB_1"),
            cell: Cell::new(3, 5),
        }]
    );
    assert_eq!(tick_loop.world().len(), 1);
    assert_eq!(
        report.outcome,
        Outcome::Won {
            side: Side::Black,
            piece: id("RB_1"),
        }
    );

    tick_at(&clock, &mut tick_loop, 1400);
    let journal = tick_loop.journal();
    assert_eq!(journal.named(PIECE_CAPTURED).count(), 1);
    assert_eq!(journal.named(GAME_OVER).count(), 1);
    assert_eq!(journal.named(PIECE_MOVED).count(), 2);
}

#[test]
fn arbitration_follows_timing_not_side() {
    let (mut tick_loop, clock) =
        contested_jumps(("RB_1", Cell::new(3, 7)), ("RW_0", Cell::new(3, 2)));

    let report = tick_at(&clock, &mut tick_loop, 1300);
    assert_eq!(report.captures.len(), 1);
    assert_eq!(report.captures[0].capturing, id("RW_0"));
    assert_eq!(report.outcome.winner(), Some(Side::White));
}

#[test]
fn commands_after_game_over_are_refused() {
    let (mut tick_loop, clock) =
        contested_jumps(("RW_0", Cell::new(3, 2)), ("RB_1", Cell::new(3, 7)));
    tick_at(&clock, &mut tick_loop, 1300);

    send(&tick_loop, "RB_1", CommandKind::Move, Cell::new(3, 5), Cell::new(4, 5));
    let report = tick_at(&clock, &mut tick_loop, 5000);
    assert_eq!(report.rejections[0].reason, AdmissionRejected::GameOver);
}

// ---------------------------------------------------------------------------
// 4. Notifications
// ---------------------------------------------------------------------------

#[test]
fn subscribers_see_events_in_order() {
    let clock = ManualClock::new(0);
    let mut tick_loop = build(&clock, &[("QW", Cell::new(4, 4)), ("PB", Cell::new(5, 5))]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    tick_loop
        .bus_mut()
        .subscribe_all(move |event| sink.lock().unwrap().push(event.name()));

    // The queen slides onto the idle pawn and takes it on arrival.
    send(&tick_loop, "QW_0", CommandKind::Move, Cell::new(4, 4), Cell::new(5, 5));
    tick_at(&clock, &mut tick_loop, 0);
    let report = tick_at(&clock, &mut tick_loop, 400);

    assert_eq!(report.captures.len(), 1);
    assert_eq!(report.captures[0].captured, id("PB_1"));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![PIECE_MOVED, PIECE_CAPTURED, GAME_OVER]
    );
}
