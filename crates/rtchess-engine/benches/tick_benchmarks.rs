//! Tick loop benchmarks on the standard 32-piece board.
//!
//! The frame budget at the default 30 Hz is ~33ms; a full tick with both
//! bots issuing commands should stay far below that.
//!
//! Run with: `cargo bench --bench tick_benchmarks`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rtchess_engine::prelude::*;

fn standard(clock: &ManualClock) -> TickLoop {
    TickLoop::standard(EngineConfig::default(), Box::new(clock.clone()))
        .expect("standard layout always builds")
}

// ---------------------------------------------------------------------------
// Benchmark 1: Idle board
// ---------------------------------------------------------------------------

fn bench_idle_tick(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let mut tick_loop = standard(&clock);

    c.bench_function("tick_standard_board_idle", |b| {
        b.iter(|| {
            clock.advance(33);
            black_box(tick_loop.tick());
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 2: Two bots issuing commands every tick
// ---------------------------------------------------------------------------

fn bench_bot_tick(c: &mut Criterion) {
    c.bench_function("tick_standard_board_two_bots", |b| {
        let clock = ManualClock::new(0);
        let mut tick_loop = standard(&clock);
        let mut white = RandomPlayer::new(Side::White, 1);
        let mut black = RandomPlayer::new(Side::Black, 2);

        b.iter(|| {
            if tick_loop.world().is_game_over() {
                tick_loop = standard(&clock);
            }
            let now = clock.advance(33);
            for bot in [&mut white, &mut black] {
                if let Some(cmd) = bot.next_command(tick_loop.world(), tick_loop.processor(), now) {
                    tick_loop.queue().push(cmd);
                }
            }
            black_box(tick_loop.tick());
        });
    });
}

// ---------------------------------------------------------------------------
// Benchmark 3: Snapshot hashing
// ---------------------------------------------------------------------------

fn bench_state_hash(c: &mut Criterion) {
    let clock = ManualClock::new(0);
    let tick_loop = standard(&clock);

    c.bench_function("state_hash_standard_board", |b| {
        b.iter(|| black_box(tick_loop.state_hash().expect("snapshot serializes")));
    });
}

// ---------------------------------------------------------------------------
// Benchmark 4: Collision pass with a crowded cell
// ---------------------------------------------------------------------------

fn bench_collision_crowded(c: &mut Criterion) {
    let library = Arc::new(TemplateLibrary::builtin(&EngineConfig::default()));

    c.bench_function("collision_resolve_crowded_cell", |b| {
        b.iter_with_setup(
            || {
                let mut factory = PieceFactory::new(Arc::clone(&library));
                let mut world = SimulationWorld::new(Board::default());
                for (i, placement) in standard_layout().into_iter().enumerate() {
                    let cell = if i % 4 == 0 { Cell::new(4, 4) } else { placement.cell };
                    let mut piece = factory
                        .create(placement.code, cell)
                        .expect("builtin templates cover every code");
                    piece.arm_admission(i as u64, 0);
                    world.spawn(piece).expect("fresh ids");
                }
                world
            },
            |mut world| black_box(CollisionResolver::new().resolve(&mut world, 1_000)),
        );
    });
}

criterion_group!(
    benches,
    bench_idle_tick,
    bench_bot_tick,
    bench_state_hash,
    bench_collision_crowded
);
criterion_main!(benches);
