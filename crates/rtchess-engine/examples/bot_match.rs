//! Headless bot match -- two seeded random players on the standard board.
//!
//! Run with:
//!   cargo run --example bot_match -p rtchess-engine -- [seed] [max_ticks]
//!
//! Set `RUST_LOG=rtchess_engine=debug` to watch admissions and captures.

use std::sync::Arc;

use anyhow::Context;
use rtchess_engine::prelude::*;
use rtchess_engine::tick::TickSummary;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = match args.next() {
        Some(s) => s.parse().context("seed must be an integer")?,
        None => 2024,
    };
    let max_ticks: u64 = match args.next() {
        Some(s) => s.parse().context("max_ticks must be an integer")?,
        None => 20_000,
    };

    let config = EngineConfig::default();
    let library = Arc::new(TemplateLibrary::builtin(&config));
    let clock = ManualClock::new(0);
    let step_ms = config.tick_interval().as_millis() as u64;
    let mut tick_loop = TickLoop::from_setup(
        config,
        library,
        &standard_layout(),
        Box::new(clock.clone()),
    )?;

    let mut white = RandomPlayer::new(Side::White, seed);
    let mut black = RandomPlayer::new(Side::Black, seed.wrapping_mul(31).wrapping_add(7));

    let mut captures = 0usize;
    while tick_loop.tick_count() < max_ticks && !tick_loop.world().is_game_over() {
        let now = clock.now_ms();
        for bot in [&mut white, &mut black] {
            if let Some(cmd) = bot.next_command(tick_loop.world(), tick_loop.processor(), now) {
                tick_loop.queue().push(cmd);
            }
        }

        let report = tick_loop.tick();
        captures += report.captures.len();
        for capture in &report.captures {
            println!(
                "t={:>7}ms  {} takes {} at {}",
                report.now_ms, capture.capturing, capture.captured, capture.cell
            );
        }
        if report.tick % 1_000 == 0 {
            let summary = TickSummary::from(&report);
            println!("{}", serde_json::to_string(&summary)?);
        }
        clock.advance(step_ms);
    }

    let snapshot = tick_loop.capture_snapshot()?;
    println!();
    println!("ticks:     {}", tick_loop.tick_count());
    println!("game time: {}ms", tick_loop.now_ms());
    println!("captures:  {captures}");
    println!(
        "remaining: {} white, {} black",
        tick_loop.world().count(Side::White),
        tick_loop.world().count(Side::Black)
    );
    match tick_loop.world().outcome() {
        Outcome::Won { side, piece } => println!("outcome:   {side} wins ({piece} survives)"),
        Outcome::Draw => println!("outcome:   draw"),
        Outcome::Ongoing => println!("outcome:   undecided after {max_ticks} ticks"),
    }
    println!("state:     {}", snapshot.hash);
    Ok(())
}
