//! DOSED Engine Demo
//!
//! Plays a seeded four-bot match through the event processor, then replays
//! the recorded root events and checks that the final state hash matches.
//!
//! Usage: `dosed-engine [config.json] [seed]`

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dosed::{
    bot::runner::{run_bot_match, BotSeat},
    game::events::{hash_event_log, GameEventData},
    replay_events, EventProcessor, GameConfig, Match, VERSION,
};

const DEFAULT_SEED: u32 = 12345;
const MAX_EVENTS: usize = 50_000;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("DOSED Engine v{}", VERSION);

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GameConfig::from_json_file(&path).with_context(|| format!("loading {}", path))?,
        None => GameConfig::default(),
    };
    config.validate().context("invalid configuration")?;

    let seed = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("seed {:?} is not a u32", raw))?,
        None => DEFAULT_SEED,
    };

    demo_match(config, seed)
}

/// Run a bot match and verify it replays to the same state.
fn demo_match(config: GameConfig, seed: u32) -> Result<()> {
    info!("=== Starting Demo Match ===");
    info!("Seed: {}", seed);

    let seats = vec![
        BotSeat::easy("bot-1", "Ana"),
        BotSeat::easy("bot-2", "Bruno"),
        BotSeat::easy("bot-3", "Caio"),
        BotSeat::easy("bot-4", "Dora"),
    ];

    let processor = EventProcessor::new(config);
    let clock = || u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let run = run_bot_match(&processor, seed, &seats, clock, MAX_EVENTS)?;

    info!("Match ID: {}", run.state.id);
    for event in &run.derived {
        match &event.data {
            GameEventData::CollapseTriggered { player_id } => {
                let lives = run.state.get_player(player_id).map(|p| p.lives);
                info!("{} collapsed (lives now {:?})", player_id, lives);
            }
            GameEventData::RoundCompleted { round } => info!("Round {} completed", round),
            GameEventData::MatchEnded { winner_id: Some(winner) } => info!("Match ended! Winner: {}", winner),
            GameEventData::MatchEnded { winner_id: None } => info!("Match ended in a draw"),
            _ => {}
        }
    }

    // Print final results
    info!("=== Match Results ===");
    let hash = run.state.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));
    info!("Rounds played: {}", run.state.current_round);
    for player in run.state.players.values() {
        info!(
            "{:<6} lives={} resistance={} collapses={} coins={}{}",
            player.name,
            player.lives,
            player.resistance,
            player.total_collapses,
            player.pill_coins,
            if player.is_eliminated { " (eliminated)" } else { "" }
        );
    }
    info!(
        "Root events: {} ({} ignored), derived events: {}",
        run.events.len(),
        run.ignored,
        run.derived.len()
    );

    info!("Event Log Hash: {}", hex::encode(hash_event_log(&run.events)?));

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let replayed = replay_events(&run.initial, &run.events, processor.config())?;
    let replay_hash = replayed.compute_hash();
    info!("Replay State Hash: {}", hex::encode(replay_hash));
    if replay_hash != hash {
        bail!("determinism check failed: replay diverged from the live run");
    }

    let bytes = run.state.to_bytes()?;
    let restored = Match::from_bytes(&bytes)?;
    if restored.compute_hash() != hash {
        bail!("snapshot round-trip changed the state hash");
    }
    info!("✓ Determinism verified: hashes match ({} byte snapshot)", bytes.len());

    Ok(())
}
