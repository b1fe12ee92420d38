//! End-to-end match scenarios driven through the event processor.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use dosed::bot::runner::{run_bot_match, BotSeat};
use dosed::core::rng::SeededRng;
use dosed::game::effect::{apply_effect_to_player, resolve_pill_effect, EffectKind};
use dosed::game::events::GameEventData;
use dosed::game::pill::{Pill, PillModifier, PillType, ShapeId};
use dosed::game::pool::{generate_pool, validate_pool};
use dosed::game::processor::ProcessStatus;
use dosed::game::turn::turn_order_for_match;
use dosed::{replay_events, EventProcessor, GameConfig, GameEvent, Match, MatchPhase, Player, PlayerId, RecoveryMode};

fn processor() -> EventProcessor {
    EventProcessor::with_mode(GameConfig::default(), RecoveryMode::Halt)
}

fn clock() -> impl FnMut() -> u64 {
    let mut t = 1_700_000_000_000u64;
    move || {
        t += 1_500;
        t
    }
}

#[test]
fn round_one_pool_for_seed_12345() {
    let config = GameConfig::default();
    let pool = generate_pool(1, &config, &mut SeededRng::new(12345));

    assert_eq!(pool.size, 6);
    assert!(pool.distinct_shapes().len() >= 3);
    assert!(validate_pool(&pool, &config));
}

#[test]
fn dmg_high_on_low_resistance_collapses() {
    let config = GameConfig::default();
    let mut player = Player::new(PlayerId::from("p"), "P", &config);
    player.resistance = 2;
    let pill = Pill::new(1, 0, PillType::DmgHigh, ShapeId::from("capsule"));

    let effect = resolve_pill_effect(&pill, &player, &config.effects);
    assert_eq!(effect.value, -4);
    let hit = apply_effect_to_player(&player, &effect, &config.health);
    assert_eq!(hit.resistance, -2);

    let after = dosed::game::collapse::process_collapse_or_elimination(&hit, &config.health)
        .map(|result| dosed::game::collapse::apply_collapse_to_player(&hit, &result, &config.health))
        .unwrap();
    assert_eq!(after.lives, 2);
    assert_eq!(after.resistance, after.resistance_cap);
}

#[test]
fn inverted_doubled_heal_becomes_damage() {
    let config = GameConfig::default();
    let player = Player::new(PlayerId::from("p"), "P", &config);
    let mut pill = Pill::new(2, 0, PillType::Heal, ShapeId::from("round"));
    pill.add_modifier(PillModifier::Doubled);
    pill.add_modifier(PillModifier::Inverted);

    let effect = resolve_pill_effect(&pill, &player, &config.effects);
    assert_eq!(effect.kind, EffectKind::Damage);
    assert_eq!(effect.value, -4);
    assert_eq!(apply_effect_to_player(&player, &effect, &config.health).resistance, 2);
}

#[test]
fn full_bot_match_is_reproducible() {
    let p = processor();
    let seats: Vec<BotSeat> = ["ana", "bruno", "caio", "dora"]
        .iter()
        .map(|name| BotSeat::easy(*name, *name))
        .collect();

    let first = run_bot_match(&p, 12345, &seats, clock(), 50_000).unwrap();
    let second = run_bot_match(&p, 12345, &seats, clock(), 50_000).unwrap();

    assert_eq!(first.state.phase, MatchPhase::Results);
    assert_eq!(first.events, second.events);
    assert_eq!(first.state, second.state);

    let replayed = replay_events(&first.initial, &first.events, p.config()).unwrap();
    assert_eq!(replayed.compute_hash(), first.state.compute_hash());

    let ended = first
        .derived
        .iter()
        .filter(|e| matches!(e.data, GameEventData::MatchEnded { .. }))
        .count();
    assert_eq!(ended, 1);
    assert!(first
        .derived
        .iter()
        .any(|e| matches!(e.data, GameEventData::RoundCompleted { round: 1 })));
}

#[test]
fn different_seeds_play_different_matches() {
    let p = processor();
    let seats = vec![BotSeat::easy("a", "A"), BotSeat::easy("b", "B")];
    let one = run_bot_match(&p, 1, &seats, clock(), 50_000).unwrap();
    let two = run_bot_match(&p, 2, &seats, clock(), 50_000).unwrap();
    assert_ne!(one.state.compute_hash(), two.state.compute_hash());
}

#[test]
fn snapshot_survives_bincode_and_json() {
    let p = processor();
    let seats = vec![BotSeat::easy("a", "A"), BotSeat::easy("b", "B"), BotSeat::easy("c", "C")];
    let run = run_bot_match(&p, 77, &seats, clock(), 50_000).unwrap();

    let restored = Match::from_bytes(&run.state.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, run.state);

    let json = serde_json::to_string(&run.events).unwrap();
    let events: Vec<GameEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(events, run.events);
}

#[test]
fn double_click_on_a_pill_is_a_no_op() {
    let p = processor();
    let mut state = Match::new(5);
    for name in ["a", "b"] {
        state = p
            .process_event(&state, &GameEvent::player_joined(0, PlayerId::from(name), name, None, vec![]))
            .unwrap()
            .state;
    }
    let first = turn_order_for_match(&state).unwrap()[0].clone();
    state = p.process_event(&state, &GameEvent::turn_started(1, first.clone())).unwrap().state;

    let pill = state.pool().unwrap().available_pills().next().unwrap().id.clone();
    let click = GameEvent::pill_consumed(2, first.clone(), pill);
    let once = p.process_event(&state, &click).unwrap();
    assert_eq!(once.status, ProcessStatus::Applied);

    let twice = p.process_event(&once.state, &click).unwrap();
    assert!(matches!(twice.status, ProcessStatus::Ignored(_)));
    assert_eq!(twice.state, once.state);
}

#[test]
fn recover_mode_keeps_last_valid_state() {
    let p = EventProcessor::with_mode(GameConfig::default(), RecoveryMode::Recover);
    let mut state = Match::new(5);
    for name in ["a", "b"] {
        state = p
            .process_event(&state, &GameEvent::player_joined(0, PlayerId::from(name), name, None, vec![]))
            .unwrap()
            .state;
    }
    // Corrupt a player so the next applied event fails validation
    state.get_player_mut(&PlayerId::from("a")).unwrap().lives = 9;

    let first = turn_order_for_match(&state).unwrap()[0].clone();
    let outcome = p.process_event(&state, &GameEvent::turn_started(1, first)).unwrap();
    assert!(matches!(outcome.status, ProcessStatus::RolledBack(_)));
    assert_eq!(outcome.state.phase, MatchPhase::Lobby);
}
