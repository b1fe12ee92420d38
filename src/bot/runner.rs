//! Bot match driver.
//!
//! Plays a whole match between bots through the event processor and keeps
//! the root event log, so the run can be replayed and its hash compared.

use tracing::{debug, info, warn};

use crate::bot::{decision_seed, opponents_of, policy_for, BotPolicy, EasyBot};
use crate::game::events::GameEvent;
use crate::game::inventory::{purchase_item, ItemKind};
use crate::game::processor::{EventProcessor, ProcessError, ProcessStatus};
use crate::game::state::{BotLevel, Match, MatchPhase, Player, PlayerId};
use crate::game::turn::{timeout_pill, turn_order_for_match};

/// A seat at the table.
#[derive(Clone, Debug)]
pub struct BotSeat {
    /// Player id
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Tier
    pub level: BotLevel,
}

impl BotSeat {
    /// Easy bot seat.
    pub fn easy(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.into(),
            level: BotLevel::Easy,
        }
    }
}

/// A finished (or capped) bot run.
#[derive(Clone, Debug)]
pub struct BotMatch {
    /// State before the first event
    pub initial: Match,
    /// Every root event submitted, in order
    pub events: Vec<GameEvent>,
    /// Derived events, in order
    pub derived: Vec<GameEvent>,
    /// Final state
    pub state: Match,
    /// Root events the processor ignored
    pub ignored: usize,
}

/// Items a bot buys during the draft, in purchase order.
pub fn draft_loadout(policy: &dyn BotPolicy, player: &Player, processor: &EventProcessor) -> Vec<ItemKind> {
    let config = processor.config();
    let mut scratch = player.clone();
    let mut loadout = Vec::new();

    while let Some(item) = policy.decide_draft_action(&scratch, config, scratch.pill_coins) {
        match purchase_item(&scratch, item, config) {
            Ok(next) => {
                scratch = next;
                loadout.push(item);
            }
            Err(err) => {
                warn!(player = %player.id, %item, %err, "draft pick refused");
                break;
            }
        }
    }
    loadout
}

fn policy(level: BotLevel) -> Box<dyn BotPolicy> {
    policy_for(level).unwrap_or_else(|| Box::new(EasyBot))
}

struct Run<'a, F> {
    processor: &'a EventProcessor,
    clock: F,
    out: BotMatch,
}

impl<F: FnMut() -> u64> Run<'_, F> {
    fn submit(&mut self, event: GameEvent) -> Result<bool, ProcessError> {
        let outcome = self.processor.process_event(&self.out.state, &event)?;
        let applied = outcome.status == ProcessStatus::Applied;
        if !applied {
            self.out.ignored += 1;
        }
        self.out.state = outcome.state;
        self.out.derived.extend(outcome.derived);
        self.out.events.push(event);
        Ok(applied)
    }

    fn now(&mut self) -> u64 {
        (self.clock)()
    }
}

/// Play a bot match from an empty lobby until RESULTS or `max_events` root
/// events. `clock` stamps each event.
pub fn run_bot_match<F: FnMut() -> u64>(
    processor: &EventProcessor,
    seed: u32,
    seats: &[BotSeat],
    clock: F,
    max_events: usize,
) -> Result<BotMatch, ProcessError> {
    let initial = Match::new(seed);
    let mut run = Run {
        processor,
        clock,
        out: BotMatch {
            initial: initial.clone(),
            events: Vec::new(),
            derived: Vec::new(),
            state: initial,
            ignored: 0,
        },
    };

    for seat in seats {
        let player = Player::new_bot(seat.id.clone(), seat.name.as_str(), seat.level, processor.config());
        let loadout = draft_loadout(policy(seat.level).as_ref(), &player, processor);
        debug!(player = %seat.id, ?loadout, "loadout drafted");
        let ts = run.now();
        run.submit(GameEvent::player_joined(ts, seat.id.clone(), seat.name.as_str(), Some(seat.level), loadout))?;
    }

    let mut decisions: u64 = 0;
    while run.out.state.phase != MatchPhase::Results && run.out.events.len() < max_events {
        let state = &run.out.state;
        let active = match state.phase {
            MatchPhase::Match => state.active_player_id().cloned(),
            _ => turn_order_for_match(state).ok().and_then(|order| order.first().cloned()),
        };
        let Some(active) = active else { break };

        let turn_open = state
            .round()
            .and_then(|r| r.open_turn())
            .is_some_and(|t| t.player_id == active);
        if !turn_open {
            let ts = run.now();
            run.submit(GameEvent::turn_started(ts, active))?;
            continue;
        }

        let Some(bot) = state.get_player(&active) else { break };
        let Some(pool) = state.pool() else { break };
        let opponents = opponents_of(state, &active);
        let seed = decision_seed(state.seed, decisions);
        decisions += 1;

        let action = policy(bot.bot_level.unwrap_or_default()).decide_turn_action(bot, &opponents, pool, state, seed);
        let fallback = timeout_pill(state);
        let Some(action) = action else { break };

        let ts = run.now();
        if !run.submit(action.into_event(ts, active.clone()))? {
            // Refused action: consume the timeout pick so the turn still ends
            let Some(pill) = fallback else { break };
            let ts = run.now();
            run.submit(GameEvent::pill_consumed(ts, active, pill))?;
        }
    }

    let out = run.out;
    info!(
        seed,
        events = out.events.len(),
        ignored = out.ignored,
        rounds = out.state.current_round,
        winner = ?out.state.winner_id,
        "bot match finished"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::processor::{replay_events, RecoveryMode};

    fn seats(n: usize) -> Vec<BotSeat> {
        (0..n).map(|i| BotSeat::easy(format!("bot-{}", i), format!("Bot {}", i))).collect()
    }

    fn counter() -> impl FnMut() -> u64 {
        let mut t = 0;
        move || {
            t += 250;
            t
        }
    }

    #[test]
    fn test_bot_match_reaches_results() {
        let processor = EventProcessor::with_mode(GameConfig::default(), RecoveryMode::Halt);
        let run = run_bot_match(&processor, 2024, &seats(4), counter(), 20_000).unwrap();

        assert_eq!(run.state.phase, MatchPhase::Results);
        assert!(run.state.alive_player_count() <= 1);
        assert_eq!(run.state.winner_id.is_some(), run.state.alive_player_count() == 1);
    }

    #[test]
    fn test_bot_match_replays() {
        let processor = EventProcessor::with_mode(GameConfig::default(), RecoveryMode::Halt);
        let run = run_bot_match(&processor, 99, &seats(3), counter(), 20_000).unwrap();

        let replayed = replay_events(&run.initial, &run.events, processor.config()).unwrap();
        assert_eq!(replayed.compute_hash(), run.state.compute_hash());
        assert_eq!(replayed, run.state);
    }

    #[test]
    fn test_loadouts_fit_budget() {
        let processor = EventProcessor::with_mode(GameConfig::default(), RecoveryMode::Halt);
        let player = Player::new_bot(PlayerId::from("b"), "B", BotLevel::Easy, processor.config());
        let loadout = draft_loadout(&EasyBot, &player, &processor);

        let spent: u32 = loadout.iter().map(|i| processor.config().items[i].cost).sum();
        assert!(spent <= processor.config().economy.initial_pill_coins);
        assert_eq!(loadout.first(), Some(&ItemKind::Scanner));
    }
}
