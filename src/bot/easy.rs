//! Easy bot: patient and predictable.
//!
//! Turn priorities, first match wins:
//!
//! 1. In danger: Pocket Pill, then Shield if not already shielded
//! 2. Scanner on a random unrevealed pill
//! 3. Revealed SAFE pill (80%)
//! 4. Revealed HEAL pill while below the cap
//! 5. Unrevealed pill (60%), else any available pill

use tracing::trace;

use crate::bot::{
    available_pills, is_player_in_danger, revealed_pills_of, unrevealed_pills, BotAction, BotPolicy,
};
use crate::config::GameConfig;
use crate::core::rng::SeededRng;
use crate::game::inventory::{add_item_to_inventory, ItemKind, ItemTarget};
use crate::game::pill::{Pill, PillType};
use crate::game::pool::Pool;
use crate::game::state::{BotLevel, Match, Player, StatusKind};

const SAFE_PICK_CHANCE: f64 = 0.8;
const UNREVEALED_PICK_CHANCE: f64 = 0.6;

/// Easy tier policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct EasyBot;

fn pick(rng: &mut SeededRng, pills: &[&Pill]) -> Option<BotAction> {
    rng.choice(pills).map(|p| BotAction::ConsumePill(p.id.clone()))
}

impl BotPolicy for EasyBot {
    fn level(&self) -> BotLevel {
        BotLevel::Easy
    }

    /// Scanner, then Shield, then Pocket Pill, else the cheapest thing that
    /// still fits the budget and the inventory.
    fn decide_draft_action(&self, player: &Player, config: &GameConfig, budget: u32) -> Option<ItemKind> {
        let mut affordable: Vec<(ItemKind, u32)> = config
            .items
            .iter()
            .filter(|(kind, item)| item.cost <= budget && add_item_to_inventory(player, **kind, 1, config).is_ok())
            .map(|(kind, item)| (*kind, item.cost))
            .collect();
        affordable.sort_by(|a, b| b.1.cmp(&a.1));

        [ItemKind::Scanner, ItemKind::Shield, ItemKind::PocketPill]
            .into_iter()
            .find(|wanted| affordable.iter().any(|(kind, _)| kind == wanted))
            .or_else(|| affordable.last().map(|(kind, _)| *kind))
    }

    fn decide_turn_action(
        &self,
        bot: &Player,
        _opponents: &[&Player],
        pool: &Pool,
        _state: &Match,
        seed: u32,
    ) -> Option<BotAction> {
        let mut rng = SeededRng::new(seed);

        if is_player_in_danger(bot) {
            if bot.item_quantity(ItemKind::PocketPill) > 0 {
                return Some(BotAction::UseItem {
                    item: ItemKind::PocketPill,
                    target: ItemTarget::None,
                });
            }
            if bot.item_quantity(ItemKind::Shield) > 0 && !bot.has_status(StatusKind::Shielded) {
                return Some(BotAction::UseItem {
                    item: ItemKind::Shield,
                    target: ItemTarget::None,
                });
            }
        }

        let unrevealed = unrevealed_pills(pool);
        if bot.item_quantity(ItemKind::Scanner) > 0 {
            if let Some(target) = rng.choice(&unrevealed) {
                return Some(BotAction::UseItem {
                    item: ItemKind::Scanner,
                    target: ItemTarget::Pill(target.id.clone()),
                });
            }
        }

        let safe = revealed_pills_of(pool, PillType::Safe);
        if !safe.is_empty() && rng.chance(SAFE_PICK_CHANCE) {
            return pick(&mut rng, &safe);
        }

        let heal = revealed_pills_of(pool, PillType::Heal);
        if !heal.is_empty() && bot.resistance < bot.resistance_cap {
            return pick(&mut rng, &heal);
        }

        if !unrevealed.is_empty() && rng.chance(UNREVEALED_PICK_CHANCE) {
            return pick(&mut rng, &unrevealed);
        }

        let action = pick(&mut rng, &available_pills(pool));
        trace!(bot = %bot.id, ?action, "fallback pick");
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::inventory::purchase_item;
    use crate::game::pill::PillState;
    use crate::game::pool::generate_pool;
    use crate::game::state::{InventorySlot, PlayerId};

    fn setup() -> (GameConfig, Player, Pool, Match) {
        let config = GameConfig::default();
        let bot = Player::new_bot(PlayerId::from("bot"), "Bot", BotLevel::Easy, &config);
        let pool = generate_pool(1, &config, &mut SeededRng::new(99));
        (config, bot, pool, Match::new(99))
    }

    fn give(player: &mut Player, item: ItemKind) {
        player.inventory.push(InventorySlot { item, quantity: 1 });
    }

    #[test]
    fn test_draft_priority() {
        let (config, bot, _, _) = setup();
        let policy = EasyBot;

        assert_eq!(policy.decide_draft_action(&bot, &config, 100), Some(ItemKind::Scanner));
        assert_eq!(policy.decide_draft_action(&bot, &config, 10), None);

        // Scanner stack full: Shield next
        let mut full = bot.clone();
        full.inventory.push(InventorySlot {
            item: ItemKind::Scanner,
            quantity: 3,
        });
        assert_eq!(policy.decide_draft_action(&full, &config, 100), Some(ItemKind::Shield));
    }

    #[test]
    fn test_draft_loop_terminates() {
        let (config, mut bot, _, _) = setup();
        let policy = EasyBot;
        let mut bought = Vec::new();
        while let Some(item) = policy.decide_draft_action(&bot, &config, bot.pill_coins) {
            bot = purchase_item(&bot, item, &config).unwrap();
            bought.push(item);
        }
        assert_eq!(bought[0], ItemKind::Scanner);
        assert!(bought.iter().map(|i| config.items[i].cost).sum::<u32>() <= 100);
    }

    #[test]
    fn test_danger_uses_defense() {
        let (_, mut bot, pool, state) = setup();
        bot.resistance = 1;
        give(&mut bot, ItemKind::PocketPill);
        give(&mut bot, ItemKind::Shield);

        let action = EasyBot.decide_turn_action(&bot, &[], &pool, &state, 1);
        assert_eq!(
            action,
            Some(BotAction::UseItem {
                item: ItemKind::PocketPill,
                target: ItemTarget::None
            })
        );

        bot.inventory.retain(|s| s.item != ItemKind::PocketPill);
        let action = EasyBot.decide_turn_action(&bot, &[], &pool, &state, 1);
        assert!(matches!(action, Some(BotAction::UseItem { item: ItemKind::Shield, .. })));

        bot.add_status(StatusKind::Shielded, 1);
        let action = EasyBot.decide_turn_action(&bot, &[], &pool, &state, 1);
        assert!(matches!(action, Some(BotAction::ConsumePill(_))));
    }

    #[test]
    fn test_scanner_targets_unrevealed() {
        let (_, mut bot, pool, state) = setup();
        give(&mut bot, ItemKind::Scanner);
        match EasyBot.decide_turn_action(&bot, &[], &pool, &state, 3) {
            Some(BotAction::UseItem {
                item: ItemKind::Scanner,
                target: ItemTarget::Pill(id),
            }) => assert!(!pool.pill(&id).unwrap().is_revealed),
            other => panic!("expected scanner use, got {:?}", other),
        }
    }

    #[test]
    fn test_prefers_revealed_safe() {
        let (_, bot, mut pool, state) = setup();
        for pill in &mut pool.pills {
            pill.pill_type = PillType::DmgHigh;
        }
        pool.pills[2].pill_type = PillType::Safe;
        let safe = pool.pills[2].id.clone();
        pool.reveal(&safe);

        let safe_picks = (0..200)
            .filter(|seed| EasyBot.decide_turn_action(&bot, &[], &pool, &state, *seed) == Some(BotAction::ConsumePill(safe.clone())))
            .count();
        // 80% direct plus a share of the random fallback
        assert!(safe_picks > 140, "safe picked {} of 200", safe_picks);
    }

    #[test]
    fn test_heal_only_below_cap() {
        let (_, mut bot, mut pool, state) = setup();
        for pill in &mut pool.pills {
            pill.pill_type = PillType::DmgLow;
        }
        pool.pills[0].pill_type = PillType::Heal;
        let heal = pool.pills[0].id.clone();
        pool.reveal(&heal);

        bot.resistance = 4;
        for seed in 0..20 {
            assert_eq!(
                EasyBot.decide_turn_action(&bot, &[], &pool, &state, seed),
                Some(BotAction::ConsumePill(heal.clone()))
            );
        }
    }

    #[test]
    fn test_deterministic_and_never_consumed() {
        let (_, bot, mut pool, state) = setup();
        pool.pills[0].state = PillState::Consumed;
        pool.recount();

        for seed in 0..50 {
            let a = EasyBot.decide_turn_action(&bot, &[], &pool, &state, seed);
            let b = EasyBot.decide_turn_action(&bot, &[], &pool, &state, seed);
            assert_eq!(a, b);
            if let Some(BotAction::ConsumePill(id)) = a {
                assert!(pool.pill(&id).unwrap().is_available());
            }
        }
    }

    #[test]
    fn test_empty_pool_gives_nothing() {
        let (_, bot, mut pool, state) = setup();
        for pill in &mut pool.pills {
            pill.state = PillState::Consumed;
        }
        assert_eq!(EasyBot.decide_turn_action(&bot, &[], &pool, &state, 0), None);
    }
}
