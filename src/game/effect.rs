//! Effect Resolution
//!
//! Turns a consumed pill into a concrete effect on a player. Resolution is
//! split in two pure steps: `resolve_pill_effect` decides what happens,
//! `apply_effect_to_player` writes it to a copy of the player. Collapse
//! handling is left to the collapse module.

use serde::{Deserialize, Serialize};

use crate::config::{EffectValues, HealthConfig};
use crate::game::pill::{Pill, PillModifier, PillType};
use crate::game::state::{Player, StatusKind};

/// What an effect does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum EffectKind {
    /// Nothing happens
    None = 0,
    /// Resistance loss (value < 0)
    Damage = 1,
    /// Resistance gain (value > 0)
    Heal = 2,
    /// Lives gained
    Life = 3,
    /// Damage stopped by a shield
    Blocked = 4,
}

/// A resolved effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    /// Effect kind
    pub kind: EffectKind,
    /// Signed magnitude actually applied (0 when blocked)
    pub value: i32,
    /// Magnitude before a shield intervened
    pub original_value: i32,
}

impl Effect {
    /// Effect with no shield involvement.
    pub fn new(kind: EffectKind, value: i32) -> Self {
        Self { kind, value, original_value: value }
    }

    /// Resistance heal of `amount`, as granted by items.
    pub fn heal(amount: i32) -> Self {
        Self::new(EffectKind::Heal, amount)
    }

    /// Is this a resistance loss?
    #[inline]
    pub fn is_damage(&self) -> bool {
        self.kind == EffectKind::Damage
    }
}

/// Signed value of a pill after modifiers, without shield checks.
///
/// INVERTED negates and DOUBLED multiplies by two, invert first. Only
/// DMG_LOW, DMG_HIGH and HEAL react to modifiers.
pub fn modified_value(pill: &Pill, values: &EffectValues) -> i32 {
    let mut value = values.base_value(pill.pill_type);
    if !pill.pill_type.accepts_modifiers() {
        return value;
    }
    if pill.has_modifier(PillModifier::Inverted) {
        value = -value;
    }
    if pill.has_modifier(PillModifier::Doubled) {
        value = value.saturating_mul(2);
    }
    value
}

/// Decide the effect of `pill` on `player`.
pub fn resolve_pill_effect(pill: &Pill, player: &Player, values: &EffectValues) -> Effect {
    let value = modified_value(pill, values);

    let effect = match pill.pill_type {
        PillType::Life => Effect::new(EffectKind::Life, value),
        _ if value < 0 => Effect::new(EffectKind::Damage, value),
        _ if value > 0 => Effect::new(EffectKind::Heal, value),
        _ => Effect::new(EffectKind::None, 0),
    };

    if effect.is_damage() && player.has_status(StatusKind::Shielded) {
        return Effect {
            kind: EffectKind::Blocked,
            value: 0,
            original_value: effect.value,
        };
    }

    effect
}

/// Heal through the cap: resistance rises to `cap`, surplus is banked into
/// extra up to `extra_cap`, anything beyond is lost. Non-positive deltas are
/// applied to resistance unchanged.
///
/// Returns `(resistance, extra)`.
pub fn apply_resistance_cap(resistance: i32, cap: i32, extra: i32, extra_cap: i32, delta: i32) -> (i32, i32) {
    if delta <= 0 {
        return (resistance.saturating_add(delta), extra);
    }

    let room = (cap - resistance).max(0);
    let to_resistance = delta.min(room);
    let overflow = delta - to_resistance;
    let banked = (extra + overflow).min(extra_cap).max(extra);

    (resistance + to_resistance, banked)
}

/// Apply an effect to a copy of `player`.
///
/// Damage lands on resistance only and has no lower bound; banked extra
/// resistance is left alone. The caller runs the collapse check afterwards.
pub fn apply_effect_to_player(player: &Player, effect: &Effect, health: &HealthConfig) -> Player {
    let mut next = player.clone();

    match effect.kind {
        EffectKind::None => {}
        EffectKind::Blocked => {
            next.remove_status(StatusKind::Shielded);
        }
        EffectKind::Damage => {
            if next.remove_status(StatusKind::Shielded) {
                return next;
            }
            let (resistance, extra) = apply_resistance_cap(
                next.resistance,
                next.resistance_cap,
                next.extra_resistance,
                next.resistance_cap,
                effect.value.min(0),
            );
            next.resistance = resistance;
            next.extra_resistance = extra;
        }
        EffectKind::Heal => {
            let (resistance, extra) = apply_resistance_cap(
                next.resistance,
                next.resistance_cap,
                next.extra_resistance,
                next.resistance_cap,
                effect.value,
            );
            next.resistance = resistance;
            next.extra_resistance = extra;
        }
        EffectKind::Life => {
            let gained = effect.value.clamp(0, i32::from(u8::MAX)) as u8;
            next.lives = next.lives.saturating_add(gained).min(health.max_lives);
            if next.lives > 0 {
                next.is_last_chance = false;
            }
        }
    }

    next
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::pill::ShapeId;
    use crate::game::state::PlayerId;

    fn player() -> Player {
        Player::new(PlayerId::from("p"), "P", &GameConfig::default())
    }

    fn pill(pill_type: PillType, modifiers: &[PillModifier]) -> Pill {
        let mut pill = Pill::new(1, 0, pill_type, ShapeId::from("capsule"));
        for m in modifiers {
            pill.add_modifier(*m);
        }
        pill
    }

    #[test]
    fn test_base_values() {
        let values = EffectValues::default();
        let p = player();
        assert_eq!(resolve_pill_effect(&pill(PillType::Safe, &[]), &p, &values).kind, EffectKind::None);
        assert_eq!(resolve_pill_effect(&pill(PillType::DmgLow, &[]), &p, &values).value, -2);
        assert_eq!(resolve_pill_effect(&pill(PillType::DmgHigh, &[]), &p, &values).value, -4);
        assert_eq!(resolve_pill_effect(&pill(PillType::Heal, &[]), &p, &values).value, 2);
        assert_eq!(resolve_pill_effect(&pill(PillType::Fatal, &[]), &p, &values).value, -999);

        let life = resolve_pill_effect(&pill(PillType::Life, &[]), &p, &values);
        assert_eq!(life.kind, EffectKind::Life);
        assert_eq!(life.value, 1);
    }

    #[test]
    fn test_inverted_doubled_heal_is_four_damage() {
        let values = EffectValues::default();
        let effect = resolve_pill_effect(
            &pill(PillType::Heal, &[PillModifier::Inverted, PillModifier::Doubled]),
            &player(),
            &values,
        );
        assert_eq!(effect.kind, EffectKind::Damage);
        assert_eq!(effect.value, -4);
    }

    #[test]
    fn test_inverted_damage_heals() {
        let values = EffectValues::default();
        let effect = resolve_pill_effect(&pill(PillType::DmgLow, &[PillModifier::Inverted]), &player(), &values);
        assert_eq!(effect.kind, EffectKind::Heal);
        assert_eq!(effect.value, 2);
    }

    #[test]
    fn test_modifiers_ignored_on_fatal_and_life() {
        let values = EffectValues::default();
        let p = player();
        let fatal = resolve_pill_effect(&pill(PillType::Fatal, &[PillModifier::Inverted]), &p, &values);
        assert_eq!(fatal.value, -999);

        let life = resolve_pill_effect(&pill(PillType::Life, &[PillModifier::Doubled]), &p, &values);
        assert_eq!(life.value, 1);

        let safe = resolve_pill_effect(&pill(PillType::Safe, &[PillModifier::Doubled]), &p, &values);
        assert_eq!(safe.kind, EffectKind::None);
    }

    #[test]
    fn test_shield_blocks_damage_and_is_consumed() {
        let health = HealthConfig::default();
        let values = EffectValues::default();
        let mut p = player();
        p.add_status(StatusKind::Shielded, 1);

        let effect = resolve_pill_effect(&pill(PillType::DmgHigh, &[]), &p, &values);
        assert_eq!(effect.kind, EffectKind::Blocked);
        assert_eq!(effect.value, 0);
        assert_eq!(effect.original_value, -4);

        let after = apply_effect_to_player(&p, &effect, &health);
        assert_eq!(after.resistance, 6);
        assert!(!after.has_status(StatusKind::Shielded));
    }

    #[test]
    fn test_shield_does_not_block_heal() {
        let values = EffectValues::default();
        let mut p = player();
        p.add_status(StatusKind::Shielded, 1);
        let effect = resolve_pill_effect(&pill(PillType::Heal, &[]), &p, &values);
        assert_eq!(effect.kind, EffectKind::Heal);
    }

    #[test]
    fn test_damage_has_no_floor() {
        let health = HealthConfig::default();
        let mut p = player();
        p.resistance = 2;
        let after = apply_effect_to_player(&p, &Effect::new(EffectKind::Damage, -4), &health);
        assert_eq!(after.resistance, -2);
    }

    #[test]
    fn test_damage_ignores_banked_extra() {
        let health = HealthConfig::default();
        let mut p = player();
        p.resistance = 2;
        p.extra_resistance = 3;
        let after = apply_effect_to_player(&p, &Effect::new(EffectKind::Damage, -4), &health);
        assert_eq!(after.resistance, -2);
        assert_eq!(after.extra_resistance, 3);

        let collapse = crate::game::collapse::process_collapse_or_elimination(&after, &health);
        assert!(collapse.is_some());
    }

    #[test]
    fn test_heal_overflow_banked_and_capped() {
        assert_eq!(apply_resistance_cap(5, 6, 0, 6, 2), (6, 1));
        assert_eq!(apply_resistance_cap(6, 6, 5, 6, 4), (6, 6));
        assert_eq!(apply_resistance_cap(2, 6, 0, 6, 2), (4, 0));
        assert_eq!(apply_resistance_cap(2, 6, 1, 6, -3), (-1, 1));
    }

    #[test]
    fn test_life_restores_from_last_chance() {
        let health = HealthConfig::default();
        let mut p = player();
        p.lives = 0;
        p.is_last_chance = true;

        let after = apply_effect_to_player(&p, &Effect::new(EffectKind::Life, 1), &health);
        assert_eq!(after.lives, 1);
        assert!(!after.is_last_chance);
    }

    #[test]
    fn test_life_capped_at_max() {
        let health = HealthConfig::default();
        let after = apply_effect_to_player(&player(), &Effect::new(EffectKind::Life, 1), &health);
        assert_eq!(after.lives, 3);
    }
}
