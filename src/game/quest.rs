//! Shape Quests
//!
//! Side objective handed to every surviving player at the start of a round:
//! consume pills whose shapes follow a short sequence. Completing it pays pill
//! coins scaled by how late in the match the round is. A wrong shape fails
//! the quest, and unfinished quests are discarded when the round ends.

use serde::{Deserialize, Serialize};

use crate::config::EconomyConfig;
use crate::core::hash::StateHasher;
use crate::core::rng::SeededRng;
use crate::game::pill::ShapeId;
use crate::game::pool::Pool;
use crate::game::state::PlayerId;

/// Quest lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum QuestStatus {
    /// In progress
    #[default]
    Active = 0,
    /// Sequence finished, reward paid
    Completed = 1,
    /// Wrong shape consumed
    Failed = 2,
    /// Round ended before completion
    Discarded = 3,
}

/// A player's quest for one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeQuest {
    /// Owner
    pub player_id: PlayerId,
    /// Shapes to consume, in order
    pub sequence: Vec<ShapeId>,
    /// Steps completed
    pub progress: usize,
    /// Lifecycle state
    pub status: QuestStatus,
    /// Coins paid on completion
    pub reward: u32,
}

/// What a consumption did to a quest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuestProgress {
    /// Quest was not active
    Unchanged,
    /// Matched the next step
    Advanced,
    /// Finished the sequence, reward is owed
    Completed(u32),
    /// Wrong shape
    Failed,
}

impl ShapeQuest {
    /// Shape the quest expects next.
    pub fn next_shape(&self) -> Option<&ShapeId> {
        match self.status {
            QuestStatus::Active => self.sequence.get(self.progress),
            _ => None,
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(self.player_id.as_str());
        hasher.update_usize(self.sequence.len());
        for shape in &self.sequence {
            hasher.update_str(shape.as_str());
        }
        hasher.update_usize(self.progress);
        hasher.update_u8(self.status as u8);
        hasher.update_u32(self.reward);
    }
}

/// Stage multiplier for a round.
pub fn quest_multiplier(round: u32, economy: &EconomyConfig) -> f64 {
    let m = &economy.quest_multipliers;
    if round >= m.late_from_round {
        m.late
    } else if round >= m.mid_from_round {
        m.mid
    } else {
        m.early
    }
}

/// Coins paid for completing a quest in `round` (rounded down).
pub fn quest_reward(round: u32, economy: &EconomyConfig) -> u32 {
    (f64::from(economy.shape_quest_base_reward) * quest_multiplier(round, economy)).floor() as u32
}

/// One quest per player. Sequences are drawn without replacement from the
/// shapes of the pool's pills, so each quest is achievable from a fresh pool.
pub fn generate_shape_quests(
    players: &[PlayerId],
    pool: &Pool,
    economy: &EconomyConfig,
    rng: &mut SeededRng,
) -> Vec<ShapeQuest> {
    let shapes: Vec<ShapeId> = pool.pills.iter().map(|p| p.shape.clone()).collect();
    if shapes.is_empty() {
        return Vec::new();
    }

    let reward = quest_reward(pool.round_number, economy);
    let max_len = economy.quest_length_max.min(shapes.len()).max(1);
    let min_len = economy.quest_length_min.clamp(1, max_len);

    players
        .iter()
        .map(|player_id| {
            let len = rng.random_int(min_len as i32, max_len as i32) as usize;
            let mut bag = shapes.clone();
            rng.shuffle(&mut bag);
            bag.truncate(len);

            ShapeQuest {
                player_id: player_id.clone(),
                sequence: bag,
                progress: 0,
                status: QuestStatus::Active,
                reward,
            }
        })
        .collect()
}

/// Advance a quest with the shape of a consumed pill.
pub fn record_consumption(quest: &mut ShapeQuest, shape: &ShapeId) -> QuestProgress {
    let Some(expected) = quest.next_shape() else {
        return QuestProgress::Unchanged;
    };

    if expected != shape {
        quest.status = QuestStatus::Failed;
        return QuestProgress::Failed;
    }

    quest.progress += 1;
    if quest.progress == quest.sequence.len() {
        quest.status = QuestStatus::Completed;
        QuestProgress::Completed(quest.reward)
    } else {
        QuestProgress::Advanced
    }
}

/// Mark every still-active quest as discarded.
pub fn discard_open_quests(quests: &mut [ShapeQuest]) {
    for quest in quests.iter_mut().filter(|q| q.status == QuestStatus::Active) {
        quest.status = QuestStatus::Discarded;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::pool::generate_pool;

    fn quest(shapes: &[&str]) -> ShapeQuest {
        ShapeQuest {
            player_id: PlayerId::from("p"),
            sequence: shapes.iter().map(|s| ShapeId::from(*s)).collect(),
            progress: 0,
            status: QuestStatus::Active,
            reward: 15,
        }
    }

    #[test]
    fn test_reward_scaling() {
        let economy = EconomyConfig::default();
        assert_eq!(quest_reward(1, &economy), 10);
        assert_eq!(quest_reward(3, &economy), 10);
        assert_eq!(quest_reward(4, &economy), 15);
        assert_eq!(quest_reward(7, &economy), 15);
        assert_eq!(quest_reward(8, &economy), 20);
    }

    #[test]
    fn test_completion_pays_reward() {
        let mut q = quest(&["gem", "star"]);
        assert_eq!(record_consumption(&mut q, &ShapeId::from("gem")), QuestProgress::Advanced);
        assert_eq!(record_consumption(&mut q, &ShapeId::from("star")), QuestProgress::Completed(15));
        assert_eq!(q.status, QuestStatus::Completed);
        assert_eq!(record_consumption(&mut q, &ShapeId::from("gem")), QuestProgress::Unchanged);
    }

    #[test]
    fn test_wrong_shape_fails() {
        let mut q = quest(&["gem", "star"]);
        assert_eq!(record_consumption(&mut q, &ShapeId::from("coin")), QuestProgress::Failed);
        assert_eq!(q.status, QuestStatus::Failed);
        assert!(q.next_shape().is_none());
    }

    #[test]
    fn test_discard_only_touches_active() {
        let mut quests = vec![quest(&["gem"]), quest(&["star"])];
        record_consumption(&mut quests[0], &ShapeId::from("gem"));
        discard_open_quests(&mut quests);
        assert_eq!(quests[0].status, QuestStatus::Completed);
        assert_eq!(quests[1].status, QuestStatus::Discarded);
    }

    #[test]
    fn test_generated_quests_come_from_pool() {
        let config = GameConfig::default();
        let pool = generate_pool(1, &config, &mut SeededRng::new(3));
        let players = vec![PlayerId::from("a"), PlayerId::from("b")];
        let quests = generate_shape_quests(&players, &pool, &config.economy, &mut SeededRng::new(4));

        assert_eq!(quests.len(), 2);
        for q in &quests {
            assert!((2..=3).contains(&q.sequence.len()));
            for shape in &q.sequence {
                assert!(pool.pills.iter().any(|p| &p.shape == shape));
            }
            assert_eq!(q.reward, 10);
        }
    }
}
