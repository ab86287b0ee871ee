//! Event bus for reporting simulation outcomes to the outside.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use tilequest_common::{EntityId, Vec2};
use tracing::warn;

use crate::enemy::EnemyKind;
use crate::progression::{AbilityChoice, Unlock};
use crate::quest::NpcKind;

/// Default bus capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// What happened during a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// An enemy took damage
    EnemyDamaged {
        /// Enemy
        enemy: EntityId,
        /// Damage after blocking
        damage: i32,
        /// Halved by a block
        blocked: bool,
    },
    /// An enemy's health reached zero
    EnemyKilled {
        /// Enemy
        enemy: EntityId,
        /// Kind
        kind: EnemyKind,
    },
    /// An enemy finished dying and left the world
    EnemyRemoved {
        /// Enemy
        enemy: EntityId,
    },
    /// The character took damage
    PlayerDamaged {
        /// Damage after reductions
        damage: i32,
        /// Health left
        health: i32,
    },
    /// The character died
    PlayerDied,
    /// The character levelled up
    LevelUp {
        /// New level
        level: u32,
    },
    /// An ability choice is waiting
    AbilityChoiceOpened {
        /// Level that opened it
        level: u32,
    },
    /// An ability choice was made
    AbilitySelected {
        /// Option picked
        choice: AbilityChoice,
        /// What it unlocked
        unlock: Unlock,
    },
    /// An objective was shown
    ObjectiveAdded {
        /// Text
        text: String,
    },
    /// An objective was hidden
    ObjectiveRemoved {
        /// Text
        text: String,
    },
    /// The boss quest began
    BossQuestStarted,
    /// The quest boss died
    BossDefeated,
    /// The boss quest paid out
    QuestCompleted {
        /// XP reward
        xp: u32,
    },
    /// A dialog opened
    DialogOpened {
        /// Who is talking
        npc: NpcKind,
    },
    /// Arrows left the bow
    ArrowFired {
        /// Origin
        origin: Vec2,
        /// Arrow count
        count: usize,
    },
}

/// Bounded, non-blocking event queue.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Queues an event; drops it with a warning when the bus is full.
    pub fn publish(&self, event: GameEvent) {
        if let Err(TrySendError::Full(event)) = self.sender.try_send(event) {
            warn!("Event bus full, dropping {:?}", event);
        }
    }

    /// Takes every queued event.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Queued event count.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Extra publishing handle.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish(GameEvent::PlayerDied);
        bus.publish(GameEvent::LevelUp { level: 2 });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events, vec![GameEvent::PlayerDied, GameEvent::LevelUp { level: 2 }]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = EventBus::new(2);
        for level in 0..5 {
            bus.publish(GameEvent::LevelUp { level });
        }
        assert_eq!(bus.capacity(), 2);
        assert_eq!(bus.drain().len(), 2);
    }

    #[test]
    fn test_sender_handle() {
        let bus = EventBus::default();
        let sender = bus.sender();
        sender
            .try_send(GameEvent::BossDefeated)
            .expect("room on the bus");
        assert_eq!(bus.drain(), vec![GameEvent::BossDefeated]);
    }
}
