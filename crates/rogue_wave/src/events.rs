//! # Rogue Wave Event System
//!
//! Events flow from the session to the host over a bounded channel.
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │   Session   │─────>│   Event     │─────>│    Host     │
//! │ (nanobots,  │      │   Channel   │      │ (pickups,   │
//! │  levels)    │      │  (bounded)  │      │  audio, UI) │
//! └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! Sends never block: when the channel is full the event is dropped and
//! logged.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rogue_wave_economy::{BuildOutput, RecipeId};

/// Why the session wants a different scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionReason {
    /// The player died; back to the hub.
    Death,
    /// The level was cleared; on to the next one.
    LevelComplete,
}

/// Events the host reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    // =========================================================================
    // Level Events
    // =========================================================================
    /// A level was generated and populated.
    LevelGenerated {
        /// Level name.
        name: String,
        /// Seed of the successful attempt.
        seed: u64,
        /// Attempts used.
        attempts: u32,
        /// Enemy spawners placed.
        spawners: usize,
        /// Number of waves.
        waves: u32,
    },

    /// A run started after reconciliation.
    RunStarted {
        /// Run counter.
        run_number: u32,
        /// Campaign level index.
        game_level: u32,
        /// Weapons equipped.
        loadout: Vec<RecipeId>,
    },

    /// The host should load another scene.
    SceneTransition {
        /// Scene to load.
        scene: String,
        /// What triggered it.
        reason: TransitionReason,
    },

    // =========================================================================
    // Nanobot Events
    // =========================================================================
    /// Nanobots started building.
    BuildStarted {
        /// Recipe being built.
        recipe: RecipeId,
        /// Recipe name.
        name: String,
        /// Resources spent.
        cost: u32,
        /// Cue to play.
        cue: String,
    },

    /// Nanobots finished building.
    BuildFinished {
        /// Recipe built.
        recipe: RecipeId,
        /// Recipe name.
        name: String,
        /// Cue to play.
        cue: String,
    },

    /// A build was interrupted.
    BuildAborted {
        /// Recipe that was being built.
        recipe: RecipeId,
    },

    /// The host should spawn a pickup next to the player.
    PickupSpawned {
        /// Recipe that produced it.
        recipe: RecipeId,
        /// What to spawn.
        output: BuildOutput,
    },

    // =========================================================================
    // Progression Events
    // =========================================================================
    /// Nanobots levelled up and recipes are on offer.
    NanobotLevelUp {
        /// New level.
        level: u32,
        /// Recipes the player may pick from.
        offers: Vec<RecipeId>,
    },

    /// A recipe was acquired.
    RecipeAcquired {
        /// The recipe.
        recipe: RecipeId,
        /// True when it went straight to persistent data.
        permanent: bool,
    },

    /// The profile was written to disk.
    ProfileSaved {
        /// Profile name.
        profile: String,
    },
}

/// Event bus between the session and the host.
///
/// Bounded so a host that stops draining cannot grow memory without limit.
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a new event bus holding at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` when the event was dropped.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!("Event channel full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Receives all pending events without blocking.
    #[inline]
    #[must_use]
    pub fn drain(&self) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event, if any is pending.
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_send_receive() {
        let (sender, receiver) = EventBus::create_pair(8);
        assert!(sender.send(GameEvent::ProfileSaved { profile: "p1".into() }));
        assert!(receiver.has_events());

        match receiver.try_recv() {
            Some(GameEvent::ProfileSaved { profile }) => assert_eq!(profile, "p1"),
            other => panic!("Wrong event: {other:?}"),
        }
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_channel_drops() {
        let bus = EventBus::new(2);
        let sender = bus.sender();
        let receiver = bus.receiver();

        for level in 0..3 {
            let delivered = sender.send(GameEvent::NanobotLevelUp { level, offers: Vec::new() });
            assert_eq!(delivered, level < 2);
        }
        assert_eq!(receiver.pending_count(), 2);

        let events = receiver.drain();
        assert_eq!(events.len(), 2);
        assert!(!receiver.has_events());
    }
}
