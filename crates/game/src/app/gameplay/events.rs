use engine::{EntityId, Vec2};
use serde::Serialize;

use super::actions::ActionKind;
use super::goap::Goal;
use super::types::DebuffKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GameplayEvent {
    GoalChanged {
        actor_id: EntityId,
        goal: Option<Goal>,
    },
    PlanBuilt {
        actor_id: EntityId,
        goal: Goal,
        steps: usize,
    },
    PlanAborted {
        actor_id: EntityId,
    },
    ActionCompleted {
        actor_id: EntityId,
        action: ActionKind,
    },
    ClaimAcquired {
        actor_id: EntityId,
        target_id: EntityId,
    },
    ClaimReleased {
        actor_id: EntityId,
        target_id: EntityId,
    },
    SocialAccepted {
        actor_id: EntityId,
        requester_id: EntityId,
    },
    DebuffApplied {
        entity_id: EntityId,
        kind: DebuffKind,
    },
    DebuffExpired {
        entity_id: EntityId,
        kind: DebuffKind,
    },
    ZoneSpawned {
        zone_id: EntityId,
        center: Vec2,
    },
    ZoneExpired {
        zone_id: EntityId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GameplayEventKind {
    GoalChanged,
    PlanBuilt,
    PlanAborted,
    ActionCompleted,
    ClaimAcquired,
    ClaimReleased,
    SocialAccepted,
    DebuffApplied,
    DebuffExpired,
    ZoneSpawned,
    ZoneExpired,
}

impl GameplayEvent {
    pub(crate) fn kind(self) -> GameplayEventKind {
        match self {
            Self::GoalChanged { .. } => GameplayEventKind::GoalChanged,
            Self::PlanBuilt { .. } => GameplayEventKind::PlanBuilt,
            Self::PlanAborted { .. } => GameplayEventKind::PlanAborted,
            Self::ActionCompleted { .. } => GameplayEventKind::ActionCompleted,
            Self::ClaimAcquired { .. } => GameplayEventKind::ClaimAcquired,
            Self::ClaimReleased { .. } => GameplayEventKind::ClaimReleased,
            Self::SocialAccepted { .. } => GameplayEventKind::SocialAccepted,
            Self::DebuffApplied { .. } => GameplayEventKind::DebuffApplied,
            Self::DebuffExpired { .. } => GameplayEventKind::DebuffExpired,
            Self::ZoneSpawned { .. } => GameplayEventKind::ZoneSpawned,
            Self::ZoneExpired { .. } => GameplayEventKind::ZoneExpired,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct GameplayEventCounts {
    pub(crate) total: u32,
    pub(crate) goal_changed: u32,
    pub(crate) plan_built: u32,
    pub(crate) plan_aborted: u32,
    pub(crate) action_completed: u32,
    pub(crate) claim_acquired: u32,
    pub(crate) claim_released: u32,
    pub(crate) social_accepted: u32,
    pub(crate) debuff_applied: u32,
    pub(crate) debuff_expired: u32,
    pub(crate) zone_spawned: u32,
    pub(crate) zone_expired: u32,
}

impl GameplayEventCounts {
    fn record(&mut self, kind: GameplayEventKind) {
        self.total = self.total.saturating_add(1);
        let slot = match kind {
            GameplayEventKind::GoalChanged => &mut self.goal_changed,
            GameplayEventKind::PlanBuilt => &mut self.plan_built,
            GameplayEventKind::PlanAborted => &mut self.plan_aborted,
            GameplayEventKind::ActionCompleted => &mut self.action_completed,
            GameplayEventKind::ClaimAcquired => &mut self.claim_acquired,
            GameplayEventKind::ClaimReleased => &mut self.claim_released,
            GameplayEventKind::SocialAccepted => &mut self.social_accepted,
            GameplayEventKind::DebuffApplied => &mut self.debuff_applied,
            GameplayEventKind::DebuffExpired => &mut self.debuff_expired,
            GameplayEventKind::ZoneSpawned => &mut self.zone_spawned,
            GameplayEventKind::ZoneExpired => &mut self.zone_expired,
        };
        *slot = slot.saturating_add(1);
    }
}

#[derive(Debug, Default)]
pub(crate) struct GameplayEventBus {
    current_tick_events: Vec<GameplayEvent>,
    last_tick_counts: GameplayEventCounts,
}

impl GameplayEventBus {
    pub(crate) fn clear(&mut self) {
        self.current_tick_events.clear();
        self.last_tick_counts = GameplayEventCounts::default();
    }

    pub(crate) fn emit(&mut self, event: GameplayEvent) {
        self.current_tick_events.push(event);
    }

    #[cfg(test)]
    pub(crate) fn iter_emitted_so_far(&self) -> impl Iterator<Item = &GameplayEvent> {
        self.current_tick_events.iter()
    }

    pub(crate) fn finish_tick_rollover(&mut self) {
        let mut counts = GameplayEventCounts::default();
        for event in &self.current_tick_events {
            counts.record(event.kind());
        }
        self.last_tick_counts = counts;
        self.current_tick_events.clear();
    }

    pub(crate) fn last_tick_counts(&self) -> GameplayEventCounts {
        self.last_tick_counts
    }
}

/// Mutations requested from outside the tick (skill casts). Queued and
/// applied by the intents system at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GameplayIntent {
    CastWhisper { center: Vec2 },
    ApplyDebuff { entity_id: EntityId, kind: DebuffKind },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct GameplayIntentApplyStats {
    pub(crate) total: u32,
    pub(crate) cast_whisper: u32,
    pub(crate) apply_debuff: u32,
    pub(crate) invalid_target_count: u32,
}

impl GameplayIntentApplyStats {
    pub(crate) fn record_intent(&mut self, intent: &GameplayIntent) {
        self.total = self.total.saturating_add(1);
        match intent {
            GameplayIntent::CastWhisper { .. } => {
                self.cast_whisper = self.cast_whisper.saturating_add(1)
            }
            GameplayIntent::ApplyDebuff { .. } => {
                self.apply_debuff = self.apply_debuff.saturating_add(1)
            }
        }
    }

    pub(crate) fn record_invalid_target(&mut self) {
        self.invalid_target_count = self.invalid_target_count.saturating_add(1);
    }
}

#[derive(Debug, Default)]
pub(crate) struct GameplayIntentQueue {
    intents: Vec<GameplayIntent>,
    last_tick_apply_stats: GameplayIntentApplyStats,
}

impl GameplayIntentQueue {
    pub(crate) fn clear(&mut self) {
        self.intents.clear();
        self.last_tick_apply_stats = GameplayIntentApplyStats::default();
    }

    pub(crate) fn enqueue(&mut self, intent: GameplayIntent) {
        self.intents.push(intent);
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.intents.len()
    }

    pub(crate) fn drain_current_tick(&mut self) -> Vec<GameplayIntent> {
        std::mem::take(&mut self.intents)
    }

    pub(crate) fn set_last_tick_apply_stats(&mut self, stats: GameplayIntentApplyStats) {
        self.last_tick_apply_stats = stats;
    }

    pub(crate) fn last_tick_apply_stats(&self) -> GameplayIntentApplyStats {
        self.last_tick_apply_stats
    }
}

#[cfg(test)]
mod event_tests {
    use super::*;

    #[test]
    fn rollover_counts_events_and_clears_current_tick() {
        let mut bus = GameplayEventBus::default();
        let actor_id = EntityId(3);
        bus.emit(GameplayEvent::PlanBuilt {
            actor_id,
            goal: Goal::Farm,
            steps: 3,
        });
        bus.emit(GameplayEvent::ClaimAcquired {
            actor_id,
            target_id: EntityId(9),
        });
        bus.emit(GameplayEvent::ClaimAcquired {
            actor_id: EntityId(4),
            target_id: EntityId(10),
        });
        assert_eq!(bus.iter_emitted_so_far().count(), 3);

        bus.finish_tick_rollover();
        let counts = bus.last_tick_counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.plan_built, 1);
        assert_eq!(counts.claim_acquired, 2);
        assert_eq!(bus.iter_emitted_so_far().count(), 0);
    }

    #[test]
    fn intent_queue_drains_in_enqueue_order() {
        let mut queue = GameplayIntentQueue::default();
        let first = GameplayIntent::CastWhisper {
            center: Vec2::new(1.0, 2.0),
        };
        let second = GameplayIntent::ApplyDebuff {
            entity_id: EntityId(1),
            kind: DebuffKind::Dread,
        };
        queue.enqueue(first);
        queue.enqueue(second);

        assert_eq!(queue.drain_current_tick(), vec![first, second]);
        assert_eq!(queue.pending_len(), 0);
    }
}
