use engine::{EntityId, Vec2};
use serde::Serialize;

use super::events::{GameplayEventCounts, GameplayIntentApplyStats};
use super::goap::Goal;
use super::systems::GameplaySystemId;
use super::types::{AnimationTag, DebuffKind, Facing, InteractionType, StatBlock, ZoneKind};

/// Read-only view of the simulation handed to whatever draws it. The
/// headless binary prints it as JSON at shutdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WorldSnapshot {
    pub(crate) tick: u64,
    pub(crate) agents: Vec<AgentSnapshot>,
    pub(crate) wheat_fields: Vec<WheatFieldSnapshot>,
    pub(crate) smart_objects: Vec<SmartObjectSnapshot>,
    pub(crate) houses: Vec<HouseSnapshot>,
    pub(crate) zones: Vec<ZoneSnapshot>,
    pub(crate) last_tick_systems: Vec<GameplaySystemId>,
    pub(crate) last_tick_events: GameplayEventCounts,
    pub(crate) last_tick_intents: GameplayIntentApplyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AgentSnapshot {
    pub(crate) id: EntityId,
    pub(crate) position: Vec2,
    pub(crate) facing: Facing,
    pub(crate) animation: AnimationTag,
    pub(crate) sprite: String,
    pub(crate) stats: StatBlock,
    pub(crate) debuffs: Vec<DebuffSnapshot>,
    pub(crate) goal: Option<Goal>,
    pub(crate) current_action: &'static str,
    pub(crate) plan: Vec<&'static str>,
    pub(crate) farm_target: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct DebuffSnapshot {
    pub(crate) kind: DebuffKind,
    pub(crate) icon: &'static str,
    pub(crate) remaining_seconds: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct WheatFieldSnapshot {
    pub(crate) id: EntityId,
    pub(crate) position: Vec2,
    pub(crate) growth_stage: u8,
    pub(crate) claimed_by: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SmartObjectSnapshot {
    pub(crate) id: EntityId,
    pub(crate) position: Vec2,
    pub(crate) interaction: InteractionType,
    pub(crate) capacity: usize,
    pub(crate) in_use: usize,
    pub(crate) occupants: Vec<Option<EntityId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct HouseSnapshot {
    pub(crate) id: EntityId,
    pub(crate) position: Vec2,
    pub(crate) owner: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ZoneSnapshot {
    pub(crate) id: EntityId,
    pub(crate) kind: ZoneKind,
    pub(crate) center: Vec2,
    pub(crate) radius: f32,
    pub(crate) remaining_seconds: f32,
}
