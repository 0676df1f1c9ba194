mod actions;
mod events;
mod goap;
mod movement;
mod nav;
mod planner;
mod scene_impl;
mod scene_state;
mod snapshot;
mod systems;
mod types;

#[cfg(test)]
mod test_support;

pub(crate) use scene_state::{
    GameplayScene, GameplaySettings, ScriptedCast, SkillTuning, WorldLayout,
};

use nav::GridBounds;

/// World units per grid cell.
pub(crate) const TILE_SIZE: f32 = 16.0;
pub(crate) const WORLD_BOUNDS: GridBounds = GridBounds {
    min_x: 0,
    min_y: 0,
    max_x: 22,
    max_y: 40,
};

pub(crate) const MAX_WHEAT_COLUMNS: u32 = 8;
pub(crate) const MAX_WHEAT_ROWS: u32 = 7;
pub(crate) const MAX_HOUSES: u32 = 8;

const BOREDOM_PER_SECOND: f32 = 1.0;
const SOCIAL_ACCEPT_MIN_BOREDOM: f32 = 30.0;
const KILL_BOREDOM_MIN_BOREDOM: f32 = 80.0;
const NEAR_DISTANCE: f32 = 5.0;
const NEAR_SMART_OBJECT_DISTANCE: f32 = 4.0;
const NAV_ARRIVAL_EPSILON: f32 = 0.5;

const REST_STAMINA_PER_SECOND: f32 = 1.0;
const FARM_WORK_SECONDS: f32 = 2.0;
const FARM_STAMINA_COST: f32 = 1.0;
const WANDER_SECONDS: f32 = 4.0;
const WANDER_BOREDOM_RELIEF: f32 = 50.0;
const PRAY_SECONDS: f32 = 5.0;
const MEDITATE_SECONDS: f32 = 5.0;
const PRAY_CORRUPTION_CHANCE: f64 = 0.3;
const MEDITATE_CORRUPTION_CHANCE: f64 = 0.8;
const CORRUPTION_GAIN: f32 = 5.0;
const CHAT_SECONDS: f32 = 4.0;
const SOCIAL_HANDSHAKE_TIMEOUT_SECONDS: f32 = 5.0;
const SOCIAL_REQUEST_RADIUS: f32 = 160.0;
const SMART_OBJECT_DISTANCE_WEIGHT: f32 = 0.1;

const GOAL_PRAY_CHANCE: f64 = 0.3;
const GOAL_MEDITATE_CHANCE: f64 = 0.2;
const PRAY_AT_SHRINE_CHANCE: f64 = 0.7;
const KILL_BOREDOM_SMART_OBJECT_CHANCE: f64 = 0.5;

pub(crate) const GAMEPLAY_SYSTEM_ORDER_TEXT: &str =
    "Intents>StatusEffects>Zones>Goap>Movement>Cleanup";
