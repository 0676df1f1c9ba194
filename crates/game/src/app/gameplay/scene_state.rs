use std::collections::BTreeMap;

use engine::{EntityId, RenderableDesc, RenderableKind, SceneWorld, Transform, Vec2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::events::{
    GameplayEventBus, GameplayEventCounts, GameplayIntent, GameplayIntentApplyStats,
    GameplayIntentQueue,
};
use super::goap::{Goal, GoapComponent};
use super::nav::{GridBounds, GridPoint};
use super::snapshot::{
    AgentSnapshot, DebuffSnapshot, HouseSnapshot, SmartObjectSnapshot, WheatFieldSnapshot,
    WorldSnapshot, ZoneSnapshot,
};
use super::systems::{GameplaySystemContext, GameplaySystemsHost};
use super::types::{
    AdvertisedEffects, AnimationTag, DebuffKind, House, InteractionType, Motion, SmartObject,
    SmartObjectSlot, Stat, StatBlock, WheatField, Worker, Zone,
};
use super::{TILE_SIZE, WORLD_BOUNDS};

const WORKER_STAMINA_MAX: f32 = 10.0;
const WORKER_SPEED_RANGE: (f32, f32) = (24.0, 40.0);
const WORKER_VARIANTS: u8 = 3;

const HOUSES_PER_ROW: u32 = 4;
const HOUSE_ORIGIN: GridPoint = GridPoint::new(3, 3);
const HOUSE_SPACING: GridPoint = GridPoint::new(5, 5);
const WHEAT_ORIGIN: GridPoint = GridPoint::new(5, 26);
const WHEAT_SPACING: i32 = 2;
const CAMPFIRE_CELL: GridPoint = GridPoint::new(11, 17);
const STATUE_CELL: GridPoint = GridPoint::new(18, 14);

/// Radius, lifetime and damage roll of a whisper zone, plus the duration
/// applied by every debuff cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SkillTuning {
    pub(crate) whisper_radius: f32,
    pub(crate) whisper_duration_seconds: f32,
    pub(crate) whisper_damage_min: f32,
    pub(crate) whisper_damage_max: f32,
    pub(crate) debuff_duration_seconds: f32,
}

impl Default for SkillTuning {
    fn default() -> Self {
        Self {
            whisper_radius: 48.0,
            whisper_duration_seconds: 5.0,
            whisper_damage_min: 2.0,
            whisper_damage_max: 6.0,
            debuff_duration_seconds: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorldLayout {
    pub(crate) house_count: u32,
    pub(crate) wheat_columns: u32,
    pub(crate) wheat_rows: u32,
}

impl Default for WorldLayout {
    fn default() -> Self {
        Self {
            house_count: 4,
            wheat_columns: 4,
            wheat_rows: 3,
        }
    }
}

/// A skill cast replayed by the headless host once the simulated clock
/// reaches `at_seconds`. `worker` indexes workers in spawn order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "skill", rename_all = "snake_case")]
pub(crate) enum ScriptedCast {
    Whisper { at_seconds: f32, x: f32, y: f32 },
    Debuff { at_seconds: f32, worker: usize, kind: DebuffKind },
}

impl ScriptedCast {
    pub(crate) fn at_seconds(&self) -> f32 {
        match self {
            Self::Whisper { at_seconds, .. } | Self::Debuff { at_seconds, .. } => *at_seconds,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GameplaySettings {
    /// `None` seeds from the OS.
    pub(crate) seed: Option<u64>,
    pub(crate) layout: WorldLayout,
    pub(crate) tuning: SkillTuning,
    pub(crate) casts: Vec<ScriptedCast>,
}

pub(crate) struct GameplayScene {
    settings: GameplaySettings,
    rng: SmallRng,
    bounds: GridBounds,
    pub(super) workers: BTreeMap<EntityId, Worker>,
    pub(super) wheat_fields: BTreeMap<EntityId, WheatField>,
    pub(super) smart_objects: BTreeMap<EntityId, SmartObject>,
    pub(super) houses: BTreeMap<EntityId, House>,
    pub(super) zones: BTreeMap<EntityId, Zone>,
    worker_spawn_order: Vec<EntityId>,
    systems_host: GameplaySystemsHost,
    system_events: GameplayEventBus,
    system_intents: GameplayIntentQueue,
    tick_count: u64,
    elapsed_seconds: f32,
    next_cast_index: usize,
}

impl GameplayScene {
    pub(crate) fn new(mut settings: GameplaySettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        settings
            .casts
            .sort_by(|left, right| left.at_seconds().total_cmp(&right.at_seconds()));
        Self {
            settings,
            rng,
            bounds: WORLD_BOUNDS,
            workers: BTreeMap::new(),
            wheat_fields: BTreeMap::new(),
            smart_objects: BTreeMap::new(),
            houses: BTreeMap::new(),
            zones: BTreeMap::new(),
            worker_spawn_order: Vec::new(),
            systems_host: GameplaySystemsHost::default(),
            system_events: GameplayEventBus::default(),
            system_intents: GameplayIntentQueue::default(),
            tick_count: 0,
            elapsed_seconds: 0.0,
            next_cast_index: 0,
        }
    }

    pub(super) fn clear_runtime(&mut self) {
        self.workers.clear();
        self.wheat_fields.clear();
        self.smart_objects.clear();
        self.houses.clear();
        self.zones.clear();
        self.worker_spawn_order.clear();
        self.system_events.clear();
        self.system_intents.clear();
        self.tick_count = 0;
        self.elapsed_seconds = 0.0;
        self.next_cast_index = 0;
    }

    /// Houses in rows of four along the top, the wheat block in the south,
    /// the campfire in the middle and the statue to the east. One worker is
    /// spawned per house, standing at its door.
    pub(super) fn populate_world(&mut self, world: &mut SceneWorld) {
        let layout = self.settings.layout;

        for column in 0..layout.wheat_columns as i32 {
            for row in 0..layout.wheat_rows as i32 {
                let cell = GridPoint::new(
                    WHEAT_ORIGIN.x + column * WHEAT_SPACING,
                    WHEAT_ORIGIN.y + row * WHEAT_SPACING,
                );
                let field_id = spawn_prop(world, cell.to_world(), "farm/wheat", "wheat_field");
                let growth_stage = self.rng.random_range(1..=WheatField::MAX_GROWTH_STAGE);
                self.wheat_fields
                    .insert(field_id, WheatField::new(growth_stage));
            }
        }

        let campfire_id = spawn_prop(world, CAMPFIRE_CELL.to_world(), "props/campfire", "campfire");
        self.smart_objects.insert(campfire_id, campfire());
        let statue_id = spawn_prop(world, STATUE_CELL.to_world(), "props/statue", "statue");
        self.smart_objects.insert(statue_id, statue());

        for index in 0..layout.house_count as i32 {
            let cell = GridPoint::new(
                HOUSE_ORIGIN.x + (index % HOUSES_PER_ROW as i32) * HOUSE_SPACING.x,
                HOUSE_ORIGIN.y + (index / HOUSES_PER_ROW as i32) * HOUSE_SPACING.y,
            );
            let house_position = cell.to_world();
            let house_id = spawn_prop(world, house_position, "buildings/house", "house");
            let door = house_position.offset(Vec2::new(0.0, 2.0 * TILE_SIZE));
            let worker_id = self.spawn_worker(world, door);
            self.houses.insert(
                house_id,
                House {
                    owner: Some(worker_id),
                },
            );
        }

        info!(
            workers = self.workers.len(),
            wheat_fields = self.wheat_fields.len(),
            smart_objects = self.smart_objects.len(),
            "world_populated"
        );
    }

    fn spawn_worker(&mut self, world: &mut SceneWorld, home: Vec2) -> EntityId {
        let variant = self.rng.random_range(1..=WORKER_VARIANTS);
        let worker_id = world.spawn_actor(
            Transform { position: home },
            RenderableDesc {
                kind: RenderableKind::Sprite(format!("workers/worker_{variant}")),
                debug_name: "worker",
            },
        );
        let stats = StatBlock {
            stamina: Stat::new(
                self.rng.random_range(WORKER_STAMINA_MAX * 0.5..=WORKER_STAMINA_MAX),
                WORKER_STAMINA_MAX,
            ),
            sanity: Stat::new(self.rng.random_range(60.0..=100.0), 100.0),
            corruption: Stat::new(self.rng.random_range(0.0..=10.0), 100.0),
            boredom: Stat::new(self.rng.random_range(0.0..=30.0), 100.0),
            satiety: Stat::new(self.rng.random_range(50.0..=100.0), 100.0),
        };
        let speed = self
            .rng
            .random_range(WORKER_SPEED_RANGE.0..=WORKER_SPEED_RANGE.1);
        self.workers.insert(
            worker_id,
            Worker {
                stats,
                motion: Motion::new(speed),
                goap: GoapComponent::new(vec![Goal::Farm], home),
                debuffs: Vec::new(),
                variant,
            },
        );
        self.worker_spawn_order.push(worker_id);
        debug!(worker = worker_id.0, variant, speed, "worker_spawned");
        worker_id
    }

    /// Queues a whisper zone at `center`. Applied at the start of the next
    /// tick.
    pub(crate) fn cast_whisper(&mut self, center: Vec2) {
        self.system_intents
            .enqueue(GameplayIntent::CastWhisper { center });
    }

    /// Queues a debuff on `target`. Applied at the start of the next tick;
    /// a target that is not a live worker by then is counted as invalid.
    pub(crate) fn apply_debuff(&mut self, target: EntityId, kind: DebuffKind) {
        self.system_intents.enqueue(GameplayIntent::ApplyDebuff {
            entity_id: target,
            kind,
        });
    }

    fn enqueue_due_casts(&mut self) {
        while let Some(cast) = self.settings.casts.get(self.next_cast_index).copied() {
            if cast.at_seconds() > self.elapsed_seconds {
                break;
            }
            self.next_cast_index += 1;
            debug!(
                at_seconds = cast.at_seconds(),
                pending = self.system_intents.pending_len(),
                "scripted_cast_due"
            );
            match cast {
                ScriptedCast::Whisper { x, y, .. } => self.cast_whisper(Vec2::new(x, y)),
                ScriptedCast::Debuff { worker, kind, .. } => {
                    // Out-of-range indices still go through the queue so the
                    // intents system reports them as invalid targets.
                    let target = self
                        .worker_spawn_order
                        .get(worker)
                        .copied()
                        .unwrap_or(EntityId(u64::MAX));
                    self.apply_debuff(target, kind);
                }
            }
        }
    }

    pub(super) fn run_tick(&mut self, fixed_dt_seconds: f32, world: &mut SceneWorld) {
        self.enqueue_due_casts();

        let mut context = GameplaySystemContext {
            fixed_dt_seconds,
            bounds: self.bounds,
            tuning: self.settings.tuning,
            world,
            workers: &mut self.workers,
            wheat_fields: &mut self.wheat_fields,
            smart_objects: &mut self.smart_objects,
            zones: &mut self.zones,
            rng: &mut self.rng,
            events: &mut self.system_events,
            intents: &mut self.system_intents,
        };
        self.systems_host.run_once_per_tick(&mut context);
        self.system_events.finish_tick_rollover();

        self.tick_count = self.tick_count.saturating_add(1);
        self.elapsed_seconds += fixed_dt_seconds;
    }

    pub(crate) fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[cfg(test)]
    pub(crate) fn worker_ids(&self) -> &[EntityId] {
        &self.worker_spawn_order
    }

    pub(crate) fn last_tick_event_counts(&self) -> GameplayEventCounts {
        self.system_events.last_tick_counts()
    }

    pub(crate) fn last_tick_intent_stats(&self) -> GameplayIntentApplyStats {
        self.system_intents.last_tick_apply_stats()
    }

    pub(crate) fn snapshot(&self, world: &SceneWorld) -> WorldSnapshot {
        let position = |id: EntityId| world.position_of(id).unwrap_or(Vec2::ZERO);

        let agents = self
            .workers
            .iter()
            .map(|(id, worker)| AgentSnapshot {
                id: *id,
                position: position(*id),
                facing: worker.motion.facing,
                animation: worker.motion.animation,
                sprite: format!("workers/worker_{}", worker.variant),
                stats: worker.stats,
                debuffs: worker
                    .debuffs
                    .iter()
                    .map(|debuff| DebuffSnapshot {
                        kind: debuff.kind,
                        icon: debuff.kind.icon(),
                        remaining_seconds: debuff.remaining_seconds,
                    })
                    .collect(),
                goal: worker.goap.current_goal,
                current_action: worker.goap.current_action_label(),
                plan: worker.goap.plan.iter().map(|action| action.name()).collect(),
                farm_target: worker.goap.blackboard.farm_target,
            })
            .collect();

        let wheat_fields = self
            .wheat_fields
            .iter()
            .map(|(id, field)| WheatFieldSnapshot {
                id: *id,
                position: position(*id),
                growth_stage: field.growth_stage,
                claimed_by: field.claimed_by,
            })
            .collect();

        let smart_objects = self
            .smart_objects
            .iter()
            .map(|(id, object)| SmartObjectSnapshot {
                id: *id,
                position: position(*id),
                interaction: object.interaction,
                capacity: object.capacity(),
                in_use: object.occupant_count(),
                occupants: object.slots.iter().map(|slot| slot.claimed_by).collect(),
            })
            .collect();

        let houses = self
            .houses
            .iter()
            .map(|(id, house)| HouseSnapshot {
                id: *id,
                position: position(*id),
                owner: house.owner,
            })
            .collect();

        let zones = self
            .zones
            .iter()
            .map(|(id, zone)| ZoneSnapshot {
                id: *id,
                kind: zone.kind,
                center: position(*id),
                radius: zone.radius,
                remaining_seconds: zone.remaining_seconds,
            })
            .collect();

        WorldSnapshot {
            tick: self.tick_count,
            agents,
            wheat_fields,
            smart_objects,
            houses,
            zones,
            last_tick_systems: self.systems_host.last_tick_order().to_vec(),
            last_tick_events: self.last_tick_event_counts(),
            last_tick_intents: self.last_tick_intent_stats(),
        }
    }
}

fn spawn_prop(
    world: &mut SceneWorld,
    position: Vec2,
    sprite_key: &str,
    debug_name: &'static str,
) -> EntityId {
    world.spawn(
        Transform { position },
        RenderableDesc {
            kind: RenderableKind::Sprite(sprite_key.to_string()),
            debug_name,
        },
    )
}

fn campfire() -> SmartObject {
    SmartObject {
        interaction: InteractionType::Entertainment,
        effects: AdvertisedEffects {
            boredom: -40.0,
            sanity: 10.0,
            ..AdvertisedEffects::default()
        },
        duration_seconds: 8.0,
        animation: AnimationTag::Warm,
        face_object: true,
        slots: slots_at(&[
            Vec2::new(-2.0 * TILE_SIZE, 0.0),
            Vec2::new(2.0 * TILE_SIZE, 0.0),
            Vec2::new(0.0, 2.0 * TILE_SIZE),
        ]),
    }
}

fn statue() -> SmartObject {
    SmartObject {
        interaction: InteractionType::Worship,
        effects: AdvertisedEffects {
            sanity: 20.0,
            corruption: 5.0,
            ..AdvertisedEffects::default()
        },
        duration_seconds: 6.0,
        animation: AnimationTag::Worship,
        face_object: true,
        slots: slots_at(&[
            Vec2::new(-TILE_SIZE, TILE_SIZE),
            Vec2::new(TILE_SIZE, TILE_SIZE),
        ]),
    }
}

fn slots_at(offsets: &[Vec2]) -> Vec<SmartObjectSlot> {
    offsets
        .iter()
        .map(|offset| SmartObjectSlot {
            local_offset: *offset,
            claimed_by: None,
        })
        .collect()
}
