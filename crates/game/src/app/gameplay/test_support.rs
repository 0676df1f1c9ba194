use std::collections::BTreeMap;

use engine::{EntityId, RenderableDesc, RenderableKind, SceneWorld, Transform, Vec2};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::actions::{navigate_to, ActionContext, ActionKind};
use super::events::GameplayEventBus;
use super::goap::{Goal, GoapComponent, SmartObjectClaim};
use super::movement::run_movement;
use super::nav::{GridBounds, GridPoint};
use super::planner::update_worker;
use super::types::{
    AdvertisedEffects, AnimationTag, InteractionType, Motion, SmartObject, SmartObjectSlot, Stat,
    StatBlock, WheatField, Worker,
};
use super::WORLD_BOUNDS;

const FIXTURE_WORKER_SPEED: f32 = 32.0;

/// Bare component tables without the scene or system host, for driving
/// single actions and planner turns directly.
pub(crate) struct Fixture {
    pub(crate) world: SceneWorld,
    pub(crate) workers: BTreeMap<EntityId, Worker>,
    pub(crate) wheat_fields: BTreeMap<EntityId, WheatField>,
    pub(crate) smart_objects: BTreeMap<EntityId, SmartObject>,
    pub(crate) rng: SmallRng,
    pub(crate) events: GameplayEventBus,
    pub(crate) bounds: GridBounds,
    pub(crate) dt_seconds: f32,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_seed(7)
    }

    pub(crate) fn with_seed(seed: u64) -> Self {
        Self {
            world: SceneWorld::default(),
            workers: BTreeMap::new(),
            wheat_fields: BTreeMap::new(),
            smart_objects: BTreeMap::new(),
            rng: SmallRng::seed_from_u64(seed),
            events: GameplayEventBus::default(),
            bounds: WORLD_BOUNDS,
            dt_seconds: 1.0 / 60.0,
        }
    }

    fn spawn_at(&mut self, cell: GridPoint, debug_name: &'static str, actor: bool) -> EntityId {
        let transform = Transform {
            position: cell.to_world(),
        };
        let renderable = RenderableDesc {
            kind: RenderableKind::Placeholder,
            debug_name,
        };
        let id = if actor {
            self.world.spawn_actor(transform, renderable)
        } else {
            self.world.spawn(transform, renderable)
        };
        self.world.apply_pending();
        id
    }

    pub(crate) fn spawn_worker(&mut self, cell: GridPoint) -> EntityId {
        let id = self.spawn_at(cell, "worker", true);
        self.workers.insert(
            id,
            Worker {
                stats: StatBlock {
                    stamina: Stat::new(10.0, 10.0),
                    sanity: Stat::new(80.0, 100.0),
                    corruption: Stat::new(0.0, 100.0),
                    boredom: Stat::new(0.0, 100.0),
                    satiety: Stat::new(80.0, 100.0),
                },
                motion: Motion::new(FIXTURE_WORKER_SPEED),
                goap: GoapComponent::new(vec![Goal::Farm], cell.to_world()),
                debuffs: Vec::new(),
                variant: 1,
            },
        );
        id
    }

    pub(crate) fn spawn_field(&mut self, cell: GridPoint) -> EntityId {
        let id = self.spawn_at(cell, "wheat_field", false);
        self.wheat_fields.insert(id, WheatField::new(1));
        id
    }

    pub(crate) fn spawn_smart_object(
        &mut self,
        cell: GridPoint,
        interaction: InteractionType,
        effects: AdvertisedEffects,
        duration_seconds: f32,
        capacity: usize,
    ) -> EntityId {
        let id = self.spawn_at(cell, "smart_object", false);
        let slots = (0..capacity)
            .map(|index| SmartObjectSlot {
                local_offset: Vec2::new((index as f32 - 1.0) * 16.0, 16.0),
                claimed_by: None,
            })
            .collect();
        let animation = match interaction {
            InteractionType::Worship => AnimationTag::Worship,
            InteractionType::Entertainment => AnimationTag::Warm,
        };
        self.smart_objects.insert(
            id,
            SmartObject {
                interaction,
                effects,
                duration_seconds,
                animation,
                face_object: true,
                slots,
            },
        );
        id
    }

    pub(crate) fn claim_slot(
        &mut self,
        worker_id: EntityId,
        object_id: EntityId,
        slot_index: usize,
    ) {
        let object = self.smart_objects.get_mut(&object_id).expect("smart object");
        object.slots[slot_index].claimed_by = Some(worker_id);
        self.worker_mut(worker_id).goap.blackboard.smart_object = Some(SmartObjectClaim {
            object_id,
            slot_index,
        });
    }

    pub(crate) fn worker(&self, id: EntityId) -> &Worker {
        self.workers.get(&id).expect("worker")
    }

    pub(crate) fn worker_mut(&mut self, id: EntityId) -> &mut Worker {
        self.workers.get_mut(&id).expect("worker")
    }

    /// Runs `turn` with the worker taken out of its table, the way the goap
    /// system does.
    fn with_turn<R>(
        &mut self,
        worker_id: EntityId,
        turn: impl FnOnce(&mut Worker, &mut ActionContext<'_>) -> R,
    ) -> R {
        let mut worker = self.workers.remove(&worker_id).expect("worker");
        let mut ctx = ActionContext {
            actor_id: worker_id,
            dt_seconds: self.dt_seconds,
            bounds: self.bounds,
            world: &mut self.world,
            workers: &mut self.workers,
            wheat_fields: &mut self.wheat_fields,
            smart_objects: &mut self.smart_objects,
            rng: &mut self.rng,
            events: &mut self.events,
        };
        let result = turn(&mut worker, &mut ctx);
        self.workers.insert(worker_id, worker);
        result
    }

    pub(crate) fn run_action(&mut self, worker_id: EntityId, action: ActionKind) -> bool {
        self.with_turn(worker_id, |worker, ctx| action.execute(worker, ctx))
    }

    pub(crate) fn run_navigate(&mut self, worker_id: EntityId, target: Vec2) -> bool {
        self.with_turn(worker_id, |worker, ctx| navigate_to(worker, ctx, target))
    }

    pub(crate) fn run_update(&mut self, worker_id: EntityId) {
        self.with_turn(worker_id, update_worker);
    }

    pub(crate) fn step_movement(&mut self) {
        run_movement(&mut self.world, &mut self.workers, self.dt_seconds);
    }
}
