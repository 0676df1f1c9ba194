use std::collections::BTreeMap;

use engine::{EntityId, RenderableDesc, RenderableKind, SceneWorld, Transform};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use super::actions::ActionContext;
use super::events::{
    GameplayEvent, GameplayEventBus, GameplayIntent, GameplayIntentApplyStats, GameplayIntentQueue,
};
use super::movement::run_movement;
use super::nav::GridBounds;
use super::planner::update_worker;
use super::scene_state::SkillTuning;
use super::types::{SmartObject, WheatField, Worker, Zone, ZoneKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum GameplaySystemId {
    Intents,
    StatusEffects,
    Zones,
    Goap,
    Movement,
    Cleanup,
}

pub(crate) const GAMEPLAY_SYSTEM_ORDER: [GameplaySystemId; 6] = [
    GameplaySystemId::Intents,
    GameplaySystemId::StatusEffects,
    GameplaySystemId::Zones,
    GameplaySystemId::Goap,
    GameplaySystemId::Movement,
    GameplaySystemId::Cleanup,
];

pub(crate) struct GameplaySystemContext<'a> {
    pub(crate) fixed_dt_seconds: f32,
    pub(crate) bounds: GridBounds,
    pub(crate) tuning: SkillTuning,
    pub(crate) world: &'a mut SceneWorld,
    pub(crate) workers: &'a mut BTreeMap<EntityId, Worker>,
    pub(crate) wheat_fields: &'a mut BTreeMap<EntityId, WheatField>,
    pub(crate) smart_objects: &'a mut BTreeMap<EntityId, SmartObject>,
    pub(crate) zones: &'a mut BTreeMap<EntityId, Zone>,
    pub(crate) rng: &'a mut SmallRng,
    pub(crate) events: &'a mut GameplayEventBus,
    pub(crate) intents: &'a mut GameplayIntentQueue,
}

#[derive(Debug, Default)]
pub(crate) struct GameplaySystemsHost {
    last_tick_order: Vec<GameplaySystemId>,
}

impl GameplaySystemsHost {
    pub(crate) fn run_once_per_tick(&mut self, context: &mut GameplaySystemContext<'_>) {
        self.last_tick_order.clear();
        for system_id in GAMEPLAY_SYSTEM_ORDER {
            self.last_tick_order.push(system_id);
            self.run_system(system_id, context);
        }
    }

    pub(crate) fn last_tick_order(&self) -> &[GameplaySystemId] {
        &self.last_tick_order
    }

    fn run_system(&self, system_id: GameplaySystemId, context: &mut GameplaySystemContext<'_>) {
        match system_id {
            GameplaySystemId::Intents => Self::run_intents_system(context),
            GameplaySystemId::StatusEffects => Self::run_status_effects_system(context),
            GameplaySystemId::Zones => Self::run_zones_system(context),
            GameplaySystemId::Goap => Self::run_goap_system(context),
            GameplaySystemId::Movement => {
                run_movement(context.world, context.workers, context.fixed_dt_seconds)
            }
            GameplaySystemId::Cleanup => Self::run_cleanup_system(context),
        }
    }

    fn run_intents_system(context: &mut GameplaySystemContext<'_>) {
        let mut stats = GameplayIntentApplyStats::default();
        for intent in context.intents.drain_current_tick() {
            stats.record_intent(&intent);
            match intent {
                GameplayIntent::CastWhisper { center } => {
                    let zone_id = context.world.spawn(
                        Transform { position: center },
                        RenderableDesc {
                            kind: RenderableKind::Placeholder,
                            debug_name: "whisper_zone",
                        },
                    );
                    let whisper = context.tuning;
                    context.zones.insert(
                        zone_id,
                        Zone {
                            kind: ZoneKind::Whisper,
                            radius: whisper.whisper_radius,
                            remaining_seconds: whisper.whisper_duration_seconds,
                            damage_min: whisper.whisper_damage_min,
                            damage_max: whisper.whisper_damage_max,
                            tick_accumulator: 0.0,
                        },
                    );
                    context
                        .events
                        .emit(GameplayEvent::ZoneSpawned { zone_id, center });
                    debug!(zone = zone_id.0, x = center.x, y = center.y, "whisper_cast");
                }
                GameplayIntent::ApplyDebuff { entity_id, kind } => {
                    let Some(worker) = context.workers.get_mut(&entity_id) else {
                        stats.record_invalid_target();
                        warn!(entity = entity_id.0, kind = ?kind, "debuff_target_missing");
                        continue;
                    };
                    let added = worker.apply_debuff(kind, context.tuning.debuff_duration_seconds);
                    context
                        .events
                        .emit(GameplayEvent::DebuffApplied { entity_id, kind });
                    debug!(
                        entity = entity_id.0,
                        kind = ?kind,
                        refreshed = !added,
                        "debuff_applied"
                    );
                }
            }
        }
        // Zones cast this tick are live for the zones system below.
        context.world.apply_pending();
        context.intents.set_last_tick_apply_stats(stats);
    }

    fn run_status_effects_system(context: &mut GameplaySystemContext<'_>) {
        let dt = context.fixed_dt_seconds;
        for (worker_id, worker) in context.workers.iter_mut() {
            for debuff in worker.debuffs.iter_mut() {
                debuff.remaining_seconds -= dt;
                debuff.tick_accumulator += dt;
                while debuff.tick_accumulator >= 1.0 {
                    debuff.tick_accumulator -= 1.0;
                    let (stat, delta) = debuff.kind.periodic_drain();
                    worker.stats.get_mut(stat).add(delta);
                }
            }

            let mut expired = Vec::new();
            worker.debuffs.retain(|debuff| {
                let active = debuff.remaining_seconds > 0.0;
                if !active {
                    expired.push(debuff.kind);
                }
                active
            });
            for kind in expired {
                context.events.emit(GameplayEvent::DebuffExpired {
                    entity_id: *worker_id,
                    kind,
                });
                debug!(entity = worker_id.0, kind = ?kind, "debuff_expired");
            }
        }
    }

    fn run_zones_system(context: &mut GameplaySystemContext<'_>) {
        let dt = context.fixed_dt_seconds;
        let zone_ids = context.zones.keys().copied().collect::<Vec<_>>();
        for zone_id in zone_ids {
            let Some(center) = context.world.position_of(zone_id) else {
                continue;
            };
            let Some(zone) = context.zones.get_mut(&zone_id) else {
                continue;
            };
            zone.remaining_seconds -= dt;
            zone.tick_accumulator += dt;
            let mut pulses = 0u32;
            while zone.tick_accumulator >= 1.0 {
                zone.tick_accumulator -= 1.0;
                pulses += 1;
            }
            let zone = *zone;

            for _ in 0..pulses {
                for (worker_id, worker) in context.workers.iter_mut() {
                    let Some(position) = context.world.position_of(*worker_id) else {
                        continue;
                    };
                    if position.distance(center) > zone.radius {
                        continue;
                    }
                    let damage = context.rng.random_range(zone.damage_min..=zone.damage_max);
                    worker.stats.sanity.add(-damage);
                }
            }

            if zone.remaining_seconds <= 0.0 {
                context.zones.remove(&zone_id);
                context.world.despawn(zone_id);
                context.events.emit(GameplayEvent::ZoneExpired { zone_id });
                debug!(zone = zone_id.0, "whisper_expired");
            }
        }
    }

    /// Workers take turns in id order. Each one is lifted out of the table
    /// for its turn, so a check-then-claim inside the turn cannot interleave
    /// with another worker.
    fn run_goap_system(context: &mut GameplaySystemContext<'_>) {
        let worker_ids = context.workers.keys().copied().collect::<Vec<_>>();
        for worker_id in worker_ids {
            if !context.world.contains(worker_id) {
                continue;
            }
            let Some(mut worker) = context.workers.remove(&worker_id) else {
                continue;
            };
            let mut action_context = ActionContext {
                actor_id: worker_id,
                dt_seconds: context.fixed_dt_seconds,
                bounds: context.bounds,
                world: &mut *context.world,
                workers: &mut *context.workers,
                wheat_fields: &mut *context.wheat_fields,
                smart_objects: &mut *context.smart_objects,
                rng: &mut *context.rng,
                events: &mut *context.events,
            };
            update_worker(&mut worker, &mut action_context);
            context.workers.insert(worker_id, worker);
        }
    }

    /// Drops components whose entity is gone and frees every claim held by a
    /// worker that no longer exists.
    fn run_cleanup_system(context: &mut GameplaySystemContext<'_>) {
        let world = &*context.world;
        context.workers.retain(|id, _| world.contains(*id));
        context.wheat_fields.retain(|id, _| world.contains(*id));
        context.smart_objects.retain(|id, _| world.contains(*id));

        let workers = &*context.workers;
        for field in context.wheat_fields.values_mut() {
            if field
                .claimed_by
                .is_some_and(|owner| !workers.contains_key(&owner))
            {
                field.claimed_by = None;
            }
        }
        for object in context.smart_objects.values_mut() {
            for slot in object.slots.iter_mut() {
                if slot
                    .claimed_by
                    .is_some_and(|owner| !workers.contains_key(&owner))
                {
                    slot.claimed_by = None;
                }
            }
        }
    }
}
