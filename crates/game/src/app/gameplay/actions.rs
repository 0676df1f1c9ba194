use std::collections::BTreeMap;

use engine::{EntityId, SceneWorld, Vec2};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::events::{GameplayEvent, GameplayEventBus};
use super::goap::{Blackboard, SmartObjectClaim, WorldState};
use super::nav::{find_path, BlockedCells, GridBounds, GridPoint};
use super::types::{AnimationTag, InteractionType, SmartObject, WheatField, Worker};
use super::{
    CHAT_SECONDS, CORRUPTION_GAIN, FARM_STAMINA_COST, FARM_WORK_SECONDS, MEDITATE_CORRUPTION_CHANCE,
    MEDITATE_SECONDS, NAV_ARRIVAL_EPSILON, PRAY_CORRUPTION_CHANCE, PRAY_SECONDS,
    REST_STAMINA_PER_SECOND, SMART_OBJECT_DISTANCE_WEIGHT, SOCIAL_HANDSHAKE_TIMEOUT_SECONDS,
    WANDER_BOREDOM_RELIEF, WANDER_SECONDS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum ActionKind {
    GoHome,
    Rest,
    FindFarm,
    GoToFarm,
    Farm,
    FindSmartObject(InteractionType),
    GoToSmartObject,
    UseSmartObject,
    GoToRandomSpot,
    Wander,
    Pray,
    Meditate,
    ChatWithOther,
}

/// Everything an action may touch besides the acting worker. The acting
/// worker is not in `workers` while its turn runs.
pub(crate) struct ActionContext<'a> {
    pub(crate) actor_id: EntityId,
    pub(crate) dt_seconds: f32,
    pub(crate) bounds: GridBounds,
    pub(crate) world: &'a mut SceneWorld,
    pub(crate) workers: &'a mut BTreeMap<EntityId, Worker>,
    pub(crate) wheat_fields: &'a mut BTreeMap<EntityId, WheatField>,
    pub(crate) smart_objects: &'a mut BTreeMap<EntityId, SmartObject>,
    pub(crate) rng: &'a mut SmallRng,
    pub(crate) events: &'a mut GameplayEventBus,
}

impl ActionContext<'_> {
    pub(crate) fn actor_position(&self) -> Option<Vec2> {
        self.world.position_of(self.actor_id)
    }

    /// Rounded cells of every other worker.
    fn occupied_cells(&self) -> BlockedCells {
        self.workers
            .keys()
            .filter_map(|worker_id| self.world.position_of(*worker_id))
            .map(GridPoint::from_world)
            .collect()
    }
}

impl ActionKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::GoHome => "GoHome",
            Self::Rest => "Rest",
            Self::FindFarm => "FindFarm",
            Self::GoToFarm => "GoToFarm",
            Self::Farm => "Farm",
            Self::FindSmartObject(InteractionType::Worship) => "FindSmartObject(Worship)",
            Self::FindSmartObject(InteractionType::Entertainment) => {
                "FindSmartObject(Entertainment)"
            }
            Self::GoToSmartObject => "GoToSmartObject",
            Self::UseSmartObject => "UseSmartObject",
            Self::GoToRandomSpot => "GoToRandomSpot",
            Self::Wander => "Wander",
            Self::Pray => "Pray",
            Self::Meditate => "Meditate",
            Self::ChatWithOther => "ChatWithOther",
        }
    }

    /// Planning weight only.
    pub(crate) fn cost(self) -> u32 {
        match self {
            Self::Farm | Self::Pray | Self::Meditate => 2,
            _ => 1,
        }
    }

    pub(crate) fn precondition(self, state: &WorldState) -> bool {
        match self {
            Self::GoHome | Self::GoToRandomSpot => true,
            Self::Rest | Self::Meditate => state.at_home,
            Self::FindFarm => !state.has_farm_target,
            Self::GoToFarm => state.has_farm_target,
            Self::Farm => state.at_farm && state.has_stamina,
            Self::FindSmartObject(_) => !state.has_smart_object_target,
            Self::GoToSmartObject => state.has_smart_object_target,
            Self::UseSmartObject => state.at_smart_object,
            Self::Wander | Self::Pray => state.at_quiet_spot,
            Self::ChatWithOther => state.has_social_partner,
        }
    }

    pub(crate) fn apply_effects(self, state: &mut WorldState) {
        match self {
            Self::GoHome => state.at_home = true,
            Self::Rest => state.has_stamina = true,
            Self::FindFarm => state.has_farm_target = true,
            Self::GoToFarm => state.at_farm = true,
            Self::Farm | Self::Pray | Self::Meditate => {}
            Self::FindSmartObject(_) => state.has_smart_object_target = true,
            Self::GoToSmartObject => state.at_smart_object = true,
            Self::UseSmartObject => {
                state.has_smart_object_target = false;
                state.at_smart_object = false;
            }
            Self::GoToRandomSpot => state.at_quiet_spot = true,
            Self::Wander => state.at_quiet_spot = false,
            Self::ChatWithOther => state.has_social_partner = false,
        }
    }

    /// Runs one tick of the action. `false` means still running; `true`
    /// means finished, either completed or given up.
    pub(crate) fn execute(self, worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
        match self {
            Self::GoHome => go_home(worker, ctx),
            Self::Rest => rest(worker, ctx),
            Self::FindFarm => find_farm(worker, ctx),
            Self::GoToFarm => go_to_farm(worker, ctx),
            Self::Farm => farm(worker, ctx),
            Self::FindSmartObject(interaction) => find_smart_object(worker, ctx, interaction),
            Self::GoToSmartObject => go_to_smart_object(worker, ctx),
            Self::UseSmartObject => use_smart_object(worker, ctx),
            Self::GoToRandomSpot => go_to_random_spot(worker, ctx),
            Self::Wander => wander(worker, ctx),
            Self::Pray => contemplate(worker, ctx, Contemplation::Pray),
            Self::Meditate => contemplate(worker, ctx, Contemplation::Meditate),
            Self::ChatWithOther => chat_with_other(worker, ctx),
        }
    }
}

/// Walks `plan` through preconditions and effects from `start`, returning the
/// first step whose precondition does not hold.
pub(crate) fn first_unsatisfied_step(
    start: WorldState,
    plan: &[ActionKind],
) -> Option<ActionKind> {
    let mut state = start;
    for action in plan {
        if !action.precondition(&state) {
            return Some(*action);
        }
        action.apply_effects(&mut state);
    }
    None
}

pub(crate) fn plan_cost(plan: &[ActionKind]) -> u32 {
    plan.iter().map(|action| action.cost()).sum()
}

/// Returns `(first_tick, elapsed_including_this_tick)`.
fn advance_action_timer(blackboard: &mut Blackboard, dt_seconds: f32) -> (bool, f32) {
    let first_tick = blackboard.action_elapsed.is_none();
    let elapsed = blackboard.action_elapsed.unwrap_or(0.0) + dt_seconds;
    blackboard.action_elapsed = Some(elapsed);
    (first_tick, elapsed)
}

/// Routes toward `target`, replanning only when the goal cell changed or the
/// worker ran out of route. Returns `true` once the worker stands on target.
pub(crate) fn navigate_to(worker: &mut Worker, ctx: &mut ActionContext<'_>, target: Vec2) -> bool {
    let Some(position) = ctx.actor_position() else {
        return false;
    };
    if position.distance(target) <= NAV_ARRIVAL_EPSILON {
        worker.motion.stop();
        worker.goap.blackboard.nav_goal = None;
        return true;
    }

    let goal_cell = GridPoint::from_world(target);
    let needs_route =
        worker.goap.blackboard.nav_goal != Some(goal_cell) || worker.motion.is_idle();
    if !needs_route {
        return false;
    }

    let start_cell = GridPoint::from_world(position);
    if start_cell == goal_cell {
        worker.motion.follow(vec![target]);
        worker.goap.blackboard.nav_goal = Some(goal_cell);
        return false;
    }

    let cells = find_path(start_cell, goal_cell, &ctx.occupied_cells(), ctx.bounds);
    if cells.is_empty() {
        return false;
    }
    let mut waypoints: Vec<Vec2> = cells.into_iter().map(GridPoint::to_world).collect();
    if let Some(last) = waypoints.last_mut() {
        *last = target;
    }
    worker.motion.follow(waypoints);
    worker.goap.blackboard.nav_goal = Some(goal_cell);
    false
}

fn go_home(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some(home) = worker.goap.blackboard.home else {
        return true;
    };
    navigate_to(worker, ctx, home)
}

fn rest(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    worker.motion.animation = AnimationTag::Rest;
    worker
        .stats
        .stamina
        .add(REST_STAMINA_PER_SECOND * ctx.dt_seconds);
    if worker.stats.stamina.is_full() {
        worker.motion.animation = AnimationTag::Idle;
        return true;
    }
    false
}

pub(crate) fn farm_claim_intact(
    actor_id: EntityId,
    field_id: EntityId,
    wheat_fields: &BTreeMap<EntityId, WheatField>,
    world: &SceneWorld,
) -> bool {
    world.contains(field_id)
        && wheat_fields
            .get(&field_id)
            .is_some_and(|field| field.claimed_by == Some(actor_id))
}

pub(crate) fn smart_object_claim_intact(
    actor_id: EntityId,
    claim: SmartObjectClaim,
    smart_objects: &BTreeMap<EntityId, SmartObject>,
    world: &SceneWorld,
) -> bool {
    world.contains(claim.object_id)
        && smart_objects
            .get(&claim.object_id)
            .is_some_and(|object| object.slot_held_by(claim.slot_index, actor_id))
}

fn find_farm(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some(position) = ctx.actor_position() else {
        return false;
    };
    let actor_id = ctx.actor_id;

    let mut nearest: Option<(f32, EntityId)> = None;
    for (field_id, field) in ctx.wheat_fields.iter() {
        if !field.is_claimable_by(actor_id) {
            continue;
        }
        let Some(field_position) = ctx.world.position_of(*field_id) else {
            continue;
        };
        let distance_sq = position.distance_sq(field_position);
        if nearest.map_or(true, |(best_sq, _)| distance_sq < best_sq) {
            nearest = Some((distance_sq, *field_id));
        }
    }

    let Some((_, field_id)) = nearest else {
        return false;
    };
    let Some(field) = ctx.wheat_fields.get_mut(&field_id) else {
        return false;
    };
    field.claimed_by = Some(actor_id);
    worker.goap.blackboard.farm_target = Some(field_id);
    ctx.events.emit(GameplayEvent::ClaimAcquired {
        actor_id,
        target_id: field_id,
    });
    debug!(actor = actor_id.0, field = field_id.0, "farm_claimed");
    true
}

fn go_to_farm(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some(field_id) = worker.goap.blackboard.farm_target else {
        return false;
    };
    if !farm_claim_intact(ctx.actor_id, field_id, ctx.wheat_fields, ctx.world) {
        worker.goap.blackboard.farm_target = None;
        return false;
    }
    let Some(field_position) = ctx.world.position_of(field_id) else {
        return false;
    };
    navigate_to(worker, ctx, field_position)
}

fn farm(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some(field_id) = worker.goap.blackboard.farm_target else {
        return true;
    };
    if !farm_claim_intact(ctx.actor_id, field_id, ctx.wheat_fields, ctx.world) {
        worker.goap.blackboard.farm_target = None;
        return true;
    }
    let Some(field_position) = ctx.world.position_of(field_id) else {
        return true;
    };

    let (first_tick, elapsed) = advance_action_timer(&mut worker.goap.blackboard, ctx.dt_seconds);
    if first_tick {
        worker.motion.animation = AnimationTag::Work;
        if let Some(position) = ctx.actor_position() {
            worker.motion.face_toward(position, field_position);
        }
    }
    if elapsed < FARM_WORK_SECONDS {
        return false;
    }

    worker.stats.stamina.add(-FARM_STAMINA_COST);
    if let Some(field) = ctx.wheat_fields.get_mut(&field_id) {
        field.advance_growth();
        debug!(
            actor = ctx.actor_id.0,
            field = field_id.0,
            growth_stage = field.growth_stage,
            "field_worked"
        );
    }
    worker.motion.animation = AnimationTag::Idle;
    true
}

fn find_smart_object(
    worker: &mut Worker,
    ctx: &mut ActionContext<'_>,
    interaction: InteractionType,
) -> bool {
    let Some(position) = ctx.actor_position() else {
        return false;
    };
    let actor_id = ctx.actor_id;

    let mut best: Option<(f32, EntityId, usize)> = None;
    for (object_id, object) in ctx.smart_objects.iter() {
        if object.interaction != interaction {
            continue;
        }
        let Some(slot_index) = object.first_free_slot() else {
            continue;
        };
        let Some(object_position) = ctx.world.position_of(*object_id) else {
            continue;
        };
        let score = object.effects.total_magnitude()
            - position.distance(object_position) * SMART_OBJECT_DISTANCE_WEIGHT;
        if best.map_or(true, |(best_score, _, _)| score > best_score) {
            best = Some((score, *object_id, slot_index));
        }
    }

    let Some((_, object_id, slot_index)) = best else {
        return false;
    };
    let Some(slot) = ctx
        .smart_objects
        .get_mut(&object_id)
        .and_then(|object| object.slots.get_mut(slot_index))
    else {
        return false;
    };
    slot.claimed_by = Some(actor_id);
    worker.goap.blackboard.smart_object = Some(SmartObjectClaim {
        object_id,
        slot_index,
    });
    ctx.events.emit(GameplayEvent::ClaimAcquired {
        actor_id,
        target_id: object_id,
    });
    debug!(
        actor = actor_id.0,
        object = object_id.0,
        slot = slot_index,
        "smart_object_slot_claimed"
    );
    true
}

pub(crate) fn smart_object_slot_position(
    claim: SmartObjectClaim,
    smart_objects: &BTreeMap<EntityId, SmartObject>,
    world: &SceneWorld,
) -> Option<Vec2> {
    let object_position = world.position_of(claim.object_id)?;
    let slot = smart_objects
        .get(&claim.object_id)?
        .slots
        .get(claim.slot_index)?;
    Some(object_position.offset(slot.local_offset))
}

/// The held claim with its object and slot positions, or `None` once the
/// claim went stale.
fn held_slot(worker: &Worker, ctx: &ActionContext<'_>) -> Option<(SmartObjectClaim, Vec2, Vec2)> {
    let claim = worker.goap.blackboard.smart_object?;
    if !smart_object_claim_intact(ctx.actor_id, claim, ctx.smart_objects, ctx.world) {
        return None;
    }
    let object_position = ctx.world.position_of(claim.object_id)?;
    let slot_position = smart_object_slot_position(claim, ctx.smart_objects, ctx.world)?;
    Some((claim, object_position, slot_position))
}

fn go_to_smart_object(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some((_, _, slot_position)) = held_slot(worker, ctx) else {
        worker.goap.blackboard.smart_object = None;
        return false;
    };
    navigate_to(worker, ctx, slot_position)
}

fn use_smart_object(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some((claim, object_position, _)) = held_slot(worker, ctx) else {
        worker.goap.blackboard.smart_object = None;
        return true;
    };
    let Some(object) = ctx.smart_objects.get(&claim.object_id) else {
        return true;
    };
    let effects = object.effects;
    let duration = object.duration_seconds;
    let animation = object.animation;
    let face_object = object.face_object;

    let started_at = worker.goap.blackboard.action_elapsed.unwrap_or(0.0);
    if worker.goap.blackboard.action_elapsed.is_none() {
        worker.motion.animation = animation;
        if face_object {
            if let Some(position) = ctx.actor_position() {
                worker.motion.face_toward(position, object_position);
            }
        }
    }

    let finished = if duration <= 0.0 {
        for (stat, delta) in effects.entries() {
            worker.stats.get_mut(stat).add(delta);
        }
        true
    } else {
        let step = ctx.dt_seconds.min(duration - started_at).max(0.0);
        for (stat, delta) in effects.entries() {
            worker.stats.get_mut(stat).add(delta * (step / duration));
        }
        let elapsed = started_at + step;
        worker.goap.blackboard.action_elapsed = Some(elapsed);
        elapsed >= duration
    };
    if !finished {
        return false;
    }

    if let Some(object) = ctx.smart_objects.get_mut(&claim.object_id) {
        object.release_slot(claim.slot_index, ctx.actor_id);
    }
    worker.goap.blackboard.smart_object = None;
    worker.motion.animation = AnimationTag::Idle;
    ctx.events.emit(GameplayEvent::ClaimReleased {
        actor_id: ctx.actor_id,
        target_id: claim.object_id,
    });
    true
}

fn go_to_random_spot(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let spot = match worker.goap.blackboard.wander_spot {
        Some(spot) => spot,
        None => {
            let cell = GridPoint::new(
                ctx.rng.random_range(ctx.bounds.min_x..=ctx.bounds.max_x),
                ctx.rng.random_range(ctx.bounds.min_y..=ctx.bounds.max_y),
            );
            let spot = cell.to_world();
            worker.goap.blackboard.wander_spot = Some(spot);
            spot
        }
    };
    navigate_to(worker, ctx, spot)
}

fn wander(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let (first_tick, elapsed) = advance_action_timer(&mut worker.goap.blackboard, ctx.dt_seconds);
    if first_tick {
        worker.motion.animation = AnimationTag::Walk;
    }
    if elapsed < WANDER_SECONDS {
        return false;
    }
    worker.stats.boredom.add(-WANDER_BOREDOM_RELIEF);
    worker.goap.blackboard.wander_spot = None;
    worker.motion.animation = AnimationTag::Idle;
    true
}

#[derive(Debug, Clone, Copy)]
enum Contemplation {
    Pray,
    Meditate,
}

fn contemplate(worker: &mut Worker, ctx: &mut ActionContext<'_>, kind: Contemplation) -> bool {
    let (animation, duration, corruption_chance) = match kind {
        Contemplation::Pray => (AnimationTag::Pray, PRAY_SECONDS, PRAY_CORRUPTION_CHANCE),
        Contemplation::Meditate => (
            AnimationTag::Meditate,
            MEDITATE_SECONDS,
            MEDITATE_CORRUPTION_CHANCE,
        ),
    };
    let (first_tick, elapsed) = advance_action_timer(&mut worker.goap.blackboard, ctx.dt_seconds);
    if first_tick {
        worker.motion.animation = animation;
    }
    if elapsed < duration {
        return false;
    }
    if ctx.rng.random_bool(corruption_chance) {
        worker.stats.corruption.add(CORRUPTION_GAIN);
    }
    if matches!(kind, Contemplation::Pray) {
        worker.goap.blackboard.wander_spot = None;
    }
    worker.motion.animation = AnimationTag::Idle;
    true
}

fn chat_with_other(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let actor_id = ctx.actor_id;
    let Some(partner_id) = worker.goap.blackboard.social.partner else {
        // The partner ended the conversation, or it never formed.
        worker.motion.animation = AnimationTag::Idle;
        return true;
    };
    let Some(partner) = ctx.workers.get_mut(&partner_id) else {
        worker.goap.blackboard.social.drop_partner();
        return true;
    };
    let partner_link = partner.goap.blackboard.social;
    let bound_to_us = partner_link.partner == Some(actor_id);
    let request_pending = partner_link.incoming_request == Some(actor_id);
    if !bound_to_us && !request_pending {
        worker.goap.blackboard.social.drop_partner();
        return true;
    }

    if !(bound_to_us && worker.goap.blackboard.social.accepted) {
        let link = &mut worker.goap.blackboard.social;
        link.wait_elapsed += ctx.dt_seconds;
        if link.wait_elapsed < SOCIAL_HANDSHAKE_TIMEOUT_SECONDS {
            return false;
        }
        if request_pending {
            partner.goap.blackboard.social.incoming_request = None;
        }
        link.drop_partner();
        debug!(actor = actor_id.0, partner = partner_id.0, "social_request_withdrawn");
        return true;
    }

    let (first_tick, elapsed) = advance_action_timer(&mut worker.goap.blackboard, ctx.dt_seconds);
    if first_tick {
        worker.motion.animation = AnimationTag::Talk;
        if let (Some(own), Some(other)) = (
            ctx.world.position_of(actor_id),
            ctx.world.position_of(partner_id),
        ) {
            worker.motion.face_toward(own, other);
        }
    }
    if elapsed < CHAT_SECONDS {
        return false;
    }

    // Ends the conversation for both sides; the partner's own ChatWithOther
    // sees the dropped link and finishes on its next turn.
    worker.stats.boredom.set(0.0);
    worker.goap.blackboard.social.drop_partner();
    partner.stats.boredom.set(0.0);
    partner.goap.blackboard.social.drop_partner();
    worker.motion.animation = AnimationTag::Idle;
    debug!(actor = actor_id.0, partner = partner_id.0, "social_chat_finished");
    true
}
