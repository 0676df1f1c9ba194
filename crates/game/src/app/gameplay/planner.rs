use engine::{EntityId, Vec2};
use rand::rngs::SmallRng;
use rand::Rng;
use tracing::debug;

use super::actions::{
    farm_claim_intact, first_unsatisfied_step, plan_cost, smart_object_claim_intact,
    smart_object_slot_position, ActionContext, ActionKind,
};
use super::events::GameplayEvent;
use super::goap::{Goal, WorldState};
use super::types::{InteractionType, Worker};
use super::{
    BOREDOM_PER_SECOND, GOAL_MEDITATE_CHANCE, GOAL_PRAY_CHANCE, KILL_BOREDOM_MIN_BOREDOM,
    KILL_BOREDOM_SMART_OBJECT_CHANCE, NEAR_DISTANCE, NEAR_SMART_OBJECT_DISTANCE,
    PRAY_AT_SHRINE_CHANCE, SOCIAL_ACCEPT_MIN_BOREDOM, SOCIAL_REQUEST_RADIUS,
};

/// One scheduling turn for one worker: drift, social acceptance, goal
/// transitions, planning, claim safety net, then one tick of the active
/// action.
pub(crate) fn update_worker(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    worker
        .stats
        .boredom
        .add(BOREDOM_PER_SECOND * ctx.dt_seconds);

    accept_social_request(worker, ctx);
    apply_goal_transitions(worker, ctx);

    if worker.goap.plan_exhausted() {
        build_plan(worker, ctx);
    }

    if held_claim_went_stale(worker, ctx) {
        abort_stale_plan(worker, ctx);
        return;
    }

    execute_active_action(worker, ctx);
}

fn accept_social_request(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    let link = worker.goap.blackboard.social;
    let Some(requester_id) = link.incoming_request else {
        return;
    };
    if worker.goap.current_goal.is_some()
        || link.partner.is_some()
        || worker.stats.boredom.current <= SOCIAL_ACCEPT_MIN_BOREDOM
    {
        return;
    }

    let actor_id = ctx.actor_id;
    worker.goap.blackboard.social.incoming_request = None;
    let Some(requester) = ctx.workers.get_mut(&requester_id) else {
        return;
    };
    if requester.goap.blackboard.social.partner != Some(actor_id) {
        return;
    }
    requester.goap.blackboard.social.accepted = true;

    let link = &mut worker.goap.blackboard.social;
    link.partner = Some(requester_id);
    link.accepted = true;
    link.wait_elapsed = 0.0;
    ctx.events.emit(GameplayEvent::SocialAccepted {
        actor_id,
        requester_id,
    });
    debug!(actor = actor_id.0, requester = requester_id.0, "social_request_accepted");
    switch_goal(worker, ctx, Some(Goal::KillBoredom));
}

fn apply_goal_transitions(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    let stamina = worker.stats.stamina;
    if stamina.is_depleted() && worker.goap.current_goal != Some(Goal::RecoverStamina) {
        release_held_claims(worker, ctx);
        worker.motion.stop();
        switch_goal(worker, ctx, Some(Goal::RecoverStamina));
        return;
    }
    if stamina.is_full() && worker.goap.current_goal == Some(Goal::RecoverStamina) {
        switch_goal(worker, ctx, None);
    }
    if worker.goap.current_goal.is_none() {
        let goal = select_goal(worker, ctx.rng);
        switch_goal(worker, ctx, Some(goal));
    }
}

pub(crate) fn select_goal(worker: &Worker, rng: &mut SmallRng) -> Goal {
    if worker.stats.sanity.is_depleted() {
        let roll: f64 = rng.random();
        if roll < GOAL_PRAY_CHANCE {
            Goal::Pray
        } else if roll < GOAL_PRAY_CHANCE + GOAL_MEDITATE_CHANCE {
            Goal::Meditate
        } else {
            worker.goap.default_goal()
        }
    } else if worker.stats.boredom.current > KILL_BOREDOM_MIN_BOREDOM {
        Goal::KillBoredom
    } else {
        worker.goap.default_goal()
    }
}

fn switch_goal(worker: &mut Worker, ctx: &mut ActionContext<'_>, goal: Option<Goal>) {
    if worker.goap.current_goal == goal {
        return;
    }
    worker.goap.current_goal = goal;
    worker.goap.abort_plan();
    ctx.events.emit(GameplayEvent::GoalChanged {
        actor_id: ctx.actor_id,
        goal,
    });
    debug!(
        actor = ctx.actor_id.0,
        goal = goal.map_or("none", Goal::as_token),
        "goal_changed"
    );
}

/// Gives up every farm claim, smart-object slot and social link the worker
/// holds, including the partner's side of the link.
pub(crate) fn release_held_claims(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    let actor_id = ctx.actor_id;
    if let Some(field_id) = worker.goap.blackboard.farm_target.take() {
        if let Some(field) = ctx.wheat_fields.get_mut(&field_id) {
            if field.claimed_by == Some(actor_id) {
                field.claimed_by = None;
                ctx.events.emit(GameplayEvent::ClaimReleased {
                    actor_id,
                    target_id: field_id,
                });
            }
        }
    }
    if let Some(claim) = worker.goap.blackboard.smart_object.take() {
        if let Some(object) = ctx.smart_objects.get_mut(&claim.object_id) {
            if object.release_slot(claim.slot_index, actor_id) {
                ctx.events.emit(GameplayEvent::ClaimReleased {
                    actor_id,
                    target_id: claim.object_id,
                });
            }
        }
    }

    let link = worker.goap.blackboard.social;
    if let Some(partner_id) = link.partner {
        if let Some(partner) = ctx.workers.get_mut(&partner_id) {
            let theirs = &mut partner.goap.blackboard.social;
            if theirs.partner == Some(actor_id) {
                theirs.drop_partner();
            }
            if theirs.incoming_request == Some(actor_id) {
                theirs.incoming_request = None;
            }
        }
    }
    if let Some(requester_id) = link.incoming_request {
        if let Some(requester) = ctx.workers.get_mut(&requester_id) {
            if requester.goap.blackboard.social.partner == Some(actor_id) {
                requester.goap.blackboard.social.drop_partner();
            }
        }
    }
    worker.goap.blackboard.social.clear();
    debug!(actor = actor_id.0, "claims_released");
}

/// Drops every blackboard reference whose target is gone or no longer
/// points back at this worker.
fn validate_held_references(worker: &mut Worker, ctx: &ActionContext<'_>) {
    let actor_id = ctx.actor_id;
    let blackboard = &mut worker.goap.blackboard;

    if let Some(field_id) = blackboard.farm_target {
        if !farm_claim_intact(actor_id, field_id, ctx.wheat_fields, ctx.world) {
            blackboard.farm_target = None;
        }
    }
    if let Some(claim) = blackboard.smart_object {
        if !smart_object_claim_intact(actor_id, claim, ctx.smart_objects, ctx.world) {
            blackboard.smart_object = None;
        }
    }

    let link = blackboard.social;
    if let Some(partner_id) = link.partner {
        let partner_still_linked = ctx.workers.get(&partner_id).is_some_and(|partner| {
            let theirs = partner.goap.blackboard.social;
            theirs.partner == Some(actor_id) || theirs.incoming_request == Some(actor_id)
        });
        if !partner_still_linked {
            blackboard.social.drop_partner();
        }
    }
    if let Some(requester_id) = link.incoming_request {
        let requester_waiting = ctx
            .workers
            .get(&requester_id)
            .is_some_and(|requester| requester.goap.blackboard.social.partner == Some(actor_id));
        if !requester_waiting {
            blackboard.social.incoming_request = None;
        }
    }
}

pub(crate) fn sense_world_state(worker: &Worker, ctx: &ActionContext<'_>) -> WorldState {
    let position = ctx.actor_position();
    let near = |target: Option<Vec2>, threshold: f32| match (position, target) {
        (Some(position), Some(target)) => position.distance(target) <= threshold,
        _ => false,
    };
    let blackboard = &worker.goap.blackboard;
    let farm_position = blackboard
        .farm_target
        .and_then(|field_id| ctx.world.position_of(field_id));
    let slot_position = blackboard
        .smart_object
        .and_then(|claim| smart_object_slot_position(claim, ctx.smart_objects, ctx.world));

    WorldState {
        at_home: near(blackboard.home, NEAR_DISTANCE),
        has_farm_target: blackboard.farm_target.is_some(),
        at_farm: near(farm_position, NEAR_DISTANCE),
        has_stamina: !worker.stats.stamina.is_depleted(),
        has_smart_object_target: blackboard.smart_object.is_some(),
        at_smart_object: near(slot_position, NEAR_SMART_OBJECT_DISTANCE),
        at_quiet_spot: near(blackboard.wander_spot, NEAR_DISTANCE),
        has_social_partner: blackboard.social.partner.is_some(),
    }
}

fn build_plan(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    let Some(goal) = worker.goap.current_goal else {
        return;
    };
    validate_held_references(worker, ctx);
    let mut state = sense_world_state(worker, ctx);
    let start_state = state;
    let plan = plan_for_goal(goal, &mut state, worker, ctx);

    let chain_start = WorldState {
        has_social_partner: state.has_social_partner,
        ..start_state
    };
    if let Some(step) = first_unsatisfied_step(chain_start, &plan) {
        debug!(
            actor = ctx.actor_id.0,
            goal = goal.as_token(),
            step = step.name(),
            "plan_chain_unsatisfied"
        );
    }

    ctx.events.emit(GameplayEvent::PlanBuilt {
        actor_id: ctx.actor_id,
        goal,
        steps: plan.len(),
    });
    debug!(
        actor = ctx.actor_id.0,
        goal = goal.as_token(),
        steps = plan.len(),
        cost = plan_cost(&plan),
        "plan_built"
    );
    worker.goap.install_plan(plan);
}

fn plan_for_goal(
    goal: Goal,
    state: &mut WorldState,
    worker: &mut Worker,
    ctx: &mut ActionContext<'_>,
) -> Vec<ActionKind> {
    match goal {
        Goal::RecoverStamina => {
            with_leading_step(!state.at_home, ActionKind::GoHome, &[ActionKind::Rest])
        }
        Goal::Farm => with_leading_step(
            !state.has_farm_target,
            ActionKind::FindFarm,
            &[ActionKind::GoToFarm, ActionKind::Farm],
        ),
        Goal::Pray => {
            if ctx.rng.random_bool(PRAY_AT_SHRINE_CHANCE) {
                smart_object_plan(InteractionType::Worship, state, worker, ctx)
            } else {
                with_leading_step(
                    !state.at_quiet_spot,
                    ActionKind::GoToRandomSpot,
                    &[ActionKind::Pray],
                )
            }
        }
        Goal::Meditate => {
            with_leading_step(!state.at_home, ActionKind::GoHome, &[ActionKind::Meditate])
        }
        Goal::KillBoredom => {
            let link = worker.goap.blackboard.social;
            if link.partner.is_some() && link.accepted {
                vec![ActionKind::ChatWithOther]
            } else if ctx.rng.random_bool(KILL_BOREDOM_SMART_OBJECT_CHANCE) {
                smart_object_plan(InteractionType::Entertainment, state, worker, ctx)
            } else if link.partner.is_some() || send_social_request(worker, ctx) {
                state.has_social_partner = true;
                vec![ActionKind::ChatWithOther]
            } else {
                with_leading_step(
                    !state.at_quiet_spot,
                    ActionKind::GoToRandomSpot,
                    &[ActionKind::Wander],
                )
            }
        }
    }
}

fn with_leading_step(include: bool, leading: ActionKind, rest: &[ActionKind]) -> Vec<ActionKind> {
    let mut plan = Vec::with_capacity(rest.len() + 1);
    if include {
        plan.push(leading);
    }
    plan.extend_from_slice(rest);
    plan
}

fn smart_object_plan(
    interaction: InteractionType,
    state: &mut WorldState,
    worker: &mut Worker,
    ctx: &mut ActionContext<'_>,
) -> Vec<ActionKind> {
    // A slot held on a different kind of object is useless for this goal.
    if let Some(claim) = worker.goap.blackboard.smart_object {
        let matches = ctx
            .smart_objects
            .get(&claim.object_id)
            .is_some_and(|object| object.interaction == interaction);
        if !matches {
            if let Some(object) = ctx.smart_objects.get_mut(&claim.object_id) {
                object.release_slot(claim.slot_index, ctx.actor_id);
            }
            worker.goap.blackboard.smart_object = None;
            state.has_smart_object_target = false;
            state.at_smart_object = false;
        }
    }
    with_leading_step(
        !state.has_smart_object_target,
        ActionKind::FindSmartObject(interaction),
        &[ActionKind::GoToSmartObject, ActionKind::UseSmartObject],
    )
}

/// Asks the nearest free worker in range to chat. The request is only a
/// proposal until the target accepts it on its own turn.
fn send_social_request(worker: &mut Worker, ctx: &mut ActionContext<'_>) -> bool {
    let Some(position) = ctx.actor_position() else {
        return false;
    };
    let actor_id = ctx.actor_id;
    let radius_sq = SOCIAL_REQUEST_RADIUS * SOCIAL_REQUEST_RADIUS;

    let mut nearest: Option<(f32, EntityId)> = None;
    for (other_id, other) in ctx.workers.iter() {
        let theirs = other.goap.blackboard.social;
        if theirs.partner.is_some() || theirs.incoming_request.is_some() {
            continue;
        }
        let Some(other_position) = ctx.world.position_of(*other_id) else {
            continue;
        };
        let distance_sq = position.distance_sq(other_position);
        if distance_sq > radius_sq {
            continue;
        }
        if nearest.map_or(true, |(best_sq, _)| distance_sq < best_sq) {
            nearest = Some((distance_sq, *other_id));
        }
    }

    let Some((_, partner_id)) = nearest else {
        return false;
    };
    let Some(partner) = ctx.workers.get_mut(&partner_id) else {
        return false;
    };
    partner.goap.blackboard.social.incoming_request = Some(actor_id);
    let link = &mut worker.goap.blackboard.social;
    link.partner = Some(partner_id);
    link.accepted = false;
    link.wait_elapsed = 0.0;
    debug!(actor = actor_id.0, partner = partner_id.0, "social_request_sent");
    true
}

fn held_claim_went_stale(worker: &Worker, ctx: &ActionContext<'_>) -> bool {
    let blackboard = &worker.goap.blackboard;
    match worker.goap.active_action() {
        Some(ActionKind::GoToFarm | ActionKind::Farm) => blackboard
            .farm_target
            .map_or(true, |field_id| {
                !farm_claim_intact(ctx.actor_id, field_id, ctx.wheat_fields, ctx.world)
            }),
        Some(ActionKind::GoToSmartObject | ActionKind::UseSmartObject) => blackboard
            .smart_object
            .map_or(true, |claim| {
                !smart_object_claim_intact(ctx.actor_id, claim, ctx.smart_objects, ctx.world)
            }),
        _ => false,
    }
}

fn abort_stale_plan(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    validate_held_references(worker, ctx);
    worker.goap.abort_plan();
    worker.motion.stop();
    ctx.events.emit(GameplayEvent::PlanAborted {
        actor_id: ctx.actor_id,
    });
    debug!(actor = ctx.actor_id.0, "plan_aborted_stale_claim");
}

fn execute_active_action(worker: &mut Worker, ctx: &mut ActionContext<'_>) {
    let Some(action) = worker.goap.active_action() else {
        return;
    };
    if !action.execute(worker, ctx) {
        return;
    }
    ctx.events.emit(GameplayEvent::ActionCompleted {
        actor_id: ctx.actor_id,
        action,
    });
    worker.goap.advance();
    if worker.goap.current_goal.is_none() {
        ctx.events.emit(GameplayEvent::GoalChanged {
            actor_id: ctx.actor_id,
            goal: None,
        });
        debug!(actor = ctx.actor_id.0, "goal_completed");
    }
}

#[cfg(test)]
mod planner_tests {
    use super::*;
    use crate::app::gameplay::nav::GridPoint;
    use crate::app::gameplay::test_support::Fixture;
    use crate::app::gameplay::types::{AdvertisedEffects, Stat};

    #[test]
    fn fresh_worker_selects_farm_and_builds_full_farm_template() {
        let mut fixture = Fixture::new();
        fixture.spawn_field(GridPoint::new(10, 10));
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));

        fixture.run_update(worker_id);

        let goap = &fixture.worker(worker_id).goap;
        assert_eq!(goap.current_goal, Some(Goal::Farm));
        assert_eq!(
            goap.plan,
            vec![ActionKind::FindFarm, ActionKind::GoToFarm, ActionKind::Farm]
        );
        // FindFarm ran and completed on the same tick.
        assert_eq!(goap.current_action_index, 1);
        assert!(goap.blackboard.farm_target.is_some());
    }

    #[test]
    fn recover_stamina_skips_go_home_when_already_home() {
        let mut fixture = Fixture::new();
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
        let home = fixture.world.position_of(worker_id).expect("position");
        {
            let worker = fixture.worker_mut(worker_id);
            worker.goap.blackboard.home = Some(home);
            worker.stats.stamina = Stat::new(0.0, 10.0);
        }

        fixture.run_update(worker_id);

        let goap = &fixture.worker(worker_id).goap;
        assert_eq!(goap.current_goal, Some(Goal::RecoverStamina));
        assert_eq!(goap.plan, vec![ActionKind::Rest]);
    }

    #[test]
    fn stamina_interrupt_releases_claims_and_switches_goal_within_one_tick() {
        let mut fixture = Fixture::new();
        let field_id = fixture.spawn_field(GridPoint::new(10, 10));
        let object_id = fixture.spawn_smart_object(
            GridPoint::new(4, 4),
            InteractionType::Entertainment,
            AdvertisedEffects {
                boredom: -40.0,
                ..AdvertisedEffects::default()
            },
            8.0,
            2,
        );
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
        fixture.run_update(worker_id);
        assert_eq!(fixture.wheat_fields[&field_id].claimed_by, Some(worker_id));
        fixture.claim_slot(worker_id, object_id, 1);

        fixture.worker_mut(worker_id).stats.stamina.set(0.0);
        fixture.run_update(worker_id);

        let worker = fixture.worker(worker_id);
        assert_eq!(worker.goap.current_goal, Some(Goal::RecoverStamina));
        assert_eq!(worker.goap.blackboard.farm_target, None);
        assert_eq!(worker.goap.blackboard.smart_object, None);
        assert_eq!(fixture.wheat_fields[&field_id].claimed_by, None);
        assert_eq!(fixture.smart_objects[&object_id].occupant_count(), 0);
        assert!(matches!(
            worker.goap.plan.first(),
            Some(ActionKind::GoHome | ActionKind::Rest)
        ));
    }

    #[test]
    fn stolen_farm_claim_aborts_plan_and_skips_execution() {
        let mut fixture = Fixture::new();
        let field_id = fixture.spawn_field(GridPoint::new(10, 10));
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
        let thief = fixture.spawn_worker(GridPoint::new(20, 30));
        fixture.run_update(worker_id);
        assert_eq!(
            fixture.worker(worker_id).goap.active_action(),
            Some(ActionKind::GoToFarm)
        );

        fixture.wheat_fields.get_mut(&field_id).expect("field").claimed_by = Some(thief);
        fixture.run_update(worker_id);

        let worker = fixture.worker(worker_id);
        assert!(worker.goap.plan.is_empty());
        assert_eq!(worker.goap.current_action_index, 0);
        assert_eq!(worker.goap.blackboard.farm_target, None);
        assert_eq!(worker.goap.current_goal, Some(Goal::Farm));
        assert!(worker.motion.is_idle());
    }

    #[test]
    fn bored_worker_accepts_pending_request_when_goal_free() {
        let mut fixture = Fixture::new();
        let initiator = fixture.spawn_worker(GridPoint::new(2, 2));
        let responder = fixture.spawn_worker(GridPoint::new(4, 2));
        fixture.worker_mut(initiator).goap.blackboard.social.partner = Some(responder);
        fixture.worker_mut(responder).goap.blackboard.social.incoming_request = Some(initiator);
        fixture.worker_mut(responder).stats.boredom.set(45.0);

        fixture.run_update(responder);

        let responder_worker = fixture.worker(responder);
        assert_eq!(responder_worker.goap.current_goal, Some(Goal::KillBoredom));
        assert_eq!(responder_worker.goap.plan, vec![ActionKind::ChatWithOther]);
        assert_eq!(responder_worker.goap.blackboard.social.partner, Some(initiator));
        assert!(responder_worker.goap.blackboard.social.accepted);
        assert_eq!(responder_worker.goap.blackboard.social.incoming_request, None);
        assert!(fixture.worker(initiator).goap.blackboard.social.accepted);
    }

    #[test]
    fn worker_below_boredom_threshold_leaves_request_pending() {
        let mut fixture = Fixture::new();
        fixture.spawn_field(GridPoint::new(10, 10));
        let initiator = fixture.spawn_worker(GridPoint::new(2, 2));
        let responder = fixture.spawn_worker(GridPoint::new(4, 2));
        fixture.worker_mut(initiator).goap.blackboard.social.partner = Some(responder);
        fixture.worker_mut(responder).goap.blackboard.social.incoming_request = Some(initiator);
        fixture.worker_mut(responder).stats.boredom.set(10.0);

        fixture.run_update(responder);

        let responder_worker = fixture.worker(responder);
        assert_eq!(responder_worker.goap.current_goal, Some(Goal::Farm));
        assert_eq!(responder_worker.goap.blackboard.social.partner, None);
        assert_eq!(
            responder_worker.goap.blackboard.social.incoming_request,
            Some(initiator)
        );
    }

    #[test]
    fn accepted_chat_zeroes_boredom_and_clears_both_sides() {
        let mut fixture = Fixture::new();
        let initiator = fixture.spawn_worker(GridPoint::new(2, 2));
        let responder = fixture.spawn_worker(GridPoint::new(4, 2));
        fixture.worker_mut(initiator).goap.blackboard.social.partner = Some(responder);
        fixture.worker_mut(initiator).goap.current_goal = Some(Goal::KillBoredom);
        fixture.worker_mut(initiator).goap.install_plan(vec![ActionKind::ChatWithOther]);
        fixture.worker_mut(initiator).stats.boredom.set(85.0);
        fixture.worker_mut(responder).goap.blackboard.social.incoming_request = Some(initiator);
        fixture.worker_mut(responder).stats.boredom.set(45.0);

        fixture.dt_seconds = 0.5;
        for _ in 0..40 {
            fixture.run_update(initiator);
            fixture.run_update(responder);
            if fixture.worker(initiator).goap.current_goal != Some(Goal::KillBoredom) {
                break;
            }
        }

        for worker_id in [initiator, responder] {
            let worker = fixture.worker(worker_id);
            assert!(worker.stats.boredom.current < 1.0, "boredom stayed high");
            assert_eq!(worker.goap.blackboard.social.partner, None);
            assert!(!worker.goap.blackboard.social.accepted);
        }
    }

    #[test]
    fn unanswered_request_times_out() {
        let mut fixture = Fixture::new();
        let initiator = fixture.spawn_worker(GridPoint::new(2, 2));
        let responder = fixture.spawn_worker(GridPoint::new(4, 2));
        fixture.worker_mut(initiator).goap.blackboard.social.partner = Some(responder);
        fixture.worker_mut(initiator).goap.current_goal = Some(Goal::KillBoredom);
        fixture.worker_mut(initiator).goap.install_plan(vec![ActionKind::ChatWithOther]);
        fixture.worker_mut(responder).goap.blackboard.social.incoming_request = Some(initiator);

        fixture.dt_seconds = 1.0;
        let mut ticks = 0;
        while fixture.worker(initiator).goap.blackboard.social.partner.is_some() {
            fixture.run_update(initiator);
            ticks += 1;
            assert!(ticks <= 6, "request never timed out");
        }
        assert_eq!(
            fixture.worker(responder).goap.blackboard.social.incoming_request,
            None
        );
    }

    #[test]
    fn insane_worker_picks_among_pray_meditate_and_farm() {
        let mut fixture = Fixture::new();
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
        fixture.worker_mut(worker_id).stats.sanity.set(0.0);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(select_goal(&fixture.workers[&worker_id], &mut fixture.rng).as_token());
        }
        assert_eq!(seen, ["Pray", "Meditate", "Farm"].into_iter().collect());
    }

    #[test]
    fn very_bored_worker_selects_kill_boredom() {
        let mut fixture = Fixture::new();
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
        fixture.worker_mut(worker_id).stats.boredom.set(81.0);
        assert_eq!(
            select_goal(&fixture.workers[&worker_id], &mut fixture.rng),
            Goal::KillBoredom
        );
        fixture.worker_mut(worker_id).stats.boredom.set(80.0);
        assert_eq!(
            select_goal(&fixture.workers[&worker_id], &mut fixture.rng),
            Goal::Farm
        );
    }

    #[test]
    fn kill_boredom_plans_use_one_of_the_three_templates() {
        for seed in 0..32 {
            let mut fixture = Fixture::with_seed(seed);
            fixture.spawn_smart_object(
                GridPoint::new(8, 8),
                InteractionType::Entertainment,
                AdvertisedEffects {
                    boredom: -40.0,
                    ..AdvertisedEffects::default()
                },
                8.0,
                3,
            );
            let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
            fixture.spawn_worker(GridPoint::new(3, 2));
            fixture.worker_mut(worker_id).stats.boredom.set(95.0);

            fixture.run_update(worker_id);

            let plan = fixture.worker(worker_id).goap.plan.clone();
            let allowed = [
                vec![
                    ActionKind::FindSmartObject(InteractionType::Entertainment),
                    ActionKind::GoToSmartObject,
                    ActionKind::UseSmartObject,
                ],
                vec![ActionKind::ChatWithOther],
                vec![ActionKind::GoToRandomSpot, ActionKind::Wander],
            ];
            assert!(allowed.contains(&plan), "seed {seed} built {plan:?}");
        }
    }

    #[test]
    fn same_seed_builds_same_plans() {
        let build = |seed: u64| {
            let mut fixture = Fixture::with_seed(seed);
            let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
            fixture.worker_mut(worker_id).stats.sanity.set(0.0);
            fixture.run_update(worker_id);
            fixture.worker(worker_id).goap.plan.clone()
        };
        for seed in [1, 7, 42] {
            assert_eq!(build(seed), build(seed));
        }
    }

    #[test]
    fn cursor_only_moves_forward_until_plan_ends() {
        let mut fixture = Fixture::new();
        fixture.spawn_field(GridPoint::new(5, 2));
        let worker_id = fixture.spawn_worker(GridPoint::new(2, 2));
        fixture.dt_seconds = 0.1;

        let mut last_index = 0;
        let mut last_plan = Vec::new();
        for _ in 0..400 {
            fixture.run_update(worker_id);
            fixture.step_movement();
            let goap = &fixture.worker(worker_id).goap;
            if goap.plan == last_plan && last_index < last_plan.len() {
                assert!(goap.current_action_index >= last_index);
            }
            assert!(goap.current_action_index <= goap.plan.len());
            last_index = goap.current_action_index;
            last_plan = goap.plan.clone();
        }
    }
}
