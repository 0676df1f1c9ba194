use std::collections::BTreeMap;

use engine::{EntityId, SceneWorld, Vec2};

use super::types::{AnimationTag, MoveDirective, Motion, Worker};

/// Advances every worker with a route by one tick. Only follows routes; path
/// planning happens in the action library.
pub(crate) fn run_movement(
    world: &mut SceneWorld,
    workers: &mut BTreeMap<EntityId, Worker>,
    dt_seconds: f32,
) {
    for (worker_id, worker) in workers.iter_mut() {
        let Some(entity) = world.find_entity_mut(*worker_id) else {
            continue;
        };
        step_motion(&mut entity.transform.position, &mut worker.motion, dt_seconds);
    }
}

pub(crate) fn step_motion(position: &mut Vec2, motion: &mut Motion, dt_seconds: f32) {
    if motion.directive.is_none() {
        motion.directive = pop_directive(motion);
    }
    let Some(directive) = motion.directive else {
        return;
    };

    let dx = directive.target.x - position.x;
    let dy = directive.target.y - position.y;
    let distance = (dx * dx + dy * dy).sqrt();
    let max_step = directive.speed * dt_seconds;

    if distance <= max_step || distance <= f32::EPSILON {
        *position = directive.target;
        motion.directive = pop_directive(motion);
        if motion.directive.is_none() {
            motion.animation = AnimationTag::Idle;
        }
        return;
    }

    motion.face_toward(*position, directive.target);
    let ratio = max_step / distance;
    position.x += dx * ratio;
    position.y += dy * ratio;
    motion.animation = AnimationTag::Walk;
}

fn pop_directive(motion: &mut Motion) -> Option<MoveDirective> {
    motion.path.pop_front().map(|target| MoveDirective {
        target,
        speed: motion.speed,
    })
}
