use std::collections::VecDeque;

use engine::{EntityId, Vec2};
use serde::{Deserialize, Serialize};

use super::goap::GoapComponent;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct Stat {
    pub(crate) current: f32,
    pub(crate) max: f32,
}

impl Stat {
    pub(crate) fn new(current: f32, max: f32) -> Self {
        Self {
            current: current.clamp(0.0, max),
            max,
        }
    }

    pub(crate) fn add(&mut self, delta: f32) {
        self.current = (self.current + delta).clamp(0.0, self.max);
    }

    pub(crate) fn set(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.max);
    }

    pub(crate) fn is_full(&self) -> bool {
        self.current >= self.max
    }

    pub(crate) fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum StatKind {
    Stamina,
    Sanity,
    Corruption,
    Boredom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct StatBlock {
    pub(crate) stamina: Stat,
    pub(crate) sanity: Stat,
    pub(crate) corruption: Stat,
    pub(crate) boredom: Stat,
    pub(crate) satiety: Stat,
}

impl StatBlock {
    pub(crate) fn get_mut(&mut self, kind: StatKind) -> &mut Stat {
        match kind {
            StatKind::Stamina => &mut self.stamina,
            StatKind::Sanity => &mut self.sanity,
            StatKind::Corruption => &mut self.corruption,
            StatKind::Boredom => &mut self.boredom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    /// Screen coordinates: +y points down. `None` when `from == to`.
    pub(crate) fn toward(from: Vec2, to: Vec2) -> Option<Facing> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        if dx.abs() > dy.abs() {
            Some(if dx > 0.0 { Facing::Right } else { Facing::Left })
        } else {
            Some(if dy > 0.0 { Facing::Down } else { Facing::Up })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum AnimationTag {
    Idle,
    Walk,
    Work,
    Rest,
    Pray,
    Meditate,
    Talk,
    Warm,
    Worship,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MoveDirective {
    pub(crate) target: Vec2,
    pub(crate) speed: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Motion {
    pub(crate) facing: Facing,
    pub(crate) animation: AnimationTag,
    /// World units per second.
    pub(crate) speed: f32,
    pub(crate) path: VecDeque<Vec2>,
    pub(crate) directive: Option<MoveDirective>,
}

impl Motion {
    pub(crate) fn new(speed: f32) -> Self {
        Self {
            facing: Facing::Down,
            animation: AnimationTag::Idle,
            speed,
            path: VecDeque::new(),
            directive: None,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.directive.is_none() && self.path.is_empty()
    }

    pub(crate) fn stop(&mut self) {
        self.path.clear();
        self.directive = None;
    }

    /// Replaces any queued route; the executor picks up the first waypoint
    /// on its next pass.
    pub(crate) fn follow(&mut self, waypoints: Vec<Vec2>) {
        self.path = waypoints.into();
        self.directive = None;
    }

    pub(crate) fn face_toward(&mut self, from: Vec2, to: Vec2) {
        if let Some(facing) = Facing::toward(from, to) {
            self.facing = facing;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WheatField {
    pub(crate) growth_stage: u8,
    pub(crate) claimed_by: Option<EntityId>,
}

impl WheatField {
    pub(crate) const MAX_GROWTH_STAGE: u8 = 4;

    pub(crate) fn new(growth_stage: u8) -> Self {
        Self {
            growth_stage: growth_stage.clamp(1, Self::MAX_GROWTH_STAGE),
            claimed_by: None,
        }
    }

    pub(crate) fn advance_growth(&mut self) {
        self.growth_stage = if self.growth_stage >= Self::MAX_GROWTH_STAGE {
            1
        } else {
            self.growth_stage + 1
        };
    }

    pub(crate) fn is_claimable_by(&self, actor_id: EntityId) -> bool {
        self.claimed_by.map_or(true, |owner| owner == actor_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct House {
    pub(crate) owner: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum InteractionType {
    Worship,
    Entertainment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub(crate) struct AdvertisedEffects {
    pub(crate) boredom: f32,
    pub(crate) sanity: f32,
    pub(crate) corruption: f32,
    pub(crate) stamina: f32,
}

impl AdvertisedEffects {
    pub(crate) fn entries(&self) -> [(StatKind, f32); 4] {
        [
            (StatKind::Boredom, self.boredom),
            (StatKind::Sanity, self.sanity),
            (StatKind::Corruption, self.corruption),
            (StatKind::Stamina, self.stamina),
        ]
    }

    pub(crate) fn total_magnitude(&self) -> f32 {
        self.entries().iter().map(|(_, delta)| delta.abs()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SmartObjectSlot {
    pub(crate) local_offset: Vec2,
    pub(crate) claimed_by: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SmartObject {
    pub(crate) interaction: InteractionType,
    pub(crate) effects: AdvertisedEffects,
    pub(crate) duration_seconds: f32,
    pub(crate) animation: AnimationTag,
    pub(crate) face_object: bool,
    pub(crate) slots: Vec<SmartObjectSlot>,
}

impl SmartObject {
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.claimed_by.is_none())
    }

    pub(crate) fn slot_held_by(&self, slot_index: usize, actor_id: EntityId) -> bool {
        self.slots
            .get(slot_index)
            .is_some_and(|slot| slot.claimed_by == Some(actor_id))
    }

    pub(crate) fn occupant_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.claimed_by.is_some())
            .count()
    }

    pub(crate) fn release_slot(&mut self, slot_index: usize, actor_id: EntityId) -> bool {
        match self.slots.get_mut(slot_index) {
            Some(slot) if slot.claimed_by == Some(actor_id) => {
                slot.claimed_by = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DebuffKind {
    Dread,
    Fatigue,
}

impl DebuffKind {
    pub(crate) fn icon(self) -> &'static str {
        match self {
            Self::Dread => "icons/dread",
            Self::Fatigue => "icons/fatigue",
        }
    }

    /// Stat drained once per elapsed second while the debuff is active.
    pub(crate) fn periodic_drain(self) -> (StatKind, f32) {
        match self {
            Self::Dread => (StatKind::Sanity, -2.0),
            Self::Fatigue => (StatKind::Stamina, -0.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Debuff {
    pub(crate) kind: DebuffKind,
    pub(crate) remaining_seconds: f32,
    pub(crate) tick_accumulator: f32,
}

impl Debuff {
    pub(crate) fn new(kind: DebuffKind, duration_seconds: f32) -> Self {
        Self {
            kind,
            remaining_seconds: duration_seconds,
            tick_accumulator: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum ZoneKind {
    Whisper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Zone {
    pub(crate) kind: ZoneKind,
    pub(crate) radius: f32,
    pub(crate) remaining_seconds: f32,
    pub(crate) damage_min: f32,
    pub(crate) damage_max: f32,
    pub(crate) tick_accumulator: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Worker {
    pub(crate) stats: StatBlock,
    pub(crate) motion: Motion,
    pub(crate) goap: GoapComponent,
    pub(crate) debuffs: Vec<Debuff>,
    pub(crate) variant: u8,
}

impl Worker {
    /// Pushes a new debuff or refreshes the duration of an existing one of
    /// the same kind. Returns `true` when the debuff was newly added.
    pub(crate) fn apply_debuff(&mut self, kind: DebuffKind, duration_seconds: f32) -> bool {
        if let Some(existing) = self.debuffs.iter_mut().find(|debuff| debuff.kind == kind) {
            existing.remaining_seconds = duration_seconds;
            return false;
        }
        self.debuffs.push(Debuff::new(kind, duration_seconds));
        true
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn stat_add_clamps_to_bounds() {
        let mut stat = Stat::new(5.0, 10.0);
        stat.add(20.0);
        assert_eq!(stat.current, 10.0);
        assert!(stat.is_full());
        stat.add(-30.0);
        assert_eq!(stat.current, 0.0);
        assert!(stat.is_depleted());
    }

    #[test]
    fn growth_stage_cycles_through_one_to_four() {
        let mut field = WheatField::new(1);
        let mut seen = Vec::new();
        for _ in 0..5 {
            field.advance_growth();
            seen.push(field.growth_stage);
        }
        assert_eq!(seen, vec![2, 3, 4, 1, 2]);
    }

    #[test]
    fn facing_prefers_vertical_on_diagonal_tie() {
        let origin = Vec2::ZERO;
        assert_eq!(Facing::toward(origin, Vec2::new(3.0, 1.0)), Some(Facing::Right));
        assert_eq!(Facing::toward(origin, Vec2::new(-3.0, 1.0)), Some(Facing::Left));
        assert_eq!(Facing::toward(origin, Vec2::new(2.0, 2.0)), Some(Facing::Down));
        assert_eq!(Facing::toward(origin, Vec2::new(0.0, -1.0)), Some(Facing::Up));
        assert_eq!(Facing::toward(origin, origin), None);
    }

    #[test]
    fn advertised_magnitude_sums_absolute_deltas() {
        let effects = AdvertisedEffects {
            boredom: -40.0,
            sanity: 10.0,
            corruption: 0.0,
            stamina: -5.0,
        };
        assert_eq!(effects.total_magnitude(), 55.0);
    }
}
