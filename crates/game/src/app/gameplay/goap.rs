use engine::{EntityId, Vec2};
use serde::Serialize;

use super::actions::ActionKind;
use super::nav::GridPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum Goal {
    RecoverStamina,
    Farm,
    Pray,
    Meditate,
    KillBoredom,
}

impl Goal {
    pub(crate) fn as_token(self) -> &'static str {
        match self {
            Self::RecoverStamina => "RecoverStamina",
            Self::Farm => "Farm",
            Self::Pray => "Pray",
            Self::Meditate => "Meditate",
            Self::KillBoredom => "KillBoredom",
        }
    }
}

/// Facts sensed once per plan build. Actions read this, never the live world,
/// when checking preconditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WorldState {
    pub(crate) at_home: bool,
    pub(crate) has_farm_target: bool,
    pub(crate) at_farm: bool,
    pub(crate) has_stamina: bool,
    pub(crate) has_smart_object_target: bool,
    pub(crate) at_smart_object: bool,
    pub(crate) at_quiet_spot: bool,
    pub(crate) has_social_partner: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SmartObjectClaim {
    pub(crate) object_id: EntityId,
    pub(crate) slot_index: usize,
}

/// Handshake fields. The initiator sets `partner` and writes itself into the
/// target's `incoming_request`; the target accepts by binding `partner` back
/// and both sides flip `accepted`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SocialLink {
    pub(crate) incoming_request: Option<EntityId>,
    pub(crate) partner: Option<EntityId>,
    pub(crate) accepted: bool,
    pub(crate) wait_elapsed: f32,
}

impl SocialLink {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn drop_partner(&mut self) {
        self.partner = None;
        self.accepted = false;
        self.wait_elapsed = 0.0;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Blackboard {
    pub(crate) home: Option<Vec2>,
    pub(crate) farm_target: Option<EntityId>,
    pub(crate) smart_object: Option<SmartObjectClaim>,
    /// Doubles as the quiet spot for Pray.
    pub(crate) wander_spot: Option<Vec2>,
    pub(crate) social: SocialLink,
    pub(crate) action_elapsed: Option<f32>,
    pub(crate) nav_goal: Option<GridPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GoapComponent {
    pub(crate) goals: Vec<Goal>,
    pub(crate) current_goal: Option<Goal>,
    pub(crate) plan: Vec<ActionKind>,
    pub(crate) current_action_index: usize,
    pub(crate) blackboard: Blackboard,
}

impl GoapComponent {
    pub(crate) fn new(goals: Vec<Goal>, home: Vec2) -> Self {
        Self {
            goals,
            current_goal: None,
            plan: Vec::new(),
            current_action_index: 0,
            blackboard: Blackboard {
                home: Some(home),
                ..Blackboard::default()
            },
        }
    }

    /// Goal picked when no need is pressing.
    pub(crate) fn default_goal(&self) -> Goal {
        self.goals.first().copied().unwrap_or(Goal::Farm)
    }

    pub(crate) fn active_action(&self) -> Option<ActionKind> {
        self.plan.get(self.current_action_index).copied()
    }

    pub(crate) fn plan_exhausted(&self) -> bool {
        self.current_action_index >= self.plan.len()
    }

    pub(crate) fn install_plan(&mut self, plan: Vec<ActionKind>) {
        self.plan = plan;
        self.current_action_index = 0;
        self.blackboard.action_elapsed = None;
    }

    /// Moves past the active action. Finishing the last step also finishes
    /// the goal.
    pub(crate) fn advance(&mut self) {
        self.current_action_index = (self.current_action_index + 1).min(self.plan.len());
        self.blackboard.action_elapsed = None;
        if self.plan_exhausted() {
            self.current_goal = None;
        }
    }

    pub(crate) fn abort_plan(&mut self) {
        self.plan.clear();
        self.current_action_index = 0;
        self.blackboard.action_elapsed = None;
        self.blackboard.nav_goal = None;
    }

    pub(crate) fn current_action_label(&self) -> &'static str {
        self.active_action().map_or("Idle", ActionKind::name)
    }
}
