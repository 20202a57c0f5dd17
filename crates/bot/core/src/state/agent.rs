//! Per-agent state: identity, FSM bookkeeping, navigation and combat
//! sub-state, resources, and memories.

use arrayvec::ArrayVec;

use super::memory::SightingLog;
use super::personality::Personality;
use super::types::{AgentId, Capabilities, EntityRef, Faction, GameTime, Vec3};
use crate::classes::ClassId;
use crate::combat::TargetPriority;
use crate::config::BotConfig;
use crate::nav::graph::NodeId;
use crate::rng::AgentRng;
use crate::team::strategy::Role;

/// High-level behavior states. Exactly one is active per agent; there is no
/// terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum AiState {
    /// No immediate task; initial state.
    Idle,
    /// Moving along a patrol route.
    Patrol,
    /// Moving toward the last known position of a remembered enemy.
    Hunt,
    /// Actively attacking a visible enemy.
    Combat,
    /// Retreating to recover.
    Flee,
    /// Holding a position or objective.
    Defend,
    /// Following and protecting a teammate.
    Escort,
    /// Constructing or repairing base structures.
    Build,
    /// Traveling to the faction's spend point to buy the next
    /// specialization.
    Upgrade,
}

/// Weapon handling sub-state within combat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum WeaponState {
    #[default]
    Idle,
    Acquire,
    Firing,
    Reloading,
    Switching,
}

/// Navigation sub-state.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NavState {
    pub current_node: Option<NodeId>,
    pub goal_node: Option<NodeId>,
    /// Planned node sequence, start → goal.
    pub path: ArrayVec<NodeId, { BotConfig::MAX_PATH_NODES }>,
    /// Index of the next path node to reach.
    pub cursor: usize,
    pub path_valid: bool,
    /// World position of the ultimate goal; steering falls back to this when
    /// no valid path exists.
    pub goal_position: Vec3,
    /// Distance at which a path node counts as reached.
    pub arrival_distance: f32,
    /// True while the agent clings to a wall or ceiling.
    pub climbing: bool,
    /// Surface normal while climbing.
    pub surface_normal: Vec3,
}

impl NavState {
    pub fn invalidate(&mut self) {
        self.path.clear();
        self.cursor = 0;
        self.path_valid = false;
        self.goal_node = None;
    }
}

/// Current target and firing bookkeeping.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatState {
    pub target: Option<EntityRef>,
    /// Which priority tier selected the current target.
    pub target_priority: TargetPriority,
    pub last_known_position: Vec3,
    pub last_seen: GameTime,
    pub target_visible: bool,
    pub target_distance: f32,
    pub weapon: WeaponState,
    /// Earliest time the agent may fire again. Early requests are dropped,
    /// never queued.
    pub next_fire: GameTime,
    /// Current positional aim offset, recomputed per aim update.
    pub aim_error: f32,
    /// Preferred engagement range from the specialization record.
    pub engagement_range: f32,
    /// Approach through cover/climb routes when possible.
    pub prefer_cover: bool,
    /// Hold at maximum effective range instead of closing.
    pub max_range_engage: bool,
}

impl Default for CombatState {
    fn default() -> Self {
        Self {
            target: None,
            target_priority: TargetPriority::Soldier,
            last_known_position: Vec3::ZERO,
            last_seen: GameTime::ZERO,
            target_visible: false,
            target_distance: 0.0,
            weapon: WeaponState::Idle,
            next_fire: GameTime::ZERO,
            aim_error: 0.0,
            engagement_range: 0.0,
            prefer_cover: false,
            max_range_engage: false,
        }
    }
}

impl CombatState {
    pub fn drop_target(&mut self) {
        self.target = None;
        self.target_visible = false;
        self.weapon = WeaponState::Idle;
    }
}

/// Complete state of one autonomous agent. A slot in the arena exclusively
/// owns this; other agents refer to it only through [`AgentId`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentState {
    // ---- identity ----
    pub id: AgentId,
    pub name: String,
    /// The host entity this agent drives.
    pub entity: EntityRef,
    pub faction: Faction,
    pub class: ClassId,
    /// 0.0 (novice) to 1.0 (expert).
    pub skill: f32,
    pub personality: Personality,
    pub rng: AgentRng,

    // ---- state machine ----
    pub state: AiState,
    pub prev_state: AiState,
    pub state_entered: GameTime,
    /// Set while performing an irrevocable action (e.g. finishing a
    /// critical structure); suppresses combat interrupts.
    pub critical_action: bool,

    // ---- sub-state ----
    pub nav: NavState,
    pub combat: CombatState,

    // ---- resources ----
    /// Human currency, earned via kills/objectives.
    pub credits: u32,
    /// Alien currency, earned via kills/damage.
    pub evos: u32,

    // ---- memory ----
    pub enemy_memory: SightingLog<{ BotConfig::MAX_REMEMBERED_ENEMIES }>,
    pub team_memory: SightingLog<{ BotConfig::MAX_REMEMBERED_TEAMMATES }>,

    // ---- timing ----
    pub next_think: GameTime,
    pub think_interval: f32,
    /// Aim/decision delay in seconds, derived from skill.
    pub reaction_time: f32,

    // ---- team layer ----
    pub role: Role,
    /// Teammate currently escorted, revalidated on every use.
    pub escort_target: Option<AgentId>,

    // ---- progression ----
    pub frags: u32,
    pub upgrades: u32,
}

impl AgentState {
    /// Transitions the state machine.
    ///
    /// Same-state transitions are rejected as no-ops so `prev_state` and the
    /// entry timestamp always describe a real transition. Previous-state and
    /// entry-time update together, atomically from the caller's view.
    pub fn set_state(&mut self, new_state: AiState, now: GameTime) -> bool {
        if self.state == new_state {
            return false;
        }
        self.prev_state = self.state;
        self.state = new_state;
        self.state_entered = now;
        true
    }

    /// Seconds spent in the current state.
    pub fn state_age(&self, now: GameTime) -> f32 {
        now.since(self.state_entered)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.class.capabilities()
    }

    pub fn can_wall_climb(&self) -> bool {
        self.class.can_wall_climb()
    }

    pub fn can_fly(&self) -> bool {
        self.class.can_fly()
    }

    pub fn can_build(&self) -> bool {
        self.class.can_build()
    }

    /// The faction-appropriate resource balance.
    pub fn resource(&self) -> u32 {
        match self.faction {
            Faction::Human => self.credits,
            Faction::Alien => self.evos,
        }
    }

    pub fn earn(&mut self, amount: u32) {
        match self.faction {
            Faction::Human => self.credits = self.credits.saturating_add(amount),
            Faction::Alien => self.evos = self.evos.saturating_add(amount),
        }
    }

    /// Spends from the faction currency; false (and no change) when short.
    pub fn spend(&mut self, amount: u32) -> bool {
        let balance = match self.faction {
            Faction::Human => &mut self.credits,
            Faction::Alien => &mut self.evos,
        };
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::arena::AgentArena;

    fn agent() -> AgentState {
        let mut arena = AgentArena::new();
        let id = arena
            .connect(
                EntityRef { index: 1, serial: 1 },
                Faction::Alien,
                0.5,
                7,
                0.1,
                GameTime::ZERO,
            )
            .unwrap();
        arena.get(id).unwrap().clone()
    }

    #[test]
    fn transition_records_previous_state_and_entry_time() {
        let mut a = agent();
        assert_eq!(a.state, AiState::Idle);

        assert!(a.set_state(AiState::Combat, GameTime::new(5.0)));
        assert_eq!(a.prev_state, AiState::Idle);
        assert_eq!(a.state, AiState::Combat);
        assert_eq!(a.state_entered, GameTime::new(5.0));
    }

    #[test]
    fn same_state_transition_is_a_no_op() {
        let mut a = agent();
        a.set_state(AiState::Patrol, GameTime::new(1.0));

        assert!(!a.set_state(AiState::Patrol, GameTime::new(9.0)));
        assert_eq!(a.state_entered, GameTime::new(1.0), "entry time untouched");
        assert_eq!(a.prev_state, AiState::Idle);
    }

    #[test]
    fn spend_requires_sufficient_balance() {
        let mut a = agent();
        a.earn(3);
        assert_eq!(a.resource(), 3);

        assert!(!a.spend(5));
        assert_eq!(a.resource(), 3);
        assert!(a.spend(2));
        assert_eq!(a.resource(), 1);
    }

    #[test]
    fn currencies_are_independent_per_faction() {
        let mut a = agent();
        assert_eq!(a.faction, Faction::Alien);
        a.earn(4);
        assert_eq!(a.evos, 4);
        assert_eq!(a.credits, 0);
    }
}
