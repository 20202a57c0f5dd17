use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

use bitflags::bitflags;

/// 3-D world position or direction in engine units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// Unit vector in the same direction, or zero for a degenerate input.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return Self::ZERO;
        }
        self * (1.0 / len)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Monotonic simulation clock in seconds.
///
/// All timeouts (memory decay, fire gates, think timers) are lazy wall-clock
/// comparisons against this value; nothing schedules callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameTime(pub f32);

impl GameTime {
    pub const ZERO: Self = Self(0.0);

    pub const fn new(seconds: f32) -> Self {
        Self(seconds)
    }

    /// Seconds elapsed since `earlier`; negative if `earlier` is in the future.
    pub fn since(self, earlier: GameTime) -> f32 {
        self.0 - earlier.0
    }
}

impl Add<f32> for GameTime {
    type Output = GameTime;
    fn add(self, rhs: f32) -> GameTime {
        GameTime(self.0 + rhs)
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}s", self.0)
    }
}

/// One of the two asymmetric teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum Faction {
    Human,
    Alien,
}

impl Faction {
    pub const fn opponent(self) -> Faction {
        match self {
            Faction::Human => Faction::Alien,
            Faction::Alien => Faction::Human,
        }
    }

    /// Slot index for per-faction tables.
    pub const fn index(self) -> usize {
        match self {
            Faction::Human => 0,
            Faction::Alien => 1,
        }
    }

    pub const fn mask(self) -> FactionMask {
        match self {
            Faction::Human => FactionMask::HUMAN,
            Faction::Alien => FactionMask::ALIEN,
        }
    }
}

bitflags! {
    /// Which factions may use a navigation node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct FactionMask: u32 {
        const HUMAN = 0x01;
        const ALIEN = 0x02;
    }
}

impl FactionMask {
    pub const ALL: Self = Self::from_bits_truncate(Self::HUMAN.bits() | Self::ALIEN.bits());
}

bitflags! {
    /// Movement and action abilities granted by an agent's specialization.
    ///
    /// These gate which graph edges the pathfinder may traverse and which
    /// behaviors the state machine may enter.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Capabilities: u32 {
        /// Wall and ceiling traversal.
        const WALL_CLIMB = 0x01;
        /// Free flight.
        const FLY = 0x02;
        /// Structure construction.
        const BUILD = 0x04;
        /// Invisibility while stationary.
        const STEALTH = 0x08;
    }
}

/// Generational handle to an agent slot.
///
/// Slots are recycled, so every cross-agent reference carries the generation
/// observed at capture time and is revalidated on each dereference. A handle
/// whose generation no longer matches the slot is treated as "not found".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentId {
    pub index: u16,
    pub generation: u32,
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Weak handle into the host entity directory.
///
/// The serial changes whenever the host recycles the underlying slot; every
/// use site goes through [`crate::env::EntityDirectory`] which reports a
/// mismatched serial as dead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityRef {
    pub index: u32,
    pub serial: u32,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}:{}", self.index, self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_degenerate_vector_is_zero() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
    }

    #[test]
    fn faction_opponent_is_involutive() {
        assert_eq!(Faction::Human.opponent(), Faction::Alien);
        assert_eq!(Faction::Alien.opponent().opponent(), Faction::Alien);
    }

    #[test]
    fn faction_mask_covers_both_teams() {
        assert!(FactionMask::ALL.contains(Faction::Human.mask()));
        assert!(FactionMask::ALL.contains(Faction::Alien.mask()));
    }
}
