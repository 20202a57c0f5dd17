//! Specialization ("class") data records.
//!
//! Each faction fields eight specializations. Rather than one override
//! procedure per class, every class is a plain data record — engagement
//! range, costs, capability flags, tier, population cap — interpreted by the
//! generic combat/upgrade engines. Only genuinely unique behaviors (the
//! sacrifice-on-contact bomber, the stealth ambusher) get a narrow hook via
//! capability flags.

use crate::state::types::{Capabilities, Faction};

/// The sixteen specializations, eight per faction.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ClassId {
    // ---- Human classes ----
    Grunt,
    ShockTrooper,
    Biotech,
    HeavyTrooper,
    Commando,
    Exterminator,
    Engineer,
    Mech,
    // ---- Alien classes ----
    Hatchling,
    Drone,
    Wraith,
    Kamikaze,
    Stinger,
    Guardian,
    Breeder,
    Stalker,
}

/// Static per-class metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassInfo {
    pub faction: Faction,
    /// Preferred combat engagement range in world units.
    pub preferred_range: f32,
    /// Resource cost to adopt this class (credits for humans, evos for aliens).
    pub cost: u32,
    pub max_health: u32,
    /// Rough power band: 1 basic/builder, 2 mid, 3 advanced.
    pub tier: u8,
    pub capabilities: Capabilities,
    /// Team-wide cap enforced by the upgrade engine.
    pub population_cap: u8,
    /// Whether this class initiates combat on sight. Support classes flee
    /// instead of engaging.
    pub initiates_combat: bool,
}

const NO_CAPS: Capabilities = Capabilities::empty();

const CLASS_TABLE: [(ClassId, ClassInfo); 16] = [
    (
        ClassId::Grunt,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 400.0,
            cost: 0,
            max_health: 100,
            tier: 1,
            capabilities: NO_CAPS,
            population_cap: 16,
            initiates_combat: true,
        },
    ),
    (
        ClassId::ShockTrooper,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 250.0,
            cost: 1,
            max_health: 125,
            tier: 2,
            capabilities: NO_CAPS,
            population_cap: 3,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Biotech,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 350.0,
            cost: 2,
            max_health: 100,
            tier: 1,
            capabilities: NO_CAPS,
            population_cap: 2,
            initiates_combat: false,
        },
    ),
    (
        ClassId::HeavyTrooper,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 500.0,
            cost: 3,
            max_health: 150,
            tier: 2,
            capabilities: NO_CAPS,
            population_cap: 3,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Commando,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 300.0,
            cost: 3,
            max_health: 110,
            tier: 2,
            capabilities: NO_CAPS,
            population_cap: 3,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Exterminator,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 450.0,
            cost: 5,
            max_health: 175,
            tier: 3,
            capabilities: NO_CAPS,
            population_cap: 2,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Engineer,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 200.0,
            cost: 1,
            max_health: 90,
            tier: 1,
            capabilities: Capabilities::BUILD,
            population_cap: 2,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Mech,
        ClassInfo {
            faction: Faction::Human,
            preferred_range: 600.0,
            cost: 6,
            max_health: 250,
            tier: 3,
            capabilities: NO_CAPS,
            population_cap: 1,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Hatchling,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 60.0,
            cost: 0,
            max_health: 50,
            tier: 1,
            capabilities: Capabilities::WALL_CLIMB,
            population_cap: 16,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Drone,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 80.0,
            cost: 1,
            max_health: 90,
            tier: 2,
            capabilities: Capabilities::WALL_CLIMB,
            population_cap: 16,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Wraith,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 300.0,
            cost: 2,
            max_health: 100,
            tier: 2,
            capabilities: Capabilities::FLY,
            population_cap: 3,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Kamikaze,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 40.0,
            cost: 2,
            max_health: 80,
            tier: 2,
            capabilities: Capabilities::WALL_CLIMB,
            population_cap: 3,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Stinger,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 200.0,
            cost: 3,
            max_health: 130,
            tier: 2,
            capabilities: Capabilities::WALL_CLIMB,
            population_cap: 3,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Guardian,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 100.0,
            cost: 5,
            max_health: 220,
            tier: 3,
            capabilities: Capabilities::STEALTH,
            population_cap: 2,
            initiates_combat: true,
        },
    ),
    (
        ClassId::Breeder,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 80.0,
            cost: 1,
            max_health: 80,
            tier: 1,
            capabilities: Capabilities::BUILD,
            population_cap: 2,
            initiates_combat: false,
        },
    ),
    (
        ClassId::Stalker,
        ClassInfo {
            faction: Faction::Alien,
            preferred_range: 120.0,
            cost: 6,
            max_health: 300,
            tier: 3,
            capabilities: NO_CAPS,
            population_cap: 2,
            initiates_combat: true,
        },
    ),
];

impl ClassId {
    pub fn info(self) -> &'static ClassInfo {
        // Table order matches the enum; the test below pins it.
        &CLASS_TABLE[self as usize].1
    }

    /// The free starting class for a faction.
    pub const fn starter(faction: Faction) -> ClassId {
        match faction {
            Faction::Human => ClassId::Grunt,
            Faction::Alien => ClassId::Hatchling,
        }
    }

    pub fn faction(self) -> Faction {
        self.info().faction
    }

    pub fn capabilities(self) -> Capabilities {
        self.info().capabilities
    }

    pub fn can_build(self) -> bool {
        self.capabilities().contains(Capabilities::BUILD)
    }

    pub fn can_wall_climb(self) -> bool {
        self.capabilities().contains(Capabilities::WALL_CLIMB)
    }

    pub fn can_fly(self) -> bool {
        self.capabilities().contains(Capabilities::FLY)
    }

    pub fn is_stealth(self) -> bool {
        self.capabilities().contains(Capabilities::STEALTH)
    }

    /// Support classes never initiate combat; they disengage on contact.
    pub fn initiates_combat(self) -> bool {
        self.info().initiates_combat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn table_order_matches_enum_discriminants() {
        for (i, class) in ClassId::iter().enumerate() {
            assert_eq!(CLASS_TABLE[i].0, class, "table misordered at {i}");
        }
    }

    #[test]
    fn eight_classes_per_faction() {
        let humans = ClassId::iter()
            .filter(|c| c.faction() == Faction::Human)
            .count();
        assert_eq!(humans, 8);
    }

    #[test]
    fn exactly_one_builder_class_per_faction() {
        for faction in [Faction::Human, Faction::Alien] {
            let builders = ClassId::iter()
                .filter(|c| c.faction() == faction && c.can_build())
                .count();
            assert_eq!(builders, 1);
        }
    }

    #[test]
    fn starters_are_free() {
        assert_eq!(ClassId::starter(Faction::Human).info().cost, 0);
        assert_eq!(ClassId::starter(Faction::Alien).info().cost, 0);
    }

    #[test]
    fn support_classes_do_not_initiate_combat() {
        assert!(!ClassId::Biotech.initiates_combat());
        assert!(!ClassId::Breeder.initiates_combat());
        assert!(ClassId::Stalker.initiates_combat());
    }
}
