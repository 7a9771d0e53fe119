use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};

pub type ForceId = u32;
pub type CommanderId = u32;
/// Economic/military actor (a realm or nation) that owns forces and a treasury.
pub type ActorId = u32;
pub type CellId = u32;
pub type OrderId = u64;

/// Simulated time in hours since the start of the game.
pub type SimHours = Fixed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    Levies,
    Spearmen,
    Crossbowmen,
    Longbowmen,
    MenAtArms,
    Pikemen,
    Arquebusiers,
    Musketeers,
    LightCavalry,
    HeavyCavalry,
    MountedArchers,
    Dragoons,
    Catapults,
    Trebuchets,
    Cannons,
    SiegeTowers,
    Galleys,
    Cogs,
    Carracks,
    Galleons,
    Frigates,
    ShipsOfTheLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    Infantry,
    Cavalry,
    Siege,
    Naval,
}

/// Base stats a freshly recruited unit of a type starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTemplate {
    pub max_strength: u32,
    pub recruitment_cost: Fixed,
    pub monthly_maintenance: Fixed,
    pub attack: Fixed,
    pub defense: Fixed,
    pub speed: Fixed,
    pub range: Fixed,
}

const fn template(
    max_strength: u32,
    recruit: i64,
    maintenance: i64,
    attack_raw: i64,
    defense_raw: i64,
    speed_raw: i64,
    range: i64,
) -> UnitTemplate {
    UnitTemplate {
        max_strength,
        recruitment_cost: Fixed::from_int(recruit),
        monthly_maintenance: Fixed::from_int(maintenance),
        attack: Fixed::from_raw(attack_raw),
        defense: Fixed::from_raw(defense_raw),
        speed: Fixed::from_raw(speed_raw),
        range: Fixed::from_int(range),
    }
}

impl UnitType {
    pub const ALL: [UnitType; 22] = [
        UnitType::Levies,
        UnitType::Spearmen,
        UnitType::Crossbowmen,
        UnitType::Longbowmen,
        UnitType::MenAtArms,
        UnitType::Pikemen,
        UnitType::Arquebusiers,
        UnitType::Musketeers,
        UnitType::LightCavalry,
        UnitType::HeavyCavalry,
        UnitType::MountedArchers,
        UnitType::Dragoons,
        UnitType::Catapults,
        UnitType::Trebuchets,
        UnitType::Cannons,
        UnitType::SiegeTowers,
        UnitType::Galleys,
        UnitType::Cogs,
        UnitType::Carracks,
        UnitType::Galleons,
        UnitType::Frigates,
        UnitType::ShipsOfTheLine,
    ];

    pub fn class(self) -> UnitClass {
        use UnitType::*;
        match self {
            Levies | Spearmen | Crossbowmen | Longbowmen | MenAtArms | Pikemen | Arquebusiers
            | Musketeers => UnitClass::Infantry,
            LightCavalry | HeavyCavalry | MountedArchers | Dragoons => UnitClass::Cavalry,
            Catapults | Trebuchets | Cannons | SiegeTowers => UnitClass::Siege,
            Galleys | Cogs | Carracks | Galleons | Frigates | ShipsOfTheLine => UnitClass::Naval,
        }
    }

    pub fn is_naval(self) -> bool {
        self.class() == UnitClass::Naval
    }

    /// Vessels that fight in a line of battle with broadside guns.
    pub fn is_line_capable(self) -> bool {
        matches!(
            self,
            UnitType::ShipsOfTheLine | UnitType::Frigates | UnitType::Galleons
        )
    }

    pub fn has_guns(self) -> bool {
        matches!(
            self,
            UnitType::ShipsOfTheLine
                | UnitType::Frigates
                | UnitType::Galleons
                | UnitType::Carracks
                | UnitType::Cogs
        )
    }

    /// Stats for a fresh unit of this type.
    pub fn template(self) -> UnitTemplate {
        use UnitType::*;
        match self {
            Levies => template(1000, 50, 5, 80_000, 60_000, 10_000, 0),
            Spearmen => template(800, 100, 10, 120_000, 100_000, 10_000, 0),
            Crossbowmen => template(600, 120, 12, 120_000, 60_000, 10_000, 100),
            Longbowmen => template(600, 140, 14, 140_000, 60_000, 10_000, 150),
            MenAtArms => template(500, 200, 20, 160_000, 140_000, 10_000, 0),
            Pikemen => template(800, 150, 15, 120_000, 160_000, 10_000, 0),
            Arquebusiers => template(600, 250, 25, 180_000, 80_000, 10_000, 150),
            Musketeers => template(600, 300, 30, 220_000, 100_000, 10_000, 200),
            LightCavalry => template(300, 250, 25, 140_000, 80_000, 25_000, 0),
            HeavyCavalry => template(200, 500, 50, 250_000, 180_000, 20_000, 0),
            MountedArchers => template(300, 300, 30, 160_000, 80_000, 25_000, 150),
            Dragoons => template(300, 400, 40, 200_000, 120_000, 20_000, 100),
            Catapults => template(100, 300, 30, 200_000, 20_000, 5_000, 300),
            Trebuchets => template(100, 400, 40, 280_000, 20_000, 5_000, 400),
            Cannons => template(100, 600, 60, 350_000, 40_000, 5_000, 500),
            SiegeTowers => template(100, 250, 25, 100_000, 120_000, 5_000, 0),
            Galleys => template(200, 150, 15, 100_000, 80_000, 15_000, 0),
            Cogs => template(500, 150, 15, 100_000, 96_000, 10_000, 0),
            Carracks => template(300, 150, 15, 130_000, 80_000, 10_000, 200),
            Galleons => template(400, 150, 15, 150_000, 80_000, 10_000, 300),
            Frigates => template(400, 300, 30, 160_000, 100_000, 14_000, 300),
            ShipsOfTheLine => template(500, 400, 50, 200_000, 120_000, 9_000, 400),
        }
    }
}

/// Discrete morale ladder. Ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MoraleState {
    Routing,
    Broken,
    Wavering,
    Steady,
    Confident,
    Fanatical,
}

impl MoraleState {
    pub fn step_up(self) -> Self {
        use MoraleState::*;
        match self {
            Routing => Broken,
            Broken => Wavering,
            Wavering => Steady,
            Steady => Confident,
            Confident | Fanatical => Fanatical,
        }
    }

    pub fn step_down(self) -> Self {
        use MoraleState::*;
        match self {
            Routing | Broken => Routing,
            Wavering => Broken,
            Steady => Wavering,
            Confident => Steady,
            Fanatical => Confident,
        }
    }

    /// Position on the ladder, 0 (routing) to 5 (fanatical).
    pub fn level(self) -> i64 {
        self as i64
    }

    /// Classify a continuous [0, 1] morale value.
    pub fn from_value(morale: Fixed) -> Self {
        if morale < Fixed::from_raw(2000) {
            MoraleState::Routing
        } else if morale < Fixed::from_raw(4000) {
            MoraleState::Broken
        } else if morale < Fixed::from_raw(6000) {
            MoraleState::Wavering
        } else if morale < Fixed::from_raw(7500) {
            MoraleState::Steady
        } else if morale < Fixed::from_raw(9000) {
            MoraleState::Confident
        } else {
            MoraleState::Fanatical
        }
    }
}

/// A homogeneous group of soldiers or vessels.
///
/// Invariant: `current_strength <= max_strength`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_type: UnitType,
    pub current_strength: u32,
    pub max_strength: u32,
    pub experience: Fixed,
    pub training: Fixed,
    pub equipment_quality: Fixed,
    pub supply_level: Fixed,
    pub ammunition: Fixed,
    pub morale: MoraleState,
    pub cohesion: Fixed,
    pub loyalty: Fixed,
    pub attack_strength: Fixed,
    pub defense_strength: Fixed,
    pub movement_speed: Fixed,
    pub range: Fixed,
    pub recruitment_cost: Fixed,
    pub monthly_maintenance: Fixed,
}

impl Unit {
    /// A full-strength unit with the type's template stats.
    pub fn new(unit_type: UnitType) -> Self {
        let t = unit_type.template();
        Self {
            unit_type,
            current_strength: t.max_strength,
            max_strength: t.max_strength,
            experience: Fixed::ZERO,
            training: Fixed::HALF,
            equipment_quality: Fixed::HALF,
            supply_level: Fixed::ONE,
            ammunition: Fixed::ONE,
            morale: MoraleState::Steady,
            cohesion: Fixed::from_raw(8000),
            loyalty: Fixed::from_raw(8000),
            attack_strength: t.attack,
            defense_strength: t.defense,
            movement_speed: t.speed,
            range: t.range,
            recruitment_cost: t.recruitment_cost,
            monthly_maintenance: t.monthly_maintenance,
        }
    }

    /// A unit of `unit_type` at exactly `strength` men, with `max_strength`
    /// raised to fit if needed.
    pub fn with_strength(unit_type: UnitType, strength: u32) -> Self {
        let mut unit = Self::new(unit_type);
        unit.max_strength = unit.max_strength.max(strength);
        unit.current_strength = strength;
        unit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommanderSpecialty {
    #[default]
    None,
    Land,
    Naval,
}

/// Leadership attributes. Skills are in [0, 1].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commander {
    pub id: CommanderId,
    pub name: String,
    pub martial: Fixed,
    pub tactical: Fixed,
    pub strategic: Fixed,
    pub logistics: Fixed,
    pub charisma: Fixed,
    pub loyalty: Fixed,
    pub experience: Fixed,
    pub command_limit: u32,
    pub specialty: CommanderSpecialty,
    pub traits: Vec<String>,
}

impl Commander {
    pub fn new(id: CommanderId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            martial: Fixed::HALF,
            tactical: Fixed::HALF,
            strategic: Fixed::HALF,
            logistics: Fixed::HALF,
            charisma: Fixed::HALF,
            loyalty: Fixed::from_raw(8000),
            experience: Fixed::ZERO,
            command_limit: 5000,
            specialty: CommanderSpecialty::None,
            traits: Vec::new(),
        }
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t == name)
    }
}

/// An army or fleet. Owns its units outright.
///
/// `total_strength` always equals the sum of the units' current strengths;
/// every mutating method in `forces` recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Force {
    pub id: ForceId,
    pub name: String,
    pub owner: ActorId,
    pub units: Vec<Unit>,
    pub total_strength: u32,
    pub organization: Fixed,
    pub morale: Fixed,
    pub cohesion: Fixed,
    pub supply_level: Fixed,
    pub fatigue: Fixed,
    pub movement_points: Fixed,
    pub max_movement_points: Fixed,
    pub in_battle: bool,
    pub besieging: bool,
    pub is_active: bool,
    pub home_location: CellId,
    pub location: CellId,
    pub commander: Option<CommanderId>,
}

impl Force {
    pub fn new(id: ForceId, name: impl Into<String>, owner: ActorId, location: CellId) -> Self {
        Self {
            id,
            name: name.into(),
            owner,
            units: Vec::new(),
            total_strength: 0,
            organization: Fixed::from_raw(8000),
            morale: Fixed::from_raw(8000),
            cohesion: Fixed::from_raw(8000),
            supply_level: Fixed::ONE,
            fatigue: Fixed::ZERO,
            movement_points: Fixed::from_int(100),
            max_movement_points: Fixed::from_int(100),
            in_battle: false,
            besieging: false,
            is_active: true,
            home_location: location,
            location,
            commander: None,
        }
    }
}
