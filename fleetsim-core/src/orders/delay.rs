//! How long an order takes to reach the force it is addressed to.

use crate::config::{ChannelSpec, OrderConfig};
use crate::fixed::Fixed;
use crate::movement::terrain::isqrt;
use crate::movement::{GameMap, LandTerrain, WeatherKind};
use crate::state::{ForceId, OrderId, SimHours};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommunicationMethod {
    #[default]
    Messenger,
    Courier,
    SignalFire,
    Semaphore,
    Telegraph,
    Radio,
    /// No travel time at all. For scripted orders.
    Instant,
}

impl CommunicationMethod {
    pub fn channel(self, config: &OrderConfig) -> ChannelSpec {
        let table = &config.channels;
        match self {
            CommunicationMethod::Messenger => table.messenger,
            CommunicationMethod::Courier => table.courier,
            CommunicationMethod::SignalFire => table.signal_fire,
            CommunicationMethod::Semaphore => table.semaphore,
            CommunicationMethod::Telegraph => table.telegraph,
            CommunicationMethod::Radio => table.radio,
            CommunicationMethod::Instant => table.instant,
        }
    }
}

/// Map position in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: Fixed,
    pub y: Fixed,
}

impl Position {
    pub fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    pub fn km(x: i64, y: i64) -> Self {
        Self::new(Fixed::from_int(x), Fixed::from_int(y))
    }

    pub fn distance_to(self, other: Position) -> Fixed {
        let dx = (other.x - self.x).raw().unsigned_abs();
        let dy = (other.y - self.y).raw().unsigned_abs();
        let sq = dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy));
        Fixed::from_raw(isqrt(sq).min(i64::MAX as u64) as i64)
    }

    /// Point a fraction `t` of the way towards `other`.
    pub fn lerp(self, other: Position, t: Fixed) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Anything that can say what ground lies under a point.
pub trait TerrainSampler {
    fn terrain_at(&self, at: Position) -> Option<LandTerrain>;
}

impl TerrainSampler for GameMap {
    fn terrain_at(&self, at: Position) -> Option<LandTerrain> {
        if self.is_empty() {
            return None;
        }
        Some(self.terrain_near(at.x, at.y))
    }
}

/// Communication infrastructure of the issuing realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Infrastructure {
    /// [0, 1]
    pub road_network: Fixed,
    /// [0, 1] coverage of signal towers.
    pub signal_network: Fixed,
    /// [0, 1]
    pub communication: Fixed,
}

impl Infrastructure {
    pub fn speed_bonus(&self, config: &OrderConfig) -> Fixed {
        Fixed::ONE
            + self.road_network.unit() * config.road_speed_bonus
            + self.communication.unit() * config.infrastructure_speed_bonus
    }

    /// A dense enough signal network carries what would otherwise go by
    /// messenger.
    pub fn effective_method(&self, method: CommunicationMethod, config: &OrderConfig) -> CommunicationMethod {
        if method == CommunicationMethod::Messenger
            && self.signal_network > config.signal_network_threshold
        {
            CommunicationMethod::SignalFire
        } else {
            method
        }
    }
}

pub fn terrain_delay(terrain: LandTerrain, config: &OrderConfig) -> Fixed {
    let t = &config.terrain;
    match terrain {
        LandTerrain::Plains => t.plains,
        LandTerrain::Forest => t.forest,
        LandTerrain::Hills => t.hills,
        LandTerrain::Mountains => t.mountains,
        LandTerrain::Marsh => t.marsh,
        LandTerrain::Desert => t.desert,
        LandTerrain::Water => t.water,
        LandTerrain::Snow => t.snow,
    }
}

pub fn weather_delay(weather: WeatherKind, config: &OrderConfig) -> Fixed {
    let w = &config.weather;
    match weather {
        WeatherKind::Clear => w.clear,
        WeatherKind::Rain | WeatherKind::HeavyRain => w.rain,
        WeatherKind::Stormy => w.storm,
        WeatherKind::Snow | WeatherKind::Blizzard => w.snow,
        WeatherKind::Fog => w.fog,
    }
}

/// Mean terrain multiplier over evenly spaced samples along the segment,
/// both endpoints included. Points the sampler knows nothing about are
/// skipped; with no samples at all the ground counts as open.
pub fn terrain_modifier(
    from: Position,
    to: Position,
    sampler: Option<&dyn TerrainSampler>,
    config: &OrderConfig,
) -> Fixed {
    let Some(sampler) = sampler else {
        return Fixed::ONE;
    };
    let steps = config.terrain_samples.max(2) as i64 - 1;
    let mut total = Fixed::ZERO;
    let mut samples = 0i64;
    for i in 0..=steps {
        let at = from.lerp(to, Fixed::from_ratio(i, steps));
        if let Some(terrain) = sampler.terrain_at(at) {
            total += terrain_delay(terrain, config);
            samples += 1;
        }
    }
    if samples == 0 {
        Fixed::ONE
    } else {
        total.div(Fixed::from_int(samples))
    }
}

/// Everything that shapes one order's travel time besides the endpoints.
#[derive(Clone, Copy, Default)]
pub struct DelayConditions<'a> {
    pub method: CommunicationMethod,
    pub weather: WeatherKind,
    pub infrastructure: Infrastructure,
    pub terrain: Option<&'a dyn TerrainSampler>,
}

/// Hours for an order to travel from `from` to `to`. Never below the
/// channel's minimum delay.
pub fn calculate_delay(
    from: Position,
    to: Position,
    conditions: &DelayConditions<'_>,
    config: &OrderConfig,
) -> SimHours {
    let method = conditions
        .infrastructure
        .effective_method(conditions.method, config);
    let channel = method.channel(config);
    let distance = from.distance_to(to);
    let travel = distance.div(channel.speed_kmh.max(Fixed::from_raw(1)));
    let delay = travel
        * terrain_modifier(from, to, conditions.terrain, config)
        * weather_delay(conditions.weather, config)
        * config.delay_multiplier;
    let delay = delay.div(conditions.infrastructure.speed_bonus(config));
    delay.max(channel.min_delay_hours)
}

/// An order on its way to a force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommand {
    pub order_id: OrderId,
    pub target: ForceId,
    pub sent_at: SimHours,
    pub arrival_at: SimHours,
    pub total_delay: SimHours,
    pub method: CommunicationMethod,
    pub origin: Position,
    pub destination: Position,
    pub description: String,
}

impl PendingCommand {
    pub fn has_arrived(&self, now: SimHours) -> bool {
        now >= self.arrival_at
    }

    /// Fraction of the journey covered, [0, 1].
    pub fn progress(&self, now: SimHours) -> Fixed {
        if self.total_delay <= Fixed::ZERO {
            return Fixed::ONE;
        }
        (now - self.sent_at).div(self.total_delay).unit()
    }

    pub fn remaining_hours(&self, now: SimHours) -> SimHours {
        (self.arrival_at - now).max(Fixed::ZERO)
    }
}
