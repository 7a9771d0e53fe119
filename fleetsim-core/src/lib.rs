//! # Fleetsim Core
//!
//! Deterministic military simulation: land and naval battles, blockades,
//! movement over a cell map, delayed orders, and the bridge that charges a
//! realm's treasury for its armies.
//!
//! All arithmetic is fixed-point and all randomness flows through a seeded
//! [`RandomSource`], so the same inputs always produce the same run.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ OrderRequest │────▶│ CommandDelaySys. │────▶│ ForceRegistry│
//! │  (issue)     │     │ (in transit)     │     │ (forces)     │
//! └──────────────┘     └──────────────────┘     └──────┬───────┘
//!                                                      │
//! ┌──────────────┐     ┌──────────────────┐     ┌──────▼───────┐
//! │  Observers   │◀────│ SystemScheduler  │◀────│ MilitaryEco. │
//! │  (side fx)   │     │ (events / tick)  │     │ Bridge       │
//! └──────────────┘     └──────────────────┘     └──────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Fixed`] | Deterministic fixed-point number |
//! | [`ForceRegistry`] | Every army and fleet, one lock per force |
//! | [`resolve_battle`] / [`resolve_naval_battle`] | Pure battle resolvers |
//! | [`find_path`] | Cell-map routing for a specific force |
//! | [`CommandDelaySystem`] | Orders that take time to arrive |
//! | [`MilitaryEconomicBridge`] | Upkeep, debt, crises and loot per realm |
//! | [`SystemScheduler`] | Runs systems on the main thread, the pool, or a background thread |
//! | [`SimObserver`] | Receives each tick's [`GameEvent`]s |

pub mod bounded;
pub mod bridge;
pub mod combat;
pub mod composition;
pub mod config;
pub mod error;
pub mod events;
pub mod fixed;
pub mod forces;
pub mod movement;
pub mod observer;
pub mod orders;
pub mod rng;
pub mod scheduling;
pub mod state;
pub mod testing;

pub use bounded::BoundedFixed;
pub use bridge::{BridgeState, Ledger, MilitaryEconomicBridge, Treasury};
pub use combat::{resolve_battle, resolve_naval_battle, BattleOutcome, CombatSession};
pub use composition::{CompositionCache, FleetComposition};
pub use config::SimConfig;
pub use error::{ConfigError, ForceError, OrderError, SchedulerError};
pub use events::{EventSink, GameEvent};
pub use fixed::Fixed;
pub use forces::ForceRegistry;
pub use movement::{find_path, GameMap, MapCell};
pub use observer::{EventLogObserver, ObserverRegistry, SimObserver, TickEvents};
pub use orders::{CommandDelaySystem, MilitaryOrder, OrderRequest};
pub use rng::{RandomSource, SimRng};
pub use scheduling::{MilitarySystem, ParallelSystem, Scheduling, SimSystem, SystemScheduler};
pub use state::{ActorId, CellId, Force, ForceId, SimHours, Unit, UnitType};
