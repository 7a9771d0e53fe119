//! Where and how simulation systems run.
//!
//! A system declares a [`Scheduling`] strategy and is registered in the lane
//! that matches it:
//!
//! - `MainThread` systems run one after another, in registration order.
//! - `ThreadPool` systems must implement [`ParallelSystem`]; their keys are
//!   split into chunks and processed on the rayon pool.
//! - `Background` systems run on their own thread alongside the other two
//!   lanes and are joined before the tick ends.
//!
//! A failing system is logged and skipped; it never aborts the tick.

use crate::bridge::{MilitaryEconomicBridge, Treasury};
use crate::combat::blockade::{self, BlockadeStatus};
use crate::config::SimConfig;
use crate::error::SchedulerError;
use crate::events::{EventSink, GameEvent};
use crate::fixed::Fixed;
use crate::forces::ForceRegistry;
use crate::movement::MapCell;
use crate::orders::CommandDelaySystem;
use crate::state::{ActorId, ForceId, OrderId, SimHours};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Keys per rayon task in the pool lane.
const PARTITION_CHUNK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scheduling {
    #[default]
    MainThread,
    ThreadPool,
    Background,
}

/// What a system sees during one tick.
pub struct TickContext<'a> {
    pub tick: u64,
    /// Simulation time at the end of this tick, in hours.
    pub now: SimHours,
    pub delta: SimHours,
    pub events: &'a mut EventSink,
}

pub trait SimSystem: Send {
    fn name(&self) -> &str;

    fn scheduling(&self) -> Scheduling;

    fn update(&mut self, ctx: &mut TickContext<'_>) -> anyhow::Result<()>;
}

/// A system whose work splits over disjoint keys (actors, forces) that can
/// be processed concurrently.
pub trait ParallelSystem: SimSystem + Sync {
    /// Keys to process this tick, in a stable order.
    fn partition_keys(&self) -> Vec<u32>;

    fn update_partition(&self, keys: &[u32], now: SimHours) -> anyhow::Result<EventSink>;
}

pub struct SystemScheduler {
    main: Vec<Box<dyn SimSystem>>,
    pool: Vec<Box<dyn ParallelSystem>>,
    background: Vec<Box<dyn SimSystem>>,
    tick: u64,
    now: SimHours,
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemScheduler {
    pub fn new() -> Self {
        Self {
            main: Vec::new(),
            pool: Vec::new(),
            background: Vec::new(),
            tick: 0,
            now: Fixed::ZERO,
        }
    }

    pub fn now(&self) -> SimHours {
        self.now
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.main.len() + self.pool.len() + self.background.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register_main(&mut self, system: Box<dyn SimSystem>) -> Result<(), SchedulerError> {
        self.check(system.name(), system.scheduling(), Scheduling::MainThread)?;
        log::info!("Registered main-thread system: {}", system.name());
        self.main.push(system);
        Ok(())
    }

    pub fn register_pool(&mut self, system: Box<dyn ParallelSystem>) -> Result<(), SchedulerError> {
        self.check(system.name(), system.scheduling(), Scheduling::ThreadPool)?;
        log::info!("Registered thread-pool system: {}", system.name());
        self.pool.push(system);
        Ok(())
    }

    pub fn register_background(&mut self, system: Box<dyn SimSystem>) -> Result<(), SchedulerError> {
        self.check(system.name(), system.scheduling(), Scheduling::Background)?;
        log::info!("Registered background system: {}", system.name());
        self.background.push(system);
        Ok(())
    }

    fn check(&self, name: &str, declared: Scheduling, lane: Scheduling) -> Result<(), SchedulerError> {
        if declared != lane {
            return Err(SchedulerError::StrategyMismatch {
                name: name.to_owned(),
                declared: format!("{:?}", declared),
                lane: format!("{:?}", lane),
            });
        }
        let taken = self
            .main
            .iter()
            .map(|s| s.name())
            .chain(self.pool.iter().map(|s| s.name()))
            .chain(self.background.iter().map(|s| s.name()))
            .any(|n| n == name);
        if taken {
            return Err(SchedulerError::DuplicateSystem(name.to_owned()));
        }
        Ok(())
    }

    /// Advance the clock by `delta` hours and run every lane once.
    /// Returns the tick's events ordered by time.
    #[tracing::instrument(skip_all, name = "scheduler_tick")]
    pub fn tick(&mut self, delta: SimHours) -> Vec<GameEvent> {
        self.tick += 1;
        self.now += delta.max(Fixed::ZERO);
        let (tick, now) = (self.tick, self.now);

        let main = &mut self.main;
        let pool = &self.pool;
        let background = &mut self.background;

        let (mut events, background_events) = std::thread::scope(|scope| {
            let worker = scope.spawn(move || {
                let mut sink = EventSink::new();
                run_serial(background, tick, now, delta, &mut sink);
                sink
            });

            let mut sink = EventSink::new();
            run_serial(main, tick, now, delta, &mut sink);
            for system in pool.iter() {
                run_parallel(system.as_ref(), now, &mut sink);
            }

            let background_events = worker.join().unwrap_or_else(|_| {
                log::warn!("Background lane panicked on tick {}", tick);
                EventSink::new()
            });
            (sink, background_events)
        });

        let mut background_events = background_events;
        events.append(&mut background_events);
        events.drain()
    }
}

fn run_serial(
    systems: &mut [Box<dyn SimSystem>],
    tick: u64,
    now: SimHours,
    delta: SimHours,
    sink: &mut EventSink,
) {
    for system in systems.iter_mut() {
        let mut ctx = TickContext {
            tick,
            now,
            delta,
            events: sink,
        };
        if let Err(e) = system.update(&mut ctx) {
            log::warn!("System '{}' failed: {:#}", system.name(), e);
        }
    }
}

fn run_parallel(system: &dyn ParallelSystem, now: SimHours, sink: &mut EventSink) {
    let keys = system.partition_keys();
    let _span = tracing::info_span!("partitions_parallel", system = system.name(), count = keys.len())
        .entered();
    let results: Vec<anyhow::Result<EventSink>> = keys
        .par_chunks(PARTITION_CHUNK)
        .map(|chunk| system.update_partition(chunk, now))
        .collect();
    for result in results {
        match result {
            Ok(mut events) => sink.append(&mut events),
            Err(e) => log::warn!("System '{}' partition failed: {:#}", system.name(), e),
        }
    }
}

// ============================================================================
// Military system
// ============================================================================

/// Drives order delivery and the military-economic bridge from the scheduler.
///
/// Orders advance every tick. The bridge is offered every tick and gates
/// itself on its configured update and maintenance intervals.
pub struct MilitarySystem {
    config: Arc<SimConfig>,
    pub forces: Arc<ForceRegistry>,
    pub orders: Arc<CommandDelaySystem>,
    pub bridge: Arc<MilitaryEconomicBridge>,
    treasury: Arc<dyn Treasury>,
    scheduling: Scheduling,
}

impl MilitarySystem {
    pub fn new(
        config: Arc<SimConfig>,
        forces: Arc<ForceRegistry>,
        bridge: Arc<MilitaryEconomicBridge>,
        treasury: Arc<dyn Treasury>,
    ) -> Self {
        Self {
            orders: Arc::new(CommandDelaySystem::new(Arc::clone(&config))),
            config,
            forces,
            bridge,
            treasury,
            scheduling: Scheduling::MainThread,
        }
    }

    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Cancel every order for `force` and report each one.
    pub fn cancel_orders(&self, force: ForceId, now: SimHours, sink: &mut EventSink) -> Vec<OrderId> {
        let cancelled = self.orders.cancel_for_force(force, now);
        for &order_id in &cancelled {
            sink.push(GameEvent::OrderCancelled {
                at: now,
                force,
                order_id,
            });
        }
        cancelled
    }

    /// Put `fleet` on station outside `port` and charge the port's
    /// controller for the trade it loses. `None` when the fleet cannot hold
    /// a blockade there.
    pub fn blockade_port(
        &self,
        fleet: ForceId,
        port: &MapCell,
        now: SimHours,
        sink: &mut EventSink,
    ) -> Option<BlockadeStatus> {
        let force = self.forces.snapshot(fleet)?;
        let status = blockade::establish_blockade(&force, port, &self.config.blockade);
        if !status.active {
            return None;
        }
        sink.push(GameEvent::BlockadeEstablished {
            at: now,
            fleet,
            port: port.id,
            tier: status.tier,
        });
        if let Some(victim) = port.controller {
            self.bridge
                .on_blockade(victim, status.trade_disruption, self.treasury.as_ref(), now, sink);
        }
        Some(status)
    }

    /// End a blockade, whether the fleet sailed off or was broken out of.
    pub fn end_blockade(&self, status: &mut BlockadeStatus, now: SimHours, sink: &mut EventSink) {
        if !status.active {
            return;
        }
        let days_active = status.days_active;
        blockade::lift_blockade(status);
        sink.push(GameEvent::BlockadeBroken {
            at: now,
            fleet: status.fleet,
            port: status.port,
            days_active,
        });
    }

    fn actors(&self) -> Vec<ActorId> {
        let mut actors = self.forces.owners();
        actors.extend(self.bridge.registry().actors());
        actors.sort_unstable();
        actors.dedup();
        actors
    }

    fn run(&self, actors: &[ActorId], now: SimHours) -> EventSink {
        let force_ids: Vec<ForceId> = actors
            .iter()
            .flat_map(|&actor| self.forces.ids_of(actor))
            .collect();
        let mut sink = EventSink::new();
        sink.extend(
            self.orders
                .advance_partition(&force_ids, now)
                .iter()
                .map(GameEvent::order_delivered),
        );

        let mut bridge_events = self
            .bridge
            .update_partition(actors, &self.forces, self.treasury.as_ref(), now);
        let disbanded: Vec<ForceId> = bridge_events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Bankruptcy { forces_disbanded, .. } => Some(forces_disbanded.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        sink.append(&mut bridge_events);
        for force in disbanded {
            self.orders.set_accepting(force, false);
            self.cancel_orders(force, now, &mut sink);
        }
        sink
    }
}

impl SimSystem for MilitarySystem {
    fn name(&self) -> &str {
        "military"
    }

    fn scheduling(&self) -> Scheduling {
        self.scheduling
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        let actors = self.actors();
        let mut events = self.run(&actors, ctx.now);
        ctx.events.append(&mut events);
        Ok(())
    }
}

impl ParallelSystem for MilitarySystem {
    fn partition_keys(&self) -> Vec<u32> {
        self.actors()
    }

    fn update_partition(&self, keys: &[u32], now: SimHours) -> anyhow::Result<EventSink> {
        Ok(self.run(keys, now))
    }
}
