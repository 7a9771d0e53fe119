//! Orders and the time they take to reach the field.
//!
//! [`CommandDelaySystem`] owns one [`OrderQueue`] per force, each behind its
//! own lock. Issuing an order computes its travel time and parks it as
//! `InTransit`; [`CommandDelaySystem::advance`] delivers whatever has
//! arrived and moves each force's current order along.

pub mod delay;
pub mod queue;

pub use delay::{
    calculate_delay, CommunicationMethod, DelayConditions, Infrastructure, PendingCommand,
    Position, TerrainSampler,
};
pub use queue::{MilitaryOrder, OrderPriority, OrderQueue, OrderStatus, OrderType};

use crate::config::SimConfig;
use crate::error::OrderError;
use crate::forces::{lock, read, write};
use crate::state::{ForceId, OrderId, SimHours};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// An order plus where it is sent from and to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub target: ForceId,
    pub order: MilitaryOrder,
    pub origin: Position,
    pub destination: Position,
}

/// A message that reached its force during [`CommandDelaySystem::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredOrder {
    pub order_id: OrderId,
    pub force: ForceId,
    pub order_type: OrderType,
    pub priority: OrderPriority,
    pub arrived_at: SimHours,
    pub delay: SimHours,
    pub description: String,
}

/// Everything needed to rebuild the system after a load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrdersSnapshot {
    pub next_id: OrderId,
    pub queues: Vec<OrderQueue>,
}

pub struct CommandDelaySystem {
    config: Arc<SimConfig>,
    queues: RwLock<FxHashMap<ForceId, Arc<Mutex<OrderQueue>>>>,
    next_id: AtomicU64,
}

impl CommandDelaySystem {
    pub fn new(config: Arc<SimConfig>) -> Self {
        Self {
            config,
            queues: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn reload(&mut self, config: Arc<SimConfig>) {
        self.config = config;
    }

    /// Compute the delay for `request` and put the order in flight.
    pub fn issue(
        &self,
        request: OrderRequest,
        conditions: &DelayConditions<'_>,
        now: SimHours,
    ) -> Result<PendingCommand, OrderError> {
        let config = &self.config.orders;
        let total_delay = calculate_delay(request.origin, request.destination, conditions, config);
        let method = conditions
            .infrastructure
            .effective_method(conditions.method, config);

        let handle = self.queue(request.target);
        let mut queue = lock(&handle);
        if !queue.accept_new_orders {
            log::warn!("Force {} is not accepting new orders", request.target);
            return Err(OrderError::NotAccepting(request.target));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut order = request.order;
        order.id = id;
        order.issued_at = now;
        let command = PendingCommand {
            order_id: id,
            target: request.target,
            sent_at: now,
            arrival_at: now + total_delay,
            total_delay,
            method,
            origin: request.origin,
            destination: request.destination,
            description: order.description.clone(),
        };
        queue.push_in_transit(order, command.clone())?;
        log::info!(
            "Order {} sent to force {} by {:?} (delay {}h)",
            id,
            request.target,
            method,
            total_delay
        );
        Ok(command)
    }

    /// Deliver arrived orders and run every force's current order up to
    /// `now`. Forces are processed in parallel; the result is ordered by
    /// arrival time, then order id.
    pub fn advance(&self, now: SimHours) -> Vec<DeliveredOrder> {
        let forces = self.forces();
        self.advance_partition(&forces, now)
    }

    /// [`advance`](Self::advance) restricted to `forces`. Disjoint
    /// partitions may run concurrently.
    pub fn advance_partition(&self, forces: &[ForceId], now: SimHours) -> Vec<DeliveredOrder> {
        let handles: Vec<_> = forces.iter().filter_map(|&id| self.handle(id)).collect();
        let mut delivered: Vec<DeliveredOrder> = handles
            .par_iter()
            .flat_map_iter(|handle| {
                let mut queue = lock(handle);
                let arrived = queue.update(now);
                let delivered: Vec<DeliveredOrder> = arrived
                    .into_iter()
                    .map(|command| {
                        let (order_type, priority) = queue
                            .get(command.order_id)
                            .or_else(|| queue.history().find(|o| o.id == command.order_id))
                            .map_or((OrderType::None, OrderPriority::Normal), |o| {
                                (o.order_type, o.priority)
                            });
                        DeliveredOrder {
                            order_id: command.order_id,
                            force: command.target,
                            order_type,
                            priority,
                            arrived_at: command.arrival_at,
                            delay: command.total_delay,
                            description: command.description,
                        }
                    })
                    .collect();
                delivered
            })
            .collect();
        delivered.sort_by_key(|d| (d.arrived_at, d.order_id));
        for d in &delivered {
            log::debug!("Order {} reached force {}", d.order_id, d.force);
        }
        delivered
    }

    /// Cancel every live order for one force. Returns the ids cancelled.
    pub fn cancel_for_force(&self, force: ForceId, now: SimHours) -> Vec<OrderId> {
        match self.handle(force) {
            Some(handle) => lock(&handle).cancel_all(now),
            None => Vec::new(),
        }
    }

    pub fn cancel_orders_of_type(&self, force: ForceId, order_type: OrderType, now: SimHours) -> Vec<OrderId> {
        match self.handle(force) {
            Some(handle) => lock(&handle).cancel_orders_of_type(order_type, now),
            None => Vec::new(),
        }
    }

    /// Cancel matching live orders across all forces.
    pub fn cancel_where(
        &self,
        predicate: impl Fn(ForceId, &MilitaryOrder) -> bool,
        now: SimHours,
    ) -> Vec<(ForceId, OrderId)> {
        let mut cancelled = Vec::new();
        for force in self.forces() {
            if let Some(handle) = self.handle(force) {
                let ids = lock(&handle).cancel_where(|o| predicate(force, o), now);
                cancelled.extend(ids.into_iter().map(|id| (force, id)));
            }
        }
        cancelled
    }

    pub fn set_accepting(&self, force: ForceId, accepting: bool) {
        lock(&self.queue(force)).accept_new_orders = accepting;
    }

    /// Messages still on the road to `force`.
    pub fn pending_for(&self, force: ForceId) -> Vec<PendingCommand> {
        self.handle(force)
            .map(|h| lock(&h).in_transit().to_vec())
            .unwrap_or_default()
    }

    pub fn pending_count(&self) -> usize {
        self.forces()
            .into_iter()
            .filter_map(|f| self.handle(f))
            .map(|h| lock(&h).in_transit().len())
            .sum()
    }

    pub fn current_order(&self, force: ForceId) -> Option<MilitaryOrder> {
        self.handle(force).and_then(|h| lock(&h).current().cloned())
    }

    /// Run `f` with exclusive access to one force's queue.
    pub fn with_queue_mut<R>(&self, force: ForceId, f: impl FnOnce(&mut OrderQueue) -> R) -> R {
        let handle = self.queue(force);
        let mut queue = lock(&handle);
        f(&mut queue)
    }

    /// Forces with a queue, ascending.
    pub fn forces(&self) -> Vec<ForceId> {
        let mut ids: Vec<_> = read(&self.queues).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn snapshot(&self) -> OrdersSnapshot {
        let queues = self
            .forces()
            .into_iter()
            .filter_map(|f| self.handle(f))
            .map(|h| lock(&h).clone())
            .collect();
        OrdersSnapshot {
            next_id: self.next_id.load(Ordering::Relaxed),
            queues,
        }
    }

    pub fn restore(config: Arc<SimConfig>, snapshot: OrdersSnapshot) -> Self {
        let system = Self::new(config);
        system
            .next_id
            .store(snapshot.next_id.max(1), Ordering::Relaxed);
        {
            let mut queues = write(&system.queues);
            for queue in snapshot.queues {
                queues.insert(queue.force, Arc::new(Mutex::new(queue)));
            }
        }
        system
    }

    fn handle(&self, force: ForceId) -> Option<Arc<Mutex<OrderQueue>>> {
        read(&self.queues).get(&force).cloned()
    }

    /// Get or create the queue for `force`. Creation happens under the
    /// write lock so two callers cannot both create one.
    fn queue(&self, force: ForceId) -> Arc<Mutex<OrderQueue>> {
        if let Some(handle) = self.handle(force) {
            return handle;
        }
        let limit = self.config.orders.history_limit;
        write(&self.queues)
            .entry(force)
            .or_insert_with(|| Arc::new(Mutex::new(OrderQueue::new(force, limit))))
            .clone()
    }
}
