//! Per-force order queue and the order lifecycle.
//!
//! ```text
//! Pending -> InTransit -> Received -> Executing -> Completed
//!                                        |  ^
//!                                        v  |
//!                                     Interrupted
//! ```
//! Any live state may also go to `Cancelled` or `Failed`. Terminal orders
//! leave the queue and are archived in a bounded history.

use super::delay::PendingCommand;
use crate::error::OrderError;
use crate::fixed::Fixed;
use crate::state::{ActorId, CellId, ForceId, OrderId, SimHours};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub mod defines {
    use crate::fixed::Fixed;

    /// Execution progress per hour for orders with no external driver.
    pub const EXECUTION_RATE_PER_HOUR: Fixed = Fixed::from_raw(100); // 0.01
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderType {
    #[default]
    None,
    Move,
    Attack,
    Defend,
    Siege,
    Retreat,
    Patrol,
    Garrison,
    Raid,
    Follow,
    Support,
    Ambush,
    Scout,
    Resupply,
    Disband,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum OrderPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    InTransit,
    Received,
    Executing,
    Completed,
    Failed,
    Cancelled,
    Interrupted,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }

    /// Forward-only lifecycle. The single way back is resuming an
    /// interrupted order.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (from, Cancelled | Failed) => from.is_live(),
            (Pending, InTransit) => true,
            (InTransit, Received) => true,
            (Received, Executing) => true,
            (Executing, Completed | Interrupted) => true,
            (Interrupted, Executing) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::InTransit => "In Transit",
            OrderStatus::Received => "Received",
            OrderStatus::Executing => "Executing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Failed => "Failed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Interrupted => "Interrupted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MilitaryOrder {
    pub id: OrderId,
    pub order_type: OrderType,
    pub priority: OrderPriority,
    pub status: OrderStatus,
    pub target_cell: Option<CellId>,
    pub target_force: Option<ForceId>,
    pub issuer: Option<ActorId>,
    pub issued_at: SimHours,
    pub received_at: Option<SimHours>,
    pub started_at: Option<SimHours>,
    pub finished_at: Option<SimHours>,
    pub allow_engagement: bool,
    pub force_march: bool,
    pub patrol_route: Vec<CellId>,
    /// [0, 1]
    pub progress: Fixed,
    pub failure_reason: Option<String>,
    pub description: String,
}

impl MilitaryOrder {
    pub fn new(order_type: OrderType, priority: OrderPriority) -> Self {
        Self {
            order_type,
            priority,
            allow_engagement: true,
            ..Self::default()
        }
    }

    pub fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            log::warn!(
                "Order {}: rejected transition {} -> {}",
                self.id,
                self.status,
                next
            );
            return Err(OrderError::IllegalTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Orders for one force, highest priority first, then oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQueue {
    pub force: ForceId,
    orders: Vec<MilitaryOrder>,
    in_transit: Vec<PendingCommand>,
    history: VecDeque<MilitaryOrder>,
    history_limit: usize,
    pub accept_new_orders: bool,
    last_update: SimHours,
}

impl OrderQueue {
    pub fn new(force: ForceId, history_limit: usize) -> Self {
        Self {
            force,
            orders: Vec::new(),
            in_transit: Vec::new(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            accept_new_orders: true,
            last_update: Fixed::ZERO,
        }
    }

    /// Queue an order. It keeps its place among equal-priority orders by
    /// issue time.
    pub fn push(&mut self, order: MilitaryOrder) -> Result<(), OrderError> {
        if !self.accept_new_orders {
            log::warn!("Force {} is not accepting new orders", self.force);
            return Err(OrderError::NotAccepting(self.force));
        }
        let at = self
            .orders
            .iter()
            .position(|o| {
                o.priority < order.priority
                    || (o.priority == order.priority && o.issued_at > order.issued_at)
            })
            .unwrap_or(self.orders.len());
        self.orders.insert(at, order);
        Ok(())
    }

    /// Queue an order together with the message carrying it.
    pub fn push_in_transit(
        &mut self,
        mut order: MilitaryOrder,
        command: PendingCommand,
    ) -> Result<(), OrderError> {
        order.transition(OrderStatus::InTransit)?;
        self.push(order)?;
        self.in_transit.push(command);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn orders(&self) -> &[MilitaryOrder] {
        &self.orders
    }

    pub fn in_transit(&self) -> &[PendingCommand] {
        &self.in_transit
    }

    pub fn history(&self) -> impl Iterator<Item = &MilitaryOrder> {
        self.history.iter()
    }

    pub fn get(&self, id: OrderId) -> Option<&MilitaryOrder> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// The order the force is working on: one already under way if there
    /// is one, else the first order that has reached the force.
    pub fn current(&self) -> Option<&MilitaryOrder> {
        self.current_index().map(|i| &self.orders[i])
    }

    fn current_index(&self) -> Option<usize> {
        self.orders
            .iter()
            .position(|o| matches!(o.status, OrderStatus::Executing | OrderStatus::Interrupted))
            .or_else(|| {
                self.orders
                    .iter()
                    .position(|o| o.status == OrderStatus::Received)
            })
    }

    /// Pop messages that have arrived by `now` and mark their orders
    /// received. Returns the delivered messages in arrival order.
    pub fn deliver(&mut self, now: SimHours) -> Vec<PendingCommand> {
        let (mut arrived, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_transit)
            .into_iter()
            .partition(|c| c.has_arrived(now));
        self.in_transit = waiting;
        arrived.sort_by_key(|c| (c.arrival_at, c.order_id));
        arrived.retain(|command| {
            let Some(order) = self.orders.iter_mut().find(|o| o.id == command.order_id) else {
                return false;
            };
            if order.transition(OrderStatus::Received).is_err() {
                return false;
            }
            order.received_at = Some(command.arrival_at);
            true
        });
        arrived
    }

    /// Advance the lifecycle to `now`: deliver arrived messages, start the
    /// current order, and run it. Returns the delivered messages.
    pub fn update(&mut self, now: SimHours) -> Vec<PendingCommand> {
        let delta = (now - self.last_update).max(Fixed::ZERO);
        self.last_update = self.last_update.max(now);
        let delivered = self.deliver(now);

        let Some(i) = self.current_index() else {
            return delivered;
        };
        let order = &mut self.orders[i];
        match order.status {
            OrderStatus::Received => {
                if order.transition(OrderStatus::Executing).is_ok() {
                    order.started_at = Some(now);
                }
            }
            OrderStatus::Executing => {
                order.progress =
                    (order.progress + delta * defines::EXECUTION_RATE_PER_HOUR).min(Fixed::ONE);
                if order.progress >= Fixed::ONE {
                    let id = order.id;
                    if let Err(e) = self.finish(id, OrderStatus::Completed, now, None) {
                        log::warn!("Force {}: order {} not completed: {}", self.force, id, e);
                    }
                }
            }
            _ => {}
        }
        delivered
    }

    /// Record execution progress reported by whoever carries the order out.
    pub fn report_progress(&mut self, id: OrderId, progress: Fixed, now: SimHours) -> Result<(), OrderError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(OrderError::UnknownOrder(id))?;
        if order.status != OrderStatus::Executing {
            return Err(OrderError::IllegalTransition {
                from: order.status.to_string(),
                to: OrderStatus::Executing.to_string(),
            });
        }
        order.progress = progress.unit();
        if order.progress >= Fixed::ONE {
            self.finish(id, OrderStatus::Completed, now, None)?;
        }
        Ok(())
    }

    pub fn complete_current(&mut self, now: SimHours) -> Result<OrderId, OrderError> {
        let id = self.current_id()?;
        self.finish(id, OrderStatus::Completed, now, None)?;
        Ok(id)
    }

    pub fn fail_current(&mut self, reason: impl Into<String>, now: SimHours) -> Result<OrderId, OrderError> {
        let id = self.current_id()?;
        self.finish(id, OrderStatus::Failed, now, Some(reason.into()))?;
        Ok(id)
    }

    pub fn cancel_current(&mut self, now: SimHours) -> Result<OrderId, OrderError> {
        let id = self.current_id()?;
        self.finish(id, OrderStatus::Cancelled, now, None)?;
        Ok(id)
    }

    pub fn interrupt_current(&mut self) -> Result<OrderId, OrderError> {
        let id = self.current_id()?;
        self.set_status(id, OrderStatus::Interrupted)?;
        Ok(id)
    }

    pub fn resume(&mut self, id: OrderId) -> Result<(), OrderError> {
        self.set_status(id, OrderStatus::Executing)
    }

    /// Cancel every live order. Returns the ids cancelled.
    pub fn cancel_all(&mut self, now: SimHours) -> Vec<OrderId> {
        self.cancel_where(|_| true, now)
    }

    pub fn cancel_orders_of_type(&mut self, order_type: OrderType, now: SimHours) -> Vec<OrderId> {
        self.cancel_where(|o| o.order_type == order_type, now)
    }

    /// Cancel the live orders matching `predicate`, leaving the rest alone.
    pub fn cancel_where(
        &mut self,
        predicate: impl Fn(&MilitaryOrder) -> bool,
        now: SimHours,
    ) -> Vec<OrderId> {
        let candidates: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|o| o.status.is_live() && predicate(o))
            .map(|o| o.id)
            .collect();
        candidates
            .into_iter()
            .filter(|&id| match self.finish(id, OrderStatus::Cancelled, now, None) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Force {}: order {} not cancelled: {}", self.force, id, e);
                    false
                }
            })
            .collect()
    }

    fn current_id(&self) -> Result<OrderId, OrderError> {
        self.current()
            .map(|o| o.id)
            .ok_or(OrderError::NoCurrentOrder(self.force))
    }

    fn set_status(&mut self, id: OrderId, next: OrderStatus) -> Result<(), OrderError> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(OrderError::UnknownOrder(id))?
            .transition(next)
    }

    /// Move an order to a terminal state and into history.
    fn finish(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        now: SimHours,
        reason: Option<String>,
    ) -> Result<(), OrderError> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(OrderError::UnknownOrder(id))?;
        self.orders[index].transition(status)?;
        let mut order = self.orders.remove(index);
        order.finished_at = Some(now);
        order.failure_reason = reason;
        self.in_transit.retain(|c| c.order_id != id);
        log::debug!(
            "Force {}: order {} ({:?}) {}",
            self.force,
            order.id,
            order.order_type,
            order.status
        );
        self.archive(order);
        Ok(())
    }

    fn archive(&mut self, order: MilitaryOrder) {
        self.history.push_back(order);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }
}
