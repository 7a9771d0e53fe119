//! Notable things that happened during a tick.
//!
//! Engines push [`GameEvent`]s into an [`EventSink`]; the caller drains the
//! sink once per tick and hands the batch to the observers.

use crate::combat::{BattleOutcome, BlockadeTier, CombatSession, LandBattleResult, NavalBattleResult};
use crate::fixed::Fixed;
use crate::orders::{DeliveredOrder, OrderType};
use crate::state::{ActorId, CellId, ForceId, OrderId, SimHours};
use serde::{Deserialize, Serialize};

/// What was taken and how, which scales the loot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConquestKind {
    Siege,
    Raid,
    Territory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionCause {
    War,
    Blockade,
}

/// Uses serde's tag format for JSONL output:
/// ```json
/// {"type":"unpaid_troops","at":7200000,"actor":3,...}
/// ```
///
/// `at` is simulation time in hours, serialized as raw fixed-point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    BattleResolved {
        at: SimHours,
        location: CellId,
        attacker: ForceId,
        defender: ForceId,
        outcome: BattleOutcome,
        pyrrhic: bool,
        attacker_casualties: u32,
        defender_casualties: u32,
    },

    NavalBattleResolved {
        at: SimHours,
        location: CellId,
        attacker: ForceId,
        defender: ForceId,
        outcome: BattleOutcome,
        attacker_ships_lost: u32,
        defender_ships_lost: u32,
        /// Set for engagements worth remembering.
        #[serde(skip_serializing_if = "Option::is_none")]
        famous_name: Option<String>,
    },

    SiegeStarted {
        at: SimHours,
        force: ForceId,
        cell: CellId,
    },

    SiegeResolved {
        at: SimHours,
        force: ForceId,
        cell: CellId,
        /// Whether the besieger took the cell.
        captured: bool,
    },

    BlockadeEstablished {
        at: SimHours,
        fleet: ForceId,
        port: CellId,
        tier: BlockadeTier,
    },

    /// The blockade ended, either lifted by the blockader or broken from inside.
    BlockadeBroken {
        at: SimHours,
        fleet: ForceId,
        port: CellId,
        days_active: u32,
    },

    /// Debt hit the ceiling. Emitted once per crossing.
    Bankruptcy {
        at: SimHours,
        actor: ActorId,
        debt: Fixed,
        forces_disbanded: Vec<ForceId>,
    },

    UnpaidTroops {
        at: SimHours,
        actor: ActorId,
        unpaid_months: u32,
        morale_penalty: Fixed,
        desertion_risk: Fixed,
        rebellion_imminent: bool,
    },

    BudgetCrisis {
        at: SimHours,
        actor: ActorId,
        shortfall: Fixed,
        monthly_cost: Fixed,
    },

    TradeDisruption {
        at: SimHours,
        actor: ActorId,
        revenue_loss: Fixed,
        cause: DisruptionCause,
    },

    ConquestLoot {
        at: SimHours,
        conqueror: ActorId,
        #[serde(skip_serializing_if = "Option::is_none")]
        conquered: Option<ActorId>,
        amount: Fixed,
        kind: ConquestKind,
    },

    WarEconomicImpact {
        at: SimHours,
        actor: ActorId,
        trade_losses: Fixed,
        months_at_war: u32,
    },

    OrderDelivered {
        at: SimHours,
        force: ForceId,
        order_id: OrderId,
        order_type: OrderType,
        delay: Fixed,
    },

    OrderCancelled {
        at: SimHours,
        force: ForceId,
        order_id: OrderId,
    },
}

impl GameEvent {
    pub fn land_battle(session: &CombatSession, result: &LandBattleResult, at: SimHours) -> Self {
        GameEvent::BattleResolved {
            at,
            location: session.location,
            attacker: session.attacker,
            defender: session.defender,
            outcome: result.outcome,
            pyrrhic: result.pyrrhic,
            attacker_casualties: result.attacker.casualties,
            defender_casualties: result.defender.casualties,
        }
    }

    pub fn naval_battle(session: &CombatSession, result: &NavalBattleResult, at: SimHours) -> Self {
        GameEvent::NavalBattleResolved {
            at,
            location: session.location,
            attacker: session.attacker,
            defender: session.defender,
            outcome: result.outcome,
            attacker_ships_lost: result.attacker.ships_sunk + result.attacker.ships_captured,
            defender_ships_lost: result.defender.ships_sunk + result.defender.ships_captured,
            famous_name: result.famous_name.clone(),
        }
    }

    pub fn order_delivered(delivered: &DeliveredOrder) -> Self {
        GameEvent::OrderDelivered {
            at: delivered.arrived_at,
            force: delivered.force,
            order_id: delivered.order_id,
            order_type: delivered.order_type,
            delay: delivered.delay,
        }
    }

    /// Snake-case name matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::BattleResolved { .. } => "battle_resolved",
            GameEvent::NavalBattleResolved { .. } => "naval_battle_resolved",
            GameEvent::SiegeStarted { .. } => "siege_started",
            GameEvent::SiegeResolved { .. } => "siege_resolved",
            GameEvent::BlockadeEstablished { .. } => "blockade_established",
            GameEvent::BlockadeBroken { .. } => "blockade_broken",
            GameEvent::Bankruptcy { .. } => "bankruptcy",
            GameEvent::UnpaidTroops { .. } => "unpaid_troops",
            GameEvent::BudgetCrisis { .. } => "budget_crisis",
            GameEvent::TradeDisruption { .. } => "trade_disruption",
            GameEvent::ConquestLoot { .. } => "conquest_loot",
            GameEvent::WarEconomicImpact { .. } => "war_economic_impact",
            GameEvent::OrderDelivered { .. } => "order_delivered",
            GameEvent::OrderCancelled { .. } => "order_cancelled",
        }
    }

    pub fn at(&self) -> SimHours {
        match self {
            GameEvent::BattleResolved { at, .. }
            | GameEvent::NavalBattleResolved { at, .. }
            | GameEvent::SiegeStarted { at, .. }
            | GameEvent::SiegeResolved { at, .. }
            | GameEvent::BlockadeEstablished { at, .. }
            | GameEvent::BlockadeBroken { at, .. }
            | GameEvent::Bankruptcy { at, .. }
            | GameEvent::UnpaidTroops { at, .. }
            | GameEvent::BudgetCrisis { at, .. }
            | GameEvent::TradeDisruption { at, .. }
            | GameEvent::ConquestLoot { at, .. }
            | GameEvent::WarEconomicImpact { at, .. }
            | GameEvent::OrderDelivered { at, .. }
            | GameEvent::OrderCancelled { at, .. } => *at,
        }
    }
}

/// Per-tick event buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSink {
    events: Vec<GameEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        log::trace!("event: {}", event.kind());
        self.events.push(event);
    }

    /// Move every event out of `other`, keeping their order.
    pub fn append(&mut self, other: &mut EventSink) {
        self.events.append(&mut other.events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    /// Take the buffered events, sorted stably by time.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.events);
        events.sort_by_key(GameEvent::at);
        events
    }
}

impl Extend<GameEvent> for EventSink {
    fn extend<T: IntoIterator<Item = GameEvent>>(&mut self, iter: T) {
        for event in iter {
            self.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let event = GameEvent::UnpaidTroops {
            at: Fixed::from_int(720),
            actor: 3,
            unpaid_months: 2,
            morale_penalty: Fixed::from_raw(2000),
            desertion_risk: Fixed::from_raw(2500),
            rebellion_imminent: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"unpaid_troops","at":7200000"#));
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(event.kind(), "unpaid_troops");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let event = GameEvent::ConquestLoot {
            at: Fixed::ZERO,
            conqueror: 1,
            conquered: None,
            amount: Fixed::from_int(30),
            kind: ConquestKind::Raid,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("conquered"));
        assert!(json.contains(r#""kind":"raid""#));
    }

    #[test]
    fn test_drain_orders_by_time() {
        let mut sink = EventSink::new();
        sink.push(GameEvent::OrderCancelled {
            at: Fixed::from_int(5),
            force: 1,
            order_id: 9,
        });
        sink.push(GameEvent::SiegeStarted {
            at: Fixed::from_int(2),
            force: 1,
            cell: 4,
        });
        sink.push(GameEvent::OrderCancelled {
            at: Fixed::from_int(5),
            force: 1,
            order_id: 10,
        });
        let drained = sink.drain();
        assert!(sink.is_empty());
        assert_eq!(drained[0].kind(), "siege_started");
        assert!(matches!(drained[1], GameEvent::OrderCancelled { order_id: 9, .. }));
        assert!(matches!(drained[2], GameEvent::OrderCancelled { order_id: 10, .. }));
    }
}
