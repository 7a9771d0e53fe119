//! Military-economic bridge.
//!
//! Couples each actor's standing forces to its treasury. Once per update
//! interval the bridge works out what the military costs the economy
//! ([`MilitaryEconomicEffects`]) and what the economy can give back
//! ([`EconomicMilitaryContributions`]), applies both, and runs crisis
//! detection. Once per maintenance interval it tries to pay the troops.
//!
//! Running out of money is never an error. It shows up as debt, crisis
//! flags and events in [`BridgeState`].

pub mod registry;

pub use registry::BridgeRegistry;

use crate::bounded::{new_crisis_severity, BoundedFixed};
use crate::composition::CompositionCache;
use crate::config::{BridgeConfig, ClassRates, SimConfig};
use crate::events::{ConquestKind, DisruptionCause, EventSink, GameEvent};
use crate::fixed::Fixed;
use crate::forces::{lock, ForceRegistry};
use crate::state::{ActorId, Force, SimHours, UnitClass, UnitType};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

pub mod defines {
    use crate::fixed::Fixed;

    pub const HOURS_PER_DAY: i64 = 24;
    /// Men per maintenance and recruitment rate.
    pub const RATE_BASIS: i64 = 1000;
    /// Share of trade income earmarked for the military.
    pub const TRADE_REVENUE_SHARE: Fixed = Fixed::from_raw(4000);
    /// War trade losses grow by this much per month of war.
    pub const WAR_DISRUPTION_GROWTH: Fixed = Fixed::from_raw(500);
    /// War support left to an actor running a deficit.
    pub const DEFICIT_WAR_SUPPORT: Fixed = Fixed::TENTH;
    /// Desertion risk above which unpaid units lose men.
    pub const DESERTION_LOSS_THRESHOLD: Fixed = Fixed::HALF;
    pub const DESERTION_LOSS_SCALE: Fixed = Fixed::TENTH;
}

/// Economy accessor the bridge reads and pays through.
///
/// Methods take `&self` so one treasury can serve several actors updating
/// on different threads. A failed `spend_money` means insufficient funds.
pub trait Treasury: Send + Sync {
    fn balance(&self, actor: ActorId) -> Fixed;
    /// Monthly income.
    fn income(&self, actor: ActorId) -> Fixed;
    /// Monthly non-military expenses.
    fn expenses(&self, _actor: ActorId) -> Fixed {
        Fixed::ZERO
    }
    fn trade_income(&self, _actor: ActorId) -> Fixed {
        Fixed::ZERO
    }
    fn spend_money(&self, actor: ActorId, amount: Fixed) -> bool;
    fn add_money(&self, actor: ActorId, amount: Fixed);
    /// Told the latest military effects once per update. Replaces, never accumulates.
    fn record_military_effects(&self, _actor: ActorId, _effects: &MilitaryEconomicEffects) {}
}

/// One actor's books in a [`Ledger`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    pub balance: Fixed,
    pub monthly_income: Fixed,
    pub monthly_expenses: Fixed,
    pub trade_income: Fixed,
    /// Latest military expenses reported by the bridge.
    pub military_expenses: Fixed,
    /// Latest trade revenue lost to war or blockade.
    pub trade_losses: Fixed,
}

/// In-memory [`Treasury`].
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: Mutex<FxHashMap<ActorId, Account>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, actor: ActorId, account: Account) {
        lock(&self.accounts).insert(actor, account);
    }

    pub fn account(&self, actor: ActorId) -> Option<Account> {
        lock(&self.accounts).get(&actor).cloned()
    }
}

impl Treasury for Ledger {
    fn balance(&self, actor: ActorId) -> Fixed {
        lock(&self.accounts).get(&actor).map_or(Fixed::ZERO, |a| a.balance)
    }

    fn income(&self, actor: ActorId) -> Fixed {
        lock(&self.accounts)
            .get(&actor)
            .map_or(Fixed::ZERO, |a| a.monthly_income)
    }

    fn expenses(&self, actor: ActorId) -> Fixed {
        lock(&self.accounts)
            .get(&actor)
            .map_or(Fixed::ZERO, |a| a.monthly_expenses)
    }

    fn trade_income(&self, actor: ActorId) -> Fixed {
        lock(&self.accounts)
            .get(&actor)
            .map_or(Fixed::ZERO, |a| a.trade_income)
    }

    fn spend_money(&self, actor: ActorId, amount: Fixed) -> bool {
        let mut accounts = lock(&self.accounts);
        match accounts.get_mut(&actor) {
            Some(acc) if acc.balance >= amount => {
                acc.balance -= amount;
                true
            }
            _ => amount <= Fixed::ZERO,
        }
    }

    fn add_money(&self, actor: ActorId, amount: Fixed) {
        lock(&self.accounts).entry(actor).or_default().balance += amount;
    }

    fn record_military_effects(&self, actor: ActorId, effects: &MilitaryEconomicEffects) {
        if let Some(acc) = lock(&self.accounts).get_mut(&actor) {
            acc.military_expenses = effects.military_expenses();
            acc.trade_losses = effects.trade_disruption_cost;
        }
    }
}

/// What the military costs (and earns) the economy this interval.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MilitaryEconomicEffects {
    pub maintenance_cost: Fixed,
    /// Recruitment paid since the last maintenance payment.
    pub recruitment_cost: Fixed,
    /// Equipment bought since the last maintenance payment.
    pub equipment_cost: Fixed,
    pub supply_cost: Fixed,
    pub trade_disruption_cost: Fixed,
    pub war_exhaustion_penalty: Fixed,
    /// Men under arms rather than in the civilian economy.
    pub military_employment: u32,
    /// Loot taken since the previous update.
    pub loot_income: Fixed,
    pub tribute_income: Fixed,
}

impl MilitaryEconomicEffects {
    pub fn military_expenses(&self) -> Fixed {
        self.maintenance_cost + self.equipment_cost + self.supply_cost
    }

    /// Recurring monthly cost measured against the military budget.
    pub fn monthly_cost(&self) -> Fixed {
        self.maintenance_cost + self.supply_cost
    }
}

/// What the economy can give the military this interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicMilitaryContributions {
    pub available_military_budget: Fixed,
    /// Monthly cost over budget. Zero when there is no budget.
    pub budget_utilization: Fixed,
    /// Budget over cost, capped at 1.
    pub financial_sustainability: Fixed,
    pub equipment_quality_modifier: Fixed,
    pub supply_quality: Fixed,
    pub recruitment_capacity_modifier: Fixed,
    pub mercenary_availability: Fixed,
    pub war_support_capacity: Fixed,
    pub treasury_stability: Fixed,
    pub trade_revenue_for_military: Fixed,
}

impl Default for EconomicMilitaryContributions {
    fn default() -> Self {
        Self {
            available_military_budget: Fixed::ZERO,
            budget_utilization: Fixed::ZERO,
            financial_sustainability: Fixed::ONE,
            equipment_quality_modifier: Fixed::ONE,
            supply_quality: Fixed::ONE,
            recruitment_capacity_modifier: Fixed::ONE,
            mercenary_availability: Fixed::ZERO,
            war_support_capacity: Fixed::ONE,
            treasury_stability: Fixed::ONE,
            trade_revenue_for_military: Fixed::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conquest {
    pub conqueror: ActorId,
    /// Actor that loses the loot, if it has a treasury.
    pub conquered: Option<ActorId>,
    pub province_value: Fixed,
    pub kind: ConquestKind,
}

/// Result of one attempt to pay the troops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    Paid(Fixed),
    Unpaid {
        unpaid_months: u32,
        morale_penalty: Fixed,
        desertion_risk: Fixed,
    },
    /// Debt crossed the ceiling this month.
    Bankruptcy { debt: Fixed },
}

/// Per-actor bridge bookkeeping. Plain data, serializable for saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    pub actor: ActorId,
    pub effects: MilitaryEconomicEffects,
    pub contributions: EconomicMilitaryContributions,

    pub spending_history: VecDeque<Fixed>,
    pub readiness_history: VecDeque<Fixed>,
    pub treasury_history: VecDeque<Fixed>,

    pub last_update: Option<SimHours>,
    pub next_maintenance: Option<SimHours>,
    pub last_maintenance_payment: Fixed,
    pub accumulated_debt: Fixed,
    pub total_loot_collected: Fixed,
    pending_loot: Fixed,
    pub recruitment_spending: Fixed,
    pub equipment_spending: Fixed,

    pub budget_crisis: bool,
    pub unpaid_troops: bool,
    pub unpaid_months: u32,
    pub supply_crisis: bool,
    /// Latched when debt hits the ceiling; cleared once it falls back below.
    pub bankrupt: bool,
    pub crisis_severity: BoundedFixed,

    pub at_war: bool,
    pub months_at_war: u32,
    pub war_exhaustion: BoundedFixed,
    pub war_economic_impact: Fixed,
}

impl BridgeState {
    pub fn new(actor: ActorId, config: &BridgeConfig) -> Self {
        Self {
            actor,
            effects: MilitaryEconomicEffects::default(),
            contributions: EconomicMilitaryContributions::default(),
            spending_history: VecDeque::new(),
            readiness_history: VecDeque::new(),
            treasury_history: VecDeque::new(),
            last_update: None,
            next_maintenance: None,
            last_maintenance_payment: Fixed::ZERO,
            accumulated_debt: Fixed::ZERO,
            total_loot_collected: Fixed::ZERO,
            pending_loot: Fixed::ZERO,
            recruitment_spending: Fixed::ZERO,
            equipment_spending: Fixed::ZERO,
            budget_crisis: false,
            unpaid_troops: false,
            unpaid_months: 0,
            supply_crisis: false,
            bankrupt: false,
            crisis_severity: new_crisis_severity(),
            at_war: false,
            months_at_war: 0,
            war_exhaustion: BoundedFixed::new(
                Fixed::ZERO,
                Fixed::ZERO,
                config.max_war_exhaustion.max(Fixed::ZERO),
            ),
            war_economic_impact: Fixed::ZERO,
        }
    }

    pub fn crisis_active(&self) -> bool {
        self.budget_crisis || self.unpaid_troops || self.supply_crisis
    }

    /// Book one maintenance attempt. Debt never exceeds `max_debt`, and the
    /// bankruptcy outcome is returned only on the month the ceiling is hit.
    pub fn settle_maintenance(
        &mut self,
        cost: Fixed,
        paid: bool,
        config: &BridgeConfig,
    ) -> MaintenanceOutcome {
        if paid {
            self.last_maintenance_payment = cost;
            self.unpaid_troops = false;
            self.unpaid_months = 0;
            self.recruitment_spending = Fixed::ZERO;
            self.equipment_spending = Fixed::ZERO;
            return MaintenanceOutcome::Paid(cost);
        }

        self.unpaid_troops = true;
        self.unpaid_months += 1;
        let owed = self.accumulated_debt + cost.max(Fixed::ZERO);
        if owed > config.max_debt {
            self.accumulated_debt = config.max_debt;
            if !self.bankrupt {
                self.bankrupt = true;
                return MaintenanceOutcome::Bankruptcy {
                    debt: self.accumulated_debt,
                };
            }
        } else {
            self.accumulated_debt = owed;
        }
        let months = self.unpaid_months as i64;
        MaintenanceOutcome::Unpaid {
            unpaid_months: self.unpaid_months,
            morale_penalty: config.unpaid_morale_penalty_per_month.mul_int(months),
            desertion_risk: config.base_desertion_rate
                + config.desertion_per_unpaid_month.mul_int(months),
        }
    }

    /// Pay down debt. Falling below the ceiling re-arms the bankruptcy event.
    pub fn reduce_debt(&mut self, amount: Fixed, config: &BridgeConfig) {
        self.accumulated_debt = (self.accumulated_debt - amount.max(Fixed::ZERO)).max(Fixed::ZERO);
        if self.accumulated_debt < config.max_debt {
            self.bankrupt = false;
        }
    }

    /// Evaluate the three crisis conditions and move the severity.
    /// Returns true when a budget crisis starts this interval.
    pub fn detect_crises(&mut self, supply_shortfall: bool, config: &BridgeConfig) -> bool {
        let monthly_cost = self.effects.monthly_cost();
        let budget = self.contributions.available_military_budget;
        let was_in_budget_crisis = self.budget_crisis;
        self.budget_crisis = monthly_cost > budget * config.budget_crisis_threshold;
        self.supply_crisis = supply_shortfall;

        if self.crisis_active() {
            self.crisis_severity.add(config.crisis_severity_step);
        } else {
            self.crisis_severity.add(-config.crisis_severity_decay);
        }
        self.budget_crisis && !was_in_budget_crisis
    }

    pub fn record_history(&mut self, spending: Fixed, readiness: Fixed, treasury: Fixed, limit: usize) {
        push_bounded(&mut self.spending_history, spending, limit);
        push_bounded(&mut self.readiness_history, readiness, limit);
        push_bounded(&mut self.treasury_history, treasury, limit);
    }

    pub fn on_war_started(&mut self) {
        if !self.at_war {
            self.at_war = true;
            self.months_at_war = 0;
        }
    }

    pub fn on_war_ended(&mut self, config: &BridgeConfig) {
        self.at_war = false;
        self.months_at_war = 0;
        self.war_economic_impact = Fixed::ZERO;
        self.war_exhaustion.add(-config.war_exhaustion_peace_recovery);
    }

    /// Count one more month of war. Returns the trade losses when this month
    /// is due a war-impact report.
    pub fn advance_war_month(&mut self, trade_income: Fixed, config: &BridgeConfig) -> Option<Fixed> {
        if !self.at_war {
            return None;
        }
        self.months_at_war += 1;
        self.war_exhaustion
            .set(config.war_exhaustion_per_month.mul_int(self.months_at_war as i64));
        let losses = war_trade_disruption(trade_income, self.months_at_war, config);
        self.war_economic_impact = losses;
        let every = config.war_impact_event_interval_months.max(1);
        (self.months_at_war % every == 0).then_some(losses)
    }

    pub fn health(&self) -> BridgeHealthMetrics {
        let primary_issue = if self.bankrupt {
            BridgeIssue::Bankrupt
        } else if self.budget_crisis {
            BridgeIssue::BudgetCrisis
        } else if self.unpaid_troops {
            BridgeIssue::UnpaidTroops
        } else if self.supply_crisis {
            BridgeIssue::SupplyCrisis
        } else {
            BridgeIssue::Healthy
        };
        BridgeHealthMetrics {
            monthly_military_cost: self.effects.monthly_cost(),
            budget_utilization: self.contributions.budget_utilization,
            financial_sustainability: self.contributions.financial_sustainability,
            crisis_active: self.crisis_active(),
            crisis_severity: self.crisis_severity.get(),
            war_exhaustion: self.war_exhaustion.get(),
            accumulated_debt: self.accumulated_debt,
            primary_issue,
            can_afford_current_military: self.contributions.financial_sustainability >= Fixed::ONE,
        }
    }
}

fn push_bounded(history: &mut VecDeque<Fixed>, sample: Fixed, limit: usize) {
    history.push_back(sample);
    while history.len() > limit.max(1) {
        history.pop_front();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BridgeIssue {
    #[default]
    Healthy,
    SupplyCrisis,
    UnpaidTroops,
    BudgetCrisis,
    Bankrupt,
}

impl fmt::Display for BridgeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BridgeIssue::Healthy => "Healthy",
            BridgeIssue::SupplyCrisis => "Supply Crisis",
            BridgeIssue::UnpaidTroops => "Unpaid Troops",
            BridgeIssue::BudgetCrisis => "Budget Crisis",
            BridgeIssue::Bankrupt => "Bankrupt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeHealthMetrics {
    pub monthly_military_cost: Fixed,
    pub budget_utilization: Fixed,
    pub financial_sustainability: Fixed,
    pub crisis_active: bool,
    pub crisis_severity: Fixed,
    pub war_exhaustion: Fixed,
    pub accumulated_debt: Fixed,
    pub primary_issue: BridgeIssue,
    pub can_afford_current_military: bool,
}

impl Default for BridgeHealthMetrics {
    fn default() -> Self {
        BridgeState::new(0, &BridgeConfig::default()).health()
    }
}

// ============================================================================
// Cost formulas
// ============================================================================

fn class_rate(rates: &ClassRates, unit_type: UnitType) -> Fixed {
    if unit_type == UnitType::Levies {
        return rates.levies;
    }
    match unit_type.class() {
        UnitClass::Infantry => rates.infantry,
        UnitClass::Cavalry => rates.cavalry,
        UnitClass::Siege => rates.siege,
        UnitClass::Naval => rates.naval,
    }
}

fn per_thousand(rate: Fixed, men: u32) -> Fixed {
    rate * Fixed::from_ratio(men as i64, defines::RATE_BASIS)
}

/// Monthly upkeep of every unit in `forces`.
pub fn garrison_maintenance(forces: &[Force], config: &BridgeConfig) -> Fixed {
    forces
        .iter()
        .flat_map(|f| f.units.iter())
        .map(|u| per_thousand(class_rate(&config.maintenance_per_1000, u.unit_type), u.current_strength))
        .sum()
}

pub fn recruitment_cost(unit_type: UnitType, quantity: u32, config: &BridgeConfig) -> Fixed {
    per_thousand(class_rate(&config.recruitment_per_1000, unit_type), quantity)
}

pub fn supply_consumption(forces: &[Force], config: &BridgeConfig) -> Fixed {
    let soldiers: i64 = forces.iter().map(|f| f.total_strength as i64).sum();
    config.supply_cost_per_soldier.mul_int(soldiers)
}

/// Trade lost to war, growing with its length.
pub fn war_trade_disruption(trade_income: Fixed, months_at_war: u32, config: &BridgeConfig) -> Fixed {
    let growth = Fixed::ONE + defines::WAR_DISRUPTION_GROWTH.mul_int(months_at_war as i64);
    trade_income.max(Fixed::ZERO) * config.war_trade_disruption * growth
}

pub fn loot_amount(province_value: Fixed, kind: ConquestKind, config: &BridgeConfig) -> Fixed {
    let multiplier = match kind {
        ConquestKind::Siege => config.siege_loot_multiplier,
        ConquestKind::Raid => config.raid_loot_multiplier,
        ConquestKind::Territory => config.territory_loot_multiplier,
    };
    province_value.max(Fixed::ZERO) * config.loot_ratio * multiplier
}

pub fn military_effects(
    forces: &[Force],
    state: &BridgeState,
    trade_income: Fixed,
    cache: &CompositionCache,
    config: &BridgeConfig,
) -> MilitaryEconomicEffects {
    let mut effects = MilitaryEconomicEffects {
        maintenance_cost: garrison_maintenance(forces, config),
        recruitment_cost: state.recruitment_spending,
        equipment_cost: state.equipment_spending,
        supply_cost: supply_consumption(forces, config),
        military_employment: forces
            .iter()
            .map(|f| cache.get_or_compute(f).total_strength)
            .fold(0u32, u32::saturating_add),
        loot_income: state.pending_loot,
        ..MilitaryEconomicEffects::default()
    };
    if state.at_war {
        effects.trade_disruption_cost = war_trade_disruption(trade_income, state.months_at_war, config);
        effects.war_exhaustion_penalty = state.war_exhaustion.get() * config.war_productivity_penalty;
    }
    effects
}

pub fn economic_contributions(
    balance: Fixed,
    income: Fixed,
    expenses: Fixed,
    trade_income: Fixed,
    monthly_military_cost: Fixed,
    config: &BridgeConfig,
) -> EconomicMilitaryContributions {
    let budget = income.max(Fixed::ZERO) * config.military_budget_share;
    let budget_utilization = if budget > Fixed::ZERO {
        monthly_military_cost.div(budget)
    } else {
        Fixed::ZERO
    };
    let financial_sustainability = if monthly_military_cost > Fixed::ZERO {
        budget.div(monthly_military_cost).min(Fixed::ONE)
    } else {
        Fixed::ONE
    };
    let supply_quality = if balance > config.full_supply_treasury {
        Fixed::ONE
    } else {
        balance.div(config.full_supply_treasury).clamp(Fixed::ZERO, Fixed::ONE)
    };
    let war_support_capacity = if income > expenses {
        (income - expenses).div(income.max(Fixed::ONE))
    } else {
        defines::DEFICIT_WAR_SUPPORT
    };
    let treasury_stability = if expenses > Fixed::ZERO {
        balance
            .div(expenses * config.reserve_months)
            .clamp(Fixed::ZERO, Fixed::ONE)
    } else {
        Fixed::ONE
    };
    EconomicMilitaryContributions {
        available_military_budget: budget,
        budget_utilization,
        financial_sustainability,
        equipment_quality_modifier: (Fixed::ONE
            + balance.max(Fixed::ZERO) * config.equipment_wealth_factor)
            .min(config.max_equipment_modifier),
        supply_quality,
        recruitment_capacity_modifier: Fixed::ONE
            + income.max(Fixed::ZERO) * config.recruitment_income_factor,
        mercenary_availability: if balance > config.mercenary_treasury {
            Fixed::ONE
        } else {
            Fixed::ZERO
        },
        war_support_capacity,
        treasury_stability,
        trade_revenue_for_military: trade_income.max(Fixed::ZERO) * defines::TRADE_REVENUE_SHARE,
    }
}

/// Money buys better gear; an empty treasury caps how well units are supplied.
pub fn apply_contributions(force: &mut Force, contributions: &EconomicMilitaryContributions) {
    for unit in &mut force.units {
        unit.equipment_quality =
            (unit.equipment_quality * contributions.equipment_quality_modifier).min(Fixed::ONE);
        unit.supply_level = unit.supply_level.min(contributions.supply_quality);
    }
}

/// Morale loss for the month and, once desertion is likely, men walking off.
pub fn apply_unpaid_penalties(force: &mut Force, desertion_risk: Fixed, config: &BridgeConfig) {
    force.morale = (force.morale - config.unpaid_morale_penalty_per_month).unit();
    if desertion_risk <= defines::DESERTION_LOSS_THRESHOLD {
        return;
    }
    let keep = (Fixed::ONE - desertion_risk * defines::DESERTION_LOSS_SCALE).unit();
    for unit in &mut force.units {
        let remaining = (keep.mul_int(unit.current_strength as i64)).floor_to_u32();
        unit.apply_losses(unit.current_strength - remaining.min(unit.current_strength));
    }
    force.recalculate_strength();
}

fn has_supply_shortfall(forces: &[Force], config: &BridgeConfig) -> bool {
    forces
        .iter()
        .flat_map(|f| f.units.iter())
        .any(|u| u.supply_level < config.supply_crisis_threshold)
}

fn days_to_hours(days: Fixed) -> SimHours {
    days.mul_int(defines::HOURS_PER_DAY)
}

// ============================================================================
// Engine
// ============================================================================

/// Runs the bridge for every actor. Per-actor state lives in the
/// [`BridgeRegistry`], one lock per actor.
pub struct MilitaryEconomicBridge {
    config: Arc<SimConfig>,
    states: BridgeRegistry,
    cache: Arc<CompositionCache>,
}

impl MilitaryEconomicBridge {
    pub fn new(config: Arc<SimConfig>, cache: Arc<CompositionCache>) -> Self {
        Self {
            config,
            states: BridgeRegistry::new(),
            cache,
        }
    }

    pub fn reload(&mut self, config: Arc<SimConfig>) {
        self.config = config;
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.states
    }

    pub fn state(&self, actor: ActorId) -> Option<BridgeState> {
        self.states.snapshot(actor)
    }

    /// Run one bridge update for `actor` at `now`.
    ///
    /// Does nothing and returns false when the update interval has not
    /// elapsed since the last update. Every maintenance month that fell due
    /// since the last call is settled in order.
    #[tracing::instrument(skip_all, name = "bridge_update")]
    pub fn update(
        &self,
        actor: ActorId,
        forces: &ForceRegistry,
        treasury: &dyn Treasury,
        now: SimHours,
        sink: &mut EventSink,
    ) -> bool {
        let cfg = &self.config.bridge;
        let handle = self.states.entry(actor, cfg);
        let mut state = lock(&handle);

        if let Some(last) = state.last_update {
            if now - last < days_to_hours(cfg.update_interval_days) {
                return false;
            }
        }
        state.last_update = Some(now);
        let month = days_to_hours(cfg.maintenance_interval_days);
        if state.next_maintenance.is_none() {
            state.next_maintenance = Some(now + month);
        }

        let trade_income = treasury.trade_income(actor);
        let active = active_forces(forces, actor);
        state.effects = military_effects(&active, &state, trade_income, &self.cache, cfg);
        state.contributions = economic_contributions(
            treasury.balance(actor),
            treasury.income(actor),
            treasury.expenses(actor),
            trade_income,
            state.effects.monthly_cost(),
            cfg,
        );
        treasury.record_military_effects(actor, &state.effects);
        state.pending_loot = Fixed::ZERO;
        for force in &active {
            if let Err(e) =
                forces.with_force_mut(force.id, |f| apply_contributions(f, &state.contributions))
            {
                log::warn!("Actor {}: contributions not applied: {}", actor, e);
            }
        }

        while let Some(due) = state.next_maintenance {
            if now < due {
                break;
            }
            self.settle_month(&mut state, forces, treasury, due, sink);
            state.next_maintenance = Some(due + month);
        }

        let active = active_forces(forces, actor);
        if state.detect_crises(has_supply_shortfall(&active, cfg), cfg) {
            let monthly_cost = state.effects.monthly_cost();
            let budget = state.contributions.available_military_budget;
            log::warn!(
                "Actor {} in budget crisis: cost {} against budget {}",
                actor,
                monthly_cost,
                budget
            );
            sink.push(GameEvent::BudgetCrisis {
                at: now,
                actor,
                shortfall: monthly_cost - budget,
                monthly_cost,
            });
        }

        let spending = state.effects.maintenance_cost;
        let readiness = state.contributions.financial_sustainability;
        state.record_history(spending, readiness, treasury.balance(actor), cfg.history_size);
        true
    }

    fn settle_month(
        &self,
        state: &mut BridgeState,
        forces: &ForceRegistry,
        treasury: &dyn Treasury,
        at: SimHours,
        sink: &mut EventSink,
    ) {
        let cfg = &self.config.bridge;
        let actor = state.actor;
        let owned = active_forces(forces, actor);
        let cost = garrison_maintenance(&owned, cfg);
        let paid = cost <= Fixed::ZERO || treasury.spend_money(actor, cost);

        match state.settle_maintenance(cost, paid, cfg) {
            MaintenanceOutcome::Paid(amount) => {
                log::debug!("Actor {} paid maintenance {}", actor, amount);
            }
            MaintenanceOutcome::Unpaid {
                unpaid_months,
                morale_penalty,
                desertion_risk,
            } => {
                log::warn!(
                    "Actor {} cannot pay maintenance {} ({} months unpaid, desertion risk {})",
                    actor,
                    cost,
                    unpaid_months,
                    desertion_risk
                );
                for force in &owned {
                    if let Err(e) = forces.with_force_mut(force.id, |f| {
                        apply_unpaid_penalties(f, desertion_risk, cfg)
                    }) {
                        log::warn!("Actor {}: unpaid penalties not applied: {}", actor, e);
                    }
                }
                sink.push(GameEvent::UnpaidTroops {
                    at,
                    actor,
                    unpaid_months,
                    morale_penalty,
                    desertion_risk,
                    rebellion_imminent: desertion_risk > defines::DESERTION_LOSS_THRESHOLD,
                });
            }
            MaintenanceOutcome::Bankruptcy { debt } => {
                log::warn!("Actor {} is bankrupt with debt {}", actor, debt);
                let mut disbanded = Vec::with_capacity(owned.len());
                for force in &owned {
                    if forces.disband(force.id).is_ok() {
                        disbanded.push(force.id);
                    }
                }
                state.crisis_severity.set(Fixed::ONE);
                sink.push(GameEvent::Bankruptcy {
                    at,
                    actor,
                    debt,
                    forces_disbanded: disbanded,
                });
            }
        }

        let trade_income = treasury.trade_income(actor);
        if let Some(trade_losses) = state.advance_war_month(trade_income, cfg) {
            sink.push(GameEvent::WarEconomicImpact {
                at,
                actor,
                trade_losses,
                months_at_war: state.months_at_war,
            });
        }
        if state.at_war && state.war_economic_impact > Fixed::ZERO {
            sink.push(GameEvent::TradeDisruption {
                at,
                actor,
                revenue_loss: state.war_economic_impact,
                cause: DisruptionCause::War,
            });
        }
    }

    /// Update every listed actor in parallel. Events come back in actor order.
    pub fn update_partition(
        &self,
        actors: &[ActorId],
        forces: &ForceRegistry,
        treasury: &dyn Treasury,
        now: SimHours,
    ) -> EventSink {
        let _span = tracing::info_span!("bridge_partition", actors = actors.len()).entered();
        let mut sinks: Vec<(ActorId, EventSink)> = actors
            .par_iter()
            .map(|&actor| {
                let mut sink = EventSink::new();
                self.update(actor, forces, treasury, now, &mut sink);
                (actor, sink)
            })
            .collect();
        sinks.sort_by_key(|(actor, _)| *actor);
        let mut merged = EventSink::new();
        for (_, mut sink) in sinks {
            merged.append(&mut sink);
        }
        merged
    }

    pub fn on_war_started(&self, actor: ActorId) {
        let handle = self.states.entry(actor, &self.config.bridge);
        lock(&handle).on_war_started();
        log::info!("Actor {} goes to war", actor);
    }

    pub fn on_war_ended(&self, actor: ActorId) {
        let handle = self.states.entry(actor, &self.config.bridge);
        lock(&handle).on_war_ended(&self.config.bridge);
        log::info!("Actor {} makes peace", actor);
    }

    /// Credit loot from a conquest. A named loser can only lose what it has.
    pub fn on_conquest(
        &self,
        conquest: Conquest,
        treasury: &dyn Treasury,
        now: SimHours,
        sink: &mut EventSink,
    ) -> Fixed {
        let cfg = &self.config.bridge;
        let Conquest {
            conqueror,
            conquered,
            province_value,
            kind,
        } = conquest;
        let mut amount = loot_amount(province_value, kind, cfg);
        if let Some(loser) = conquered {
            amount = amount.min(treasury.balance(loser).max(Fixed::ZERO));
            if !treasury.spend_money(loser, amount) {
                amount = Fixed::ZERO;
            }
        }
        if amount > Fixed::ZERO {
            treasury.add_money(conqueror, amount);
        }
        {
            let handle = self.states.entry(conqueror, cfg);
            let mut state = lock(&handle);
            state.total_loot_collected += amount;
            state.pending_loot += amount;
        }
        log::info!("Actor {} loots {} ({:?})", conqueror, amount, kind);
        sink.push(GameEvent::ConquestLoot {
            at: now,
            conqueror,
            conquered,
            amount,
            kind,
        });
        amount
    }

    /// Trade an actor loses while one of its ports is blockaded.
    pub fn on_blockade(
        &self,
        actor: ActorId,
        disruption: Fixed,
        treasury: &dyn Treasury,
        now: SimHours,
        sink: &mut EventSink,
    ) -> Fixed {
        let loss = treasury.trade_income(actor).max(Fixed::ZERO) * disruption.unit();
        if loss > Fixed::ZERO {
            sink.push(GameEvent::TradeDisruption {
                at: now,
                actor,
                revenue_loss: loss,
                cause: DisruptionCause::Blockade,
            });
        }
        loss
    }

    /// Pay for new recruits. Returns false, and spends nothing, when the
    /// treasury cannot cover it.
    pub fn pay_recruitment(
        &self,
        actor: ActorId,
        unit_type: UnitType,
        quantity: u32,
        treasury: &dyn Treasury,
    ) -> bool {
        let cost = recruitment_cost(unit_type, quantity, &self.config.bridge);
        if !treasury.spend_money(actor, cost) {
            log::warn!("Actor {} cannot afford {} {:?} ({})", actor, quantity, unit_type, cost);
            return false;
        }
        let handle = self.states.entry(actor, &self.config.bridge);
        lock(&handle).recruitment_spending += cost;
        true
    }

    pub fn purchase_equipment(&self, actor: ActorId, amount: Fixed, treasury: &dyn Treasury) -> bool {
        if !treasury.spend_money(actor, amount) {
            return false;
        }
        let handle = self.states.entry(actor, &self.config.bridge);
        lock(&handle).equipment_spending += amount;
        true
    }

    /// Pay down as much debt as the treasury allows, up to `amount`.
    pub fn repay_debt(&self, actor: ActorId, amount: Fixed, treasury: &dyn Treasury) -> Fixed {
        let handle = self.states.entry(actor, &self.config.bridge);
        let mut state = lock(&handle);
        let payment = amount
            .min(state.accumulated_debt)
            .min(treasury.balance(actor))
            .max(Fixed::ZERO);
        if payment > Fixed::ZERO && treasury.spend_money(actor, payment) {
            state.reduce_debt(payment, &self.config.bridge);
            payment
        } else {
            Fixed::ZERO
        }
    }

    pub fn can_afford_recruitment(
        &self,
        actor: ActorId,
        unit_type: UnitType,
        quantity: u32,
        treasury: &dyn Treasury,
    ) -> bool {
        treasury.balance(actor) >= recruitment_cost(unit_type, quantity, &self.config.bridge)
    }

    /// Budget from the last update, or computed from income when the actor
    /// has never been updated.
    pub fn available_military_budget(&self, actor: ActorId, treasury: &dyn Treasury) -> Fixed {
        match self.states.snapshot(actor) {
            Some(state) if state.last_update.is_some() => {
                state.contributions.available_military_budget
            }
            _ => treasury.income(actor).max(Fixed::ZERO) * self.config.bridge.military_budget_share,
        }
    }

    pub fn monthly_military_cost(&self, actor: ActorId, forces: &ForceRegistry) -> Fixed {
        match self.states.snapshot(actor) {
            Some(state) if state.last_update.is_some() => state.effects.monthly_cost(),
            _ => garrison_maintenance(&active_forces(forces, actor), &self.config.bridge),
        }
    }

    pub fn health_metrics(&self, actor: ActorId) -> BridgeHealthMetrics {
        self.states
            .snapshot(actor)
            .map(|s| s.health())
            .unwrap_or_default()
    }
}

fn active_forces(forces: &ForceRegistry, actor: ActorId) -> Vec<Force> {
    forces
        .forces_of(actor)
        .into_iter()
        .filter(|f| f.is_active)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ForceBuilder;

    const DAY: i64 = 24;
    const MONTH: i64 = 30 * DAY;

    fn hours(h: i64) -> SimHours {
        Fixed::from_int(h)
    }

    fn cfg() -> BridgeConfig {
        BridgeConfig::default()
    }

    fn bridge() -> MilitaryEconomicBridge {
        MilitaryEconomicBridge::new(
            Arc::new(SimConfig::default()),
            Arc::new(CompositionCache::default()),
        )
    }

    fn ledger(actor: ActorId, balance: i64, income: i64) -> Ledger {
        let ledger = Ledger::new();
        ledger.open(
            actor,
            Account {
                balance: Fixed::from_int(balance),
                monthly_income: Fixed::from_int(income),
                ..Account::default()
            },
        );
        ledger
    }

    /// Three thousand galleon crew: 150 a month in upkeep.
    fn navy(owner: ActorId) -> ForceRegistry {
        let registry = ForceRegistry::new();
        registry.insert(
            ForceBuilder::new(1)
                .owner(owner)
                .unit(UnitType::Galleons, 1000)
                .unit(UnitType::Galleons, 1000)
                .unit(UnitType::Galleons, 1000)
                .build(),
        );
        registry
    }

    #[test]
    fn test_maintenance_rates() {
        let c = cfg();
        let forces = vec![ForceBuilder::new(1)
            .unit(UnitType::Levies, 1000)
            .unit(UnitType::Spearmen, 500)
            .unit(UnitType::HeavyCavalry, 200)
            .unit(UnitType::Cannons, 100)
            .build()];
        // 5 + 5 + 5 + 4
        assert_eq!(garrison_maintenance(&forces, &c), Fixed::from_int(19));
        assert_eq!(supply_consumption(&forces, &c), Fixed::from_int(900));
        assert_eq!(recruitment_cost(UnitType::Frigates, 500, &c), Fixed::from_int(200));
    }

    #[test]
    fn test_contributions() {
        let c = cfg();
        let rich = economic_contributions(
            Fixed::from_int(5000),
            Fixed::from_int(200),
            Fixed::from_int(100),
            Fixed::from_int(50),
            Fixed::from_int(40),
            &c,
        );
        assert_eq!(rich.available_military_budget, Fixed::from_int(80));
        assert_eq!(rich.budget_utilization, Fixed::HALF);
        assert_eq!(rich.financial_sustainability, Fixed::ONE);
        assert_eq!(rich.equipment_quality_modifier, Fixed::from_raw(15000));
        assert_eq!(rich.supply_quality, Fixed::ONE);
        assert_eq!(rich.recruitment_capacity_modifier, Fixed::from_int(3));
        assert_eq!(rich.mercenary_availability, Fixed::ONE);
        assert_eq!(rich.war_support_capacity, Fixed::HALF);
        assert_eq!(rich.treasury_stability, Fixed::ONE);
        assert_eq!(rich.trade_revenue_for_military, Fixed::from_int(20));

        let poor = economic_contributions(
            Fixed::from_int(250),
            Fixed::from_int(100),
            Fixed::from_int(150),
            Fixed::ZERO,
            Fixed::from_int(80),
            &c,
        );
        assert_eq!(poor.financial_sustainability, Fixed::HALF);
        assert_eq!(poor.budget_utilization, Fixed::from_int(2));
        assert_eq!(poor.supply_quality, Fixed::HALF);
        assert_eq!(poor.mercenary_availability, Fixed::ZERO);
        assert_eq!(poor.war_support_capacity, Fixed::TENTH);
    }

    #[test]
    fn test_broke_actor_falls_into_debt() {
        let b = bridge();
        let forces = navy(7);
        let treasury = ledger(7, 0, 100);
        let mut sink = EventSink::new();

        assert!(b.update(7, &forces, &treasury, hours(0), &mut sink));
        assert!(sink.iter().all(|e| !matches!(e, GameEvent::UnpaidTroops { .. })));

        assert!(b.update(7, &forces, &treasury, hours(MONTH), &mut sink));
        let state = b.state(7).unwrap();
        assert_eq!(state.accumulated_debt, Fixed::from_int(150));
        assert_eq!(state.unpaid_months, 1);
        assert!(state.unpaid_troops);
        let unpaid: Vec<_> = sink
            .iter()
            .filter(|e| matches!(e, GameEvent::UnpaidTroops { .. }))
            .collect();
        assert_eq!(unpaid.len(), 1);
        assert!(matches!(
            unpaid[0],
            GameEvent::UnpaidTroops { unpaid_months: 1, desertion_risk, .. }
                if *desertion_risk == Fixed::from_raw(1500)
        ));
        assert_eq!(b.health_metrics(7).primary_issue, BridgeIssue::BudgetCrisis);
    }

    #[test]
    fn test_paid_maintenance_deducts_treasury() {
        let b = bridge();
        let forces = navy(7);
        let treasury = ledger(7, 1000, 100);
        let mut sink = EventSink::new();
        b.update(7, &forces, &treasury, hours(0), &mut sink);
        b.update(7, &forces, &treasury, hours(MONTH), &mut sink);
        assert_eq!(treasury.balance(7), Fixed::from_int(850));
        let state = b.state(7).unwrap();
        assert!(!state.unpaid_troops);
        assert_eq!(state.last_maintenance_payment, Fixed::from_int(150));
        assert_eq!(state.accumulated_debt, Fixed::ZERO);
    }

    #[test]
    fn test_update_runs_once_per_interval() {
        let b = bridge();
        let forces = navy(1);
        let treasury = ledger(1, 1000, 100);
        let mut sink = EventSink::new();
        assert!(b.update(1, &forces, &treasury, hours(0), &mut sink));
        assert!(!b.update(1, &forces, &treasury, hours(DAY - 1), &mut sink));
        assert!(b.update(1, &forces, &treasury, hours(DAY), &mut sink));
        assert_eq!(b.state(1).unwrap().spending_history.len(), 2);
    }

    #[test]
    fn test_skipped_months_are_all_settled() {
        let b = bridge();
        let forces = navy(1);
        let treasury = ledger(1, 0, 0);
        let mut sink = EventSink::new();
        b.update(1, &forces, &treasury, hours(0), &mut sink);
        b.update(1, &forces, &treasury, hours(3 * MONTH), &mut sink);
        let state = b.state(1).unwrap();
        assert_eq!(state.unpaid_months, 3);
        assert_eq!(state.accumulated_debt, Fixed::from_int(450));
        assert_eq!(state.next_maintenance, Some(hours(4 * MONTH)));
    }

    #[test]
    fn test_bankruptcy_fires_once_per_crossing() {
        let c = BridgeConfig {
            max_debt: Fixed::from_int(200),
            ..cfg()
        };
        let mut state = BridgeState::new(1, &c);
        let cost = Fixed::from_int(150);
        assert!(matches!(state.settle_maintenance(cost, false, &c), MaintenanceOutcome::Unpaid { .. }));
        assert_eq!(
            state.settle_maintenance(cost, false, &c),
            MaintenanceOutcome::Bankruptcy { debt: Fixed::from_int(200) }
        );
        assert!(matches!(state.settle_maintenance(cost, false, &c), MaintenanceOutcome::Unpaid { .. }));
        assert_eq!(state.accumulated_debt, Fixed::from_int(200));

        state.reduce_debt(Fixed::from_int(100), &c);
        assert!(!state.bankrupt);
        assert!(matches!(
            state.settle_maintenance(cost, false, &c),
            MaintenanceOutcome::Bankruptcy { .. }
        ));
    }

    #[test]
    fn test_bankruptcy_disbands_forces() {
        let mut config = SimConfig::default();
        config.bridge.max_debt = Fixed::from_int(100);
        let b = MilitaryEconomicBridge::new(Arc::new(config), Arc::new(CompositionCache::default()));
        let forces = navy(3);
        let treasury = ledger(3, 0, 0);
        let mut sink = EventSink::new();
        b.update(3, &forces, &treasury, hours(0), &mut sink);
        b.update(3, &forces, &treasury, hours(MONTH), &mut sink);

        let events = sink.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::Bankruptcy { forces_disbanded, .. } if forces_disbanded == &vec![1]
        )));
        assert!(!forces.snapshot(1).unwrap().is_active);
        assert_eq!(b.health_metrics(3).primary_issue, BridgeIssue::Bankrupt);
        assert_eq!(b.health_metrics(3).crisis_severity, Fixed::ONE);
    }

    #[test]
    fn test_crisis_severity_rises_and_decays() {
        let c = cfg();
        let mut state = BridgeState::new(1, &c);
        state.unpaid_troops = true;
        state.detect_crises(false, &c);
        state.detect_crises(false, &c);
        assert_eq!(state.crisis_severity.get(), Fixed::from_raw(2000));
        state.unpaid_troops = false;
        state.detect_crises(false, &c);
        assert_eq!(state.crisis_severity.get(), Fixed::from_raw(1500));
        for _ in 0..10 {
            state.detect_crises(false, &c);
        }
        assert_eq!(state.crisis_severity.get(), Fixed::ZERO);
        state.detect_crises(true, &c);
        assert!(state.supply_crisis);
        assert_eq!(state.health().primary_issue, BridgeIssue::SupplyCrisis);
    }

    #[test]
    fn test_budget_crisis_reported_on_onset_only() {
        let c = cfg();
        let mut state = BridgeState::new(1, &c);
        state.effects.maintenance_cost = Fixed::from_int(100);
        state.contributions.available_military_budget = Fixed::from_int(50);
        assert!(state.detect_crises(false, &c));
        assert!(!state.detect_crises(false, &c));
        assert!(state.budget_crisis);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = BridgeState::new(1, &cfg());
        for i in 0..20 {
            state.record_history(Fixed::from_int(i), Fixed::ONE, Fixed::ZERO, 12);
        }
        assert_eq!(state.spending_history.len(), 12);
        assert_eq!(state.spending_history.front(), Some(&Fixed::from_int(8)));
        assert_eq!(state.treasury_history.len(), 12);
    }

    #[test]
    fn test_war_months_and_exhaustion() {
        let c = cfg();
        let mut state = BridgeState::new(1, &c);
        assert_eq!(state.advance_war_month(Fixed::from_int(100), &c), None);
        state.on_war_started();
        assert_eq!(state.advance_war_month(Fixed::from_int(100), &c), None);
        assert_eq!(state.advance_war_month(Fixed::from_int(100), &c), None);
        // 100 * 0.2 * (1 + 3 * 0.05)
        assert_eq!(
            state.advance_war_month(Fixed::from_int(100), &c),
            Some(Fixed::from_int(23))
        );
        assert_eq!(state.war_exhaustion.get(), Fixed::from_raw(1500));
        state.on_war_ended(&c);
        assert_eq!(state.months_at_war, 0);
        assert_eq!(state.war_exhaustion.get(), Fixed::from_raw(500));
    }

    #[test]
    fn test_war_effects_report_disruption() {
        let c = cfg();
        let mut state = BridgeState::new(1, &c);
        state.on_war_started();
        state.months_at_war = 2;
        state.war_exhaustion.set(Fixed::HALF);
        let effects = military_effects(&[], &state, Fixed::from_int(100), &CompositionCache::default(), &c);
        assert_eq!(effects.trade_disruption_cost, Fixed::from_int(22));
        assert_eq!(effects.war_exhaustion_penalty, Fixed::from_raw(1500));
    }

    #[test]
    fn test_conquest_loot_by_kind() {
        let b = bridge();
        let treasury = ledger(1, 0, 0);
        treasury.open(
            2,
            Account {
                balance: Fixed::from_int(100),
                ..Account::default()
            },
        );
        let mut sink = EventSink::new();
        // 100 * 0.3 * 1.5
        let siege = Conquest {
            conqueror: 1,
            conquered: None,
            province_value: Fixed::from_int(100),
            kind: ConquestKind::Siege,
        };
        assert_eq!(b.on_conquest(siege, &treasury, hours(0), &mut sink), Fixed::from_int(45));
        // 0.3 * 2 * 500 = 300, but the loser only has 100
        let territory = Conquest {
            conqueror: 1,
            conquered: Some(2),
            province_value: Fixed::from_int(500),
            kind: ConquestKind::Territory,
        };
        let taken = b.on_conquest(territory, &treasury, hours(1), &mut sink);
        assert_eq!(taken, Fixed::from_int(100));
        assert_eq!(treasury.balance(1), Fixed::from_int(145));
        assert_eq!(treasury.balance(2), Fixed::ZERO);
        assert_eq!(b.state(1).unwrap().total_loot_collected, Fixed::from_int(145));
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_recruitment_and_equipment_spending() {
        let b = bridge();
        let treasury = ledger(1, 100, 0);
        assert!(b.can_afford_recruitment(1, UnitType::Spearmen, 1000, &treasury));
        assert!(b.pay_recruitment(1, UnitType::Spearmen, 1000, &treasury));
        assert!(!b.pay_recruitment(1, UnitType::ShipsOfTheLine, 1000, &treasury));
        assert!(b.purchase_equipment(1, Fixed::from_int(20), &treasury));
        assert_eq!(treasury.balance(1), Fixed::from_int(30));
        let state = b.state(1).unwrap();
        assert_eq!(state.recruitment_spending, Fixed::from_int(50));
        assert_eq!(state.equipment_spending, Fixed::from_int(20));
    }

    #[test]
    fn test_repay_debt_rearms_bankruptcy() {
        let mut config = SimConfig::default();
        config.bridge.max_debt = Fixed::from_int(100);
        let b = MilitaryEconomicBridge::new(Arc::new(config), Arc::new(CompositionCache::default()));
        {
            let handle = b.registry().entry(1, &b.config.bridge);
            let mut state = lock(&handle);
            state.accumulated_debt = Fixed::from_int(100);
            state.bankrupt = true;
        }
        let treasury = ledger(1, 30, 0);
        assert_eq!(b.repay_debt(1, Fixed::from_int(50), &treasury), Fixed::from_int(30));
        let state = b.state(1).unwrap();
        assert_eq!(state.accumulated_debt, Fixed::from_int(70));
        assert!(!state.bankrupt);
    }

    #[test]
    fn test_unpaid_penalties_cause_desertion() {
        let c = cfg();
        let mut force = ForceBuilder::new(1).morale(0.5).unit(UnitType::Spearmen, 800).build();
        apply_unpaid_penalties(&mut force, Fixed::from_raw(3000), &c);
        assert_eq!(force.morale, Fixed::from_raw(4000));
        assert_eq!(force.total_strength, 800);
        // keep 1 - 0.6 * 0.1 = 0.94
        apply_unpaid_penalties(&mut force, Fixed::from_raw(6000), &c);
        assert_eq!(force.total_strength, 752);
    }

    #[test]
    fn test_contributions_improve_equipment_and_cap_supply() {
        let mut force = ForceBuilder::new(1).unit(UnitType::Pikemen, 800).build();
        let c = EconomicMilitaryContributions {
            equipment_quality_modifier: Fixed::from_raw(15000),
            supply_quality: Fixed::HALF,
            ..EconomicMilitaryContributions::default()
        };
        apply_contributions(&mut force, &c);
        assert_eq!(force.units[0].equipment_quality, Fixed::from_raw(7500));
        assert_eq!(force.units[0].supply_level, Fixed::HALF);
    }

    #[test]
    fn test_parallel_partition_matches_serial() {
        let b = bridge();
        let forces = ForceRegistry::new();
        let treasury = Ledger::new();
        for actor in 1..=4u32 {
            forces.insert(
                ForceBuilder::new(actor)
                    .owner(actor)
                    .unit(UnitType::Galleons, 1000 * actor)
                    .build(),
            );
            treasury.open(actor, Account::default());
        }
        b.update_partition(&[1, 2, 3, 4], &forces, &treasury, hours(0));
        let events = b.update_partition(&[4, 3, 2, 1], &forces, &treasury, hours(MONTH)).drain();
        let actors: Vec<ActorId> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::UnpaidTroops { actor, .. } => Some(*actor),
                _ => None,
            })
            .collect();
        assert_eq!(actors, vec![1, 2, 3, 4]);
        assert_eq!(b.state(3).unwrap().accumulated_debt, Fixed::from_int(150));
    }

    #[test]
    fn test_paid_months_at_the_ceiling_do_not_rearm_bankruptcy() {
        let c = BridgeConfig {
            max_debt: Fixed::from_int(100),
            ..BridgeConfig::default()
        };
        let mut state = BridgeState::new(1, &c);
        let bankruptcy = |o: &MaintenanceOutcome| matches!(o, MaintenanceOutcome::Bankruptcy { .. });

        assert!(bankruptcy(&state.settle_maintenance(Fixed::from_int(150), false, &c)));
        for _ in 0..3 {
            assert!(!bankruptcy(&state.settle_maintenance(Fixed::from_int(50), true, &c)));
            assert!(!bankruptcy(&state.settle_maintenance(Fixed::from_int(50), false, &c)));
        }
        assert_eq!(state.accumulated_debt, Fixed::from_int(100));

        state.reduce_debt(Fixed::from_int(10), &c);
        assert!(bankruptcy(&state.settle_maintenance(Fixed::from_int(50), false, &c)));
    }

    #[test]
    fn test_state_serializes() {
        let mut state = BridgeState::new(5, &cfg());
        state.record_history(Fixed::ONE, Fixed::HALF, Fixed::from_int(10), 12);
        state.accumulated_debt = Fixed::from_int(42);
        let json = serde_json::to_string(&state).unwrap();
        let back: BridgeState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn debt_capped_and_bankruptcy_once_per_crossing(
                ops in prop::collection::vec((0i64..5_000, any::<bool>(), 0i64..3_000), 1..60)
            ) {
                let c = BridgeConfig { max_debt: Fixed::from_int(20_000), ..BridgeConfig::default() };
                let mut state = BridgeState::new(1, &c);
                // Armed while debt sits below the ceiling, or since the last
                // repayment brought it back under.
                let mut armed = true;
                let (mut crossings, mut bankruptcies) = (0u32, 0u32);
                for (cost, paid, repay) in ops {
                    let cost = Fixed::from_int(cost);
                    let crosses = !paid && armed && state.accumulated_debt + cost > c.max_debt;
                    if crosses {
                        crossings += 1;
                        armed = false;
                    }
                    let outcome = state.settle_maintenance(cost, paid, &c);
                    prop_assert!(state.accumulated_debt <= c.max_debt);
                    prop_assert!(state.accumulated_debt >= Fixed::ZERO);
                    let bankrupt_now = matches!(outcome, MaintenanceOutcome::Bankruptcy { .. });
                    if bankrupt_now {
                        bankruptcies += 1;
                    }
                    prop_assert_eq!(bankrupt_now, crosses);
                    if repay > 0 {
                        state.reduce_debt(Fixed::from_int(repay), &c);
                        if state.accumulated_debt < c.max_debt {
                            armed = true;
                        }
                    }
                }
                prop_assert_eq!(bankruptcies, crossings);
            }
        }
    }
}
