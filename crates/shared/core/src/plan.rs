//! Planning DTOs - directives, plan fragments, and the aggregated batch
//!
//! A planning directive names the trades it targets and which plan slots
//! it expects. Planner workers answer with plan fragments, one slot at a
//! time, and the aggregator assembles them into a single batch per run.
//!
//! Every plan fragment carries its trade id as an explicit typed field;
//! the aggregator never parses identifiers out of chains or strings.

use crate::anchor::RunAnchor;
use crate::causality::CausalityChain;
use crate::identifiers::{EventId, TradeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four named plan slots a trade can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanSlot {
    /// Where to get in
    Entry,
    /// How much
    Size,
    /// Where to get out
    Exit,
    /// How to work the order (sequential phase, depends on the others)
    Execution,
}

impl PlanSlot {
    /// All slots in canonical order
    pub const ALL: [PlanSlot; 4] = [
        PlanSlot::Entry,
        PlanSlot::Size,
        PlanSlot::Exit,
        PlanSlot::Execution,
    ];

    /// Parallel-phase slots arrive in any order; execution is sequential
    pub fn is_parallel(&self) -> bool {
        !matches!(self, PlanSlot::Execution)
    }

    fn bit(self) -> u8 {
        match self {
            PlanSlot::Entry => 0b0001,
            PlanSlot::Size => 0b0010,
            PlanSlot::Exit => 0b0100,
            PlanSlot::Execution => 0b1000,
        }
    }
}

impl std::fmt::Display for PlanSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlanSlot::Entry => "entry",
            PlanSlot::Size => "size",
            PlanSlot::Exit => "exit",
            PlanSlot::Execution => "execution",
        };
        write!(f, "{}", name)
    }
}

/// Immutable set of expected plan slots, built from directive sub-fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlanSlotSet {
    bits: u8,
}

impl PlanSlotSet {
    /// The empty set (an invalid directive - see the aggregator)
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// All four slots
    pub fn all() -> Self {
        PlanSlot::ALL.iter().fold(Self::empty(), |s, &p| s.with(p))
    }

    /// Return a copy with one more slot
    pub fn with(self, slot: PlanSlot) -> Self {
        Self {
            bits: self.bits | slot.bit(),
        }
    }

    pub fn contains(&self, slot: PlanSlot) -> bool {
        self.bits & slot.bit() != 0
    }

    /// The parallel-phase subset (entry/size/exit)
    pub fn parallel(&self) -> PlanSlotSet {
        Self {
            bits: self.bits & !PlanSlot::Execution.bit(),
        }
    }

    pub fn expects_execution(&self) -> bool {
        self.contains(PlanSlot::Execution)
    }

    /// Slots in canonical order
    pub fn iter(&self) -> impl Iterator<Item = PlanSlot> + '_ {
        PlanSlot::ALL.into_iter().filter(|s| self.contains(*s))
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl FromIterator<PlanSlot> for PlanSlotSet {
    fn from_iter<I: IntoIterator<Item = PlanSlot>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), |s, p| s.with(p))
    }
}

/// Which trades a directive addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectiveTargets {
    /// Open a brand-new trade; the aggregator synthesizes its id
    NewTrade,
    /// Modify the named existing trades
    Existing(Vec<TradeId>),
}

/// Top-level planning directive that kicks off aggregation for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningDirective {
    pub directive_id: Uuid,
    pub targets: DirectiveTargets,
    /// Slots the planners are expected to fill for every target
    pub requested: PlanSlotSet,
}

impl PlanningDirective {
    /// Directive opening one new trade
    pub fn new_trade(requested: PlanSlotSet) -> Self {
        Self {
            directive_id: Uuid::new_v4(),
            targets: DirectiveTargets::NewTrade,
            requested,
        }
    }

    /// Directive modifying existing trades
    pub fn for_trades(
        trades: impl IntoIterator<Item = TradeId>,
        requested: PlanSlotSet,
    ) -> Self {
        Self {
            directive_id: Uuid::new_v4(),
            targets: DirectiveTargets::Existing(trades.into_iter().collect()),
            requested,
        }
    }
}

/// One plan fragment produced by a planner worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePlan {
    pub plan_id: Uuid,
    pub trade_id: TradeId,
    pub slot: PlanSlot,
}

impl TradePlan {
    pub fn new(trade_id: impl Into<TradeId>, slot: PlanSlot) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            trade_id: trade_id.into(),
            slot,
        }
    }
}

/// Request for the sequential phase of one trade, emitted when the
/// parallel-phase slots for that trade are complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequentialPlanRequest {
    pub directive_id: Uuid,
    pub trade_id: TradeId,
}

/// Completed per-trade record inside the batch, plans in slot order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedDirective {
    pub trade_id: TradeId,
    pub plans: Vec<TradePlan>,
}

/// The single output batch of one completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanBatch {
    pub directive_id: Uuid,
    /// One record per tracked trade, in directive target order
    pub records: Vec<AggregatedDirective>,
    pub causality: CausalityChain,
}

impl PlanBatch {
    /// Ids of every plan in the batch, record order then slot order
    pub fn plan_ids(&self) -> Vec<Uuid> {
        self.records
            .iter()
            .flat_map(|r| r.plans.iter().map(|p| p.plan_id))
            .collect()
    }
}

/// Lightweight "causality recorded" marker published at run completion
///
/// Carries only identifiers - enough for the audit subsystem to query
/// persisted records by id later, never the payloads themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMarker {
    pub anchor: RunAnchor,
    pub origin: EventId,
    pub directive_id: Option<Uuid>,
    pub plan_ids: Vec<Uuid>,
}
