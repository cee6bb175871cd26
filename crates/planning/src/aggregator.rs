//! The planning aggregator worker
//!
//! Per-run state machine:
//!
//! 1. **Init** - the directive fixes the tracked trade set and the
//!    expected slot set; neither grows mid-run.
//! 2. **Parallel collection** - entry/size/exit plans arrive in any
//!    order and any interleaving across trades. When one trade's
//!    parallel slots are complete (and it expects an execution plan), a
//!    "ready for sequential" request goes out for that trade alone.
//! 3. **Sequential collection** - execution plans arrive per trade.
//! 4. **Batch check** - after every insert: when every tracked trade has
//!    every expected slot, one batch goes out and the state resets.
//!
//! Correctness depends only on set-membership completeness, never on
//! arrival sequence. Duplicates are errors, not overwrites.

use crate::error::AggregatorError;
use kairos_bus::{Disposition, EventMessage, Worker, WorkerError};
use kairos_cache::StrategyCache;
use kairos_core::{
    AggregatedDirective, CausalityChain, ConnectorId, DirectiveTargets, LinkKind, PlanBatch,
    PlanSlot, PlanSlotSet, PlanningDirective, RunAnchor, SequentialPlanRequest, TradeId,
    TradePlan, WorkerId,
};
use std::collections::HashMap;

/// Aggregator wiring knobs
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Connector for per-trade "ready for sequential" requests
    pub sequential_connector: ConnectorId,
    /// Connector for the final batch
    pub batch_connector: ConnectorId,
    /// Prefix for synthesized new-trade identifiers
    pub new_trade_prefix: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            sequential_connector: ConnectorId::from("sequential-request"),
            batch_connector: ConnectorId::from("batch-out"),
            new_trade_prefix: "TRD-NEW".to_string(),
        }
    }
}

/// Slot progress for one tracked trade
struct TradeProgress {
    expected: PlanSlotSet,
    filled: HashMap<PlanSlot, TradePlan>,
    sequential_requested: bool,
}

impl TradeProgress {
    fn new(expected: PlanSlotSet) -> Self {
        Self {
            expected,
            filled: HashMap::new(),
            sequential_requested: false,
        }
    }

    fn parallel_complete(&self) -> bool {
        self.expected
            .parallel()
            .iter()
            .all(|slot| self.filled.contains_key(&slot))
    }

    fn complete(&self) -> bool {
        self.expected.iter().all(|slot| self.filled.contains_key(&slot))
    }
}

/// State for the run currently being aggregated
struct ActiveRun {
    anchor: RunAnchor,
    directive_id: uuid::Uuid,
    /// Grows one plan link per insert; stamped on everything emitted
    causality: CausalityChain,
    /// Directive target order, preserved for the batch
    order: Vec<TradeId>,
    trades: HashMap<TradeId, TradeProgress>,
}

/// Per-strategy fan-in coordinator for trade planning
pub struct PlanningAggregator {
    id: WorkerId,
    config: AggregatorConfig,
    run: Option<ActiveRun>,
}

impl PlanningAggregator {
    pub fn new(id: impl Into<WorkerId>, config: AggregatorConfig) -> Self {
        Self {
            id: id.into(),
            config,
            run: None,
        }
    }

    /// Trades still being tracked (diagnostics)
    pub fn tracked_trades(&self) -> usize {
        self.run.as_ref().map(|r| r.trades.len()).unwrap_or(0)
    }

    fn init(
        &mut self,
        directive: &PlanningDirective,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError> {
        let anchor = cache.run_anchor()?;

        // A second directive mid-aggregation in the same tick raises;
        // completion already emptied `run`, and a post-completion
        // duplicate dies on the cleared cache above. A differing anchor
        // means the previous tick never finished - cross-tick planning
        // is out of scope, so that state is lost at the boundary.
        if let Some(stale) = self.run.take() {
            if stale.anchor == anchor {
                self.run = Some(stale);
                return Err(AggregatorError::Reentrant { anchor }.into());
            }
            log::warn!(
                "{}: abandoning incomplete aggregation for {} ({} trade(s))",
                self.id,
                stale.anchor,
                stale.trades.len()
            );
        }

        if directive.requested.is_empty() {
            return Err(AggregatorError::InvalidDirective {
                directive_id: directive.directive_id,
                reason: "no plan slots requested".to_string(),
            }
            .into());
        }

        let order = match &directive.targets {
            DirectiveTargets::NewTrade => {
                vec![TradeId::new(format!(
                    "{}-{}",
                    self.config.new_trade_prefix,
                    directive.directive_id.simple()
                ))]
            }
            DirectiveTargets::Existing(ids) if ids.is_empty() => {
                return Err(AggregatorError::InvalidDirective {
                    directive_id: directive.directive_id,
                    reason: "no target trades".to_string(),
                }
                .into());
            }
            DirectiveTargets::Existing(ids) => ids.clone(),
        };

        let mut trades = HashMap::with_capacity(order.len());
        for trade_id in &order {
            if trades
                .insert(trade_id.clone(), TradeProgress::new(directive.requested))
                .is_some()
            {
                return Err(AggregatorError::InvalidDirective {
                    directive_id: directive.directive_id,
                    reason: format!("duplicate target trade {trade_id}"),
                }
                .into());
            }
        }

        // Contribute the directive id to the chain unless the producer
        // already did.
        let causality = if event
            .causality
            .ids_of_kind(LinkKind::Directive)
            .contains(&directive.directive_id)
        {
            event.causality.clone()
        } else {
            event
                .causality
                .extended(LinkKind::Directive, directive.directive_id)
        };

        log::info!(
            "{}: tracking {} trade(s) x {} slot(s) for {}",
            self.id,
            order.len(),
            directive.requested.len(),
            anchor
        );

        self.run = Some(ActiveRun {
            anchor,
            directive_id: directive.directive_id,
            causality,
            order,
            trades,
        });
        Ok(Disposition::Continue)
    }

    fn collect(&mut self, plan: &TradePlan) -> Result<Disposition, WorkerError> {
        let run = self
            .run
            .as_mut()
            .ok_or_else(|| AggregatorError::PlanWithoutDirective {
                trade_id: plan.trade_id.clone(),
            })?;

        let progress =
            run.trades
                .get_mut(&plan.trade_id)
                .ok_or_else(|| AggregatorError::UnexpectedTrade {
                    trade_id: plan.trade_id.clone(),
                })?;

        if !progress.expected.contains(plan.slot) {
            return Err(AggregatorError::UnexpectedSlot {
                trade_id: plan.trade_id.clone(),
                slot: plan.slot,
            }
            .into());
        }
        if progress.filled.contains_key(&plan.slot) {
            return Err(AggregatorError::DuplicateSlot {
                trade_id: plan.trade_id.clone(),
                slot: plan.slot,
            }
            .into());
        }

        progress.filled.insert(plan.slot, plan.clone());
        run.causality = run.causality.extended(LinkKind::Plan, plan.plan_id);

        // Per-trade phase transition, independent of the other trades'
        // progress. Skipped when the execution plan somehow pre-arrived;
        // completeness, not sequence, is what matters.
        if plan.slot.is_parallel()
            && progress.parallel_complete()
            && progress.expected.expects_execution()
            && !progress.sequential_requested
            && !progress.filled.contains_key(&PlanSlot::Execution)
        {
            progress.sequential_requested = true;
            let request = SequentialPlanRequest {
                directive_id: run.directive_id,
                trade_id: plan.trade_id.clone(),
            };
            log::debug!("{}: {} ready for sequential phase", self.id, plan.trade_id);
            return Ok(Disposition::publish(
                self.config.sequential_connector.clone(),
                request,
                run.causality.clone(),
            ));
        }

        if run.trades.values().all(TradeProgress::complete) {
            return Ok(self.emit_batch());
        }
        Ok(Disposition::Continue)
    }

    fn emit_batch(&mut self) -> Disposition {
        // The completeness check just passed; the run is consumed whole.
        let Some(mut run) = self.run.take() else {
            return Disposition::Continue;
        };

        let records = run
            .order
            .iter()
            .map(|trade_id| {
                let progress = run
                    .trades
                    .remove(trade_id)
                    .unwrap_or_else(|| TradeProgress::new(PlanSlotSet::empty()));
                let plans = progress
                    .expected
                    .iter()
                    .filter_map(|slot| progress.filled.get(&slot).cloned())
                    .collect();
                AggregatedDirective {
                    trade_id: trade_id.clone(),
                    plans,
                }
            })
            .collect::<Vec<_>>();

        let batch = PlanBatch {
            directive_id: run.directive_id,
            records,
            causality: run.causality.clone(),
        };

        log::info!(
            "{}: batch complete for {} ({} record(s))",
            self.id,
            run.anchor,
            batch.records.len()
        );

        Disposition::publish(self.config.batch_connector.clone(), batch, run.causality)
    }
}

impl Worker for PlanningAggregator {
    fn id(&self) -> &WorkerId {
        &self.id
    }

    fn process(
        &mut self,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError> {
        if let Some(directive) = event.payload_as::<PlanningDirective>() {
            self.init(&directive, event, cache)
        } else if let Some(plan) = event.payload_as::<TradePlan>() {
            self.collect(&plan)
        } else {
            Err(AggregatorError::MalformedEvent(event.name.clone()).into())
        }
    }
}
