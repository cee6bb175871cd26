//! Pipeline Integration Test
//!
//! Drives the full flow through a bootstrapped strategy engine:
//! 1. External tick broadcast at platform scope
//! 2. Flow initiator opens the run and republishes at strategy scope
//! 3. A detector worker writes into the cache and emits the directive
//! 4. The aggregator collects parallel plan fragments, requests the
//!    sequential phase per trade, and emits one batch
//! 5. The terminator clears the cache and publishes the audit marker
//!
//! Parallel planner workers are external collaborators; the tests play
//! their role by publishing plan fragments straight onto the bus. The
//! sequential (execution) planner is a real worker so the recursive
//! request/response leg of the super-step is exercised.

use chrono::{DateTime, TimeZone, Utc};
use kairos_bus::{
    BusError, Disposition, EventMessage, Scope, WiringConfig, Worker, WorkerError,
};
use kairos_cache::{CapabilityRegistry, StrategyCache, WorkerCapabilities};
use kairos_core::{
    CausalityChain, EventId, LinkKind, MarketTick, PlanSlot, PlanSlotSet, PlanningDirective,
    SequentialPlanRequest, TradeId, TradePlan, WorkerId,
};
use kairos_flow::{FlowInitiator, FlowTerminator, TriggerMap};
use kairos_planning::{AggregatorConfig, PlanningAggregator};
use kairos_runner::{AuditRecorder, ExternalTick, Platform, StrategyDefinition, StrategyEngine};
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// DTO the detector caches for downstream consumers
struct DetectedSignal {
    instrument_id: String,
}

/// Turns the run-ready event into a planning directive
struct SignalDetector {
    id: WorkerId,
    trades: Vec<TradeId>,
    slots: PlanSlotSet,
}

impl Worker for SignalDetector {
    fn id(&self) -> &WorkerId {
        &self.id
    }

    fn process(
        &mut self,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError> {
        let tick = event.payload_as::<MarketTick>().expect("tick payload");
        cache.put_result(
            &self.id,
            DetectedSignal {
                instrument_id: tick.instrument_id.clone(),
            },
        )?;

        let directive = PlanningDirective::for_trades(self.trades.clone(), self.slots);
        let causality = event
            .causality
            .extended(LinkKind::Signal, Uuid::new_v4())
            .extended(LinkKind::Directive, directive.directive_id);
        Ok(Disposition::publish("directive-out", directive, causality))
    }
}

/// Answers sequential-phase requests with execution plans
struct ExecutionPlanner {
    id: WorkerId,
}

impl Worker for ExecutionPlanner {
    fn id(&self) -> &WorkerId {
        &self.id
    }

    fn process(
        &mut self,
        event: &EventMessage,
        cache: &StrategyCache,
    ) -> Result<Disposition, WorkerError> {
        let request = event
            .payload_as::<SequentialPlanRequest>()
            .expect("sequential request payload");

        // The declared dependency set must be complete by now
        let dtos = cache.required_dtos(&self.id)?;
        let signal = dtos.get::<DetectedSignal>().expect("declared dependency");
        assert!(!signal.instrument_id.is_empty());

        let plan = TradePlan::new(request.trade_id.clone(), PlanSlot::Execution);
        Ok(Disposition::publish(
            "plan-out",
            plan,
            event.causality.clone(),
        ))
    }
}

fn build_engine(
    strategy: &str,
    trades: Vec<TradeId>,
    slots: PlanSlotSet,
) -> (Arc<StrategyEngine>, AuditRecorder) {
    let mut registry = CapabilityRegistry::new();
    registry.register(
        "flow-init",
        WorkerCapabilities::new().with_connector("run-ready"),
    );
    registry.register(
        "signal-detector",
        WorkerCapabilities::new()
            .produces::<DetectedSignal>()
            .with_connector("directive-out"),
    );
    registry.register(
        "aggregator",
        WorkerCapabilities::new()
            .with_connector("sequential-request")
            .with_connector("batch-out"),
    );
    registry.register(
        "exec-planner",
        WorkerCapabilities::new()
            .requires::<DetectedSignal>()
            .with_connector("plan-out"),
    );
    registry.register(
        "flow-term",
        WorkerCapabilities::new().with_connector("run-recorded"),
    );

    let wiring = WiringConfig::new()
        .subscribe("flow-init", "tick.market-data", Scope::Platform)
        .publish("flow-init", "run-ready", "strategy.run-ready", Scope::Strategy)
        .subscribe("signal-detector", "strategy.run-ready", Scope::Strategy)
        .publish("signal-detector", "directive-out", "plan.directive", Scope::Strategy)
        .subscribe("aggregator", "plan.directive", Scope::Strategy)
        .subscribe("aggregator", "plan.fragment", Scope::Strategy)
        .publish("aggregator", "sequential-request", "plan.sequential", Scope::Strategy)
        .publish("aggregator", "batch-out", "plan.batch", Scope::Strategy)
        .subscribe("exec-planner", "plan.sequential", Scope::Strategy)
        .publish("exec-planner", "plan-out", "plan.fragment", Scope::Strategy)
        .subscribe("flow-term", "plan.batch", Scope::Strategy)
        .publish("flow-term", "run-recorded", "audit.run-recorded", Scope::Platform);

    let definition = StrategyDefinition {
        strategy_id: strategy.into(),
        wiring,
        registry,
        triggers: TriggerMap::new().map("tick.market-data", "run-ready"),
        initiator: WorkerId::from("flow-init"),
    };

    let workers: Vec<Arc<Mutex<dyn Worker>>> = vec![
        Arc::new(Mutex::new(FlowInitiator::new(
            "flow-init",
            TriggerMap::new().map("tick.market-data", "run-ready"),
        ))),
        Arc::new(Mutex::new(SignalDetector {
            id: WorkerId::from("signal-detector"),
            trades,
            slots,
        })),
        Arc::new(Mutex::new(PlanningAggregator::new(
            "aggregator",
            AggregatorConfig::default(),
        ))),
        Arc::new(Mutex::new(ExecutionPlanner {
            id: WorkerId::from("exec-planner"),
        })),
        Arc::new(Mutex::new(FlowTerminator::new("flow-term", "run-recorded"))),
    ];

    let engine = Arc::new(StrategyEngine::bootstrap(definition, workers).unwrap());
    let recorder = AuditRecorder::new();
    recorder
        .attach(engine.bus(), "audit.run-recorded", Scope::Platform, None)
        .unwrap();
    (engine, recorder)
}

fn t(seconds: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, seconds).unwrap()
}

fn tick_at(seconds: u32) -> ExternalTick {
    ExternalTick::new(
        "tick.market-data",
        t(seconds),
        MarketTick::new("BTC-USD", dec!(50000), t(seconds)),
    )
}

/// Publish a plan fragment the way an external parallel planner would
fn feed_plan(engine: &StrategyEngine, trade: &str, slot: PlanSlot) -> kairos_bus::Result<()> {
    let timestamp = engine.cache().run_anchor().unwrap().timestamp();
    let event = EventMessage::strategy(
        "plan.fragment",
        engine.strategy_id().clone(),
        timestamp,
        CausalityChain::root(EventId::generate()),
        TradePlan::new(trade, slot),
    );
    engine.bus().publish(&event)
}

#[test]
fn test_two_trade_run_completes_end_to_end() {
    let (engine, recorder) = build_engine(
        "s1",
        vec![TradeId::from("TRD_1"), TradeId::from("TRD_2")],
        PlanSlotSet::all(),
    );

    engine.dispatch(&tick_at(0)).unwrap();
    assert!(engine.cache().is_active());

    // Parallel phase for TRD_1: its exit fragment triggers the
    // sequential request, the execution planner answers inside the same
    // super-step, and TRD_1 finishes while TRD_2 has nothing yet.
    feed_plan(&engine, "TRD_1", PlanSlot::Entry).unwrap();
    feed_plan(&engine, "TRD_1", PlanSlot::Size).unwrap();
    feed_plan(&engine, "TRD_1", PlanSlot::Exit).unwrap();
    assert_eq!(recorder.count(), 0);

    feed_plan(&engine, "TRD_2", PlanSlot::Size).unwrap();
    feed_plan(&engine, "TRD_2", PlanSlot::Entry).unwrap();
    feed_plan(&engine, "TRD_2", PlanSlot::Exit).unwrap();

    // TRD_2's execution answer completed the batch: terminator ran,
    // cache cleared, exactly one marker recorded.
    assert_eq!(recorder.count(), 1);
    assert!(!engine.cache().is_active());

    let marker = recorder.markers().remove(0);
    assert_eq!(marker.anchor.timestamp(), t(0));
    assert_eq!(marker.plan_ids.len(), 8);
    assert!(marker.directive_id.is_some());
}

#[test]
fn test_exit_only_directive_skips_sequential_phase() {
    let (engine, recorder) = build_engine(
        "s1",
        vec![TradeId::from("TRD_1"), TradeId::from("TRD_2")],
        PlanSlotSet::empty().with(PlanSlot::Exit),
    );

    engine.dispatch(&tick_at(0)).unwrap();

    feed_plan(&engine, "TRD_1", PlanSlot::Exit).unwrap();
    assert_eq!(recorder.count(), 0);
    feed_plan(&engine, "TRD_2", PlanSlot::Exit).unwrap();

    // Two exit fragments were enough; nothing waited on entry, size, or
    // execution.
    assert_eq!(recorder.count(), 1);
    assert_eq!(recorder.markers()[0].plan_ids.len(), 2);
    assert!(!engine.cache().is_active());
}

#[test]
fn test_untracked_trade_fragment_propagates_to_supervisor() {
    let (engine, recorder) = build_engine(
        "s1",
        vec![TradeId::from("TRD_1")],
        PlanSlotSet::empty().with(PlanSlot::Exit),
    );

    engine.dispatch(&tick_at(0)).unwrap();

    let err = feed_plan(&engine, "TRD_9", PlanSlot::Exit).unwrap_err();
    assert!(matches!(err, BusError::Worker { .. }));
    assert!(err.to_string().contains("untracked trade"));
    assert_eq!(recorder.count(), 0);
}

#[test]
fn test_overlapping_tick_aborts_and_next_tick_recovers() {
    let (engine, _recorder) = build_engine(
        "s1",
        vec![TradeId::from("TRD_1")],
        PlanSlotSet::all(),
    );

    // First tick leaves an incomplete run behind (no fragments fed)
    engine.dispatch(&tick_at(0)).unwrap();
    assert!(engine.cache().is_active());

    // Second tick hits the reentrancy guard; the engine force-clears
    let err = engine.dispatch(&tick_at(1)).unwrap_err();
    assert!(err.to_string().contains("run already active"));
    assert!(!engine.cache().is_active());

    // Third tick starts clean; the aggregator abandons the stale state
    engine.dispatch(&tick_at(2)).unwrap();
    assert!(engine.cache().is_active());

    let stats = engine.stats();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.failed_runs, 1);
}

#[test]
fn test_same_timestamp_redispatch_after_completion_succeeds() {
    let (engine, recorder) = build_engine(
        "s1",
        vec![TradeId::from("TRD_1")],
        PlanSlotSet::empty().with(PlanSlot::Exit),
    );

    engine.dispatch(&tick_at(0)).unwrap();
    feed_plan(&engine, "TRD_1", PlanSlot::Exit).unwrap();
    assert_eq!(recorder.count(), 1);

    // Cache was cleared by the terminator; the same anchor may open a
    // fresh run on the next tick.
    engine.dispatch(&tick_at(0)).unwrap();
    assert!(engine.cache().is_active());
    feed_plan(&engine, "TRD_1", PlanSlot::Exit).unwrap();
    assert_eq!(recorder.count(), 2);
}

#[tokio::test]
async fn test_platform_fans_out_to_isolated_instances() {
    let (alpha, _) = build_engine("alpha", vec![TradeId::from("TRD_1")], PlanSlotSet::all());
    let (beta, _) = build_engine("beta", vec![TradeId::from("TRD_1")], PlanSlotSet::all());

    let platform = Platform::new(64);
    let handle_a = platform.spawn(Arc::clone(&alpha));
    let handle_b = platform.spawn(Arc::clone(&beta));
    assert_eq!(platform.engine_count(), 2);

    // Two ticks; the second overlaps the first's incomplete run in both
    // instances, independently.
    platform.broadcast(tick_at(0));
    platform.broadcast(tick_at(1));

    // Closing the tick channel lets the tasks drain and exit
    drop(platform);
    handle_a.await.unwrap();
    handle_b.await.unwrap();

    for engine in [&alpha, &beta] {
        let stats = engine.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.failed_runs, 1);
        assert!(!engine.cache().is_active());
    }
}
