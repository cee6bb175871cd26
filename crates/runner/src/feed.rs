//! Feeds - platform-scoped data providers
//!
//! The only shared singletons in the design. Readers across strategy
//! instances share object references safely because published windows
//! are frozen: every publish builds a fresh immutable snapshot, and the
//! consumer-facing trait exposes read accessors and subscription only,
//! never a mutable handle.
//!
//! The tick simulator drives demos and tests with a seeded random walk,
//! so runs are reproducible.

use chrono::Utc;
use kairos_core::MarketTick;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Read-only view of a rolling window of feed items
///
/// This is all a strategy consumer ever sees of a provider.
pub trait SharedWindow<T: Clone>: Send + Sync {
    /// The current window, newest last, as a frozen shared sequence
    fn snapshot(&self) -> Arc<[T]>;

    /// The most recent item, if any
    fn latest(&self) -> Option<T>;

    /// Register for live items
    fn subscribe(&self) -> broadcast::Receiver<T>;
}

/// Rolling window with copy-on-publish snapshots
pub struct RollingWindowFeed<T> {
    capacity: usize,
    window: Mutex<Arc<[T]>>,
    tx: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> RollingWindowFeed<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            capacity,
            window: Mutex::new(Arc::from(Vec::new())),
            tx,
        }
    }

    /// Append an item, rebuilding the frozen window
    ///
    /// Existing snapshot holders keep the sequence they already have;
    /// nobody ever observes a mutation.
    pub fn publish(&self, item: T) {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next: Vec<T> = window.iter().cloned().collect();
        if next.len() == self.capacity {
            next.remove(0);
        }
        next.push(item.clone());
        *window = Arc::from(next);
        drop(window);

        // No subscribers is fine
        let _ = self.tx.send(item);
    }

    pub fn len(&self) -> usize {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync + 'static> SharedWindow<T> for RollingWindowFeed<T> {
    fn snapshot(&self) -> Arc<[T]> {
        Arc::clone(&self.window.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn latest(&self) -> Option<T> {
        self.snapshot().last().cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<T> {
        self.tx.subscribe()
    }
}

/// Configuration for the tick feed simulator
#[derive(Debug, Clone)]
pub struct TickFeedConfig {
    /// Starting prices per instrument
    pub initial_prices: HashMap<String, Decimal>,
    /// Random-walk step as basis points of the current price
    pub step_bps: i64,
    /// Rolling window capacity
    pub window: usize,
}

impl Default for TickFeedConfig {
    fn default() -> Self {
        let mut initial_prices = HashMap::new();
        initial_prices.insert("BTC-USD".to_string(), Decimal::from(50_000));
        initial_prices.insert("ETH-USD".to_string(), Decimal::from(3_000));

        Self {
            initial_prices,
            step_bps: 5,
            window: 256,
        }
    }
}

/// Seeded random-walk tick source feeding a rolling window
pub struct TickFeedSimulator {
    prices: HashMap<String, Decimal>,
    config: TickFeedConfig,
    feed: Arc<RollingWindowFeed<MarketTick>>,
    rng: StdRng,
}

impl TickFeedSimulator {
    pub fn new(config: TickFeedConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Create with a specific seed for reproducible runs
    pub fn with_seed(config: TickFeedConfig, seed: u64) -> Self {
        let feed = Arc::new(RollingWindowFeed::new(config.window));
        let prices = config.initial_prices.clone();
        Self {
            prices,
            config,
            feed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The read-only window handed to consumers
    pub fn window(&self) -> Arc<dyn SharedWindow<MarketTick>> {
        Arc::clone(&self.feed) as Arc<dyn SharedWindow<MarketTick>>
    }

    /// Generate and publish the next tick
    pub fn tick(&mut self) -> MarketTick {
        let instruments: Vec<_> = self.prices.keys().cloned().collect();
        let instrument = &instruments[self.rng.gen_range(0..instruments.len())];

        let current = self.prices[instrument];
        let bps: i64 = self.rng.gen_range(-self.config.step_bps..=self.config.step_bps);
        let next = current + current * Decimal::new(bps, 4);
        self.prices.insert(instrument.clone(), next);

        let tick = MarketTick::new(instrument.clone(), next, Utc::now());
        self.feed.publish(tick.clone());
        tick
    }
}
