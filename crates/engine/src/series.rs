//! Bounded rolling price buffer

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chronological prices of a single asset, oldest first.
///
/// Once `capacity` is exceeded the oldest prices are evicted. Missed fetches
/// are simply never appended; no gaps are modelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    prices: Vec<f64>,
    capacity: usize,
}

impl PriceSeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            prices: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Build a series from existing prices, keeping only the newest `capacity`
    pub fn from_prices(prices: &[f64], capacity: usize) -> Self {
        let mut series = Self::new(capacity);
        for &p in prices {
            series.push(p);
        }
        series
    }

    /// Append a price and evict the oldest ones beyond capacity.
    ///
    /// Non-finite or non-positive prices are dropped and `false` is returned.
    pub fn push(&mut self, price: f64) -> bool {
        if !price.is_finite() || price <= 0.0 {
            debug!(price, "Ignoring invalid price");
            return false;
        }
        self.prices.push(price);
        if self.prices.len() > self.capacity {
            let excess = self.prices.len() - self.capacity;
            self.prices.drain(..excess);
        }
        true
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.prices
    }

    pub fn last(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
