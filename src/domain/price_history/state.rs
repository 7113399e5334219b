//! Price series state container — app-owned, SDK-provided update logic.

use crate::domain::price_history::PriceObservation;
use crate::shared::ProductId;
use tokio::sync::watch;

/// Ordered, deduplicated price series for one product.
///
/// Timestamps are non-decreasing; ties keep arrival order. Owned by one
/// product view for its lifetime and discarded when the view unmounts or
/// the product identity changes.
#[derive(Debug)]
pub struct PriceSeries {
    product_id: ProductId,
    observations: Vec<PriceObservation>,
    version: watch::Sender<u64>,
}

impl PriceSeries {
    pub fn new(product_id: ProductId) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            product_id,
            observations: Vec::new(),
            version,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Replace the contents with externally-loaded history.
    ///
    /// Input is trusted to be time-ordered; a stable re-sort runs only when
    /// a misordering is detected, so seeding twice with the same data is a
    /// no-op beyond the change notification.
    pub fn seed(&mut self, mut observations: Vec<PriceObservation>) {
        let ordered = observations
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp);
        if !ordered {
            observations.sort_by_key(|obs| obs.timestamp);
        }
        self.observations = observations;
        self.bump();
    }

    /// Append one live observation at the tail.
    ///
    /// Out-of-order deliveries (strictly older than the tail) and exact
    /// duplicates of the tail entry are silently dropped — a transient
    /// network glitch must not disturb the view.
    pub fn append(&mut self, observation: PriceObservation) {
        if let Some(last) = self.observations.last() {
            if observation.timestamp < last.timestamp {
                tracing::debug!(
                    product_id = %self.product_id,
                    "dropping stale out-of-order observation"
                );
                return;
            }
            if observation.timestamp == last.timestamp && observation.price == last.price {
                return;
            }
        }
        self.observations.push(observation);
        self.bump();
    }

    /// Copy-on-read view of the series; safe while appends continue.
    pub fn snapshot(&self) -> Vec<PriceObservation> {
        self.observations.clone()
    }

    pub fn latest(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Version counter bumped on every mutation; drives chart re-renders.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
