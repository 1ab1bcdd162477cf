use serde::{Deserialize, Serialize};

/// Aggregate view over the live collection, recomputed on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParcelStats {
    pub total_parcels: usize,
    pub delivered_count: usize,
    pub pending_count: usize,
    pub total_cost: f64,
    pub total_weight: f64,
    pub avg_cost: f64,
    pub avg_weight: f64,
    pub delivery_rate: f64,
}

impl ParcelStats {
    pub fn empty() -> Self {
        Self {
            total_parcels: 0,
            delivered_count: 0,
            pending_count: 0,
            total_cost: 0.0,
            total_weight: 0.0,
            avg_cost: 0.0,
            avg_weight: 0.0,
            delivery_rate: 0.0,
        }
    }
}
