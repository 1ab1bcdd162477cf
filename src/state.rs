use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::AppError;
use crate::observability::metrics::Metrics;
use crate::store::ParcelStore;

pub struct AppState {
    parcels: RwLock<ParcelStore>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: ParcelStore) -> Self {
        let metrics = Metrics::new();
        metrics.parcels_total.set(store.len() as i64);

        Self {
            parcels: RwLock::new(store),
            metrics,
        }
    }

    pub fn store(&self) -> Result<RwLockReadGuard<'_, ParcelStore>, AppError> {
        self.parcels
            .read()
            .map_err(|_| AppError::Internal("parcel store lock poisoned".to_string()))
    }

    pub fn store_mut(&self) -> Result<RwLockWriteGuard<'_, ParcelStore>, AppError> {
        self.parcels
            .write()
            .map_err(|_| AppError::Internal("parcel store lock poisoned".to_string()))
    }
}
