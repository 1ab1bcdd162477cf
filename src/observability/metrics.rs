use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub parcels_total: IntGauge,
    pub store_operations_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let parcels_total = IntGauge::new("parcels_total", "Current number of stored parcels")
            .expect("valid parcels_total metric");

        let store_operations_total = IntCounterVec::new(
            Opts::new(
                "store_operations_total",
                "Store operations by kind and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid store_operations_total metric");

        registry
            .register(Box::new(parcels_total.clone()))
            .expect("register parcels_total");
        registry
            .register(Box::new(store_operations_total.clone()))
            .expect("register store_operations_total");

        Self {
            registry,
            parcels_total,
            store_operations_total,
        }
    }

    pub fn record(&self, operation: &str, outcome: &str) {
        self.store_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
