#[cfg(feature = "metrics")]
pub use self::otel::{StructureMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram, MeterProvider},
    };
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};

    pub static METRICS: Lazy<StructureMetrics> = Lazy::new(StructureMetrics::init);

    pub struct StructureMetrics {
        pub registry: Registry,
        pub statements_total: Counter<u64>,
        pub statement_errors_total: Counter<u64>,
        pub tables_converged_total: Counter<u64>,
        pub convergence_duration: Histogram<f64>,
        _provider: Option<SdkMeterProvider>,
    }

    impl StructureMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let provider = match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => Some(SdkMeterProvider::builder().with_reader(exporter).build()),
                Err(e) => {
                    log::warn!("Prometheus exporter unavailable, metrics stay in the global meter: {e}");
                    None
                }
            };
            let meter = match &provider {
                Some(p) => p.meter("tablewright"),
                None => global::meter("tablewright"),
            };

            let statements_total = meter
                .u64_counter("tablewright_statements_total")
                .with_description("Total DDL/DML statements issued while converging")
                .build();

            let statement_errors_total = meter
                .u64_counter("tablewright_statement_errors_total")
                .with_description("Statements rejected by the database")
                .build();

            let tables_converged_total = meter
                .u64_counter("tablewright_tables_converged_total")
                .with_description("Tables and views checked against the live catalog")
                .build();

            let convergence_duration = meter
                .f64_histogram("tablewright_convergence_duration_seconds")
                .with_description("Duration of a full registry convergence")
                .build();

            Self {
                registry,
                statements_total,
                statement_errors_total,
                tables_converged_total,
                convergence_duration,
                _provider: provider,
            }
        }

        pub fn record_statement(&self) {
            self.statements_total.add(1, &[]);
        }

        pub fn record_statement_error(&self) {
            self.statement_errors_total.add(1, &[]);
        }

        pub fn record_table_converged(&self) {
            self.tables_converged_total.add(1, &[]);
        }

        pub fn record_convergence_duration(&self, elapsed: std::time::Duration) {
            self.convergence_duration.record(elapsed.as_secs_f64(), &[]);
        }

        /// Prometheus text exposition of everything recorded so far
        pub fn render(&self) -> String {
            let mut buffer = Vec::new();
            if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
                log::warn!("Failed to encode metrics: {e}");
            }
            String::from_utf8(buffer).unwrap_or_default()
        }
    }
}

/// Span constructors for the convergence steps
#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{info_span, Span};

    pub fn run_structure_span(tables: usize, views: usize) -> Span {
        info_span!("tablewright.run", tables, views)
    }

    pub fn check_table_span(table: &str) -> Span {
        info_span!("tablewright.check_table", table)
    }

    pub fn check_view_span(view: &str) -> Span {
        info_span!("tablewright.check_view", view)
    }

    pub fn execute_statement_span(sql: &str) -> Span {
        // Long CREATE statements are truncated in the span field
        let statement: String = sql.chars().take(200).collect();
        info_span!("tablewright.execute", statement = %statement)
    }
}
