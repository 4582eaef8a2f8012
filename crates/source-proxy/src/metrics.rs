//! Operation counters
//!
//! The proxy reports every operation to a [`ProxyMetrics`] sink: one
//! `Started` when it begins, then exactly one `Completed` or `Errored`.
//! The sink owns the counter state; [`Counters`] is the default, emitting
//! `metrics` counters into its own Prometheus recorder.

use std::fmt;
use std::sync::Arc;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Fetch,
    FetchNext,
    Store,
}

impl Operation {
    pub const ALL: [Self; 3] = [Self::Fetch, Self::FetchNext, Self::Store];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fetch => "Get",
            Self::FetchNext => "GetNext",
            Self::Store => "Export",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Fetch => 0,
            Self::FetchNext => 1,
            Self::Store => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Started,
    Completed,
    Errored,
}

impl Outcome {
    pub const ALL: [Self; 3] = [Self::Started, Self::Completed, Self::Errored];

    const fn help(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Errored => "with errors",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Started => 0,
            Self::Completed => 1,
            Self::Errored => 2,
        }
    }
}

const METRIC_NAMES: [[&str; 3]; 3] = [
    [
        "source_proxy_gets_started_total",
        "source_proxy_gets_completed_total",
        "source_proxy_gets_errored_total",
    ],
    [
        "source_proxy_get_nexts_started_total",
        "source_proxy_get_nexts_completed_total",
        "source_proxy_get_nexts_errored_total",
    ],
    [
        "source_proxy_exports_started_total",
        "source_proxy_exports_completed_total",
        "source_proxy_exports_errored_total",
    ],
];

/// Returns the counter name for `op` and `outcome`, such as
/// `source_proxy_gets_started_total`.
#[must_use]
pub const fn metric_name(op: Operation, outcome: Outcome) -> &'static str {
    METRIC_NAMES[op.index()][outcome.index()]
}

/// Observability sink for operation counts.
pub trait ProxyMetrics: Send + Sync + 'static {
    fn record(&self, op: Operation, outcome: Outcome);

    /// Renders the current counts in the Prometheus text format, if the sink
    /// keeps them locally.
    fn render(&self) -> Option<String> {
        None
    }
}

impl<T: ProxyMetrics> ProxyMetrics for Arc<T> {
    fn record(&self, op: Operation, outcome: Outcome) {
        (**self).record(op, outcome);
    }

    fn render(&self) -> Option<String> {
        (**self).render()
    }
}

/// Increment-only counters kept in a private Prometheus recorder.
///
/// Every counter is registered at zero on creation, so `/metrics` lists all
/// nine from the start.
pub struct Counters {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl Counters {
    #[must_use]
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            for op in Operation::ALL {
                for outcome in Outcome::ALL {
                    let name = metric_name(op, outcome);
                    describe_counter!(name, format!("The number of {} events {}", op.name(), outcome.help()));
                    counter!(name).absolute(0);
                }
            }
        });

        Self { recorder, handle }
    }

    #[must_use]
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Reads one counter back from the rendered exposition.
    #[must_use]
    pub fn get(&self, op: Operation, outcome: Outcome) -> u64 {
        let name = metric_name(op, outcome);
        self.handle
            .render()
            .lines()
            .find_map(|line| line.strip_prefix(name)?.strip_prefix(' ')?.trim().parse().ok())
            .unwrap_or(0)
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counters").finish_non_exhaustive()
    }
}

impl ProxyMetrics for Counters {
    fn record(&self, op: Operation, outcome: Outcome) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(metric_name(op, outcome)).increment(1);
        });
    }

    fn render(&self) -> Option<String> {
        Some(self.handle.render())
    }
}

/// Records `Started` on creation and `Errored` on drop unless
/// [`complete`](Self::complete) was called.
///
/// A request future dropped mid-flight therefore still counts as errored.
pub(crate) struct OperationGuard<'a> {
    metrics: &'a dyn ProxyMetrics,
    op: Operation,
    done: bool,
}

impl<'a> OperationGuard<'a> {
    pub(crate) fn start(metrics: &'a dyn ProxyMetrics, op: Operation) -> Self {
        metrics.record(op, Outcome::Started);
        Self { metrics, op, done: false }
    }

    pub(crate) fn complete(mut self) {
        self.done = true;
        self.metrics.record(self.op, Outcome::Completed);
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.metrics.record(self.op, Outcome::Errored);
        }
    }
}
