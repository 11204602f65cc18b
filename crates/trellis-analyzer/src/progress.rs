//! Progress reporting for analysis passes

/// Receives progress of a pass. `report` is called once before the first
/// level is dispatched and again after every level settles.
pub trait ProgressSink: Send + Sync {
    fn begin(&self) {}

    fn report(&self, visited: usize, total: usize);

    fn end(&self) {}
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, visited: usize, total: usize) {
        self(visited, total)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _visited: usize, _total: usize) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn begin(&self) {
        tracing::info!("Analyzing project");
    }

    fn report(&self, visited: usize, total: usize) {
        tracing::info!("{}/{} models ({:.0}%)", visited, total, percentage(visited, total));
    }

    fn end(&self) {
        tracing::info!("Project analysis completed");
    }
}

/// Share of visited models, 100 for an empty project.
pub fn percentage(visited: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (visited as f64 * 100.0) / total as f64
}
