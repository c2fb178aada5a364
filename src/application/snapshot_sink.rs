// Sink trait for pushing dashboard snapshots to a persistence backend
use crate::domain::snapshot::DashboardSnapshot;
use async_trait::async_trait;

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Accept one snapshot. Callers never wait on the result.
    async fn publish(&self, snapshot: DashboardSnapshot) -> anyhow::Result<()>;
}
