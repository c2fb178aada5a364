// Snapshot sink that writes snapshots to the structured log
use crate::application::snapshot_sink::SnapshotSink;
use crate::domain::snapshot::DashboardSnapshot;
use anyhow::Context;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct TracingSnapshotSink;

#[async_trait]
impl SnapshotSink for TracingSnapshotSink {
    async fn publish(&self, snapshot: DashboardSnapshot) -> anyhow::Result<()> {
        let payload = serde_json::to_string(&snapshot).context("Failed to encode snapshot")?;
        tracing::info!(
            target: "parking_occupancy::snapshot",
            session_id = %snapshot.session_id,
            tick = snapshot.tick,
            "{}",
            payload
        );
        Ok(())
    }
}
