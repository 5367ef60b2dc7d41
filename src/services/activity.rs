use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One recorded activity: who did what to which entity.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub actor: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub description: String,
    pub meta: Value,
}

impl ActivityEntry {
    pub fn new(
        actor: Option<Uuid>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: Uuid,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id,
            description: description.into(),
            meta: Value::Null,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = meta;
        self
    }
}

/// Best-effort activity recording capability, supplied by the caller layer.
/// The workflows report through it and move on; a failing sink is logged and
/// never surfaces as a workflow error.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: ActivityEntry) -> anyhow::Result<()>;
}

/// Default sink: forwards entries to the tracing pipeline.
#[derive(Debug, Clone, Default)]
pub struct TracingActivitySink;

#[async_trait]
impl ActivitySink for TracingActivitySink {
    async fn record(&self, entry: ActivityEntry) -> anyhow::Result<()> {
        info!(
            actor = ?entry.actor,
            action = %entry.action,
            entity_type = %entry.entity_type,
            entity_id = %entry.entity_id,
            meta = %entry.meta,
            "{}",
            entry.description
        );
        Ok(())
    }
}

/// Fire-and-forget wrapper used by every workflow.
pub async fn record_activity(sink: &Arc<dyn ActivitySink>, entry: ActivityEntry) {
    let action = entry.action.clone();
    if let Err(e) = sink.record(entry).await {
        warn!(action = %action, "Activity sink failed: {}", e);
    }
}

/// Optional side-channel cleanup invoked while reversing a document: callers
/// that keep derived records keyed by document id (legacy movement logs,
/// report caches) register an implementation; the workflows call it
/// best-effort during cancellation. Replaces runtime existence probing with
/// a typed capability.
#[async_trait]
pub trait ReversalCleanup: Send + Sync {
    async fn purge_document_refs(&self, document_id: Uuid) -> anyhow::Result<()>;
}

/// Best-effort wrapper for the optional cleanup hook.
pub async fn purge_refs_best_effort(hook: &Option<Arc<dyn ReversalCleanup>>, document_id: Uuid) {
    if let Some(hook) = hook {
        if let Err(e) = hook.purge_document_refs(document_id).await {
            warn!(document_id = %document_id, "Reversal cleanup hook failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl ActivitySink for FailingSink {
        async fn record(&self, _entry: ActivityEntry) -> anyhow::Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    #[tokio::test]
    async fn failing_sink_is_swallowed() {
        let sink: Arc<dyn ActivitySink> = Arc::new(FailingSink);
        // Must not panic or propagate
        record_activity(
            &sink,
            ActivityEntry::new(None, "approve_stock_in", "StockIn", Uuid::new_v4(), "test"),
        )
        .await;
    }

    #[tokio::test]
    async fn missing_cleanup_hook_is_a_noop() {
        purge_refs_best_effort(&None, Uuid::new_v4()).await;
    }
}
