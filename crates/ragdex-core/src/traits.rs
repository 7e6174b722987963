//! Seams to external collaborators: the embedding model, the progress
//! transport and the job record store. The core treats all three as opaque.

pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    /// Must be deterministic per model id; a failure aborts the calling
    /// build or search, nothing is retried here.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// One-directional status channel keyed by build id. Calls are
/// fire-and-forget; a sink with no subscriber may drop messages.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, build_id: &str, message: &str);
}

/// Terminal-status reporting for builds. The core writes status and never
/// reads it back.
pub trait JobStore: Send + Sync {
    fn set_running(&self, job_id: &str);
    fn set_done(&self, job_id: &str, index_name: &str);
    fn set_error(&self, job_id: &str, message: &str);
}
