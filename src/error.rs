/// Failure kinds of the question-answering pipeline.
///
/// The `Display` text of `Generation` and `WebFallback` is folded verbatim into
/// composite answers, so keep it short and human readable.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    /// Index build input or query vector has the wrong shape.
    #[error("retrieval failed: {0}")]
    Retrieval(String),
    /// The embedding service is unreachable or returned unusable output.
    #[error("embedding service failed: {0}")]
    Embedding(String),
    /// The generation service is unreachable or answered with a non-success status.
    #[error("{0}")]
    Generation(String),
    /// The web search call failed. Never propagated past the orchestrator.
    #[error("Error in web search: {0}")]
    WebFallback(String),
}

pub type QaResult<T> = std::result::Result<T, QaError>;
