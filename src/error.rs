use thiserror::Error;

/// Errors surfaced by featurization, model IO and reconstruction.
#[derive(Debug, Error)]
pub enum ReflowError {
    /// A corpus line in annotated mode did not start with '*' or '+'.
    #[error("line {line} has no annotation marker ('*' or '+')")]
    MissingAnnotation { line: usize },

    /// The classifier returned a different number of labels than input lines.
    #[error("classifier returned {predictions} predictions for {lines} lines")]
    PredictionMismatch { lines: usize, predictions: usize },

    /// A model or features file could not be parsed.
    #[error("malformed model or features data: {0}")]
    ModelFormat(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
