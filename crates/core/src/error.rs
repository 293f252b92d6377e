#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Input shape mismatch: tool expects {expected}, got {actual}")]
    ShapeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
