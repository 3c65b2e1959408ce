use thiserror::Error;

/// Failure to compile or evaluate a template
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template source is malformed; every render with it would fail
    #[error("failed to compile template '{template}': {source}")]
    Compile {
        template: String,
        #[source]
        source: minijinja::Error,
    },
    /// A render referenced something the context does not provide
    #[error("failed to evaluate template '{template}' at `{reference}`: {source}")]
    Evaluation {
        template: String,
        /// Offending source snippet, `<unknown>` when the engine gives no span
        reference: String,
        #[source]
        source: minijinja::Error,
    },
}

impl TemplateError {
    pub fn template(&self) -> &str {
        match self {
            TemplateError::Compile { template, .. } | TemplateError::Evaluation { template, .. } => {
                template
            }
        }
    }
}

/// Failure of a single comment build
#[derive(Debug, Error)]
pub enum CommentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("rendering failed: {0}")]
    RenderingFailed(#[from] TemplateError),
}
