use thiserror::Error;

use crate::validator::FlowIssue;

/// Errors surfaced by the flow layer.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The validator found fatal structural issues.
    #[error("flow invalid: {} issue(s), first: {}", .0.len(), first_message(.0))]
    Invalid(Vec<FlowIssue>),
}

fn first_message(issues: &[FlowIssue]) -> &str {
    issues.first().map(|i| i.message.as_str()).unwrap_or("<none>")
}

impl From<Vec<FlowIssue>> for FlowError {
    fn from(issues: Vec<FlowIssue>) -> Self {
        FlowError::Invalid(issues)
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
