//! Error types for the Strato layout benchmark suite

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::types::NodeHandle;

/// Context information for errors to aid in debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Operation that was being performed when the error occurred
    pub operation: String,
    /// Component or module where the error occurred
    pub component: String,
    /// Additional contextual data, kept ordered so log lines are stable
    pub metadata: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            component: component.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add metadata to the context
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    /// Format context for logging
    pub fn format_for_log(&self) -> String {
        let mut parts = vec![
            format!("operation={}", self.operation),
            format!("component={}", self.component),
        ];

        if !self.metadata.is_empty() {
            let metadata_str = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("metadata=[{}]", metadata_str));
        }

        parts.join(", ")
    }
}

/// Main error type for benchmark runs
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Layout surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error(
        "Sample timeout in round {round}: received {received} of {expected} layout notifications within {timeout:?}"
    )]
    SampleTimeout {
        round: u32,
        received: usize,
        expected: usize,
        timeout: Duration,
    },

    #[error("Harness state error: {message}")]
    State {
        message: String,
        context: Option<ErrorContext>,
    },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Create a configuration error from a string
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn configuration_with_context<S: Into<String>>(msg: S, context: ErrorContext) -> Self {
        Self::Configuration {
            message: msg.into(),
            context: Some(context),
        }
    }

    /// Create a state error from a string
    pub fn state<S: Into<String>>(msg: S) -> Self {
        Self::State {
            message: msg.into(),
            context: None,
        }
    }

    /// Create a state error with context
    pub fn state_with_context<S: Into<String>>(msg: S, context: ErrorContext) -> Self {
        Self::State {
            message: msg.into(),
            context: Some(context),
        }
    }

    /// Create a serialization error from anything displayable
    pub fn serialization<E: std::fmt::Display>(err: E) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }

    /// Get the error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Self::Configuration { context, .. } | Self::State { context, .. } => context.as_ref(),
            Self::Surface(_)
            | Self::SampleTimeout { .. }
            | Self::Serialization { .. }
            | Self::Io(_) => None,
        }
    }

    /// Whether this error is a configuration rejection
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Format error with context for logging
    pub fn format_for_log(&self) -> String {
        let base_msg = self.to_string();
        if let Some(context) = self.context() {
            format!("{} [{}]", base_msg, context.format_for_log())
        } else {
            base_msg
        }
    }
}

/// Errors raised by a layout surface.
///
/// Geometry and tree-shape errors are caller mistakes and surface immediately.
/// `ComputationFailed` comes from the layout engine itself and aborts the
/// current layout pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    /// The handle does not name a node in this surface.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeHandle),

    /// A layout pass was requested before a root was attached.
    #[error("No root node attached to the surface")]
    NotAttached,

    /// The child already has a parent (or is the attached root).
    #[error("Node {child} is already attached")]
    AlreadyAttached { child: NodeHandle },

    /// Attaching the node would make it its own ancestor.
    #[error("Adding {child} under {parent} would create a cycle")]
    WouldCycle {
        parent: NodeHandle,
        child: NodeHandle,
    },

    /// `remove_child` was called with a node that is not a child of `parent`.
    #[error("Node {child} is not a child of {parent}")]
    NotAChild {
        parent: NodeHandle,
        child: NodeHandle,
    },

    /// Geometry contains non-finite values or a negative dimension.
    #[error("Invalid geometry: left={left}, top={top}, width={width}, height={height}")]
    InvalidGeometry {
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    },

    /// The layout engine failed internally.
    #[error("Layout computation failed: {reason}")]
    ComputationFailed { reason: String },

    /// The surface dropped a subscription without firing it.
    #[error("Layout subscription cancelled")]
    SubscriptionCancelled,
}

/// Result type alias for benchmark operations
pub type BenchResult<T> = std::result::Result<T, BenchError>;

/// Result type for surface operations.
pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_formatting_is_ordered() {
        let context = ErrorContext::new("validate", "config")
            .with_metadata("samples_to_take", 5)
            .with_metadata("nodes_to_change", 2);

        assert_eq!(
            context.format_for_log(),
            "operation=validate, component=config, metadata=[nodes_to_change=2, samples_to_take=5]"
        );
    }

    #[test]
    fn test_error_format_for_log() {
        let err = BenchError::configuration_with_context(
            "samples_to_take exceeds nodes_to_change",
            ErrorContext::new("validate", "config"),
        );
        assert!(err.is_configuration());
        assert_eq!(
            err.format_for_log(),
            "Configuration error: samples_to_take exceeds nodes_to_change [operation=validate, component=config]"
        );

        let timeout = BenchError::SampleTimeout {
            round: 3,
            received: 0,
            expected: 1,
            timeout: Duration::from_millis(50),
        };
        assert!(timeout.context().is_none());
        assert!(timeout.to_string().contains("round 3"));
    }

    #[test]
    fn test_surface_error_converts() {
        let err: BenchError = SurfaceError::NotAttached.into();
        assert!(matches!(err, BenchError::Surface(SurfaceError::NotAttached)));
    }
}
