use crate::phase::Phase;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Invalid definition '{name}': {message}")]
    Definition { name: String, message: String },

    #[error("Hook '{hook}' failed during {phase}: {source}")]
    HookExecution {
        hook: String,
        phase: Phase,
        source: anyhow::Error,
    },

    #[error("Could not classify hook '{name}'")]
    Classification { name: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Failed to downcast '{name}' to {type_name}")]
    DowncastFailed { name: String, type_name: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BootstrapError {
    pub fn definition(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Definition {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wrap an error raised by a hook entry point.
    pub fn hook_failed(hook: impl Into<String>, phase: Phase, source: anyhow::Error) -> Self {
        Self::HookExecution {
            hook: hook.into(),
            phase,
            source,
        }
    }

    /// Name of the hook that aborted the bootstrap, if this is a hook failure.
    pub fn hook_name(&self) -> Option<&str> {
        match self {
            Self::HookExecution { hook, .. } => Some(hook),
            _ => None,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::HookExecution { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
