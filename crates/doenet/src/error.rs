//! Errors for misuse of the core API.
//!
//! Problems inside a document are diagnostics, not errors; see
//! [`crate::diagnostics`].

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No component named `{0}`")]
    UnknownComponent(String),

    #[error("Component `{component}` has no state variable `{state_variable}`")]
    UnknownStateVariable { component: String, state_variable: String },

    #[error("Component `{component}` of type <{component_type}> has no action `{action}`")]
    UnknownAction {
        component: String,
        component_type: String,
        action: String,
    },

    #[error("Invalid arguments for action `{action}`: {reason}")]
    InvalidActionArgs { action: String, reason: String },

    #[error("Unknown variant name `{0}`")]
    UnknownVariantName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}
