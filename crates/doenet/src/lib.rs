//! Reactive state-variable engine for DoenetML documents.
//!
//! A document is read into DAST, instantiated into components whose state
//! variables form a lazily evaluated value graph, and settled. Actions write
//! to it in batches; [`Core::return_all_state_variables`] reads it back.
//!
//! ```no_run
//! use doenet::{CoreConfig, create_core};
//!
//! let mut core = create_core("<textInput name=\"ti\"/><text name=\"t\">$ti</text>", CoreConfig::default())?;
//! core.update_text_input_value("ti", "hello")?;
//! assert_eq!(core.state_value("t", "value")?.to_text(), "hello");
//! # Ok::<(), doenet::CoreError>(())
//! ```

pub mod components;
pub mod composites;
pub mod config;
pub mod core;
pub mod dast;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod math;
pub mod resolver;
pub mod value;
pub mod variants;

pub use crate::core::{ActionRequest, ComponentSnapshot, Core, StateSnapshot, create_core};
pub use config::{CoreConfig, Flags};
pub use diagnostics::{Diagnostic, ErrorWarnings};
pub use error::{CoreError, Result};
pub use value::{Value, ValueKind};
pub use variants::VariantInfo;
