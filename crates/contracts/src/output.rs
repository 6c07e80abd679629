//! OutputAction trait - Dispatcher output interface
//!
//! Defines the abstract interface for the rendering engine the Dispatcher
//! drives (speech synthesizer, console, ...).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Typed output parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Parameter name -> value
pub type OutputParams = BTreeMap<String, ParamValue>;

/// Rendering engine driven by the Dispatcher
///
/// The Dispatcher owns its action exclusively; `render` must not block until
/// the output has finished, `is_idle` reports that instead.
pub trait OutputAction: Send {
    /// Action name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Set parameters for the next render
    ///
    /// # Errors
    /// Returns an error when the engine rejects a value; the Dispatcher then
    /// falls back to defaults.
    fn apply_parameters(&mut self, params: &OutputParams) -> Result<(), ContractError>;

    /// Start rendering `text`
    fn render(&mut self, text: &str) -> Result<(), ContractError>;

    /// No render in progress
    fn is_idle(&self) -> bool;
}
