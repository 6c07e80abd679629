//! CLI command implementations.

mod parse;
mod run;
mod validate;

pub use parse::run_parse;
pub use run::run_pipeline;
pub use validate::run_validate;
