#![forbid(unsafe_code)]

pub mod detect;
mod diagram;
pub mod flow;
pub mod sequence;

pub use detect::detect;
pub use diagram::{Diagram, DiagramDb, Diagraph};

use dg_core::DiagramError;

/// Convenience entry point: detect the dialect and parse in one call,
/// propagating any error to the caller.
pub fn parse(text: &str) -> Result<Diagram, DiagramError> {
    Diagram::parse(text)
}
