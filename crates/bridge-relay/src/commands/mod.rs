//! Command dispatch
//!
//! The dispatch table and the parser for operator input lines.

mod operator;
mod registry;

pub use operator::OperatorInput;
pub use registry::{Arity, CommandRegistry, CommandSpec};
