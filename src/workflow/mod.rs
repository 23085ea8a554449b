pub mod equation_ctx;
pub mod equation_flow;
pub mod sequencer;

pub use equation_ctx::EquationCtx;
pub use equation_flow::{EquationFlow, EquationState};
pub use sequencer::EquationSequence;
