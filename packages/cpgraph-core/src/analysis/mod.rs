//! Abstract interpretation over the finished graph.

mod evaluator;
mod interval;

pub use evaluator::IntervalEvaluator;
pub use interval::{Bound, LatticeInterval};
