/// Rule evaluation against metric samples
pub mod evaluator;

pub use evaluator::{evaluate, is_triggered};
