mod evaluator;

pub use evaluator::{apply_binary, apply_rounding, Diagnostic, Evaluator};
