pub mod cli;
pub mod names;

pub use cli::{exit_code, run, run_with_args, Args};
