// dbops/src/utils/mod.rs
pub mod paths;
pub mod prompt;
pub mod report;

pub use prompt::confirm_step;
pub use report::Reporter;
