// dbops/src/verify/mod.rs
mod logic;
pub mod outcome;
pub mod plan;

pub use logic::run_verify;
pub use outcome::VerifyOutcome;
