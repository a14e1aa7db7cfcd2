// dbops/src/provision/mod.rs
pub mod layout;
mod logic;

pub use logic::run_provision;
