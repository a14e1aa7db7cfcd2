// dbops/src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod provision;
pub mod utils;
pub mod verify;
