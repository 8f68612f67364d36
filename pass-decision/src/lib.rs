// Library root: re-exports all modules so integration tests and the batch
// binary can access the crate's public API.

pub mod config;
pub mod data;
pub mod evaluation;
pub mod report;
