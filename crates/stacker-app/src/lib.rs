// Library root: re-exports all modules so integration tests and the binary
// share the same config, data loading and batch code.

pub mod batch;
pub mod config;
pub mod source;
