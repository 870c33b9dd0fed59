//! Integration tests for the treegen generation engine

mod config_integration;
mod engine_chain;
mod mirror_flavour;
mod test_utils;
mod tree_sync;
