//! Utility functions and types

pub mod data_loader;

pub use data_loader::{load, load_reader, DataLoader, DataSaver, DEFAULT_NULL_TOKENS};
