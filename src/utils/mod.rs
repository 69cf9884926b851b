//! Utility functions: CSV IO and synthetic data

pub mod data_loader;
pub mod sample;

pub use data_loader::{load_csv, save_csv};
pub use sample::generate_sample_data;
