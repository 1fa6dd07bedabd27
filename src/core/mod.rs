pub mod config;
pub mod errors;
pub mod kernel;
pub mod options;
pub mod traits;
pub mod types;
