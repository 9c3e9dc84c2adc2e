pub mod config;
pub mod device;
pub mod error;
pub mod spatial;
pub mod state;
