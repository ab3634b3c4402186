pub mod advisor;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ids;
pub mod log;
pub mod model;
pub mod registry;
pub mod server;
pub mod session;
pub mod simulator;
