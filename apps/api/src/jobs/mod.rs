pub mod handlers;
pub mod orchestrator;
pub mod store;
pub mod sweeper;
