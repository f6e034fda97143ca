// Driver for the detect -> parse -> visualize -> encode pipeline
pub mod commands;
pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod types;
