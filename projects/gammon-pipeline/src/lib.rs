pub mod board;
pub mod pipeline;
pub mod run_artifacts;
pub mod run_context;
