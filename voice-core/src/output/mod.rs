pub mod engine;
pub mod lease;
pub mod queue;
pub mod stream;

mod control;
