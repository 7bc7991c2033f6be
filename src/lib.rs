pub mod error;
pub mod evaluation;
pub mod executor;
pub mod report;
pub mod shared;
pub mod spec;
pub mod synth;
