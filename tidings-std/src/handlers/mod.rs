//! Ready-made handlers.

pub mod logging;

pub use logging::LoggingHandler;
