//! # tidings-std
//!
//! Registries and dispatchers for the tidings event dispatch library.
//!
//! This crate provides:
//! - **Storage**: [`Registry`] (priority-ordered handler lists), [`ProviderTable`]
//! - **Scanning**: [`scanner`] turns listeners into handler entries
//! - **Dispatchers**: [`Events`], [`DirectDispatcher`], [`BatchDispatcher`]
//! - **Directory**: [`DispatcherDirectory`]
//! - **Standard handlers**: [`LoggingHandler`]
//! - **Test helpers**: [`testing`]
//!
//! | Dispatcher           | Registers              | Matches                 | Extras | Default policy    |
//! |----------------------|------------------------|-------------------------|--------|-------------------|
//! | [`Events`]           | handlers and listeners | exact type              | yes    | fail fast         |
//! | [`DirectDispatcher`] | handlers               | exact type              | no     | fail fast         |
//! | [`BatchDispatcher`]  | listeners              | any ancestry view       | no     | log, catch panics |

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use tidings_core;

// Modules
pub mod batch;
pub mod config;
pub mod direct;
pub mod directory;
pub mod engine;
pub mod events;
pub mod handlers;
pub mod provider;
pub mod registry;
pub mod scanner;
pub mod testing;

pub use batch::BatchDispatcher;
pub use config::{DispatchConfig, ErrorPolicy};
pub use direct::DirectDispatcher;
pub use directory::DispatcherDirectory;
pub use events::Events;
pub use handlers::LoggingHandler;
pub use provider::ProviderTable;
pub use registry::Registry;
pub use scanner::Registered;
