pub mod cli;
pub mod config;
pub mod error;
pub mod key_manager;
pub mod network;
pub mod runtime;
pub mod setup;
pub mod state;

pub use config::Config;
pub use error::NodeError;
pub use runtime::builder::{build_runtime, NodeRuntime};
pub use state::LocalState;
