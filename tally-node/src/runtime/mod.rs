//! Node workers. Each runs as its own tokio task and talks to the others
//! only through bounded channels.

pub mod builder;
pub mod follower;
pub mod ingest;
pub mod leader;
pub mod outbound;
