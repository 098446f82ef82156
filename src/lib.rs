// Messaging & session-authentication engine for a graph-backed social
// network. The graph store itself is external; see store::GraphStore.

pub mod config;
pub mod delivery;
pub mod error;
pub mod members;
pub mod messaging;
pub mod models;
pub mod notifications;
pub mod session;
pub mod store;
