//! HTTP server components.
//!
//! Splits the web layer into request handlers ([`handlers`]) and router
//! assembly ([`routes`]). Handlers are generic over the
//! [`ObjectStore`](crate::storage::ObjectStore) trait so tests can run the
//! full router against an in-memory store.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::{create_router, RouterConfig};
