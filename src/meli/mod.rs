//! Mercado Libre integration: OAuth token lifecycle and listing sync.

pub mod auth;
pub mod client;
pub mod normalize;
pub mod sync;
