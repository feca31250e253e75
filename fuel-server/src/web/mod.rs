//! Web layer for the fuel price server.
//!
//! JSON endpoints for station discovery, price listings, community
//! reporting and administration. Authorization is delegated to the
//! backend: handlers only forward the caller's bearer token.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
