//! Distance-ranked listings built on the proximity engine.
//!
//! The backend can only answer rectangular range queries, so every listing
//! here follows the same two steps: fetch rows inside a bounding box, then
//! apply the exact great-circle radius and rank what is left.

mod best;
mod config;
mod favorites;
mod nearby;

pub use best::{BestPriceEntry, BestPriceSort, best_prices};
pub use config::{ListingConfig, ListingError};
pub use favorites::{FavoritePrices, FavoriteSource, aggregate, load as load_favorites};
pub use nearby::{NearbyStation, nearby_stations};
