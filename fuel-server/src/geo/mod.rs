//! Geographic proximity computation.
//!
//! Pure functions over spherical coordinates: great-circle distance,
//! bounding boxes for range pre-filters, and distance labels for display.
//! Nothing in here performs I/O or holds state.

mod coordinate;
mod proximity;

pub use coordinate::{BoundingBox, Coordinate, InvalidCoordinate};
pub use proximity::{BoxTuning, EARTH_RADIUS_KM, bounding_box, distance, format_distance};
