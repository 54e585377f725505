// Service exports
pub mod cache;
pub mod places;
pub mod postgres;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use places::{PlacesClient, PlacesError};
pub use postgres::{PostgresClient, PostgresError, REQUESTS_PER_PAGE};
