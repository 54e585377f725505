// Core algorithm exports
pub mod distance;
pub mod eligibility;
pub mod filters;
pub mod proximity;

pub use distance::{haversine_distance, planar_distance, calculate_bounding_box, is_within_bounding_box, DistanceMode};
pub use eligibility::{check_eligibility, EligibilityErrors};
pub use filters::{matches_all, Predicate};
pub use proximity::{Located, Nearby, NearbyQuery, ProximityError, ProximityFilter};
