// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{BloodRequest, BloodType, BoundingBox, Coordinates, Donor, DonorProfile, Hospital, ParseBloodTypeError, Place, RequestStatus, UrgencyLevel};
pub use requests::{BecomeDonorRequest, CreateBloodRequestRequest, CreateDonorRequest, CreateHospitalRequest, DashboardParams, ListBloodRequestsParams, NearbyParams, PlacesParams, UpdateBloodRequestRequest, UpdateDonorRequest};
pub use responses::{ActivityDetails, ActivityItem, ActivityKind, DashboardStats, DataResponse, ErrorResponse, HealthResponse, NearbyResponse, Paginated, ValidationErrorResponse};
