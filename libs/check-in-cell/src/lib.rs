pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{CheckInError, CheckInRecord, CheckInToken, Contract};
pub use router::check_in_routes;
pub use services::CheckInService;
