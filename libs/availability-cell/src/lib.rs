pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    AvailabilityDecision, BlockedInterval, BlockedIntervalInput, CandidateSlot, DayAvailability,
    DayStatus, TimeRange, UnavailableReason,
};
pub use router::{availability_routes, blocked_date_routes};
pub use services::evaluator::{evaluate, is_available};
