pub mod blocked_dates;
pub mod evaluator;

pub use blocked_dates::BlockedDateService;
