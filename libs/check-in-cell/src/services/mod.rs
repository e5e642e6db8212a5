pub mod check_in;
pub mod signature;

pub use check_in::CheckInService;
