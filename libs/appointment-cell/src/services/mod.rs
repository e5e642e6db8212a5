pub mod conflict;
pub mod lifecycle;
pub mod management;
pub mod patients;
pub mod reservation;
pub mod slots;

pub use management::AppointmentManagementService;
pub use reservation::ReservationService;
pub use slots::SlotService;
