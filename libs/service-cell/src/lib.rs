pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Service, ServiceCatalogError};
pub use router::service_routes;
pub use services::ServiceCatalogService;
