pub mod catalog;

pub use catalog::ServiceCatalogService;
