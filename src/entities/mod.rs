//! sea-orm entities for the marketplace schema.

pub mod application_status;
pub mod chapter;
pub mod event;
pub mod order;
pub mod processed_webhook;
pub mod product;
pub mod promoter;
pub mod seller;
pub mod steward;
pub mod steward_listing;
pub mod user;

pub use application_status::ApplicationStatus;
