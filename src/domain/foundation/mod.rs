//! Foundation value objects shared across the domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::ValidationError;
pub use ids::UserId;
pub use timestamp::Timestamp;
