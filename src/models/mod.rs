// Model exports
pub mod requests;
pub mod responses;

pub use requests::QueryRequest;
pub use responses::{ErrorResponse, HealthResponse, MessageResponse, ResultResponse};
