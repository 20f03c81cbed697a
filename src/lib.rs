//! TeachSmart Gateway - HTTP front door for the TeachSmart student-analytics tools
//!
//! The gateway does no analytics itself. Each API route hands its input to an
//! external worker script (query answering, document extraction, email
//! dispatch), waits for it to exit and relays its output as JSON.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use error::{handle_json_payload_error, GatewayError};
pub use routes::{configure_routes, AppState};
pub use services::{UploadStore, Worker, WorkerError, WorkerInput, WorkerOutput, Workers};
