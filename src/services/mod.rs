// Service exports
pub mod uploads;
pub mod worker;

pub use uploads::{sanitize_file_name, UploadStore};
pub use worker::{Worker, WorkerError, WorkerInput, WorkerOutput, Workers};
