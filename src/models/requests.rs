use serde::{Deserialize, Serialize};
use validator::Validate;

/// Natural-language question for the query worker
///
/// A missing `query` deserializes to an empty string so that it fails
/// validation with the same 400 as an explicit empty one.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, message = "Query not provided"))]
    #[serde(default)]
    pub query: String,
}
