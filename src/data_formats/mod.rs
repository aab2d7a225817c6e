mod request;
mod response;

pub use request::*;
pub use response::*;

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct UserQueryParams {
    /// Case-insensitive substring of the username.
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct PostQueryParams {
    /// Exact tag name.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Empty filter values behave as if the parameter was never sent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
