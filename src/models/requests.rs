//! Request DTOs for the enrollment API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::resource::Fields;

/// Longest field name accepted in a record body
pub const MAX_FIELD_NAME_LEN: usize = 64;

/// Request body for create (POST) and update (PUT) operations.
///
/// Any JSON object is accepted; the server assigns `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordRequest {
    #[serde(flatten)]
    pub fields: Fields,
}

impl RecordRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.fields.is_empty() {
            return Some("Request body must contain at least one field".to_string());
        }
        if self.fields.contains_key("id") {
            return Some("Field 'id' cannot be set by the client".to_string());
        }
        if let Some(name) = self
            .fields
            .keys()
            .find(|name| name.is_empty() || name.len() > MAX_FIELD_NAME_LEN)
        {
            return Some(format!(
                "Invalid field name '{}': must be 1 to {} characters",
                name, MAX_FIELD_NAME_LEN
            ));
        }
        None
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}
