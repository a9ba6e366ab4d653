//! Central schema registry for request payloads.

use std::collections::HashMap;

use jsonschema::Validator;
use relay_core::requests::{
    AddMemberRequest, AdminTicketUpdateRequest, CheckoutRequest, CreateFieldRequest,
    CreateOrganizationRequest, CreateRecordRequest, CreateTicketRequest, PostMessageRequest,
    RateTicketRequest, ReorderFieldsRequest, RequestPayload, UpdateFieldRequest,
    UpdateMemberRequest, UpdateOrganizationRequest, UpdateRecordRequest,
};
use schemars::schema_for;

use crate::error::SchemaError;

struct Entry {
    schema: serde_json::Value,
    validator: Validator,
}

/// Compiled validators for every request body, keyed by
/// [`RequestPayload::SCHEMA`].
pub struct SchemaRegistry {
    entries: HashMap<&'static str, Entry>,
}

/// Generate the schema for `$ty`, compile it with format checks enabled and
/// insert it under the type's `SCHEMA` name.
macro_rules! register {
    ($map:expr, $ty:ty) => {{
        let schema = serde_json::to_value(schema_for!($ty))
            .expect("schemars output is always valid JSON");
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(&schema)
            .expect("schemars output is always a valid schema");
        $map.insert(<$ty as RequestPayload>::SCHEMA, Entry { schema, validator });
    }};
}

impl SchemaRegistry {
    /// Build a registry containing every request DTO from `relay-core`.
    ///
    /// # Panics
    ///
    /// Panics if a `schemars`-generated schema fails to compile, which would be
    /// a bug in the DTO definitions rather than a runtime condition.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = HashMap::new();

        register!(entries, CreateOrganizationRequest);
        register!(entries, UpdateOrganizationRequest);
        register!(entries, AddMemberRequest);
        register!(entries, UpdateMemberRequest);

        register!(entries, CreateFieldRequest);
        register!(entries, UpdateFieldRequest);
        register!(entries, ReorderFieldsRequest);
        register!(entries, CreateRecordRequest);
        register!(entries, UpdateRecordRequest);

        register!(entries, CreateTicketRequest);
        register!(entries, PostMessageRequest);
        register!(entries, RateTicketRequest);
        register!(entries, AdminTicketUpdateRequest);

        register!(entries, CheckoutRequest);

        Self { entries }
    }

    /// Get a schema by name. Returns `None` if not found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.entries.get(name).map(|e| &e.schema)
    }

    /// Validate a JSON value against a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotFound` if the schema name is unknown, or
    /// `SchemaError::ValidationFailed` listing every violation.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), SchemaError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))?;

        let errors: Vec<String> = entry
            .validator
            .iter_errors(instance)
            .map(|e| e.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed { errors })
        }
    }

    /// Validate `value` against `T`'s schema, then deserialize it.
    ///
    /// # Errors
    ///
    /// Returns the validation errors, or `SchemaError::Deserialize` if serde
    /// still rejects the value.
    pub fn parse<T: RequestPayload>(&self, value: serde_json::Value) -> Result<T, SchemaError> {
        self.validate(T::SCHEMA, &value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// List all registered schema names.
    #[must_use]
    pub fn list(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn schema_count(&self) -> usize {
        self.entries.len()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
