//! Board column update builder.

use relay_core::requests::UpdateFieldRequest;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl FieldUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.options.is_none() && self.required.is_none()
    }
}

impl From<&UpdateFieldRequest> for FieldUpdate {
    fn from(req: &UpdateFieldRequest) -> Self {
        Self {
            name: req.name.clone(),
            options: req.options.clone(),
            required: req.required,
        }
    }
}

pub struct FieldUpdateBuilder(FieldUpdate);

impl FieldUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(FieldUpdate::default())
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: Vec<String>) -> Self {
        self.0.options = Some(options);
        self
    }

    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.0.required = Some(required);
        self
    }

    #[must_use]
    pub fn build(self) -> FieldUpdate {
        self.0
    }
}

impl Default for FieldUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
