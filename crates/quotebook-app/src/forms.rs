// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Name,
    Message,
}

impl FormField {
    pub const ALL: [Self; 2] = [Self::Name, Self::Message];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Message => "Quote",
        }
    }
}

/// Local input problems. These never reach the store and are shown next
/// to the offending field instead of as a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required -- enter a name and retry")]
    MissingName,
    #[error("quote is required -- enter a quote and retry")]
    MissingMessage,
}

impl ValidationError {
    pub const fn field(self) -> FormField {
        match self {
            Self::MissingName => FormField::Name,
            Self::MissingMessage => FormField::Message,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFormInput {
    pub name: String,
    pub message: String,
}

impl QuoteFormInput {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Message => &self.message,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Name => &mut self.name,
            FormField::Message => &mut self.message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.message.is_empty()
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.message.clear();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.message.trim().is_empty() {
            return Err(ValidationError::MissingMessage);
        }
        Ok(())
    }
}
