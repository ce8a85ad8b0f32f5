// Rastrace
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error handling for the instrumentation pass
//!
//! Ineligibility is never an error; it is reported through
//! [`InstrumentationOutcome::NotEligible`](crate::engine::InstrumentationOutcome).

use rastrace_model::BytecodeError;
use thiserror::Error;

/// Errors that can occur while instrumenting a unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentationError {
    #[error("Bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),

    #[error("Instrumentation of {unit} failed: {source}")]
    UnitFailed {
        unit: String,
        #[source]
        source: BytecodeError,
    },

    #[error("Configuration validation failed: {field} - {details}")]
    ConfigurationValidationError { field: String, details: String },
}

impl InstrumentationError {
    /// Wrap a structural failure with the unit it aborted
    pub fn unit_failed(unit: impl Into<String>, source: BytecodeError) -> Self {
        Self::UnitFailed {
            unit: unit.into(),
            source,
        }
    }

    /// Create a configuration validation error
    pub fn configuration_validation(field: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigurationValidationError {
            field: field.into(),
            details: details.into(),
        }
    }

    /// Name of the unit the failure is confined to, if any
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::UnitFailed { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// Check if a batch can carry on past this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Bytecode(_) | Self::UnitFailed { .. } => true,
            Self::ConfigurationValidationError { .. } => false,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Bytecode(_) | Self::UnitFailed { .. } => ErrorCategory::Rewrite,
            Self::ConfigurationValidationError { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Error categories for instrumentation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Rewrite,
    Configuration,
}

impl ErrorCategory {
    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rewrite => "rewrite",
            Self::Configuration => "configuration",
        }
    }
}

/// Result type alias for instrumentation operations
pub type InstrumentationResult<T> = Result<T, InstrumentationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let error = InstrumentationError::unit_failed("com/example/Foo", BytecodeError::frame_computation("run()V", "underflow"));
        assert_eq!(error.category(), ErrorCategory::Rewrite);
        assert_eq!(error.unit(), Some("com/example/Foo"));
        assert!(error.is_recoverable());

        let error = InstrumentationError::configuration_validation("preset_trace_info", "empty field name");
        assert_eq!(error.category().as_str(), "configuration");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_from_bytecode_error() {
        let error: InstrumentationError = BytecodeError::MissingHeader.into();
        assert!(matches!(error, InstrumentationError::Bytecode(BytecodeError::MissingHeader)));
    }
}
