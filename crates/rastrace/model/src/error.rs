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

//! Error types for the structural model, traversal and unit writer

use thiserror::Error;

/// Errors that can occur while reading, walking or re-emitting a compiled unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    #[error("Invalid type descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Frame computation failed for {method}: {reason}")]
    FrameComputation { method: String, reason: String },

    #[error("Duplicate member in {owner}: {member}")]
    DuplicateMember { owner: String, member: String },

    #[error("Unit header was never visited")]
    MissingHeader,

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("Visitor rejected event: {0}")]
    VisitorError(String),
}

impl BytecodeError {
    /// Create an invalid descriptor error
    pub fn invalid_descriptor(descriptor: impl Into<String>) -> Self {
        Self::InvalidDescriptor(descriptor.into())
    }

    /// Create a frame computation error for a method
    pub fn frame_computation(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FrameComputation {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate member error
    pub fn duplicate_member(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self::DuplicateMember {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// Create a visitor error
    pub fn visitor_error(message: impl Into<String>) -> Self {
        Self::VisitorError(message.into())
    }

    /// Check if the writer can continue after this error by keeping the original structure
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FrameComputation { .. })
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDescriptor(_) => ErrorCategory::Descriptor,
            Self::FrameComputation { .. } => ErrorCategory::Frame,
            Self::DuplicateMember { .. } | Self::MissingHeader => ErrorCategory::Structure,
            Self::EncodingError(_) | Self::DecodingError(_) => ErrorCategory::Codec,
            Self::VisitorError(_) => ErrorCategory::Visitor,
        }
    }
}

/// Error categories for structural errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Descriptor,
    Frame,
    Structure,
    Codec,
    Visitor,
}

impl ErrorCategory {
    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Descriptor => "descriptor",
            Self::Frame => "frame",
            Self::Structure => "structure",
            Self::Codec => "codec",
            Self::Visitor => "visitor",
        }
    }
}

/// Result type for structural operations
pub type BytecodeResult<T> = Result<T, BytecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let error = BytecodeError::frame_computation("run()V", "stack underflow");
        assert_eq!(error.category(), ErrorCategory::Frame);
        assert!(error.is_recoverable());

        let error = BytecodeError::duplicate_member("com/example/Foo", "tc");
        assert_eq!(error.category().as_str(), "structure");
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let error = BytecodeError::frame_computation("run()V", "stack underflow at 3");
        assert_eq!(error.to_string(), "Frame computation failed for run()V: stack underflow at 3");
    }
}
