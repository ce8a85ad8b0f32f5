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

//! Metadata snapshots describing a unit's tracing configuration
//!
//! These are produced by whatever scanned the unit's annotations before
//! instrumentation and are read-only to the instrumentation pass.

use crate::access::AccessFlags;
use serde::{Deserialize, Serialize};

/// Name, descriptor and modifiers of a declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    #[serde(default = "FieldInfo::default_access")]
    pub access: AccessFlags,
}

impl FieldInfo {
    /// Create a private static field description
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            access: Self::default_access(),
        }
    }

    pub fn with_access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    pub fn is_static(&self) -> bool {
        self.access.is_static()
    }

    fn default_access() -> AccessFlags {
        AccessFlags::PRIVATE | AccessFlags::STATIC
    }
}

/// Unit-wide trace registration options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TraceOptions {
    /// Trace groups the unit registers under; the first is used at registration
    #[serde(default)]
    pub trace_groups: Vec<String>,
    /// Message bundle for translated messages
    #[serde(default)]
    pub message_bundle: Option<String>,
}

impl TraceOptions {
    /// Primary trace group, if any
    pub fn primary_group(&self) -> Option<&str> {
        self.trace_groups.first().map(String::as_str)
    }
}

/// Metadata gathered about a unit before instrumentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Internal name of the unit
    pub internal_name: String,
    /// Field the author marked as the unit's logger, if any
    #[serde(default)]
    pub declared_logger_field: Option<FieldInfo>,
    #[serde(default)]
    pub trace_options: Option<TraceOptions>,
    /// Unit is marked trivial: none of its methods are traced
    #[serde(default)]
    pub trivial: bool,
}

impl ClassInfo {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            declared_logger_field: None,
            trace_options: None,
            trivial: false,
        }
    }

    pub fn with_logger_field(mut self, field: FieldInfo) -> Self {
        self.declared_logger_field = Some(field);
        self
    }

    pub fn with_trace_options(mut self, options: TraceOptions) -> Self {
        self.trace_options = Some(options);
        self
    }

    pub fn with_trivial(mut self, trivial: bool) -> Self {
        self.trivial = trivial;
        self
    }
}

/// Trace information recorded by an earlier preprocessing pass
///
/// Describes exactly one unit; consumers ignore it for any other unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTraceInfo {
    /// Internal name of the unit this was recorded for
    pub internal_name: String,
    /// Field named by the unit's trace-object-field annotation
    #[serde(default)]
    pub trace_object_field: Option<FieldInfo>,
}

impl ClassTraceInfo {
    pub fn new(internal_name: impl Into<String>) -> Self {
        Self {
            internal_name: internal_name.into(),
            trace_object_field: None,
        }
    }

    pub fn with_trace_object_field(mut self, field: FieldInfo) -> Self {
        self.trace_object_field = Some(field);
        self
    }

    /// Whether this was recorded for the unit named `internal_name`
    pub fn describes(&self, internal_name: &str) -> bool {
        self.internal_name == internal_name
    }
}
