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

//! Trace field resolution
//!
//! Picks the one field of a unit through which trace calls are routed.
//! Resolution is a pure function of the metadata snapshot: the field named
//! by the unit's trace-object-field annotation wins, then the author's
//! declared logger field, and otherwise a field is synthesized under a
//! reserved name.

use crate::trace_api::{TRACE_COMPONENT_DESCRIPTOR, is_trace_component};
use rastrace_model::{FieldInfo, FieldRef};
use std::collections::HashSet;
use std::fmt;

/// Reserved name for synthesized trace fields. `$` runs are legal in class
/// files but practically never appear in hand-written identifiers.
pub const DEFAULT_TRACE_FIELD_NAME: &str = "$$$tc$$$";

/// The field carrying a unit's trace handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceField {
    pub name: String,
    /// Always the trace handle descriptor
    pub descriptor: String,
}

impl TraceField {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: TRACE_COMPONENT_DESCRIPTOR.to_string(),
        }
    }

    /// Reference to this field as declared by `owner`
    pub fn field_ref(&self, owner: &str) -> FieldRef {
        FieldRef::new(owner, self.name.clone(), self.descriptor.clone())
    }
}

/// Where the resolved field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFieldSource {
    /// Named by the unit's trace-object-field annotation
    Annotation,
    /// The author's declared logger field
    DeclaredLogger,
    /// Invented by the pass
    Synthesized,
}

/// Why a declared logger field was passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerFieldRejection {
    /// The logger is some other logging type
    NotTraceComponent { name: String, descriptor: String },
    /// Trace-handle typed, but an instance field
    NotStatic { name: String },
}

impl fmt::Display for LoggerFieldRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotTraceComponent { name, descriptor } => {
                write!(f, "logger field {} has type {}", name, descriptor)
            }
            Self::NotStatic { name } => write!(f, "logger field {} is not static", name),
        }
    }
}

/// Outcome of trace field resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub field: TraceField,
    /// The field already exists on the unit
    pub already_defined: bool,
    pub source: TraceFieldSource,
    /// Set when a declared logger field existed but could not be used
    pub rejected_logger: Option<LoggerFieldRejection>,
}

/// Inputs to resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverInput<'a> {
    /// Field named by the trace-object-field annotation or preset trace info
    pub annotated_field: Option<&'a FieldInfo>,
    /// Logger field reported by the metadata model
    pub declared_logger_field: Option<&'a FieldInfo>,
    /// Names of every field the unit declares
    pub declared_field_names: Option<&'a HashSet<String>>,
}

/// Resolve the trace field for one unit
pub fn resolve_trace_field(input: ResolverInput<'_>) -> Resolution {
    if let Some(field) = input.annotated_field.filter(|f| is_trace_component(&f.descriptor)) {
        return Resolution {
            field: TraceField::new(field.name.clone()),
            already_defined: true,
            source: TraceFieldSource::Annotation,
            rejected_logger: None,
        };
    }

    let rejected_logger = match input.declared_logger_field {
        Some(field) if !is_trace_component(&field.descriptor) => Some(LoggerFieldRejection::NotTraceComponent {
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
        }),
        Some(field) if !field.is_static() => Some(LoggerFieldRejection::NotStatic {
            name: field.name.clone(),
        }),
        Some(field) => {
            return Resolution {
                field: TraceField::new(field.name.clone()),
                already_defined: true,
                source: TraceFieldSource::DeclaredLogger,
                rejected_logger: None,
            };
        }
        None => None,
    };

    Resolution {
        field: TraceField::new(synthesized_name(input.declared_field_names)),
        already_defined: false,
        source: TraceFieldSource::Synthesized,
        rejected_logger,
    }
}

/// Reserved name, suffixed with a counter only if the unit already declares it
fn synthesized_name(declared: Option<&HashSet<String>>) -> String {
    let Some(declared) = declared else {
        return DEFAULT_TRACE_FIELD_NAME.to_string();
    };
    if !declared.contains(DEFAULT_TRACE_FIELD_NAME) {
        return DEFAULT_TRACE_FIELD_NAME.to_string();
    }
    (1u32..)
        .map(|n| format!("{}{}", DEFAULT_TRACE_FIELD_NAME, n))
        .find(|candidate| !declared.contains(candidate))
        .unwrap_or_else(|| DEFAULT_TRACE_FIELD_NAME.to_string())
}
