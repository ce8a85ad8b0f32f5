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

//! Configuration for the instrumentation pass

use crate::error::{InstrumentationError, InstrumentationResult};
use rastrace_model::{ClassInfo, ClassTraceInfo, FieldInfo, Type, WriterOptions};
use serde::{Deserialize, Serialize};

/// How much the pass may add to a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstrumentationMode {
    /// Only touch units already annotated with a trace-handle field; never add
    /// fields, initializers or annotations
    PreprocessedOnly,
    /// Synthesize the trace field, its initialization and the annotation when absent
    #[default]
    FullSynthesis,
}

impl InstrumentationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreprocessedOnly => "preprocessed_only",
            Self::FullSynthesis => "full_synthesis",
        }
    }
}

/// Configuration for the class adapter and the engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    pub mode: InstrumentationMode,

    /// Propagate frame computation failures instead of keeping declared maxima
    #[serde(default)]
    pub throw_on_frame_failure: bool,

    /// Metadata to use when the caller supplies none for a unit
    #[serde(default)]
    pub preset_class_info: Option<ClassInfo>,

    /// Trace information recorded by an earlier preprocessing pass, applied
    /// only to the unit it names
    #[serde(default)]
    pub preset_trace_info: Option<ClassTraceInfo>,
}

impl InstrumentationConfig {
    /// Configuration that only instruments preprocessed units
    pub fn preprocessed_only() -> Self {
        Self {
            mode: InstrumentationMode::PreprocessedOnly,
            ..Default::default()
        }
    }

    /// Configuration that synthesizes missing tracing infrastructure
    pub fn full_synthesis() -> Self {
        Self {
            mode: InstrumentationMode::FullSynthesis,
            ..Default::default()
        }
    }

    pub fn with_throw_on_frame_failure(mut self, throw: bool) -> Self {
        self.throw_on_frame_failure = throw;
        self
    }

    pub fn with_class_info(mut self, class_info: ClassInfo) -> Self {
        self.preset_class_info = Some(class_info);
        self
    }

    pub fn with_trace_info(mut self, trace_info: ClassTraceInfo) -> Self {
        self.preset_trace_info = Some(trace_info);
        self
    }

    pub fn is_preprocessed_only(&self) -> bool {
        self.mode == InstrumentationMode::PreprocessedOnly
    }

    /// Options for the writer that re-emits instrumented units
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            compute_maxs: true,
            throw_on_frame_failure: self.throw_on_frame_failure,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> InstrumentationResult<()> {
        if let Some(info) = &self.preset_trace_info {
            if info.internal_name.is_empty() {
                return Err(InstrumentationError::configuration_validation(
                    "preset_trace_info.internal_name",
                    "must not be empty",
                ));
            }
            if let Some(field) = &info.trace_object_field {
                validate_field("preset_trace_info.trace_object_field", field)?;
            }
        }

        if let Some(info) = &self.preset_class_info {
            if info.internal_name.is_empty() {
                return Err(InstrumentationError::configuration_validation(
                    "preset_class_info.internal_name",
                    "must not be empty",
                ));
            }
            if let Some(field) = &info.declared_logger_field {
                validate_field("preset_class_info.declared_logger_field", field)?;
            }
        }

        Ok(())
    }
}

fn validate_field(path: &str, field: &FieldInfo) -> InstrumentationResult<()> {
    if field.name.is_empty() {
        return Err(InstrumentationError::configuration_validation(path, "field name must not be empty"));
    }
    Type::parse(&field.descriptor).map_err(|err| InstrumentationError::configuration_validation(path, err.to_string()))?;
    Ok(())
}
