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

//! Rastrace Instrumentation Library
//!
//! This crate injects method entry, exit and exception-exit trace calls into
//! compiled units. It resolves the trace field of each unit, applies the
//! mode-dependent eligibility gate, synthesizes missing tracing
//! infrastructure, and reports whether a unit actually changed.

pub mod batch;
pub mod class_adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod method_adapter;
pub mod resolver;
pub mod summary;
pub mod trace_api;

// Re-export the main entry points
pub use batch::{BatchItem, BatchReport, UnitReport};
pub use class_adapter::{TracingClassAdapter, UnitEligibility};
pub use config::{InstrumentationConfig, InstrumentationMode};
pub use engine::{InstrumentationOutcome, InstrumentedUnit, TraceInstrumenter};
pub use error::{InstrumentationError, InstrumentationResult};
pub use metadata::scan_class_info;
pub use method_adapter::{MethodEligibility, MethodInstrumentationRecord, TracingMethodAdapter, instrument_method};
pub use resolver::{DEFAULT_TRACE_FIELD_NAME, Resolution, TraceField, TraceFieldSource, resolve_trace_field};
pub use summary::ModificationSummary;
