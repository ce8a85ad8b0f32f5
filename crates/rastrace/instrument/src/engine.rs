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

//! Instrumentation engine
//!
//! Drives one unit through the class adapter into a writer and reports what
//! happened. The engine holds nothing but its configuration, so one instance
//! can serve any number of threads.

use crate::class_adapter::{TracingClassAdapter, UnitEligibility};
use crate::config::InstrumentationConfig;
use crate::error::{InstrumentationError, InstrumentationResult};
use crate::metadata::scan_class_info;
use crate::method_adapter::MethodInstrumentationRecord;
use crate::summary::ModificationSummary;
use metrics::counter;
use rastrace_model::codec::{decode_unit, encode_unit};
use rastrace_model::{ClassInfo, ClassTraceInfo, CompiledUnit, UnitWriter};
use std::borrow::Cow;
use tracing::{debug, info, instrument};

/// A unit that went through the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedUnit {
    /// Re-emitted unit; identical in content to the input when `modified` is false
    pub unit: CompiledUnit,
    pub modified: bool,
    pub summary: ModificationSummary,
    pub records: Vec<MethodInstrumentationRecord>,
    /// Methods that kept their declared maxima
    pub frame_failures: usize,
}

/// Result of instrumenting one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentationOutcome {
    /// Rejected by the eligibility gate; the input stands as is
    NotEligible { reason: UnitEligibility },
    Rewritten(InstrumentedUnit),
}

impl InstrumentationOutcome {
    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Rewritten(rewritten) if rewritten.modified)
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Rewritten(_))
    }

    pub fn rewritten(&self) -> Option<&InstrumentedUnit> {
        match self {
            Self::Rewritten(rewritten) => Some(rewritten),
            Self::NotEligible { .. } => None,
        }
    }

    pub fn into_rewritten(self) -> Option<InstrumentedUnit> {
        match self {
            Self::Rewritten(rewritten) => Some(rewritten),
            Self::NotEligible { .. } => None,
        }
    }
}

/// Injects entry, exit and exception-exit trace calls into compiled units
#[derive(Debug, Clone)]
pub struct TraceInstrumenter {
    config: InstrumentationConfig,
}

impl TraceInstrumenter {
    /// Create an engine; the configuration is validated once here
    pub fn new(config: InstrumentationConfig) -> InstrumentationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InstrumentationConfig {
        &self.config
    }

    /// Instrument one unit
    ///
    /// `class_info` takes precedence over the configured preset, which only
    /// applies to the unit it names. The preset trace info is scoped the same
    /// way. Without either, metadata is scanned from
    /// the unit's own annotations.
    #[instrument(skip(self, unit, class_info), fields(unit = %unit.name(), mode = self.config.mode.as_str()))]
    pub fn instrument(
        &self,
        unit: &CompiledUnit,
        class_info: Option<&ClassInfo>,
    ) -> InstrumentationResult<InstrumentationOutcome> {
        counter!("rastrace_units_seen", 1);

        let scanned;
        let class_info = match class_info.or_else(|| self.preset_class_info_for(unit)) {
            Some(info) => info,
            None => {
                scanned = scan_class_info(unit);
                &scanned
            }
        };

        let writer = UnitWriter::new(self.config.writer_options());
        let mut adapter = TracingClassAdapter::new(writer, self.config.mode)
            .with_class_info(Some(class_info))
            .with_trace_info(self.preset_trace_info_for(unit));

        if let Err(err) = unit.accept(&mut adapter) {
            counter!("rastrace_units_failed", 1);
            return Err(InstrumentationError::unit_failed(unit.name(), err));
        }

        let eligibility = adapter.eligibility().cloned().unwrap_or(UnitEligibility::Eligible);
        if !eligibility.is_eligible() {
            counter!("rastrace_units_skipped", 1);
            debug!(reason = eligibility.as_str(), "Unit not eligible for instrumentation");
            return Ok(InstrumentationOutcome::NotEligible { reason: eligibility });
        }

        let summary = adapter.summary();
        let records = adapter.method_records().to_vec();
        let writer = adapter.into_inner();
        let frame_failures = writer.frame_failures();
        let rewritten = writer
            .into_unit()
            .map_err(|err| InstrumentationError::unit_failed(unit.name(), err))?;

        let modified = summary.is_modified();
        if modified {
            counter!("rastrace_units_instrumented", 1);
            counter!("rastrace_methods_instrumented", summary.modified_methods as u64);
            info!(
                methods = summary.modified_methods,
                field_defined = summary.field_definition_required,
                frame_failures,
                "Instrumented unit"
            );
        } else {
            counter!("rastrace_units_unchanged", 1);
            debug!("Unit needed no changes");
        }

        Ok(InstrumentationOutcome::Rewritten(InstrumentedUnit {
            unit: rewritten,
            modified,
            summary,
            records,
            frame_failures,
        }))
    }

    /// Instrument an encoded unit, returning the input bytes when nothing changed
    pub fn instrument_bytes<'b>(
        &self,
        bytes: &'b [u8],
        class_info: Option<&ClassInfo>,
    ) -> InstrumentationResult<Cow<'b, [u8]>> {
        let unit = decode_unit(bytes)?;
        match self.instrument(&unit, class_info)? {
            InstrumentationOutcome::Rewritten(rewritten) if rewritten.modified => {
                let encoded = encode_unit(&rewritten.unit)
                    .map_err(|err| InstrumentationError::unit_failed(unit.name(), err))?;
                Ok(Cow::Owned(encoded))
            }
            _ => Ok(Cow::Borrowed(bytes)),
        }
    }

    fn preset_class_info_for(&self, unit: &CompiledUnit) -> Option<&ClassInfo> {
        self.config
            .preset_class_info
            .as_ref()
            .filter(|info| info.internal_name == unit.name())
    }

    fn preset_trace_info_for(&self, unit: &CompiledUnit) -> Option<&ClassTraceInfo> {
        self.config
            .preset_trace_info
            .as_ref()
            .filter(|info| info.describes(unit.name()))
    }
}
