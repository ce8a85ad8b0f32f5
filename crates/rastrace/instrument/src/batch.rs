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

//! Parallel batch driver
//!
//! Units are independent, so a batch fans out over the rayon pool. A unit
//! that fails is reported in the batch result and does not stop the others.

use crate::engine::{InstrumentationOutcome, TraceInstrumenter};
use crate::error::{InstrumentationError, InstrumentationResult};
use metrics::counter;
use rastrace_model::{ClassInfo, CompiledUnit};
use rayon::prelude::*;
use tracing::{info, warn};

/// One unit queued for instrumentation
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub unit: CompiledUnit,
    pub class_info: Option<ClassInfo>,
}

impl From<CompiledUnit> for BatchItem {
    fn from(unit: CompiledUnit) -> Self {
        Self { unit, class_info: None }
    }
}

/// Outcome for one unit of a batch
#[derive(Debug)]
pub struct UnitReport {
    pub unit: String,
    pub result: InstrumentationResult<InstrumentationOutcome>,
}

/// Outcomes for a whole batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub units: Vec<UnitReport>,
}

impl BatchReport {
    /// Units that were rewritten with changes
    pub fn modified(&self) -> usize {
        self.outcomes().filter(|outcome| outcome.is_modified()).count()
    }

    /// Units rejected by the eligibility gate
    pub fn not_eligible(&self) -> usize {
        self.outcomes().filter(|outcome| !outcome.is_eligible()).count()
    }

    /// Units that went through without changes
    pub fn unchanged(&self) -> usize {
        self.outcomes()
            .filter(|outcome| outcome.is_eligible() && !outcome.is_modified())
            .count()
    }

    /// Failed units and their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &InstrumentationError)> {
        self.units
            .iter()
            .filter_map(|report| report.result.as_ref().err().map(|err| (report.unit.as_str(), err)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    fn outcomes(&self) -> impl Iterator<Item = &InstrumentationOutcome> {
        self.units.iter().filter_map(|report| report.result.as_ref().ok())
    }
}

impl TraceInstrumenter {
    /// Instrument many units in parallel
    pub fn instrument_batch<I>(&self, items: I) -> BatchReport
    where
        I: IntoIterator,
        I::Item: Into<BatchItem>,
    {
        let items: Vec<BatchItem> = items.into_iter().map(Into::into).collect();
        let units: Vec<UnitReport> = items
            .par_iter()
            .map(|item| {
                let result = self.instrument(&item.unit, item.class_info.as_ref());
                if let Err(err) = &result {
                    counter!("rastrace_batch_failures", 1);
                    warn!(unit = %item.unit.name(), error = %err, "Unit failed, continuing with batch");
                }
                UnitReport {
                    unit: item.unit.name().to_string(),
                    result,
                }
            })
            .collect();

        let report = BatchReport { units };
        info!(
            units = report.units.len(),
            modified = report.modified(),
            not_eligible = report.not_eligible(),
            failed = report.failures().count(),
            "Batch finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InstrumentationConfig;
    use rastrace_model::{AccessFlags, Code, Instruction, MethodNode};

    fn unit(name: &str, code: Vec<Instruction>) -> CompiledUnit {
        CompiledUnit::new(name)
            .with_method(MethodNode::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "run", "()V").with_code(Code::new(code)))
    }

    #[test]
    fn test_failure_is_isolated() {
        let engine =
            TraceInstrumenter::new(InstrumentationConfig::full_synthesis().with_throw_on_frame_failure(true)).unwrap();
        let batch = vec![
            unit("com/example/A", vec![Instruction::Return(None)]),
            unit("com/example/Broken", vec![Instruction::Pop, Instruction::Return(None)]),
            unit("com/example/C", vec![Instruction::Return(None)]),
        ];

        let report = engine.instrument_batch(batch);

        assert_eq!(report.units.len(), 3);
        assert_eq!(report.modified(), 2);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "com/example/Broken");
        assert_eq!(failures[0].1.unit(), Some("com/example/Broken"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_keeps_input_order() {
        let engine = TraceInstrumenter::new(InstrumentationConfig::preprocessed_only()).unwrap();
        let names: Vec<String> = (0..32).map(|i| format!("com/example/Unit{}", i)).collect();
        let report = engine.instrument_batch(names.iter().map(|name| unit(name, vec![Instruction::Return(None)])));

        let reported: Vec<&str> = report.units.iter().map(|r| r.unit.as_str()).collect();
        assert_eq!(reported, names.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(report.not_eligible(), 32);
        assert_eq!(report.unchanged(), 0);
        assert!(report.is_clean());
    }
}
