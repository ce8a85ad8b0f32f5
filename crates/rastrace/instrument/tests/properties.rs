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

//! Property tests for the instrumentation pass over generated units

mod common;

use common::*;
use proptest::prelude::*;
use rastrace_instrument::trace_api::{LOGGER_ANNOTATION, TRACE_COMPONENT_DESCRIPTOR, TRIVIAL_ANNOTATION};
use rastrace_instrument::{
    DEFAULT_TRACE_FIELD_NAME, InstrumentationConfig, InstrumentationOutcome, TraceInstrumenter, UnitEligibility,
};
use rastrace_model::{AccessFlags, Annotation, CompiledUnit, FieldNode, MethodNode};

#[derive(Debug, Clone, Copy)]
enum MethodShape {
    Traced { is_static: bool, returns: u32 },
    Abstract,
    Native,
    Synthetic,
    Trivial,
}

impl MethodShape {
    fn build(self, index: usize) -> MethodNode {
        let name = format!("m{}", index);
        match self {
            Self::Traced { is_static, returns } => branching_method(&name, is_static, returns),
            Self::Abstract => abstract_method(&name),
            Self::Native => native_method(&name),
            Self::Synthetic => {
                let mut method = branching_method(&name, true, 1);
                method.access = method.access | AccessFlags::SYNTHETIC;
                method
            }
            Self::Trivial => branching_method(&name, false, 2).with_annotation(Annotation::new(TRIVIAL_ANNOTATION)),
        }
    }

    fn is_traced(self) -> bool {
        matches!(self, Self::Traced { .. })
    }
}

fn method_shape() -> impl Strategy<Value = MethodShape> {
    prop_oneof![
        3 => (any::<bool>(), 1u32..5).prop_map(|(is_static, returns)| MethodShape::Traced { is_static, returns }),
        1 => Just(MethodShape::Abstract),
        1 => Just(MethodShape::Native),
        1 => Just(MethodShape::Synthetic),
        1 => Just(MethodShape::Trivial),
    ]
}

/// Unit with generated methods, optionally declaring a `@Logger` trace field
/// and optionally squatting on the reserved field name
fn unit_strategy() -> impl Strategy<Value = (CompiledUnit, Vec<MethodShape>)> {
    (
        prop::collection::vec(method_shape(), 0..8),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(shapes, with_logger, squat_reserved)| {
            let mut unit = CompiledUnit::new("com/example/Generated");
            if with_logger {
                unit = unit.with_field(
                    trace_component_field("tc").with_annotation(Annotation::new(LOGGER_ANNOTATION)),
                );
            }
            if squat_reserved {
                unit = unit.with_field(FieldNode::new(AccessFlags::PRIVATE, DEFAULT_TRACE_FIELD_NAME, "I"));
            }
            for (index, shape) in shapes.iter().enumerate() {
                unit = unit.with_method(shape.build(index));
            }
            (unit, shapes)
        })
}

fn full_synthesis() -> TraceInstrumenter {
    TraceInstrumenter::new(InstrumentationConfig::full_synthesis()).unwrap()
}

fn preprocessed_only() -> TraceInstrumenter {
    TraceInstrumenter::new(InstrumentationConfig::preprocessed_only()).unwrap()
}

proptest! {
    #[test]
    fn instrumentation_is_idempotent((unit, _) in unit_strategy()) {
        let first = full_synthesis().instrument(&unit, None).unwrap().into_rewritten().unwrap();
        let second = preprocessed_only().instrument(&first.unit, None).unwrap().into_rewritten().unwrap();
        prop_assert!(!second.modified);
        prop_assert_eq!(second.unit, first.unit);
    }

    #[test]
    fn unannotated_units_are_rejected_without_records((unit, _) in unit_strategy()) {
        let outcome = preprocessed_only().instrument(&unit, None).unwrap();
        prop_assert_eq!(
            outcome,
            InstrumentationOutcome::NotEligible { reason: UnitEligibility::MissingTraceObjectField }
        );
    }

    #[test]
    fn only_traceable_methods_are_modified((unit, shapes) in unit_strategy()) {
        let rewritten = full_synthesis().instrument(&unit, None).unwrap().into_rewritten().unwrap();
        let expected = shapes.iter().filter(|shape| shape.is_traced()).count();
        prop_assert_eq!(rewritten.summary.modified_methods, expected);
        prop_assert_eq!(rewritten.summary.recorded_methods, shapes.len());
        prop_assert_eq!(rewritten.frame_failures, 0);
    }

    #[test]
    fn trace_field_selection_is_deterministic((unit, _) in unit_strategy()) {
        let engine = full_synthesis();
        let first = engine.instrument(&unit, None).unwrap();
        let second = engine.instrument(&unit, None).unwrap();
        prop_assert_eq!(&first, &second);

        let rewritten = first.into_rewritten().unwrap();
        let trace_fields: Vec<_> = rewritten
            .unit
            .fields
            .iter()
            .filter(|field| field.descriptor == TRACE_COMPONENT_DESCRIPTOR)
            .collect();
        // never a second trace field next to a usable declared logger
        prop_assert_eq!(trace_fields.len(), 1);
    }
}
