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

//! Integration tests for the complete instrumentation pass
//!
//! These tests drive whole units through the engine and inspect the
//! re-emitted units: synthesized members, injected calls, idempotence
//! across passes and the frame failure policy.

mod common;

use anyhow::{Context, Result};
use common::*;
use rastrace_instrument::trace_api::{
    INJECTED_TRACE_ANNOTATION, TRACE_COMPONENT_DESCRIPTOR, TRACE_OBJECT_FIELD_ANNOTATION, TRACE_OBJECT_FIELD_NAME,
};
use rastrace_instrument::{
    DEFAULT_TRACE_FIELD_NAME, InstrumentationConfig, InstrumentationError, InstrumentationOutcome, MethodEligibility,
    TraceInstrumenter, UnitEligibility,
};
use rastrace_model::codec::encode_unit;
use rastrace_model::{
    AccessFlags, BytecodeError, ClassInfo, ClassTraceInfo, Code, CompiledUnit, Constant, FieldInfo, Instruction, MethodNode,
    TraceOptions, ValueKind,
};
use std::borrow::Cow;

fn engine(config: InstrumentationConfig) -> Result<TraceInstrumenter> {
    Ok(TraceInstrumenter::new(config)?)
}

/// Fresh unit with no tracing infrastructure
fn fresh_unit() -> CompiledUnit {
    CompiledUnit::new("com/example/Worker")
        .with_method(branching_method("doWork", false, 2))
        .with_method(abstract_method("describe"))
}

/// Unit already carrying an annotated `tc` field and its registration
fn preprocessed_unit() -> CompiledUnit {
    CompiledUnit::new("com/example/Pre")
        .with_annotation(trace_object_field("tc"))
        .with_field(trace_component_field("tc"))
        .with_method(registering_initializer("com/example/Pre", "tc"))
        .with_method(branching_method("doWork", true, 1))
}

#[test]
fn test_full_synthesis_from_scratch() -> Result<()> {
    init_tracing();
    let unit = fresh_unit();
    let outcome = engine(InstrumentationConfig::full_synthesis())?.instrument(&unit, None)?;
    let rewritten = outcome.into_rewritten().context("unit should be eligible")?;
    assert!(rewritten.modified);

    let field = rewritten.unit.field(DEFAULT_TRACE_FIELD_NAME).context("trace field")?;
    assert_eq!(field.descriptor, TRACE_COMPONENT_DESCRIPTOR);
    assert!(field.access.contains(AccessFlags::PRIVATE | AccessFlags::STATIC | AccessFlags::FINAL));

    let annotation = rewritten
        .unit
        .annotation(TRACE_OBJECT_FIELD_ANNOTATION)
        .context("trace object field annotation")?;
    assert_eq!(annotation.string(TRACE_OBJECT_FIELD_NAME), Some(DEFAULT_TRACE_FIELD_NAME));

    let initializer = rewritten.unit.method("<clinit>", "()V").context("static initializer")?;
    let code = initializer.code.as_ref().context("initializer body")?;
    assert_eq!(tr_calls(code, "register").count(), 1);
    assert!(matches!(
        code.instructions.iter().rev().nth(1),
        Some(Instruction::PutStatic(field)) if field.name == DEFAULT_TRACE_FIELD_NAME && field.owner == "com/example/Worker"
    ));

    let work = rewritten.unit.method("doWork", "(I)V").context("doWork")?;
    assert!(work.has_annotation(INJECTED_TRACE_ANNOTATION));
    let code = work.code.as_ref().context("doWork body")?;
    assert_eq!(tr_calls(code, "entry").count(), 1);
    assert_eq!(tr_calls(code, "exit").count(), 3);

    let describe = rewritten.unit.method("describe", "()V").context("describe")?;
    assert!(describe.code.is_none());
    assert!(!describe.has_annotation(INJECTED_TRACE_ANNOTATION));

    let eligibilities: Vec<_> = rewritten.records.iter().map(|r| r.eligibility).collect();
    assert_eq!(eligibilities, vec![MethodEligibility::Instrumented, MethodEligibility::NoBody]);
    assert!(rewritten.summary.field_definition_required);
    assert!(rewritten.summary.static_initializer_required);
    Ok(())
}

#[test]
fn test_preprocessed_unit_with_existing_field() -> Result<()> {
    init_tracing();
    let unit = preprocessed_unit();
    let outcome = engine(InstrumentationConfig::preprocessed_only())?.instrument(&unit, None)?;
    let rewritten = outcome.into_rewritten().context("unit should be eligible")?;

    assert!(rewritten.modified);
    assert!(!rewritten.summary.field_definition_required);
    assert!(!rewritten.summary.static_initializer_required);
    assert_eq!(rewritten.unit.fields, unit.fields);
    assert_eq!(rewritten.unit.annotations, unit.annotations);
    assert_eq!(rewritten.unit.method("<clinit>", "()V"), unit.method("<clinit>", "()V"));

    let work = rewritten.unit.method("doWork", "(I)V").context("doWork")?;
    let code = work.code.as_ref().context("doWork body")?;
    assert!(code.instructions.iter().any(|insn| matches!(
        insn,
        Instruction::GetStatic(field) if field.name == "tc" && field.owner == "com/example/Pre"
    )));
    assert!(!code.instructions.iter().any(|insn| matches!(
        insn,
        Instruction::GetStatic(field) if field.name == DEFAULT_TRACE_FIELD_NAME
    )));

    let eligibilities: Vec<_> = rewritten.records.iter().map(|r| r.eligibility).collect();
    assert_eq!(
        eligibilities,
        vec![MethodEligibility::StaticInitializer, MethodEligibility::Instrumented]
    );
    Ok(())
}

#[test]
fn test_second_pass_changes_nothing() -> Result<()> {
    init_tracing();
    let first = engine(InstrumentationConfig::full_synthesis())?
        .instrument(&fresh_unit(), None)?
        .into_rewritten()
        .context("first pass")?;

    let preprocessed = engine(InstrumentationConfig::preprocessed_only())?;
    let second = preprocessed
        .instrument(&first.unit, None)?
        .into_rewritten()
        .context("output of a full pass is preprocessed")?;
    assert!(!second.modified);
    assert_eq!(second.unit, first.unit);
    assert!(
        second
            .records
            .iter()
            .all(|record| record.eligibility != MethodEligibility::Instrumented)
    );

    let bytes = encode_unit(&first.unit)?;
    assert!(matches!(preprocessed.instrument_bytes(&bytes, None)?, Cow::Borrowed(_)));

    // another full pass reports the initializer requirement but leaves content alone
    let again = engine(InstrumentationConfig::full_synthesis())?
        .instrument(&first.unit, None)?
        .into_rewritten()
        .context("third pass")?;
    assert_eq!(again.unit, first.unit);
    assert_eq!(again.summary.modified_methods, 0);
    Ok(())
}

#[test]
fn test_unannotated_unit_is_not_eligible() -> Result<()> {
    init_tracing();
    let outcome = engine(InstrumentationConfig::preprocessed_only())?.instrument(&fresh_unit(), None)?;
    assert_eq!(
        outcome,
        InstrumentationOutcome::NotEligible {
            reason: UnitEligibility::MissingTraceObjectField
        }
    );
    Ok(())
}

fn preset_trace_info(unit: &str) -> ClassTraceInfo {
    ClassTraceInfo::new(unit).with_trace_object_field(FieldInfo::new("tc", TRACE_COMPONENT_DESCRIPTOR))
}

#[test]
fn test_preset_trace_info_opens_the_gate_for_its_unit() -> Result<()> {
    init_tracing();
    let unit = CompiledUnit::new("com/example/Preset")
        .with_field(trace_component_field("tc"))
        .with_method(branching_method("doWork", true, 1));
    let config = InstrumentationConfig::preprocessed_only().with_trace_info(preset_trace_info("com/example/Preset"));

    let rewritten = engine(config)?
        .instrument(&unit, None)?
        .into_rewritten()
        .context("preset trace info satisfies the gate")?;
    assert!(rewritten.modified);
    assert!(rewritten.unit.annotations.is_empty());
    Ok(())
}

#[test]
fn test_preset_trace_info_does_not_leak_across_batch() -> Result<()> {
    init_tracing();
    let named = CompiledUnit::new("com/example/Preset")
        .with_field(trace_component_field("tc"))
        .with_method(branching_method("doWork", true, 2));
    let unrelated = CompiledUnit::new("com/example/Unrelated").with_method(branching_method("doWork", true, 3));
    let config = InstrumentationConfig::preprocessed_only().with_trace_info(preset_trace_info("com/example/Preset"));

    let report = engine(config)?.instrument_batch(vec![named, unrelated.clone()]);
    assert!(report.is_clean());

    let outcome = |name: &str| {
        report
            .units
            .iter()
            .find(|entry| entry.unit == name)
            .and_then(|entry| entry.result.as_ref().ok())
    };
    assert!(outcome("com/example/Preset").context("named unit")?.is_modified());
    assert_eq!(
        outcome("com/example/Unrelated").context("unrelated unit")?,
        &InstrumentationOutcome::NotEligible {
            reason: UnitEligibility::MissingTraceObjectField
        }
    );

    let alone = engine(
        InstrumentationConfig::preprocessed_only().with_trace_info(preset_trace_info("com/example/Preset")),
    )?
    .instrument(&unrelated, None)?;
    assert!(!alone.is_eligible());
    Ok(())
}

#[test]
fn test_annotated_field_with_only_bodiless_methods_is_unmodified() -> Result<()> {
    init_tracing();
    let unit = CompiledUnit::new("com/example/Api")
        .with_annotation(trace_object_field("tc"))
        .with_field(trace_component_field("tc"))
        .with_method(abstract_method("open"))
        .with_method(native_method("handle"));

    let rewritten = engine(InstrumentationConfig::preprocessed_only())?
        .instrument(&unit, None)?
        .into_rewritten()
        .context("annotated unit is eligible")?;
    assert!(!rewritten.modified);
    assert_eq!(rewritten.unit, unit);
    assert_eq!(rewritten.records.len(), 2);
    assert!(rewritten.records.iter().all(|r| r.eligibility == MethodEligibility::NoBody));
    Ok(())
}

#[test]
fn test_exception_exit_rethrows_caught_object() -> Result<()> {
    init_tracing();
    let rewritten = engine(InstrumentationConfig::full_synthesis())?
        .instrument(&fresh_unit(), None)?
        .into_rewritten()
        .context("eligible")?;
    let work = rewritten.unit.method("doWork", "(I)V").context("doWork")?;
    let code = work.code.as_ref().context("body")?;

    let handler = code.handlers.last().context("catch-all handler")?;
    assert_eq!(handler.catch_type, None);
    let position = |label| {
        code.instructions
            .iter()
            .position(|insn| *insn == Instruction::Label(label))
    };
    let handler_at = position(handler.handler).context("handler label")?;
    let start_at = position(handler.start).context("start label")?;
    let entry_at = code
        .instructions
        .iter()
        .position(|insn| matches!(insn, Instruction::Invoke { method, .. } if method.name == "entry"))
        .context("entry call")?;
    assert!(entry_at < start_at, "entry call is outside the protected range");

    let tail = &code.instructions[handler_at + 1..];
    let Some(Instruction::Store { kind: ValueKind::Reference, index }) = tail.first() else {
        panic!("handler must store the throwable first, found {:?}", tail.first());
    };
    // `this` and the int argument occupy slots 0 and 1
    assert_eq!(*index, 2);
    assert_eq!(
        &tail[tail.len() - 2..],
        &[
            Instruction::Load { kind: ValueKind::Reference, index: 2 },
            Instruction::Throw
        ]
    );
    let exits_with_throwable: Vec<_> = tail
        .iter()
        .filter(|insn| matches!(insn, Instruction::Invoke { method, .. } if method.name == "exit" && method.descriptor.contains("Ljava/lang/Object;")))
        .collect();
    assert_eq!(exits_with_throwable.len(), 1);
    assert_eq!(tail.iter().filter(|insn| **insn == Instruction::Throw).count(), 1);
    Ok(())
}

#[test]
fn test_trace_options_reach_registration() -> Result<()> {
    init_tracing();
    let info = ClassInfo::new("com/example/Worker").with_trace_options(TraceOptions {
        trace_groups: vec!["worker".into()],
        message_bundle: Some("com.example.resources.WorkerMessages".into()),
    });
    let rewritten = engine(InstrumentationConfig::full_synthesis())?
        .instrument(&fresh_unit(), Some(&info))?
        .into_rewritten()
        .context("eligible")?;

    let code = rewritten
        .unit
        .method("<clinit>", "()V")
        .and_then(|m| m.code.as_ref())
        .context("initializer")?;
    assert_eq!(code.instructions[1], Instruction::Const(Constant::String("worker".into())));
    assert_eq!(
        code.instructions[2],
        Instruction::Const(Constant::String("com.example.resources.WorkerMessages".into()))
    );
    assert_eq!(code.max_stack, 3);
    Ok(())
}

#[test]
fn test_frame_failure_policy() -> Result<()> {
    init_tracing();
    let broken = MethodNode::new(AccessFlags::PUBLIC | AccessFlags::STATIC, "broken", "()V")
        .with_code(Code::new(vec![Instruction::Pop, Instruction::Return(None)]).with_maxs(4, 2));
    let unit = CompiledUnit::new("com/example/Broken").with_method(broken);

    let tolerant = engine(InstrumentationConfig::full_synthesis())?
        .instrument(&unit, None)?
        .into_rewritten()
        .context("tolerant pass keeps the unit")?;
    assert_eq!(tolerant.frame_failures, 1);
    let code = tolerant
        .unit
        .method("broken", "()V")
        .and_then(|m| m.code.as_ref())
        .context("body")?;
    assert!(code.max_stack >= 4);

    let err = engine(InstrumentationConfig::full_synthesis().with_throw_on_frame_failure(true))?
        .instrument(&unit, None)
        .unwrap_err();
    assert_eq!(err.unit(), Some("com/example/Broken"));
    assert!(matches!(
        err,
        InstrumentationError::UnitFailed {
            source: BytecodeError::FrameComputation { .. },
            ..
        }
    ));
    Ok(())
}
