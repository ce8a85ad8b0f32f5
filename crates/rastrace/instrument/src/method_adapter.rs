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

//! Method instrumentation
//!
//! [`TracingMethodAdapter`] sits between a method body and a downstream
//! [`MethodVisitor`] and interleaves trace calls with the original
//! instructions:
//!
//! * after the body starts, a guarded `Tr.entry`
//! * before every return, a guarded `Tr.exit`
//! * a catch-all handler covering the original body, appended after every
//!   existing handler, that stores the throwable, issues a guarded
//!   `Tr.exit(tc, name, throwable)` and rethrows the same object
//!
//! Original instructions and handlers pass through unchanged and in order.

use crate::trace_api::{self, INJECTED_TRACE_ANNOTATION, TRIVIAL_ANNOTATION};
use rastrace_model::{
    Annotation, CodeBuilder, ExceptionHandler, FieldRef, Instruction, Label, MethodDescriptor, MethodNode, MethodVisitor,
};
use serde::Serialize;
use tracing::debug;

/// Why a method was or was not instrumented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MethodEligibility {
    /// Trace calls were inserted
    Instrumented,
    /// Abstract or native
    NoBody,
    /// Receives trace field initialization from the class adapter instead
    StaticInitializer,
    /// Synthetic or bridge
    Synthetic,
    /// Method or its unit is marked trivial
    Trivial,
    /// Carries the injected-trace marker from an earlier pass
    AlreadyInstrumented,
    /// No trace field could be resolved for the unit
    NoTraceField,
}

impl MethodEligibility {
    /// Decide eligibility for one method
    pub fn of(method: &MethodNode, trace_field: Option<&FieldRef>, unit_trivial: bool) -> Self {
        if !method.has_body() {
            Self::NoBody
        } else if method.is_static_initializer() {
            Self::StaticInitializer
        } else if method.access.is_synthetic() {
            Self::Synthetic
        } else if method.has_annotation(INJECTED_TRACE_ANNOTATION) {
            Self::AlreadyInstrumented
        } else if unit_trivial || method.has_annotation(TRIVIAL_ANNOTATION) {
            Self::Trivial
        } else if trace_field.is_none() {
            Self::NoTraceField
        } else {
            Self::Instrumented
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instrumented => "instrumented",
            Self::NoBody => "no_body",
            Self::StaticInitializer => "static_initializer",
            Self::Synthetic => "synthetic",
            Self::Trivial => "trivial",
            Self::AlreadyInstrumented => "already_instrumented",
            Self::NoTraceField => "no_trace_field",
        }
    }
}

/// Per-method outcome kept by the class adapter for one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInstrumentationRecord {
    pub name: String,
    pub descriptor: String,
    pub eligibility: MethodEligibility,
    /// At least one instruction was inserted
    pub modified: bool,
    pub inserted_instructions: usize,
}

impl MethodInstrumentationRecord {
    fn untouched(method: &MethodNode, eligibility: MethodEligibility) -> Self {
        Self {
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            eligibility,
            modified: false,
            inserted_instructions: 0,
        }
    }

    pub fn is_modified_method(&self) -> bool {
        self.modified
    }
}

/// Method visitor that inserts entry, exit and exception-exit trace calls
pub struct TracingMethodAdapter<M: MethodVisitor> {
    next: M,
    trace_field: FieldRef,
    method_name: String,
    next_label: u32,
    try_start: Label,
    try_end: Label,
    handler: Label,
    /// Lowest local index free in the original body
    first_free_local: u16,
    inserted: usize,
}

impl<M: MethodVisitor> TracingMethodAdapter<M> {
    /// Create an adapter for `method`; `first_free_label` must not be used by its body
    pub fn new(next: M, trace_field: FieldRef, method: &MethodNode, first_free_label: Label) -> Self {
        let receiver = if method.access.is_static() { 0 } else { 1 };
        let param_slots = MethodDescriptor::parse(&method.descriptor)
            .map(|descriptor| descriptor.param_slots())
            .unwrap_or(0);
        let mut adapter = Self {
            next,
            trace_field,
            method_name: method.name.clone(),
            next_label: first_free_label.0,
            try_start: first_free_label,
            try_end: first_free_label,
            handler: first_free_label,
            first_free_local: param_slots.saturating_add(receiver),
            inserted: 0,
        };
        adapter.try_start = adapter.fresh_label();
        adapter.try_end = adapter.fresh_label();
        adapter.handler = adapter.fresh_label();
        adapter
    }

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn emit(&mut self, instructions: Vec<Instruction>) {
        for instruction in instructions {
            if !matches!(instruction, Instruction::Label(_)) {
                self.inserted += 1;
            }
            self.next.visit_instruction(instruction);
        }
    }

    /// True iff at least one instruction was inserted
    pub fn is_modified_method(&self) -> bool {
        self.inserted > 0
    }

    /// Number of inserted instructions, labels excluded
    pub fn inserted_instructions(&self) -> usize {
        self.inserted
    }

    /// Finish and hand back the downstream visitor
    pub fn into_inner(self) -> M {
        self.next
    }
}

impl<M: MethodVisitor> MethodVisitor for TracingMethodAdapter<M> {
    fn visit_code(&mut self) {
        self.next.visit_code();
        let skip = self.fresh_label();
        let entry = trace_api::entry_call(&self.trace_field, &self.method_name, skip);
        self.emit(entry);
        self.next.visit_instruction(Instruction::Label(self.try_start));
    }

    fn visit_try_catch(&mut self, handler: ExceptionHandler) {
        self.next.visit_try_catch(handler);
    }

    fn visit_instruction(&mut self, instruction: Instruction) {
        match &instruction {
            Instruction::Return(_) => {
                let skip = self.fresh_label();
                let exit = trace_api::exit_call(&self.trace_field, &self.method_name, skip);
                self.emit(exit);
            }
            Instruction::Load { kind, index } | Instruction::Store { kind, index } => {
                self.first_free_local = self.first_free_local.max(index.saturating_add(kind.slots()));
            }
            _ => {}
        }
        self.next.visit_instruction(instruction);
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        let local = self.first_free_local.max(max_locals);
        self.next.visit_instruction(Instruction::Label(self.try_end));
        self.next.visit_instruction(Instruction::Label(self.handler));
        let skip = self.fresh_label();
        let exception_exit = trace_api::exception_exit_call(&self.trace_field, &self.method_name, local, skip);
        self.emit(exception_exit);
        self.next.visit_try_catch(ExceptionHandler {
            start: self.try_start,
            end: self.try_end,
            handler: self.handler,
            catch_type: None,
        });
        // the writer recomputes; these only need to be safe upper bounds
        self.next.visit_maxs(max_stack.max(3), local.saturating_add(1));
    }

    fn visit_end(&mut self) {
        self.next.visit_end();
    }
}

/// Run one method through the tracing policy
///
/// Returns the (possibly rewritten) method and its record. Rewritten methods
/// gain the injected-trace marker so later passes leave them alone.
pub fn instrument_method(
    mut method: MethodNode,
    trace_field: Option<&FieldRef>,
    unit_trivial: bool,
) -> (MethodNode, MethodInstrumentationRecord) {
    let eligibility = MethodEligibility::of(&method, trace_field, unit_trivial);
    let trace_field = match trace_field {
        Some(field) if eligibility == MethodEligibility::Instrumented => field,
        _ => {
            debug!(method = %method.signature(), eligibility = eligibility.as_str(), "Method left untouched");
            let record = MethodInstrumentationRecord::untouched(&method, eligibility);
            return (method, record);
        }
    };
    let Some(code) = method.code.take() else {
        let record = MethodInstrumentationRecord::untouched(&method, MethodEligibility::NoBody);
        return (method, record);
    };

    let mut adapter = TracingMethodAdapter::new(CodeBuilder::new(), trace_field.clone(), &method, code.next_label());
    code.accept(&mut adapter);
    let inserted = adapter.inserted_instructions();
    let modified = adapter.is_modified_method();
    method.code = Some(adapter.into_inner().finish());
    if modified {
        method.annotations.push(Annotation::new(INJECTED_TRACE_ANNOTATION));
    }

    let record = MethodInstrumentationRecord {
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        eligibility,
        modified,
        inserted_instructions: inserted,
    };
    debug!(method = %method.signature(), inserted, "Method instrumented");
    (method, record)
}
