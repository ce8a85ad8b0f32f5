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

//! Class instrumentation policy
//!
//! [`TracingClassAdapter`] is a [`ClassVisitor`] placed in front of another
//! class visitor, usually a [`UnitWriter`](rastrace_model::UnitWriter). It
//! observes class annotations and field declarations, then seals its view of
//! the unit before the first method: the trace field is resolved, the
//! eligibility gate is evaluated, and the trace-object-field annotation is
//! ensured. Every method after that point is routed through
//! [`instrument_method`]. Members the unit is missing (trace field, static
//! initializer) are emitted at the end of the walk.
//!
//! Field declarations are held back until the unit is sealed so that a
//! synthesized or replaced class annotation still precedes every field.

use crate::config::InstrumentationMode;
use crate::method_adapter::{MethodInstrumentationRecord, instrument_method};
use crate::resolver::{Resolution, ResolverInput, TraceField, resolve_trace_field};
use crate::summary::ModificationSummary;
use crate::trace_api::{
    self, TRACE_OBJECT_FIELD_ANNOTATION, TRACE_OBJECT_FIELD_DESC, TRACE_OBJECT_FIELD_NAME, TRIVIAL_ANNOTATION,
    is_trace_component,
};
use rastrace_model::unit::STATIC_INITIALIZER;
use rastrace_model::{
    AccessFlags, Annotation, BytecodeError, BytecodeResult, ClassHeader, ClassInfo, ClassTraceInfo, ClassVisitor, Code,
    FieldInfo, FieldNode, FieldRef, Instruction, MethodNode,
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of the mode-dependent eligibility gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UnitEligibility {
    Eligible,
    /// Preprocessed-only mode and the unit names no trace-object field
    MissingTraceObjectField,
    /// Preprocessed-only mode and the named field is not a trace handle
    WrongTraceObjectFieldType { descriptor: String },
}

impl UnitEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::MissingTraceObjectField => "missing_trace_object_field",
            Self::WrongTraceObjectFieldType { .. } => "wrong_trace_object_field_type",
        }
    }
}

/// Decisions fixed before the first method is seen
#[derive(Debug)]
struct Sealed {
    eligibility: UnitEligibility,
    resolution: Resolution,
    /// Set only for eligible units
    trace_field: Option<FieldRef>,
}

/// Class visitor applying the tracing policy to one unit
pub struct TracingClassAdapter<'a, V: ClassVisitor> {
    next: V,
    mode: InstrumentationMode,
    class_info: Option<&'a ClassInfo>,
    trace_info: Option<&'a ClassTraceInfo>,
    owner: Option<String>,
    /// Field named by the unit's own trace-object-field annotation
    observed_trace_object: Option<FieldInfo>,
    /// That annotation, held until the unit is sealed
    trace_object_annotation: Option<Annotation>,
    class_trivial: bool,
    pending_fields: Vec<FieldNode>,
    declared_fields: HashSet<String>,
    sealed: Option<Sealed>,
    records: Vec<MethodInstrumentationRecord>,
    static_initializer_seen: bool,
}

impl<'a, V: ClassVisitor> TracingClassAdapter<'a, V> {
    pub fn new(next: V, mode: InstrumentationMode) -> Self {
        Self {
            next,
            mode,
            class_info: None,
            trace_info: None,
            owner: None,
            observed_trace_object: None,
            trace_object_annotation: None,
            class_trivial: false,
            pending_fields: Vec::new(),
            declared_fields: HashSet::new(),
            sealed: None,
            records: Vec::new(),
            static_initializer_seen: false,
        }
    }

    /// Metadata describing the unit's declared logger, trace options and triviality
    pub fn with_class_info(mut self, class_info: Option<&'a ClassInfo>) -> Self {
        self.class_info = class_info;
        self
    }

    /// Trace information from an earlier preprocessing pass; ignored unless it
    /// names the visited unit
    pub fn with_trace_info(mut self, trace_info: Option<&'a ClassTraceInfo>) -> Self {
        self.trace_info = trace_info;
        self
    }

    /// Gate outcome, once the unit is sealed
    pub fn eligibility(&self) -> Option<&UnitEligibility> {
        self.sealed.as_ref().map(|sealed| &sealed.eligibility)
    }

    /// Resolved trace field for an eligible unit
    pub fn trace_field(&self) -> Option<&TraceField> {
        self.sealed
            .as_ref()
            .filter(|sealed| sealed.eligibility.is_eligible())
            .map(|sealed| &sealed.resolution.field)
    }

    /// Full resolver outcome, once the unit is sealed
    pub fn resolution(&self) -> Option<&Resolution> {
        self.sealed.as_ref().map(|sealed| &sealed.resolution)
    }

    pub fn is_trace_field_already_defined(&self) -> bool {
        self.sealed
            .as_ref()
            .is_some_and(|sealed| sealed.resolution.already_defined)
    }

    pub fn is_field_definition_required(&self) -> bool {
        if self.mode == InstrumentationMode::PreprocessedOnly {
            return false;
        }
        self.sealed
            .as_ref()
            .is_some_and(|sealed| sealed.eligibility.is_eligible() && !sealed.resolution.already_defined)
    }

    pub fn is_field_initialization_required(&self) -> bool {
        self.is_field_definition_required()
    }

    pub fn is_static_initializer_required(&self) -> bool {
        self.mode == InstrumentationMode::FullSynthesis
    }

    /// Records for every method routed through the method policy
    pub fn method_records(&self) -> &[MethodInstrumentationRecord] {
        &self.records
    }

    pub fn summary(&self) -> ModificationSummary {
        ModificationSummary::new(
            self.is_static_initializer_required(),
            self.is_field_definition_required(),
            self.is_field_initialization_required(),
            &self.records,
        )
    }

    pub fn is_class_modified(&self) -> bool {
        self.summary().is_modified()
    }

    /// Hand back the downstream visitor
    pub fn into_inner(self) -> V {
        self.next
    }

    fn owner(&self) -> BytecodeResult<&str> {
        self.owner.as_deref().ok_or(BytecodeError::MissingHeader)
    }

    fn is_unit_trivial(&self) -> bool {
        self.class_trivial || self.class_info.is_some_and(|info| info.trivial)
    }

    fn gate(&self, annotated: Option<&FieldInfo>) -> UnitEligibility {
        if self.mode == InstrumentationMode::FullSynthesis {
            return UnitEligibility::Eligible;
        }
        match annotated {
            None => UnitEligibility::MissingTraceObjectField,
            Some(field) if !is_trace_component(&field.descriptor) => UnitEligibility::WrongTraceObjectFieldType {
                descriptor: field.descriptor.clone(),
            },
            Some(_) => UnitEligibility::Eligible,
        }
    }

    /// Resolve, gate, ensure the class annotation and release held fields
    fn seal(&mut self) -> BytecodeResult<()> {
        if self.sealed.is_some() {
            return Ok(());
        }
        let owner = self.owner()?.to_string();

        let annotated = self
            .observed_trace_object
            .clone()
            .or_else(|| {
                self.trace_info
                    .filter(|info| info.describes(&owner))
                    .and_then(|info| info.trace_object_field.clone())
            });
        let eligibility = self.gate(annotated.as_ref());
        let resolution = resolve_trace_field(ResolverInput {
            annotated_field: annotated.as_ref(),
            declared_logger_field: self.class_info.and_then(|info| info.declared_logger_field.as_ref()),
            declared_field_names: Some(&self.declared_fields),
        });

        if let Some(rejection) = &resolution.rejected_logger {
            warn!(unit = %owner, reason = %rejection, "Declared logger field is unusable, synthesizing trace field");
        }
        match &eligibility {
            UnitEligibility::Eligible => debug!(
                unit = %owner,
                mode = self.mode.as_str(),
                field = %resolution.field.name,
                source = ?resolution.source,
                already_defined = resolution.already_defined,
                "Resolved trace field"
            ),
            UnitEligibility::MissingTraceObjectField => {
                debug!(unit = %owner, "Unit was not preprocessed, leaving it alone")
            }
            UnitEligibility::WrongTraceObjectFieldType { descriptor } => {
                warn!(unit = %owner, descriptor = %descriptor, "Trace object field is not a trace component, leaving unit alone")
            }
        }

        let held = self.trace_object_annotation.take();
        let annotation = match self.mode {
            InstrumentationMode::PreprocessedOnly => held,
            InstrumentationMode::FullSynthesis => match held {
                Some(existing) if annotated.as_ref().is_some_and(|field| is_trace_component(&field.descriptor)) => {
                    Some(existing)
                }
                Some(_) => {
                    debug!(unit = %owner, field = %resolution.field.name, "Replacing trace object field annotation");
                    Some(trace_object_field_annotation(&resolution.field))
                }
                None => Some(trace_object_field_annotation(&resolution.field)),
            },
        };
        if let Some(annotation) = annotation {
            self.next.on_annotation(annotation)?;
        }

        for field in std::mem::take(&mut self.pending_fields) {
            self.next.on_field(field)?;
        }

        let trace_field = eligibility
            .is_eligible()
            .then(|| resolution.field.field_ref(&owner));
        self.sealed = Some(Sealed {
            eligibility,
            resolution,
            trace_field,
        });
        Ok(())
    }

    fn sealed_trace_field(&self) -> Option<FieldRef> {
        self.sealed.as_ref().and_then(|sealed| sealed.trace_field.clone())
    }

    /// `Tr.register` call storing into the trace field
    fn field_initialization(&self) -> BytecodeResult<Vec<Instruction>> {
        let owner = self.owner()?;
        let trace_field = self
            .sealed_trace_field()
            .ok_or_else(|| BytecodeError::visitor_error(format!("no trace field resolved for {}", owner)))?;
        let options = self.class_info.and_then(|info| info.trace_options.as_ref());
        Ok(trace_api::register_call(owner, &trace_field, options))
    }

    fn prefix_static_initializer(&self, mut method: MethodNode) -> BytecodeResult<MethodNode> {
        if !(self.is_static_initializer_required() && self.is_field_initialization_required()) {
            return Ok(method);
        }
        let mut initialization = self.field_initialization()?;
        if let Some(code) = method.code.as_mut() {
            initialization.append(&mut code.instructions);
            code.instructions = initialization;
            code.max_stack = code.max_stack.max(3);
        }
        Ok(method)
    }

    fn synthesized_static_initializer(&self) -> BytecodeResult<MethodNode> {
        let mut instructions = self.field_initialization()?;
        instructions.push(Instruction::Return(None));
        Ok(MethodNode::new(AccessFlags::STATIC, STATIC_INITIALIZER, "()V")
            .with_code(Code::new(instructions).with_maxs(3, 0)))
    }
}

fn trace_object_field_annotation(field: &TraceField) -> Annotation {
    Annotation::new(TRACE_OBJECT_FIELD_ANNOTATION)
        .with_string(TRACE_OBJECT_FIELD_NAME, field.name.clone())
        .with_string(TRACE_OBJECT_FIELD_DESC, field.descriptor.clone())
}

impl<V: ClassVisitor> ClassVisitor for TracingClassAdapter<'_, V> {
    fn on_header(&mut self, header: ClassHeader) -> BytecodeResult<()> {
        self.owner = Some(header.name.clone());
        self.next.on_header(header)
    }

    fn on_annotation(&mut self, annotation: Annotation) -> BytecodeResult<()> {
        if annotation.is(TRACE_OBJECT_FIELD_ANNOTATION) {
            // both elements are needed to name a field
            self.observed_trace_object = annotation
                .string(TRACE_OBJECT_FIELD_NAME)
                .zip(annotation.string(TRACE_OBJECT_FIELD_DESC))
                .map(|(name, descriptor)| FieldInfo::new(name, descriptor));
            self.trace_object_annotation = Some(annotation);
            return Ok(());
        }
        if annotation.is(TRIVIAL_ANNOTATION) {
            self.class_trivial = true;
        }
        self.next.on_annotation(annotation)
    }

    fn on_field(&mut self, field: FieldNode) -> BytecodeResult<()> {
        self.declared_fields.insert(field.name.clone());
        if self.sealed.is_some() {
            return self.next.on_field(field);
        }
        self.pending_fields.push(field);
        Ok(())
    }

    fn on_method(&mut self, method: MethodNode) -> BytecodeResult<()> {
        self.seal()?;
        let eligible = self
            .sealed
            .as_ref()
            .is_some_and(|sealed| sealed.eligibility.is_eligible());
        if !eligible {
            return self.next.on_method(method);
        }

        let method = if method.is_static_initializer() {
            self.static_initializer_seen = true;
            self.prefix_static_initializer(method)?
        } else {
            method
        };

        let trace_field = self.sealed_trace_field();
        let (method, record) = instrument_method(method, trace_field.as_ref(), self.is_unit_trivial());
        self.records.push(record);
        self.next.on_method(method)
    }

    fn on_end(&mut self) -> BytecodeResult<()> {
        self.seal()?;

        if self.is_field_definition_required() {
            if let Some(field) = self.trace_field() {
                let node = FieldNode::new(
                    AccessFlags::PRIVATE | AccessFlags::STATIC | AccessFlags::FINAL,
                    field.name.clone(),
                    field.descriptor.clone(),
                );
                self.next.on_field(node)?;
            }
        }

        if self.is_static_initializer_required()
            && self.is_field_initialization_required()
            && !self.static_initializer_seen
        {
            let initializer = self.synthesized_static_initializer()?;
            self.next.on_method(initializer)?;
        }

        debug!(
            unit = %self.owner()?,
            methods = self.records.len(),
            modified = self.is_class_modified(),
            "Finished unit"
        );
        self.next.on_end()
    }
}
