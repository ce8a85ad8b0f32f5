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

//! Trace API surface targeted by the injected calls
//!
//! The engine never implements tracing itself. It emits calls against the
//! `Tr` facade and the `TraceComponent` handle, and recognizes the
//! annotations that mark units and methods for the pass.

use rastrace_model::{Condition, Constant, FieldRef, Instruction, Label, TraceOptions, Type, ValueKind};

/// Internal name of the static trace facade
pub const TR_CLASS: &str = "com/ibm/websphere/ras/Tr";

/// Internal name of the trace handle type
pub const TRACE_COMPONENT_CLASS: &str = "com/ibm/websphere/ras/TraceComponent";

/// Descriptor of the trace handle type
pub const TRACE_COMPONENT_DESCRIPTOR: &str = "Lcom/ibm/websphere/ras/TraceComponent;";

/// Class annotation naming the unit's trace handle field (`fieldName`, `fieldDesc`)
pub const TRACE_OBJECT_FIELD_ANNOTATION: &str = "Lcom/ibm/websphere/ras/annotation/TraceObjectField;";

/// Element of [`TRACE_OBJECT_FIELD_ANNOTATION`] holding the field name
pub const TRACE_OBJECT_FIELD_NAME: &str = "fieldName";

/// Element of [`TRACE_OBJECT_FIELD_ANNOTATION`] holding the field descriptor
pub const TRACE_OBJECT_FIELD_DESC: &str = "fieldDesc";

/// Class or method annotation suppressing tracing
pub const TRIVIAL_ANNOTATION: &str = "Lcom/ibm/websphere/ras/annotation/Trivial;";

/// Class annotation carrying trace group and message bundle
pub const TRACE_OPTIONS_ANNOTATION: &str = "Lcom/ibm/websphere/ras/annotation/TraceOptions;";

/// Field annotation marking the author's logger field
pub const LOGGER_ANNOTATION: &str = "Lcom/ibm/ws/ras/annotation/Logger;";

/// Method annotation added to every method that received trace calls
pub const INJECTED_TRACE_ANNOTATION: &str = "Lcom/ibm/ws/ras/instrument/annotation/InjectedTrace;";

const IS_ANY_TRACING_ENABLED: (&str, &str) = ("isAnyTracingEnabled", "()Z");
const IS_ENTRY_ENABLED: (&str, &str) = ("isEntryEnabled", "()Z");
const ENTRY: (&str, &str) = ("entry", "(Lcom/ibm/websphere/ras/TraceComponent;Ljava/lang/String;)V");
const EXIT: (&str, &str) = ("exit", "(Lcom/ibm/websphere/ras/TraceComponent;Ljava/lang/String;)V");
const EXIT_WITH_THROWABLE: (&str, &str) = (
    "exit",
    "(Lcom/ibm/websphere/ras/TraceComponent;Ljava/lang/String;Ljava/lang/Object;)V",
);
const REGISTER: (&str, &str) = ("register", "(Ljava/lang/Class;)Lcom/ibm/websphere/ras/TraceComponent;");
const REGISTER_WITH_OPTIONS: (&str, &str) = (
    "register",
    "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/String;)Lcom/ibm/websphere/ras/TraceComponent;",
);

/// The trace handle type
pub fn trace_component_type() -> Type {
    Type::object(TRACE_COMPONENT_CLASS)
}

/// Check whether a field descriptor denotes the trace handle type
pub fn is_trace_component(descriptor: &str) -> bool {
    descriptor == TRACE_COMPONENT_DESCRIPTOR
}

/// `if (!TraceComponent.isAnyTracingEnabled() || !tc.isEntryEnabled()) goto skip`
pub fn entry_guard(trace_field: &FieldRef, skip: Label) -> Vec<Instruction> {
    vec![
        Instruction::invoke_static(TRACE_COMPONENT_CLASS, IS_ANY_TRACING_ENABLED.0, IS_ANY_TRACING_ENABLED.1),
        Instruction::branch(Condition::IfZero, skip),
        Instruction::GetStatic(trace_field.clone()),
        Instruction::branch(Condition::IfNull, skip),
        Instruction::GetStatic(trace_field.clone()),
        Instruction::invoke_virtual(TRACE_COMPONENT_CLASS, IS_ENTRY_ENABLED.0, IS_ENTRY_ENABLED.1),
        Instruction::branch(Condition::IfZero, skip),
    ]
}

/// Guarded `Tr.entry(tc, method)`
pub fn entry_call(trace_field: &FieldRef, method_name: &str, skip: Label) -> Vec<Instruction> {
    let mut code = entry_guard(trace_field, skip);
    code.extend([
        Instruction::GetStatic(trace_field.clone()),
        Instruction::Const(Constant::String(method_name.to_string())),
        Instruction::invoke_static(TR_CLASS, ENTRY.0, ENTRY.1),
        Instruction::Label(skip),
    ]);
    code
}

/// Guarded `Tr.exit(tc, method)`
pub fn exit_call(trace_field: &FieldRef, method_name: &str, skip: Label) -> Vec<Instruction> {
    let mut code = entry_guard(trace_field, skip);
    code.extend([
        Instruction::GetStatic(trace_field.clone()),
        Instruction::Const(Constant::String(method_name.to_string())),
        Instruction::invoke_static(TR_CLASS, EXIT.0, EXIT.1),
        Instruction::Label(skip),
    ]);
    code
}

/// Guarded `Tr.exit(tc, method, throwable)` followed by rethrowing the throwable.
/// Expects the throwable on top of the stack and uses `local` to hold it.
pub fn exception_exit_call(trace_field: &FieldRef, method_name: &str, local: u16, skip: Label) -> Vec<Instruction> {
    let mut code = vec![Instruction::Store {
        kind: ValueKind::Reference,
        index: local,
    }];
    code.extend(entry_guard(trace_field, skip));
    code.extend([
        Instruction::GetStatic(trace_field.clone()),
        Instruction::Const(Constant::String(method_name.to_string())),
        Instruction::Load {
            kind: ValueKind::Reference,
            index: local,
        },
        Instruction::invoke_static(TR_CLASS, EXIT_WITH_THROWABLE.0, EXIT_WITH_THROWABLE.1),
        Instruction::Label(skip),
        Instruction::Load {
            kind: ValueKind::Reference,
            index: local,
        },
        Instruction::Throw,
    ]);
    code
}

/// `tc = Tr.register(Owner.class[, group, bundle])`
pub fn register_call(owner: &str, trace_field: &FieldRef, options: Option<&TraceOptions>) -> Vec<Instruction> {
    let mut code = vec![Instruction::Const(Constant::Class(owner.to_string()))];
    match options {
        Some(options) => {
            let string_or_null = |value: Option<&str>| match value {
                Some(value) => Constant::String(value.to_string()),
                None => Constant::Null,
            };
            code.push(Instruction::Const(string_or_null(options.primary_group())));
            code.push(Instruction::Const(string_or_null(options.message_bundle.as_deref())));
            code.push(Instruction::invoke_static(TR_CLASS, REGISTER_WITH_OPTIONS.0, REGISTER_WITH_OPTIONS.1));
        }
        None => code.push(Instruction::invoke_static(TR_CLASS, REGISTER.0, REGISTER.1)),
    }
    code.push(Instruction::PutStatic(trace_field.clone()));
    code
}
