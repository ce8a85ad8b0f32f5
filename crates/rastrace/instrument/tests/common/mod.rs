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

//! Unit builders shared by the integration tests

#![allow(dead_code)]

use rastrace_instrument::trace_api::{
    TRACE_COMPONENT_DESCRIPTOR, TRACE_OBJECT_FIELD_ANNOTATION, TRACE_OBJECT_FIELD_DESC, TRACE_OBJECT_FIELD_NAME,
    TR_CLASS,
};
use rastrace_model::{
    AccessFlags, Annotation, Code, CompiledUnit, Condition, Constant, FieldNode, FieldRef, Instruction, Label,
    MethodNode, ValueKind,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// `(I)V` method returning from `returns` places, branching on its int argument
pub fn branching_method(name: &str, is_static: bool, returns: u32) -> MethodNode {
    let access = if is_static {
        AccessFlags::PUBLIC | AccessFlags::STATIC
    } else {
        AccessFlags::PUBLIC
    };
    let arg = if is_static { 0 } else { 1 };

    let mut instructions = Vec::new();
    for label in 0..returns.saturating_sub(1) {
        instructions.push(Instruction::Load { kind: ValueKind::Int, index: arg });
        instructions.push(Instruction::branch(Condition::IfZero, Label(label)));
        instructions.push(Instruction::Return(None));
        instructions.push(Instruction::Label(Label(label)));
    }
    instructions.push(Instruction::Return(None));

    let max_stack = if returns > 1 { 1 } else { 0 };
    MethodNode::new(access, name, "(I)V").with_code(Code::new(instructions).with_maxs(max_stack, arg + 1))
}

pub fn abstract_method(name: &str) -> MethodNode {
    MethodNode::new(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, name, "()V")
}

pub fn native_method(name: &str) -> MethodNode {
    MethodNode::new(AccessFlags::PUBLIC | AccessFlags::NATIVE, name, "()J")
}

pub fn trace_object_field(name: &str) -> Annotation {
    Annotation::new(TRACE_OBJECT_FIELD_ANNOTATION)
        .with_string(TRACE_OBJECT_FIELD_NAME, name)
        .with_string(TRACE_OBJECT_FIELD_DESC, TRACE_COMPONENT_DESCRIPTOR)
}

pub fn trace_component_field(name: &str) -> FieldNode {
    FieldNode::new(
        AccessFlags::PRIVATE | AccessFlags::STATIC | AccessFlags::FINAL,
        name,
        TRACE_COMPONENT_DESCRIPTOR,
    )
}

/// Static initializer registering `field` the way a preprocessed unit does
pub fn registering_initializer(owner: &str, field: &str) -> MethodNode {
    MethodNode::new(AccessFlags::STATIC, "<clinit>", "()V").with_code(
        Code::new(vec![
            Instruction::Const(Constant::Class(owner.to_string())),
            Instruction::invoke_static(
                TR_CLASS,
                "register",
                "(Ljava/lang/Class;)Lcom/ibm/websphere/ras/TraceComponent;",
            ),
            Instruction::PutStatic(FieldRef::new(owner, field, TRACE_COMPONENT_DESCRIPTOR)),
            Instruction::Return(None),
        ])
        .with_maxs(1, 0),
    )
}

/// Static calls into the trace facade with the given method name
pub fn tr_calls<'a>(code: &'a Code, name: &'a str) -> impl Iterator<Item = &'a Instruction> + 'a {
    code.instructions.iter().filter(move |insn| {
        matches!(insn, Instruction::Invoke { method, .. } if method.owner == TR_CLASS && method.name == name)
    })
}
