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

//! Method bodies: instructions, labels and exception handlers

use crate::error::BytecodeResult;
use crate::types::{MethodDescriptor, Type, ValueKind};
use crate::visitor::MethodVisitor;
use serde::{Deserialize, Serialize};

/// Position marker inside a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub u32);

/// Reference to a field of some class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl FieldRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// Reference to a method of some class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// Constant pushed by a constant-load instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Int(i32),
    Long(i64),
    String(String),
    /// Class literal by internal name
    Class(String),
}

/// Invocation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
    Interface,
}

/// Branch condition, testing the value on top of the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// int == 0
    IfZero,
    /// int != 0
    IfNonZero,
    IfNull,
    IfNonNull,
}

/// A single instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    Nop,
    /// Marks a position; occupies no code
    Label(Label),
    Const(Constant),
    Load { kind: ValueKind, index: u16 },
    Store { kind: ValueKind, index: u16 },
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    Invoke { kind: InvokeKind, method: MethodRef },
    New(String),
    Dup,
    Pop,
    Add(ValueKind),
    /// Conditional branch, or unconditional when `condition` is `None`
    Jump { condition: Option<Condition>, target: Label },
    /// Return from the method, `None` for a void return
    Return(Option<ValueKind>),
    Throw,
}

impl Instruction {
    /// Create a static invocation
    pub fn invoke_static(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::Invoke {
            kind: InvokeKind::Static,
            method: MethodRef::new(owner, name, descriptor),
        }
    }

    /// Create a virtual invocation
    pub fn invoke_virtual(owner: &str, name: &str, descriptor: &str) -> Self {
        Self::Invoke {
            kind: InvokeKind::Virtual,
            method: MethodRef::new(owner, name, descriptor),
        }
    }

    /// Create a conditional branch
    pub fn branch(condition: Condition, target: Label) -> Self {
        Self::Jump {
            condition: Some(condition),
            target,
        }
    }

    /// Create an unconditional branch
    pub fn goto(target: Label) -> Self {
        Self::Jump { condition: None, target }
    }

    /// Check if this instruction returns normally from the method
    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return(_))
    }

    /// Check if control never falls through to the next instruction
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Return(_) | Self::Throw | Self::Jump { condition: None, .. }
        )
    }

    /// Operand stack slots popped and pushed by this instruction
    pub fn stack_effect(&self) -> BytecodeResult<(u16, u16)> {
        let effect = match self {
            Self::Nop | Self::Label(_) => (0, 0),
            Self::Const(Constant::Long(_)) => (0, 2),
            Self::Const(_) => (0, 1),
            Self::Load { kind, .. } => (0, kind.slots()),
            Self::Store { kind, .. } => (kind.slots(), 0),
            Self::GetStatic(field) => (0, Type::parse(&field.descriptor)?.slot_size()),
            Self::PutStatic(field) => (Type::parse(&field.descriptor)?.slot_size(), 0),
            Self::GetField(field) => (1, Type::parse(&field.descriptor)?.slot_size()),
            Self::PutField(field) => (1 + Type::parse(&field.descriptor)?.slot_size(), 0),
            Self::Invoke { kind, method } => {
                let descriptor = MethodDescriptor::parse(&method.descriptor)?;
                let receiver = if *kind == InvokeKind::Static { 0 } else { 1 };
                (descriptor.param_slots().saturating_add(receiver), descriptor.return_type.slot_size())
            }
            Self::New(_) => (0, 1),
            Self::Dup => (1, 2),
            Self::Pop => (1, 0),
            Self::Add(kind) => (kind.slots() * 2, kind.slots()),
            Self::Jump { condition: Some(_), .. } => (1, 0),
            Self::Jump { condition: None, .. } => (0, 0),
            Self::Return(Some(kind)) => (kind.slots(), 0),
            Self::Return(None) => (0, 0),
            Self::Throw => (1, 0),
        };
        Ok(effect)
    }
}

/// Exception table entry; `start` is inclusive, `end` exclusive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub start: Label,
    pub end: Label,
    pub handler: Label,
    /// Internal name of the caught type, `None` catches everything
    pub catch_type: Option<String>,
}

/// A method body
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Code {
    pub instructions: Vec<Instruction>,
    /// Exception table, in lookup order
    pub handlers: Vec<ExceptionHandler>,
    pub max_stack: u16,
    pub max_locals: u16,
}

impl Code {
    /// Create a body from instructions with no handlers
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Default::default()
        }
    }

    /// Add an exception handler
    pub fn with_handler(mut self, handler: ExceptionHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set the declared maxima
    pub fn with_maxs(mut self, max_stack: u16, max_locals: u16) -> Self {
        self.max_stack = max_stack;
        self.max_locals = max_locals;
        self
    }

    /// First label id not used by any instruction or handler
    pub fn next_label(&self) -> Label {
        let from_instructions = self.instructions.iter().filter_map(|insn| match insn {
            Instruction::Label(label) | Instruction::Jump { target: label, .. } => Some(label.0),
            _ => None,
        });
        let from_handlers = self
            .handlers
            .iter()
            .flat_map(|h| [h.start.0, h.end.0, h.handler.0]);
        Label(from_instructions.chain(from_handlers).max().map_or(0, |max| max + 1))
    }

    /// Number of normal return instructions
    pub fn return_count(&self) -> usize {
        self.instructions.iter().filter(|insn| insn.is_return()).count()
    }

    /// Walk this body, reporting every element to the visitor
    pub fn accept<V: MethodVisitor + ?Sized>(&self, visitor: &mut V) {
        visitor.visit_code();
        for handler in &self.handlers {
            visitor.visit_try_catch(handler.clone());
        }
        for instruction in &self.instructions {
            visitor.visit_instruction(instruction.clone());
        }
        visitor.visit_maxs(self.max_stack, self.max_locals);
        visitor.visit_end();
    }
}
