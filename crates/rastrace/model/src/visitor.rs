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

//! Visitor protocol over compiled units
//!
//! A unit is walked as a stream of events. Class visitors can be chained:
//! an adapter receives events, transforms or adds to them, and forwards the
//! result to the next visitor, typically ending in a
//! [`UnitWriter`](crate::writer::UnitWriter).

use crate::annotation::Annotation;
use crate::code::{Code, ExceptionHandler, Instruction};
use crate::error::BytecodeResult;
use crate::unit::{ClassHeader, FieldNode, MethodNode};

/// Receives unit-level events in declaration order
pub trait ClassVisitor {
    /// Unit header; always the first event
    fn on_header(&mut self, header: ClassHeader) -> BytecodeResult<()>;
    /// One class-level annotation; all arrive before any field
    fn on_annotation(&mut self, annotation: Annotation) -> BytecodeResult<()>;
    /// One declared field; all arrive before any method
    fn on_field(&mut self, field: FieldNode) -> BytecodeResult<()>;
    /// One declared method, with its body
    fn on_method(&mut self, method: MethodNode) -> BytecodeResult<()>;
    /// End of the unit; visitors may emit new members before forwarding this
    fn on_end(&mut self) -> BytecodeResult<()>;
}

impl<V: ClassVisitor + ?Sized> ClassVisitor for &mut V {
    fn on_header(&mut self, header: ClassHeader) -> BytecodeResult<()> {
        (**self).on_header(header)
    }

    fn on_annotation(&mut self, annotation: Annotation) -> BytecodeResult<()> {
        (**self).on_annotation(annotation)
    }

    fn on_field(&mut self, field: FieldNode) -> BytecodeResult<()> {
        (**self).on_field(field)
    }

    fn on_method(&mut self, method: MethodNode) -> BytecodeResult<()> {
        (**self).on_method(method)
    }

    fn on_end(&mut self) -> BytecodeResult<()> {
        (**self).on_end()
    }
}

/// Receives the elements of one method body
pub trait MethodVisitor {
    /// Start of the body
    fn visit_code(&mut self) {}
    /// One exception table entry; all arrive before any instruction
    fn visit_try_catch(&mut self, handler: ExceptionHandler);
    /// One instruction, in code order
    fn visit_instruction(&mut self, instruction: Instruction);
    /// Declared maxima
    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16);
    /// End of the body
    fn visit_end(&mut self) {}
}

/// Method visitor that collects what it receives into a [`Code`]
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Code,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish building and return the collected body
    pub fn finish(self) -> Code {
        self.code
    }
}

impl MethodVisitor for CodeBuilder {
    fn visit_try_catch(&mut self, handler: ExceptionHandler) {
        self.code.handlers.push(handler);
    }

    fn visit_instruction(&mut self, instruction: Instruction) {
        self.code.instructions.push(instruction);
    }

    fn visit_maxs(&mut self, max_stack: u16, max_locals: u16) {
        self.code.max_stack = max_stack;
        self.code.max_locals = max_locals;
    }
}
