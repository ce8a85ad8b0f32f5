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

//! Structural model of compiled units
//!
//! Provides the in-memory unit representation, the visitor protocol used to
//! walk and rewrite units, a writer that rebuilds units from visitor events
//! (recomputing method maxima), the binary codec, and the metadata snapshots
//! consumed by instrumentation passes.

pub mod access;
pub mod annotation;
pub mod code;
pub mod codec;
pub mod error;
pub mod frames;
pub mod info;
pub mod types;
pub mod unit;
pub mod visitor;
pub mod writer;

pub use access::AccessFlags;
pub use annotation::{Annotation, AnnotationValue};
pub use code::{Code, Condition, Constant, ExceptionHandler, FieldRef, Instruction, InvokeKind, Label, MethodRef};
pub use error::{BytecodeError, BytecodeResult};
pub use info::{ClassInfo, ClassTraceInfo, FieldInfo, TraceOptions};
pub use types::{MethodDescriptor, Type, ValueKind};
pub use unit::{ClassHeader, CompiledUnit, FieldNode, MethodNode};
pub use visitor::{ClassVisitor, CodeBuilder, MethodVisitor};
pub use writer::{UnitWriter, WriterOptions};
