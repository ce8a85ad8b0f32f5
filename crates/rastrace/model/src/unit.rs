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

//! Compiled units and their members

use crate::access::AccessFlags;
use crate::annotation::{Annotation, find_annotation};
use crate::code::Code;
use crate::error::BytecodeResult;
use crate::visitor::ClassVisitor;
use serde::{Deserialize, Serialize};

/// Name of the static initializer method
pub const STATIC_INITIALIZER: &str = "<clinit>";

/// Name of instance constructors
pub const CONSTRUCTOR: &str = "<init>";

/// Unit-level header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassHeader {
    /// Internal name (`com/example/Foo`)
    pub name: String,
    pub access: AccessFlags,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
}

impl ClassHeader {
    /// Create a public class header extending `java/lang/Object`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            access: AccessFlags::PUBLIC,
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            source_file: None,
        }
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNode {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    pub annotations: Vec<Annotation>,
}

impl FieldNode {
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn has_annotation(&self, descriptor: &str) -> bool {
        find_annotation(&self.annotations, descriptor).is_some()
    }
}

/// A declared method, with its body when it has one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodNode {
    pub access: AccessFlags,
    pub name: String,
    pub descriptor: String,
    /// Declared exception types (internal names)
    pub exceptions: Vec<String>,
    pub annotations: Vec<Annotation>,
    /// `None` for abstract and native methods
    pub code: Option<Code>,
}

impl MethodNode {
    pub fn new(access: AccessFlags, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            exceptions: Vec::new(),
            annotations: Vec::new(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: Code) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_exceptions(mut self, exceptions: Vec<String>) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Name plus descriptor, unique within a unit
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == STATIC_INITIALIZER
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR
    }

    pub fn has_body(&self) -> bool {
        self.code.is_some()
    }

    pub fn has_annotation(&self, descriptor: &str) -> bool {
        find_annotation(&self.annotations, descriptor).is_some()
    }
}

/// A compiled unit: one class and everything it declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledUnit {
    pub header: ClassHeader,
    /// Class-level annotations
    pub annotations: Vec<Annotation>,
    pub fields: Vec<FieldNode>,
    pub methods: Vec<MethodNode>,
}

impl CompiledUnit {
    /// Create an empty unit with the given internal name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            header: ClassHeader::new(name),
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_field(mut self, field: FieldNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodNode) -> Self {
        self.methods.push(method);
        self
    }

    /// Internal name of the unit
    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodNode> {
        self.methods
            .iter()
            .find(|method| method.name == name && method.descriptor == descriptor)
    }

    pub fn annotation(&self, descriptor: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, descriptor)
    }

    /// Walk the unit in declaration order: header, annotations, fields, methods, end
    pub fn accept<V: ClassVisitor + ?Sized>(&self, visitor: &mut V) -> BytecodeResult<()> {
        visitor.on_header(self.header.clone())?;
        for annotation in &self.annotations {
            visitor.on_annotation(annotation.clone())?;
        }
        for field in &self.fields {
            visitor.on_field(field.clone())?;
        }
        for method in &self.methods {
            visitor.on_method(method.clone())?;
        }
        visitor.on_end()
    }
}
