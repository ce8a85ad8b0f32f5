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

//! Terminal class visitor that rebuilds a compiled unit

use crate::annotation::Annotation;
use crate::error::{BytecodeError, BytecodeResult};
use crate::frames::compute_maxs;
use crate::unit::{ClassHeader, CompiledUnit, FieldNode, MethodNode};
use crate::visitor::ClassVisitor;
use std::collections::HashSet;
use tracing::warn;

/// Options controlling how the writer re-emits methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Recompute max stack and max locals for every method body
    pub compute_maxs: bool,
    /// Fail the unit when recomputation fails instead of keeping the declared maxima
    pub throw_on_frame_failure: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            compute_maxs: true,
            throw_on_frame_failure: false,
        }
    }
}

/// Collects visitor events into a new [`CompiledUnit`]
#[derive(Debug, Default)]
pub struct UnitWriter {
    options: WriterOptions,
    header: Option<ClassHeader>,
    annotations: Vec<Annotation>,
    fields: Vec<FieldNode>,
    methods: Vec<MethodNode>,
    field_names: HashSet<String>,
    method_signatures: HashSet<String>,
    frame_failures: usize,
}

impl UnitWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Number of methods whose maxima could not be recomputed and were kept as declared
    pub fn frame_failures(&self) -> usize {
        self.frame_failures
    }

    /// Finish writing and return the rebuilt unit
    pub fn into_unit(self) -> BytecodeResult<CompiledUnit> {
        let header = self.header.ok_or(BytecodeError::MissingHeader)?;
        Ok(CompiledUnit {
            header,
            annotations: self.annotations,
            fields: self.fields,
            methods: self.methods,
        })
    }

    fn owner(&self) -> &str {
        self.header.as_ref().map_or("<unknown>", |header| header.name.as_str())
    }
}

impl ClassVisitor for UnitWriter {
    fn on_header(&mut self, header: ClassHeader) -> BytecodeResult<()> {
        self.header = Some(header);
        Ok(())
    }

    fn on_annotation(&mut self, annotation: Annotation) -> BytecodeResult<()> {
        if self.annotations.iter().any(|existing| existing.descriptor == annotation.descriptor) {
            return Err(BytecodeError::duplicate_member(self.owner(), annotation.descriptor));
        }
        self.annotations.push(annotation);
        Ok(())
    }

    fn on_field(&mut self, field: FieldNode) -> BytecodeResult<()> {
        if !self.field_names.insert(field.name.clone()) {
            return Err(BytecodeError::duplicate_member(self.owner(), field.name));
        }
        self.fields.push(field);
        Ok(())
    }

    fn on_method(&mut self, mut method: MethodNode) -> BytecodeResult<()> {
        if !self.method_signatures.insert(method.signature()) {
            return Err(BytecodeError::duplicate_member(self.owner(), method.signature()));
        }

        if self.options.compute_maxs {
            if let Some(code) = &method.code {
                match compute_maxs(&method, code) {
                    Ok(maxs) => {
                        if let Some(code) = method.code.as_mut() {
                            code.max_stack = maxs.max_stack;
                            code.max_locals = maxs.max_locals;
                        }
                    }
                    Err(err) if self.options.throw_on_frame_failure => return Err(err),
                    Err(err) => {
                        warn!(unit = %self.owner(), method = %method.signature(), error = %err, "Keeping declared maxima");
                        self.frame_failures += 1;
                    }
                }
            }
        }

        self.methods.push(method);
        Ok(())
    }

    fn on_end(&mut self) -> BytecodeResult<()> {
        if self.header.is_none() {
            return Err(BytecodeError::MissingHeader);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessFlags;
    use crate::code::{Code, Instruction};
    use crate::types::ValueKind;

    fn sample_unit() -> CompiledUnit {
        CompiledUnit::new("com/example/Sample")
            .with_field(FieldNode::new(AccessFlags::PRIVATE, "count", "I"))
            .with_method(
                MethodNode::new(AccessFlags::PUBLIC, "count", "()I").with_code(Code::new(vec![
                    Instruction::Load { kind: ValueKind::Reference, index: 0 },
                    Instruction::GetField(crate::code::FieldRef::new("com/example/Sample", "count", "I")),
                    Instruction::Return(Some(ValueKind::Int)),
                ])),
            )
    }

    #[test]
    fn test_rebuilds_unit_with_computed_maxs() {
        let unit = sample_unit();
        let mut writer = UnitWriter::new(WriterOptions::default());
        unit.accept(&mut writer).unwrap();
        let rebuilt = writer.into_unit().unwrap();

        let code = rebuilt.methods[0].code.as_ref().unwrap();
        assert_eq!((code.max_stack, code.max_locals), (1, 1));
        assert_eq!(rebuilt.fields, unit.fields);
    }

    #[test]
    fn test_rejects_duplicate_fields() {
        let mut writer = UnitWriter::new(WriterOptions::default());
        writer.on_header(ClassHeader::new("com/example/Dup")).unwrap();
        writer.on_field(FieldNode::new(AccessFlags::STATIC, "tc", "I")).unwrap();
        let err = writer.on_field(FieldNode::new(AccessFlags::STATIC, "tc", "J")).unwrap_err();
        assert!(matches!(err, BytecodeError::DuplicateMember { .. }));
    }

    #[test]
    fn test_frame_failure_policy() {
        let broken = MethodNode::new(AccessFlags::STATIC, "broken", "()V")
            .with_code(Code::new(vec![Instruction::Pop, Instruction::Return(None)]).with_maxs(3, 2));
        let unit = CompiledUnit::new("com/example/Broken").with_method(broken);

        let mut tolerant = UnitWriter::new(WriterOptions::default());
        unit.accept(&mut tolerant).unwrap();
        assert_eq!(tolerant.frame_failures(), 1);
        let kept = tolerant.into_unit().unwrap();
        assert_eq!(kept.methods[0].code.as_ref().unwrap().max_stack, 3);

        let mut strict = UnitWriter::new(WriterOptions {
            compute_maxs: true,
            throw_on_frame_failure: true,
        });
        let err = unit.accept(&mut strict).unwrap_err();
        assert!(matches!(err, BytecodeError::FrameComputation { .. }));
    }

    #[test]
    fn test_missing_header() {
        let writer = UnitWriter::new(WriterOptions::default());
        assert_eq!(writer.into_unit().unwrap_err(), BytecodeError::MissingHeader);
    }
}
