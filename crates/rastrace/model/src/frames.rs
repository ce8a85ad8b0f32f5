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

//! Frame computation
//!
//! Recomputes the operand stack and local variable maxima of a rewritten
//! method body by walking every reachable path. Every instruction must be
//! reached with the same stack height on all paths; handler entries start
//! with the caught exception as the only stack value.

use crate::code::{Code, Instruction, Label};
use crate::error::{BytecodeError, BytecodeResult};
use crate::types::MethodDescriptor;
use crate::unit::MethodNode;
use std::collections::HashMap;

/// Computed maxima for a method body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maxs {
    pub max_stack: u16,
    pub max_locals: u16,
}

struct HandlerRange {
    start: usize,
    end: usize,
    handler: usize,
}

/// Compute the maxima of `code`, the body of `method`
pub fn compute_maxs(method: &MethodNode, code: &Code) -> BytecodeResult<Maxs> {
    let signature = method.signature();
    let fail = |reason: String| BytecodeError::frame_computation(signature.clone(), reason);

    let labels: HashMap<Label, usize> = code
        .instructions
        .iter()
        .enumerate()
        .filter_map(|(index, insn)| match insn {
            Instruction::Label(label) => Some((*label, index)),
            _ => None,
        })
        .collect();
    let resolve = |label: Label| {
        labels
            .get(&label)
            .copied()
            .ok_or_else(|| fail(format!("undefined label {}", label.0)))
    };

    let mut ranges = Vec::with_capacity(code.handlers.len());
    for handler in &code.handlers {
        let range = HandlerRange {
            start: resolve(handler.start)?,
            end: resolve(handler.end)?,
            handler: resolve(handler.handler)?,
        };
        if range.start > range.end {
            return Err(fail(format!("handler range {}..{} is inverted", handler.start.0, handler.end.0)));
        }
        ranges.push(range);
    }

    let len = code.instructions.len();
    if len == 0 {
        return Err(fail("method body is empty".to_string()));
    }

    let mut heights: Vec<Option<u16>> = vec![None; len];
    let mut worklist = vec![(0usize, 0u16)];
    let mut max_stack = 0u16;

    while let Some((index, height)) = worklist.pop() {
        if index >= len {
            return Err(fail("execution falls off the end of the code".to_string()));
        }
        match heights[index] {
            Some(known) if known == height => continue,
            Some(known) => {
                return Err(fail(format!(
                    "inconsistent stack height at {}: {} vs {}",
                    index, known, height
                )));
            }
            None => heights[index] = Some(height),
        }

        for range in ranges.iter().filter(|r| r.start <= index && index < r.end) {
            worklist.push((range.handler, 1));
            max_stack = max_stack.max(1);
        }

        let instruction = &code.instructions[index];
        let (pops, pushes) = instruction.stack_effect()?;
        if pops > height {
            return Err(fail(format!("stack underflow at {}", index)));
        }
        let next = (height - pops)
            .checked_add(pushes)
            .ok_or_else(|| fail(format!("operand stack exceeds {} slots at {}", u16::MAX, index)))?;
        max_stack = max_stack.max(next);

        match instruction {
            Instruction::Jump { condition, target } => {
                worklist.push((resolve(*target)?, next));
                if condition.is_some() {
                    worklist.push((index + 1, next));
                }
            }
            Instruction::Return(_) | Instruction::Throw => {}
            _ => worklist.push((index + 1, next)),
        }
    }

    let receiver = if method.access.is_static() { 0 } else { 1 };
    let too_many_locals = || fail(format!("locals exceed {} slots", u16::MAX));
    let mut max_locals = MethodDescriptor::parse(&method.descriptor)?
        .param_slots()
        .checked_add(receiver)
        .ok_or_else(too_many_locals)?;
    for instruction in &code.instructions {
        if let Instruction::Load { kind, index } | Instruction::Store { kind, index } = instruction {
            let end = index.checked_add(kind.slots()).ok_or_else(too_many_locals)?;
            max_locals = max_locals.max(end);
        }
    }

    Ok(Maxs { max_stack, max_locals })
}
