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

//! Type and method descriptors
//!
//! Descriptors use the class-file grammar: `I`, `J`, `Z` and friends for
//! primitives, `Lpkg/Name;` for object types, `[` for arrays and
//! `(params)ret` for methods.

use crate::error::{BytecodeError, BytecodeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A field or value type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    /// Object type by internal name (`java/lang/String`)
    Object(String),
    /// Array of the element type
    Array(Box<Type>),
}

impl Type {
    /// Create an object type from its internal name
    pub fn object(internal_name: impl Into<String>) -> Self {
        Self::Object(internal_name.into())
    }

    /// Create an array type of the given element type
    pub fn array(element: Type) -> Self {
        Self::Array(Box::new(element))
    }

    /// Parse a complete field descriptor
    pub fn parse(descriptor: &str) -> BytecodeResult<Self> {
        let (ty, consumed) = Self::parse_prefix(descriptor.as_bytes(), descriptor)?;
        if consumed != descriptor.len() {
            return Err(BytecodeError::invalid_descriptor(descriptor));
        }
        Ok(ty)
    }

    /// Parse one type from the start of `bytes`, returning it and the bytes consumed
    fn parse_prefix(bytes: &[u8], whole: &str) -> BytecodeResult<(Self, usize)> {
        let first = *bytes
            .first()
            .ok_or_else(|| BytecodeError::invalid_descriptor(whole))?;
        let ty = match first {
            b'V' => Self::Void,
            b'Z' => Self::Boolean,
            b'B' => Self::Byte,
            b'C' => Self::Char,
            b'S' => Self::Short,
            b'I' => Self::Int,
            b'J' => Self::Long,
            b'F' => Self::Float,
            b'D' => Self::Double,
            b'L' => {
                let end = bytes
                    .iter()
                    .position(|b| *b == b';')
                    .ok_or_else(|| BytecodeError::invalid_descriptor(whole))?;
                if end == 1 {
                    return Err(BytecodeError::invalid_descriptor(whole));
                }
                let name = std::str::from_utf8(&bytes[1..end])
                    .map_err(|_| BytecodeError::invalid_descriptor(whole))?;
                return Ok((Self::Object(name.to_string()), end + 1));
            }
            b'[' => {
                let (element, consumed) = Self::parse_prefix(&bytes[1..], whole)?;
                if element == Self::Void {
                    return Err(BytecodeError::invalid_descriptor(whole));
                }
                return Ok((Self::array(element), consumed + 1));
            }
            _ => return Err(BytecodeError::invalid_descriptor(whole)),
        };
        Ok((ty, 1))
    }

    /// Render the descriptor form of this type
    pub fn descriptor(&self) -> String {
        match self {
            Self::Void => "V".to_string(),
            Self::Boolean => "Z".to_string(),
            Self::Byte => "B".to_string(),
            Self::Char => "C".to_string(),
            Self::Short => "S".to_string(),
            Self::Int => "I".to_string(),
            Self::Long => "J".to_string(),
            Self::Float => "F".to_string(),
            Self::Double => "D".to_string(),
            Self::Object(name) => format!("L{};", name),
            Self::Array(element) => format!("[{}", element.descriptor()),
        }
    }

    /// Internal name for object types
    pub fn internal_name(&self) -> Option<&str> {
        match self {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    /// Number of local variable / operand stack slots a value of this type occupies
    pub fn slot_size(&self) -> u16 {
        match self {
            Self::Void => 0,
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }

    /// Computational kind used by loads, stores and returns
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            Self::Void => None,
            Self::Boolean | Self::Byte | Self::Char | Self::Short | Self::Int => Some(ValueKind::Int),
            Self::Long => Some(ValueKind::Long),
            Self::Float => Some(ValueKind::Float),
            Self::Double => Some(ValueKind::Double),
            Self::Object(_) | Self::Array(_) => Some(ValueKind::Reference),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}

/// Computational kind of an operand stack value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    /// Number of slots a value of this kind occupies
    pub fn slots(&self) -> u16 {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }
}

/// Parsed method descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<Type>,
    pub return_type: Type,
}

impl MethodDescriptor {
    /// Create a method descriptor from parameter and return types
    pub fn new(params: Vec<Type>, return_type: Type) -> Self {
        Self { params, return_type }
    }

    /// Parse a `(params)ret` descriptor
    pub fn parse(descriptor: &str) -> BytecodeResult<Self> {
        let bytes = descriptor.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(BytecodeError::invalid_descriptor(descriptor));
        }

        let mut params = Vec::new();
        let mut pos = 1;
        loop {
            match bytes.get(pos) {
                Some(b')') => {
                    pos += 1;
                    break;
                }
                Some(_) => {
                    let (param, consumed) = Type::parse_prefix(&bytes[pos..], descriptor)?;
                    if param == Type::Void {
                        return Err(BytecodeError::invalid_descriptor(descriptor));
                    }
                    params.push(param);
                    pos += consumed;
                }
                None => return Err(BytecodeError::invalid_descriptor(descriptor)),
            }
        }

        let (return_type, consumed) = Type::parse_prefix(&bytes[pos..], descriptor)?;
        if pos + consumed != bytes.len() {
            return Err(BytecodeError::invalid_descriptor(descriptor));
        }

        Ok(Self { params, return_type })
    }

    /// Render the descriptor string
    pub fn descriptor(&self) -> String {
        let params: String = self.params.iter().map(Type::descriptor).collect();
        format!("({}){}", params, self.return_type.descriptor())
    }

    /// Slots taken by the parameters, excluding any receiver
    pub fn param_slots(&self) -> u16 {
        self.params
            .iter()
            .fold(0u16, |slots, param| slots.saturating_add(param.slot_size()))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}
