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

//! Annotations attached to units, fields and methods

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element value of an annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationValue {
    String(String),
    Bool(bool),
    Int(i64),
    /// Class literal, stored as a type descriptor
    Type(String),
    Array(Vec<AnnotationValue>),
}

/// A runtime-visible annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation type descriptor
    pub descriptor: String,
    /// Element values by name
    pub values: BTreeMap<String, AnnotationValue>,
}

impl Annotation {
    /// Create an annotation without element values
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            values: BTreeMap::new(),
        }
    }

    /// Add an element value
    pub fn with_value(mut self, name: impl Into<String>, value: AnnotationValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Add a string element value
    pub fn with_string(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_value(name, AnnotationValue::String(value.into()))
    }

    /// Check the annotation type
    pub fn is(&self, descriptor: &str) -> bool {
        self.descriptor == descriptor
    }

    /// Read a string element
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(AnnotationValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Read a boolean element
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(AnnotationValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Read a string array element; a single string is treated as a one-element array
    pub fn strings(&self, name: &str) -> Vec<&str> {
        match self.values.get(name) {
            Some(AnnotationValue::String(value)) => vec![value.as_str()],
            Some(AnnotationValue::Array(values)) => values
                .iter()
                .filter_map(|value| match value {
                    AnnotationValue::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Find the first annotation of the given type
pub fn find_annotation<'a>(annotations: &'a [Annotation], descriptor: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|annotation| annotation.is(descriptor))
}
