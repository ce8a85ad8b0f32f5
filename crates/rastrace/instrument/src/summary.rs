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

//! Roll-up of everything the pass changed in one unit

use crate::method_adapter::MethodInstrumentationRecord;
use serde::Serialize;

/// Change flags for one unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModificationSummary {
    pub static_initializer_required: bool,
    pub field_definition_required: bool,
    pub field_initialization_required: bool,
    /// Methods that received trace calls
    pub modified_methods: usize,
    /// Methods the class adapter made a decision for
    pub recorded_methods: usize,
}

impl ModificationSummary {
    /// Build a summary from the class-level predicates and the method records
    pub fn new(
        static_initializer_required: bool,
        field_definition_required: bool,
        field_initialization_required: bool,
        records: &[MethodInstrumentationRecord],
    ) -> Self {
        Self {
            static_initializer_required,
            field_definition_required,
            field_initialization_required,
            modified_methods: records.iter().filter(|record| record.is_modified_method()).count(),
            recorded_methods: records.len(),
        }
    }

    /// True if the unit has to be re-emitted
    pub fn is_modified(&self) -> bool {
        self.static_initializer_required
            || self.field_definition_required
            || self.field_initialization_required
            || self.modified_methods > 0
    }
}
