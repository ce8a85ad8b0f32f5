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

//! Metadata derived from annotations already present on a unit

use crate::trace_api::{LOGGER_ANNOTATION, TRACE_OPTIONS_ANNOTATION, TRIVIAL_ANNOTATION};
use rastrace_model::{ClassInfo, CompiledUnit, FieldInfo, TraceOptions};

const TRACE_GROUP: &str = "traceGroup";
const TRACE_GROUPS: &str = "traceGroups";
const MESSAGE_BUNDLE: &str = "messageBundle";

/// Build a [`ClassInfo`] from the unit's `@Logger` field, `@TraceOptions` and `@Trivial`
pub fn scan_class_info(unit: &CompiledUnit) -> ClassInfo {
    let declared_logger_field = unit
        .fields
        .iter()
        .find(|field| field.has_annotation(LOGGER_ANNOTATION))
        .map(|field| FieldInfo::new(field.name.clone(), field.descriptor.clone()).with_access(field.access));

    let trace_options = unit.annotation(TRACE_OPTIONS_ANNOTATION).map(|annotation| {
        let mut trace_groups: Vec<String> = annotation.strings(TRACE_GROUPS).into_iter().map(String::from).collect();
        if let Some(group) = annotation.string(TRACE_GROUP).filter(|group| !group.is_empty()) {
            if !trace_groups.iter().any(|existing| existing == group) {
                trace_groups.insert(0, group.to_string());
            }
        }
        TraceOptions {
            trace_groups,
            message_bundle: annotation
                .string(MESSAGE_BUNDLE)
                .filter(|bundle| !bundle.is_empty())
                .map(String::from),
        }
    });

    ClassInfo {
        internal_name: unit.name().to_string(),
        declared_logger_field,
        trace_options,
        trivial: unit.annotation(TRIVIAL_ANNOTATION).is_some(),
    }
}
