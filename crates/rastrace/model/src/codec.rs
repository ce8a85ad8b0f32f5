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

//! Binary encoding of compiled units

use crate::error::{BytecodeError, BytecodeResult};
use crate::unit::CompiledUnit;

/// Encode a unit into its binary form
pub fn encode_unit(unit: &CompiledUnit) -> BytecodeResult<Vec<u8>> {
    bincode::serde::encode_to_vec(unit, bincode::config::standard())
        .map_err(|e| BytecodeError::EncodingError(e.to_string()))
}

/// Decode a unit from its binary form; trailing bytes are rejected
pub fn decode_unit(bytes: &[u8]) -> BytecodeResult<CompiledUnit> {
    let (unit, consumed): (CompiledUnit, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| BytecodeError::DecodingError(e.to_string()))?;
    if consumed != bytes.len() {
        return Err(BytecodeError::DecodingError(format!(
            "{} trailing bytes after unit {}",
            bytes.len() - consumed,
            unit.name()
        )));
    }
    Ok(unit)
}
