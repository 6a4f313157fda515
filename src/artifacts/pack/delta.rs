//! Delta reconstruction
//!
//! A delta starts with the base size and the result size (little-endian
//! base-128), followed by instructions:
//!
//! - `1xxxxxxx` COPY: bits 0-3 gate up to four offset bytes, bits 4-6 up to
//!   three size bytes (little-endian). A size of 0 means `0x10000`.
//! - `0xxxxxxx` INSERT: the next `x` (1-127) delta bytes are copied verbatim.
//! - `00000000` is reserved.
//!
//! Any instruction that would write past the declared result size, read past
//! the base or the delta, or leave the result short is reported as corruption.

use crate::artifacts::core::byte_reader::{ByteReader, OutOfBounds};
use crate::errors::{Error, Result};
use bitflags::bitflags;

const DEFAULT_COPY_SIZE: usize = 0x10000;
/// Upper bound for reserving the result buffer up front
const PREALLOCATION_LIMIT: usize = 1 << 24;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Instruction: u8 {
        const OFFSET_0 = 0x01;
        const OFFSET_1 = 0x02;
        const OFFSET_2 = 0x04;
        const OFFSET_3 = 0x08;
        const SIZE_0 = 0x10;
        const SIZE_1 = 0x20;
        const SIZE_2 = 0x40;
        const COPY = 0x80;
    }
}

const OFFSET_BYTES: [Instruction; 4] = [
    Instruction::OFFSET_0,
    Instruction::OFFSET_1,
    Instruction::OFFSET_2,
    Instruction::OFFSET_3,
];
const SIZE_BYTES: [Instruction; 3] = [
    Instruction::SIZE_0,
    Instruction::SIZE_1,
    Instruction::SIZE_2,
];

fn truncated(err: OutOfBounds) -> Error {
    Error::CorruptPackEntry(format!("truncated delta: {err}"))
}

/// Rebuild an object from `base` and the instruction stream in `delta`
pub fn patch_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut reader = ByteReader::new(delta);

    let base_size = reader.read_size_varint().map_err(truncated)?;
    if base_size != base.len() as u64 {
        return Err(Error::DeltaSizeMismatch {
            expected: base_size,
            actual: base.len() as u64,
        });
    }

    let result_size = reader.read_size_varint().map_err(truncated)?;
    let result_size = usize::try_from(result_size).map_err(|_| {
        Error::CorruptPackEntry(format!("delta result size {result_size} is too large"))
    })?;

    let mut output = Vec::with_capacity(result_size.min(PREALLOCATION_LIMIT));

    while !reader.is_empty() {
        let opcode = reader.read_u8().map_err(truncated)?;
        let instruction = Instruction::from_bits_retain(opcode);

        let chunk = if instruction.contains(Instruction::COPY) {
            let (offset, size) = read_copy_operands(&mut reader, instruction)?;
            offset
                .checked_add(size)
                .and_then(|end| base.get(offset..end))
                .ok_or_else(|| {
                    Error::CorruptPackEntry(format!(
                        "delta copies {size} bytes at {offset} from a {} byte base",
                        base.len()
                    ))
                })?
        } else if opcode != 0 {
            reader.read_bytes(usize::from(opcode)).map_err(truncated)?
        } else {
            return Err(Error::CorruptPackEntry(
                "delta uses reserved opcode 0".to_string(),
            ));
        };

        if output.len() + chunk.len() > result_size {
            return Err(Error::CorruptPackEntry(format!(
                "delta writes past the declared result size {result_size}"
            )));
        }
        output.extend_from_slice(chunk);
    }

    if output.len() != result_size {
        return Err(Error::CorruptPackEntry(format!(
            "delta produced {} of {result_size} bytes",
            output.len()
        )));
    }

    tracing::trace!(base = base.len(), result = result_size, "applied delta");

    Ok(output)
}

fn read_copy_operands(reader: &mut ByteReader, instruction: Instruction) -> Result<(usize, usize)> {
    let mut offset = 0u32;
    for (index, flag) in OFFSET_BYTES.iter().enumerate() {
        if instruction.contains(*flag) {
            offset |= u32::from(reader.read_u8().map_err(truncated)?) << (8 * index);
        }
    }

    let mut size = 0u32;
    for (index, flag) in SIZE_BYTES.iter().enumerate() {
        if instruction.contains(*flag) {
            size |= u32::from(reader.read_u8().map_err(truncated)?) << (8 * index);
        }
    }

    let size = match size {
        0 => DEFAULT_COPY_SIZE,
        size => size as usize,
    };

    Ok((offset as usize, size))
}
