use std::io::{Read, Write};

use located_error::prelude::*;
use log::{debug, info};

use crate::error::IndexError;

/// Single byte written first so a reader can tell whether the file was
/// produced on hardware with a matching byte order. Byte-reversed hosts are
/// not supported: the body is a raw little-endian u64 stream.
pub const ENDIAN_MARKER: u8 = 0x01;

/// Bumped whenever the on-disk layout changes. Readers refuse anything else.
pub const VERSION: u32 = 3;

/// Hard ceiling on the packed guide array. Loading refuses anything larger.
pub const MAX_BODY_BYTES: u64 = 3 * 1024 * 1024 * 1024;

/// Marker + version bytes preceding the metadata block.
pub const PREAMBLE_LEN: u64 = 1 + 4;

const NAME_LEN: usize = 30;

/// Fixed-layout index header. Written packed, field by field, so the byte
/// layout is owned by this module rather than by a compiler's struct
/// padding rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Number of guide words stored in the body.
    pub num_seqs: u64,
    /// Guide length in bases. Identical for every slot of an index.
    pub seq_length: u64,
    /// Added to the 1-based slot number to form the globally exposed id,
    /// letting multiple species share a flat id space.
    pub offset: u64,
    pub species_id: u8,
    pub species: String,
    pub assembly: String,
}

impl Metadata {
    /// Packed byte size: three u64 fields, the species id, and two
    /// NUL-padded 30 byte name fields.
    pub const BYTE_LEN: usize = 3 * 8 + 1 + 2 * NAME_LEN;

    pub fn new(
        seq_length: u64,
        offset: u64,
        species_id: u8,
        species: &str,
        assembly: &str,
    ) -> Result<Self> {
        Ok(Self {
            num_seqs: 0,
            seq_length,
            offset,
            species_id,
            species: validated_name(species)?,
            assembly: validated_name(assembly)?,
        })
    }

    pub(crate) fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let loc_msg = "While reading index metadata";
        let mut block = [0u8; Self::BYTE_LEN];
        reader.read_exact(&mut block).loc(loc_msg)?;

        let mut word = [0u8; 8];
        let mut read_u64 = |range: std::ops::Range<usize>| -> u64 {
            word.copy_from_slice(&block[range]);
            u64::from_le_bytes(word)
        };

        let num_seqs = read_u64(0..8);
        let seq_length = read_u64(8..16);
        let offset = read_u64(16..24);
        let species_id = block[24];
        let species = unpack_name(&block[25..25 + NAME_LEN]);
        let assembly = unpack_name(&block[25 + NAME_LEN..]);

        Ok(Self { num_seqs, seq_length, offset, species_id, species, assembly })
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let loc_msg = "While writing index metadata";
        let mut block = [0u8; Self::BYTE_LEN];
        block[0..8].copy_from_slice(&self.num_seqs.to_le_bytes());
        block[8..16].copy_from_slice(&self.seq_length.to_le_bytes());
        block[16..24].copy_from_slice(&self.offset.to_le_bytes());
        block[24] = self.species_id;
        block[25..25 + self.species.len()].copy_from_slice(self.species.as_bytes());
        block[25 + NAME_LEN..25 + NAME_LEN + self.assembly.len()]
            .copy_from_slice(self.assembly.as_bytes());
        writer.write_all(&block).loc(loc_msg)
    }
}

/// Name fields are NUL-padded ASCII; decode up to the first NUL.
fn unpack_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn validated_name(name: &str) -> Result<String> {
    if name.len() > NAME_LEN {
        return Err(IndexError::NameTooLong(name.to_string(), NAME_LEN))
            .loc("While packing index metadata");
    }
    Ok(name.to_string())
}

/// Parse and verify the full file header, including the memory ceiling on
/// the body that follows. Leaves the reader positioned on the first guide
/// word.
pub(crate) fn read_header<R: Read>(reader: &mut R) -> Result<Metadata> {
    use IndexError::{EndianMismatch, MemoryCeiling, VersionMismatch};
    let loc_msg = "While reading index header";

    let mut marker = [0u8; 1];
    reader.read_exact(&mut marker).loc(loc_msg)?;
    if marker[0] != ENDIAN_MARKER {
        return Err(EndianMismatch).loc(loc_msg);
    }

    let mut version = [0u8; 4];
    reader.read_exact(&mut version).loc(loc_msg)?;
    let version = u32::from_le_bytes(version);
    if version != VERSION {
        return Err(VersionMismatch { expected: VERSION, found: version }).loc(loc_msg);
    }
    debug!("Version is {version}");

    let metadata = Metadata::read_from(reader)?;
    info!(
        "Assembly is {} ({}). File has {} sequences of length {}. Offset is {}. Species id is {}",
        metadata.assembly,
        metadata.species,
        metadata.num_seqs,
        metadata.seq_length,
        metadata.offset,
        metadata.species_id,
    );

    let memory_required = metadata.num_seqs.saturating_mul(8);
    debug!("Will require {}MB of memory", (memory_required / 1024) / 1024);
    if memory_required > MAX_BODY_BYTES {
        return Err(MemoryCeiling { required: memory_required }).loc(loc_msg);
    }

    Ok(metadata)
}

/// Write the endian marker and version bytes opening every index file.
pub(crate) fn write_preamble<W: Write>(writer: &mut W) -> Result<()> {
    let loc_msg = "While writing index preamble";
    writer.write_all(&[ENDIAN_MARKER]).loc(loc_msg)?;
    writer.write_all(&VERSION.to_le_bytes()).loc(loc_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn metadata() -> Metadata {
        Metadata {
            num_seqs: 12,
            seq_length: 20,
            offset: 300,
            species_id: 1,
            species: "Human".to_string(),
            assembly: "GRCh38".to_string(),
        }
    }

    #[test]
    fn metadata_roundtrip() -> Result<()> {
        let mut bytes = Vec::new();
        metadata().write_to(&mut bytes)?;
        assert_eq!(bytes.len(), Metadata::BYTE_LEN);

        let decoded = Metadata::read_from(&mut Cursor::new(bytes))?;
        assert_eq!(decoded, metadata());
        Ok(())
    }

    #[test]
    fn header_roundtrip() -> Result<()> {
        let mut bytes = Vec::new();
        write_preamble(&mut bytes)?;
        metadata().write_to(&mut bytes)?;

        let decoded = read_header(&mut Cursor::new(bytes))?;
        assert_eq!(decoded, metadata());
        Ok(())
    }

    #[test]
    fn rejects_foreign_endianness() {
        let mut bytes = vec![0x02];
        bytes.extend_from_slice(&VERSION.to_le_bytes());

        let result = read_header(&mut Cursor::new(bytes));
        assert!(result.is_err_and(|e| {
            matches!(e.downcast_ref::<IndexError>(), Some(IndexError::EndianMismatch))
        }));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = vec![ENDIAN_MARKER];
        bytes.extend_from_slice(&2u32.to_le_bytes());

        let result = read_header(&mut Cursor::new(bytes));
        assert!(result.is_err_and(|e| {
            matches!(
                e.downcast_ref::<IndexError>(),
                Some(IndexError::VersionMismatch { expected: 3, found: 2 })
            )
        }));
    }

    #[test]
    fn rejects_oversized_body() -> Result<()> {
        let mut oversized = metadata();
        oversized.num_seqs = MAX_BODY_BYTES / 8 + 1;

        let mut bytes = Vec::new();
        write_preamble(&mut bytes)?;
        oversized.write_to(&mut bytes)?;

        let result = read_header(&mut Cursor::new(bytes));
        assert!(result.is_err_and(|e| {
            matches!(e.downcast_ref::<IndexError>(), Some(IndexError::MemoryCeiling { .. }))
        }));
        Ok(())
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "X".repeat(31);
        let result = Metadata::new(20, 0, 1, &name, "GRCh38");
        assert!(result.is_err_and(|e| {
            matches!(e.downcast_ref::<IndexError>(), Some(IndexError::NameTooLong(_, 30)))
        }));
    }
}
