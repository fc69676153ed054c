use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use located_error::prelude::*;
use log::{debug, info, warn};

use seqcodec::{encode, EncodedGuide, ERROR_WORD};

use crate::error::IndexError;
use crate::format::{self, Metadata, PREAMBLE_LEN};

/// Number of PAM bases trailing (or leading) the guide within a gathered
/// record's sequence field.
const PAM_LEN: usize = 3;

const READ_CHUNK_BYTES: usize = 8 * 1024 * 1024;

/// Counters reported by [`IndexStore::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Records written, skipped ones included.
    pub num_seqs: u64,
    /// Records whose guide failed to encode and were written as
    /// [`ERROR_WORD`] placeholders.
    pub skipped: u64,
}

/// A loaded index: the packed guide array plus its metadata.
///
/// Slot 0 of the array is reserved padding so that the 1-based external
/// ids map directly onto array positions (`global id = slot + offset`).
/// Stores are immutable once loaded; concurrent readers need no locking.
pub struct IndexStore {
    metadata: Metadata,
    crisprs: Vec<u64>,
}

impl IndexStore {
    /// Load a binary index file into memory.
    pub fn load(path: &Path) -> Result<Self> {
        use IndexError::Truncated;
        let loc_msg = || format!("While loading binary index '{}'", path.display());

        info!("Loading binary data from '{}'", path.display());
        let file = File::open(path).with_loc(loc_msg)?;
        let mut reader = BufReader::new(file);
        let metadata = format::read_header(&mut reader).with_loc(loc_msg)?;

        let start = Instant::now();
        let num_seqs = usize::try_from(metadata.num_seqs).with_loc(loc_msg)?;
        let mut crisprs = vec![0u64; num_seqs + 1]; // Slot 0 stays 0: ids match db ids.

        let mut buffer = vec![0u8; READ_CHUNK_BYTES];
        let mut word = [0u8; 8];
        let mut slot = 1;
        let mut remaining = num_seqs * 8;
        while remaining > 0 {
            let take = remaining.min(READ_CHUNK_BYTES);
            reader
                .read_exact(&mut buffer[..take])
                .map_err(|_| Truncated { expected: metadata.num_seqs })
                .with_loc(loc_msg)?;
            for chunk in buffer[..take].chunks_exact(8) {
                word.copy_from_slice(chunk);
                crisprs[slot] = u64::from_le_bytes(word);
                slot += 1;
            }
            remaining -= take;
        }

        info!("Loaded {} sequences", metadata.num_seqs);
        debug!("Loading took {:.3?}", start.elapsed());

        Ok(Self { metadata, crisprs })
    }

    /// Convert gathered text records into a binary index file.
    ///
    /// Any error aborts the whole build and removes the partial output.
    pub fn build(inputs: &[PathBuf], output: &Path, template: &Metadata) -> Result<BuildStats> {
        let stats = Self::write_index(inputs, output, template);
        if stats.is_err() {
            fs::remove_file(output).ok(); // No partial index left behind.
        }
        stats
    }

    fn write_index(inputs: &[PathBuf], output: &Path, template: &Metadata) -> Result<BuildStats> {
        let loc_msg = || format!("While building index '{}'", output.display());

        let out = File::create(output).with_loc(loc_msg)?;
        let mut out = BufWriter::new(out);

        format::write_preamble(&mut out).with_loc(loc_msg)?;
        // Hold the metadata's place with zeroes; the real block is written
        // once num_seqs is known.
        out.write_all(&[0u8; Metadata::BYTE_LEN]).with_loc(loc_msg)?;

        let mut metadata = template.clone();
        metadata.num_seqs = 0;
        let mut skipped = 0;

        for input in inputs {
            info!("Processing '{}'", input.display());
            let reader = BufReader::new(File::open(input).with_loc(loc_msg)?);

            for (line_idx, line) in reader.lines().enumerate() {
                let line = line.with_loc(loc_msg)?;
                if line.is_empty() {
                    continue;
                }

                let bits = Self::encode_record(&line, input, line_idx + 1, template.seq_length)?;
                out.write_all(&bits.to_le_bytes()).with_loc(loc_msg)?;

                if bits == ERROR_WORD {
                    skipped += 1;
                }
                metadata.num_seqs += 1;
                if metadata.num_seqs % 50_000_000 == 0 {
                    info!("Converted {} sequences", metadata.num_seqs);
                }
            }
        }

        out.seek(SeekFrom::Start(PREAMBLE_LEN)).with_loc(loc_msg)?;
        metadata.write_to(&mut out).with_loc(loc_msg)?;
        out.flush().with_loc(loc_msg)?;

        info!("Sequence length is {}", metadata.seq_length);
        info!("Converted {} sequences", metadata.num_seqs);
        if skipped > 0 {
            warn!("Skipped {skipped} sequences");
        }

        Ok(BuildStats { num_seqs: metadata.num_seqs, skipped })
    }

    /// Parse one `chr,start,seq,pam_right,species_id` record and encode its
    /// guide. A guide that fails to encode comes back as [`ERROR_WORD`];
    /// structural problems are fatal.
    fn encode_record(line: &str, path: &Path, line_no: usize, seq_length: u64) -> Result<u64> {
        use IndexError::{InvalidPamRight, MalformedRecord, MixedSeqLength};
        let malformed = || MalformedRecord { path: path.to_path_buf(), line: line_no };
        let loc_msg = "While encoding gathered records";

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 || !fields[2].is_ascii() {
            return Err(malformed()).loc(loc_msg);
        }

        let pam_right = match fields[3].parse::<u8>() {
            Ok(0) => false,
            Ok(1) => true,
            Ok(_) => {
                return Err(InvalidPamRight { path: path.to_path_buf(), line: line_no })
                    .loc(loc_msg)
            }
            Err(_) => return Err(malformed()).loc(loc_msg),
        };

        let seq = fields[2];
        if seq.len() < PAM_LEN || (seq.len() - PAM_LEN) as u64 != seq_length {
            return Err(MixedSeqLength {
                expected: seq_length,
                got: (seq.len() as u64).saturating_sub(PAM_LEN as u64),
                path: path.to_path_buf(),
                line: line_no,
            })
            .loc(loc_msg);
        }

        // The PAM is the trailing 3 bases when pam_right, else the leading 3.
        let guide = match pam_right {
            true => &seq[..seq.len() - PAM_LEN],
            false => &seq[PAM_LEN..],
        };

        Ok(encode(guide, pam_right))
    }

    /// Assemble a store from already-encoded parts. `crisprs` must carry
    /// the padding word at slot 0; `num_seqs` is derived from its length.
    #[must_use]
    pub fn from_parts(mut metadata: Metadata, crisprs: Vec<u64>) -> Self {
        metadata.num_seqs = crisprs.len() as u64 - 1;
        Self { metadata, crisprs }
    }

    /// Fetch the encoded guide at a local (1-based) slot.
    pub fn get(&self, local_id: u64) -> Result<u64> {
        use IndexError::{EmptyStore, IdOutOfRange};
        if self.metadata.num_seqs == 0 {
            return Err(EmptyStore).loc("While fetching a guide");
        }
        if local_id == 0 || local_id > self.metadata.num_seqs {
            return Err(IdOutOfRange { id: local_id }).loc("While fetching a guide");
        }
        Ok(self.crisprs[local_id as usize])
    }

    /// Decode the guide behind a global id back into characters.
    pub fn get_sequence(&self, global_id: u64) -> Result<String> {
        let guide = EncodedGuide::from_bits(self.get(self.local_id(global_id)?)?);
        Ok(guide.decode(self.metadata.seq_length as usize))
    }

    /// Translate a global id into this store's local slot, erroring unless
    /// `offset < global_id <= offset + num_seqs`.
    pub fn local_id(&self, global_id: u64) -> Result<u64> {
        use IndexError::IdOutOfRange;
        global_id
            .checked_sub(self.metadata.offset)
            .filter(|local| *local >= 1 && *local <= self.metadata.num_seqs)
            .ok_or(IdOutOfRange { id: global_id })
            .loc("While localising a global id")
    }

    /// The full packed array, padding slot included. Valid guide slots are
    /// `1..=num_seqs`.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.crisprs
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[must_use]
    pub fn num_seqs(&self) -> u64 {
        self.metadata.num_seqs
    }

    #[must_use]
    pub fn seq_length(&self) -> u64 {
        self.metadata.seq_length
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.metadata.offset
    }

    #[must_use]
    pub fn species(&self) -> &str {
        &self.metadata.species
    }
}
