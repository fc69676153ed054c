mod error;
mod record;

pub use error::ScanError;
pub use record::{MismatchSummary, OtsRecord};

use std::time::Instant;

use located_error::prelude::*;
use log::{debug, info};
use rayon::prelude::*;

use index_store::IndexStore;
use seqcodec::{encode, pam_bit, popcount2, revcom_bits, ERROR_WORD};

/// Sites further than this many base mismatches from the query are ignored.
pub const MAX_MISMATCHES: usize = 4;

/// Default ceiling on the per-query off-target id list. Once the hit count
/// reaches it the list is dropped and only the summary is reported.
pub const DEFAULT_MAX_OFFS: usize = 2000;

/// Slot range handed to each worker of a partitioned scan.
const SCAN_CHUNK_SLOTS: usize = 1 << 20;

/// PAM-orientation constraint of an exact search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PamMode {
    /// PAM on the 5' side of the guide as stored.
    Left,
    /// PAM on the 3' side of the guide as stored.
    Right,
    /// Orientation-agnostic: the PAM flag is normalized away before
    /// comparison.
    Any,
}

impl TryFrom<u8> for PamMode {
    type Error = ScanError;

    fn try_from(value: u8) -> Result<Self, ScanError> {
        match value {
            0 => Ok(Self::Left),
            1 => Ok(Self::Right),
            2 => Ok(Self::Any),
            other => Err(ScanError::InvalidPamMode(other)),
        }
    }
}

/// A query prepared for scanning: the encoded guide and its reverse
/// complement. The two always carry opposite PAM flags, which is what the
/// kernel's orientation selection relies on.
#[derive(Debug, Clone, Copy)]
pub struct Query {
    pub id: u64,
    pub seq: u64,
    pub rev_seq: u64,
}

impl Query {
    /// Build a query from a guide already present in the store.
    pub fn from_global_id(store: &IndexStore, global_id: u64) -> Result<Self> {
        use ScanError::InvalidQuery;
        let loc_msg = || format!("While preparing query for id {global_id}");

        let seq = store.get(store.local_id(global_id)?)?;
        if seq == ERROR_WORD {
            return Err(InvalidQuery).with_loc(loc_msg);
        }

        let rev_seq = revcom_bits(seq, store.seq_length() as usize);
        Ok(Self { id: global_id, seq, rev_seq })
    }

    /// Build a synthetic query (id 0) from a raw sequence. Sequences of the
    /// wrong length or alphabet raise; they never silently match nothing.
    pub fn from_sequence(store: &IndexStore, seq: &str, pam_right: bool) -> Result<Self> {
        use ScanError::{InvalidQuery, SequenceLength};
        let loc_msg = || format!("While preparing query for sequence '{seq}'");

        let expected = store.seq_length();
        if seq.len() as u64 != expected {
            return Err(SequenceLength { expected, got: seq.len() as u64 }).with_loc(loc_msg);
        }

        let bits = encode(seq, pam_right);
        if bits == ERROR_WORD {
            return Err(InvalidQuery).with_loc(loc_msg);
        }

        let rev_seq = revcom_bits(bits, expected as usize);
        Ok(Self { id: 0, seq: bits, rev_seq })
    }
}

/// Prepare one query per requested global id.
pub fn queries_from_ids(store: &IndexStore, ids: &[u64]) -> Result<Vec<Query>> {
    ids.iter().map(|id| Query::from_global_id(store, *id)).collect()
}

/// Scan the whole store for exact matches of `seq` under a PAM constraint.
///
/// Every slot is compared against the query and its reverse complement, so
/// a site stored in the opposite orientation is still found through its
/// other strand. [`PamMode::Any`] additionally forces the PAM flag on in
/// both the queries and each slot, making the comparison blind to the
/// stored orientation.
pub fn search_by_seq(store: &IndexStore, seq: &str, mode: PamMode) -> Result<Vec<u64>> {
    use ScanError::EmptyStore;
    if store.num_seqs() == 0 {
        return Err(EmptyStore).loc("While searching by sequence");
    }

    let len = store.seq_length() as usize;
    let mut query = Query::from_sequence(store, seq, !matches!(mode, PamMode::Left))?;

    let force_pam = match mode {
        PamMode::Any => pam_bit(len),
        PamMode::Left | PamMode::Right => 0,
    };
    query.seq |= force_pam;
    query.rev_seq |= force_pam;

    let offset = store.offset();
    let start = Instant::now();

    let mut matches = Vec::new();
    for (slot, &word) in store.words().iter().enumerate().skip(1) {
        if word == ERROR_WORD {
            continue;
        }
        // With force_pam set, the flag is always 1 on both sides.
        let current = word | force_pam;
        if current == query.seq || current == query.rev_seq {
            matches.push(slot as u64 + offset);
        }
    }

    info!("Found {} exact matches", matches.len());
    debug!("Scanning took {:.3?}", start.elapsed());
    Ok(matches)
}

/// Partial scan result for one contiguous slot chunk.
#[derive(Default)]
struct Partial {
    summary: MismatchSummary,
    offs: Vec<u64>,
    total: u64,
}

/// Enumerate off-targets for a batch of queries.
///
/// For each stored guide the XOR against the query either leaves the PAM
/// bit clear (orientations agree: count base mismatches directly) or sets
/// it (orientations disagree: the reverse complement of the query is the
/// form with the matching orientation, so count against that instead).
/// Each stored guide is therefore compared against exactly one of the two
/// forms, never both.
///
/// The slot range is partitioned across workers; partial summaries and id
/// lists are reduced in chunk order, so ids come back in ascending slot
/// order without a sort.
pub fn find_off_targets(
    store: &IndexStore,
    queries: &[Query],
    max_offs: usize,
) -> Result<Vec<OtsRecord>> {
    use ScanError::EmptyStore;
    if store.num_seqs() == 0 {
        return Err(EmptyStore).loc("While searching for off targets");
    }

    let len = store.seq_length() as usize;
    let pam_on = pam_bit(len);
    let pam_off = !pam_on;
    let offset = store.offset();
    let words = &store.words()[1..];

    let start = Instant::now();
    let mut results = Vec::with_capacity(queries.len());

    for query in queries {
        debug!("Finding off targets for {}", query.id);

        let partials: Vec<Partial> = words
            .par_chunks(SCAN_CHUNK_SLOTS)
            .enumerate()
            .map(|(chunk_idx, chunk)| {
                let first_slot = chunk_idx * SCAN_CHUNK_SLOTS + 1;
                let mut partial = Partial::default();

                for (i, &word) in chunk.iter().enumerate() {
                    if word == ERROR_WORD {
                        continue;
                    }

                    let xor = query.seq ^ word;
                    let mismatches = if xor & pam_on != 0 {
                        popcount2((query.rev_seq ^ word) & pam_off)
                    } else {
                        popcount2(xor & pam_off)
                    } as usize;

                    if mismatches <= MAX_MISMATCHES {
                        partial.summary.record(mismatches);
                        partial.total += 1;
                        if partial.offs.len() < max_offs {
                            partial.offs.push((first_slot + i) as u64 + offset);
                        }
                    }
                }

                partial
            })
            .collect();

        let mut summary = MismatchSummary::default();
        let mut total = 0;
        for partial in &partials {
            summary.merge(&partial.summary);
            total += partial.total;
        }

        // Ids are only reported below the cap, where no chunk can have hit
        // its own bound either: the concatenation is the complete list.
        let off_targets = ((total as usize) < max_offs)
            .then(|| partials.iter().flat_map(|p| p.offs.iter().copied()).collect());

        info!("Found {total} off targets for {}", query.id);
        results.push(OtsRecord { id: query.id, off_targets, summary });
    }

    debug!("Off target scan took {:.3?}", start.elapsed());
    Ok(results)
}
