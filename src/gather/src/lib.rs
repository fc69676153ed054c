mod error;
pub use error::GatherError;

use std::{
    collections::VecDeque,
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
    time::Instant,
};

use located_error::prelude::*;
use log::{debug, info};

use seqcodec::revcom_str;

/// Guide length in bases. Fixed at gather time; the index inherits it.
const GUIDE_LEN: usize = 20;

/// Whitespace lookup covering every possible input byte, so the inner
/// per-character loop never calls into char classification.
static SPACE: [bool; 256] = space_table();

const fn space_table() -> [bool; 256] {
    let mut table = [false; 256];
    table[b' ' as usize] = true;
    table[b'\t' as usize] = true;
    table[b'\n' as usize] = true;
    table[0x0b] = true; // vertical tab
    table[0x0c] = true; // form feed
    table[b'\r' as usize] = true;
    table
}

/// Counters reported by [`parse_genome`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatherStats {
    /// Candidate records emitted. A window PAM-valid in both orientations
    /// counts twice.
    pub records: u64,
    pub chromosomes: u64,
}

/// Stream a FASTA reference and emit every PAM-flanked candidate site on
/// both strands as `chr,start,seq,pam_right,species_id` records.
///
/// A sliding window of guide + PAM bases (23 for the canonical 3-base PAM)
/// moves over each chromosome. Once the window is fully primed, its
/// trailing bases are checked against `pam` (PAM on the right) and its
/// leading bases against the reverse complement of `pam` (PAM on the
/// left). The PAM is matched literally: `GGG` means the bases `GGG`, not
/// the IUPAC pattern `NGG`.
///
/// `N` and other non-ACGT bases flow through into the records untouched;
/// encoding turns them into skip-slots later, keeping the position-to-id
/// mapping intact.
pub fn parse_genome(fasta: &Path, output: &Path, species_id: u8, pam: &str) -> Result<GatherStats> {
    use GatherError::{CreateOutput, InvalidPam, OpenInput};
    let loc_msg = || format!("While gathering CRISPRs from '{}'", fasta.display());

    if pam.is_empty() {
        return Err(InvalidPam).with_loc(loc_msg);
    }
    let rev_pam = revcom_str(pam).map_err(|_| InvalidPam).with_loc(loc_msg)?;
    let window_len = GUIDE_LEN + pam.len();

    info!("Loading genome from '{}'", fasta.display());
    let reader = BufReader::new(File::open(fasta).map_err(OpenInput).with_loc(loc_msg)?);
    let mut out = BufWriter::new(File::create(output).map_err(CreateOutput).with_loc(loc_msg)?);

    let start_time = Instant::now();
    let mut stats = GatherStats::default();
    let mut window: VecDeque<u8> = VecDeque::from(vec![b'N'; window_len]);
    let mut seqname = String::new();
    let mut seqpos: u64 = 0;

    for line in reader.lines() {
        let line = line.with_loc(loc_msg)?;
        if line.is_empty() {
            continue;
        }

        // Header: reset the per-chromosome state and move on.
        if let Some(header) = line.strip_prefix('>') {
            seqname = chromosome_name(header);
            seqpos = 0;
            window.clear();
            window.resize(window_len, b'N');
            stats.chromosomes += 1;
            info!("Processing chromosome {seqname}");
            continue;
        }

        for &c in line.as_bytes() {
            if SPACE[c as usize] {
                continue;
            }

            window.pop_front();
            window.push_back(c);
            seqpos += 1;

            if seqpos >= window_len as u64 {
                // Ensembl coordinates: 1-based, inclusive.
                let start = seqpos - window_len as u64 + 1;

                // A window may be PAM-valid in both orientations; both
                // records are emitted.
                if window_matches(&window, rev_pam.as_bytes(), false) {
                    stats.records += 1;
                    print_crispr_row(&mut out, &window, &seqname, start, false, species_id)
                        .with_loc(loc_msg)?;
                }
                if window_matches(&window, pam.as_bytes(), true) {
                    stats.records += 1;
                    print_crispr_row(&mut out, &window, &seqname, start, true, species_id)
                        .with_loc(loc_msg)?;
                }
            }
        }
    }

    out.flush().with_loc(loc_msg)?;
    info!("Gathered {} candidate CRISPRs from {} chromosomes", stats.records, stats.chromosomes);
    debug!("Gathering took {:.3?}", start_time.elapsed());
    Ok(stats)
}

/// First whitespace-delimited token of a FASTA header, with any redundant
/// leading `chr`/`Chr` stripped (no point repeating it 300 million times).
fn chromosome_name(header: &str) -> String {
    let name = header.split_whitespace().next().unwrap_or("");
    let name = name.strip_prefix("Chr").or_else(|| name.strip_prefix("chr")).unwrap_or(name);
    name.to_string()
}

/// Literal PAM check against the leading (pam left) or trailing (pam
/// right) bases of the window.
fn window_matches(window: &VecDeque<u8>, pam: &[u8], pam_right: bool) -> bool {
    let start = if pam_right { window.len() - pam.len() } else { 0 };
    pam.iter().enumerate().all(|(i, base)| window[start + i] == *base)
}

/// Format is e.g. `X,34759384,GTCATGCAATCGATCGATCGCGG,1,1`.
fn print_crispr_row<W: Write>(
    out: &mut W,
    window: &VecDeque<u8>,
    seqname: &str,
    start: u64,
    pam_right: bool,
    species_id: u8,
) -> io::Result<()> {
    write!(out, "{seqname},{start},")?;
    let (head, tail) = window.as_slices();
    out.write_all(head)?;
    out.write_all(tail)?;
    writeln!(out, ",{},{species_id}", u8::from(pam_right))
}
