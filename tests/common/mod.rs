use std::{fs, path::PathBuf};

use anyhow::Result;
use index_store::{IndexStore, Metadata};
use tempfile::TempDir;

pub const OFFSET: u64 = 100;

/// A reference with one site per chromosome, chosen so that the resulting
/// store holds (in slot order): an all-A pam-right guide, its all-T
/// pam-left reverse complement, an unrelated mixed guide, an
/// N-contaminated guide (encoded as the skip sentinel) and an all-C guide.
pub const FIXTURE_FASTA: &str = "\
>1 test chromosome
AAAAAAAAAAAAAAAAAAAACGGCCGTTTTTTTTTTTTTTTTTTTT
>2
ACGTACGTACGTACGTACGTCGG
>3
NAAAAAAAAAAAAAAAAAAACGG
>4
CCCCCCCCCCCCCCCCCCCCCGG
";

pub struct Fixture {
    pub dir: TempDir,
    pub records: PathBuf,
    pub index: PathBuf,
}

/// Run the full ingestion pipeline: FASTA -> gathered records -> binary
/// index, with ids starting at `OFFSET + 1`.
pub fn setup_index() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let fasta = dir.path().join("genome.fa");
    let records = dir.path().join("crisprs.csv");
    let index = dir.path().join("crisprs.bin");

    fs::write(&fasta, FIXTURE_FASTA)?;
    gather::parse_genome(&fasta, &records, 1, "CGG")?;

    let template = Metadata::new(20, OFFSET, 1, "Human", "GRCh38")?;
    IndexStore::build(&[records.clone()], &index, &template)?;

    Ok(Fixture { dir, records, index })
}
