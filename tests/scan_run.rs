mod common;

use std::fs;

use anyhow::Result;
use common::{setup_index, OFFSET};
use index_store::{IndexError, IndexStore};
use pretty_assertions::assert_eq;
use registry::{Registry, Service};

fn service() -> Result<(common::Fixture, Service)> {
    let fixture = setup_index()?;
    let registry = Registry::new();
    registry.load("human", &fixture.index)?;
    Ok((fixture, Service::new(registry)))
}

#[test]
fn gather_emits_both_strands_in_position_order() -> Result<()> {
    let fixture = setup_index()?;
    let records = fs::read_to_string(&fixture.records)?;
    assert_eq!(
        records.lines().collect::<Vec<_>>(),
        vec![
            "1,1,AAAAAAAAAAAAAAAAAAAACGG,1,1",
            "1,24,CCGTTTTTTTTTTTTTTTTTTTT,0,1",
            "2,1,ACGTACGTACGTACGTACGTCGG,1,1",
            "3,1,NAAAAAAAAAAAAAAAAAAACGG,1,1",
            "4,1,CCCCCCCCCCCCCCCCCCCCCGG,1,1",
        ]
    );
    Ok(())
}

#[test]
fn built_index_roundtrips_through_load() -> Result<()> {
    let fixture = setup_index()?;
    let store = IndexStore::load(&fixture.index)?;

    assert_eq!(store.num_seqs(), 5);
    assert_eq!(store.seq_length(), 20);
    assert_eq!(store.offset(), OFFSET);
    assert_eq!(store.species(), "Human");

    assert_eq!(store.get_sequence(OFFSET + 1)?, "AAAAAAAAAAAAAAAAAAAA");
    assert_eq!(store.get_sequence(OFFSET + 2)?, "TTTTTTTTTTTTTTTTTTTT");
    assert_eq!(store.get_sequence(OFFSET + 3)?, "ACGTACGTACGTACGTACGT");
    assert_eq!(store.get_sequence(OFFSET + 4)?, "N".repeat(20)); // Skip slot.
    assert_eq!(store.get_sequence(OFFSET + 5)?, "CCCCCCCCCCCCCCCCCCCC");
    Ok(())
}

#[test]
fn exact_search_end_to_end() -> Result<()> {
    let (_fixture, service) = service()?;
    let seq = "AAAAAAAAAAAAAAAAAAAA";

    // The pam-left all-T guide is the same physical site read from the
    // other strand, so the pam-right query reports it too.
    assert_eq!(service.search("human", seq, 1)?, vec![OFFSET + 1, OFFSET + 2]);
    assert_eq!(service.search("human", seq, 0)?, Vec::<u64>::new());
    assert_eq!(service.search("human", seq, 2)?, vec![OFFSET + 1, OFFSET + 2]);

    // An N-carrying query raises instead of silently matching nothing.
    assert!(service.search("human", "NAAAAAAAAAAAAAAAAAAA", 2).is_err());
    Ok(())
}

#[test]
fn off_targets_end_to_end() -> Result<()> {
    let (_fixture, service) = service()?;

    let records = service.off_targets_by_ids("human", &[OFFSET + 1, OFFSET + 3], true)?;
    assert_eq!(records.len(), 2);

    // Self-match plus the reverse-complement pair.
    assert_eq!(records[0].id, OFFSET + 1);
    assert_eq!(records[0].summary.counts(), &[2, 0, 0, 0, 0]);
    assert_eq!(records[0].off_targets, Some(vec![OFFSET + 1, OFFSET + 2]));

    // The mixed guide only matches itself.
    assert_eq!(records[1].id, OFFSET + 3);
    assert_eq!(records[1].summary.counts(), &[1, 0, 0, 0, 0]);
    assert_eq!(records[1].off_targets, Some(vec![OFFSET + 3]));

    let json = serde_json::to_string(&records[0])?;
    assert_eq!(
        json,
        format!(
            r#"{{"id":{},"off_targets":[{},{}],"off_target_summary":"{{0: 2, 1: 0, 2: 0, 3: 0, 4: 0}}"}}"#,
            OFFSET + 1,
            OFFSET + 1,
            OFFSET + 2
        )
    );
    Ok(())
}

#[test]
fn off_targets_by_raw_sequence() -> Result<()> {
    let (_fixture, service) = service()?;

    let record = service.off_targets_by_seq("human", "TTTTTTTTTTTTTTTTTTTT", false)?;
    assert_eq!(record.id, 0);
    assert_eq!(record.summary.counts(), &[2, 0, 0, 0, 0]);
    assert_eq!(record.off_targets, Some(vec![OFFSET + 1, OFFSET + 2]));
    Ok(())
}

#[test]
fn ids_to_sequences_end_to_end() -> Result<()> {
    let (_fixture, service) = service()?;
    let seqs = service.ids_to_sequences("human", &[OFFSET + 5, OFFSET + 4])?;
    assert_eq!(seqs, vec!["CCCCCCCCCCCCCCCCCCCC".to_string(), "N".repeat(20)]);
    Ok(())
}

#[test]
fn old_index_versions_are_rejected() -> Result<()> {
    let fixture = setup_index()?;

    // Byte 1 onwards holds the little-endian format version; wind it back.
    let mut bytes = fs::read(&fixture.index)?;
    bytes[1..5].copy_from_slice(&2u32.to_le_bytes());
    let stale = fixture.dir.path().join("stale.bin");
    fs::write(&stale, bytes)?;

    let result = IndexStore::load(&stale);
    assert!(result.is_err_and(|e| {
        matches!(
            e.downcast_ref::<IndexError>(),
            Some(IndexError::VersionMismatch { expected: 3, found: 2 })
        )
    }));
    Ok(())
}
