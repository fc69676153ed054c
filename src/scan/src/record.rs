use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::MAX_MISMATCHES;

/// Per-distance hit counts for one query, distances 0..=4.
/// Always complete, even when the off-target id list overflows its cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MismatchSummary([u64; MAX_MISMATCHES + 1]);

impl MismatchSummary {
    #[inline]
    pub(crate) fn record(&mut self, mismatches: usize) {
        self.0[mismatches] += 1;
    }

    pub(crate) fn merge(&mut self, other: &Self) {
        for (count, partial) in self.0.iter_mut().zip(other.0.iter()) {
            *count += partial;
        }
    }

    #[must_use]
    pub fn counts(&self) -> &[u64; MAX_MISMATCHES + 1] {
        &self.0
    }

    /// Every site found within the mismatch budget, cap or no cap.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }
}

impl From<[u64; MAX_MISMATCHES + 1]> for MismatchSummary {
    fn from(counts: [u64; MAX_MISMATCHES + 1]) -> Self {
        Self(counts)
    }
}

/// Renders as `{0: n0, 1: n1, 2: n2, 3: n3, 4: n4}` - the brace-enclosed
/// summary string consumers of the off-target reports parse.
impl fmt::Display for MismatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (distance, count) in self.0.iter().enumerate() {
            if distance > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{distance}: {count}")?;
        }
        write!(f, "}}")
    }
}

/// Off-target report for a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtsRecord {
    /// Global id of the query guide (0 for raw-sequence queries).
    pub id: u64,
    /// Global ids of the matching sites, in ascending slot order. `None`
    /// when the hit count reached the configured cap, in which case only
    /// the summary is reported.
    pub off_targets: Option<Vec<u64>>,
    pub summary: MismatchSummary,
}

/// `{"id": n, "off_targets": [...], "off_target_summary": "{0: a, ...}"}`.
/// A capped record serializes its id list as the empty array.
impl Serialize for OtsRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OtsRecord", 3)?;
        state.serialize_field("id", &self.id)?;
        match &self.off_targets {
            Some(ids) => state.serialize_field("off_targets", ids)?,
            None => state.serialize_field("off_targets", &[0u64; 0][..])?,
        }
        state.serialize_field("off_target_summary", &self.summary.to_string())?;
        state.end()
    }
}
