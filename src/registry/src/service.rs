use located_error::prelude::*;
use log::debug;

use scan::{OtsRecord, PamMode, Query, DEFAULT_MAX_OFFS};

use crate::Registry;

/// The narrow surface an HTTP front-end drives. Everything here validates
/// its inputs and returns plain data; transport framing stays outside.
pub struct Service {
    registry: Registry,
    max_offs: usize,
}

impl Service {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry, max_offs: DEFAULT_MAX_OFFS }
    }

    /// Override the per-query cap on stored off-target ids.
    #[must_use]
    pub fn with_max_offs(mut self, max_offs: usize) -> Self {
        self.max_offs = max_offs;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Exact-match search. `pam_right` follows the wire encoding:
    /// 0 = PAM left, 1 = PAM right, 2 = orientation-agnostic.
    pub fn search(&self, species: &str, seq: &str, pam_right: u8) -> Result<Vec<u64>> {
        let mode = PamMode::try_from(pam_right).loc("While validating pam_right")?;
        let store = self.registry.get(species)?;

        debug!("Searching for {seq}, pam_right is {pam_right}");
        scan::search_by_seq(&store, seq, mode)
    }

    /// Off-target enumeration for guides already present in the index.
    /// With `store_offs` unset only the per-distance summaries come back.
    pub fn off_targets_by_ids(
        &self,
        species: &str,
        ids: &[u64],
        store_offs: bool,
    ) -> Result<Vec<OtsRecord>> {
        let store = self.registry.get(species)?;
        let queries = scan::queries_from_ids(&store, ids)?;
        let mut records = scan::find_off_targets(&store, &queries, self.max_offs)?;

        if !store_offs {
            for record in &mut records {
                record.off_targets = None;
            }
        }
        Ok(records)
    }

    /// Off-target enumeration for a raw guide sequence (synthetic id 0).
    pub fn off_targets_by_seq(
        &self,
        species: &str,
        seq: &str,
        pam_right: bool,
    ) -> Result<OtsRecord> {
        let store = self.registry.get(species)?;
        let query = Query::from_sequence(&store, seq, pam_right)?;
        let records = scan::find_off_targets(&store, &[query], self.max_offs)?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("off target scan returned no record"))
    }

    /// Decode guides back to their character sequences.
    ///
    /// Sequences are returned unquoted; hosts serving the legacy
    /// single-quoted id API must re-wrap them.
    pub fn ids_to_sequences(&self, species: &str, ids: &[u64]) -> Result<Vec<String>> {
        let store = self.registry.get(species)?;
        ids.iter()
            .map(|id| {
                debug!("Getting sequence for {id} ({species})");
                store.get_sequence(*id)
            })
            .collect()
    }
}

/// The `{"error": "..."}` envelope adapters report failures with.
#[must_use]
pub fn json_error(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
