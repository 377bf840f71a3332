//! Finding arena.
//!
//! Findings are addressed by opaque id. The correlator reads an immutable
//! snapshot and appends correlation records by id; nothing else mutates the
//! store after construction.

use super::{CorrelationRecord, Finding};

/// Opaque handle to a finding in a [`FindingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FindingId(pub(crate) u32);

impl FindingId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Arena of the run's final, enhanced findings.
#[derive(Debug, Default)]
pub struct FindingStore {
    findings: Vec<Finding>,
}

impl FindingStore {
    /// Build the arena from the enhanced, canonically sorted finding set.
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn get(&self, id: FindingId) -> Option<&Finding> {
        self.findings.get(id.index())
    }

    /// Immutable view of every finding, in arena order.
    pub fn snapshot(&self) -> &[Finding] {
        &self.findings
    }

    /// Ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = FindingId> + '_ {
        (0..self.findings.len() as u32).map(FindingId)
    }

    /// Ids of every finding belonging to `file`.
    pub fn ids_for_file(&self, file: &str) -> Vec<FindingId> {
        self.findings
            .iter()
            .enumerate()
            .filter(|(_, f)| f.file == file)
            .map(|(i, _)| FindingId(i as u32))
            .collect()
    }

    /// Append a correlation record to a finding. Append-only: records are
    /// never removed or reordered once attached.
    pub fn attach(&mut self, id: FindingId, record: CorrelationRecord) {
        if let Some(f) = self.findings.get_mut(id.index()) {
            f.correlations.push(record);
        }
    }

    /// Consume the arena for the report.
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
