//! Change Records and the Change Log
//!
//! One `ChangeRecord` per attempted operation, successful or not. Records are
//! immutable once created; the log only appends. Statistics are derived from
//! the log on demand.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, MutationError};
use crate::operation::{MutationOperation, OperationKind};

/// Result of one applied (or attempted) mutation operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Unique record id
    pub id: String,
    /// The operation as requested
    pub operation: OperationKind,
    /// Target file, relative to the project root
    pub file: String,
    /// Line the operation asked for
    pub requested_line: usize,
    /// Line where the before-value was actually found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_line: Option<usize>,
    /// `resolved_line - requested_line` when resolution used the fallback search
    #[serde(default)]
    pub line_offset: i64,
    /// Expected before-value
    pub before: String,
    /// Written after-value
    pub after: String,
    /// Property name for property-style operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Full text of the resolved line before the edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_before: Option<String>,
    /// Full text of the resolved line after the edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_after: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// RFC 3339 timestamp
    pub recorded_at: String,
}

impl ChangeRecord {
    fn base(op: &MutationOperation) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: op.kind(),
            file: op.file().to_string(),
            requested_line: op.line(),
            resolved_line: None,
            line_offset: 0,
            before: op.before().to_string(),
            after: op.after(),
            property: op.property().map(str::to_string),
            line_before: None,
            line_after: None,
            success: false,
            error: None,
            error_kind: None,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Record a successful application.
    pub fn applied(
        op: &MutationOperation,
        resolved_line: usize,
        line_before: String,
        line_after: String,
    ) -> Self {
        Self {
            resolved_line: Some(resolved_line),
            line_offset: resolved_line as i64 - op.line() as i64,
            line_before: Some(line_before),
            line_after: Some(line_after),
            success: true,
            ..Self::base(op)
        }
    }

    /// Record a failed attempt.
    pub fn failed(op: &MutationOperation, error: &MutationError) -> Self {
        Self {
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::base(op)
        }
    }

    /// Whether the fallback search moved the edit off the requested line.
    pub fn used_fallback(&self) -> bool {
        self.success && self.line_offset != 0
    }
}

/// Per operation-kind counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Statistics derived from a change log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful records resolved away from their requested line
    pub fallback_resolved: usize,
    pub by_kind: BTreeMap<OperationKind, KindStats>,
    pub by_error: BTreeMap<ErrorKind, usize>,
}

impl ChangeLogStats {
    /// Fraction of attempts that succeeded (1.0 for an empty log).
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }
}

/// Append-only log of change records for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeLog {
    records: Vec<ChangeRecord>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ChangeRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Successful records only.
    pub fn successful(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(|r| r.success)
    }

    /// Files with at least one successful edit, sorted.
    pub fn touched_files(&self) -> Vec<String> {
        self.successful()
            .map(|r| r.file.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Compute statistics over every record.
    pub fn stats(&self) -> ChangeLogStats {
        let mut stats = ChangeLogStats::default();
        for record in &self.records {
            stats.total += 1;
            let kind = stats.by_kind.entry(record.operation).or_default();
            kind.total += 1;
            if record.success {
                stats.succeeded += 1;
                kind.succeeded += 1;
                if record.used_fallback() {
                    stats.fallback_resolved += 1;
                }
            } else {
                stats.failed += 1;
                kind.failed += 1;
                if let Some(error_kind) = record.error_kind {
                    *stats.by_error.entry(error_kind).or_default() += 1;
                }
            }
        }
        stats
    }
}

impl IntoIterator for ChangeLog {
    type Item = ChangeRecord;
    type IntoIter = std::vec::IntoIter<ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
