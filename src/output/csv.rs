//! CSV export of duplicate groups.
//!
//! One row is generated for each member of each group.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number, in canonical traversal order
//! - `fingerprint`: the shared content identity
//! - `role`: `canonical` or `duplicate`
//! - `path`: path to the file
//! - `size`: file size in bytes
//! - `modified`: last modified time recorded by the scan (RFC 3339)

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    Canonical,
    Duplicate,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    group_id: usize,
    fingerprint: String,
    role: Role,
    path: String,
    size: u64,
    modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            let fingerprint = group.fingerprint().to_string();
            for (position, record) in group.members().enumerate() {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    fingerprint: fingerprint.clone(),
                    role: if position == 0 {
                        Role::Canonical
                    } else {
                        Role::Duplicate
                    },
                    path: record.path.to_string_lossy().into_owned(),
                    size: record.size,
                    modified: record.last_modified.to_rfc3339(),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
