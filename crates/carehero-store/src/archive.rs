//! Per-session JSON archive
//!
//! Three file kinds live under the archive directory:
//!
//! - `patient_data_{session}.json`: list of record snapshots (append)
//! - `extracted_{session}.json`: list of structured extraction snapshots (append)
//! - `discovery_{session}.json`: latest discovery output (overwrite)
//!
//! Every file is a single newline-free JSON document. Appends are
//! read-modify-write; an unreadable file is treated as an empty list.

use crate::StoreError;
use carehero_domain::PatientRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed archive rooted at a directory
#[derive(Debug, Clone)]
pub struct JsonArchive {
    dir: PathBuf,
}

impl JsonArchive {
    /// Create an archive, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Archive directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn safe_id(session_id: &str) -> String {
        session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    fn path_for(&self, prefix: &str, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", prefix, Self::safe_id(session_id)))
    }

    /// Directory for a session's discovery screenshots (not created here)
    pub fn screenshot_dir(&self, session_id: &str) -> PathBuf {
        self.dir.join("screenshots").join(Self::safe_id(session_id))
    }

    /// Path of the patient snapshot list for a session
    pub fn patient_data_path(&self, session_id: &str) -> PathBuf {
        self.path_for("patient_data", session_id)
    }

    /// Path of the extraction snapshot list for a session
    pub fn extracted_path(&self, session_id: &str) -> PathBuf {
        self.path_for("extracted", session_id)
    }

    /// Path of the discovery output for a session
    pub fn discovery_path(&self, session_id: &str) -> PathBuf {
        self.path_for("discovery", session_id)
    }

    fn read_list(path: &Path) -> Vec<serde_json::Value> {
        let Ok(raw) = fs::read_to_string(path) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed archive file treated as empty");
                Vec::new()
            }
        }
    }

    fn append<T: Serialize>(path: &Path, value: &T) -> Result<usize, StoreError> {
        let mut list = Self::read_list(path);
        list.push(serde_json::to_value(value)?);
        fs::write(path, serde_json::to_string(&list)?)?;
        debug!(path = %path.display(), entries = list.len(), "Archive appended");
        Ok(list.len())
    }

    /// Append a record snapshot; returns the new list length
    pub fn append_patient_snapshot(&self, record: &PatientRecord) -> Result<usize, StoreError> {
        Self::append(&self.patient_data_path(record.session_id()), record)
    }

    /// Load every snapshot for a session, skipping entries that fail to decode
    pub fn load_patient_snapshots(&self, session_id: &str) -> Vec<PatientRecord> {
        Self::read_list(&self.patient_data_path(session_id))
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    /// Latest snapshot for a session
    pub fn latest_patient_snapshot(&self, session_id: &str) -> Option<PatientRecord> {
        self.load_patient_snapshots(session_id).pop()
    }

    /// Append a structured extraction snapshot; returns the new list length
    pub fn append_extraction<T: Serialize>(
        &self,
        session_id: &str,
        snapshot: &T,
    ) -> Result<usize, StoreError> {
        Self::append(&self.extracted_path(session_id), snapshot)
    }

    /// Load extraction snapshots for a session
    pub fn load_extractions<T: DeserializeOwned>(&self, session_id: &str) -> Vec<T> {
        Self::read_list(&self.extracted_path(session_id))
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }

    /// Replace the discovery output for a session
    pub fn write_discovery<T: Serialize>(
        &self,
        session_id: &str,
        output: &T,
    ) -> Result<(), StoreError> {
        let path = self.discovery_path(session_id);
        fs::write(&path, serde_json::to_string(output)?)?;
        debug!(path = %path.display(), "Discovery output written");
        Ok(())
    }

    /// Load the discovery output for a session, if present and well-formed
    pub fn load_discovery<T: DeserializeOwned>(&self, session_id: &str) -> Option<T> {
        let path = self.discovery_path(session_id);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed discovery file ignored");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_session_id_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let archive = JsonArchive::new(dir.path()).unwrap();
        let path = archive.discovery_path("../etc/passwd");
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.ends_with("discovery____etc_passwd.json"));

        let shots = archive.screenshot_dir("../etc");
        assert_eq!(shots, dir.path().join("screenshots").join("___etc"));
    }

    #[test]
    fn test_malformed_file_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let archive = JsonArchive::new(dir.path()).unwrap();
        fs::write(archive.patient_data_path("s"), "{{{ nope").unwrap();

        assert!(archive.load_patient_snapshots("s").is_empty());
        let len = archive
            .append_patient_snapshot(&PatientRecord::new("s"))
            .unwrap();
        assert_eq!(len, 1);
    }

    #[test]
    fn test_files_are_newline_free() {
        let dir = TempDir::new().unwrap();
        let archive = JsonArchive::new(dir.path()).unwrap();
        let mut record = PatientRecord::new("s");
        record.record_message(carehero_domain::Speaker::User, "line one\nline two");
        archive.append_patient_snapshot(&record).unwrap();

        let raw = fs::read_to_string(archive.patient_data_path("s")).unwrap();
        assert!(!raw.contains('\n'));
    }

    #[test]
    fn test_discovery_overwrites() {
        let dir = TempDir::new().unwrap();
        let archive = JsonArchive::new(dir.path()).unwrap();
        archive.write_discovery("s", &vec![1, 2, 3]).unwrap();
        archive.write_discovery("s", &vec![4]).unwrap();
        let loaded: Vec<i32> = archive.load_discovery("s").unwrap();
        assert_eq!(loaded, vec![4]);
    }
}
