use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Cnpj;
use crate::error::EnrichError;
use crate::record::CompanyRecord;
use crate::spreadsheet;

pub const MARKER_FILE_NAME: &str = "checkpoint.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub last_cnpj: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub last_cnpj: Option<String>,
    pub records: Vec<CompanyRecord>,
}

pub trait ProgressStore {
    /// Never fails; anything unusable is treated as "no checkpoint".
    fn load(&self) -> Checkpoint;

    fn save(&self, records: &[CompanyRecord]) -> Result<(), EnrichError>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn load(&self) -> Checkpoint {
        (**self).load()
    }

    fn save(&self, records: &[CompanyRecord]) -> Result<(), EnrichError> {
        (**self).save(records)
    }
}

/// Exact match first, then digits-only, since the marker holds the formatted CNPJ.
pub fn remaining_after<'a>(ids: &'a [String], last: Option<&str>) -> &'a [String] {
    let Some(last) = last else {
        return ids;
    };
    let position = ids.iter().position(|id| id == last).or_else(|| {
        let digits = Cnpj::normalize(last);
        if digits.is_empty() {
            return None;
        }
        ids.iter().position(|id| Cnpj::normalize(id) == digits)
    });
    match position {
        Some(index) => &ids[index + 1..],
        None => {
            debug!(last, "checkpoint identifier not in input, starting over");
            ids
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileProgressStore {
    output_path: PathBuf,
    marker_path: PathBuf,
}

impl FileProgressStore {
    pub fn new(output_path: PathBuf, marker_path: PathBuf) -> Self {
        Self {
            output_path,
            marker_path,
        }
    }

    pub fn beside_output(output_path: PathBuf) -> Self {
        let marker_path = default_marker_path(&output_path);
        Self::new(output_path, marker_path)
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    pub fn read_marker(&self) -> Option<Marker> {
        let content = fs::read_to_string(&self.marker_path).ok()?;
        match serde_json::from_str::<Marker>(&content) {
            Ok(marker) => Some(marker),
            Err(err) => {
                warn!(path = %self.marker_path.display(), error = %err, "ignoring unreadable checkpoint");
                None
            }
        }
    }

    fn write_marker(&self, marker: &Marker) -> Result<(), EnrichError> {
        if let Some(parent) = self.marker_path.parent() {
            fs::create_dir_all(parent).map_err(|err| EnrichError::Filesystem(err.to_string()))?;
        }
        let tmp_path = self.marker_path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(marker)
            .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
        fs::write(&tmp_path, &content).map_err(|err| EnrichError::Filesystem(err.to_string()))?;
        fs::rename(&tmp_path, &self.marker_path)
            .map_err(|err| EnrichError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl ProgressStore for FileProgressStore {
    fn load(&self) -> Checkpoint {
        let Some(marker) = self.read_marker() else {
            return Checkpoint::default();
        };
        match spreadsheet::read_records(&self.output_path) {
            Ok(records) => Checkpoint {
                last_cnpj: Some(marker.last_cnpj),
                records,
            },
            Err(err) => {
                warn!(
                    path = %self.output_path.display(),
                    error = %err,
                    "checkpoint output unreadable, starting over"
                );
                Checkpoint::default()
            }
        }
    }

    fn save(&self, records: &[CompanyRecord]) -> Result<(), EnrichError> {
        spreadsheet::write_records(&self.output_path, records)?;
        if let Some(last) = records.last() {
            self.write_marker(&Marker {
                last_cnpj: last.cnpj.clone(),
            })?;
        }
        debug!(records = records.len(), "checkpoint saved");
        Ok(())
    }
}

pub fn default_marker_path(output_path: &Path) -> PathBuf {
    output_path.with_file_name(MARKER_FILE_NAME)
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    saved: RefCell<Checkpoint>,
    saves: RefCell<Vec<usize>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            saved: RefCell::new(checkpoint),
            saves: RefCell::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Checkpoint {
        self.saved.borrow().clone()
    }

    pub fn save_sizes(&self) -> Vec<usize> {
        self.saves.borrow().clone()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Checkpoint {
        self.snapshot()
    }

    fn save(&self, records: &[CompanyRecord]) -> Result<(), EnrichError> {
        let mut saved = self.saved.borrow_mut();
        saved.records = records.to_vec();
        if let Some(last) = records.last() {
            saved.last_cnpj = Some(last.cnpj.clone());
        }
        self.saves.borrow_mut().push(records.len());
        Ok(())
    }
}
