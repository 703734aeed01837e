use std::path::{Path, PathBuf};

use crate::error::DatasetError;

/// File name of the sample index inside a sample directory.
pub const INDEX_FILE: &str = "index.json";

/// One labeled recording listed in a sample index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SampleRecord {
    #[serde(rename = "ID")]
    pub id: String,
    /// Algorithm in cube notation.
    pub label: String,
    /// Audio path relative to the sample directory; empty when not yet recorded.
    #[serde(default)]
    pub file: String,
}

impl SampleRecord {
    pub fn is_recorded(&self) -> bool {
        !self.file.is_empty()
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum IndexFile {
    Wrapped {
        #[serde(rename = "Samples")]
        samples: Vec<SampleRecord>,
    },
    Bare(Vec<SampleRecord>),
}

/// A sample directory's index, in file order.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    pub dir: PathBuf,
    pub samples: Vec<SampleRecord>,
}

impl SampleIndex {
    /// Read `index.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        let path = dir.join(INDEX_FILE);
        let content = std::fs::read_to_string(&path).map_err(|source| DatasetError::IndexRead {
            path: path.clone(),
            source,
        })?;
        let parsed: IndexFile = serde_json::from_str(&content)
            .map_err(|source| DatasetError::IndexParse { path, source })?;
        let samples = match parsed {
            IndexFile::Wrapped { samples } | IndexFile::Bare(samples) => samples,
        };
        Ok(SampleIndex {
            dir: dir.to_path_buf(),
            samples,
        })
    }

    /// Samples that have an audio file, paired with the resolved path.
    pub fn recorded(&self) -> impl Iterator<Item = (&SampleRecord, PathBuf)> + '_ {
        self.samples
            .iter()
            .filter(|s| s.is_recorded())
            .map(|s| (s, self.dir.join(&s.file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_wrapped_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(INDEX_FILE),
            r#"{"Samples":[{"ID":"a","Label":"R U","File":"a.wav"},{"ID":"b","Label":"F","File":""}]}"#,
        )
        .unwrap();

        let index = SampleIndex::load(dir.path()).unwrap();
        assert_eq!(index.samples.len(), 2);
        assert_eq!(index.samples[0].label, "R U");

        let recorded: Vec<_> = index.recorded().collect();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, dir.path().join("a.wav"));
    }

    #[test]
    fn test_load_bare_array() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(INDEX_FILE),
            r#"[{"ID":"x1","Label":"x2"}]"#,
        )
        .unwrap();

        let index = SampleIndex::load(dir.path()).unwrap();
        assert_eq!(index.samples[0].id, "x1");
        assert!(!index.samples[0].is_recorded());
    }

    #[test]
    fn test_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let err = SampleIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, DatasetError::IndexRead { .. }));
    }

    #[test]
    fn test_malformed_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{not json").unwrap();
        let err = SampleIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, DatasetError::IndexParse { .. }));
    }
}
