//! Known-person roster backed by a JSON file.
//!
//! The file is a single object mapping name to encoding:
//! `{ "Alice": [0.01, -0.12, ...], "Bob": [...] }`.
//! Every mutation is written through to disk before it returns.

use crate::matcher::FaceComparator;
use crate::types::{Encoding, KnownPerson};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Conventional roster file name.
pub const KNOWN_PERSONS_FILENAME: &str = "known_persons.json";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("no visible person")]
    NoPersonVisible,
    #[error("too many visible people: {0}")]
    TooManyPeopleVisible(usize),
    #[error("person name must not be empty")]
    EmptyName,
    #[error("encoding must be non-empty and finite")]
    InvalidEncoding,
    #[error("corrupt roster {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("roster I/O on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("roster serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read the roster at `path`.
///
/// A missing file is an empty roster. Anything that is not a JSON object of
/// numeric arrays is a [`RegistryError::Parse`].
pub fn load(path: &Path) -> Result<BTreeMap<String, Encoding>, RegistryError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no roster file; starting empty");
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(RegistryError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the roster to `path` via a temp file in the same directory and a rename,
/// so a crash mid-write leaves the previous file intact.
pub fn save(path: &Path, persons: &BTreeMap<String, Encoding>) -> Result<(), RegistryError> {
    let io_err = |source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec(persons)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&json).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::debug!(path = %path.display(), persons = persons.len(), "roster saved");
    Ok(())
}

/// The set of known people, exclusively owned and persisted write-through.
#[derive(Debug)]
pub struct PersonRegistry {
    path: PathBuf,
    persons: BTreeMap<String, Encoding>,
}

impl PersonRegistry {
    /// An empty registry that will persist to `path`. Nothing is read or written yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            persons: BTreeMap::new(),
        }
    }

    /// Load the registry from `path`, or start empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let persons = load(&path)?;
        tracing::info!(path = %path.display(), persons = persons.len(), "loaded known persons");
        Ok(Self { path, persons })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    /// Known names in roster order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.persons.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Encoding> {
        self.persons.get(name)
    }

    pub fn persons(&self) -> impl Iterator<Item = KnownPerson<'_>> {
        self.persons
            .iter()
            .map(|(name, encoding)| KnownPerson { name, encoding })
    }

    /// Persist the current roster.
    pub fn save(&self) -> Result<(), RegistryError> {
        save(&self.path, &self.persons)
    }

    /// Register `name` from the encodings found in one frame.
    ///
    /// Exactly one encoding is required. An existing person with the same name
    /// is replaced. The roster is on disk before this returns; if writing fails
    /// the in-memory roster is left as it was.
    pub fn add_person(&mut self, name: &str, encodings: &[Encoding]) -> Result<(), RegistryError> {
        let encoding = match encodings {
            [] => return Err(RegistryError::NoPersonVisible),
            [one] => one,
            many => return Err(RegistryError::TooManyPeopleVisible(many.len())),
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if encoding.is_empty() || !encoding.values().iter().all(|v| v.is_finite()) {
            return Err(RegistryError::InvalidEncoding);
        }

        let previous = self.persons.insert(name.to_string(), encoding.clone());

        if let Err(e) = self.save() {
            match previous {
                Some(old) => self.persons.insert(name.to_string(), old),
                None => self.persons.remove(name),
            };
            return Err(e);
        }

        if previous.is_some() {
            tracing::info!(name, "replaced known person");
        } else {
            tracing::info!(name, persons = self.persons.len(), "added known person");
        }
        Ok(())
    }

    /// Forget `name`. Returns `false` if nobody by that name was known.
    ///
    /// The name is trimmed the same way [`add_person`](Self::add_person) trims it.
    pub fn remove_person(&mut self, name: &str) -> Result<bool, RegistryError> {
        let name = name.trim();
        let Some(old) = self.persons.remove(name) else {
            return Ok(false);
        };

        if let Err(e) = self.save() {
            self.persons.insert(name.to_string(), old);
            return Err(e);
        }

        tracing::info!(name, "removed known person");
        Ok(true)
    }

    /// Names of every known person matched by at least one of `encodings`.
    ///
    /// Each person is checked independently, so one encoding can yield several
    /// names. `None` and an empty slice both give an empty result.
    pub fn match_names<C>(&self, encodings: Option<&[Encoding]>, comparator: &C) -> Vec<String>
    where
        C: FaceComparator + ?Sized,
    {
        let encodings = match encodings {
            Some(e) if !e.is_empty() => e,
            _ => return Vec::new(),
        };

        self.persons
            .iter()
            .filter(|(_, known)| encodings.iter().any(|c| comparator.is_match(c, known)))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::DistanceTolerance;
    use tempfile::tempdir;

    fn bob_vector() -> Vec<f64> {
        (0..128).map(|i| 0.1 + i as f64 * 0.001).collect()
    }

    fn enc(values: &[f64]) -> Encoding {
        Encoding::new(values.to_vec())
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let reg = PersonRegistry::open(dir.path().join(KNOWN_PERSONS_FILENAME)).unwrap();
        assert!(reg.is_empty());
        assert!(!reg.path().exists());
    }

    #[test]
    fn test_load_malformed_json_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        std::fs::write(&path, "{not json").unwrap();
        let err = PersonRegistry::open(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Parse { .. }));
    }

    #[test]
    fn test_load_non_numeric_vector_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        std::fs::write(&path, r#"{"Bob": [0.1, "x"]}"#).unwrap();
        assert!(matches!(load(&path), Err(RegistryError::Parse { .. })));

        std::fs::write(&path, r#"{"Bob": 0.1}"#).unwrap();
        assert!(matches!(load(&path), Err(RegistryError::Parse { .. })));

        std::fs::write(&path, r#"[[0.1, 0.2]]"#).unwrap();
        assert!(matches!(load(&path), Err(RegistryError::Parse { .. })));
    }

    #[test]
    fn test_load_bob_and_match_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        let json = serde_json::json!({ "Bob": bob_vector() });
        std::fs::write(&path, json.to_string()).unwrap();

        let reg = PersonRegistry::open(&path).unwrap();
        assert_eq!(reg.len(), 1);
        let bob = reg.persons().next().unwrap();
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.encoding.len(), 128);

        let probe = [Encoding::new(bob_vector())];
        let names = reg.match_names(Some(&probe), &DistanceTolerance::default());
        assert_eq!(names, vec!["Bob".to_string()]);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        let written = r#"{"Alice":[0.125,-0.5,1e-7],"Bob":[0.1,0.2,0.3]}"#;
        std::fs::write(&path, written).unwrap();

        let persons = load(&path).unwrap();
        save(&path, &persons).unwrap();

        let before: serde_json::Value = serde_json::from_str(written).unwrap();
        let after: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(KNOWN_PERSONS_FILENAME);
        let mut reg = PersonRegistry::new(&path);
        reg.add_person("Alice", &[enc(&[0.1, 0.2])]).unwrap();

        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(KNOWN_PERSONS_FILENAME)]);
    }

    #[test]
    fn test_add_person_requires_exactly_one_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        let mut reg = PersonRegistry::new(&path);

        assert!(matches!(
            reg.add_person("Alice", &[]),
            Err(RegistryError::NoPersonVisible)
        ));
        assert!(matches!(
            reg.add_person("Alice", &[enc(&[0.1]), enc(&[0.2])]),
            Err(RegistryError::TooManyPeopleVisible(2))
        ));
        assert!(reg.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_add_person_persists_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        let mut reg = PersonRegistry::new(&path);
        reg.add_person("Alice", &[enc(&[0.1, 0.2])]).unwrap();

        let on_disk = load(&path).unwrap();
        assert_eq!(on_disk.get("Alice"), Some(&enc(&[0.1, 0.2])));
    }

    #[test]
    fn test_add_person_rejects_blank_name_and_bad_encoding() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        assert!(matches!(
            reg.add_person("   ", &[enc(&[0.1])]),
            Err(RegistryError::EmptyName)
        ));
        assert!(matches!(
            reg.add_person("Alice", &[enc(&[])]),
            Err(RegistryError::InvalidEncoding)
        ));
        assert!(matches!(
            reg.add_person("Alice", &[enc(&[f64::NAN])]),
            Err(RegistryError::InvalidEncoding)
        ));
    }

    #[test]
    fn test_add_person_trims_name() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        reg.add_person("  Alice \n", &[enc(&[0.1])]).unwrap();
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["Alice"]);
    }

    #[test]
    fn test_add_existing_name_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        let mut reg = PersonRegistry::new(&path);
        reg.add_person("Alice", &[enc(&[0.1, 0.2])]).unwrap();
        reg.add_person("Alice", &[enc(&[0.9, 0.9])]).unwrap();

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("Alice"), Some(&enc(&[0.9, 0.9])));
        assert_eq!(load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_add_person_rolls_back_when_save_fails() {
        let dir = tempdir().unwrap();
        // The roster path is an existing directory, so the rename cannot succeed.
        let path = dir.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let mut reg = PersonRegistry::new(&path);
        let err = reg.add_person("Alice", &[enc(&[0.1])]).unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_match_after_add() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        let enc_a = enc(&[0.1, 0.2, 0.3]);
        let enc_b = enc(&[5.0, -5.0, 5.0]);
        reg.add_person("Alice", &[enc_a.clone()]).unwrap();

        let cmp = DistanceTolerance::default();
        assert!(reg.match_names(Some(&[enc_a]), &cmp).contains(&"Alice".to_string()));
        assert!(!reg.match_names(Some(&[enc_b]), &cmp).contains(&"Alice".to_string()));
    }

    #[test]
    fn test_match_empty_or_absent() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        reg.add_person("Alice", &[enc(&[0.1])]).unwrap();

        let cmp = DistanceTolerance::default();
        assert!(reg.match_names(Some(&[]), &cmp).is_empty());
        assert!(reg.match_names(None, &cmp).is_empty());
    }

    #[test]
    fn test_match_one_encoding_yields_every_matching_person() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        reg.add_person("Alice", &[enc(&[0.0, 0.0])]).unwrap();
        reg.add_person("Alicia", &[enc(&[0.1, 0.0])]).unwrap();
        reg.add_person("Zed", &[enc(&[9.0, 9.0])]).unwrap();

        let names = reg.match_names(Some(&[enc(&[0.05, 0.0])]), &DistanceTolerance::default());
        assert_eq!(names, vec!["Alice".to_string(), "Alicia".to_string()]);
    }

    #[test]
    fn test_match_any_of_several_encodings() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        reg.add_person("Alice", &[enc(&[0.0, 0.0])]).unwrap();
        reg.add_person("Zed", &[enc(&[9.0, 9.0])]).unwrap();

        let frame = [enc(&[4.0, 4.0]), enc(&[9.0, 9.1])];
        let names = reg.match_names(Some(&frame), &DistanceTolerance::default());
        assert_eq!(names, vec!["Zed".to_string()]);
    }

    #[test]
    fn test_remove_person() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        let mut reg = PersonRegistry::new(&path);
        reg.add_person("Alice", &[enc(&[0.1])]).unwrap();

        assert!(reg.remove_person("Alice").unwrap());
        assert!(!reg.remove_person("Alice").unwrap());
        assert!(load(&path).unwrap().is_empty());
    }

    #[test]
    fn test_remove_person_trims_name() {
        let dir = tempdir().unwrap();
        let mut reg = PersonRegistry::new(dir.path().join(KNOWN_PERSONS_FILENAME));
        reg.add_person(" Alice", &[enc(&[0.1])]).unwrap();

        assert!(reg.remove_person(" Alice ").unwrap());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_remove_person_rolls_back_when_save_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(KNOWN_PERSONS_FILENAME);
        std::fs::write(&path, r#"{"Alice":[0.1],"Bob":[0.2]}"#).unwrap();
        let mut reg = PersonRegistry::open(&path).unwrap();

        // Put a non-empty directory where the roster lives so the rename fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = reg.remove_person("Alice").unwrap_err();
        assert!(matches!(err, RegistryError::Io { .. }));
        assert_eq!(reg.get("Alice"), Some(&enc(&[0.1])));
        assert_eq!(reg.len(), 2);

        // Once the path is usable again, disk catches up with memory.
        std::fs::remove_dir_all(&path).unwrap();
        reg.save().unwrap();
        assert_eq!(load(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_failed_save_leaves_existing_data_untouched() {
        let dir = tempdir().unwrap();
        let roster_dir = dir.path().join("roster");
        std::fs::create_dir(&roster_dir).unwrap();
        let good = roster_dir.join(KNOWN_PERSONS_FILENAME);
        let good_bytes = r#"{"Alice":[0.1,0.2]}"#;
        std::fs::write(&good, good_bytes).unwrap();

        // A second roster in the same directory whose path cannot be replaced.
        let blocked = roster_dir.join("blocked.json");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();

        let mut reg = PersonRegistry::new(&blocked);
        assert!(reg.add_person("Bob", &[enc(&[0.3])]).is_err());

        assert_eq!(std::fs::read_to_string(&good).unwrap(), good_bytes);
        assert_eq!(std::fs::read_to_string(blocked.join("keep")).unwrap(), "x");
        let mut entries: Vec<_> = std::fs::read_dir(&roster_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        entries.sort();
        assert_eq!(
            entries,
            vec![
                std::ffi::OsString::from("blocked.json"),
                std::ffi::OsString::from(KNOWN_PERSONS_FILENAME),
            ]
        );
    }
}
