use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data` via a sibling tempfile and rename, so readers
/// see either the old table or the new one.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read a YAML document. A missing or blank file reads as `None`.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if data.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_yaml::from_str(&data)?))
}

pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let data = serde_yaml::to_string(value)?;
    atomic_write(path, data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".crm/data/deals.yaml");
        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn yaml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.yaml");
        write_yaml(&path, &[3u64, 1, 2][..]).unwrap();
        let back: Option<Vec<u64>> = read_yaml(&path).unwrap();
        assert_eq!(back, Some(vec![3, 1, 2]));
    }

    #[test]
    fn missing_or_blank_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.yaml");
        assert!(read_yaml::<Vec<u64>>(&path).unwrap().is_none());
        std::fs::write(&path, "  \n").unwrap();
        assert!(read_yaml::<Vec<u64>>(&path).unwrap().is_none());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "{{nope").unwrap();
        assert!(read_yaml::<Vec<u64>>(&path).is_err());
    }
}
