use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;

pub fn read_json_file<P: AsRef<Path>>(path: P) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path.as_ref())
        .with_context(|| format!("cannot read {}", path.as_ref().display()))?;
    let v: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| anyhow!("invalid json: {e}"))?;
    Ok(v)
}

/// Read and parse a typed artifact (spec, registry, bindings, schema,
/// report) from a JSON file.
pub fn read_artifact<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let v = read_json_file(path.as_ref())?;
    serde_json::from_value(v)
        .with_context(|| format!("invalid artifact: {}", path.as_ref().display()))
}

pub fn write_json_file<P: AsRef<Path>, T: serde::Serialize>(path: P, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path.as_ref(), s.as_bytes())
        .with_context(|| format!("cannot write {}", path.as_ref().display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_round_trip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"a": 1}}"#).unwrap();
        let v = read_json_file(f.path()).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(read_json_file(f.path()).is_err());
    }
}
