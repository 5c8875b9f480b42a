use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Operating systems reported by os-prober, keyed by device path.
///
/// Lines look like `/dev/sda1:Windows 10:Windows:chain`; only the first
/// two fields matter here. Anything unparseable is skipped, and a
/// missing cache file yields an empty index: name lookups degrade to
/// the device path, they never fail.
#[derive(Debug, Clone, Default)]
pub struct OsProberIndex {
    entries: HashMap<String, String>,
}

impl OsProberIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reader<R: Read>(reader: R) -> Self {
        let mut entries = HashMap::new();
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            let mut fields = line.split(':');
            match (fields.next(), fields.next()) {
                (Some(device), Some(name)) if !device.is_empty() && !name.is_empty() => {
                    entries.insert(device.to_string(), name.to_string());
                }
                _ => debug!("skipping malformed os-prober line: {line:?}"),
            }
        }
        Self { entries }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::File::open(path.as_ref()) {
            Ok(file) => Self::from_reader(file),
            Err(err) => {
                debug!("no os-prober cache at {:?}: {err}", path.as_ref());
                Self::new()
            }
        }
    }

    pub fn insert(&mut self, device: &str, name: &str) {
        self.entries.insert(device.to_string(), name.to_string());
    }

    pub fn lookup(&self, device: &str) -> Option<&str> {
        self.entries.get(device).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_device_and_name_fields() {
        let index = OsProberIndex::from_reader(
            "/dev/sda1:Windows 10:Windows:chain\n/dev/sdb2:Fedora 40:Fedora:linux\n".as_bytes(),
        );
        assert_eq!(index.lookup("/dev/sda1"), Some("Windows 10"));
        assert_eq!(index.lookup("/dev/sdb2"), Some("Fedora 40"));
        assert_eq!(index.lookup("/dev/sdc1"), None);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let index = OsProberIndex::from_reader("garbage\n:missing device\n".as_bytes());
        assert!(index.is_empty());
    }

    #[test]
    fn missing_file_yields_empty_index() {
        let index = OsProberIndex::load_from("/nonexistent/os-prober-cache");
        assert!(index.is_empty());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "/dev/nvme0n1p3:Ubuntu 24.04:Ubuntu:linux").expect("write");
        let index = OsProberIndex::load_from(file.path());
        assert_eq!(index.lookup("/dev/nvme0n1p3"), Some("Ubuntu 24.04"));
    }
}
