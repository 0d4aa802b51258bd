use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// String key/value storage that outlives the process, like a browser's
/// local storage.
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Keeps all entries in one JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, entries })
    }

    fn flush(&self) -> io::Result<()> {
        fs::write(&self.path, serde_json::to_vec_pretty(&self.entries)?)
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
