//! One file per column under a save directory.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use stratum_chunk::ColumnKey;

#[derive(Clone, Debug)]
pub struct ColumnStore {
    dir: PathBuf,
}

impl ColumnStore {
    /// Opens `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: ColumnKey) -> PathBuf {
        self.dir.join(format!("c.{}.{}.col", key.cx, key.cz))
    }

    pub fn exists(&self, key: ColumnKey) -> bool {
        self.path_for(key).is_file()
    }

    pub fn reader(&self, key: ColumnKey) -> io::Result<BufReader<File>> {
        Ok(BufReader::new(File::open(self.path_for(key))?))
    }

    pub fn writer(&self, key: ColumnKey) -> io::Result<BufWriter<File>> {
        Ok(BufWriter::new(File::create(self.path_for(key))?))
    }
}
