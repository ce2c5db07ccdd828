//! Provides a handle for plain files.
//!
//! A [FileHandle](FileHandle) keeps a file open for reading. While it sits idle in a cache, its
//! descriptor is closed (see [Handle::suspend]) and transparently re-opened once it is handed out
//! again. Changes on disk are detected via the modification time of the file.
//!
//! # Examples
//! ```
//! # use filecache::cache::FileCache;
//! # use filecache::file::FileFactory;
//! # use filecache::handle::Handle;
//! # use filecache::limits::CacheSettings;
//! # use filecache::scheduler::Scheduler;
//! # use std::io::Write;
//! let mut data = tempfile::NamedTempFile::new().unwrap();
//! data.write_all(b"Hello World").unwrap();
//! let location = data.path().to_str().unwrap();
//!
//! let scheduler = Scheduler::new().unwrap();
//! let cache = FileCache::new("files", CacheSettings::default(), scheduler.clone());
//!
//! let file = cache.acquire(&FileFactory, location).unwrap();
//! let mut buffer = [0; 5];
//! assert_eq!(file.read_at(6, &mut buffer).unwrap(), 5);
//! assert_eq!(&buffer, b"World");
//!
//! // Hands the file back to the cache...
//! file.close().unwrap();
//! assert_eq!(file.is_open(), false);
//!
//! scheduler.shutdown();
//! ```
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use anyhow::Context;
use parking_lot::Mutex;

use crate::handle::{Factory, Handle, OpenRequest, Owner};

/// Wraps a file which is opened for reading.
pub struct FileHandle {
    location: String,
    path: PathBuf,
    file: Mutex<Option<File>>,
    closed: AtomicBool,
    owner: Mutex<Option<Owner>>,
}

impl FileHandle {
    /// Opens the file at the given location.
    ///
    /// # Errors
    /// Fails if the file doesn't exist or cannot be read.
    pub fn open(location: &str) -> anyhow::Result<Self> {
        let path = PathBuf::from(location);
        let file = File::open(&path).with_context(|| format!("Cannot open {}", location))?;

        Ok(FileHandle {
            location: location.to_owned(),
            path,
            file: Mutex::new(Some(file)),
            closed: AtomicBool::new(false),
            owner: Mutex::new(None),
        })
    }

    /// Returns the path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads up to **buffer.len()** bytes starting at the given offset.
    ///
    /// Returns the number of bytes read, which is only less than requested at the end of the
    /// file.
    pub fn read_at(&self, offset: u64, buffer: &mut [u8]) -> anyhow::Result<usize> {
        let mut guard = self.file.lock();
        let file = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("{} is not open.", self.location))?;

        let _ = file.seek(SeekFrom::Start(offset))?;
        let mut read = 0;
        while read < buffer.len() {
            match file.read(&mut buffer[read..])? {
                0 => break,
                bytes => read += bytes,
            }
        }

        Ok(read)
    }

    /// Returns the current size of the file in bytes.
    pub fn len(&self) -> anyhow::Result<u64> {
        match self.file.lock().as_ref() {
            Some(file) => Ok(file.metadata()?.len()),
            None => Ok(std::fs::metadata(&self.path)?.len()),
        }
    }

    /// Determines if the file is empty.
    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Determines if the descriptor is currently open.
    pub fn is_open(&self) -> bool {
        self.file.lock().is_some()
    }
}

impl Handle for FileHandle {
    fn location(&self) -> &str {
        &self.location
    }

    fn last_modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }

    fn close(&self) -> anyhow::Result<()> {
        let owner = self.owner.lock().clone();
        if let Some(owner) = owner {
            if owner.release() {
                return Ok(());
            }
        }

        self.closed.store(true, Ordering::Release);
        let _ = self.file.lock().take();

        Ok(())
    }

    fn suspend(&self) -> anyhow::Result<()> {
        let _ = self.file.lock().take();
        Ok(())
    }

    fn resume(&self) -> anyhow::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(anyhow::anyhow!("{} has already been closed.", self.location));
        }

        let mut file = self.file.lock();
        if file.is_none() {
            *file = Some(
                File::open(&self.path)
                    .with_context(|| format!("Cannot re-open {}", self.location))?,
            );
        }

        Ok(())
    }

    fn set_owner(&self, owner: Option<Owner>) {
        *self.owner.lock() = owner;
    }
}

/// Opens a [FileHandle](FileHandle) for the location of each request.
pub struct FileFactory;

impl Factory<FileHandle> for FileFactory {
    fn open(&self, request: &OpenRequest) -> anyhow::Result<FileHandle> {
        FileHandle::open(request.location())
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::FileCache;
    use crate::file::{FileFactory, FileHandle};
    use crate::handle::Handle;
    use crate::limits::CacheSettings;
    use crate::scheduler::Scheduler;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_str().unwrap().to_owned()
    }

    #[test]
    fn files_can_be_read() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_file(&dir, "test.txt", b"0123456789");

        let file = FileHandle::open(&location).unwrap();
        assert_eq!(file.len().unwrap(), 10);
        assert_eq!(file.is_empty().unwrap(), false);

        let mut buffer = [0; 4];
        assert_eq!(file.read_at(2, &mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"2345");
        assert_eq!(file.read_at(8, &mut buffer).unwrap(), 2);
        assert_eq!(file.read_at(20, &mut buffer).unwrap(), 0);
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let location = dir.path().join("missing.txt");

        assert_eq!(
            FileHandle::open(location.to_str().unwrap()).is_err(),
            true
        );
    }

    #[test]
    fn suspended_files_are_reopened_on_resume() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_file(&dir, "test.txt", b"abc");

        let file = FileHandle::open(&location).unwrap();
        file.suspend().unwrap();
        assert_eq!(file.is_open(), false);
        assert_eq!(file.len().unwrap(), 3);

        file.resume().unwrap();
        assert_eq!(file.is_open(), true);

        // Once really closed, a file cannot be resumed anymore...
        file.close().unwrap();
        assert_eq!(file.is_open(), false);
        assert_eq!(file.resume().is_err(), true);
    }

    #[test]
    fn cached_files_are_reused_until_modified() {
        let dir = tempfile::tempdir().unwrap();
        let location = write_file(&dir, "data.nc", b"version 1");

        let scheduler = Scheduler::new().unwrap();
        let cache = FileCache::new("files", CacheSettings::default(), scheduler.clone());

        let first = cache.acquire(&FileFactory, &location).unwrap();
        first.close().unwrap();
        assert_eq!(first.is_open(), false);

        let second = cache.acquire(&FileFactory, &location).unwrap();
        assert_eq!(Arc::ptr_eq(&first, &second), true);
        assert_eq!(second.is_open(), true);
        second.close().unwrap();

        // Modify the file and make sure that its timestamp changes...
        {
            let mut file = OpenOptions::new().append(true).open(&location).unwrap();
            file.write_all(b" and 2").unwrap();
            file.set_modified(SystemTime::now() + Duration::from_secs(10))
                .unwrap();
        }

        let third = cache.acquire(&FileFactory, &location).unwrap();
        assert_eq!(Arc::ptr_eq(&first, &third), false);
        assert_eq!(first.resume().is_err(), true);

        let mut buffer = [0; 15];
        assert_eq!(third.read_at(0, &mut buffer).unwrap(), 15);
        assert_eq!(&buffer, b"version 1 and 2");
        assert_eq!(cache.show_stats().hits, 1);
        assert_eq!(cache.show_stats().misses, 2);

        scheduler.shutdown();
    }
}
