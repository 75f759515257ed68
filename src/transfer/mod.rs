//! Whole-store import/export.
//!
//! The store file is copied in its entirety as an opaque byte blob; the
//! payload is never parsed or validated. Sources and destinations are
//! plain `Read`/`Write` values, so a user-granted file handle, a bundled
//! asset, or a filesystem path all work the same way.
//!
//! Transfers coordinate with live store access through the connection
//! lock: export holds the lock for the duration of the copy so no writer
//! can race it, and import closes the connection before overwriting the
//! file in place, reopening it afterwards. Partial writes to an export
//! destination are not rolled back, so a failed transfer can leave the
//! destination truncated.

use crate::error::{Result, StoreError};
use crate::store::Store;
use log::{info, warn};
use rusqlite::Connection;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Chunk size for streaming copies.
const COPY_BUF_LEN: usize = 8 * 1024;

impl Store {
    /// Whether the app-private store file is present on disk.
    pub fn exists_locally(&self) -> bool {
        self.store_file().exists()
    }

    /// Stream the store file's bytes to `dest`. Returns the number of
    /// bytes written.
    pub fn export_to<W: Write>(&self, dest: &mut W) -> Result<u64> {
        // Holding the lock keeps writers out for the duration of the copy.
        let _slot = self.lock_slot();

        let path = self.store_file();
        let source = File::open(&path)?;
        let written = copy_chunked(source, dest)?;

        info!("exported {written} bytes from {}", path.display());
        Ok(written)
    }

    /// Export the store file to a filesystem path, overwriting it.
    pub fn export_to_path(&self, dest: &Path) -> Result<u64> {
        let mut file = File::create(dest)?;
        self.export_to(&mut file)
    }

    /// Overwrite the store file in place with bytes from `source`. The
    /// payload is trusted to be a compatible store file. The live
    /// connection is closed for the duration of the copy and reopened over
    /// whatever ends up on disk.
    pub fn import_from<R: Read>(&self, source: &mut R) -> Result<u64> {
        let mut slot = self.lock_slot();
        // Quiesce: drop the live connection before overwriting the file it
        // has open.
        drop(slot.take());

        let path = self.store_file();
        let copied = File::create(&path)
            .map_err(StoreError::from)
            .and_then(|mut file| Ok(copy_chunked(source, &mut file)?));

        match Connection::open(&path) {
            Ok(conn) => *slot = Some(conn),
            Err(e) => warn!("store connection not reopened after import: {e}"),
        }

        let copied = copied?;
        info!("imported {copied} bytes into {}", path.display());
        Ok(copied)
    }

    /// Import the store file from a filesystem path.
    pub fn import_from_path(&self, source: &Path) -> Result<u64> {
        let mut file = File::open(source)?;
        self.import_from(&mut file)
    }

    /// Import the store file bundled with the application package, at
    /// `<asset_dir>/databases/<store file name>`.
    pub fn import_from_bundled_asset(&self) -> Result<u64> {
        let asset_dir = self.asset_dir().ok_or_else(|| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                "no bundled asset directory configured",
            ))
        })?;

        let store_path = self.store_file();
        let file_name = store_path.file_name().unwrap_or_default();
        let asset = asset_dir.join("databases").join(file_name);

        let mut file = File::open(&asset)?;
        self.import_from(&mut file)
    }
}

fn copy_chunked<R: Read, W: Write>(mut source: R, dest: &mut W) -> io::Result<u64> {
    let mut buf = [0u8; COPY_BUF_LEN];
    let mut total = 0u64;
    loop {
        let read = source.read(&mut buf)?;
        if read == 0 {
            break;
        }
        dest.write_all(&buf[..read])?;
        total += read as u64;
    }
    dest.flush()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Student;
    use crate::store::StoreConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn open_store(tmp: &TempDir, sub: &str) -> Store {
        Store::open(StoreConfig::new(tmp.path().join(sub), "Rollcall")).unwrap()
    }

    fn sample(first: &str, roll: &str) -> Student {
        Student::new(first, "Doe", roll, Some(vec![1, 2, 3]))
    }

    #[test]
    fn test_exists_locally() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "a");
        assert!(store.exists_locally());

        std::fs::remove_file(store.store_file()).unwrap();
        assert!(!store.exists_locally());
    }

    #[test]
    fn test_export_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "a");
        std::fs::remove_file(store.store_file()).unwrap();

        let mut sink = Vec::new();
        let err = store.export_to(&mut sink).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_export_import_roundtrip_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let source = open_store(&tmp, "a");
        source.insert(&sample("John", "R-1")).unwrap();
        source.insert(&sample("Mary", "R-2")).unwrap();

        let mut blob = Vec::new();
        let exported = source.export_to(&mut blob).unwrap();
        assert_eq!(exported as usize, blob.len());

        let target = open_store(&tmp, "b");
        let imported = target.import_from(&mut blob.as_slice()).unwrap();
        assert_eq!(imported, exported);

        assert_eq!(
            std::fs::read(source.store_file()).unwrap(),
            std::fs::read(target.store_file()).unwrap()
        );
        assert_eq!(source.get_all().unwrap(), target.get_all().unwrap());
    }

    #[test]
    fn test_path_based_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let source = open_store(&tmp, "a");
        source.insert(&sample("John", "R-1")).unwrap();

        let exported = tmp.path().join("backup.sqlite");
        source.export_to_path(&exported).unwrap();

        let target = open_store(&tmp, "b");
        target.import_from_path(&exported).unwrap();

        let all = target.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].roll_number, "R-1");
    }

    #[test]
    fn test_import_replaces_existing_rows_and_store_stays_usable() {
        let tmp = TempDir::new().unwrap();
        let source = open_store(&tmp, "a");
        source.insert(&sample("John", "R-1")).unwrap();

        let target = open_store(&tmp, "b");
        target.insert(&sample("Mary", "R-9")).unwrap();

        let mut blob = Vec::new();
        source.export_to(&mut blob).unwrap();
        target.import_from(&mut blob.as_slice()).unwrap();

        let all = target.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].roll_number, "R-1");

        // Connection was reopened; writes still work.
        target.insert(&sample("Mary", "R-9")).unwrap();
        assert_eq!(target.count("student").unwrap(), 2);
    }

    #[test]
    fn test_import_from_bundled_asset() {
        let tmp = TempDir::new().unwrap();
        let source = open_store(&tmp, "a");
        source.insert(&sample("John", "R-1")).unwrap();

        let asset_dir = tmp.path().join("assets");
        std::fs::create_dir_all(asset_dir.join("databases")).unwrap();
        source
            .export_to_path(&asset_dir.join("databases").join("RollcallLocalDB"))
            .unwrap();

        let target = Store::open(
            StoreConfig::new(tmp.path().join("b"), "Rollcall").with_asset_dir(&asset_dir),
        )
        .unwrap();
        target.import_from_bundled_asset().unwrap();

        assert_eq!(target.count("student").unwrap(), 1);
    }

    #[test]
    fn test_bundled_asset_requires_configured_dir() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "a");

        let err = store.import_from_bundled_asset().unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_failed_export_surfaces_io_error() {
        struct BrokenSink;

        impl Write for BrokenSink {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp, "a");
        store.insert(&sample("John", "R-1")).unwrap();

        let err = store.export_to(&mut BrokenSink).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
