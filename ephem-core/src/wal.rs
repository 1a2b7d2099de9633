use crate::{Error, PasteId, PasteRecord, Result};
use bytes::{BufMut, BytesMut};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Log Sequence Number - monotonic commit order
pub type Lsn = u64;

const WAL_HEADER_SIZE: usize = 16;
const WAL_MAGIC: u32 = 0x4550_4857; // "EPHW"
const WAL_VERSION: u32 = 1;
const RECORD_HEADER_SIZE: usize = 12; // lsn(8) + len(4)
const MAX_ENTRY_SIZE: usize = 64 * 1024 * 1024;

/// A logged change to the paste table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry {
    /// A newly created paste
    Insert(PasteRecord),
    /// View counter after an accepted increment. Absolute, so replay is idempotent.
    Views { id: PasteId, current_views: u64 },
}

/// Append-only paste log
/// Format: [magic(4) | version(4) | reserved(8)] [entry...]
/// Entry: [lsn(8) | len(4) | bincode data | crc32(4)]
pub struct Wal {
    path: PathBuf,
    inner: Mutex<WalInner>,
}

struct WalInner {
    file: File,
    next_lsn: Lsn,
    /// Offset just past the last complete entry
    end_offset: u64,
    /// Offset up to which the file has been fsynced
    synced_offset: u64,
}

/// Result of walking the log frames
struct Scan {
    frames: Vec<(Lsn, Vec<u8>)>,
    valid_len: u64,
    max_lsn: Lsn,
    torn_tail: bool,
}

impl Wal {
    /// Create a new log file; fails if it already exists
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        file.write_all(&Self::header())?;
        file.sync_all()?;

        Ok(Self {
            path,
            inner: Mutex::new(WalInner {
                file,
                next_lsn: 1,
                end_offset: WAL_HEADER_SIZE as u64,
                synced_offset: WAL_HEADER_SIZE as u64,
            }),
        })
    }

    /// Open an existing log.
    ///
    /// A partially written final entry is cut off so new entries start on a
    /// clean boundary. A rewrite left behind by a crash is discarded; the log
    /// itself is only replaced once the rewrite is complete.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tmp = Self::rewrite_path(&path);
        if tmp.exists() {
            tracing::warn!(path = %tmp.display(), "removing unfinished paste log rewrite");
            fs::remove_file(&tmp)?;
        }

        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let scan = Self::scan(&mut file)?;
        let file_len = file.metadata()?.len();
        if scan.torn_tail || file_len > scan.valid_len {
            tracing::warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                file_len,
                "truncating torn tail of paste log"
            );
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path,
            inner: Mutex::new(WalInner {
                file,
                next_lsn: scan.max_lsn + 1,
                end_offset: scan.valid_len,
                synced_offset: scan.valid_len,
            }),
        })
    }

    fn header() -> BytesMut {
        let mut header = BytesMut::with_capacity(WAL_HEADER_SIZE);
        header.put_u32(WAL_MAGIC); // big-endian for magic
        header.put_u32_le(WAL_VERSION);
        header.put_u64_le(0); // reserved
        header
    }

    fn rewrite_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn scan(file: &mut File) -> Result<Scan> {
        let file_len = file.metadata()?.len();
        file.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(file);

        let mut header = [0u8; WAL_HEADER_SIZE];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::Corruption("Paste log header truncated".into()),
            _ => e.into(),
        })?;
        let magic = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if magic != WAL_MAGIC {
            return Err(Error::Corruption("Invalid paste log magic".to_string()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != WAL_VERSION {
            return Err(Error::Corruption(format!("Unsupported paste log version {}", version)));
        }

        let mut scan = Scan {
            frames: Vec::new(),
            valid_len: WAL_HEADER_SIZE as u64,
            max_lsn: 0,
            torn_tail: false,
        };

        loop {
            let mut rec_header = [0u8; RECORD_HEADER_SIZE];
            match reader.read_exact(&mut rec_header) {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    // End of log, or a torn header that open() trims by length
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            let mut lsn_bytes = [0u8; 8];
            lsn_bytes.copy_from_slice(&rec_header[0..8]);
            let lsn = u64::from_le_bytes(lsn_bytes);
            let len = u32::from_le_bytes([
                rec_header[8], rec_header[9], rec_header[10], rec_header[11],
            ]) as usize;

            // A frame running past the end of the file is an unfinished
            // append, whatever its length field says
            let frame_end = scan.valid_len + (RECORD_HEADER_SIZE + len + 4) as u64;
            if frame_end > file_len {
                scan.torn_tail = true;
                break;
            }

            if len > MAX_ENTRY_SIZE {
                return Err(Error::Corruption(format!(
                    "Paste log entry {} claims {} bytes",
                    lsn, len
                )));
            }

            let mut data = vec![0u8; len];
            let mut crc_bytes = [0u8; 4];
            let body = reader
                .read_exact(&mut data)
                .and_then(|_| reader.read_exact(&mut crc_bytes));
            match body {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    scan.torn_tail = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            }

            if crc32fast::hash(&data) != u32::from_le_bytes(crc_bytes) {
                return Err(Error::ChecksumMismatch);
            }

            scan.max_lsn = scan.max_lsn.max(lsn);
            scan.valid_len += (RECORD_HEADER_SIZE + len + 4) as u64;
            scan.frames.push((lsn, data));
        }

        Ok(scan)
    }

    /// Append one entry and flush it before returning.
    ///
    /// On failure the file is cut back to the previous entry boundary so a
    /// rejected write can never be replayed.
    pub fn commit(&self, entry: &LogEntry, sync: bool) -> Result<Lsn> {
        let data = Self::serialize(entry)?;

        let mut inner = self.inner.lock();
        let lsn = inner.next_lsn;

        let mut buf = BytesMut::with_capacity(RECORD_HEADER_SIZE + data.len() + 4);
        Self::put_frame(&mut buf, lsn, &data);

        let start = inner.end_offset;
        let written = Self::write_at(&mut inner.file, start, &buf, sync);
        if let Err(e) = written {
            if let Err(rollback) = inner.file.set_len(start) {
                tracing::error!(error = %rollback, "failed to roll back paste log after write error");
            }
            return Err(e);
        }

        inner.end_offset = start + buf.len() as u64;
        inner.next_lsn += 1;
        if sync {
            inner.synced_offset = inner.end_offset;
        }
        Ok(lsn)
    }

    fn serialize(entry: &LogEntry) -> Result<Vec<u8>> {
        let data = bincode::serialize(entry)
            .map_err(|e| Error::Internal(format!("Serialize error: {}", e)))?;
        if data.len() > MAX_ENTRY_SIZE {
            return Err(Error::InvalidArgument(format!(
                "log entry of {} bytes exceeds {} byte limit",
                data.len(),
                MAX_ENTRY_SIZE
            )));
        }
        Ok(data)
    }

    fn put_frame(buf: &mut BytesMut, lsn: Lsn, data: &[u8]) {
        buf.put_u64_le(lsn);
        buf.put_u32_le(data.len() as u32);
        buf.put_slice(data);
        buf.put_u32_le(crc32fast::hash(data));
    }

    /// fsync everything committed so far
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file.sync_all()?;
        inner.synced_offset = inner.end_offset;
        Ok(())
    }

    /// Replace the whole log with `entries`.
    ///
    /// The new log is written and fsynced beside the old one, then renamed
    /// over it, so a crash at any point leaves one complete log. LSNs keep
    /// counting up from the old log.
    pub fn rewrite(&self, entries: &[LogEntry]) -> Result<()> {
        let mut inner = self.inner.lock();
        let tmp = Self::rewrite_path(&self.path);

        let mut buf = Self::header();
        let mut lsn = inner.next_lsn;
        for entry in entries {
            let data = Self::serialize(entry)?;
            Self::put_frame(&mut buf, lsn, &data);
            lsn += 1;
        }

        let written = (|| -> Result<File> {
            let mut file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(&buf)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)?;
            Ok(file)
        })();

        let file = match written {
            Ok(file) => file,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&tmp) {
                    tracing::debug!(error = %cleanup, "no paste log rewrite to clean up");
                }
                return Err(e);
            }
        };

        if let Some(dir) = self.path.parent() {
            if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
                tracing::warn!(error = %e, "failed to sync paste log directory");
            }
        }

        inner.file = file;
        inner.next_lsn = lsn;
        inner.end_offset = buf.len() as u64;
        inner.synced_offset = inner.end_offset;
        Ok(())
    }

    fn write_at(file: &mut File, offset: u64, buf: &[u8], sync: bool) -> Result<()> {
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        if sync {
            file.sync_data()?;
        } else {
            file.flush()?;
        }
        Ok(())
    }

    /// Read every entry in LSN order
    pub fn read_all(&self) -> Result<Vec<(Lsn, LogEntry)>> {
        let mut inner = self.inner.lock();
        let scan = Self::scan(&mut inner.file)?;
        drop(inner);

        let mut entries = Vec::with_capacity(scan.frames.len());
        for (lsn, data) in scan.frames {
            let entry: LogEntry = bincode::deserialize(&data)
                .map_err(|e| Error::Corruption(format!("Deserialize error at lsn {}: {}", lsn, e)))?;
            entries.push((lsn, entry));
        }
        entries.sort_by_key(|(lsn, _)| *lsn);
        Ok(entries)
    }

    pub fn next_lsn(&self) -> Lsn {
        self.inner.lock().next_lsn
    }

    /// Bytes of committed log, header included
    pub fn size_bytes(&self) -> u64 {
        self.inner.lock().end_offset
    }

    /// Bytes known to be on stable storage
    pub fn synced_bytes(&self) -> u64 {
        self.inner.lock().synced_offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;
    use tempfile::TempDir;

    fn insert_entry(byte: u8) -> LogEntry {
        LogEntry::Insert(
            PasteRecord::new(
                PasteId::from_bytes(&[byte; 8]).unwrap(),
                format!("paste {}", byte),
                Some(60),
                Some(3),
                Timestamp::from_millis(1_000),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_wal_create_and_commit() {
        let tmp = TempDir::new().unwrap();
        let wal = Wal::create(tmp.path().join("pastes.wal")).unwrap();

        let lsn = wal.commit(&insert_entry(1), true).unwrap();
        assert_eq!(lsn, 1);
        assert_eq!(wal.next_lsn(), 2);

        let entries = wal.read_all().unwrap();
        assert_eq!(entries, vec![(1, insert_entry(1))]);
    }

    #[test]
    fn test_wal_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");

        {
            let wal = Wal::create(&path).unwrap();
            wal.commit(&insert_entry(1), true).unwrap();
            let id = PasteId::from_bytes(&[1; 8]).unwrap();
            wal.commit(&LogEntry::Views { id, current_views: 1 }, false).unwrap();
        }

        let wal = Wal::open(&path).unwrap();
        assert_eq!(wal.next_lsn(), 3);
        let entries = wal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[1].1, LogEntry::Views { current_views: 1, .. }));
    }

    #[test]
    fn test_wal_create_refuses_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");
        Wal::create(&path).unwrap();
        assert!(Wal::create(&path).is_err());
    }

    #[test]
    fn test_wal_torn_tail_is_truncated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");

        let good_len = {
            let wal = Wal::create(&path).unwrap();
            wal.commit(&insert_entry(1), true).unwrap();
            wal.commit(&insert_entry(2), true).unwrap();
            wal.size_bytes()
        };

        // Chop the last entry in half
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(good_len - 10).unwrap();
        drop(file);

        let wal = Wal::open(&path).unwrap();
        let entries = wal.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(wal.next_lsn(), 2);

        // New entries land after the surviving one
        wal.commit(&insert_entry(3), true).unwrap();
        drop(wal);
        let wal = Wal::open(&path).unwrap();
        let entries = wal.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], (2, insert_entry(3)));
    }

    #[test]
    fn test_wal_checksum_mismatch() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");
        {
            let wal = Wal::create(&path).unwrap();
            wal.commit(&insert_entry(1), true).unwrap();
        }

        // Flip a byte inside the entry body
        let mut bytes = std::fs::read(&path).unwrap();
        let idx = WAL_HEADER_SIZE + RECORD_HEADER_SIZE + 2;
        bytes[idx] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(Wal::open(&path), Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn test_wal_oversized_torn_frame_is_truncated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");
        let good_len = {
            let wal = Wal::create(&path).unwrap();
            wal.commit(&insert_entry(1), true).unwrap();
            wal.size_bytes()
        };

        // Garbage frame header claiming more than MAX_ENTRY_SIZE, cut short
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        let mut garbage = 9u64.to_le_bytes().to_vec();
        garbage.extend_from_slice(&u32::MAX.to_le_bytes());
        garbage.extend_from_slice(&[0xee; 20]);
        file.write_all(&garbage).unwrap();
        drop(file);

        let wal = Wal::open(&path).unwrap();
        assert_eq!(wal.size_bytes(), good_len);
        assert_eq!(wal.read_all().unwrap().len(), 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);
    }

    #[test]
    fn test_wal_sync_tracks_durable_offset() {
        let tmp = TempDir::new().unwrap();
        let wal = Wal::create(tmp.path().join("pastes.wal")).unwrap();

        wal.commit(&insert_entry(1), false).unwrap();
        assert!(wal.synced_bytes() < wal.size_bytes());

        wal.sync().unwrap();
        assert_eq!(wal.synced_bytes(), wal.size_bytes());

        wal.commit(&insert_entry(2), true).unwrap();
        assert_eq!(wal.synced_bytes(), wal.size_bytes());
    }

    #[test]
    fn test_wal_rewrite_replaces_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");
        let id = PasteId::from_bytes(&[1; 8]).unwrap();

        let wal = Wal::create(&path).unwrap();
        wal.commit(&insert_entry(1), true).unwrap();
        for views in 1..=50 {
            wal.commit(&LogEntry::Views { id: id.clone(), current_views: views }, false)
                .unwrap();
        }
        let before = wal.size_bytes();

        wal.rewrite(&[insert_entry(1)]).unwrap();
        assert!(wal.size_bytes() < before);
        assert_eq!(wal.next_lsn(), 53);
        assert!(!Wal::rewrite_path(&path).exists());

        // Appends continue on the rewritten file
        wal.commit(&insert_entry(2), true).unwrap();
        drop(wal);

        let wal = Wal::open(&path).unwrap();
        let entries = wal.read_all().unwrap();
        assert_eq!(entries, vec![(52, insert_entry(1)), (53, insert_entry(2))]);
    }

    #[test]
    fn test_wal_open_discards_unfinished_rewrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");
        {
            let wal = Wal::create(&path).unwrap();
            wal.commit(&insert_entry(1), true).unwrap();
        }
        std::fs::write(Wal::rewrite_path(&path), b"partial").unwrap();

        let wal = Wal::open(&path).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 1);
        assert!(!Wal::rewrite_path(&path).exists());
    }

    #[test]
    fn test_wal_bad_magic() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pastes.wal");
        std::fs::write(&path, [0u8; WAL_HEADER_SIZE]).unwrap();
        assert!(matches!(Wal::open(&path), Err(Error::Corruption(_))));
    }
}
