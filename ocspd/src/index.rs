//! Durable revocation-status store backed by an OpenSSL-style CA revocation log
//!
//! The log is an append-only flat file maintained by an external issuance tool. Each line carries
//! six tab-separated fields: status flag (V, R or E), expiration time, revocation time (empty
//! unless revoked), serial number in hex, file location (or "unknown") and distinguished name.
//! The store keeps a fully parsed snapshot of the log in memory, keyed by canonical hex serial,
//! and rebuilds the snapshot whenever the file's modification time advances.

use std::collections::BTreeMap;
use std::fs;
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use der::DateTime;
use log::{debug, error, info};

use crate::error::{Error, Result};
use crate::util::buffer_to_hex;

/// Status flags used in the first column of the revocation log.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndexStatus {
    /// Certificate was issued and has not been revoked
    Valid,
    /// Certificate has been revoked
    Revoked,
    /// Certificate reached its expiration date
    Expired,
}

/// One row of revocation knowledge as read from the revocation log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IndexEntry {
    /// Current status of the certificate
    pub status: IndexStatus,
    /// Canonical upper case hex form of the certificate serial number
    pub serial_hex: String,
    /// Expiration time recorded by the CA tool
    pub expires_at: DateTime,
    /// Revocation time, present only for revoked certificates
    pub revoked_at: Option<DateTime>,
    /// File location recorded by the CA tool, or "unknown"
    pub location: String,
    /// Distinguished name associated with the certificate
    pub distinguished_name: String,
}

/// Fully parsed view of the revocation log as of a given file modification time.
///
/// Snapshots are immutable once published. A reload builds a complete replacement off to the
/// side and swaps it in, so concurrent lookups never observe a half-built mapping.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    entries: BTreeMap<String, IndexEntry>,
    loaded_mod_time: Option<SystemTime>,
}

impl IndexSnapshot {
    /// Returns the entry for the indicated canonical hex serial, if present.
    pub fn get(&self, serial_hex: &str) -> Option<&IndexEntry> {
        self.entries.get(serial_hex)
    }

    /// Returns the number of serials tracked by this snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if this snapshot tracks no serials.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the modification time of the log file this snapshot was parsed from, or None for
    /// the initial empty snapshot.
    pub fn loaded_mod_time(&self) -> Option<SystemTime> {
        self.loaded_mod_time
    }
}

/// CertIndex answers serial number queries against the revocation log, transparently reloading
/// its in-memory snapshot when the backing file changes.
pub struct CertIndex {
    index_file: String,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    reload_lock: Mutex<()>,
}

impl CertIndex {
    /// Instantiates a new CertIndex over the indicated revocation log file and attempts an
    /// initial load. A failed initial load is not fatal; the index starts empty and retries on
    /// the next lookup.
    pub fn new(index_file: &str) -> Self {
        let index = CertIndex {
            index_file: index_file.to_string(),
            snapshot: RwLock::new(Arc::new(IndexSnapshot::default())),
            reload_lock: Mutex::new(()),
        };
        if let Err(e) = index.reload() {
            error!(
                "Failed to load revocation log from {} with {}",
                index_file, e
            );
        }
        index
    }

    /// Returns the currently published snapshot.
    pub fn current(&self) -> Arc<IndexSnapshot> {
        if let Ok(guard) = self.snapshot.read() {
            guard.clone()
        } else {
            Arc::new(IndexSnapshot::default())
        }
    }

    /// `reload` re-reads the revocation log if its modification time differs from the last
    /// successful load, publishing a brand-new snapshot via an atomic swap. If any line of the
    /// log cannot be parsed the reload is aborted and the prior snapshot stays in service.
    /// Concurrent reload attempts are serialized; lookups proceed against the still-published
    /// snapshot while a rebuild is underway.
    pub fn reload(&self) -> Result<()> {
        let mod_time = fs::metadata(&self.index_file)?.modified()?;
        if self.current().loaded_mod_time == Some(mod_time) {
            return Ok(());
        }

        let _reload_guard = if let Ok(g) = self.reload_lock.lock() {
            g
        } else {
            return Err(Error::Unrecognized);
        };

        // another reload may have completed while waiting on the lock
        if self.current().loaded_mod_time == Some(mod_time) {
            return Ok(());
        }

        info!("Revocation log has changed. Updating");

        // read the whole file in one pass so a concurrent append cannot be observed mid-line
        let content = fs::read_to_string(&self.index_file)?;
        let entries = parse_index(&content)?;
        debug!("Loaded {} serials from revocation log", entries.len());

        let snapshot = Arc::new(IndexSnapshot {
            entries,
            loaded_mod_time: Some(mod_time),
        });
        if let Ok(mut current) = self.snapshot.write() {
            *current = snapshot;
            Ok(())
        } else {
            Err(Error::Unrecognized)
        }
    }

    /// `lookup` refreshes the index if the backing file changed and then searches for the given
    /// big-endian serial number. A failed reload is logged and the last known-good snapshot is
    /// consulted instead. An absent serial returns None; that is a legitimate classification
    /// outcome for the caller, not an error.
    pub fn lookup(&self, serial: &[u8]) -> Option<IndexEntry> {
        debug!("Looking for serial 0x{}", buffer_to_hex(serial));
        if let Err(e) = self.reload() {
            error!(
                "Failed to reload revocation log from {} with {}. Serving prior snapshot",
                self.index_file, e
            );
        }
        let key = canonical_serial_from_bytes(serial);
        self.current().get(&key).cloned()
    }
}

/// `canonical_serial_from_bytes` forms the canonical map key for a big-endian serial number:
/// upper case hex with leading zeros dropped (the serial zero maps to "0").
pub fn canonical_serial_from_bytes(serial: &[u8]) -> String {
    canonicalize_hex(&buffer_to_hex(serial))
}

/// `canonical_serial_from_hex` validates the hex serial column of the revocation log and returns
/// its canonical form. Two textually different spellings of the same serial (case, leading
/// zeros) canonicalize to the same key.
pub fn canonical_serial_from_hex(serial: &str) -> Result<String> {
    if serial.is_empty() || !serial.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::IndexFormatError);
    }
    Ok(canonicalize_hex(serial))
}

fn canonicalize_hex(hex: &str) -> String {
    let trimmed = hex.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_ascii_uppercase()
    }
}

/// `parse_index_time` parses the YYMMDDHHMMSSZ timestamps used in the revocation log. Two digit
/// years below 50 fall in the 2000s, matching the UTCTime convention of RFC 5280.
pub fn parse_index_time(s: &str) -> Result<DateTime> {
    let bytes = s.as_bytes();
    if bytes.len() != 13 || bytes[12] != b'Z' || !bytes[..12].iter().all(u8::is_ascii_digit) {
        return Err(Error::IndexFormatError);
    }
    let num = |i: usize| (bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0');
    let yy = num(0) as u16;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    match DateTime::new(year, num(2), num(4), num(6), num(8), num(10)) {
        Ok(dt) => Ok(dt),
        Err(_e) => Err(Error::IndexFormatError),
    }
}

/// `parse_index` parses the complete content of a revocation log into a serial-keyed map. When
/// the same serial appears on multiple lines the last line wins, modeling the most recent status
/// change. Any malformed line aborts the parse; partially built mappings are never returned.
fn parse_index(content: &str) -> Result<BTreeMap<String, IndexEntry>> {
    let mut entries = BTreeMap::new();
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 6 {
            error!(
                "Rejected revocation log line with {} fields instead of 6",
                fields.len()
            );
            return Err(Error::IndexFormatError);
        }
        let status = match fields[0] {
            "V" => IndexStatus::Valid,
            "R" => IndexStatus::Revoked,
            "E" => IndexStatus::Expired,
            other => {
                error!("Rejected revocation log line with status flag {:?}", other);
                return Err(Error::IndexFormatError);
            }
        };
        let expires_at = parse_index_time(fields[1])?;
        let revoked_at = match status {
            IndexStatus::Revoked => Some(parse_index_time(fields[2])?),
            _ => None,
        };
        let serial_hex = canonical_serial_from_hex(fields[3])?;
        let entry = IndexEntry {
            status,
            serial_hex: serial_hex.clone(),
            expires_at,
            revoked_at,
            location: fields[4].to_string(),
            distinguished_name: fields[5].to_string(),
        };
        entries.insert(serial_hex, entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::thread::sleep;
    use std::time::Duration;

    fn write_index(dir: &tempfile::TempDir, content: &str) -> String {
        let path = dir.path().join("index.txt");
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    fn append_index(path: &str, content: &str) {
        // leave a gap so the file modification time is guaranteed to advance
        sleep(Duration::from_millis(20));
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn canonical_serial_forms() {
        assert_eq!("1A2", canonical_serial_from_hex("01a2").unwrap());
        assert_eq!("1A2", canonical_serial_from_hex("0001A2").unwrap());
        assert_eq!("1A2", canonical_serial_from_bytes(&[0x01, 0xA2]));
        assert_eq!("1A2", canonical_serial_from_bytes(&[0x00, 0x01, 0xA2]));
        assert_eq!("0", canonical_serial_from_hex("00").unwrap());
        assert_eq!("0", canonical_serial_from_bytes(&[0x00]));
        assert!(canonical_serial_from_hex("").is_err());
        assert!(canonical_serial_from_hex("xyz").is_err());
    }

    #[test]
    fn index_time_parsing() {
        let dt = parse_index_time("250601000000Z").unwrap();
        assert_eq!(2025, dt.year());
        let dt = parse_index_time("990601120000Z").unwrap();
        assert_eq!(1999, dt.year());
        assert!(parse_index_time("25060100000Z").is_err());
        assert!(parse_index_time("250601000000").is_err());
        assert!(parse_index_time("25June1000000").is_err());
        assert!(parse_index_time("251301000000Z").is_err());
    }

    #[test]
    fn lookup_valid_serial() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(&dir, "V\t260101000000Z\t\t01A2\t/path\tclient\n");
        let index = CertIndex::new(&path);
        let entry = index.lookup(&[0x01, 0xA2]).unwrap();
        assert_eq!(IndexStatus::Valid, entry.status);
        assert_eq!("1A2", entry.serial_hex);
        assert_eq!(None, entry.revoked_at);
        assert_eq!("/path", entry.location);
        assert_eq!("client", entry.distinguished_name);
    }

    #[test]
    fn revocation_line_wins_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(&dir, "V\t260101000000Z\t\t01A2\t/path\tclient\n");
        let index = CertIndex::new(&path);
        assert_eq!(
            IndexStatus::Valid,
            index.lookup(&[0x01, 0xA2]).unwrap().status
        );

        append_index(&path, "R\t260101000000Z\t250601000000Z\t01A2\t/path\tclient\n");
        let entry = index.lookup(&[0x01, 0xA2]).unwrap();
        assert_eq!(IndexStatus::Revoked, entry.status);
        assert_eq!(
            parse_index_time("250601000000Z").unwrap(),
            entry.revoked_at.unwrap()
        );
    }

    #[test]
    fn unchanged_mod_time_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(&dir, "V\t260101000000Z\t\t2F\t/path\tclient\n");
        let index = CertIndex::new(&path);
        let before = index.current();
        index.reload().unwrap();
        assert!(Arc::ptr_eq(&before, &index.current()));
        let _ = index.lookup(&[0x2F]);
        assert!(Arc::ptr_eq(&before, &index.current()));
    }

    #[test]
    fn malformed_line_aborts_reload_and_prior_snapshot_serves() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(&dir, "V\t260101000000Z\t\t01A2\t/path\tclient\n");
        let index = CertIndex::new(&path);
        assert!(index.lookup(&[0x01, 0xA2]).is_some());
        let before = index.current();

        append_index(&path, "R\t260101000000Z\t250601000000Z\t01A2\n");
        assert_eq!(Some(Error::IndexFormatError), index.reload().err());

        // the prior snapshot remains in service and the serial still answers as valid
        assert!(Arc::ptr_eq(&before, &index.current()));
        let entry = index.lookup(&[0x01, 0xA2]).unwrap();
        assert_eq!(IndexStatus::Valid, entry.status);
    }

    #[test]
    fn revoked_line_requires_revocation_time() {
        assert_eq!(
            Some(Error::IndexFormatError),
            parse_index("R\t260101000000Z\t\t01A2\t/path\tclient\n")
                .err()
        );
    }

    #[test]
    fn unknown_status_flag_rejected() {
        assert_eq!(
            Some(Error::IndexFormatError),
            parse_index("X\t260101000000Z\t\t01A2\t/path\tclient\n").err()
        );
    }

    #[test]
    fn duplicate_serial_spellings_collapse() {
        let entries =
            parse_index("V\t260101000000Z\t\t01a2\t/path\tclient\nR\t260101000000Z\t250601000000Z\t1A2\t/path\tclient\n")
                .unwrap();
        assert_eq!(1, entries.len());
        assert_eq!(IndexStatus::Revoked, entries["1A2"].status);
    }

    #[test]
    fn missing_file_lookup_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        let index = CertIndex::new(path.to_str().unwrap());
        assert!(index.lookup(&[0x01]).is_none());
    }
}
