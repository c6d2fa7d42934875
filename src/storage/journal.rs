//! Append-only change journal
//!
//! Record format:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, includes this field and the checksum)
//! +------------------+
//! | Entity Kind      | (u8: 0 = book, 1 = transaction, 2 = user)
//! +------------------+
//! | Change Op        | (u8: 0 = put, 1 = delete)
//! +------------------+
//! | Entity ID        | (length-prefixed string)
//! +------------------+
//! | Payload          | (length-prefixed bytes, empty for deletes)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over all preceding bytes)
//! +------------------+
//! ```
//!
//! Appends are flushed and synced before returning. Replay verifies
//! every checksum; a torn record at the tail (crash mid-append) is
//! dropped silently, a bad record before the tail stops the boot.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Mutex;

use super::errors::{JournalError, JournalResult};

/// Which store a change record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Book,
    Transaction,
    User,
}

impl EntityKind {
    fn as_byte(self) -> u8 {
        match self {
            EntityKind::Book => 0,
            EntityKind::Transaction => 1,
            EntityKind::User => 2,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(EntityKind::Book),
            1 => Some(EntityKind::Transaction),
            2 => Some(EntityKind::User),
            _ => None,
        }
    }
}

/// Whether a record writes or removes an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Put,
    Delete,
}

impl ChangeOp {
    fn as_byte(self) -> u8 {
        match self {
            ChangeOp::Put => 0,
            ChangeOp::Delete => 1,
        }
    }

    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(ChangeOp::Put),
            1 => Some(ChangeOp::Delete),
            _ => None,
        }
    }
}

/// A single journal entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub entity: EntityKind,
    pub op: ChangeOp,
    /// Entity primary key, stringified
    pub entity_id: String,
    /// Serialized entity body (empty for deletes)
    pub payload: Vec<u8>,
}

impl ChangeRecord {
    /// Record an entity write (create or update)
    pub fn put(entity: EntityKind, entity_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            entity,
            op: ChangeOp::Put,
            entity_id: entity_id.into(),
            payload,
        }
    }

    /// Record an entity removal
    pub fn delete(entity: EntityKind, entity_id: impl Into<String>) -> Self {
        Self {
            entity,
            op: ChangeOp::Delete,
            entity_id: entity_id.into(),
            payload: Vec::new(),
        }
    }

    /// Serialize the complete record, checksum included
    pub fn serialize(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(10 + self.entity_id.len() + self.payload.len());
        body.push(self.entity.as_byte());
        body.push(self.op.as_byte());
        body.extend_from_slice(&(self.entity_id.len() as u32).to_le_bytes());
        body.extend_from_slice(self.entity_id.as_bytes());
        body.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        body.extend_from_slice(&self.payload);

        // length field + body + checksum field
        let record_length = (4 + body.len() + 4) as u32;

        let mut checksum_data = Vec::with_capacity(4 + body.len());
        checksum_data.extend_from_slice(&record_length.to_le_bytes());
        checksum_data.extend_from_slice(&body);
        let checksum = crc32fast::hash(&checksum_data);

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);
        record.extend_from_slice(&checksum.to_le_bytes());
        record
    }

    /// Deserialize one record from `data`, verifying its checksum.
    ///
    /// Returns the record and the number of bytes consumed. An
    /// `UnexpectedEof` error kind means the buffer ends mid-record.
    fn deserialize(data: &[u8]) -> std::io::Result<(Self, usize)> {
        use std::io::{Error, ErrorKind};

        // length + kind + op + two empty length prefixes + checksum
        const MIN_RECORD_SIZE: usize = 4 + 1 + 1 + 4 + 4 + 4;

        if data.len() < MIN_RECORD_SIZE {
            return Err(Error::new(ErrorKind::UnexpectedEof, "record too short"));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_length < MIN_RECORD_SIZE {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("invalid record length: {}", record_length),
            ));
        }
        if data.len() < record_length {
            return Err(Error::new(ErrorKind::UnexpectedEof, "record truncated"));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = crc32fast::hash(&data[0..checksum_offset]);
        if computed_checksum != stored_checksum {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = std::io::Cursor::new(&data[4..checksum_offset]);

        let mut kind_op = [0u8; 2];
        cursor.read_exact(&mut kind_op)?;
        let entity = EntityKind::from_byte(kind_op[0])
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "unknown entity kind"))?;
        let op = ChangeOp::from_byte(kind_op[1])
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "unknown change op"))?;

        let mut len_buf = [0u8; 4];
        cursor.read_exact(&mut len_buf)?;
        let mut id_buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        cursor.read_exact(&mut id_buf)?;
        let entity_id = String::from_utf8(id_buf)
            .map_err(|e| Error::new(ErrorKind::InvalidData, format!("invalid UTF-8: {}", e)))?;

        cursor.read_exact(&mut len_buf)?;
        let mut payload = vec![0u8; u32::from_le_bytes(len_buf) as usize];
        cursor.read_exact(&mut payload)?;

        Ok((
            Self {
                entity,
                op,
                entity_id,
                payload,
            },
            record_length,
        ))
    }
}

/// Append-only journal file
pub struct Journal {
    file: Mutex<File>,
}

impl Journal {
    /// Open (or create) the journal file for appending
    pub fn open(path: &Path) -> JournalResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one record and sync it to disk
    pub fn append(&self, record: &ChangeRecord) -> JournalResult<()> {
        let bytes = record.serialize();
        let mut file = self
            .file
            .lock()
            .map_err(|_| JournalError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "journal lock poisoned",
            )))?;
        file.write_all(&bytes)?;
        file.sync_data()?;
        Ok(())
    }

    /// Read every record from the journal file at `path`.
    ///
    /// A record that runs past the end of the file, or a bad-checksum
    /// record that is the file's last, is treated as a torn append and
    /// dropped. Any other framing or checksum failure is corruption.
    pub fn replay(path: &Path) -> JournalResult<Vec<ChangeRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;

        let mut records = Vec::new();
        let mut offset = 0usize;

        while offset < data.len() {
            match ChangeRecord::deserialize(&data[offset..]) {
                Ok((record, consumed)) => {
                    records.push(record);
                    offset += consumed;
                }
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // Torn tail from a crash mid-append
                    break;
                }
                Err(e) => {
                    // A bad record that reaches EOF is also a torn tail
                    let record_length = if data.len() - offset >= 4 {
                        u32::from_le_bytes([
                            data[offset],
                            data[offset + 1],
                            data[offset + 2],
                            data[offset + 3],
                        ]) as usize
                    } else {
                        0
                    };
                    if record_length > 0 && offset + record_length == data.len() {
                        break;
                    }
                    return Err(JournalError::corruption(offset as u64, e.to_string()));
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ChangeRecord {
        ChangeRecord::put(
            EntityKind::Book,
            "b-1",
            b"{\"name\":\"Book 1\"}".to_vec(),
        )
    }

    #[test]
    fn test_record_roundtrip() {
        let record = sample_record();
        let bytes = record.serialize();
        let (decoded, consumed) = ChangeRecord::deserialize(&bytes).unwrap();

        assert_eq!(record, decoded);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_delete_record_has_empty_payload() {
        let record = ChangeRecord::delete(EntityKind::Transaction, "t-1");
        let bytes = record.serialize();
        let (decoded, _) = ChangeRecord::deserialize(&bytes).unwrap();

        assert_eq!(decoded.op, ChangeOp::Delete);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut bytes = sample_record().serialize();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;

        let result = ChangeRecord::deserialize(&bytes);
        assert!(result.is_err());
    }

    #[test]
    fn test_append_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.journal");

        let journal = Journal::open(&path).unwrap();
        journal.append(&sample_record()).unwrap();
        journal
            .append(&ChangeRecord::delete(EntityKind::Book, "b-1"))
            .unwrap();
        drop(journal);

        let records = Journal::replay(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].op, ChangeOp::Put);
        assert_eq!(records[1].op, ChangeOp::Delete);
        assert_eq!(records[1].entity_id, "b-1");
    }

    #[test]
    fn test_replay_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = Journal::replay(&dir.path().join("absent.journal")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_replay_tolerates_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.journal");

        let journal = Journal::open(&path).unwrap();
        journal.append(&sample_record()).unwrap();
        drop(journal);

        // Simulate a crash mid-append: a second record cut short
        let mut tail = ChangeRecord::put(EntityKind::User, "u-1", b"{}".to_vec()).serialize();
        tail.truncate(tail.len() / 2);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&tail).unwrap();
        drop(file);

        let records = Journal::replay(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity_id, "b-1");
    }

    #[test]
    fn test_replay_rejects_mid_file_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("changes.journal");

        let first = sample_record().serialize();
        let second = ChangeRecord::put(EntityKind::User, "u-1", b"{}".to_vec()).serialize();

        let mut bytes = first.clone();
        bytes.extend_from_slice(&second);
        // Flip a byte inside the FIRST record so the failure is not at the tail
        bytes[first.len() / 2] ^= 0xFF;

        std::fs::write(&path, &bytes).unwrap();

        let result = Journal::replay(&path);
        assert!(matches!(result, Err(JournalError::Corruption { .. })));
    }
}
