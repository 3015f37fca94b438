//! Edit record wire codec.
//!
//! A record is a fixed header of four native `c_int` fields in host byte
//! order (`op_code`, `line`, `column`, `payload_length`) followed by exactly
//! `payload_length` payload bytes.

use crate::channel::{ChannelReader, ChannelSource};
use crate::constants::{DEFAULT_MAX_PAYLOAD_LEN, HEADER_FIELD_LEN, HEADER_LEN};
use crate::error::MirrorError;
use std::os::raw::c_int;

/// Position of an edit in the content as it was before the edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub line: usize,
    pub column: usize,
}

/// Kind of edit carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Insert,
    Delete,
}

impl EditOp {
    /// Interpret a wire `op_code`: zero inserts, anything else deletes.
    pub fn from_code(op_code: c_int) -> Self {
        if op_code == 0 {
            EditOp::Insert
        } else {
            EditOp::Delete
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EditOp::Insert => "insert",
            EditOp::Delete => "delete",
        }
    }
}

/// One decoded edit.
///
/// For deletes the payload is only a length carrier; its bytes are never
/// used as content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    pub op_code: c_int,
    pub target: Target,
    pub payload: Vec<u8>,
}

impl EditRecord {
    /// Insert `payload` at `(line, column)`.
    pub fn insert(line: usize, column: usize, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            op_code: 0,
            target: Target { line, column },
            payload: payload.into(),
        }
    }

    /// Delete `len` bytes starting at `(line, column)`.
    pub fn delete(line: usize, column: usize, len: usize) -> Self {
        Self {
            op_code: 1,
            target: Target { line, column },
            payload: vec![0; len],
        }
    }

    pub fn op(&self) -> EditOp {
        EditOp::from_code(self.op_code)
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Serialize to the exact wire layout.
    ///
    /// # Errors
    /// Returns [`MirrorError::MalformedRecord`] when a field does not fit in a
    /// `c_int`.
    pub fn encode(&self) -> Result<Vec<u8>, MirrorError> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.op_code.to_ne_bytes());
        for (name, value) in [
            ("line", self.target.line),
            ("column", self.target.column),
            ("payload_length", self.payload.len()),
        ] {
            let field = c_int::try_from(value).map_err(|_| {
                MirrorError::MalformedRecord(format!("{} {} does not fit the wire", name, value))
            })?;
            out.extend_from_slice(&field.to_ne_bytes());
        }
        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}

/// Decoded fixed-size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub op_code: c_int,
    pub target: Target,
    pub payload_len: usize,
}

impl RecordHeader {
    /// Parse a header from exactly [`HEADER_LEN`] bytes.
    ///
    /// # Errors
    /// Returns [`MirrorError::MalformedRecord`] for a wrong length or negative
    /// line, column or payload length.
    pub fn parse(bytes: &[u8]) -> Result<Self, MirrorError> {
        if bytes.len() != HEADER_LEN {
            return Err(MirrorError::MalformedRecord(format!(
                "header is {} bytes, expected {}",
                bytes.len(),
                HEADER_LEN
            )));
        }
        let mut fields = [0 as c_int; 4];
        for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(HEADER_FIELD_LEN)) {
            let raw = <[u8; HEADER_FIELD_LEN]>::try_from(chunk).map_err(|_| {
                MirrorError::MalformedRecord("header field has the wrong width".to_string())
            })?;
            *field = c_int::from_ne_bytes(raw);
        }
        let [op_code, line, column, payload_len] = fields;
        Ok(Self {
            op_code,
            target: Target {
                line: non_negative("line", line)?,
                column: non_negative("column", column)?,
            },
            payload_len: non_negative("payload_length", payload_len)?,
        })
    }
}

fn non_negative(name: &str, value: c_int) -> Result<usize, MirrorError> {
    usize::try_from(value)
        .map_err(|_| MirrorError::MalformedRecord(format!("negative {} field: {}", name, value)))
}

fn truncated(part: &str, expected: usize, received: usize) -> MirrorError {
    let detail = format!("truncated {}: {} of {} bytes", part, received, expected);
    MirrorError::MalformedRecord(detail)
}

/// Reads complete records from a channel.
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder {
    max_payload_len: usize,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_LEN)
    }
}

impl RecordDecoder {
    /// Create a decoder rejecting payloads longer than `max_payload_len`.
    pub fn new(max_payload_len: usize) -> Self {
        Self { max_payload_len }
    }

    pub fn max_payload_len(&self) -> usize {
        self.max_payload_len
    }

    /// Block until one full record has been read.
    ///
    /// Delete payloads are consumed and kept only for their length, which
    /// keeps the reader aligned with the writer's framing.
    ///
    /// # Errors
    /// - [`MirrorError::ChannelClosed`] if the channel closes before the first
    ///   header byte.
    /// - [`MirrorError::MalformedRecord`] if it closes mid-record, or the
    ///   header is invalid or announces an oversized payload.
    pub fn decode<S: ChannelSource>(
        &self,
        reader: &mut ChannelReader<S>,
    ) -> Result<EditRecord, MirrorError> {
        let header = reader.read_exact(HEADER_LEN).map_err(|err| match err {
            MirrorError::ChannelClosed { expected, received } if received > 0 => {
                truncated("header", expected, received)
            }
            other => other,
        })?;
        let header = RecordHeader::parse(&header)?;
        if header.payload_len > self.max_payload_len {
            return Err(MirrorError::MalformedRecord(format!(
                "payload of {} bytes exceeds the {} byte limit",
                header.payload_len, self.max_payload_len
            )));
        }
        let payload = reader.read_exact(header.payload_len).map_err(|err| match err {
            MirrorError::ChannelClosed { expected, received } => {
                truncated("payload", expected, received)
            }
            other => other,
        })?;
        Ok(EditRecord {
            op_code: header.op_code,
            target: header.target,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Backoff, MemoryChannel};
    use std::time::Duration;

    fn reader_over(bytes: &[u8]) -> ChannelReader<MemoryChannel> {
        ChannelReader::new(
            MemoryChannel::closed_with(bytes),
            Backoff::new(Duration::from_millis(1), Duration::from_millis(2)),
        )
    }

    fn header(op_code: c_int, line: c_int, column: c_int, len: c_int) -> Vec<u8> {
        [op_code, line, column, len]
            .iter()
            .flat_map(|field| field.to_ne_bytes())
            .collect()
    }

    #[test]
    fn decodes_insert_with_payload() {
        let mut bytes = header(0, 2, 7, 5);
        bytes.extend_from_slice(b"hello");
        let record = RecordDecoder::default()
            .decode(&mut reader_over(&bytes))
            .expect("decode");
        assert_eq!(record.op(), EditOp::Insert);
        assert_eq!(record.target, Target { line: 2, column: 7 });
        assert_eq!(record.payload, b"hello".to_vec());
    }

    #[test]
    fn any_nonzero_op_code_is_a_delete() {
        for op_code in [1, 2, -1] {
            assert_eq!(EditOp::from_code(op_code), EditOp::Delete);
        }
        let mut bytes = header(7, 0, 0, 3);
        bytes.extend_from_slice(b"zzz");
        let record = RecordDecoder::default()
            .decode(&mut reader_over(&bytes))
            .expect("decode");
        assert_eq!(record.op(), EditOp::Delete);
        assert_eq!(record.payload_len(), 3);
    }

    #[test]
    fn consecutive_records_stay_framed() {
        let mut bytes = EditRecord::delete(0, 1, 2).encode().expect("encode");
        bytes.extend(EditRecord::insert(1, 0, "x").encode().expect("encode"));
        let decoder = RecordDecoder::default();
        let mut reader = reader_over(&bytes);
        assert_eq!(
            decoder.decode(&mut reader).expect("first"),
            EditRecord::delete(0, 1, 2)
        );
        assert_eq!(
            decoder.decode(&mut reader).expect("second"),
            EditRecord::insert(1, 0, "x")
        );
        let end = decoder.decode(&mut reader).expect_err("end");
        assert!(end.is_clean_close());
    }

    #[test]
    fn encoded_header_uses_native_int_layout() {
        let bytes = EditRecord::insert(3, 4, "ab").encode().expect("encode");
        assert_eq!(bytes.len(), HEADER_LEN + 2);
        assert_eq!(&bytes[..HEADER_LEN], header(0, 3, 4, 2).as_slice());
        assert_eq!(&bytes[HEADER_LEN..], b"ab");
    }

    #[test]
    fn truncated_header_is_malformed() {
        let bytes = header(0, 0, 0, 1);
        let err = RecordDecoder::default()
            .decode(&mut reader_over(&bytes[..HEADER_LEN - 3]))
            .expect_err("truncated");
        assert!(matches!(err, MirrorError::MalformedRecord(_)), "{}", err);
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut bytes = header(0, 0, 0, 10);
        bytes.extend_from_slice(b"four");
        let err = RecordDecoder::default()
            .decode(&mut reader_over(&bytes))
            .expect_err("truncated");
        assert!(matches!(err, MirrorError::MalformedRecord(_)), "{}", err);
    }

    #[test]
    fn negative_fields_are_malformed() {
        let err = RecordHeader::parse(&header(0, -1, 0, 0)).expect_err("negative line");
        assert!(err.to_string().contains("negative line"));
        let err = RecordHeader::parse(&header(0, 0, 0, -4)).expect_err("negative length");
        assert!(err.to_string().contains("payload_length"));
    }

    #[test]
    fn oversized_payload_is_rejected_before_reading() {
        let bytes = header(0, 0, 0, 1024);
        let err = RecordDecoder::new(16)
            .decode(&mut reader_over(&bytes))
            .expect_err("too large");
        assert!(err.to_string().contains("exceeds"));
    }
}
