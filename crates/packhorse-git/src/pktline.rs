//! Git pkt-line framing.
//!
//! Smart HTTP traffic is framed as pkt-lines: each line carries a
//! 4-character hex length prefix, with "0000" acting as a flush. This
//! module backs the service announcement written ahead of ref
//! advertisements and the shallow-clone scan of upload-pack bodies.

use crate::{GitError, Result};
use std::io::Read;

/// A pkt-line packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// Data line with content.
    Data(Vec<u8>),
    /// Flush packet (0000).
    Flush,
    /// Delimiter packet (0001).
    Delimiter,
    /// Response-end packet (0002).
    ResponseEnd,
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Creates a data packet from bytes.
    pub fn from_bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Data(b.into())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Data(data) => {
                let len = data.len() + 4; // 4 bytes for the length prefix
                let mut result = format!("{:04x}", len).into_bytes();
                result.extend_from_slice(data);
                result
            }
            Self::Flush => b"0000".to_vec(),
            Self::Delimiter => b"0001".to_vec(),
            Self::ResponseEnd => b"0002".to_vec(),
        }
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns the data content, or None for special packets.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }
}

/// Reader for pkt-line format.
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len_str = std::str::from_utf8(&len_buf)
            .map_err(|_| GitError::InvalidPktLine("invalid length prefix".to_string()))?;

        match len_str {
            "0000" => Ok(Some(PktLine::Flush)),
            "0001" => Ok(Some(PktLine::Delimiter)),
            "0002" => Ok(Some(PktLine::ResponseEnd)),
            _ => {
                let len = u16::from_str_radix(len_str, 16)
                    .map_err(|_| GitError::InvalidPktLine("invalid length".to_string()))?
                    as usize;

                if len < 4 {
                    return Err(GitError::InvalidPktLine("length too small".to_string()));
                }

                let data_len = len - 4;
                let mut data = vec![0u8; data_len];
                self.reader.read_exact(&mut data)?;

                Ok(Some(PktLine::Data(data)))
            }
        }
    }
}

/// Scans a buffered request body prefix for a shallow-clone `deepen` line.
///
/// Walks packets from the start of `prefix`, skipping flush and delimiter
/// packets, until a data packet whose payload starts with `deepen` is
/// found. The scan is best effort: malformed or truncated input ends it
/// with a negative answer.
pub fn scan_deepen(prefix: &[u8]) -> bool {
    let mut reader = PktLineReader::new(std::io::Cursor::new(prefix));
    loop {
        match reader.read() {
            Ok(Some(pkt)) => {
                if pkt.data().is_some_and(|d| d.starts_with(b"deepen")) {
                    return true;
                }
            }
            Ok(None) | Err(_) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_pktline_encode() {
        assert_eq!(PktLine::from_string("hello\n").encode(), b"000ahello\n");
        assert_eq!(PktLine::Flush.encode(), b"0000");
        assert_eq!(PktLine::Delimiter.encode(), b"0001");
    }

    #[test]
    fn test_pktline_roundtrip() {
        let packets = vec![
            PktLine::from_string("hello\n"),
            PktLine::from_string("world\n"),
            PktLine::Flush,
        ];

        let mut buf = Vec::new();
        for pkt in &packets {
            buf.extend_from_slice(&pkt.encode());
        }

        let mut reader = PktLineReader::new(Cursor::new(buf));
        assert_eq!(reader.read().unwrap(), Some(packets[0].clone()));
        assert_eq!(reader.read().unwrap(), Some(packets[1].clone()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Flush));
    }

    #[test]
    fn test_pktline_response_end() {
        assert_eq!(PktLine::ResponseEnd.encode(), b"0002");
    }

    #[test]
    fn test_pktline_from_bytes() {
        let pkt = PktLine::from_bytes(b"test data".to_vec());
        assert_eq!(pkt.data(), Some(b"test data".as_slice()));
    }

    #[test]
    fn test_pktline_is_flush() {
        assert!(PktLine::Flush.is_flush());
        assert!(!PktLine::from_string("test").is_flush());
        assert!(!PktLine::Delimiter.is_flush());
        assert!(!PktLine::ResponseEnd.is_flush());
    }

    #[test]
    fn test_pktline_data() {
        let pkt = PktLine::from_string("hello");
        assert_eq!(pkt.data(), Some(b"hello".as_slice()));

        assert!(PktLine::Flush.data().is_none());
        assert!(PktLine::Delimiter.data().is_none());
        assert!(PktLine::ResponseEnd.data().is_none());
    }

    #[test]
    fn test_pktline_read_delimiter() {
        let mut reader = PktLineReader::new(Cursor::new(b"0001".to_vec()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::Delimiter));
    }

    #[test]
    fn test_pktline_read_response_end() {
        let mut reader = PktLineReader::new(Cursor::new(b"0002".to_vec()));
        assert_eq!(reader.read().unwrap(), Some(PktLine::ResponseEnd));
    }

    #[test]
    fn test_pktline_read_invalid_length() {
        // 3 is less than the 4-byte prefix itself
        let mut reader = PktLineReader::new(Cursor::new(b"0003".to_vec()));
        assert!(reader.read().is_err());
    }

    #[test]
    fn test_pktline_read_garbage_length() {
        let mut reader = PktLineReader::new(Cursor::new(b"zzzzwant".to_vec()));
        assert!(reader.read().is_err());
    }

    #[test]
    fn test_pktline_large_packet() {
        let data = "x".repeat(1000);
        let encoded = PktLine::from_string(&data).encode();

        let mut reader = PktLineReader::new(Cursor::new(encoded));
        let read_pkt = reader.read().unwrap().unwrap();
        assert_eq!(read_pkt.data().unwrap().len(), 1000);
    }

    #[test]
    fn test_pktline_empty_data() {
        let encoded = PktLine::from_bytes(Vec::new()).encode();
        assert_eq!(&encoded[..4], b"0004"); // Just the length prefix
    }

    #[test]
    fn test_pktline_read_eof_on_empty() {
        let mut reader = PktLineReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_pktline_equality() {
        assert_eq!(PktLine::Flush, PktLine::Flush);
        assert_eq!(PktLine::from_string("test"), PktLine::from_string("test"));
        assert_ne!(PktLine::Flush, PktLine::Delimiter);
    }

    fn upload_request(lines: &[&str], flush_after: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if i == flush_after {
                buf.extend_from_slice(&PktLine::Flush.encode());
            }
            buf.extend_from_slice(&PktLine::from_string(line).encode());
        }
        buf.extend_from_slice(&PktLine::Flush.encode());
        buf
    }

    #[test]
    fn test_scan_deepen_found() {
        let body = upload_request(
            &["want 4e12749fdcb27b9c74e plain\n", "deepen 1\n"],
            usize::MAX,
        );
        assert!(scan_deepen(&body));
    }

    #[test]
    fn test_scan_deepen_absent() {
        let body = upload_request(
            &["want 4e12749fdcb27b9c74e plain\n", "have 8f3c11b1f9cbbdd9e25\n"],
            usize::MAX,
        );
        assert!(!scan_deepen(&body));
    }

    #[test]
    fn test_scan_deepen_after_flush() {
        // A deepen line past a flush packet is still honored.
        let body = upload_request(&["want 4e12749fdcb27b9c74e\n", "deepen-since 1234\n"], 1);
        assert!(scan_deepen(&body));
    }

    #[test]
    fn test_scan_deepen_requires_line_prefix() {
        let body = upload_request(&["want mydeepen\n"], usize::MAX);
        assert!(!scan_deepen(&body));
    }

    #[test]
    fn test_scan_deepen_truncated_payload() {
        // Length prefix promises 16 payload bytes, only 4 follow.
        assert!(!scan_deepen(b"0014deep"));
    }

    #[test]
    fn test_scan_deepen_garbage_length() {
        assert!(!scan_deepen(b"xxxxdeepen 1\n"));
    }

    #[test]
    fn test_scan_deepen_empty() {
        assert!(!scan_deepen(b""));
    }
}
