/// The 128-byte AMSDOS file header

use crate::filesystem::name::{AmsdosName, EXT_LEN, NAME_LEN};
use std::fmt;

/// Size of the header
pub const HEADER_SIZE: usize = 128;
/// Bytes covered by the checksum
pub const CHECKSUM_SPAN: usize = 67;

const TYPE_OFFSET: usize = 18;
const DATA_LENGTH_OFFSET: usize = 19;
const LOAD_ADDRESS_OFFSET: usize = 21;
const FIRST_BLOCK_OFFSET: usize = 23;
const LOGICAL_LENGTH_OFFSET: usize = 24;
const ENTRY_ADDRESS_OFFSET: usize = 26;
const FILE_LENGTH_OFFSET: usize = 64;
const CHECKSUM_OFFSET: usize = 67;

/// AMSDOS file type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Tokenised BASIC
    Basic,
    /// Protected BASIC
    Protected,
    /// Binary
    Binary,
    /// Any other code
    Other(u8),
}

impl From<u8> for FileType {
    fn from(value: u8) -> Self {
        match value {
            0 => FileType::Basic,
            1 => FileType::Protected,
            2 => FileType::Binary,
            other => FileType::Other(other),
        }
    }
}

impl From<FileType> for u8 {
    fn from(file_type: FileType) -> Self {
        match file_type {
            FileType::Basic => 0,
            FileType::Protected => 1,
            FileType::Binary => 2,
            FileType::Other(value) => value,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Basic => write!(f, "BASIC"),
            FileType::Protected => write!(f, "Protected"),
            FileType::Binary => write!(f, "Binary"),
            FileType::Other(code) => write!(f, "Type {:#04x}", code),
        }
    }
}

/// Decoded AMSDOS header.
///
/// A header is recognised purely by its checksum, so arbitrary data can be
/// mistaken for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsdosHeader {
    /// User number
    pub user: u8,
    /// File name
    pub name: AmsdosName,
    /// File type
    pub file_type: FileType,
    /// Load address
    pub load_address: u16,
    /// Entry (execution) address
    pub entry_address: u16,
    /// Logical length (16 bits)
    pub logical_length: u16,
    /// File length (24 bits)
    pub file_length: u32,
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

/// Sum of the first 67 bytes of a header block
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .take(CHECKSUM_SPAN)
        .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}

impl AmsdosHeader {
    /// Header for a binary file of `length` bytes
    pub fn binary(user: u8, name: AmsdosName, load_address: u16, entry_address: u16, length: usize) -> Self {
        Self {
            user,
            name,
            file_type: FileType::Binary,
            load_address,
            entry_address,
            logical_length: length.min(u16::MAX as usize) as u16,
            file_length: length.min(0xFF_FFFF) as u32,
        }
    }

    /// Check whether `bytes` start with a header whose checksum matches
    pub fn is_present(bytes: &[u8]) -> bool {
        bytes.len() >= HEADER_SIZE && checksum(bytes) == u16_at(bytes, CHECKSUM_OFFSET)
    }

    /// Parse a header from the start of `bytes`, if its checksum matches
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if !Self::is_present(bytes) {
            return None;
        }
        let mut base = [0u8; NAME_LEN];
        let mut ext = [0u8; EXT_LEN];
        base.copy_from_slice(&bytes[1..9]);
        ext.copy_from_slice(&bytes[9..12]);

        Some(Self {
            user: bytes[0],
            name: AmsdosName::from_raw(&base, &ext),
            file_type: FileType::from(bytes[TYPE_OFFSET]),
            load_address: u16_at(bytes, LOAD_ADDRESS_OFFSET),
            entry_address: u16_at(bytes, ENTRY_ADDRESS_OFFSET),
            logical_length: u16_at(bytes, LOGICAL_LENGTH_OFFSET),
            file_length: u32::from_le_bytes([
                bytes[FILE_LENGTH_OFFSET],
                bytes[FILE_LENGTH_OFFSET + 1],
                bytes[FILE_LENGTH_OFFSET + 2],
                0,
            ]),
        })
    }

    /// Serialize the header with a fresh checksum
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0] = self.user;
        bytes[1..9].copy_from_slice(&self.name.base);
        bytes[9..12].copy_from_slice(&self.name.ext);
        bytes[TYPE_OFFSET] = self.file_type.into();
        bytes[DATA_LENGTH_OFFSET..DATA_LENGTH_OFFSET + 2].copy_from_slice(&0u16.to_le_bytes());
        bytes[LOAD_ADDRESS_OFFSET..LOAD_ADDRESS_OFFSET + 2]
            .copy_from_slice(&self.load_address.to_le_bytes());
        bytes[FIRST_BLOCK_OFFSET] = 0xFF;
        bytes[LOGICAL_LENGTH_OFFSET..LOGICAL_LENGTH_OFFSET + 2]
            .copy_from_slice(&self.logical_length.to_le_bytes());
        bytes[ENTRY_ADDRESS_OFFSET..ENTRY_ADDRESS_OFFSET + 2]
            .copy_from_slice(&self.entry_address.to_le_bytes());
        bytes[FILE_LENGTH_OFFSET..FILE_LENGTH_OFFSET + 3]
            .copy_from_slice(&self.file_length.to_le_bytes()[..3]);
        let sum = checksum(&bytes);
        bytes[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_le_bytes());
        bytes
    }

    /// Checksum the serialized header carries
    pub fn checksum(&self) -> u16 {
        checksum(&self.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AmsdosHeader {
        AmsdosHeader::binary(0, AmsdosName::parse("loader.bin").unwrap(), 0x4000, 0x4010, 3000)
    }

    #[test]
    fn test_layout() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[1..12], b"LOADER  BIN");
        assert_eq!(bytes[18], 2);
        assert_eq!(&bytes[21..23], &[0x00, 0x40]);
        assert_eq!(&bytes[24..26], &3000u16.to_le_bytes());
        assert_eq!(&bytes[26..28], &[0x10, 0x40]);
        assert_eq!(&bytes[64..67], &[0xB8, 0x0B, 0x00]);
        let sum: u16 = bytes[..67].iter().map(|&b| b as u16).sum();
        assert_eq!(&bytes[67..69], &sum.to_le_bytes());
    }

    #[test]
    fn test_parse_round_trip() {
        let header = sample();
        let parsed = AmsdosHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.file_type, FileType::Binary);
        assert_eq!(parsed.checksum(), header.checksum());
    }

    #[test]
    fn test_bad_checksum_is_not_a_header() {
        let mut bytes = sample().to_bytes();
        bytes[67] ^= 0xFF;
        assert!(!AmsdosHeader::is_present(&bytes));
        assert!(AmsdosHeader::parse(&bytes).is_none());
        assert!(AmsdosHeader::parse(&bytes[..100]).is_none());
    }

    #[test]
    fn test_zero_block_is_detected() {
        // A block of zeroes has a matching (zero) checksum; detection is heuristic.
        assert!(AmsdosHeader::is_present(&[0u8; 128]));
    }

    #[test]
    fn test_file_type_codes() {
        assert_eq!(FileType::from(0), FileType::Basic);
        assert_eq!(u8::from(FileType::Other(0x16)), 0x16);
        assert_eq!(FileType::Binary.to_string(), "Binary");
    }
}
