/// DSK container formats and geometry presets

/// Format constants
pub mod constants;
/// Format specification types
pub mod spec;

pub use constants::*;
pub use spec::{DiskType, FormatSpec};

use std::fmt;

/// DSK container variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskImageFormat {
    /// Plain DSK format with a single track size
    StandardDSK,
    /// Extended DSK format with a per-track size table
    ExtendedDSK,
}

impl DiskImageFormat {
    /// Signature written at the start of a new image of this variant
    pub fn signature(&self) -> &'static [u8] {
        match self {
            DiskImageFormat::StandardDSK => STANDARD_DSK_SIGNATURE,
            DiskImageFormat::ExtendedDSK => EXTENDED_DSK_SIGNATURE,
        }
    }

    /// Prefix that identifies this variant when loading
    pub fn magic_bytes(&self) -> &'static [u8] {
        match self {
            DiskImageFormat::StandardDSK => STANDARD_DSK_MAGIC,
            DiskImageFormat::ExtendedDSK => EXTENDED_DSK_MAGIC,
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            DiskImageFormat::StandardDSK => "DSK",
            DiskImageFormat::ExtendedDSK => "EDSK",
        }
    }
}

impl fmt::Display for DiskImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect DSK format from magic bytes
pub fn detect_format(magic: &[u8]) -> Option<DiskImageFormat> {
    if magic.starts_with(EXTENDED_DSK_MAGIC) {
        Some(DiskImageFormat::ExtendedDSK)
    } else if magic.starts_with(STANDARD_DSK_MAGIC) {
        Some(DiskImageFormat::StandardDSK)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_standard_format() {
        let result = detect_format(STANDARD_DSK_SIGNATURE);
        assert_eq!(result, Some(DiskImageFormat::StandardDSK));
    }

    #[test]
    fn test_detect_extended_format() {
        let result = detect_format(EXTENDED_DSK_SIGNATURE);
        assert_eq!(result, Some(DiskImageFormat::ExtendedDSK));
    }

    #[test]
    fn test_detect_requires_full_prefix() {
        assert_eq!(detect_format(b"MV - CP"), None);
        assert_eq!(detect_format(b"EXTENDED CPC"), None);
        assert_eq!(
            detect_format(b"MV - CPC anything goes"),
            Some(DiskImageFormat::StandardDSK)
        );
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_format(b"INVALID DATA");
        assert_eq!(result, None);
    }

    #[test]
    fn test_signatures_carry_magic() {
        for format in [DiskImageFormat::StandardDSK, DiskImageFormat::ExtendedDSK] {
            assert!(format.signature().starts_with(format.magic_bytes()));
            assert_eq!(format.signature().len(), DISK_INFO_MAGIC_LEN);
        }
    }
}
