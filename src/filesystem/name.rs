/// AMSDOS 8.3 file names

use crate::error::{DskError, Result};
use std::fmt;

/// Length of the base name
pub const NAME_LEN: usize = 8;
/// Length of the extension
pub const EXT_LEN: usize = 3;

/// A normalized, space padded, upper case 8.3 name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AmsdosName {
    /// Base name, space padded
    pub base: [u8; NAME_LEN],
    /// Extension, space padded
    pub ext: [u8; EXT_LEN],
}

impl AmsdosName {
    /// Normalize a host file name or path.
    ///
    /// Only the last path segment is used. It is split at the last `.`, the
    /// base truncated to 8 and the extension to 3 characters, both upper
    /// cased and space padded. A base that still holds a `.`, as in
    /// `archive.tar.gz`, is rejected.
    pub fn parse(name: &str) -> Result<Self> {
        let segment = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let (base, ext) = match segment.rfind('.') {
            Some(dot) => (&segment[..dot], &segment[dot + 1..]),
            None => (segment, ""),
        };

        let base = base.trim_end();
        if base.is_empty() || base.contains('.') {
            return Err(DskError::InvalidFilename(name.to_string()));
        }
        if !segment.is_ascii() || segment.bytes().any(|b| b.is_ascii_control()) {
            return Err(DskError::InvalidFilename(name.to_string()));
        }

        Ok(Self {
            base: pad(base),
            ext: pad(ext.trim_end()),
        })
    }

    /// Build a name from raw directory bytes, clearing attribute bits
    pub fn from_raw(base: &[u8; NAME_LEN], ext: &[u8; EXT_LEN]) -> Self {
        Self {
            base: base.map(|b| b & 0x7F),
            ext: ext.map(|b| b & 0x7F),
        }
    }

    /// Base name without padding
    pub fn base_str(&self) -> String {
        String::from_utf8_lossy(&self.base).trim_end().to_string()
    }

    /// Extension without padding
    pub fn ext_str(&self) -> String {
        String::from_utf8_lossy(&self.ext).trim_end().to_string()
    }
}

fn pad<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [b' '; N];
    for (slot, byte) in out.iter_mut().zip(text.bytes()) {
        *slot = byte.to_ascii_uppercase();
    }
    out
}

impl fmt::Display for AmsdosName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ext = self.ext_str();
        if ext.is_empty() {
            write!(f, "{}", self.base_str())
        } else {
            write!(f, "{}.{}", self.base_str(), ext)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_lower_case() {
        let name = AmsdosName::parse("game.bas").unwrap();
        assert_eq!(&name.base, b"GAME    ");
        assert_eq!(&name.ext, b"BAS");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            AmsdosName::parse("/path/to/game.bas").unwrap(),
            AmsdosName::parse("GAME.BAS").unwrap()
        );
        assert_eq!(
            AmsdosName::parse("C:\\dumps\\game.bas").unwrap(),
            AmsdosName::parse("GAME.BAS").unwrap()
        );
    }

    #[test]
    fn test_normalize_truncates() {
        let name = AmsdosName::parse("verylongname.text").unwrap();
        assert_eq!(&name.base, b"VERYLONG");
        assert_eq!(&name.ext, b"TEX");
    }

    #[test]
    fn test_dot_in_base_is_rejected() {
        assert!(matches!(
            AmsdosName::parse("archive.tar.gz"),
            Err(DskError::InvalidFilename(_))
        ));
        assert!(AmsdosName::parse("../game.bas").is_ok());
    }

    #[test]
    fn test_no_extension() {
        let name = AmsdosName::parse("disc").unwrap();
        assert_eq!(&name.ext, b"   ");
        assert_eq!(name.to_string(), "DISC");
    }

    #[test]
    fn test_already_normalized_is_unchanged() {
        let name = AmsdosName::parse("GALAXIAN.BAS").unwrap();
        assert_eq!(&name.base, b"GALAXIAN");
        assert_eq!(name.to_string(), "GALAXIAN.BAS");
    }

    #[test]
    fn test_invalid_names() {
        assert!(AmsdosName::parse("").is_err());
        assert!(AmsdosName::parse("dir/").is_err());
        assert!(AmsdosName::parse(".bas").is_err());
        assert!(AmsdosName::parse("caf\u{e9}.bas").is_err());
    }

    #[test]
    fn test_from_raw_clears_attributes() {
        let name = AmsdosName::from_raw(b"GAME    ", &[b'B' | 0x80, b'A' | 0x80, b'S']);
        assert_eq!(name, AmsdosName::parse("game.bas").unwrap());
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(base in "[a-zA-Z0-9]{1,12}", ext in "[a-zA-Z0-9]{0,5}") {
            let input = if ext.is_empty() { base.clone() } else { format!("{}.{}", base, ext) };
            let once = AmsdosName::parse(&input).unwrap();
            let twice = AmsdosName::parse(&once.to_string()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
