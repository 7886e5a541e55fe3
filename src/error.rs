use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Result type alias for DSK operations
pub type Result<T> = std::result::Result<T, DskError>;

/// Errors that can occur when working with DSK images and AMSDOS filesystems
#[derive(Debug, Error)]
pub enum DskError {
    /// I/O error occurred while reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unrecognized DSK file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Parse error at specific offset
    #[error("Parse error at offset {offset}: {message}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Error message
        message: String,
    },

    /// Track header at the computed offset does not carry the track magic
    #[error("Invalid track header for track index {index} at offset {offset:#06x}")]
    InvalidTrackMagic {
        /// Linear track index
        index: usize,
        /// Offset into the image buffer
        offset: usize,
    },

    /// Unsupported format variant
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid track number specified
    #[error("Invalid track {track} on side {side} (max: {max})")]
    InvalidTrack {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
        /// Maximum allowed track number
        max: u8,
    },

    /// Invalid sector ID specified
    #[error("Invalid sector: id={id:#04x} on track {track}, side {side}")]
    InvalidSector {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
        /// Sector ID
        id: u8,
    },

    /// Logical sector beyond the end of the medium
    #[error("Logical sector {0} is beyond the end of the disk")]
    InvalidLogicalSector(usize),

    /// Directory slot out of range
    #[error("Invalid directory entry index {0}")]
    InvalidDirEntry(usize),

    /// Buffer length does not match the sector size
    #[error("Sector size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Declared sector size
        expected: usize,
        /// Size of the caller buffer
        actual: usize,
    },

    /// File not found in filesystem
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A file with the same name already exists for the user
    #[error("File {name} (user {user}) already exists")]
    FileExists {
        /// Normalized file name
        name: String,
        /// User number
        user: u8,
    },

    /// No free directory entries left
    #[error("Directory full: {needed} entries needed, {available} free")]
    DirectoryFull {
        /// Entries required by the operation
        needed: usize,
        /// Entries available
        available: usize,
    },

    /// Disk is full, no free blocks
    #[error("Disk full: {needed} blocks needed, {available} free")]
    DiskFull {
        /// Blocks required by the operation
        needed: usize,
        /// Blocks available
        available: usize,
    },

    /// Payload larger than the free directory entries can describe
    #[error("Insufficient space: {needed} bytes needed, {available} addressable")]
    InsufficientSpace {
        /// Bytes required by the operation
        needed: usize,
        /// Bytes the free directory entries can hold
        available: usize,
    },

    /// Directory extents of a file are inconsistent
    #[error("Corrupt directory chain: {0}")]
    CorruptChain(String),

    /// Filesystem-related error
    #[error("Filesystem error: {0}")]
    FileSystemError(String),

    /// Floppy device failure
    #[error("Device error: {0}")]
    Device(String),

    /// Invalid filename
    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    /// User number outside the range AMSDOS can address
    #[error("Invalid user number {0} (0-15)")]
    InvalidUser(u8),
}

/// Broad error classes a caller can act upon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The image is malformed
    Format,
    /// A file, track, sector or directory slot is absent
    NotFound,
    /// The operation does not fit on the disk or would clash with existing data
    Capacity,
    /// Underlying file I/O failed
    Io,
    /// The physical floppy device failed
    Device,
}

impl DskError {
    /// Create a parse error with context
    pub fn parse<S: Into<String>>(offset: usize, message: S) -> Self {
        DskError::ParseError {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format<S: Into<String>>(message: S) -> Self {
        DskError::InvalidFormat(message.into())
    }

    /// Create a filesystem error
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        DskError::FileSystemError(message.into())
    }

    /// Create a device error
    pub fn device<S: Into<String>>(message: S) -> Self {
        DskError::Device(message.into())
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DskError::Io(_) => ErrorKind::Io,
            DskError::InvalidFormat(_)
            | DskError::ParseError { .. }
            | DskError::InvalidTrackMagic { .. }
            | DskError::UnsupportedFormat(_)
            | DskError::CorruptChain(_)
            | DskError::FileSystemError(_)
            | DskError::InvalidFilename(_)
            | DskError::InvalidUser(_) => ErrorKind::Format,
            DskError::InvalidTrack { .. }
            | DskError::InvalidSector { .. }
            | DskError::InvalidLogicalSector(_)
            | DskError::InvalidDirEntry(_)
            | DskError::FileNotFound(_) => ErrorKind::NotFound,
            DskError::FileExists { .. }
            | DskError::DirectoryFull { .. }
            | DskError::DiskFull { .. }
            | DskError::InsufficientSpace { .. }
            | DskError::SizeMismatch { .. } => ErrorKind::Capacity,
            DskError::Device(_) => ErrorKind::Device,
        }
    }
}

/// Maximum number of messages kept by an [`ErrorStack`]
pub const MAX_ERROR_STACK: usize = 8;

/// Bounded trail of human readable diagnostics.
///
/// Messages are pushed as an operation unwinds; once more than
/// [`MAX_ERROR_STACK`] are held the oldest one is dropped.
#[derive(Debug, Default, Clone)]
pub struct ErrorStack {
    messages: VecDeque<String>,
}

impl ErrorStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a message
    pub fn push<S: Into<String>>(&mut self, message: S) {
        if self.messages.len() == MAX_ERROR_STACK {
            self.messages.pop_front();
        }
        self.messages.push_back(message.into());
    }

    /// Push an error followed by its chain of sources, innermost last
    pub fn push_error(&mut self, err: &(dyn std::error::Error + 'static)) {
        let mut chain = Vec::new();
        let mut current = Some(err);
        while let Some(e) = current {
            chain.push(e.to_string());
            current = e.source();
        }
        for message in chain.into_iter().rev() {
            self.push(message);
        }
    }

    /// Check whether any message is held
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages held
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Drop all messages
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// All messages, newest first, one per line
    pub fn combined_message(&self) -> String {
        self.messages
            .iter()
            .rev()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ErrorStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.combined_message())
    }
}
