/// I/O operations for reading and writing DSK files and floppy devices

/// Floppy device driver interface and transfers
pub mod device;
/// Reader implementation for DSK files
pub mod reader;
/// Writer implementation for DSK files
pub mod writer;

pub use device::{with_retries, FloppyDriver, MemoryDrive, NullDriver, MAX_RETRIES};
pub use reader::{read_dsk, read_dsk_from_reader};
pub use writer::{write_dsk, write_dsk_to};
