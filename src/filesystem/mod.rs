/// AMSDOS filesystem

/// Filesystem operations
pub mod amsdos;
/// Directory entries
pub mod directory;
/// AMSDOS file header
pub mod header;
/// 8.3 file names
pub mod name;

pub use amsdos::{Amsdos, DiskInfo, FileEntry};
pub use directory::{heuristic_file_size, DirEntry};
pub use header::{AmsdosHeader, FileType};
pub use name::AmsdosName;
