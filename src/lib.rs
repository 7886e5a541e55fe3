/*!
# amsdsk

A Rust library for Amstrad CPC DSK and EDSK disk images with AMSDOS
filesystem support.

## Features

- Read and write Standard (`MV - CPC`) and Extended (`EXTENDED CPC DSK File`) images
- Sector access by logical sector number or by track, side and sector id
- Create blank DATA, SYSTEM and IBM formatted disks
- AMSDOS directory: list, export, add (raw, binary with header, ASCII) and delete
- Transfer images to and from a floppy drive through a pluggable driver

## Quick Start

```rust,no_run
use amsdsk::{Amsdos, DiskImage, FormatSpec};

// Open an existing image and mount its filesystem
let mut fs = Amsdos::open("disk.dsk")?;
for file in fs.list()? {
    println!("{} (user {}) {} bytes", file.name, file.user, file.size);
}

// Export a file
let contents = fs.read_file("GAME.BAS", 0)?;

// Add a binary file loading at 0x4000
fs.add_binary_file(&contents, "COPY.BIN", 0, 0x4000, 0x4000)?;
fs.save("disk.dsk")?;

// Create a blank data disk
let blank = Amsdos::format(FormatSpec::amstrad_data())?;
let image: DiskImage = blank.into_image();
# Ok::<(), amsdsk::DskError>(())
```

## Modules

- `format`: container constants, variant detection and disk geometry presets
- `image`: the container (DiskImage, TrackHeader, SectorInfo)
- `filesystem`: the AMSDOS filesystem
- `io`: file and floppy device transfers
- `fdc`: FDC status registers
- `commands`: the operations behind the `dsk` tool
- `error`: error types, Result alias and the error message stack
*/

#![warn(missing_docs)]

/// Command-line definition of the `dsk` tool
pub mod cli;
pub mod commands;
/// Error types and Result alias
pub mod error;
/// FDC (Floppy Disk Controller) status codes
pub mod fdc;
/// AMSDOS filesystem
pub mod filesystem;
/// DSK format specifications and constants
pub mod format;
/// Core image data structures (DiskImage, TrackHeader, SectorInfo)
pub mod image;
/// I/O operations for reading and writing DSK files and floppy devices
pub mod io;

// Re-export common types
pub use error::{DskError, ErrorKind, ErrorStack, Result};
pub use fdc::{FdcStatus1, FdcStatus2};
pub use filesystem::{Amsdos, AmsdosHeader, AmsdosName, DirEntry, DiskInfo, FileEntry};
pub use format::{DiskImageFormat, DiskType, FormatSpec};
pub use image::{DataRate, DiskImage, DiskImageBuilder, RecordingMode, SectorId, SectorInfo, TrackHeader};
pub use io::{FloppyDriver, MemoryDrive, NullDriver};
