//! # Management commands
//!
//! The operations behind the `dsk` tool. Each one works on an opened
//! [`Amsdos`] filesystem or [`DiskImage`] and writes its report to any
//! `std::io::Write`, so the binary and the tests share the same code.

use crate::error::{DskError, ErrorStack, Result};
use crate::filesystem::Amsdos;
use crate::format::{DiskImageFormat, DiskType, FormatSpec};
use crate::image::DiskImage;
use crate::io::FloppyDriver;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How a host file is stored by [`add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMode {
    /// Store the bytes unchanged
    Raw,
    /// Prepend (or replace) an AMSDOS binary header
    Binary {
        /// Load address
        load: u16,
        /// Execution address
        exec: u16,
    },
    /// Strip an AMSDOS header if one is found
    Ascii,
}

/// Geometry of a new image for [`create`]
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Tracks per side
    pub tracks: u8,
    /// Sides
    pub sides: u8,
    /// Sectors per track, `None` for the disk type default
    pub sectors: Option<u8>,
    /// Sector size in bytes
    pub sector_size: u16,
    /// Track length in the container, 0 to derive it
    pub track_length: u16,
    /// AMSDOS disk type
    pub disk_type: DiskType,
    /// Write an extended image
    pub extended: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            tracks: 40,
            sides: 1,
            sectors: None,
            sector_size: 512,
            track_length: 0,
            disk_type: DiskType::Data,
            extended: false,
        }
    }
}

impl CreateOptions {
    /// Format specification for these options
    pub fn spec(&self) -> Result<FormatSpec> {
        let mut spec = FormatSpec::for_disk_type(self.disk_type)?
            .with_tracks(self.tracks)
            .with_sides(self.sides)
            .with_sector_size(self.sector_size)
            .with_track_length(self.track_length);
        if let Some(sectors) = self.sectors {
            spec = spec.with_sectors_per_track(sectors);
        }
        if self.extended {
            spec = spec.with_format(DiskImageFormat::ExtendedDSK);
        }
        spec.validate()?;
        Ok(spec)
    }
}

/// Run `result` and, on failure, record the error followed by `context` on `errors`
pub fn with_context<T, F>(errors: &mut ErrorStack, context: F, result: Result<T>) -> Result<T>
where
    F: FnOnce() -> String,
{
    if let Err(e) = &result {
        errors.push_error(e);
        errors.push(context());
    }
    result
}

/// Open an image file and mount its filesystem
pub fn open(path: &Path, errors: &mut ErrorStack) -> Result<Amsdos> {
    let image = with_context(
        errors,
        || format!("Unable to open DSK image {}", path.display()),
        DiskImage::open(path),
    )?;
    with_context(
        errors,
        || "Unable to open AMSDOS filesystem".to_string(),
        Amsdos::new(image),
    )
}

/// Save a modified filesystem to `output`, or back to `path`
pub fn save(fs: &mut Amsdos, path: &Path, output: Option<&Path>, errors: &mut ErrorStack) -> Result<()> {
    let target = output.unwrap_or(path);
    with_context(
        errors,
        || format!("Unable to save {}", target.display()),
        fs.save(target),
    )
}

/// Print one line per file
pub fn list<W: Write>(fs: &Amsdos, out: &mut W, errors: &mut ErrorStack) -> Result<()> {
    let files = with_context(errors, || "Unable to read directory".to_string(), fs.list())?;
    for file in files {
        writeln!(out, "{} (user {}) {:6} bytes", file.name, file.user, file.size)?;
    }
    Ok(())
}

/// Print the disk summary
pub fn info<W: Write>(fs: &Amsdos, out: &mut W, errors: &mut ErrorStack) -> Result<()> {
    let info = with_context(
        errors,
        || "Unable to read disk information".to_string(),
        fs.disk_info(),
    )?;
    writeln!(out, "DSK type\t: {}", info.format.name())?;
    writeln!(out, "Disk id\t\t: {}", info.magic)?;
    writeln!(out, "Creator\t\t: {}", info.creator)?;
    writeln!(out, "Disk type\t: {}", info.disk_type)?;
    writeln!(out, "Tracks\t\t: {:4}", info.num_tracks)?;
    writeln!(out, "Sides\t\t: {:4}", info.num_sides)?;
    writeln!(out, "Sectors\t\t: {:4}", info.sectors_per_track)?;
    writeln!(out, "First sector id\t: 0x{:02X}", info.first_sector_id)?;
    writeln!(out, "Total size\t: {:6} bytes", info.capacity)?;
    writeln!(out, "Used\t\t: {:6} bytes", info.used)?;
    Ok(())
}

/// Copy a file out of the image, returning where it was written
pub fn export(
    fs: &Amsdos,
    name: &str,
    user: u8,
    output: Option<&Path>,
    errors: &mut ErrorStack,
) -> Result<PathBuf> {
    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(name));
    let data = with_context(
        errors,
        || format!("Unable to export {} (user {})", name, user),
        fs.read_file(name, user),
    )?;
    with_context(
        errors,
        || format!("Unable to write {}", target.display()),
        std::fs::write(&target, &data).map_err(DskError::from),
    )?;
    info!("Exported {} bytes to {}", data.len(), target.display());
    Ok(target)
}

/// Delete a file from the image
pub fn delete(fs: &mut Amsdos, name: &str, user: u8, errors: &mut ErrorStack) -> Result<()> {
    with_context(
        errors,
        || format!("Unable to delete {} (user {})", name, user),
        fs.remove_file(name, user),
    )
}

/// Copy a host file into the image. The stored name defaults to the host
/// file name.
pub fn add(
    fs: &mut Amsdos,
    source: &Path,
    name: Option<&str>,
    user: u8,
    mode: AddMode,
    errors: &mut ErrorStack,
) -> Result<()> {
    let data = with_context(
        errors,
        || format!("Unable to read {}", source.display()),
        std::fs::read(source).map_err(DskError::from),
    )?;
    let host_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.unwrap_or(&host_name);
    debug!("Adding {} as {} in {:?} mode", source.display(), name, mode);

    let result = match mode {
        AddMode::Raw => fs.add_file(&data, name, user, None),
        AddMode::Binary { load, exec } => fs.add_binary_file(&data, name, user, load, exec),
        AddMode::Ascii => fs.add_ascii_file(&data, name, user),
    };
    with_context(
        errors,
        || format!("Unable to add {} (user {})", name, user),
        result,
    )
}

/// Write an image file onto a physical disk
pub fn write_device(
    image: &DiskImage,
    driver: &mut dyn FloppyDriver,
    errors: &mut ErrorStack,
) -> Result<()> {
    with_context(
        errors,
        || "Unable to write the image to the device".to_string(),
        image.write_to_device(driver),
    )
}

/// Read a physical disk into a new image file
pub fn read_device(
    driver: &mut dyn FloppyDriver,
    tracks: u8,
    sides: u8,
    output: &Path,
    errors: &mut ErrorStack,
) -> Result<()> {
    let mut image = with_context(
        errors,
        || "Unable to read the image from the device".to_string(),
        DiskImage::read_from_device(driver, tracks, sides),
    )?;
    with_context(
        errors,
        || format!("Unable to save {}", output.display()),
        image.save(output),
    )
}

/// Create a blank formatted image file
pub fn create(options: &CreateOptions, output: &Path, errors: &mut ErrorStack) -> Result<()> {
    let spec = with_context(
        errors,
        || "Invalid disk geometry".to_string(),
        options.spec(),
    )?;
    let mut fs = with_context(
        errors,
        || format!("Unable to create {}", output.display()),
        Amsdos::format(spec),
    )?;
    save(&mut fs, output, None, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryDrive, NullDriver};

    fn disk_with_file() -> Amsdos {
        let mut fs = Amsdos::format(FormatSpec::amstrad_data()).unwrap();
        fs.add_file(&[0x55; 3000], "TEST.BIN", 0, None).unwrap();
        fs
    }

    #[test]
    fn test_list_format() {
        let fs = disk_with_file();
        let mut out = Vec::new();
        list(&fs, &mut out, &mut ErrorStack::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "TEST.BIN (user 0)   3072 bytes\n");
    }

    #[test]
    fn test_info_format() {
        let fs = disk_with_file();
        let mut out = Vec::new();
        info(&fs, &mut out, &mut ErrorStack::new()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("DSK type\t: DSK\n"));
        assert!(text.contains("Disk type\t: DATA\n"));
        assert!(text.contains("First sector id\t: 0xC1\n"));
        assert!(text.contains("Total size\t: 184320 bytes\n"));
        assert!(text.contains("Used\t\t:   3072 bytes\n"));
    }

    #[test]
    fn test_errors_are_stacked_newest_first() {
        let mut fs = disk_with_file();
        let mut errors = ErrorStack::new();
        assert!(delete(&mut fs, "MISSING.BIN", 0, &mut errors).is_err());
        assert_eq!(
            errors.combined_message(),
            "Unable to delete MISSING.BIN (user 0)\nFile not found: MISSING.BIN"
        );
    }

    #[test]
    fn test_create_options() {
        let options = CreateOptions {
            disk_type: DiskType::System,
            extended: true,
            ..CreateOptions::default()
        };
        let spec = options.spec().unwrap();
        assert_eq!(spec.first_sector_id, 0x41);
        assert_eq!(spec.format, DiskImageFormat::ExtendedDSK);

        let bad = CreateOptions {
            sides: 3,
            ..CreateOptions::default()
        };
        assert!(bad.spec().is_err());
    }

    #[test]
    fn test_device_commands() {
        let fs = disk_with_file();
        let mut errors = ErrorStack::new();
        let err = write_device(fs.image(), &mut NullDriver, &mut errors).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Device);
        assert!(errors.combined_message().starts_with("Unable to write the image"));

        let mut drive = MemoryDrive::new();
        write_device(fs.image(), &mut drive, &mut ErrorStack::new()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copy.dsk");
        read_device(&mut drive, 40, 1, &path, &mut ErrorStack::new()).unwrap();

        let copy = open(&path, &mut ErrorStack::new()).unwrap();
        assert_eq!(copy.read_file("TEST.BIN", 0).unwrap()[..3000], [0x55; 3000][..]);
    }

    #[test]
    fn test_export_and_add() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("hello.txt");
        std::fs::write(&source, b"HELLO").unwrap();

        let mut fs = Amsdos::format(FormatSpec::amstrad_data()).unwrap();
        let mut errors = ErrorStack::new();
        add(&mut fs, &source, None, 0, AddMode::Raw, &mut errors).unwrap();
        assert!(fs.file_exists("HELLO.TXT", 0));

        let target = dir.path().join("out.txt");
        let written = export(&fs, "hello.txt", 0, Some(&target), &mut errors).unwrap();
        assert_eq!(written, target);
        let data = std::fs::read(&target).unwrap();
        assert_eq!(&data[..5], b"HELLO");
        assert_eq!(data.len(), 128);
        assert!(errors.is_empty());
    }
}
