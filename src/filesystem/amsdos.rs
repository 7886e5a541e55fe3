/// AMSDOS filesystem on top of a DSK image

use crate::error::{DskError, Result};
use crate::filesystem::directory::*;
use crate::filesystem::header::{AmsdosHeader, HEADER_SIZE};
use crate::filesystem::name::AmsdosName;
use crate::format::{DiskImageFormat, DiskType, FormatSpec};
use crate::image::DiskImage;
use log::{debug, info, trace, warn};
use std::io::Write;
use std::path::Path;

/// Sector size AMSDOS requires
pub const AMSDOS_SECTOR_SIZE: usize = 512;
/// Blocks taken by the directory
pub const DIRECTORY_BLOCKS: usize = 2;
/// Highest number of blocks addressable with one-byte block numbers
pub const MAX_BLOCKS: usize = 256;

const SECTORS_PER_BLOCK: usize = BLOCK_SIZE / AMSDOS_SECTOR_SIZE;
const ENTRIES_PER_SECTOR: usize = AMSDOS_SECTOR_SIZE / DIR_ENTRY_SIZE;
const PADDING: u8 = 0x1A;

/// One logical file as shown in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name
    pub name: AmsdosName,
    /// User number
    pub user: u8,
    /// Size in bytes, a multiple of 128
    pub size: usize,
    /// Number of directory entries used
    pub extents: usize,
    /// Read-only attribute
    pub read_only: bool,
    /// System attribute
    pub system: bool,
    /// Directory slot of the first extent
    pub index: usize,
}

/// Summary of an image and its filesystem
#[derive(Debug, Clone)]
pub struct DiskInfo {
    /// Container variant
    pub format: DiskImageFormat,
    /// Disk type from the first sector id
    pub disk_type: DiskType,
    /// Magic text of the disk info block
    pub magic: String,
    /// Creator string
    pub creator: String,
    /// Tracks per side
    pub num_tracks: u8,
    /// Sides
    pub num_sides: u8,
    /// Sectors on track 0
    pub sectors_per_track: usize,
    /// Formatted capacity in bytes
    pub capacity: usize,
    /// Bytes used by files
    pub used: usize,
    /// Lowest sector id of track 0
    pub first_sector_id: u8,
}

#[derive(Debug, Clone, Copy)]
struct Geometry {
    first_sector_id: u8,
    base_track: u8,
    data_start: usize,
    total_blocks: usize,
}

impl Geometry {
    fn probe(image: &DiskImage) -> Result<Self> {
        let first_sector_id = image.first_sector_id()?;
        let base_track = DiskType::from_first_sector_id(first_sector_id).reserved_tracks();

        let mut data_start = 0;
        let mut base = None;
        for index in 0..image.track_count() {
            let track = image.track(index)?;
            if track.track_number == base_track && track.side_number == 0 {
                base = Some(track);
                break;
            }
            data_start += track.sector_count();
        }
        let base = base.ok_or(DskError::InvalidTrack {
            side: 0,
            track: base_track,
            max: image.num_tracks().saturating_sub(1),
        })?;

        if base.sector_size() != AMSDOS_SECTOR_SIZE {
            return Err(DskError::UnsupportedFormat(format!(
                "AMSDOS needs {} byte sectors, track {} has {}",
                AMSDOS_SECTOR_SIZE,
                base_track,
                base.sector_size()
            )));
        }

        let sectors = image.logical_sector_count()?;
        let total_blocks = (sectors.saturating_sub(data_start) / SECTORS_PER_BLOCK).min(MAX_BLOCKS);
        if total_blocks <= DIRECTORY_BLOCKS {
            return Err(DskError::UnsupportedFormat(
                "disk too small for an AMSDOS directory".to_string(),
            ));
        }

        debug!(
            "AMSDOS geometry: first sector {:#04x}, directory on track {}, data from logical sector {}, {} blocks",
            first_sector_id, base_track, data_start, total_blocks
        );

        Ok(Self {
            first_sector_id,
            base_track,
            data_start,
            total_blocks,
        })
    }
}

/// AMSDOS filesystem owning its image.
///
/// The directory is 64 entries in blocks 0 and 1 of the first track after the
/// reserved tracks. Blocks are 1KB, two consecutive logical sectors each.
#[derive(Debug)]
pub struct Amsdos {
    image: DiskImage,
    geometry: Geometry,
    last_free_block: u16,
}

impl Amsdos {
    /// Mount an image
    pub fn new(image: DiskImage) -> Result<Self> {
        let geometry = Geometry::probe(&image)?;
        Ok(Self {
            image,
            geometry,
            last_free_block: 0,
        })
    }

    /// Create a blank image and an empty directory on it
    pub fn format(spec: FormatSpec) -> Result<Self> {
        let mut fs = Self::new(DiskImage::create(spec)?)?;
        let empty = DirEntry::deleted();
        for index in 0..DIR_ENTRIES {
            fs.set_directory_entry(index, &empty)?;
        }
        Ok(fs)
    }

    /// Open an image file and mount it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(DiskImage::open(path)?)
    }

    /// The underlying image
    pub fn image(&self) -> &DiskImage {
        &self.image
    }

    /// The underlying image, mutably
    pub fn image_mut(&mut self) -> &mut DiskImage {
        &mut self.image
    }

    /// Release the image
    pub fn into_image(self) -> DiskImage {
        self.image
    }

    /// Save the image
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.image.save(path)
    }

    /// Disk type of the mounted image
    pub fn disk_type(&self) -> DiskType {
        DiskType::from_first_sector_id(self.geometry.first_sector_id)
    }

    fn entry_offset(&self, index: usize) -> Result<usize> {
        if index >= DIR_ENTRIES {
            return Err(DskError::InvalidDirEntry(index));
        }
        let sector_id = u8::try_from(index / ENTRIES_PER_SECTOR)
            .ok()
            .and_then(|n| self.geometry.first_sector_id.checked_add(n))
            .ok_or(DskError::InvalidDirEntry(index))?;
        let offset = self.image.sector_offset(self.geometry.base_track, 0, sector_id)?;
        Ok(offset + (index % ENTRIES_PER_SECTOR) * DIR_ENTRY_SIZE)
    }

    /// Read directory slot `index`
    pub fn directory_entry(&self, index: usize) -> Result<DirEntry> {
        let offset = self.entry_offset(index)?;
        let bytes: &[u8; DIR_ENTRY_SIZE] = self
            .image
            .read_raw(offset, DIR_ENTRY_SIZE)?
            .try_into()
            .map_err(|_| DskError::InvalidDirEntry(index))?;
        Ok(DirEntry::parse(bytes))
    }

    /// Overwrite directory slot `index`
    pub fn set_directory_entry(&mut self, index: usize, entry: &DirEntry) -> Result<()> {
        let offset = self.entry_offset(index)?;
        trace!("Directory entry {} at offset {:#x}", index, offset);
        self.image.write_raw(offset, &entry.to_bytes())
    }

    /// All 64 directory slots
    pub fn directory(&self) -> Result<Vec<DirEntry>> {
        (0..DIR_ENTRIES).map(|i| self.directory_entry(i)).collect()
    }

    /// First directory slot holding any extent of `name` for `user`
    pub fn lookup(&self, name: &str, user: u8) -> Result<usize> {
        let wanted = AmsdosName::parse(name)?;
        self.directory()?
            .iter()
            .position(|e| e.matches(&wanted, user))
            .ok_or_else(|| DskError::FileNotFound(wanted.to_string()))
    }

    /// Check whether `name` exists for `user`
    pub fn file_exists(&self, name: &str, user: u8) -> bool {
        self.lookup(name, user).is_ok()
    }

    /// Directory slots and entries of a file, ordered by extent number.
    ///
    /// Extents must run 0..n without gaps or repeats.
    pub fn chain(&self, name: &str, user: u8) -> Result<Vec<(usize, DirEntry)>> {
        let wanted = AmsdosName::parse(name)?;
        let mut chain: Vec<(usize, DirEntry)> = self
            .directory()?
            .into_iter()
            .enumerate()
            .filter(|(_, e)| e.matches(&wanted, user))
            .collect();
        if chain.is_empty() {
            return Err(DskError::FileNotFound(wanted.to_string()));
        }

        chain.sort_by_key(|(_, e)| e.extent_number());
        for (expected, (index, entry)) in chain.iter().enumerate() {
            if entry.extent_number() != expected {
                return Err(DskError::CorruptChain(format!(
                    "{} (user {}): slot {} holds extent {} where extent {} was expected",
                    wanted,
                    user,
                    index,
                    entry.extent_number(),
                    expected
                )));
            }
        }
        Ok(chain)
    }

    fn block_sector(&self, block: u8) -> Result<usize> {
        let block = block as usize;
        if block < DIRECTORY_BLOCKS || block >= self.geometry.total_blocks {
            return Err(DskError::filesystem(format!(
                "block {} outside the data area (2..{})",
                block, self.geometry.total_blocks
            )));
        }
        Ok(self.geometry.data_start + block * SECTORS_PER_BLOCK)
    }

    /// Export a file. The result is a multiple of 128 bytes and includes any
    /// AMSDOS header.
    pub fn read_file(&self, name: &str, user: u8) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.read_file_to(name, user, &mut data)?;
        Ok(data)
    }

    /// Export a file into `writer`, returning the number of bytes written
    pub fn read_file_to<W: Write>(&self, name: &str, user: u8, writer: &mut W) -> Result<usize> {
        let chain = self.chain(name, user)?;
        debug!("Reading {} (user {}) from {} extents", name, user, chain.len());

        let mut written = 0;
        for (_, entry) in &chain {
            let mut remaining = entry.size();
            for block in entry.data_blocks() {
                let first = self.block_sector(block)?;
                for sector in first..first + SECTORS_PER_BLOCK {
                    if remaining == 0 {
                        break;
                    }
                    let data = self.image.sector_data(sector)?;
                    let take = remaining.min(AMSDOS_SECTOR_SIZE).min(data.len());
                    writer.write_all(&data[..take])?;
                    written += take;
                    remaining -= take;
                }
            }
            if remaining > 0 {
                warn!(
                    "Extent {} of {} declares {} bytes past its last block",
                    entry.extent_number(),
                    name,
                    remaining
                );
            }
        }
        Ok(written)
    }

    /// Delete a file by marking its entries free; data stays on disk
    pub fn remove_file(&mut self, name: &str, user: u8) -> Result<()> {
        let chain = self.chain(name, user)?;
        for (index, mut entry) in chain {
            entry.user = USER_DELETED;
            self.set_directory_entry(index, &entry)?;
        }
        info!("Removed {} (user {})", name, user);
        Ok(())
    }

    fn used_map(&self, directory: &[DirEntry]) -> Vec<bool> {
        let total = self.geometry.total_blocks;
        let mut used = vec![false; total];
        used[..DIRECTORY_BLOCKS].fill(true);
        for entry in directory.iter().filter(|e| !e.is_deleted()) {
            for block in entry.allocated_blocks() {
                if let Some(slot) = used.get_mut(block as usize) {
                    *slot = true;
                }
            }
        }
        used
    }

    /// Pick `count` free blocks scanning forward from the cursor and wrapping
    fn reserve_blocks(&self, directory: &[DirEntry], count: usize) -> Result<Vec<u8>> {
        let total = self.geometry.total_blocks;
        let used = self.used_map(directory);
        let available = used.iter().filter(|&&u| !u).count();
        if available < count {
            return Err(DskError::DiskFull {
                needed: count,
                available,
            });
        }

        let cursor = self.last_free_block as usize;
        let start = if cursor < DIRECTORY_BLOCKS || cursor >= total {
            DIRECTORY_BLOCKS
        } else {
            cursor
        };
        Ok((start..total)
            .chain(DIRECTORY_BLOCKS..start)
            .filter(|&b| !used[b])
            .take(count)
            .map(|b| b as u8)
            .collect())
    }

    /// Store a file, optionally preceded by an AMSDOS header.
    ///
    /// Directory slots and blocks are reserved before anything is written, so
    /// a name clash or lack of space leaves the image untouched. Data is
    /// written next and the directory entries last. The final sector is
    /// padded with 0x1A. Users above [`MAX_USER`] are rejected.
    pub fn add_file(
        &mut self,
        data: &[u8],
        name: &str,
        user: u8,
        header: Option<&AmsdosHeader>,
    ) -> Result<()> {
        if user > MAX_USER {
            return Err(DskError::InvalidUser(user));
        }
        let amsdos_name = AmsdosName::parse(name)?;
        let directory = self.directory()?;
        if directory.iter().any(|e| e.matches(&amsdos_name, user)) {
            return Err(DskError::FileExists {
                name: amsdos_name.to_string(),
                user,
            });
        }

        let mut payload = Vec::with_capacity(data.len() + HEADER_SIZE);
        if let Some(header) = header {
            payload.extend_from_slice(&header.to_bytes());
        }
        payload.extend_from_slice(data);
        let total = payload.len();

        let free_slots: Vec<usize> = directory
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_deleted())
            .map(|(i, _)| i)
            .collect();
        let addressable = free_slots.len() * EXTENT_SIZE;
        if addressable < total {
            return Err(DskError::InsufficientSpace {
                needed: total,
                available: addressable,
            });
        }
        let entries_needed = total.div_ceil(EXTENT_SIZE).max(1);
        if free_slots.len() < entries_needed {
            return Err(DskError::DirectoryFull {
                needed: entries_needed,
                available: free_slots.len(),
            });
        }

        let blocks = self.reserve_blocks(&directory, total.div_ceil(BLOCK_SIZE))?;
        debug!(
            "Adding {} (user {}): {} bytes, {} entries, blocks {:?}",
            amsdos_name, user, total, entries_needed, blocks
        );

        for (k, &block) in blocks.iter().enumerate() {
            let first = self.block_sector(block)?;
            for half in 0..SECTORS_PER_BLOCK {
                let start = k * BLOCK_SIZE + half * AMSDOS_SECTOR_SIZE;
                if start >= total {
                    break;
                }
                let end = (start + AMSDOS_SECTOR_SIZE).min(total);
                let mut sector = [PADDING; AMSDOS_SECTOR_SIZE];
                sector[..end - start].copy_from_slice(&payload[start..end]);
                self.image.write_sector(first + half, &sector)?;
            }
        }

        for (extent, &slot) in free_slots.iter().take(entries_needed).enumerate() {
            let start = extent * EXTENT_SIZE;
            let bytes = total.saturating_sub(start).min(EXTENT_SIZE);
            let mut entry = DirEntry::new(user, &amsdos_name, extent);
            entry.record_count = bytes.div_ceil(RECORD_SIZE) as u8;
            let extent_blocks = &blocks[(extent * BLOCKS_PER_EXTENT).min(blocks.len())
                ..((extent + 1) * BLOCKS_PER_EXTENT).min(blocks.len())];
            entry.blocks[..extent_blocks.len()].copy_from_slice(extent_blocks);
            self.set_directory_entry(slot, &entry)?;
        }

        if let Some(&last) = blocks.last() {
            self.last_free_block = last as u16 + 1;
        }
        info!("Added {} (user {}), {} bytes", amsdos_name, user, total);
        Ok(())
    }

    /// Store a binary file with a fresh AMSDOS header carrying the given
    /// addresses. A header already present in `data` is replaced.
    pub fn add_binary_file(
        &mut self,
        data: &[u8],
        name: &str,
        user: u8,
        load_address: u16,
        entry_address: u16,
    ) -> Result<()> {
        let payload = if AmsdosHeader::is_present(data) {
            info!("Replacing the AMSDOS header of {}", name);
            &data[HEADER_SIZE..]
        } else {
            data
        };
        let header = AmsdosHeader::binary(
            user,
            AmsdosName::parse(name)?,
            load_address,
            entry_address,
            payload.len(),
        );
        self.add_file(payload, name, user, Some(&header))
    }

    /// Store a file without a header, stripping one found at the start of `data`
    pub fn add_ascii_file(&mut self, data: &[u8], name: &str, user: u8) -> Result<()> {
        let payload = if AmsdosHeader::is_present(data) {
            info!("Stripping the AMSDOS header of {}", name);
            &data[HEADER_SIZE..]
        } else {
            data
        };
        self.add_file(payload, name, user, None)
    }

    /// AMSDOS header at the start of a file, if its checksum matches
    pub fn file_header(&self, name: &str, user: u8) -> Result<Option<AmsdosHeader>> {
        let chain = self.chain(name, user)?;
        let Some((_, first)) = chain.first() else {
            return Ok(None);
        };
        let Some(block) = first.data_blocks().next() else {
            return Ok(None);
        };
        let sector = self.image.sector_data(self.block_sector(block)?)?;
        Ok(AmsdosHeader::parse(sector))
    }

    /// One entry per file, in directory order of each file's first extent
    pub fn list(&self) -> Result<Vec<FileEntry>> {
        let directory = self.directory()?;
        let mut files: Vec<(FileEntry, usize)> = Vec::new();

        for (index, entry) in directory.iter().enumerate() {
            if entry.is_deleted() {
                continue;
            }
            let name = entry.amsdos_name();
            let extent = entry.extent_number();
            match files
                .iter_mut()
                .find(|(f, _)| f.name == name && f.user == entry.user)
            {
                Some((file, lowest)) => {
                    file.size += entry.size();
                    file.extents += 1;
                    if extent < *lowest {
                        *lowest = extent;
                        file.index = index;
                    }
                }
                None => files.push((
                    FileEntry {
                        name,
                        user: entry.user,
                        size: entry.size(),
                        extents: 1,
                        read_only: entry.is_read_only(),
                        system: entry.is_system(),
                        index,
                    },
                    extent,
                )),
            }
        }

        for (file, lowest) in &files {
            if *lowest != 0 {
                warn!("{} (user {}) has no first extent", file.name, file.user);
            }
        }

        let mut files: Vec<FileEntry> = files.into_iter().map(|(f, _)| f).collect();
        files.sort_by_key(|f| f.index);
        Ok(files)
    }

    /// Blocks in the data area, directory included
    pub fn total_blocks(&self) -> usize {
        self.geometry.total_blocks
    }

    /// Blocks referenced by live directory entries
    pub fn used_blocks(&self) -> Result<usize> {
        let directory = self.directory()?;
        let used = self.used_map(&directory);
        Ok(used[DIRECTORY_BLOCKS..].iter().filter(|&&u| u).count())
    }

    /// Blocks available to new files
    pub fn free_blocks(&self) -> Result<usize> {
        Ok(self
            .total_blocks()
            .saturating_sub(DIRECTORY_BLOCKS + self.used_blocks()?))
    }

    /// Bytes used by files: the record counts of all live entries
    pub fn used_bytes(&self) -> Result<usize> {
        Ok(self
            .directory()?
            .iter()
            .filter(|e| !e.is_deleted())
            .map(DirEntry::size)
            .sum())
    }

    /// Summary of the image and its filesystem
    pub fn disk_info(&self) -> Result<DiskInfo> {
        Ok(DiskInfo {
            format: self.image.format(),
            disk_type: self.disk_type(),
            magic: self.image.magic(),
            creator: self.image.creator(),
            num_tracks: self.image.num_tracks(),
            num_sides: self.image.num_sides(),
            sectors_per_track: self.image.track(0)?.sector_count(),
            capacity: self.image.capacity()?,
            used: self.used_bytes()?,
            first_sector_id: self.geometry.first_sector_id,
        })
    }
}
