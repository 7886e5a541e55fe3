/// Physical floppy transfer through a pluggable driver

use crate::error::{DskError, Result};
use crate::fdc::FdcStatus1;
use crate::image::{DiskImage, SectorInfo, TrackHeader};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Attempts made for one driver operation before giving up
pub const MAX_RETRIES: usize = 20;

/// Low level access to a floppy drive.
///
/// Addresses follow the uPD765 model: a track header names the cylinder and
/// head, sectors are selected by their position in the header.
pub trait FloppyDriver {
    /// Format a track with the sector ids listed in `track`
    fn format_track(&mut self, track: &TrackHeader) -> Result<()>;

    /// Write the sector at position `sector_index` of `track`
    fn write_sector(&mut self, track: &TrackHeader, sector_index: usize, data: &[u8]) -> Result<()>;

    /// Read the sector at position `sector_index` of `track` into `buffer`
    fn read_sector(&mut self, track: &TrackHeader, sector_index: usize, buffer: &mut [u8]) -> Result<()>;

    /// Move the head to a cylinder
    fn seek_track(&mut self, track: u8) -> Result<()>;

    /// Discover the sector ids recorded on a track of the medium
    fn read_sector_ids(&mut self, track: u8, side: u8) -> Result<TrackHeader>;

    /// Return the head to cylinder 0
    fn recalibrate(&mut self) -> Result<()>;
}

/// Run a driver operation, recalibrating and retrying on failure.
///
/// Gives up after `attempts` tries and returns the last error.
pub fn with_retries<T, F>(driver: &mut dyn FloppyDriver, attempts: usize, mut op: F) -> Result<T>
where
    F: FnMut(&mut dyn FloppyDriver) -> Result<T>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(driver) {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!("Attempt {}/{} failed: {}", attempt, attempts, err);
                if let Err(recal) = driver.recalibrate() {
                    warn!("Recalibration failed: {}", recal);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Driver for platforms without floppy access
#[derive(Debug, Default)]
pub struct NullDriver;

impl NullDriver {
    fn unsupported<T>() -> Result<T> {
        Err(DskError::device(
            "Unsupported platform. Floppy driver is not provided",
        ))
    }
}

impl FloppyDriver for NullDriver {
    fn format_track(&mut self, _track: &TrackHeader) -> Result<()> {
        Self::unsupported()
    }

    fn write_sector(&mut self, _track: &TrackHeader, _sector_index: usize, _data: &[u8]) -> Result<()> {
        Self::unsupported()
    }

    fn read_sector(&mut self, _track: &TrackHeader, _sector_index: usize, _buffer: &mut [u8]) -> Result<()> {
        Self::unsupported()
    }

    fn seek_track(&mut self, _track: u8) -> Result<()> {
        Self::unsupported()
    }

    fn read_sector_ids(&mut self, _track: u8, _side: u8) -> Result<TrackHeader> {
        Self::unsupported()
    }

    fn recalibrate(&mut self) -> Result<()> {
        Self::unsupported()
    }
}

#[derive(Debug, Clone)]
struct MemoryTrack {
    header: TrackHeader,
    data: Vec<Vec<u8>>,
}

/// A virtual drive keeping formatted tracks in memory.
///
/// Useful for tests and for staging a disk before it reaches real hardware.
/// Transient faults can be injected to exercise retry paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryDrive {
    tracks: BTreeMap<(u8, u8), MemoryTrack>,
    head: u8,
    pending_faults: usize,
    recalibrations: usize,
}

impl MemoryDrive {
    /// Create an empty, unformatted drive
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` operations fail with a device error
    pub fn inject_faults(&mut self, count: usize) {
        self.pending_faults = count;
    }

    /// Number of times the head was recalibrated
    pub fn recalibrations(&self) -> usize {
        self.recalibrations
    }

    /// Current head position
    pub fn head_position(&self) -> u8 {
        self.head
    }

    /// Number of formatted tracks
    pub fn formatted_tracks(&self) -> usize {
        self.tracks.len()
    }

    fn check_fault(&mut self) -> Result<()> {
        if self.pending_faults > 0 {
            self.pending_faults -= 1;
            return Err(DskError::device(format!(
                "Simulated fault on cylinder {}",
                self.head
            )));
        }
        Ok(())
    }

    fn slot(&mut self, track: &TrackHeader, sector_index: usize) -> Result<&mut Vec<u8>> {
        let key = (track.track_number, track.side_number);
        let stored = self.tracks.get_mut(&key).ok_or_else(|| {
            DskError::device(format!(
                "Track {} side {} is not formatted",
                key.0, key.1
            ))
        })?;
        stored.data.get_mut(sector_index).ok_or_else(|| {
            DskError::device(format!(
                "No sector at position {} on track {} side {} (ST1 {})",
                sector_index,
                key.0,
                key.1,
                FdcStatus1::new(FdcStatus1::ND)
            ))
        })
    }
}

impl FloppyDriver for MemoryDrive {
    fn format_track(&mut self, track: &TrackHeader) -> Result<()> {
        self.check_fault()?;
        let mut header = track.clone();
        for sector in &mut header.sectors {
            sector.fdc_status1 = Default::default();
            sector.fdc_status2 = Default::default();
            sector.data_length = 0;
        }
        let data = header
            .sectors
            .iter()
            .map(|s| vec![header.filler_byte; s.advertised_size()])
            .collect();
        self.tracks.insert(
            (track.track_number, track.side_number),
            MemoryTrack { header, data },
        );
        Ok(())
    }

    fn write_sector(&mut self, track: &TrackHeader, sector_index: usize, data: &[u8]) -> Result<()> {
        self.check_fault()?;
        let slot = self.slot(track, sector_index)?;
        let len = slot.len().min(data.len());
        slot[..len].copy_from_slice(&data[..len]);
        Ok(())
    }

    fn read_sector(&mut self, track: &TrackHeader, sector_index: usize, buffer: &mut [u8]) -> Result<()> {
        self.check_fault()?;
        let slot = self.slot(track, sector_index)?;
        if buffer.len() != slot.len() {
            return Err(DskError::SizeMismatch {
                expected: slot.len(),
                actual: buffer.len(),
            });
        }
        buffer.copy_from_slice(slot);
        Ok(())
    }

    fn seek_track(&mut self, track: u8) -> Result<()> {
        self.check_fault()?;
        self.head = track;
        Ok(())
    }

    fn read_sector_ids(&mut self, track: u8, side: u8) -> Result<TrackHeader> {
        self.check_fault()?;
        match self.tracks.get(&(track, side)) {
            Some(stored) => Ok(stored.header.clone()),
            None => Ok(TrackHeader::new(track, side)),
        }
    }

    fn recalibrate(&mut self) -> Result<()> {
        self.head = 0;
        self.recalibrations += 1;
        Ok(())
    }
}

/// Format every track of a physical disk and write the image's sectors onto it
pub fn write_image(image: &DiskImage, driver: &mut dyn FloppyDriver) -> Result<()> {
    info!(
        "Writing {} tracks x {} sides to device",
        image.num_tracks(),
        image.num_sides()
    );
    for index in 0..image.track_count() {
        let track = image.track(index)?;
        if track.sector_count() == 0 {
            debug!("Skipping unformatted track index {}", index);
            continue;
        }
        let cylinder = track.track_number;
        with_retries(driver, MAX_RETRIES, |d| d.seek_track(cylinder))?;
        with_retries(driver, MAX_RETRIES, |d| d.format_track(track))?;

        for position in 0..track.sector_count() {
            let data = image.sector_at(index, position)?;
            with_retries(driver, MAX_RETRIES, |d| {
                d.seek_track(cylinder)?;
                d.write_sector(track, position, data)
            })
            .map_err(|err| {
                DskError::device(format!(
                    "Could not write sector {:#04x} of track {} side {}: {}",
                    track.sectors[position].sector_id(),
                    track.track_number,
                    track.side_number,
                    err
                ))
            })?;
        }
        debug!("Wrote track index {}", index);
    }
    Ok(())
}

/// Read a physical disk into a plain image
pub fn read_image(driver: &mut dyn FloppyDriver, tracks: u8, sides: u8) -> Result<DiskImage> {
    if !(1..=2).contains(&sides) {
        return Err(DskError::UnsupportedFormat(format!(
            "{} sides (expected 1 or 2)",
            sides
        )));
    }
    info!("Reading {} tracks x {} sides from device", tracks, sides);

    let mut read = Vec::with_capacity(tracks as usize * sides as usize);
    for cylinder in 0..tracks {
        for side in 0..sides {
            with_retries(driver, MAX_RETRIES, |d| d.seek_track(cylinder))?;
            let mut header = with_retries(driver, MAX_RETRIES, |d| d.read_sector_ids(cylinder, side))?;
            header.track_number = cylinder;
            header.side_number = side;
            header.sectors.truncate(crate::format::MAX_SECTORS_PER_TRACK);
            if let Some(first) = header.sectors.first() {
                header.sector_size_code = first.id.size_code;
            }

            let mut payload = Vec::new();
            let descriptors: Vec<SectorInfo> = header.sectors.clone();
            for (position, sector) in descriptors.iter().enumerate() {
                let mut buffer = vec![0u8; sector.advertised_size()];
                with_retries(driver, MAX_RETRIES, |d| {
                    d.seek_track(cylinder)?;
                    d.read_sector(&header, position, &mut buffer)
                })?;
                payload.extend_from_slice(&buffer);
            }
            for sector in &mut header.sectors {
                sector.data_length = 0;
            }
            debug!(
                "Read track {} side {}: {} sectors",
                cylinder,
                side,
                header.sector_count()
            );
            read.push((header, payload));
        }
    }

    crate::io::writer::build_standard_dsk(tracks, sides, &read)
}
