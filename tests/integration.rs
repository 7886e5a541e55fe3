/// Integration tests for the DSK container

use amsdsk::*;

#[test]
fn test_create_and_save_image() {
    let spec = FormatSpec::amstrad_data();
    let mut image = DiskImage::create(spec).expect("Failed to create image");

    assert_eq!(image.format(), DiskImageFormat::StandardDSK);
    assert_eq!(image.track_count(), 40);
    assert!(image.is_changed());

    let data = image.read_sector_by_id(0, 0, 0xC1).expect("Failed to read sector");
    assert_eq!(data.len(), 512);
    assert!(data.iter().all(|&b| b == 0xE5));

    let test_data = vec![0x42; 512];
    image
        .write_sector_by_id(0, 0, 0xC1, &test_data)
        .expect("Failed to write sector");
    let read_data = image.read_sector_by_id(0, 0, 0xC1).expect("Failed to read sector");
    assert_eq!(read_data, test_data.as_slice());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.dsk");
    image.save(&path).expect("Failed to save image");
    assert!(!image.is_changed());

    let reloaded = DiskImage::open(&path).expect("Failed to reopen image");
    assert_eq!(reloaded.read_sector_by_id(0, 0, 0xC1).unwrap(), test_data.as_slice());
    assert_eq!(reloaded.filename(), Some(path.display().to_string().as_str()));
}

#[test]
fn test_image_builder() {
    let image = DiskImage::builder()
        .format(DiskImageFormat::ExtendedDSK)
        .num_sides(2)
        .num_tracks(40)
        .sectors_per_track(9)
        .sector_size(512)
        .build()
        .expect("Failed to build image");

    assert_eq!(image.format(), DiskImageFormat::ExtendedDSK);
    assert_eq!(image.num_sides(), 2);
    assert_eq!(image.track_count(), 80);

    for index in 0..image.track_count() {
        let track = image.track(index).expect("Failed to get track");
        assert_eq!(track.sector_count(), 9);
        assert_eq!(track.track_number as usize, index / 2);
        assert_eq!(track.side_number as usize, index % 2);
    }
}

#[test]
fn test_round_trip_both_variants() {
    let dir = tempfile::tempdir().unwrap();
    for format in [DiskImageFormat::StandardDSK, DiskImageFormat::ExtendedDSK] {
        let mut image = DiskImage::builder()
            .format(format)
            .num_tracks(42)
            .build()
            .expect("Failed to build image");
        image.write_sector(17, &[0x99; 512]).unwrap();

        let path = dir.path().join(format!("{}.dsk", format.name()));
        image.save(&path).unwrap();
        let original = std::fs::read(&path).unwrap();

        let mut reloaded = DiskImage::open(&path).unwrap();
        let copy = dir.path().join("copy.dsk");
        reloaded.save(&copy).unwrap();
        assert_eq!(std::fs::read(&copy).unwrap(), original);
        assert_eq!(reloaded.format(), format);
    }
}

#[test]
fn test_extended_image_with_unformatted_track() {
    use amsdsk::format::{DISK_INFO_BLOCK_SIZE, DISK_INFO_EXT_TRACK_SIZE_OFFSET};

    let mut image = DiskImage::builder()
        .format(DiskImageFormat::ExtendedDSK)
        .num_tracks(3)
        .build()
        .unwrap();
    image.write_sector_by_id(2, 0, 0xC3, &[0x3C; 512]).unwrap();
    let track_size = 256 + 9 * 512;

    // Mark track 1 unformatted and drop its bytes
    let mut bytes = image.to_bytes();
    assert_eq!(bytes[DISK_INFO_EXT_TRACK_SIZE_OFFSET + 1] as usize, track_size >> 8);
    bytes[DISK_INFO_EXT_TRACK_SIZE_OFFSET + 1] = 0;
    let start = DISK_INFO_BLOCK_SIZE + track_size;
    bytes.drain(start..start + track_size);

    let image = DiskImage::from_bytes(&bytes).unwrap();
    assert_eq!(image.to_bytes(), bytes);
    assert_eq!(image.track_size(1), Some(0));
    assert_eq!(image.track(1).unwrap().sector_count(), 0);
    assert_eq!(image.track(2).unwrap().sector_count(), 9);
    assert_eq!(image.capacity().unwrap(), 2 * 9 * 512);
    assert_eq!(image.logical_sector_count().unwrap(), 18);

    assert_eq!(image.read_sector_by_id(2, 0, 0xC3).unwrap(), &[0x3C; 512][..]);
    assert_eq!(image.sector_data(11).unwrap(), &[0x3C; 512][..]);
    assert_eq!(image.sector_offset(2, 0, 0xC1).unwrap(), track_size + 256);
    assert!(matches!(
        image.read_sector_by_id(1, 0, 0xC1),
        Err(DskError::InvalidSector { track: 1, .. })
    ));
}

#[test]
fn test_disk_type_classification() {
    let cases = [
        (FormatSpec::amstrad_data(), DiskType::Data, 0),
        (FormatSpec::amstrad_ibm(), DiskType::Ibm, 1),
        (FormatSpec::amstrad_system(), DiskType::System, 2),
    ];
    for (spec, expected, reserved) in cases {
        let image = DiskImage::create(spec).unwrap();
        let disk_type = image.disk_type().unwrap();
        assert_eq!(disk_type, expected);
        assert_eq!(disk_type.reserved_tracks(), reserved);
    }

    let odd = DiskImage::builder().first_sector_id(0x10).build().unwrap();
    assert_eq!(odd.disk_type().unwrap(), DiskType::Unknown);
}

#[test]
fn test_format_specs() {
    let system = FormatSpec::amstrad_system();
    assert_eq!(system.num_sides, 1);
    assert_eq!(system.num_tracks, 40);
    assert_eq!(system.sectors_per_track, 9);
    assert_eq!(system.total_capacity(), 180 * 1024);

    let ibm = FormatSpec::amstrad_ibm();
    assert_eq!(ibm.first_sector_id, 0x01);
    assert_eq!(ibm.sectors_per_track, 8);

    let spec = FormatSpec::new(2, 80, 9, 512);
    assert_eq!(spec.total_capacity(), 2 * 80 * 9 * 512);
    let image = DiskImage::create(spec).unwrap();
    assert_eq!(image.capacity().unwrap(), 2 * 80 * 9 * 512);
}

#[test]
fn test_interleaved_sectors() {
    let image = DiskImage::builder().interleave(2).build().unwrap();
    let ids: Vec<u8> = image
        .track(0)
        .unwrap()
        .sectors()
        .iter()
        .map(SectorInfo::sector_id)
        .collect();
    assert_eq!(ids, vec![0xC1, 0xC6, 0xC2, 0xC7, 0xC3, 0xC8, 0xC4, 0xC9, 0xC5]);

    // Stored order decides the offset, the id decides the logical number
    assert_eq!(image.sector_offset(0, 0, 0xC2).unwrap(), 256 + 2 * 512);
    assert_eq!(
        image.sector_offset_by_logical(1).unwrap(),
        image.sector_offset(0, 0, 0xC2).unwrap()
    );
}

#[test]
fn test_fdc_status() {
    let st1 = FdcStatus1::new(FdcStatus1::DE | FdcStatus1::EN);
    assert!(st1.data_error());
    assert!(st1.contains(FdcStatus1::EN));
    assert!(!st1.no_data());
    assert!(st1.has_error());

    let st2 = FdcStatus2::new(FdcStatus2::CM);
    assert!(st2.is_deleted());
    assert!(!st2.has_error());
}

#[test]
fn test_error_handling() {
    let image = DiskImage::builder()
        .num_sides(1)
        .num_tracks(10)
        .build()
        .expect("Failed to build image");

    assert!(matches!(image.track(10), Err(DskError::InvalidTrack { .. })));
    assert!(matches!(
        image.read_sector_by_id(50, 0, 0xC1),
        Err(DskError::InvalidSector { track: 50, .. })
    ));
    assert!(matches!(
        image.read_sector_by_id(0, 0, 0xFF),
        Err(DskError::InvalidSector { .. })
    ));
    assert_eq!(
        image.read_sector_by_id(0, 0, 0xFF).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_rejects_bad_images() {
    assert!(matches!(
        DiskImage::from_bytes(&[0u8; 100]),
        Err(DskError::ParseError { .. })
    ));

    let mut bytes = DiskImage::builder().num_tracks(2).build().unwrap().to_bytes();
    bytes[0] = b'X';
    let err = DiskImage::from_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    let bytes = DiskImage::builder().num_tracks(2).build().unwrap().to_bytes();
    let err = DiskImage::from_bytes(&bytes[..bytes.len() - 10]).unwrap_err();
    assert!(matches!(err, DskError::InvalidFormat(_)));
}

#[test]
fn test_memory_drive_transfer() {
    let mut fs = Amsdos::format(FormatSpec::amstrad_data()).unwrap();
    fs.add_file(&[0x21; 5000], "DATA.BIN", 0, None).unwrap();

    let mut drive = MemoryDrive::new();
    drive.inject_faults(3);
    fs.image().write_to_device(&mut drive).unwrap();
    assert_eq!(drive.formatted_tracks(), 40);
    assert!(drive.recalibrations() >= 3);

    let copy = DiskImage::read_from_device(&mut drive, 40, 1).unwrap();
    assert_eq!(copy.format(), DiskImageFormat::StandardDSK);
    let copy = Amsdos::new(copy).unwrap();
    assert_eq!(&copy.read_file("DATA.BIN", 0).unwrap()[..5000], &[0x21; 5000][..]);
}
