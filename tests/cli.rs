use assert_cmd::Command;
use predicates::prelude::*;
type STDRESULT = Result<(), Box<dyn std::error::Error>>;

fn dsk() -> Command {
    let mut cmd = Command::cargo_bin("dsk").expect("dsk binary");
    cmd.env("DSK_LOG", "off");
    cmd
}

#[test]
fn create_and_info() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("blank.dsk");
    dsk().arg("create").arg(&img).assert().success();
    dsk()
        .arg("info")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("Disk type\t: DATA"))
        .stdout(predicate::str::contains("First sector id\t: 0xC1"))
        .stdout(predicate::str::contains("Used\t\t:      0 bytes"));
    Ok(())
}

#[test]
fn create_extended_system() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("system.dsk");
    dsk()
        .arg("create")
        .arg(&img)
        .arg("--type")
        .arg("system")
        .arg("--extended")
        .arg("--sides")
        .arg("2")
        .assert()
        .success();
    dsk()
        .arg("info")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("DSK type\t: EDSK"))
        .stdout(predicate::str::contains("Disk type\t: SYSTEM"))
        .stdout(predicate::str::contains("Sides\t\t:    2"));
    Ok(())
}

#[test]
fn add_list_export_delete() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("work.dsk");
    let host = dir.path().join("test.bin");
    let data: Vec<u8> = (0..3000).map(|i| (i % 256) as u8).collect();
    std::fs::write(&host, &data)?;

    dsk().arg("create").arg(&img).assert().success();
    dsk().arg("add").arg(&img).arg(&host).assert().success();
    dsk()
        .arg("list")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("TEST.BIN (user 0)   3072 bytes"));

    let out = dir.path().join("out.bin");
    dsk()
        .arg("export")
        .arg(&img)
        .arg("test.bin")
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    let exported = std::fs::read(&out)?;
    assert_eq!(&exported[..3000], data.as_slice());

    dsk().arg("delete").arg(&img).arg("TEST.BIN").assert().success();
    dsk()
        .arg("list")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    Ok(())
}

#[test]
fn add_binary_with_addresses() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("bin.dsk");
    let host = dir.path().join("code.bin");
    std::fs::write(&host, [0xC9u8; 100])?;

    dsk().arg("create").arg(&img).assert().success();
    dsk()
        .arg("add")
        .arg(&img)
        .arg(&host)
        .arg("--binary")
        .arg("--load")
        .arg("0x8000")
        .arg("-u")
        .arg("2")
        .assert()
        .success();
    dsk()
        .arg("list")
        .arg(&img)
        .assert()
        .success()
        .stdout(predicate::str::contains("CODE.BIN (user 2)    256 bytes"));
    Ok(())
}

#[test]
fn add_to_output_leaves_source_image() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("src.dsk");
    let copy = dir.path().join("dst.dsk");
    let host = dir.path().join("note.txt");
    std::fs::write(&host, b"note")?;

    dsk().arg("create").arg(&img).assert().success();
    dsk().arg("add").arg(&img).arg(&host).arg("-o").arg(&copy).assert().success();
    dsk().arg("list").arg(&img).assert().success().stdout(predicate::str::is_empty());
    dsk()
        .arg("list")
        .arg(&copy)
        .assert()
        .success()
        .stdout(predicate::str::contains("NOTE.TXT"));
    Ok(())
}

#[test]
fn duplicate_add_fails() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("dup.dsk");
    let host = dir.path().join("a.txt");
    std::fs::write(&host, b"a")?;

    dsk().arg("create").arg(&img).assert().success();
    dsk().arg("add").arg(&img).arg(&host).assert().success();
    dsk()
        .arg("add")
        .arg(&img)
        .arg(&host)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to add"))
        .stderr(predicate::str::contains("already exists"));
    Ok(())
}

#[test]
fn user_out_of_range_is_rejected() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("users.dsk");
    let host = dir.path().join("secret.bin");
    std::fs::write(&host, [0x11u8; 2000])?;

    dsk().arg("create").arg(&img).assert().success();
    let before = std::fs::read(&img)?;
    dsk()
        .arg("add")
        .arg(&img)
        .arg(&host)
        .arg("-u")
        .arg("229")
        .assert()
        .failure()
        .stderr(predicate::str::contains("229"));
    assert_eq!(std::fs::read(&img)?, before);
    Ok(())
}

#[test]
fn export_missing_file_fails() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("empty.dsk");
    dsk().arg("create").arg(&img).assert().success();
    dsk()
        .arg("export")
        .arg(&img)
        .arg("NOPE.BIN")
        .arg("-o")
        .arg(dir.path().join("nope.bin"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found: NOPE.BIN"));
    Ok(())
}

#[test]
fn bad_image_fails() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("garbage.dsk");
    std::fs::write(&img, vec![0u8; 1024])?;
    dsk()
        .arg("list")
        .arg(&img)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unable to open DSK image"));
    Ok(())
}

#[test]
fn device_is_unsupported() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("dev.dsk");
    dsk().arg("create").arg(&img).assert().success();
    dsk()
        .arg("write-device")
        .arg(&img)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported platform"));
    Ok(())
}

#[test]
fn log_file_is_appended() -> STDRESULT {
    let dir = tempfile::tempdir()?;
    let img = dir.path().join("log.dsk");
    let log = dir.path().join("dsk.log");
    dsk()
        .env("DSK_LOG", "info")
        .env("DSK_LOGFILE", &log)
        .arg("create")
        .arg(&img)
        .assert()
        .success();
    dsk()
        .env("DSK_LOG", "info")
        .env("DSK_LOGFILE", &log)
        .arg("list")
        .arg(&img)
        .assert()
        .success();
    let text = std::fs::read_to_string(&log)?;
    assert!(text.contains("[INFO]["));
    assert!(text.lines().any(|l| l.contains("Opened")));
    Ok(())
}
