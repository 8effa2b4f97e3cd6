use super::*;
use std::time::Duration;
use tempfile::TempDir;

fn missing_tools() -> ToolCommands {
    ToolCommands {
        ar: "assetlift-missing-ar".into(),
        tar: "assetlift-missing-tar".into(),
        rpm2cpio: "assetlift-missing-rpm2cpio".into(),
        cpio: "assetlift-missing-cpio".into(),
        hdiutil: "assetlift-missing-hdiutil".into(),
        seven_zip: "assetlift-missing-7z".into(),
    }
}

fn fake_container(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"not really an installer").unwrap();
    path
}

fn tracker() -> Arc<EphemeralTracker> {
    Arc::new(EphemeralTracker::new(Duration::from_secs(3600)))
}

#[test]
fn test_platform_detect_and_names() {
    let platform = Platform::detect();
    assert!(matches!(
        platform,
        Platform::MacOS | Platform::Windows | Platform::Posix
    ));
    assert_eq!(Platform::MacOS.name(), "macOS");
    assert_eq!(Platform::Windows.name(), "Windows");
}

#[test]
fn test_factory_selects_per_platform() {
    let t = tracker();
    assert_eq!(
        create_toolchain(Platform::Posix, ToolCommands::default(), t.clone()).name(),
        "posix"
    );
    assert_eq!(
        create_toolchain(Platform::MacOS, ToolCommands::default(), t.clone()).name(),
        "macos"
    );
    assert_eq!(
        create_toolchain(Platform::Windows, ToolCommands::default(), t).name(),
        "windows"
    );
}

#[test]
fn test_posix_refuses_disk_images() {
    let tmp = TempDir::new().unwrap();
    let dmg = fake_container(tmp.path(), "App.dmg");
    let chain = create_toolchain(Platform::Posix, missing_tools(), tracker());

    let err = chain
        .unpack(ContainerFormat::DiskImage, &dmg, &tmp.path().join("out"))
        .unwrap_err();
    match err {
        UnpackFailure::ToolMissing { tool } => assert_eq!(tool, "assetlift-missing-hdiutil"),
        other => panic!("Expected ToolMissing, got {other:?}"),
    }
}

#[test]
fn test_deb_with_missing_ar_cleans_work_dir() {
    let tmp = TempDir::new().unwrap();
    let deb = fake_container(tmp.path(), "app.deb");
    let dest_parent = tmp.path().join("scratch");
    fs::create_dir(&dest_parent).unwrap();
    let t = tracker();
    let chain = create_toolchain(Platform::Posix, missing_tools(), t.clone());

    let err = chain
        .unpack(ContainerFormat::Deb, &deb, &dest_parent.join("unpacked"))
        .unwrap_err();
    assert!(matches!(err, UnpackFailure::ToolMissing { ref tool } if tool == "assetlift-missing-ar"));

    let leftovers: Vec<_> = fs::read_dir(&dest_parent).unwrap().collect();
    assert!(leftovers.is_empty(), "work dir should be removed");
    assert!(t.is_empty());
}

#[test]
fn test_rpm_with_missing_rpm2cpio() {
    let tmp = TempDir::new().unwrap();
    let rpm = fake_container(tmp.path(), "app.rpm");
    let chain = create_toolchain(Platform::Posix, missing_tools(), tracker());

    let err = chain
        .unpack(ContainerFormat::Rpm, &rpm, &tmp.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, UnpackFailure::ToolMissing { ref tool } if tool == "assetlift-missing-rpm2cpio"));
}

#[test]
fn test_windows_installer_with_missing_7z() {
    let tmp = TempDir::new().unwrap();
    let exe = fake_container(tmp.path(), "Setup.exe");
    for platform in [Platform::Posix, Platform::MacOS, Platform::Windows] {
        let chain = create_toolchain(platform, missing_tools(), tracker());
        let err = chain
            .unpack(ContainerFormat::WindowsInstaller, &exe, &tmp.path().join("out"))
            .unwrap_err();
        assert!(matches!(err, UnpackFailure::ToolMissing { .. }));
    }
}

#[cfg(unix)]
#[test]
fn test_non_zero_exit_reports_tool_and_status() {
    let tmp = TempDir::new().unwrap();
    let exe = fake_container(tmp.path(), "Setup.exe");
    let tools = ToolCommands {
        seven_zip: "false".into(),
        ..ToolCommands::default()
    };
    let chain = create_toolchain(Platform::Posix, tools, tracker());

    let err = chain
        .unpack(ContainerFormat::WindowsInstaller, &exe, &tmp.path().join("out"))
        .unwrap_err();
    match err {
        UnpackFailure::ToolExit { tool, status, .. } => {
            assert_eq!(tool, "false");
            assert!(status.contains('1'));
        }
        other => panic!("Expected ToolExit, got {other:?}"),
    }
}

#[test]
fn test_zip_formats_are_not_installers() {
    let tmp = TempDir::new().unwrap();
    let zip = fake_container(tmp.path(), "app.zip");
    let chain = create_toolchain(Platform::Posix, ToolCommands::default(), tracker());
    assert!(matches!(
        chain.unpack(ContainerFormat::Zip, &zip, &tmp.path().join("out")),
        Err(UnpackFailure::CorruptArchive(_))
    ));
}

#[test]
fn test_payload_archive_names() {
    assert!(is_payload_archive(Path::new("/w/data.tar.xz")));
    assert!(is_payload_archive(Path::new("/w/app-1.0.cpio")));
    assert!(is_payload_archive(Path::new("/w/Payload.TAR")));
    assert!(!is_payload_archive(Path::new("/w/control.json")));
}

#[test]
fn test_work_dir_is_not_swept_while_alive() {
    let tmp = TempDir::new().unwrap();
    let dest = tmp.path().join("unpacked");
    let tracker = EphemeralTracker::new(Duration::ZERO);

    let work = WorkDir::create(&dest, "deb", &tracker).unwrap();
    let path = work.path.clone();
    fs::write(path.join("data.tar.xz"), b"in progress").unwrap();

    assert_eq!(tracker.cleanup_older_than(Duration::ZERO), 0);
    assert!(path.join("data.tar.xz").is_file());
    assert!(tracker.is_tracked(&path));

    drop(work);
    assert!(!path.exists());
    assert!(!tracker.is_tracked(&path));
}
