//! Installer unpacking through native tools.
//!
//! Each platform family gets one implementation, selected once by
//! [`create_toolchain`]:
//! - Linux/other Unix: `ar`+`tar` for .deb, `rpm2cpio | cpio` for .rpm,
//!   `7z` for .exe. Disk images need `hdiutil` and are refused.
//! - macOS: as above, plus .dmg mounted with `hdiutil`.
//! - Windows: everything through `7z`, unwrapping one nested payload.

use super::tools::{path_arg, run_piped, run_tool};
use super::types::ContainerFormat;
use crate::services::config::ToolCommands;
use crate::services::fs_utils::file_utils;
use crate::services::scanner::ephemeral::{EphemeralTracker, MOUNT_DIR_PREFIX};
use crate::types::UnpackFailure;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Detected platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Windows,
    /// Linux and any other Unix-like system
    Posix,
}

impl Platform {
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOS,
            "windows" => Platform::Windows,
            _ => Platform::Posix,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::MacOS => "macOS",
            Platform::Windows => "Windows",
            Platform::Posix => "Posix",
        }
    }
}

/// Unpacks installer-family containers into a destination directory.
pub trait InstallerToolchain: Send + Sync {
    fn name(&self) -> &'static str;

    fn unpack(
        &self,
        format: ContainerFormat,
        container: &Path,
        dest: &Path,
    ) -> Result<(), UnpackFailure>;
}

pub fn create_toolchain(
    platform: Platform,
    tools: ToolCommands,
    tracker: Arc<EphemeralTracker>,
) -> Box<dyn InstallerToolchain> {
    match platform {
        Platform::MacOS => Box::new(MacOsToolchain { tools, tracker }),
        Platform::Windows => Box::new(WindowsToolchain { tools, tracker }),
        Platform::Posix => Box::new(PosixToolchain { tools, tracker }),
    }
}

// ─── Posix ─────────────────────────────────────────────────────────

pub struct PosixToolchain {
    tools: ToolCommands,
    tracker: Arc<EphemeralTracker>,
}

impl InstallerToolchain for PosixToolchain {
    fn name(&self) -> &'static str {
        "posix"
    }

    fn unpack(
        &self,
        format: ContainerFormat,
        container: &Path,
        dest: &Path,
    ) -> Result<(), UnpackFailure> {
        match format {
            ContainerFormat::Deb => unpack_deb(&self.tools, &self.tracker, container, dest),
            ContainerFormat::Rpm => unpack_rpm(&self.tools, container, dest),
            ContainerFormat::WindowsInstaller => seven_zip_extract(&self.tools, container, dest),
            ContainerFormat::DiskImage => Err(UnpackFailure::ToolMissing {
                tool: self.tools.hdiutil.clone(),
            }),
            ContainerFormat::Zip | ContainerFormat::Asar => Err(not_an_installer(format)),
        }
    }
}

// ─── macOS ─────────────────────────────────────────────────────────

pub struct MacOsToolchain {
    tools: ToolCommands,
    tracker: Arc<EphemeralTracker>,
}

impl InstallerToolchain for MacOsToolchain {
    fn name(&self) -> &'static str {
        "macos"
    }

    fn unpack(
        &self,
        format: ContainerFormat,
        container: &Path,
        dest: &Path,
    ) -> Result<(), UnpackFailure> {
        match format {
            ContainerFormat::DiskImage => unpack_dmg(&self.tools, &self.tracker, container, dest),
            ContainerFormat::Deb => unpack_deb(&self.tools, &self.tracker, container, dest),
            ContainerFormat::Rpm => unpack_rpm(&self.tools, container, dest),
            ContainerFormat::WindowsInstaller => seven_zip_extract(&self.tools, container, dest),
            ContainerFormat::Zip | ContainerFormat::Asar => Err(not_an_installer(format)),
        }
    }
}

// ─── Windows ───────────────────────────────────────────────────────

pub struct WindowsToolchain {
    tools: ToolCommands,
    tracker: Arc<EphemeralTracker>,
}

impl InstallerToolchain for WindowsToolchain {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn unpack(
        &self,
        format: ContainerFormat,
        container: &Path,
        dest: &Path,
    ) -> Result<(), UnpackFailure> {
        match format {
            ContainerFormat::WindowsInstaller => seven_zip_extract(&self.tools, container, dest),
            ContainerFormat::Deb | ContainerFormat::Rpm | ContainerFormat::DiskImage => {
                seven_zip_nested(&self.tools, &self.tracker, container, dest)
            }
            ContainerFormat::Zip | ContainerFormat::Asar => Err(not_an_installer(format)),
        }
    }
}

// ─── Shared steps ──────────────────────────────────────────────────

fn not_an_installer(format: ContainerFormat) -> UnpackFailure {
    UnpackFailure::CorruptArchive(format!(
        "{} containers are not handled by installer toolchains",
        format.tag()
    ))
}

/// Scratch directory beside `dest`. Pinned in the tracker while the guard
/// lives; left unpinned for the sweeper if removal fails.
struct WorkDir<'a> {
    path: PathBuf,
    tracker: &'a EphemeralTracker,
}

impl<'a> WorkDir<'a> {
    fn create(dest: &Path, label: &str, tracker: &'a EphemeralTracker) -> Result<Self, UnpackFailure> {
        let parent = dest.parent().unwrap_or(dest);
        let path = parent.join(format!(".{label}-work-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&path).map_err(|e| UnpackFailure::dest_write(&path, e))?;
        tracker.register_pinned(&path);
        Ok(Self { path, tracker })
    }
}

impl Drop for WorkDir<'_> {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            log::warn!("Failed to remove work dir {}: {e}", self.path.display());
            self.tracker.unpin(&self.path);
            return;
        }
        self.tracker.unregister(&self.path);
    }
}

/// `ar x` the package, then untar its `data.tar.*` member into `dest`.
fn unpack_deb(
    tools: &ToolCommands,
    tracker: &EphemeralTracker,
    container: &Path,
    dest: &Path,
) -> Result<(), UnpackFailure> {
    let work = WorkDir::create(dest, "deb", tracker)?;
    let container = absolute(container);
    run_tool(&tools.ar, &["x", path_arg(&container)?], Some(&work.path))?;

    let data_tar = fs::read_dir(&work.path)
        .map_err(|e| UnpackFailure::io("Failed to list deb members", e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("data.tar"))
                .unwrap_or(false)
        })
        .ok_or_else(|| UnpackFailure::CorruptArchive("deb package has no data.tar member".into()))?;

    fs::create_dir_all(dest).map_err(|e| UnpackFailure::dest_write(dest, e))?;
    run_tool(
        &tools.tar,
        &["-xf", path_arg(&data_tar)?, "-C", path_arg(dest)?],
        None,
    )
}

/// `rpm2cpio <pkg> | cpio -idm` inside `dest`.
fn unpack_rpm(tools: &ToolCommands, container: &Path, dest: &Path) -> Result<(), UnpackFailure> {
    fs::create_dir_all(dest).map_err(|e| UnpackFailure::dest_write(dest, e))?;
    let container = absolute(container);
    run_piped(
        (tools.rpm2cpio.as_str(), &[path_arg(&container)?]),
        (tools.cpio.as_str(), &["-idm", "--quiet"]),
        dest,
    )
}

fn seven_zip_extract(
    tools: &ToolCommands,
    container: &Path,
    dest: &Path,
) -> Result<(), UnpackFailure> {
    fs::create_dir_all(dest).map_err(|e| UnpackFailure::dest_write(dest, e))?;
    let out_flag = format!("-o{}", path_arg(dest)?);
    run_tool(
        &tools.seven_zip,
        &["x", "-y", &out_flag, path_arg(container)?],
        None,
    )
}

/// Extract with `7z`, and if the result is a single payload archive
/// (`data.tar.*`, `*.cpio`, `*.tar`), extract that too.
fn seven_zip_nested(
    tools: &ToolCommands,
    tracker: &EphemeralTracker,
    container: &Path,
    dest: &Path,
) -> Result<(), UnpackFailure> {
    let work = WorkDir::create(dest, "7z", tracker)?;
    seven_zip_extract(tools, container, &work.path)?;

    let payload = fs::read_dir(&work.path)
        .map_err(|e| UnpackFailure::io("Failed to list 7z output", e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| is_payload_archive(p));

    match payload {
        Some(inner) => seven_zip_extract(tools, &inner, dest),
        None => copy_tree(&work.path, dest),
    }
}

fn is_payload_archive(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy().to_lowercase(),
        None => return false,
    };
    name.starts_with("data.tar") || name.ends_with(".cpio") || name.ends_with(".tar")
}

/// Mount read-only at a unique tracked mount point, copy, always detach.
fn unpack_dmg(
    tools: &ToolCommands,
    tracker: &EphemeralTracker,
    container: &Path,
    dest: &Path,
) -> Result<(), UnpackFailure> {
    let mount_point =
        std::env::temp_dir().join(format!("{MOUNT_DIR_PREFIX}{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&mount_point).map_err(|e| UnpackFailure::dest_write(&mount_point, e))?;
    tracker.register_pinned(&mount_point);

    let attached = run_tool(
        &tools.hdiutil,
        &[
            "attach",
            "-nobrowse",
            "-readonly",
            "-noautoopen",
            "-mountpoint",
            path_arg(&mount_point)?,
            path_arg(container)?,
        ],
        None,
    );
    if let Err(e) = attached {
        let _ = fs::remove_dir(&mount_point);
        tracker.unregister(&mount_point);
        return Err(e);
    }

    let _mount = MountGuard {
        tool: &tools.hdiutil,
        mount_point: &mount_point,
        tracker,
    };
    copy_tree(&mount_point, dest)
}

struct MountGuard<'a> {
    tool: &'a str,
    mount_point: &'a Path,
    tracker: &'a EphemeralTracker,
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        let mp = match self.mount_point.to_str() {
            Some(s) => s,
            None => return,
        };
        if let Err(e) = run_tool(self.tool, &["detach", mp], None) {
            log::warn!("Detach failed ({e}); forcing");
            if let Err(e) = run_tool(self.tool, &["detach", "-force", mp], None) {
                // Left tracked so the sweeper retries later.
                log::error!("Failed to detach {}: {e}", self.mount_point.display());
                self.tracker.unpin(self.mount_point);
                return;
            }
        }
        let _ = fs::remove_dir(self.mount_point);
        self.tracker.unregister(self.mount_point);
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), UnpackFailure> {
    file_utils::copy_dir_contents(from, to).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => UnpackFailure::PermissionDenied(to.to_path_buf()),
        _ => UnpackFailure::io("Failed to copy unpacked tree", e),
    })
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "tests/toolchain_tests.rs"]
mod tests;
