use crate::error::SortError;
use crate::metadata::Timestamp;
use crate::outcome::Outcome;
use log::{debug, warn};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const STAGING_PREFIX: &str = ".photo_sorter_tmp_";

/// `<output_dir>/<YYYYMMDD-HHMMSS>_<file name>`; the file name is kept as is.
pub fn target_path(source: &Path, output_dir: &Path, ts: &Timestamp) -> Result<PathBuf, SortError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| SortError::MissingFileName {
            path: source.to_path_buf(),
        })?;
    let mut name = OsString::from(format!("{}_", ts.file_prefix()));
    name.push(file_name);
    Ok(output_dir.join(name))
}

/// Moves `source` into `output_dir` under its timestamped name.
///
/// An existing target is never replaced; in that case both files are left
/// untouched and the outcome is `SkippedExists`.
pub fn place(source: &Path, output_dir: &Path, ts: &Timestamp) -> Outcome {
    let target = match target_path(source, output_dir, ts) {
        Ok(target) => target,
        Err(err) => return Outcome::failed(source, None, &err),
    };

    match move_without_replacing(source, &target) {
        Ok(()) => Outcome::moved(source, target),
        Err(err) if err.is_already_exists() => Outcome::skipped_exists(source, target),
        Err(err) => Outcome::failed(source, Some(target), &err),
    }
}

/// Next step after a move primitive failed with something other than
/// "target exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Link,
    Copy,
    Fail,
}

fn after_rename_error(err: &io::Error) -> Fallback {
    if is_cross_device(err) {
        Fallback::Copy
    } else if is_unsupported(err) || is_refused(err) {
        Fallback::Link
    } else {
        Fallback::Fail
    }
}

fn after_link_error(err: &io::Error) -> Fallback {
    if is_cross_device(err) || is_unsupported(err) || is_refused(err) {
        Fallback::Copy
    } else {
        Fallback::Fail
    }
}

#[cfg(unix)]
fn errno_in(err: &io::Error, codes: &[i32]) -> bool {
    err.raw_os_error().is_some_and(|code| codes.contains(&code))
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    errno_in(err, &[libc::EXDEV])
}

#[cfg(unix)]
fn is_unsupported(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::Unsupported
        || errno_in(
            err,
            &[libc::EINVAL, libc::ENOSYS, libc::ENOTSUP, libc::EOPNOTSUPP],
        )
}

/// vfat and some network mounts answer link(2) with EPERM.
#[cfg(unix)]
fn is_refused(err: &io::Error) -> bool {
    errno_in(err, &[libc::EPERM, libc::EMLINK])
}

#[cfg(not(unix))]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(unix))]
fn is_unsupported(err: &io::Error) -> bool {
    // ERROR_INVALID_FUNCTION is what FAT volumes return for hard links
    err.kind() == io::ErrorKind::Unsupported || err.raw_os_error() == Some(1)
}

#[cfg(not(unix))]
fn is_refused(_err: &io::Error) -> bool {
    false
}

/// Single rename that fails with `AlreadyExists` instead of replacing `to`.
#[cfg(target_os = "linux")]
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    const RENAME_NOREPLACE: libc::c_uint = 1;

    let from = CString::new(from.as_os_str().as_bytes())?;
    let to = CString::new(to.as_os_str().as_bytes())?;
    // SAFETY: both pointers are NUL-terminated and outlive the call.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_renameat2,
            libc::AT_FDCWD,
            from.as_ptr(),
            libc::AT_FDCWD,
            to.as_ptr(),
            RENAME_NOREPLACE,
        )
    };
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
fn rename_no_replace(_from: &Path, _to: &Path) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

fn move_without_replacing(source: &Path, target: &Path) -> Result<(), SortError> {
    let err = match rename_no_replace(source, target) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    if err.kind() == io::ErrorKind::AlreadyExists {
        return Err(SortError::io(target, err));
    }

    match after_rename_error(&err) {
        Fallback::Fail => Err(SortError::io(source, err)),
        Fallback::Copy => {
            debug!("{} is on another volume, copying", target.display());
            copy_then_remove(source, target)
        }
        Fallback::Link => {
            debug!("no-replace rename unavailable ({err}), linking {}", source.display());
            link_then_remove(source, target)
        }
    }
}

/// link(2) refuses to replace an existing entry, unlike a plain rename(2).
fn link_then_remove(source: &Path, target: &Path) -> Result<(), SortError> {
    match fs::hard_link(source, target) {
        Ok(()) => remove_source(source, target),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(SortError::io(target, err)),
        Err(err) => match after_link_error(&err) {
            Fallback::Fail => Err(SortError::io(source, err)),
            Fallback::Link | Fallback::Copy => {
                debug!("hard link to {} failed ({err}), copying", target.display());
                copy_then_remove(source, target)
            }
        },
    }
}

/// Drops the original once the target exists. If that fails the new
/// target is removed again so the file is not left in two places.
fn remove_source(source: &Path, target: &Path) -> Result<(), SortError> {
    if let Err(err) = fs::remove_file(source) {
        if let Err(rollback_err) = fs::remove_file(target) {
            warn!(
                "could not roll back {} after failing to remove {}: {rollback_err}",
                target.display(),
                source.display()
            );
        }
        return Err(SortError::io(source, err));
    }
    Ok(())
}

/// Cross-volume path: the data is copied to a hidden staging file next to
/// the target first, so the target name only ever appears fully written.
fn copy_then_remove(source: &Path, target: &Path) -> Result<(), SortError> {
    let output_dir = target.parent().unwrap_or_else(|| Path::new("."));
    let staging = staging_path_for(output_dir, source);

    let published =
        copy_to_staging(source, &staging, output_dir).and_then(|()| publish(&staging, target));

    if let Err(err) = fs::remove_file(&staging) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("could not remove staging file {}: {err}", staging.display());
        }
    }

    published?;
    remove_source(source, target)
}

/// Gives the staged copy its final name without replacing anything.
fn publish(staging: &Path, target: &Path) -> Result<(), SortError> {
    match rename_no_replace(staging, target) {
        Ok(()) => return Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(SortError::io(target, err));
        }
        Err(err) if after_rename_error(&err) == Fallback::Fail => {
            return Err(SortError::io(target, err));
        }
        Err(_) => {}
    }

    match fs::hard_link(staging, target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(SortError::io(target, err)),
        Err(err) if after_link_error(&err) == Fallback::Fail => Err(SortError::io(target, err)),
        Err(_) => copy_into_new(staging, target),
    }
}

/// Last resort on filesystems without links. The target is created
/// exclusively and deleted again if the copy does not complete.
fn copy_into_new(from: &Path, target: &Path) -> Result<(), SortError> {
    let mut input = File::open(from).map_err(|err| SortError::io(from, err))?;
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .map_err(|err| SortError::io(target, err))?;

    let copied = io::copy(&mut input, &mut output)
        .and_then(|_| output.sync_all())
        .and_then(|()| input.metadata())
        .and_then(|meta| fs::set_permissions(target, meta.permissions()));
    if let Err(err) = copied {
        drop(output);
        if let Err(cleanup_err) = fs::remove_file(target) {
            warn!("could not remove partial {}: {cleanup_err}", target.display());
        }
        return Err(SortError::io(target, err));
    }
    Ok(())
}

fn copy_to_staging(source: &Path, staging: &Path, output_dir: &Path) -> Result<(), SortError> {
    let mut input = File::open(source).map_err(|err| SortError::io(source, err))?;
    let permissions = input
        .metadata()
        .map_err(|err| SortError::io(source, err))?
        .permissions();
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staging)
        .map_err(|err| SortError::io(output_dir, err))?;

    io::copy(&mut input, &mut output).map_err(|err| SortError::io(staging, err))?;
    output.sync_all().map_err(|err| SortError::io(staging, err))?;
    fs::set_permissions(staging, permissions).map_err(|err| SortError::io(staging, err))?;
    Ok(())
}

fn staging_path_for(output_dir: &Path, source: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let file_name = source
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    output_dir.join(format!(
        "{STAGING_PREFIX}{}_{}_{}",
        now,
        std::process::id(),
        file_name
    ))
}
