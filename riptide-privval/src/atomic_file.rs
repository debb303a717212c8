//! Atomic file persistence.
//!
//! A reader of the target path observes either the previous contents or the
//! complete new contents, never a torn write: the bytes go to a sibling
//! temporary file that is fsynced and then renamed over the target.
//! Same-directory rename is atomic on POSIX; the target's directory must
//! already exist.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Write `data` to `path` atomically, creating the file with `mode`.
pub fn write_file_atomic(path: &Path, data: &[u8], mode: u32) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(&tmp_path)?;

    // The temp file may predate this call; OpenOptions::mode only applies
    // at creation.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(mode))?;
    }

    if let Err(err) = file.write_all(data).and_then(|()| file.sync_all()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    Ok(())
}
