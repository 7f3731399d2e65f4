use std::io;
use std::path::Path;

/// Check the download directory for the resolved update, reading the
/// directory fresh on every run. An entry counts when it matches the file
/// name exactly or contains the version string.
pub fn is_downloaded(directory: &Path, file_name: &str, version: &str) -> io::Result<bool> {
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let existing = entry.file_name();
        let Some(existing) = existing.to_str() else {
            continue;
        };

        if existing == file_name || (!version.is_empty() && existing.contains(version)) {
            return Ok(true);
        }
    }

    Ok(false)
}
