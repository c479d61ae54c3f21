use std::fs;
use std::path::Path;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Human readable size in binary units with one decimal, e.g. `1.5 KB`.
///
/// Anything beyond the terabytes is rendered in `PB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} PB")
}

/// Total size of all regular files below `path`. Symlinks are not followed.
///
/// A missing directory has size 0. Entries that vanish or can't be read are skipped.
pub fn folder_size(path: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };

    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let metadata = fs::symlink_metadata(entry.path()).ok()?;
            if metadata.is_dir() {
                Some(folder_size(&entry.path()))
            } else if metadata.is_file() {
                Some(metadata.len())
            } else {
                None
            }
        })
        .sum()
}
