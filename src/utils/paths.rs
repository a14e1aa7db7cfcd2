// dbops/src/utils/paths.rs
//
// Path helpers for locations that live on the engine's host rather than the
// operator's: Windows drive paths and UNC shares, joined as strings instead
// of std::path so a Linux operator host never rewrites the separators.

/// Whether a path is a UNC network share (`\\host\share\...`), i.e. reachable
/// from hosts other than the one that wrote it.
pub fn is_network_path(path: &str) -> bool {
    path.starts_with(r"\\")
}

/// Joins a file name onto a directory using the separator style the directory
/// already uses.
pub fn join_engine_path(directory: &str, file_name: &str) -> String {
    let separator = if directory.contains('/') && !directory.contains('\\') {
        '/'
    } else {
        '\\'
    };
    let trimmed = directory.trim_end_matches(['\\', '/']);
    format!("{trimmed}{separator}{file_name}")
}

/// Final component of an engine-side path, whichever separator it uses.
pub fn engine_file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}
