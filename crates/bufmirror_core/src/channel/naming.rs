//! Channel path naming.
//!
//! The editor publishes one channel per client and file, named
//! `kakoune_<client>_<MD5>` where the digest is taken over the absolute path
//! of the file.

use crate::constants::CHANNEL_FILE_PREFIX;
use md5::{Digest, Md5};
use std::fmt::Write;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Upper-case hex MD5 digest of `path`'s bytes.
pub fn path_digest(path: &Path) -> String {
    let digest = Md5::digest(path.as_os_str().as_encoded_bytes());
    digest
        .iter()
        .fold(String::with_capacity(32), |mut out, byte| {
            let _ = write!(out, "{:02X}", byte);
            out
        })
}

/// Channel file name for `client` mirroring the absolute path `file`.
pub fn channel_file_name(client: &str, file: &Path) -> String {
    format!("{}_{}_{}", CHANNEL_FILE_PREFIX, client, path_digest(file))
}

/// Lexically normalize an absolute path: drop `.` and fold `..`.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolve the channel path for `client` and `file` inside `dir`.
///
/// `file` is made absolute against the working directory without following
/// symlinks, matching how the editor names the channel.
///
/// # Errors
/// Returns an error when the working directory cannot be determined.
pub fn resolve_channel_path(dir: &Path, client: &str, file: &Path) -> io::Result<PathBuf> {
    let absolute = normalize_lexically(&std::path::absolute(file)?);
    Ok(dir.join(channel_file_name(client, &absolute)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_upper_case_md5_hex() {
        assert_eq!(
            path_digest(Path::new("/tmp/notes.txt")),
            "5B3A0814598C3C8B17FBD5688134D673"
        );
    }

    #[test]
    fn channel_name_combines_prefix_client_and_digest() {
        assert_eq!(
            channel_file_name("client0", Path::new("/home/user/project/src/main.rs")),
            "kakoune_client0_180AA054B6F7E8F574EF983759DB177D"
        );
    }

    #[test]
    fn resolution_normalizes_dot_segments() {
        let path = resolve_channel_path(
            Path::new("/dev/shm"),
            "main",
            Path::new("/tmp/./scratch/../notes.txt"),
        )
        .expect("resolve");
        assert_eq!(
            path,
            PathBuf::from("/dev/shm/kakoune_main_5B3A0814598C3C8B17FBD5688134D673")
        );
    }

    #[test]
    fn relative_paths_resolve_against_working_directory() {
        let cwd = std::env::current_dir().expect("cwd");
        let expected = channel_file_name("c", &cwd.join("notes.txt"));
        let path = resolve_channel_path(Path::new("/dev/shm"), "c", Path::new("notes.txt"))
            .expect("resolve");
        assert_eq!(path, Path::new("/dev/shm").join(expected));
    }
}
