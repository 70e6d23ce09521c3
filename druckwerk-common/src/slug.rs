//! Storage-path derivation for uploaded media.
//!
//! Files live under `posts/<slugified cover title>/`, with an 8-digit random
//! suffix appended to the original file stem to avoid collisions between
//! uploads that share a name.

use serde::{Deserialize, Serialize};

pub const SUFFIX_DIGITS: u32 = 8;

/// A relative path inside the media root.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaPath(String);

impl MediaPath {
    #[must_use]
    pub fn new(path: String) -> Self {
        Self(path)
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MediaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims leading/trailing hyphens.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Derives the storage path for a file uploaded to a post:
/// `posts/<slug>/<stem>_<8-digit suffix>.<ext>`.
#[must_use]
pub fn derive_media_path(cover_title: &str, file_name: &str, suffix: u32) -> MediaPath {
    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    let slug = slugify(cover_title);
    let suffix = suffix % 10_u32.pow(SUFFIX_DIGITS);

    let path = match extension {
        Some(ext) => format!("posts/{slug}/{stem}_{suffix:08}.{ext}"),
        None => format!("posts/{slug}/{stem}_{suffix:08}"),
    };

    MediaPath(path)
}

#[must_use]
pub fn random_suffix() -> u32 {
    rand::random::<u32>() % 10_u32.pow(SUFFIX_DIGITS)
}

#[cfg(test)]
mod tests {
    use crate::slug::{MediaPath, derive_media_path, random_suffix, slugify};

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  A   Cover  Title "), "a-cover-title");
        assert_eq!(slugify("Rust 2024"), "rust-2024");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn media_path_format() {
        assert_eq!(
            derive_media_path("My First Post", "photo.png", 12345),
            MediaPath::new("posts/my-first-post/photo_00012345.png".into())
        );
    }

    #[test]
    fn media_path_without_extension() {
        assert_eq!(
            derive_media_path("Notes", "README", 1),
            MediaPath::new("posts/notes/README_00000001".into())
        );
    }

    #[test]
    fn media_path_keeps_inner_dots() {
        assert_eq!(
            derive_media_path("Tarball", "archive.tar.gz", 7),
            MediaPath::new("posts/tarball/archive.tar_00000007.gz".into())
        );
    }

    #[test]
    fn random_suffix_fits_eight_digits() {
        for _ in 0..100 {
            assert!(random_suffix() < 100_000_000);
        }
    }
}
