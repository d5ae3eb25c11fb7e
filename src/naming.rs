//! Object naming convention.
//!
//! Objects are expected to be named `<entity>_<marker>.<ext>`, where the
//! trailing marker is a tile or zone tag such as `48N`. The entity part is
//! used both to group sibling objects into one local folder and to match
//! objects against a manifest.
//!
//! The convention is assumed, not validated: a key that does not follow it
//! is still grouped, just by whatever precedes its last delimiter.

use std::path::Path;

/// Default delimiter between the entity and its trailing marker.
pub const DEFAULT_DELIMITER: char = '_';

/// How an object's filename maps to an entity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityGrouping {
    /// Strip the final `delimiter`-separated segment of the filename stem.
    ///
    /// `A_B_48N.tif` becomes `A_B`; a stem without the delimiter yields an
    /// empty key.
    StripLastSegment {
        /// Segment delimiter.
        delimiter: char,
    },
    /// No grouping: every object maps to the empty key.
    Flat,
}

impl Default for EntityGrouping {
    fn default() -> Self {
        Self::StripLastSegment {
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl EntityGrouping {
    /// Derives the entity key from a file name (not a full object key).
    #[must_use]
    pub fn entity_key(&self, file_name: &str) -> String {
        match self {
            Self::Flat => String::new(),
            Self::StripLastSegment { delimiter } => {
                let stem = file_stem(file_name);
                stem.rsplit_once(*delimiter)
                    .map(|(entity, _marker)| entity.to_string())
                    .unwrap_or_default()
            }
        }
    }
}

/// Returns the manifest stem of a file name: the filename stem with its
/// trailing `delimiter` marker removed, or the whole stem when there is none.
///
/// Unlike [`EntityGrouping::entity_key`] this never yields an empty string
/// for a non-empty stem, so `A.tif` matches manifest entry `A`.
#[must_use]
pub fn manifest_stem(file_name: &str, delimiter: char) -> &str {
    let stem = file_stem(file_name);
    stem.rsplit_once(delimiter).map_or(stem, |(entity, _)| entity)
}

/// Filename without its final extension, as `Path::file_stem` defines it.
fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}
