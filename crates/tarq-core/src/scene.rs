//! Scene identifiers with spatial keys.
//!
//! A scene identifier is an opaque fixed-structure token in which the WRS-2
//! path and row occupy fixed character offsets: path at characters 3..6 and
//! row at characters 6..9, both zero-padded three-digit numbers. The token
//! also carries a collection/tier marker further along, which callers match
//! as a substring (see the discovery filter in `tarq-flow`).
//!
//! Identifiers are immutable once observed. Parsing validates the spatial
//! key against the bounded WRS-2 domain and rejects malformed tokens with a
//! [`Error::InvalidSceneId`] rather than silently dropping them.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Valid WRS-2 path values.
pub const PATH_DOMAIN: RangeInclusive<u16> = 1..=233;

/// Valid WRS-2 row values.
pub const ROW_DOMAIN: RangeInclusive<u16> = 1..=248;

const PATH_OFFSET: usize = 3;
const ROW_OFFSET: usize = 6;
const FIELD_WIDTH: usize = 3;

/// A validated scene identifier.
///
/// Carries the raw token plus the parsed (path, row) spatial key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneId {
    raw: String,
    path: u16,
    row: u16,
}

impl SceneId {
    /// Parses a raw token into a scene identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSceneId`] if the token is too short, the
    /// path/row subfields are not numeric, or the spatial key falls outside
    /// the bounded WRS-2 domain.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let path = parse_field(&raw, PATH_OFFSET, "path")?;
        let row = parse_field(&raw, ROW_OFFSET, "row")?;

        if !PATH_DOMAIN.contains(&path) {
            return Err(Error::InvalidSceneId {
                message: format!("scene '{raw}': path {path} outside {PATH_DOMAIN:?}"),
            });
        }
        if !ROW_DOMAIN.contains(&row) {
            return Err(Error::InvalidSceneId {
                message: format!("scene '{raw}': row {row} outside {ROW_DOMAIN:?}"),
            });
        }

        Ok(Self { raw, path, row })
    }

    /// Returns the WRS-2 path.
    #[must_use]
    pub const fn path(&self) -> u16 {
        self.path
    }

    /// Returns the WRS-2 row.
    #[must_use]
    pub const fn row(&self) -> u16 {
        self.row
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_field(raw: &str, offset: usize, name: &str) -> Result<u16> {
    let digits = raw
        .get(offset..offset + FIELD_WIDTH)
        .ok_or_else(|| Error::InvalidSceneId {
            message: format!("scene '{raw}': too short for {name} field"),
        })?;
    digits.parse::<u16>().map_err(|_| Error::InvalidSceneId {
        message: format!("scene '{raw}': non-numeric {name} field '{digits}'"),
    })
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for SceneId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for SceneId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_and_row_at_fixed_offsets() {
        let scene = SceneId::parse("LC80830632019150LGN00").unwrap();
        assert_eq!(scene.path(), 83);
        assert_eq!(scene.row(), 63);
        assert_eq!(scene.as_str(), "LC80830632019150LGN00");
    }

    #[test]
    fn rejects_short_token() {
        let err = SceneId::parse("LC808").unwrap_err();
        assert!(matches!(err, Error::InvalidSceneId { .. }));
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        let err = SceneId::parse("LC8xyz0632019150LGN00").unwrap_err();
        assert!(matches!(err, Error::InvalidSceneId { .. }));
    }

    #[test]
    fn rejects_path_outside_domain() {
        // Path 234 exceeds the WRS-2 domain.
        let err = SceneId::parse("LC82340632019150LGN00").unwrap_err();
        assert!(err.to_string().contains("path 234"));
    }

    #[test]
    fn rejects_row_outside_domain() {
        // Row 000 falls below the WRS-2 domain.
        let err = SceneId::parse("LC80830002019150LGN00").unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn roundtrips_through_from_str() {
        let scene: SceneId = "LC81950252019153LGN00".parse().unwrap();
        assert_eq!(scene.to_string(), "LC81950252019153LGN00");
        assert_eq!(scene.path(), 195);
        assert_eq!(scene.row(), 25);
    }
}
