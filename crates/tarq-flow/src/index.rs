//! Scene membership index used for bulk deduplication.
//!
//! The catalog may hold hundreds of thousands of scenes and discovery runs
//! against it periodically, so membership checks need to be cheap. The
//! bucketed [`PathRowIndex`] spreads the catalog over the 233x248 WRS-2
//! grid, turning an O(N) scan per query into an O(N/B) expected scan of one
//! bucket. For small catalogs the [`FlatIndex`] hash set is simpler and
//! just as fast; [`scene_index_for`] picks by catalog size.
//!
//! Both implementations are derived, rebuildable caches: constructed fresh
//! from the durable catalog per discovery cycle, never mutated while in use.

use std::collections::HashSet;

use tarq_core::scene::{SceneId, PATH_DOMAIN, ROW_DOMAIN};

use crate::error::Result;

/// Catalogs at or above this size get the bucketed index.
const FLAT_INDEX_THRESHOLD: usize = 10_000;

/// Bulk membership queries over already-ingested scenes.
///
/// `contains` has exact-match semantics, not prefix. A malformed identifier
/// (spatial key outside the WRS-2 domain) is a domain error from either
/// implementation, never a lookup fault.
pub trait SceneIndex: Send + Sync {
    /// Returns true if the identifier was present when the index was built.
    ///
    /// # Errors
    ///
    /// Returns [`tarq_core::Error::InvalidSceneId`] for malformed
    /// identifiers.
    fn contains(&self, id: &str) -> Result<bool>;

    /// Returns the number of indexed scenes.
    fn len(&self) -> usize;

    /// Returns true if the index holds no scenes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scene index bucketed by the WRS-2 (path, row) grid.
///
/// Each bucket keeps insertion order; lookups scan one bucket linearly.
#[derive(Debug)]
pub struct PathRowIndex {
    buckets: Vec<Vec<String>>,
    len: usize,
}

impl PathRowIndex {
    /// Builds the index from a catalog of scene identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`tarq_core::Error::InvalidSceneId`] if any identifier is
    /// malformed. Malformed catalog entries are a construction error, not
    /// silently dropped.
    pub fn build<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let path_span = usize::from(*PATH_DOMAIN.end());
        let row_span = usize::from(*ROW_DOMAIN.end());
        let mut buckets = vec![Vec::new(); path_span * row_span];
        let mut len = 0;

        for id in ids {
            let id = id.into();
            let scene = SceneId::parse(id.as_str())?;
            buckets[Self::bucket_of(&scene)].push(id);
            len += 1;
        }

        Ok(Self { buckets, len })
    }

    fn bucket_of(scene: &SceneId) -> usize {
        let row_span = usize::from(*ROW_DOMAIN.end());
        (usize::from(scene.path()) - 1) * row_span + (usize::from(scene.row()) - 1)
    }
}

impl SceneIndex for PathRowIndex {
    fn contains(&self, id: &str) -> Result<bool> {
        let scene = SceneId::parse(id)?;
        let bucket = &self.buckets[Self::bucket_of(&scene)];
        Ok(bucket.iter().any(|known| known == id))
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Flat hash-set scene index for small catalogs.
#[derive(Debug)]
pub struct FlatIndex {
    ids: HashSet<String>,
}

impl FlatIndex {
    /// Builds the index from a catalog of scene identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`tarq_core::Error::InvalidSceneId`] if any identifier is
    /// malformed.
    pub fn build<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut set = HashSet::new();
        for id in ids {
            let id = id.into();
            SceneId::parse(id.as_str())?;
            set.insert(id);
        }
        Ok(Self { ids: set })
    }
}

impl SceneIndex for FlatIndex {
    fn contains(&self, id: &str) -> Result<bool> {
        // Validate first so out-of-domain ids fail the same way as in the
        // bucketed variant.
        SceneId::parse(id)?;
        Ok(self.ids.contains(id))
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Builds the index variant appropriate for the catalog size.
///
/// # Errors
///
/// Returns [`tarq_core::Error::InvalidSceneId`] if any identifier is
/// malformed.
pub fn scene_index_for(ids: Vec<String>) -> Result<Box<dyn SceneIndex>> {
    if ids.len() >= FLAT_INDEX_THRESHOLD {
        Ok(Box::new(PathRowIndex::build(ids)?))
    } else {
        Ok(Box::new(FlatIndex::build(ids)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &str = "LC80830632019150LGN00";
    const UNKNOWN_SAME_BUCKET: &str = "LC80830632019166LGN00";
    const UNKNOWN_OTHER_BUCKET: &str = "LC81950252019153LGN00";

    #[test]
    fn bucketed_index_exact_match() {
        let index = PathRowIndex::build([KNOWN]).unwrap();
        assert!(index.contains(KNOWN).unwrap());
        assert!(!index.contains(UNKNOWN_SAME_BUCKET).unwrap());
        assert!(!index.contains(UNKNOWN_OTHER_BUCKET).unwrap());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn flat_index_exact_match() {
        let index = FlatIndex::build([KNOWN]).unwrap();
        assert!(index.contains(KNOWN).unwrap());
        assert!(!index.contains(UNKNOWN_SAME_BUCKET).unwrap());
    }

    #[test]
    fn build_rejects_malformed_identifier() {
        let err = PathRowIndex::build(["LC8xyz0632019150LGN00"]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Core(tarq_core::Error::InvalidSceneId { .. })
        ));

        let err = FlatIndex::build(["LC8xyz0632019150LGN00"]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Core(tarq_core::Error::InvalidSceneId { .. })
        ));
    }

    #[test]
    fn contains_rejects_out_of_domain_identifier() {
        // Path 234 is outside the grid; must be a domain error, not a
        // bucket lookup fault.
        let index = PathRowIndex::build([KNOWN]).unwrap();
        let err = index.contains("LC82340632019150LGN00").unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Core(tarq_core::Error::InvalidSceneId { .. })
        ));

        let flat = FlatIndex::build([KNOWN]).unwrap();
        assert!(flat.contains("LC82340632019150LGN00").is_err());
    }

    #[test]
    fn edge_of_domain_buckets_are_addressable() {
        // Path 233, row 248 is the last bucket; path 1, row 1 the first.
        let last = "LC82332482019150LGN00";
        let first = "LC80010012019150LGN00";
        let index = PathRowIndex::build([last, first]).unwrap();
        assert!(index.contains(last).unwrap());
        assert!(index.contains(first).unwrap());
    }

    #[test]
    fn index_variant_chosen_by_size() {
        let small = scene_index_for(vec![KNOWN.to_string()]).unwrap();
        assert!(small.contains(KNOWN).unwrap());
        assert!(!small.is_empty());

        let empty = scene_index_for(Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert!(!empty.contains(KNOWN).unwrap());
    }
}
