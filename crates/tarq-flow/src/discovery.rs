//! Candidate discovery: normalizing raw source entries and dropping scenes
//! already in the catalog.
//!
//! Discovery is a pure filter over supplied inputs. Both polling triggers
//! feed it:
//!
//! - the metadata poller hands over raw CSV rows, normalized by taking the
//!   first field;
//! - the storage-listing poller hands over object keys, normalized by
//!   stripping the directory prefix and the tarball suffix.
//!
//! Output preserves input order. Duplicates within one input batch are not
//! deduplicated against each other, only against the index; downstream
//! message delivery is expected to tolerate idempotent redelivery.

use crate::error::Result;
use crate::index::SceneIndex;

/// A normalized discovery candidate.
///
/// `reference` is what downstream work consumes (a storage key for
/// tarballs, the identifier itself for metadata rows); `scene_id` is the
/// token the index deduplicates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Opaque work-item reference handed to job submission or the queue.
    pub reference: String,
    /// Scene identifier used for membership checks.
    pub scene_id: String,
}

impl CandidateRecord {
    /// Normalizes a raw metadata CSV row into a candidate.
    ///
    /// Takes the first comma-separated field. Returns `None` for blank
    /// rows.
    #[must_use]
    pub fn from_metadata_row(row: &str) -> Option<Self> {
        let id = row.split(',').next()?.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            reference: id.to_string(),
            scene_id: id.to_string(),
        })
    }

    /// Normalizes a storage listing key into a candidate.
    ///
    /// The key must end with `suffix`; the scene identifier is the final
    /// path segment minus that suffix. Returns `None` for keys that do not
    /// look like work items.
    #[must_use]
    pub fn from_storage_key(key: &str, suffix: &str) -> Option<Self> {
        let stem = key.rsplit('/').next()?;
        let id = stem.strip_suffix(suffix)?;
        if id.is_empty() {
            return None;
        }
        Some(Self {
            reference: key.to_string(),
            scene_id: id.to_string(),
        })
    }
}

/// Substring criteria applied to candidates before the index check.
///
/// `tier` keeps only scenes of a collection tier (e.g. `"T1"`); `recency`
/// keeps only scenes whose token embeds a given acquisition marker (e.g.
/// year plus day-of-year of yesterday). Empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryFilter {
    /// Tier/category marker that must appear in the identifier.
    pub tier: Option<String>,
    /// Recency criterion that must appear in the identifier.
    pub recency: Option<String>,
}

impl DiscoveryFilter {
    /// Returns true if the identifier passes all configured criteria.
    #[must_use]
    pub fn matches(&self, scene_id: &str) -> bool {
        self.tier.as_deref().map_or(true, |t| scene_id.contains(t))
            && self
                .recency
                .as_deref()
                .map_or(true, |r| scene_id.contains(r))
    }
}

/// Filters candidates down to scenes not yet in the catalog.
///
/// Pure function: same inputs, same output; no side effects.
///
/// # Errors
///
/// Propagates the index's domain error for malformed identifiers.
pub fn discover(
    records: Vec<CandidateRecord>,
    filter: &DiscoveryFilter,
    index: &dyn SceneIndex,
) -> Result<Vec<CandidateRecord>> {
    let mut fresh = Vec::new();
    for record in records {
        if !filter.matches(&record.scene_id) {
            continue;
        }
        if index.contains(&record.scene_id)? {
            continue;
        }
        fresh.push(record);
    }
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FlatIndex;

    const KNOWN: &str = "LC80830632019150LGN00";
    const FRESH: &str = "LC81950252019153LGN00";

    fn records(ids: &[&str]) -> Vec<CandidateRecord> {
        ids.iter()
            .map(|id| CandidateRecord {
                reference: (*id).to_string(),
                scene_id: (*id).to_string(),
            })
            .collect()
    }

    #[test]
    fn metadata_row_normalization() {
        let record =
            CandidateRecord::from_metadata_row("LC80830632019150LGN00,2019-05-30,083,063")
                .unwrap();
        assert_eq!(record.scene_id, KNOWN);
        assert_eq!(record.reference, KNOWN);

        assert!(CandidateRecord::from_metadata_row("").is_none());
        assert!(CandidateRecord::from_metadata_row(",,").is_none());
    }

    #[test]
    fn storage_key_normalization() {
        let record =
            CandidateRecord::from_storage_key("tarq/LC80830632019150LGN00.tar.gz", ".tar.gz")
                .unwrap();
        assert_eq!(record.scene_id, KNOWN);
        assert_eq!(record.reference, "tarq/LC80830632019150LGN00.tar.gz");

        assert!(CandidateRecord::from_storage_key("tarq/readme.txt", ".tar.gz").is_none());
        assert!(CandidateRecord::from_storage_key("tarq/.tar.gz", ".tar.gz").is_none());
    }

    #[test]
    fn drops_scenes_already_indexed() {
        let index = FlatIndex::build([KNOWN]).unwrap();
        let out = discover(records(&[KNOWN, FRESH]), &DiscoveryFilter::default(), &index).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scene_id, FRESH);
    }

    #[test]
    fn preserves_order_and_intra_batch_duplicates() {
        let index = FlatIndex::build::<[&str; 0]>([]).unwrap();
        let out = discover(
            records(&[FRESH, KNOWN, FRESH]),
            &DiscoveryFilter::default(),
            &index,
        )
        .unwrap();
        let ids: Vec<&str> = out.iter().map(|r| r.scene_id.as_str()).collect();
        assert_eq!(ids, vec![FRESH, KNOWN, FRESH]);
    }

    #[test]
    fn is_pure_and_repeatable() {
        let index = FlatIndex::build([KNOWN]).unwrap();
        let input = records(&[KNOWN, FRESH]);
        let first = discover(input.clone(), &DiscoveryFilter::default(), &index).unwrap();
        let second = discover(input, &DiscoveryFilter::default(), &index).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn recency_criterion_filters() {
        let index = FlatIndex::build::<[&str; 0]>([]).unwrap();
        let filter = DiscoveryFilter {
            tier: None,
            recency: Some("2019153".to_string()),
        };
        let out = discover(records(&[KNOWN, FRESH]), &filter, &index).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].scene_id, FRESH);
    }

    #[test]
    fn malformed_candidate_is_a_domain_error() {
        let index = FlatIndex::build([KNOWN]).unwrap();
        let result = discover(
            records(&["LC8xyz0632019150LGN00"]),
            &DiscoveryFilter::default(),
            &index,
        );
        assert!(result.is_err());
    }
}
