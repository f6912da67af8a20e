//! Location buckets for map rendering.

use std::collections::HashMap;

use crate::models::{LocationBucket, VisitorRecord};

/// Bucket identity: location label plus one-decimal grid cell.
type BucketKey = (String, i64, i64);

/// Groups records into location buckets.
///
/// Records share a bucket when their `"city, country"` label (or bare
/// country) matches and their coordinates fall in the same one-decimal grid
/// cell. Records without finite coordinates are skipped. Each bucket keeps
/// the coordinates of the first record that landed in it.
///
/// Buckets come back ordered by visit count (highest first), then by label
/// and cell, so the set and counts do not depend on input order.
pub fn aggregate_for_map(records: &[VisitorRecord]) -> Vec<LocationBucket> {
    let mut buckets: HashMap<BucketKey, LocationBucket> = HashMap::new();

    for record in records {
        let Some(coordinates) = record.coordinates() else {
            continue;
        };
        let (lat_cell, lon_cell) = coordinates.grid_cell();
        let key = (record.location_label(), lat_cell, lon_cell);

        buckets
            .entry(key)
            .and_modify(|bucket| bucket.visit_count += 1)
            .or_insert_with(|| LocationBucket {
                country: record.country.clone(),
                city: record.city.clone(),
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
                visit_count: 1,
            });
    }

    let mut keyed: Vec<(BucketKey, LocationBucket)> = buckets.into_iter().collect();
    keyed.sort_by(|(key_a, a), (key_b, b)| {
        b.visit_count
            .cmp(&a.visit_count)
            .then_with(|| key_a.cmp(key_b))
    });
    keyed.into_iter().map(|(_, bucket)| bucket).collect()
}
