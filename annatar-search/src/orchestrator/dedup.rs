//! Result deduplication by content fingerprint.
//!
//! Groups canonical records that describe the same release and merges
//! each group into one record. Two records land in the same group when
//! any of these hold (transitively):
//!
//! - their fingerprints are identical
//! - their info hashes are identical
//! - their titles reach the similarity threshold and their sizes are close
//!   (see [`super::fingerprint::is_similar`])
//!
//! A merged record keeps the fingerprint of its primary member, recomputed
//! when its size is filled in from another member, and lists every
//! contributing indexer in `sources`.

use std::collections::{BTreeSet, HashMap};

use crate::types::{CanonicalRecord, Resolution};

use super::fingerprint::{fingerprint, is_similar, title_tokens};

/// Union-find over record indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower index wins so roots stay stable across runs.
            let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[merge] = keep;
        }
    }
}

/// Deduplicate records, merging groups that describe the same release.
///
/// Output groups are ordered by the earliest arrival among their members,
/// so the result is deterministic for a given input.
pub fn deduplicate(records: Vec<CanonicalRecord>, similarity_threshold: f64) -> Vec<CanonicalRecord> {
    let len = records.len();
    let mut sets = DisjointSet::new(len);

    {
        let mut by_fingerprint: HashMap<&str, usize> = HashMap::new();
        let mut by_hash: HashMap<&str, usize> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            if let Some(&j) = by_fingerprint.get(record.fingerprint.as_str()) {
                sets.union(i, j);
            } else {
                by_fingerprint.insert(&record.fingerprint, i);
            }
            if let Some(hash) = record.info_hash.as_deref() {
                if let Some(&j) = by_hash.get(hash) {
                    sets.union(i, j);
                } else {
                    by_hash.insert(hash, i);
                }
            }
        }
    }

    let tokens: Vec<BTreeSet<String>> = records
        .iter()
        .map(|r| title_tokens(&r.title).into_iter().collect())
        .collect();
    for i in 0..len {
        for j in (i + 1)..len {
            if sets.find(i) == sets.find(j) {
                continue;
            }
            if is_similar(
                &tokens[i],
                records[i].size,
                &tokens[j],
                records[j].size,
                similarity_threshold,
            ) {
                sets.union(i, j);
            }
        }
    }

    // Collect members per root, keeping first-seen root order.
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<CanonicalRecord>> = Vec::new();
    for (i, record) in records.into_iter().enumerate() {
        let root = sets.find(i);
        let slot = *group_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(record);
    }

    let mut merged: Vec<CanonicalRecord> = groups.into_iter().map(merge_group).collect();
    merged.sort_by_key(|r| r.first_arrival());
    merged
}

/// Merge one group into a single record.
///
/// The primary member has the most complete metadata; ties go to the
/// earliest-responding source. Counts take the maximum over the group and
/// missing fields are filled from the other members in arrival order.
fn merge_group(mut members: Vec<CanonicalRecord>) -> CanonicalRecord {
    members.sort_by_key(|m| m.first_arrival());

    let primary_idx = members
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            a.completeness()
                .cmp(&b.completeness())
                // Earlier index is earlier arrival; prefer it on ties.
                .then_with(|| ib.cmp(ia))
        })
        .map_or(0, |(i, _)| i);

    let mut merged = members.remove(primary_idx);

    for other in members {
        merged.seeders = max_opt(merged.seeders, other.seeders);
        merged.peers = max_opt(merged.peers, other.peers);
        if merged.info_hash.is_none() {
            merged.info_hash = other.info_hash;
        }
        if merged.magnet.is_none() {
            merged.magnet = other.magnet;
        }
        if merged.link.is_none() {
            merged.link = other.link;
        }
        if merged.published.is_none() {
            merged.published = other.published;
        }
        if merged.size == 0 && other.size != 0 {
            merged.size = other.size;
            merged.fingerprint = fingerprint(&merged.title, merged.size);
        }
        if merged.resolution == Resolution::Unknown {
            merged.resolution = other.resolution;
        }
        for source in other.sources {
            match merged
                .sources
                .iter_mut()
                .find(|s| s.indexer == source.indexer)
            {
                Some(existing) => existing.arrival = existing.arrival.min(source.arrival),
                None => merged.sources.push(source),
            }
        }
    }

    merged.sources.sort_by_key(|s| s.arrival);
    merged
}

fn max_opt(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
