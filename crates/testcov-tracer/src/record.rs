//! Coverage records
//!
//! A [`CoverageRecord`] maps every known site of every traced file to a hit
//! count. Counts only grow: sites are registered at zero, hits are added,
//! and merging two records sums counts per site. Because both levels are
//! `BTreeMap`s, merge order never shows in the result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use testcov_core::Site;

/// Hit counts for one source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Line sites: line -> hits
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lines: BTreeMap<u32, u64>,
    /// Branch arms: line -> arm -> hits
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub branches: BTreeMap<u32, BTreeMap<u32, u64>>,
}

impl FileRecord {
    /// Make a site known without recording a hit
    pub fn register(&mut self, site: Site) {
        self.add(site, 0);
    }

    /// Add hits to a site, registering it if needed
    pub fn add(&mut self, site: Site, hits: u64) {
        let slot = match site.branch {
            None => self.lines.entry(site.line).or_insert(0),
            Some(arm) => self
                .branches
                .entry(site.line)
                .or_default()
                .entry(arm)
                .or_insert(0),
        };
        *slot = slot.saturating_add(hits);
    }

    /// Hits recorded at a site, `None` if the site is unknown
    #[must_use]
    pub fn hits(&self, site: Site) -> Option<u64> {
        match site.branch {
            None => self.lines.get(&site.line).copied(),
            Some(arm) => self
                .branches
                .get(&site.line)
                .and_then(|arms| arms.get(&arm))
                .copied(),
        }
    }

    /// All sites with their counts, lines before branch arms of the same line
    pub fn sites(&self) -> impl Iterator<Item = (Site, u64)> + '_ {
        let lines = self.lines.iter().map(|(&line, &hits)| (Site::line(line), hits));
        let arms = self.branches.iter().flat_map(|(&line, arms)| {
            arms.iter()
                .map(move |(&arm, &hits)| (Site::branch(line, arm), hits))
        });
        let mut all: Vec<_> = lines.chain(arms).collect();
        all.sort_by_key(|(site, _)| *site);
        all.into_iter()
    }

    /// Number of known sites
    #[must_use]
    pub fn site_count(&self) -> usize {
        self.lines.len() + self.branches.values().map(BTreeMap::len).sum::<usize>()
    }

    /// Number of sites hit at least once
    #[must_use]
    pub fn covered_count(&self) -> usize {
        self.sites().filter(|(_, hits)| *hits > 0).count()
    }

    /// Sum another file's counts into this one
    pub fn merge(&mut self, other: &FileRecord) {
        for (site, hits) in other.sites() {
            self.add(site, hits);
        }
    }
}

/// Coverage data for one or more runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageRecord {
    files: BTreeMap<String, FileRecord>,
}

impl CoverageRecord {
    /// Create an empty record
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a site known without recording a hit
    pub fn register(&mut self, file: &str, site: Site) {
        self.file_mut(file).register(site);
    }

    /// Add hits to a site
    pub fn record(&mut self, file: &str, site: Site, hits: u64) {
        self.file_mut(file).add(site, hits);
    }

    /// Hits recorded at a site, `None` if the site is unknown
    #[must_use]
    pub fn hits(&self, file: &str, site: Site) -> Option<u64> {
        self.files.get(file).and_then(|f| f.hits(site))
    }

    /// Per-file records in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.files.iter().map(|(path, record)| (path.as_str(), record))
    }

    /// Record for one file
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Whether no site is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.values().all(|f| f.site_count() == 0)
    }

    /// Total number of known sites
    #[must_use]
    pub fn site_count(&self) -> usize {
        self.files.values().map(FileRecord::site_count).sum()
    }

    /// Sum of all hit counts
    #[must_use]
    pub fn total_hits(&self) -> u64 {
        self.files
            .values()
            .flat_map(FileRecord::sites)
            .fold(0u64, |acc, (_, hits)| acc.saturating_add(hits))
    }

    /// Sum another record's counts into this one
    pub fn merge(&mut self, other: &CoverageRecord) {
        for (path, record) in &other.files {
            self.file_mut(path).merge(record);
        }
    }

    /// Consuming variant of [`merge`](Self::merge)
    #[must_use]
    pub fn merged(mut self, other: &CoverageRecord) -> Self {
        self.merge(other);
        self
    }

    /// Merge any number of records
    pub fn merge_all<'a>(records: impl IntoIterator<Item = &'a CoverageRecord>) -> Self {
        records
            .into_iter()
            .fold(Self::new(), |acc, record| acc.merged(record))
    }

    fn file_mut(&mut self, path: &str) -> &mut FileRecord {
        self.files.entry(path.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(entries: &[(&str, Site, u64)]) -> CoverageRecord {
        let mut record = CoverageRecord::new();
        for (file, site, hits) in entries {
            record.record(file, *site, *hits);
        }
        record
    }

    #[test]
    fn registered_sites_start_at_zero() {
        let mut rec = CoverageRecord::new();
        rec.register("a.rs", Site::line(3));

        assert_eq!(rec.hits("a.rs", Site::line(3)), Some(0));
        assert_eq!(rec.hits("a.rs", Site::line(4)), None);
        assert_eq!(rec.site_count(), 1);
        assert!(!rec.is_empty());
    }

    #[test]
    fn duplicate_hits_accumulate_on_one_key() {
        let mut rec = CoverageRecord::new();
        rec.record("a.rs", Site::line(3), 1);
        rec.record("a.rs", Site::line(3), 1);
        rec.record("a.rs", Site::branch(3, 1), 1);

        assert_eq!(rec.hits("a.rs", Site::line(3)), Some(2));
        assert_eq!(rec.hits("a.rs", Site::branch(3, 1)), Some(1));
        assert_eq!(rec.site_count(), 2);
    }

    #[test]
    fn merge_sums_per_site() {
        let a = record(&[("a.rs", Site::line(1), 2), ("a.rs", Site::line(2), 0)]);
        let b = record(&[("a.rs", Site::line(1), 3), ("b.rs", Site::line(9), 1)]);

        let merged = a.merged(&b);
        assert_eq!(merged.hits("a.rs", Site::line(1)), Some(5));
        assert_eq!(merged.hits("a.rs", Site::line(2)), Some(0));
        assert_eq!(merged.hits("b.rs", Site::line(9)), Some(1));
        assert_eq!(merged.total_hits(), 6);
    }

    #[test]
    fn sites_iterate_in_line_order() {
        let rec = record(&[
            ("a.rs", Site::branch(5, 0), 1),
            ("a.rs", Site::line(7), 1),
            ("a.rs", Site::line(5), 1),
        ]);
        let sites: Vec<_> = rec.file("a.rs").unwrap().sites().map(|(s, _)| s).collect();
        assert_eq!(sites, vec![Site::line(5), Site::branch(5, 0), Site::line(7)]);
    }

    #[test]
    fn json_round_trip_keeps_zero_sites() {
        let rec = record(&[("a.rs", Site::line(1), 0), ("a.rs", Site::branch(2, 1), 4)]);
        let json = serde_json::to_string(&rec).unwrap();
        let back: CoverageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    fn arb_record() -> impl Strategy<Value = CoverageRecord> {
        let site = (1u32..20, proptest::option::of(0u32..3));
        let entry = ("[abc]\\.rs", site, 0u64..5);
        proptest::collection::vec(entry, 0..20).prop_map(|entries| {
            let mut rec = CoverageRecord::new();
            for (file, (line, branch), hits) in entries {
                rec.record(&file, Site { line, branch }, hits);
            }
            rec
        })
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in arb_record(), b in arb_record()) {
            prop_assert_eq!(a.clone().merged(&b), b.merged(&a));
        }

        #[test]
        fn merge_is_associative(a in arb_record(), b in arb_record(), c in arb_record()) {
            let left = a.clone().merged(&b.clone().merged(&c));
            let right = a.merged(&b).merged(&c);
            prop_assert_eq!(left, right);
        }

        #[test]
        fn merge_never_decreases_counts(a in arb_record(), b in arb_record()) {
            let merged = a.clone().merged(&b);
            for (path, file) in a.files() {
                for (site, hits) in file.sites() {
                    prop_assert!(merged.hits(path, site).unwrap_or(0) >= hits);
                }
            }
        }
    }
}
