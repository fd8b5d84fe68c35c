//! Concurrent hit collection
//!
//! A [`Tracer`] owns the hit table for one run. Code under test receives a
//! [`Probe`] and reports hits through the [`probe!`](crate::probe) and
//! [`branch!`](crate::branch) macros. Probes may fire from any number of
//! tasks or threads at once; each hit increments exactly one `DashMap`
//! entry, so the final counts equal those of a sequential execution.

use crate::record::CoverageRecord;
use crate::sites::scan_probe_sites;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use testcov_core::Site;

type SiteKey = (&'static str, Site);

#[derive(Debug, Default)]
struct TracerInner {
    enabled: AtomicBool,
    hits: DashMap<SiteKey, u64>,
    known: Mutex<CoverageRecord>,
}

/// Coverage accumulator for one run
///
/// Cloning yields another handle to the same accumulator.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    /// Create a disabled tracer with no known sites
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for code under test
    #[inline]
    #[must_use]
    pub fn probe(&self) -> Probe {
        Probe {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Start counting hits
    pub fn enable(&self) {
        self.inner.enabled.store(true, Ordering::Release);
    }

    /// Stop counting hits; later probe calls are ignored
    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::Release);
    }

    /// Whether hits are currently counted
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    /// Declare a site as executable
    pub fn register(&self, file: &str, site: Site) {
        self.inner.known.lock().register(file, site);
    }

    /// Declare every probe site found in `source` as executable
    ///
    /// Returns the number of sites found.
    pub fn register_source(&self, file: &str, source: &str) -> usize {
        let sites = scan_probe_sites(source);
        let mut known = self.inner.known.lock();
        for site in &sites {
            known.register(file, *site);
        }
        sites.len()
    }

    /// Known sites merged with the hits counted so far
    #[must_use]
    pub fn snapshot(&self) -> CoverageRecord {
        let mut record = self.inner.known.lock().clone();
        for entry in &self.inner.hits {
            let ((file, site), hits) = (*entry.key(), *entry.value());
            record.record(file, site, hits);
        }
        record
    }

    /// Forget counted hits; known sites are kept
    pub fn reset(&self) {
        self.inner.hits.clear();
    }

    /// Number of distinct sites hit so far
    #[must_use]
    pub fn distinct_hits(&self) -> usize {
        self.inner.hits.len()
    }
}

/// Hit reporter handed to code under test
///
/// A default probe is inert: it belongs to a tracer nobody enables.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    inner: Arc<TracerInner>,
}

impl Probe {
    /// Record a hit on a line site
    #[inline]
    pub fn line(&self, file: &'static str, line: u32) {
        self.hit(file, Site::line(line));
    }

    /// Record a hit on a branch arm
    #[inline]
    pub fn branch(&self, file: &'static str, line: u32, arm: u32) {
        self.hit(file, Site::branch(line, arm));
    }

    /// Whether hits reported now will be counted
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    fn hit(&self, file: &'static str, site: Site) {
        if !self.is_active() {
            return;
        }
        let mut count = self.inner.hits.entry((file, site)).or_insert(0);
        *count = count.saturating_add(1);
    }
}

/// Record a hit on the current line
///
/// ```rust,ignore
/// fn dispatch(probe: &Probe) {
///     testcov_tracer::probe!(probe);
/// }
/// ```
#[macro_export]
macro_rules! probe {
    ($probe:expr) => {
        $probe.line(file!(), line!())
    };
}

/// Record a hit on branch arm `$arm` of the current line
///
/// Use an integer literal for `$arm` so the site can be discovered statically.
#[macro_export]
macro_rules! branch {
    ($probe:expr, $arm:expr) => {
        $probe.branch(file!(), line!(), $arm)
    };
}
