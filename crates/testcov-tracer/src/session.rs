//! Scoped tracing sessions
//!
//! A [`TraceSession`] enables its tracer on construction and persists the
//! collected data when it ends. [`TraceSession::finish`] is the normal exit
//! and surfaces persistence errors; if the session is instead dropped
//! (panic, early return, cancelled future) the `Drop` impl still flushes,
//! logging any failure, so already-collected coverage is never lost.

use crate::record::CoverageRecord;
use crate::store::CoverageStore;
use crate::tracer::{Probe, Tracer};
use testcov_core::HarnessError;

/// Tracing enabled for the lifetime of this value
#[derive(Debug)]
pub struct TraceSession {
    tracer: Tracer,
    store: CoverageStore,
    finished: bool,
}

impl TraceSession {
    /// Clear `tracer`'s hits, enable it and tie its data to `store`
    #[must_use]
    pub fn start(tracer: Tracer, store: CoverageStore) -> Self {
        tracer.reset();
        tracer.enable();
        tracing::info!(
            data_file = %store.path().display(),
            append = store.is_append(),
            "coverage tracing started"
        );
        Self {
            tracer,
            store,
            finished: false,
        }
    }

    /// Probe for code under test
    #[inline]
    #[must_use]
    pub fn probe(&self) -> Probe {
        self.tracer.probe()
    }

    /// The underlying tracer
    #[inline]
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Data store this session persists to
    #[inline]
    #[must_use]
    pub fn store(&self) -> &CoverageStore {
        &self.store
    }

    /// Stop tracing and persist
    ///
    /// Returns the record as written (merged with prior data in append mode).
    ///
    /// # Errors
    /// Returns `HarnessError::Persistence` if the data file cannot be written.
    pub fn finish(mut self) -> Result<CoverageRecord, HarnessError> {
        self.finished = true;
        self.flush()
    }

    fn flush(&self) -> Result<CoverageRecord, HarnessError> {
        self.tracer.disable();
        let record = self.tracer.snapshot();
        let written = self.store.save(&record)?;
        tracing::info!(
            data_file = %self.store.path().display(),
            sites = written.site_count(),
            "coverage data persisted"
        );
        Ok(written)
    }
}

impl Drop for TraceSession {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        match self.flush() {
            Ok(_) => tracing::warn!(
                data_file = %self.store.path().display(),
                "trace session ended early; partial coverage data flushed"
            ),
            Err(err) => tracing::error!(error = %err, "failed to flush partial coverage data"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::load_file;
    use testcov_core::Site;

    #[test]
    fn finish_persists_and_disables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".testcov.json");
        let tracer = Tracer::new();

        let session = TraceSession::start(tracer.clone(), CoverageStore::new(&path));
        assert!(tracer.is_enabled());
        session.probe().line("a.rs", 1);

        let written = session.finish().unwrap();
        assert!(!tracer.is_enabled());
        assert_eq!(written.hits("a.rs", Site::line(1)), Some(1));
        assert_eq!(load_file(&path).unwrap(), written);
    }

    #[test]
    fn drop_flushes_partial_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".testcov.json");

        {
            let session = TraceSession::start(Tracer::new(), CoverageStore::new(&path));
            session.probe().line("a.rs", 7);
        }

        assert_eq!(load_file(&path).unwrap().hits("a.rs", Site::line(7)), Some(1));
    }

    #[test]
    fn drop_flushes_during_panic_unwind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".testcov.json");
        let inner_path = path.clone();

        let outcome = std::panic::catch_unwind(move || {
            let session = TraceSession::start(Tracer::new(), CoverageStore::new(inner_path));
            session.probe().line("a.rs", 3);
            panic!("test runner blew up");
        });

        assert!(outcome.is_err());
        assert_eq!(load_file(&path).unwrap().hits("a.rs", Site::line(3)), Some(1));
    }

    #[test]
    fn finish_surfaces_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join(".testcov.json");

        let session = TraceSession::start(Tracer::new(), CoverageStore::new(path));
        let err = session.finish().unwrap_err();
        assert!(matches!(err, HarnessError::Persistence { .. }));
    }
}
