//! Purpose: Find the last page of a list when the service exposes no total count.
//! Exports: `PaginationScanner`, `ScanGuard`, `Pager`, `DEFAULT_MAX_PROBES`.
//! Role: Bounded sequential probe layered on `ResourceCollection`; `Pager` adds guarded navigation.
//! Invariants: At most `max_probes` fetches per scan; page size is fixed by the collection.
//! Invariants: An exhausted or failed scan leaves the pre-scan window in place.
//! Invariants: While a scan is in flight, new scans and pager navigation are refused with `Busy`.
#![allow(clippy::result_large_err)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;

use super::collection::ResourceCollection;
use super::gateway::ApiResult;
use super::model::ListItem;
use crate::core::error::{Error, ErrorKind};
use crate::core::page::PageWindow;

pub const DEFAULT_MAX_PROBES: u32 = 50;

#[derive(Clone, Debug, Default)]
pub struct PaginationScanner {
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the scan ends, however it ends.
pub struct ScanGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl PaginationScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claims the busy flag, or `None` if a scan already holds it.
    pub fn try_begin(&self) -> Option<ScanGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Probes `start_page`, `start_page + 1`, ... until a short page turns up.
    ///
    /// The first window with fewer than `page_size` items (possibly zero, when
    /// items vanished between probes) becomes the collection's window. If
    /// `max_probes` fetches all come back full, or any probe fails, the window
    /// held before the scan is restored.
    pub fn find_last_page<T>(
        &self,
        collection: &mut ResourceCollection<T>,
        start_page: u32,
        max_probes: u32,
    ) -> ApiResult<PageWindow<T>>
    where
        T: DeserializeOwned + ListItem + Clone,
    {
        let Some(_guard) = self.try_begin() else {
            return Err(Error::new(ErrorKind::Busy)
                .with_message("a last-page scan is already in flight")
                .with_hint("Wait for the running scan to finish."));
        };

        let prior = collection.window().cloned();
        let page_size = collection.page_size();
        let mut page = start_page.max(1);

        for probe in 0..max_probes {
            let window = match collection.fetch(page) {
                Ok(window) => window,
                Err(err) => {
                    tracing::warn!(page, probe, error = %err, "last-page scan failed; restoring window");
                    collection.restore(prior);
                    return Err(err);
                }
            };
            if window.is_terminal() {
                tracing::debug!(page, probes = probe + 1, items = window.len(), "last page found");
                return Ok(collection.replace(window).clone());
            }
            page = match page.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        collection.restore(prior);
        Err(Error::new(ErrorKind::ScanExhausted)
            .with_message(format!(
                "no short page within {max_probes} probes of {page_size} items"
            ))
            .with_hint("Raise the probe budget or page forward manually."))
    }
}

/// A collection paired with its scanner: the navigation surface list views use.
pub struct Pager<T> {
    collection: ResourceCollection<T>,
    scanner: PaginationScanner,
    max_probes: u32,
}

impl<T> Pager<T>
where
    T: DeserializeOwned + ListItem + Clone,
{
    pub fn new(collection: ResourceCollection<T>) -> Self {
        Self {
            collection,
            scanner: PaginationScanner::new(),
            max_probes: DEFAULT_MAX_PROBES,
        }
    }

    pub fn with_max_probes(mut self, max_probes: u32) -> Self {
        self.max_probes = max_probes;
        self
    }

    pub fn with_scanner(mut self, scanner: PaginationScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn collection(&self) -> &ResourceCollection<T> {
        &self.collection
    }

    pub fn collection_mut(&mut self) -> &mut ResourceCollection<T> {
        &mut self.collection
    }

    pub fn into_collection(self) -> ResourceCollection<T> {
        self.collection
    }

    pub fn scanner(&self) -> &PaginationScanner {
        &self.scanner
    }

    pub fn is_busy(&self) -> bool {
        self.scanner.is_busy()
    }

    pub fn can_next(&self) -> bool {
        !self.is_busy() && self.collection.has_next()
    }

    pub fn can_prev(&self) -> bool {
        !self.is_busy() && self.collection.has_prev()
    }

    pub fn jump(&mut self, page: u32) -> ApiResult<&PageWindow<T>> {
        self.ensure_idle()?;
        self.collection.load(page)
    }

    pub fn next(&mut self) -> ApiResult<&PageWindow<T>> {
        self.ensure_idle()?;
        if !self.collection.has_next() {
            return Err(Error::new(ErrorKind::Usage).with_message("already on the last page"));
        }
        let page = self.collection.current_page().saturating_add(1);
        self.collection.load(page)
    }

    pub fn prev(&mut self) -> ApiResult<&PageWindow<T>> {
        self.ensure_idle()?;
        if !self.collection.has_prev() {
            return Err(Error::new(ErrorKind::Usage).with_message("already on the first page"));
        }
        let page = self.collection.current_page() - 1;
        self.collection.load(page)
    }

    /// Scans forward from the current page.
    pub fn last(&mut self) -> ApiResult<PageWindow<T>> {
        let start = self.collection.current_page();
        self.scanner
            .find_last_page(&mut self.collection, start, self.max_probes)
    }

    fn ensure_idle(&self) -> ApiResult<()> {
        if self.scanner.is_busy() {
            return Err(Error::new(ErrorKind::Busy)
                .with_message("pagination is disabled while a last-page scan runs"));
        }
        Ok(())
    }
}
