//! Purpose: Hold one page of a remote list plus the heuristics derived from it.
//! Exports: `PageWindow`.
//! Role: The unit a collection replaces wholesale on every successful load.
//! Invariants: `page >= 1`, `page_size > 0`, `items.len() <= page_size`.
//! Invariants: `has_next` iff the page came back full; there is no total count.

#[derive(Clone, Debug, PartialEq)]
pub struct PageWindow<T> {
    items: Vec<T>,
    page: u32,
    page_size: u32,
}

impl<T> PageWindow<T> {
    /// Builds a window, dropping anything past `page_size`.
    pub fn new(mut items: Vec<T>, page: u32, page_size: u32) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        if items.len() > page_size as usize {
            tracing::warn!(
                page,
                page_size,
                received = items.len(),
                "server returned more items than requested; truncating"
            );
            items.truncate(page_size as usize);
        }
        Self {
            items,
            page,
            page_size,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.items.len() == self.page_size as usize
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// A short page marks the end of the list.
    pub fn is_terminal(&self) -> bool {
        self.items.len() < self.page_size as usize
    }
}
