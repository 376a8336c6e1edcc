//! Purpose: Generic paged view over one remote list resource.
//! Exports: `ResourceCollection`, `ReloadPolicy`, `Paging`.
//! Role: Shared by every list view; loads pages and runs create/update/remove through the gateway.
//! Invariants: The held window is replaced wholesale from a successful response, never patched.
//! Invariants: Writes complete before their reload is issued; a failed load keeps the prior window.
//! Invariants: `has_next`/`has_prev` are window-size heuristics; there is no total count.
//! Invariants: Create and remove drop cached `before` cursors; later pages are re-walked.
#![allow(clippy::result_large_err)]

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::form_urlencoded;

use super::gateway::{ApiResult, RequestGateway};
use super::model::ListItem;
use crate::core::error::{Error, ErrorKind};
use crate::core::page::PageWindow;

/// Which page to show again after a successful write.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReloadPolicy {
    /// Top-level lists: new items land on page 1.
    FirstPage,
    /// Nested lists under a detail view: stay where the user is.
    CurrentPage,
}

/// How the list endpoint addresses pages.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Paging {
    /// `?page=N&limit=M`.
    #[default]
    Numbered,
    /// `?before=<id>&limit=M`, newest first. Page N+1 lists items older than
    /// the last item of page N, so reaching page N walks pages 1..N once.
    Before,
}

pub struct ResourceCollection<T> {
    gateway: RequestGateway,
    list_path: String,
    item_path: String,
    page_size: u32,
    reload: ReloadPolicy,
    paging: Paging,
    // cursors[i] is the `before` id that opens page i + 2.
    cursors: Vec<i64>,
    window: Option<PageWindow<T>>,
}

impl<T> ResourceCollection<T>
where
    T: DeserializeOwned + ListItem + Clone,
{
    /// A collection whose items are addressed under the list path itself.
    pub fn new(
        gateway: RequestGateway,
        list_path: impl Into<String>,
        page_size: u32,
        reload: ReloadPolicy,
    ) -> Self {
        let list_path = list_path.into();
        Self {
            gateway,
            item_path: list_path.clone(),
            list_path,
            page_size: page_size.max(1),
            reload,
            paging: Paging::Numbered,
            cursors: Vec::new(),
            window: None,
        }
    }

    /// Items updated/removed under a different base, e.g. `/api/comments`.
    pub fn with_item_path(mut self, item_path: impl Into<String>) -> Self {
        self.item_path = item_path.into();
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    pub fn list_path(&self) -> &str {
        &self.list_path
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn reload_policy(&self) -> ReloadPolicy {
        self.reload
    }

    pub fn paging(&self) -> Paging {
        self.paging
    }

    pub fn window(&self) -> Option<&PageWindow<T>> {
        self.window.as_ref()
    }

    pub fn items(&self) -> &[T] {
        self.window.as_ref().map(PageWindow::items).unwrap_or(&[])
    }

    pub fn find(&self, id: i64) -> Option<&T> {
        self.items().iter().find(|item| item.item_id() == id)
    }

    pub fn current_page(&self) -> u32 {
        self.window.as_ref().map(PageWindow::page).unwrap_or(1)
    }

    pub fn has_next(&self) -> bool {
        self.window.as_ref().is_some_and(PageWindow::has_next)
    }

    pub fn has_prev(&self) -> bool {
        self.window.as_ref().is_some_and(PageWindow::has_prev)
    }

    /// Fetches a page without touching the held window.
    pub fn fetch(&mut self, page: u32) -> ApiResult<PageWindow<T>> {
        if page < 1 {
            return Err(Error::new(ErrorKind::Usage).with_message("page numbers start at 1"));
        }
        match self.paging {
            Paging::Numbered => {
                let items = self.fetch_items(&self.numbered_path(page))?;
                Ok(PageWindow::new(items, page, self.page_size))
            }
            Paging::Before => self.fetch_before(page),
        }
    }

    pub fn load(&mut self, page: u32) -> ApiResult<&PageWindow<T>> {
        let window = self.fetch(page)?;
        Ok(self.window.insert(window))
    }

    pub fn reload(&mut self) -> ApiResult<&PageWindow<T>> {
        let page = match self.reload {
            ReloadPolicy::FirstPage => 1,
            ReloadPolicy::CurrentPage => self.current_page(),
        };
        self.load(page)
    }

    /// Fetches one item by id.
    pub fn get(&self, id: i64) -> ApiResult<T> {
        self.gateway
            .get_data::<T>(&self.item_url(id))?
            .ok_or_else(|| {
                Error::new(ErrorKind::Decode).with_message(format!("item {id} came back empty"))
            })
    }

    pub fn create<P>(&mut self, payload: &P) -> ApiResult<Option<T>>
    where
        P: Serialize + ?Sized,
    {
        let created = self.send_create(payload)?;
        self.reload()?;
        Ok(created)
    }

    /// Updates in place, then re-reads the page being shown.
    pub fn update<P>(&mut self, id: i64, payload: &P) -> ApiResult<()>
    where
        P: Serialize + ?Sized,
    {
        self.send_update(id, payload)?;
        self.load(self.current_page())?;
        Ok(())
    }

    /// Removes, then re-reads the page being shown.
    pub fn remove(&mut self, id: i64) -> ApiResult<()> {
        self.send_remove(id)?;
        self.load(self.current_page())?;
        Ok(())
    }

    pub(crate) fn send_create<P>(&mut self, payload: &P) -> ApiResult<Option<T>>
    where
        P: Serialize + ?Sized,
    {
        let envelope = self.gateway.post(&self.list_path, payload)?;
        self.cursors.clear();
        if envelope.is_non_json() {
            return Ok(None);
        }
        envelope.into_data()
    }

    pub(crate) fn send_update<P>(&self, id: i64, payload: &P) -> ApiResult<()>
    where
        P: Serialize + ?Sized,
    {
        self.gateway.put(&self.item_url(id), payload)?;
        Ok(())
    }

    pub(crate) fn send_remove(&mut self, id: i64) -> ApiResult<()> {
        self.gateway.delete(&self.item_url(id))?;
        self.cursors.clear();
        Ok(())
    }

    /// Puts back a window captured earlier, e.g. after an abandoned scan.
    pub(crate) fn restore(&mut self, window: Option<PageWindow<T>>) {
        self.window = window;
    }

    pub(crate) fn replace(&mut self, window: PageWindow<T>) -> &PageWindow<T> {
        self.window.insert(window)
    }

    fn fetch_items(&self, path: &str) -> ApiResult<Vec<T>> {
        Ok(self.gateway.get(path)?.into_data()?.unwrap_or_default())
    }

    /// Walks forward from the furthest page whose cursor is known.
    fn fetch_before(&mut self, page: u32) -> ApiResult<PageWindow<T>> {
        let target = page as usize;
        let full = self.page_size as usize;
        let mut current = (self.cursors.len() + 1).min(target);
        loop {
            let before = current
                .checked_sub(2)
                .and_then(|idx| self.cursors.get(idx).copied());
            let items = self.fetch_items(&self.before_path(before))?;
            self.cursors.truncate(current - 1);
            let is_full = items.len() >= full;
            if is_full {
                if let Some(last) = items.last() {
                    self.cursors.push(last.item_id());
                }
            }
            if current == target {
                return Ok(PageWindow::new(items, page, self.page_size));
            }
            if !is_full {
                tracing::debug!(page, last_page = current, "list ends before requested page");
                return Ok(PageWindow::new(Vec::new(), page, self.page_size));
            }
            current += 1;
        }
    }

    fn numbered_path(&self, page: u32) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("page", &page.to_string())
            .append_pair("limit", &self.page_size.to_string())
            .finish();
        format!("{}?{query}", self.list_path)
    }

    fn before_path(&self, before: Option<i64>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(before) = before {
            query.append_pair("before", &before.to_string());
        }
        query.append_pair("limit", &self.page_size.to_string());
        format!("{}?{}", self.list_path, query.finish())
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/{id}", self.item_path.trim_end_matches('/'))
    }
}
