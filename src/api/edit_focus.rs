//! Purpose: Ownership-gated, single-focus edit/delete state machine for list items.
//! Exports: `EditFocus`, `EditState`, `EditBuffer`, `can_edit`.
//! Role: One instance per list view (e.g. the comments of one post), built on `ResourceCollection`.
//! Invariants: At most one item is being edited; the state enum makes a second buffer unrepresentable.
//! Invariants: Edit and delete require the signed-in identity to own the item (numeric id match).
//! Invariants: Failed saves/deletes leave the state as it was before the call.
#![allow(clippy::result_large_err)]

use serde::de::DeserializeOwned;

use super::collection::ResourceCollection;
use super::gateway::ApiResult;
use super::model::{Editable, Identity};
use super::session::SessionContext;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditBuffer {
    pub target_id: i64,
    pub draft: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Viewing,
    Editing(EditBuffer),
}

/// The ownership gate.
pub fn can_edit<T>(identity: Option<&Identity>, item: &T) -> bool
where
    T: Editable,
{
    match (identity, item.owner_id()) {
        (Some(identity), Some(owner)) => identity.id.numeric_eq(owner),
        _ => false,
    }
}

pub struct EditFocus<T> {
    collection: ResourceCollection<T>,
    state: EditState,
}

impl<T> EditFocus<T>
where
    T: DeserializeOwned + Editable + Clone,
{
    pub fn new(collection: ResourceCollection<T>) -> Self {
        Self {
            collection,
            state: EditState::Viewing,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn editing_id(&self) -> Option<i64> {
        match &self.state {
            EditState::Editing(buffer) => Some(buffer.target_id),
            EditState::Viewing => None,
        }
    }

    pub fn collection(&self) -> &ResourceCollection<T> {
        &self.collection
    }

    pub fn items(&self) -> &[T] {
        self.collection.items()
    }

    pub fn load(&mut self, page: u32) -> ApiResult<()> {
        self.collection.load(page)?;
        Ok(())
    }

    pub fn reload(&mut self) -> ApiResult<()> {
        self.collection.reload()?;
        Ok(())
    }

    pub fn can_edit(&self, session: &SessionContext, item: &T) -> bool {
        can_edit(session.current(), item)
    }

    /// Focuses `item`, silently dropping any other unsaved draft.
    pub fn begin_edit(&mut self, session: &SessionContext, item: &T) -> ApiResult<()> {
        if !self.can_edit(session, item) {
            return Err(not_owner(item.item_id()));
        }
        self.state = EditState::Editing(EditBuffer {
            target_id: item.item_id(),
            draft: item.editable_content().to_string(),
        });
        Ok(())
    }

    /// `begin_edit` for an item in the current window.
    pub fn begin_edit_by_id(&mut self, session: &SessionContext, id: i64) -> ApiResult<()> {
        let item = self.collection.find(id).cloned().ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("item {id} is not on this page"))
        })?;
        self.begin_edit(session, &item)
    }

    pub fn set_draft(&mut self, text: impl Into<String>) -> ApiResult<()> {
        match &mut self.state {
            EditState::Editing(buffer) => {
                buffer.draft = text.into();
                Ok(())
            }
            EditState::Viewing => Err(not_editing()),
        }
    }

    /// Drops the draft. No network call.
    pub fn cancel_edit(&mut self) {
        self.state = EditState::Viewing;
    }

    pub fn save_edit(&mut self) -> ApiResult<()> {
        let EditState::Editing(buffer) = &self.state else {
            return Err(not_editing());
        };
        let draft = buffer.draft.trim();
        if draft.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("draft is empty"));
        }
        let target_id = buffer.target_id;
        self.collection
            .send_update(target_id, &T::update_payload(draft))?;
        self.state = EditState::Viewing;
        self.collection.reload()?;
        Ok(())
    }

    /// Deletes an owned item; available regardless of edit focus.
    pub fn delete(&mut self, session: &SessionContext, item: &T) -> ApiResult<()> {
        if !self.can_edit(session, item) {
            return Err(not_owner(item.item_id()));
        }
        let id = item.item_id();
        self.collection.send_remove(id)?;
        if self.editing_id() == Some(id) {
            self.state = EditState::Viewing;
        }
        self.collection.reload()?;
        Ok(())
    }

    pub fn delete_by_id(&mut self, session: &SessionContext, id: i64) -> ApiResult<()> {
        let item = self.collection.find(id).cloned().ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message(format!("item {id} is not on this page"))
        })?;
        self.delete(session, &item)
    }

    /// Creates a new item from the trimmed `content`; blank content sends nothing.
    pub fn submit(&mut self, content: &str) -> ApiResult<Option<T>> {
        if !matches!(self.state, EditState::Viewing) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("finish or cancel the current edit first"));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("content is empty"));
        }
        self.collection.create(&T::create_payload(content))
    }
}

fn not_owner(id: i64) -> Error {
    Error::new(ErrorKind::Permission).with_message(format!("item {id} belongs to someone else"))
}

fn not_editing() -> Error {
    Error::new(ErrorKind::Usage).with_message("no item is being edited")
}
