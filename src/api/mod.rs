//! Purpose: Define the public Rust API for talking to a discussion-board service.
//! Exports: Gateway, session, list, scanner, and edit-focus types plus the domain model.
//! Role: Public surface used by the `board` CLI and by embedding hosts.
//! Invariants: Every component reaches the network through one shared `RequestGateway`.
//! Invariants: Internal modules remain private; only the re-exports below are stable.

mod board;
mod collection;
mod edit_focus;
mod gateway;
mod model;
mod scanner;
mod session;
#[cfg(test)]
pub(crate) mod testing;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::activity::{ActivityRecord, DEFAULT_ACTIVITY_CAPACITY};
pub use crate::core::envelope::{Envelope, NON_JSON_MESSAGE};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::ident::LooseId;
pub use crate::core::page::PageWindow;
pub use board::{BoardClient, COMMENTS_PATH, POSTS_PATH};
pub use collection::{Paging, ReloadPolicy, ResourceCollection};
pub use edit_focus::{EditBuffer, EditFocus, EditState, can_edit};
pub use gateway::{
    ApiResult, Method, OutboundRequest, RawResponse, RequestGateway, Transport, UreqTransport,
};
pub use model::{
    Comment, Credentials, Editable, Identity, ListItem, NewComment, NewPost, Post, PostPatch,
    SignupForm, UserSummary,
};
pub use scanner::{DEFAULT_MAX_PROBES, Pager, PaginationScanner, ScanGuard};
pub use session::SessionContext;
