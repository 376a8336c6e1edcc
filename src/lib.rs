//! Purpose: Client core for a discussion-board REST service, shared by the `board` CLI and tests.
//! Exports: `api` (gateway, session, lists, scanning, edit focus), `config`, `core`.
//! Role: Library backing the binary; hosts embed `api::BoardClient` or its parts directly.
//! Invariants: Network I/O is blocking and happens only inside `api::RequestGateway`.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod config;
pub mod core;
