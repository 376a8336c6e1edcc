// Pure client-side types: errors, envelopes, ids, page windows, activity records.
pub mod activity;
pub mod envelope;
pub mod error;
pub mod ident;
pub mod page;
