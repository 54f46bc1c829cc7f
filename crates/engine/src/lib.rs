//! Campaign dispatch engine and the thin services around it.
//!
//! `dispatch` is the core: it discovers due campaigns, fans pushes out to
//! every registered device, reconciles per-token outcomes into ledger
//! records and aggregate counters, and advances campaign status.
//! `registration` and `ack` back the two request handlers.

pub mod ack;
pub mod dispatch;
pub mod registration;
