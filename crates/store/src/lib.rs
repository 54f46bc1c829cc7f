//! Durable collaborator stores: device tokens, campaigns, and the
//! delivery ledger.
//!
//! Each store is a trait so the engine and request handlers can be wired
//! with in-memory fakes in tests; the PostgreSQL implementations live
//! alongside them.

pub mod campaigns;
pub mod ledger;
pub mod tokens;
pub mod traits;

pub use campaigns::PgCampaignStore;
pub use ledger::PgDeliveryLedger;
pub use tokens::PgTokenStore;
pub use traits::{CampaignStore, DeliveryLedger, TokenStore};
