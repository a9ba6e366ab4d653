//! Entity structs for all Relay domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `relay-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize` and `JsonSchema` so they double as API response bodies.

mod activity;
mod email;
mod event;
mod field;
mod organization;
mod record;
mod subscription;
mod ticket;

pub use activity::ActivityEntry;
pub use email::EmailJob;
pub use event::BoardEvent;
pub use field::Field;
pub use organization::{Member, Organization};
pub use record::{BoardRecord, FieldValue};
pub use subscription::Subscription;
pub use ticket::{SupportTicket, TicketMessage, TicketRating};
