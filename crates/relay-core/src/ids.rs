//! ID prefix constants.
//!
//! IDs are generated in SQL as `{prefix}-{8 hex chars}` (see `RelayDb::generate_id`).
//! The prefix makes an ID self-describing in logs and URLs.

pub const PREFIX_ORGANIZATION: &str = "org";
pub const PREFIX_MEMBER: &str = "mem";
pub const PREFIX_LEAD: &str = "led";
pub const PREFIX_LEAD_FIELD: &str = "lfd";
pub const PREFIX_REFERRAL: &str = "ref";
pub const PREFIX_REFERRAL_FIELD: &str = "rfd";
pub const PREFIX_TICKET: &str = "tkt";
pub const PREFIX_MESSAGE: &str = "msg";
pub const PREFIX_RATING: &str = "rat";
pub const PREFIX_SUBSCRIPTION: &str = "sub";
pub const PREFIX_ACTIVITY: &str = "act";
pub const PREFIX_EMAIL_JOB: &str = "eml";

/// Every prefix in use, for exhaustive tests.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_ORGANIZATION,
    PREFIX_MEMBER,
    PREFIX_LEAD,
    PREFIX_LEAD_FIELD,
    PREFIX_REFERRAL,
    PREFIX_REFERRAL_FIELD,
    PREFIX_TICKET,
    PREFIX_MESSAGE,
    PREFIX_RATING,
    PREFIX_SUBSCRIPTION,
    PREFIX_ACTIVITY,
    PREFIX_EMAIL_JOB,
];
