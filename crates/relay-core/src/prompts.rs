//! Prompt templates for the AI writing assistant.
//!
//! Pure string building: the HTTP client that sends these lives in
//! `relay-server`. Long values are truncated so a single record or thread
//! cannot blow the model's context.

use std::fmt::Write as _;

use crate::entities::{BoardRecord, Field, SupportTicket, TicketMessage};
use crate::enums::{BoardKind, MessageAuthor};

/// Longest value or message body copied into a prompt, in characters.
pub const MAX_SNIPPET_CHARS: usize = 1500;

/// Messages of a thread included in a reply prompt (most recent kept).
pub const MAX_THREAD_MESSAGES: usize = 20;

/// A chat prompt: one system message and one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_SNIPPET_CHARS).collect();
    out.push('…');
    out
}

/// Draft a follow-up email for a lead or a referral source.
///
/// `fields` should be the visible columns in display order; values of other
/// fields are ignored.
#[must_use]
pub fn follow_up(
    organization_name: &str,
    fields: &[Field],
    record: &BoardRecord,
    liaison_name: Option<&str>,
) -> Prompt {
    let audience = match record.board {
        BoardKind::Leads => "a prospective client (lead)",
        BoardKind::Referrals => "a referral partner who sent us a client",
    };

    let system = format!(
        "You write short, warm, professional follow-up emails on behalf of {organization_name}. \
         The recipient is {audience}. Never invent facts that are not in the record. \
         Reply with the email body only, no subject line, at most 150 words."
    );

    let mut user = String::from("Record details:\n");
    for field in fields {
        if let Some(value) = record.values.get(&field.id) {
            if !value.trim().is_empty() {
                let _ = writeln!(user, "- {}: {}", field.name, snippet(value));
            }
        }
    }
    if let Some(name) = liaison_name {
        let _ = writeln!(user, "- Liaison: {name}");
    }
    let _ = write!(
        user,
        "\nWrite the follow-up email. Record created on {}.",
        record.created_at.format("%Y-%m-%d")
    );

    Prompt { system, user }
}

/// Suggest a staff reply for a support thread.
///
/// Internal notes are included and marked so the model can use them as
/// context without quoting them.
#[must_use]
pub fn ticket_reply(ticket: &SupportTicket, messages: &[TicketMessage]) -> Prompt {
    let system = "You are a support agent for a referral management SaaS. \
                  Suggest a concise, friendly reply to the customer's latest message. \
                  Never reveal internal notes verbatim. Reply with the message body only."
        .to_string();

    let mut user = format!(
        "Ticket: {}\nCategory: {}\nPriority: {}\nStatus: {}\n\nConversation:\n",
        ticket.subject,
        ticket.category.as_str(),
        ticket.priority.as_str(),
        ticket.status.as_str(),
    );

    let skip = messages.len().saturating_sub(MAX_THREAD_MESSAGES);
    for message in messages.iter().skip(skip) {
        let speaker = match (message.author, message.internal) {
            (_, true) => "[internal note]",
            (MessageAuthor::Customer, false) => "Customer",
            (MessageAuthor::Staff, false) => "Support",
        };
        let _ = writeln!(user, "{speaker}: {}", snippet(&message.body));
    }
    user.push_str("\nWrite the next reply from Support.");

    Prompt { system, user }
}
