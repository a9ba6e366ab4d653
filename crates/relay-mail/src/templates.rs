//! Plain-text email templates.
//!
//! Each function renders a complete [`EmailMessage`]. `app_url` is the public
//! frontend URL used for links back into the app.

use relay_core::entities::{Member, Organization, SupportTicket, TicketMessage};

use crate::transport::EmailMessage;

fn ticket_link(app_url: &str, ticket: &SupportTicket) -> String {
    format!("{}/support/tickets/{}", app_url.trim_end_matches('/'), ticket.id)
}

/// New ticket notification for the support inbox.
#[must_use]
pub fn ticket_created(
    support_inbox: &str,
    ticket: &SupportTicket,
    first_message: &str,
    app_url: &str,
) -> EmailMessage {
    EmailMessage {
        to: support_inbox.to_string(),
        subject: format!("[{}] New ticket: {}", ticket.priority.label(), ticket.subject),
        body: format!(
            "A new support ticket was opened.\n\n\
             From: {}\n\
             Category: {}\n\
             Priority: {}\n\n\
             {}\n\n\
             Open the ticket: {}/admin/tickets/{}\n",
            ticket.requester_email,
            ticket.category.label(),
            ticket.priority.label(),
            first_message.trim(),
            app_url.trim_end_matches('/'),
            ticket.id,
        ),
    }
}

/// Staff reply, sent to the requester. Never used for internal notes.
#[must_use]
pub fn ticket_reply(ticket: &SupportTicket, message: &TicketMessage, app_url: &str) -> EmailMessage {
    EmailMessage {
        to: ticket.requester_email.clone(),
        subject: format!("Re: {}", ticket.subject),
        body: format!(
            "Our support team replied to your ticket \"{}\":\n\n\
             {}\n\n\
             Reply or view the conversation: {}\n",
            ticket.subject,
            message.body.trim(),
            ticket_link(app_url, ticket),
        ),
    }
}

/// Status change notice, sent to the requester.
#[must_use]
pub fn ticket_status_changed(ticket: &SupportTicket, app_url: &str) -> EmailMessage {
    let extra = if ticket.status.is_finished() {
        "\nLet us know how we did by rating the ticket.\n"
    } else {
        ""
    };
    EmailMessage {
        to: ticket.requester_email.clone(),
        subject: format!("Your ticket is now {}: {}", ticket.status.label().to_lowercase(), ticket.subject),
        body: format!(
            "The status of your ticket \"{}\" changed to {}.\n{extra}\n\
             View the ticket: {}\n",
            ticket.subject,
            ticket.status.label(),
            ticket_link(app_url, ticket),
        ),
    }
}

/// Welcome message for a member added to an organization.
#[must_use]
pub fn member_added(organization: &Organization, member: &Member, app_url: &str) -> EmailMessage {
    let greeting = member
        .name
        .as_deref()
        .map_or_else(|| "Hello,".to_string(), |name| format!("Hello {name},"));
    EmailMessage {
        to: member.email.clone(),
        subject: format!("You have been added to {} on Relay", organization.name),
        body: format!(
            "{greeting}\n\n\
             You now have {} access to {} on Relay.\n\n\
             Sign in: {}\n",
            member.role.label().to_lowercase(),
            organization.name,
            app_url.trim_end_matches('/'),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use relay_core::enums::{
        MemberRole, MessageAuthor, TicketCategory, TicketPriority, TicketStatus,
    };

    const APP: &str = "https://app.relay.example/";

    fn ticket(status: TicketStatus) -> SupportTicket {
        let now = Utc::now();
        SupportTicket {
            id: "tkt-0000abcd".into(),
            organization_id: None,
            requester_id: "user_c".into(),
            requester_email: "carol@example.com".into(),
            subject: "Cannot export".into(),
            category: TicketCategory::Technical,
            priority: TicketPriority::High,
            status,
            assignee_id: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    #[test]
    fn created_goes_to_the_inbox() {
        let msg = ticket_created("support@relay.example", &ticket(TicketStatus::Open), " Help! ", APP);
        assert_eq!(msg.to, "support@relay.example");
        assert_eq!(msg.subject, "[High] New ticket: Cannot export");
        assert!(msg.body.contains("From: carol@example.com"));
        assert!(msg.body.contains("\n\nHelp!\n\n"));
        assert!(msg.body.contains("https://app.relay.example/admin/tickets/tkt-0000abcd"));
    }

    #[test]
    fn reply_goes_to_the_requester() {
        let t = ticket(TicketStatus::InProgress);
        let message = TicketMessage {
            id: "msg-1".into(),
            ticket_id: t.id.clone(),
            author_id: "user_admin".into(),
            author: MessageAuthor::Staff,
            body: "Fixed in the latest release.".into(),
            internal: false,
            created_at: Utc::now(),
        };
        let msg = ticket_reply(&t, &message, APP);
        assert_eq!(msg.to, "carol@example.com");
        assert_eq!(msg.subject, "Re: Cannot export");
        assert!(msg.body.contains("Fixed in the latest release."));
        assert!(msg.body.contains("/support/tickets/tkt-0000abcd"));
    }

    #[test]
    fn resolved_status_asks_for_a_rating() {
        let resolved = ticket_status_changed(&ticket(TicketStatus::Resolved), APP);
        assert_eq!(resolved.subject, "Your ticket is now resolved: Cannot export");
        assert!(resolved.body.contains("rating"));
        let waiting = ticket_status_changed(&ticket(TicketStatus::WaitingOnCustomer), APP);
        assert!(!waiting.body.contains("rating"));
    }

    #[test]
    fn member_added_greets_by_name() {
        let now = Utc::now();
        let org = Organization {
            id: "org-1".into(),
            name: "Sunrise Home Health".into(),
            slug: "sunrise-home-health".into(),
            clerk_org_id: None,
            created_at: now,
            updated_at: now,
        };
        let member = Member {
            id: "mem-1".into(),
            organization_id: org.id.clone(),
            user_id: "user_d".into(),
            email: "dana@example.com".into(),
            name: Some("Dana".into()),
            role: MemberRole::Liaison,
            created_at: now,
        };
        let msg = member_added(&org, &member, APP);
        assert_eq!(msg.to, "dana@example.com");
        assert!(msg.body.starts_with("Hello Dana,"));
        assert!(msg.body.contains("liaison access to Sunrise Home Health"));
    }
}
