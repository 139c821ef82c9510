use anyhow::{bail, Result};

use crate::models::{NewTicket, Priority, Ticket};

const OPEN_STATUSES: [&str; 3] = ["open", "pending", "inprogress"];

/// Coarse status partition used to group the ticket list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Open,
    Closed,
}

/// `open`, `pending` and `in_progress` (any case, any underscores) are open;
/// everything else is closed.
pub fn classify_status(status: &str) -> StatusClass {
    let normalized = status.to_lowercase().replace('_', "");
    if OPEN_STATUSES.contains(&normalized.as_str()) {
        StatusClass::Open
    } else {
        StatusClass::Closed
    }
}

pub fn is_open(status: &str) -> bool {
    classify_status(status) == StatusClass::Open
}

/// Splits into (open, closed), preserving order.
pub fn partition_tickets(tickets: &[Ticket]) -> (Vec<&Ticket>, Vec<&Ticket>) {
    tickets.iter().partition(|ticket| is_open(&ticket.status))
}

/// Keeps tickets whose title or status contains `query`, ignoring case.
pub fn filter_tickets<'a>(tickets: &'a [Ticket], query: &str) -> Vec<&'a Ticket> {
    let query = query.trim().to_lowercase();
    tickets
        .iter()
        .filter(|ticket| {
            query.is_empty()
                || ticket.title.to_lowercase().contains(&query)
                || ticket.status.to_lowercase().contains(&query)
        })
        .collect()
}

/// Trims the fields and refuses a ticket without title or description.
pub fn prepare_ticket(
    title: &str,
    description: &str,
    priority: Option<Priority>,
    attachments: Vec<String>,
) -> Result<NewTicket> {
    let title = title.trim();
    let description = description.trim();

    if title.is_empty() {
        bail!("a ticket needs a title");
    }
    if description.is_empty() {
        bail!("a ticket needs a description");
    }

    let ticket = NewTicket::new(title, description).with_attachments(attachments);
    Ok(match priority {
        Some(priority) => ticket.with_priority(priority),
        None => ticket,
    })
}
