//! Plain-text rendering for the terminal

use courtroom::{CourtEvent, InboxSnapshot, Message, MessageStatus, Ruling};

/// One inbox row
pub fn message_line(message: &Message) -> String {
    let marker = match message.status {
        MessageStatus::Urgent => "!",
        MessageStatus::Denied => "-",
        _ => " ",
    };
    format!(
        "{} #{:<4} {:<6} {}",
        marker, message.id, message.category, message.text
    )
}

pub fn ruling_banner(ruling: &Ruling) -> String {
    format!(
        "*** COURT *** Law broken: {}\n              {}\n              (type `ack` to acknowledge)",
        ruling.law, ruling.reason
    )
}

/// Inbox view for `list`
pub fn snapshot(snapshot: &InboxSnapshot) -> String {
    let mut out = format!(
        "[{}] {} message(s), {} escalating{}",
        snapshot.clock,
        snapshot.messages.len(),
        snapshot.armed,
        if snapshot.arrivals_running {
            ""
        } else {
            ", arrivals paused"
        }
    );
    if snapshot.messages.is_empty() {
        out.push_str("\n  inbox zero");
    }
    for message in &snapshot.messages {
        out.push('\n');
        out.push_str(&message_line(message));
    }
    if let Some(ruling) = &snapshot.ruling {
        out.push('\n');
        out.push_str(&ruling_banner(ruling));
    }
    out
}

/// Stored record for `show`
pub fn record(message: &Message) -> String {
    serde_json::to_string_pretty(message).unwrap_or_else(|_| message_line(message))
}

/// Line to print for a session event, if it is worth printing
pub fn event(event: &CourtEvent) -> Option<String> {
    match event {
        CourtEvent::InboxLoaded { loaded, armed, .. } => Some(format!(
            "Loaded {} message(s), {} escalating",
            loaded, armed
        )),
        CourtEvent::MessageArrived { message, .. } => {
            Some(format!("new  {}", message_line(message)))
        }
        CourtEvent::MessageEscalated {
            message,
            resurfaced,
            ..
        } => Some(if *resurfaced {
            format!("back {}", message_line(message))
        } else {
            format!("up   {}", message_line(message))
        }),
        CourtEvent::MessageFined { ruling, .. } => Some(ruling_banner(ruling)),
        CourtEvent::SessionEnded {
            cancelled_timers, ..
        } => Some(format!(
            "Session ended, {} pending escalation(s) cancelled",
            cancelled_timers
        )),
        // The command that caused these already printed a reply.
        CourtEvent::MessageResolved { .. }
        | CourtEvent::MessageDenied { .. }
        | CourtEvent::RulingDismissed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use courtroom::Category;

    fn message(id: i64, text: &str, status: MessageStatus) -> Message {
        Message {
            id,
            category: Category::Agile,
            text: text.to_string(),
            status,
            created_at: Utc::now(),
            escalatable: true,
            law_broken: Some("Disability Act".to_string()),
            reason: Some("Missing alt text impacts accessibility".to_string()),
        }
    }

    #[test]
    fn test_message_line_marks_urgent() {
        let line = message_line(&message(3, "URGENT: Fix alt in img1", MessageStatus::Urgent));
        assert_eq!(line, "! #3    Agile  URGENT: Fix alt in img1");
    }

    #[test]
    fn test_snapshot_with_ruling() {
        let view = snapshot(&InboxSnapshot {
            messages: vec![message(1, "Fix alt in img1", MessageStatus::Normal)],
            ruling: Some(Ruling {
                law: "Laws of Tort".to_string(),
                reason: "Known input validation flaw led to breach".to_string(),
            }),
            clock: "02:05".to_string(),
            armed: 1,
            arrivals_running: false,
        });
        let lines: Vec<_> = view.lines().collect();
        assert_eq!(lines[0], "[02:05] 1 message(s), 1 escalating, arrivals paused");
        assert!(lines[1].contains("Fix alt in img1"));
        assert!(lines[2].contains("Law broken: Laws of Tort"));
    }

    #[test]
    fn test_empty_snapshot() {
        let view = snapshot(&InboxSnapshot {
            messages: vec![],
            ruling: None,
            clock: "00:00".to_string(),
            armed: 0,
            arrivals_running: true,
        });
        assert_eq!(view, "[00:00] 0 message(s), 0 escalating\n  inbox zero");
    }

    #[test]
    fn test_quiet_events() {
        let resolved = CourtEvent::MessageResolved {
            message_id: 1,
            timestamp: Utc::now(),
        };
        assert!(event(&resolved).is_none());

        let back = CourtEvent::MessageEscalated {
            message: message(4, "URGENT: Fix alt in img1", MessageStatus::Urgent),
            resurfaced: true,
            timestamp: Utc::now(),
        };
        assert!(event(&back).unwrap().starts_with("back ! #4"));
    }
}
