// src/workflow.rs
//
// Status state machine and repair-timer accumulation, pure over an in-memory
// ticket row. Handlers load the row FOR UPDATE, apply a change here, then
// persist the mutated fields and the audit entry in the same transaction.

use chrono::{DateTime, Utc};

use crate::models::{Ticket, TicketHistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    AwaitingDiagnosis,
    AwaitingPart,
    PartReceived,
    AwaitingClientApproval,
    InRepair,
    RepairComplete,
    ReturnedToClient,
    Closed,
}

pub const ALL_STATUSES: [TicketStatus; 8] = [
    TicketStatus::AwaitingDiagnosis,
    TicketStatus::AwaitingPart,
    TicketStatus::PartReceived,
    TicketStatus::AwaitingClientApproval,
    TicketStatus::InRepair,
    TicketStatus::RepairComplete,
    TicketStatus::ReturnedToClient,
    TicketStatus::Closed,
];

impl TicketStatus {
    /// Wire/database form.
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::AwaitingDiagnosis => "awaiting_diagnosis",
            TicketStatus::AwaitingPart => "awaiting_part",
            TicketStatus::PartReceived => "part_received",
            TicketStatus::AwaitingClientApproval => "awaiting_client_approval",
            TicketStatus::InRepair => "in_repair",
            TicketStatus::RepairComplete => "repair_complete",
            TicketStatus::ReturnedToClient => "returned_to_client",
            TicketStatus::Closed => "closed",
        }
    }

    /// Human form used in audit lines and notifications.
    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::AwaitingDiagnosis => "Awaiting diagnosis",
            TicketStatus::AwaitingPart => "Awaiting part",
            TicketStatus::PartReceived => "Part received",
            TicketStatus::AwaitingClientApproval => "Awaiting client approval",
            TicketStatus::InRepair => "In repair",
            TicketStatus::RepairComplete => "Repair complete",
            TicketStatus::ReturnedToClient => "Returned to client",
            TicketStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<TicketStatus> {
        ALL_STATUSES.iter().copied().find(|st| st.as_str() == s)
    }
}

/// The workflow deliberately imposes no adjacency restriction: any status may
/// follow any other, including leaving `closed`. Stricter rules belong here
/// as a lookup table keyed by the current status, should they ever be wanted.
pub fn transition_allowed(_from: TicketStatus, _to: TicketStatus) -> bool {
    true
}

/// Outcome of applying a status change, ready to persist.
#[derive(Debug)]
pub struct AppliedChange {
    pub old_status: TicketStatus,
    pub new_status: TicketStatus,
    pub audit_line: String,
    pub entered_repair_complete: bool,
}

/// Mutates the ticket in memory: status, repair timer fields, `closed_at`.
/// Returns `None` when the stored status is outside the known set (the
/// schema CHECK prevents that; treated as a data inconsistency upstream).
pub fn apply_status_change(
    ticket: &mut Ticket,
    new_status: TicketStatus,
    now: DateTime<Utc>,
) -> Option<AppliedChange> {
    let old_status = TicketStatus::parse(&ticket.status)?;

    // Timer side effects ride along with the transition itself.
    if new_status == TicketStatus::InRepair && old_status != TicketStatus::InRepair {
        enter_repair(ticket, now);
    } else if old_status == TicketStatus::InRepair && new_status != TicketStatus::InRepair {
        exit_repair(ticket, now);
    }

    if new_status == TicketStatus::Closed && ticket.closed_at.is_none() {
        ticket.closed_at = Some(now);
    }

    ticket.status = new_status.as_str().to_string();
    ticket.updated_at = now;

    Some(AppliedChange {
        old_status,
        new_status,
        audit_line: format!("Status: {} → {}", old_status.label(), new_status.label()),
        entered_repair_complete: new_status == TicketStatus::RepairComplete
            && old_status != TicketStatus::RepairComplete,
    })
}

fn enter_repair(ticket: &mut Ticket, now: DateTime<Utc>) {
    ticket.repair_start = Some(now);
    ticket.repair_end = None;
}

fn exit_repair(ticket: &mut Ticket, now: DateTime<Utc>) {
    // A missing repair_start is a data inconsistency; skip silently rather
    // than block the status change.
    let Some(start) = ticket.repair_start else {
        return;
    };
    let elapsed = (now - start).num_seconds().max(0);
    ticket.repair_end = Some(now);
    ticket.repair_seconds_accumulated += elapsed;
}

// ───────────────────────────────────────
// Operator notes
// ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteTag {
    Note,
    Internal,
    Alert,
}

impl NoteTag {
    pub fn as_str(self) -> &'static str {
        match self {
            NoteTag::Note => "note",
            NoteTag::Internal => "internal",
            NoteTag::Alert => "alert",
        }
    }

    pub fn parse(s: &str) -> Option<NoteTag> {
        match s {
            "note" | "public" => Some(NoteTag::Note),
            "internal" => Some(NoteTag::Internal),
            "alert" => Some(NoteTag::Alert),
            _ => None,
        }
    }
}

/// Kinds visible on customer-facing views.
pub fn is_public_kind(kind: &str) -> bool {
    kind == "status" || kind == "note"
}

/// Renders the legacy newline-delimited text log from the structured trail.
/// The structured rows are the source of truth; this is display only.
pub fn render_history(entries: &[TicketHistoryEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let marker = match e.kind.as_str() {
            "internal" => "[internal] ",
            "alert" => "[!] ",
            _ => "",
        };
        out.push_str(&format!(
            "[{}] {}{}\n",
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            marker,
            e.content
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
    }

    fn ticket(status: TicketStatus) -> Ticket {
        Ticket {
            ticket_id: 1,
            client_id: 1,
            code: Some("T-000001".into()),
            device: None,
            issue: None,
            status: status.as_str().to_string(),
            paid: false,
            estimated_quote: None,
            final_tariff: None,
            supplement_price: None,
            deposit_paid: None,
            discount_amount: None,
            discount_percent: None,
            repair_start: None,
            repair_end: None,
            repair_seconds_accumulated: 0,
            closed_at: None,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    #[test]
    fn every_transition_is_allowed() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                assert!(transition_allowed(from, to));
            }
        }
    }

    #[test]
    fn status_round_trips_through_wire_form() {
        for st in ALL_STATUSES {
            assert_eq!(TicketStatus::parse(st.as_str()), Some(st));
        }
        assert_eq!(TicketStatus::parse("shipped"), None);
    }

    #[test]
    fn audit_line_encodes_old_and_new() {
        let mut t = ticket(TicketStatus::AwaitingDiagnosis);
        let change = apply_status_change(&mut t, TicketStatus::InRepair, t0()).unwrap();
        assert_eq!(change.old_status, TicketStatus::AwaitingDiagnosis);
        assert_eq!(change.new_status, TicketStatus::InRepair);
        assert_eq!(change.audit_line, "Status: Awaiting diagnosis → In repair");
    }

    #[test]
    fn same_status_change_is_legal_and_audited() {
        let mut t = ticket(TicketStatus::AwaitingPart);
        let change = apply_status_change(&mut t, TicketStatus::AwaitingPart, t0()).unwrap();
        assert_eq!(change.audit_line, "Status: Awaiting part → Awaiting part");
        assert_eq!(t.status, "awaiting_part");
        // No timer side effect on a no-op transition.
        assert!(t.repair_start.is_none());
    }

    #[test]
    fn timer_accumulates_across_two_repair_intervals() {
        let mut t = ticket(TicketStatus::AwaitingDiagnosis);
        let mut now = t0();

        apply_status_change(&mut t, TicketStatus::InRepair, now).unwrap();
        assert_eq!(t.repair_start, Some(now));
        assert!(t.repair_end.is_none());

        now += Duration::seconds(600); // d1 = 600s
        apply_status_change(&mut t, TicketStatus::AwaitingPart, now).unwrap();
        assert_eq!(t.repair_seconds_accumulated, 600);
        assert_eq!(t.repair_end, Some(now));

        now += Duration::seconds(86_400); // a day waiting for the part
        apply_status_change(&mut t, TicketStatus::InRepair, now).unwrap();
        assert!(t.repair_end.is_none());

        now += Duration::seconds(250); // d2 = 250s
        apply_status_change(&mut t, TicketStatus::RepairComplete, now).unwrap();
        assert_eq!(t.repair_seconds_accumulated, 850);
    }

    #[test]
    fn staying_in_repair_does_not_reset_the_timer() {
        let mut t = ticket(TicketStatus::AwaitingDiagnosis);
        let start = t0();
        apply_status_change(&mut t, TicketStatus::InRepair, start).unwrap();
        apply_status_change(&mut t, TicketStatus::InRepair, start + Duration::seconds(100)).unwrap();
        assert_eq!(t.repair_start, Some(start));
        assert_eq!(t.repair_seconds_accumulated, 0);
    }

    #[test]
    fn exit_with_missing_start_is_skipped_silently() {
        let mut t = ticket(TicketStatus::InRepair);
        t.repair_start = None;
        let change = apply_status_change(&mut t, TicketStatus::RepairComplete, t0()).unwrap();
        assert_eq!(t.repair_seconds_accumulated, 0);
        assert!(t.repair_end.is_none());
        assert!(change.entered_repair_complete);
    }

    #[test]
    fn closed_at_is_set_once_and_never_cleared() {
        let mut t = ticket(TicketStatus::ReturnedToClient);
        let closed = t0();
        apply_status_change(&mut t, TicketStatus::Closed, closed).unwrap();
        assert_eq!(t.closed_at, Some(closed));

        // Reopening and re-closing later must not touch closed_at.
        let later = closed + Duration::days(3);
        apply_status_change(&mut t, TicketStatus::InRepair, later).unwrap();
        assert_eq!(t.closed_at, Some(closed));
        apply_status_change(&mut t, TicketStatus::Closed, later + Duration::hours(1)).unwrap();
        assert_eq!(t.closed_at, Some(closed));
    }

    #[test]
    fn repair_complete_flag_only_on_entry() {
        let mut t = ticket(TicketStatus::InRepair);
        t.repair_start = Some(t0());
        let c = apply_status_change(&mut t, TicketStatus::RepairComplete, t0()).unwrap();
        assert!(c.entered_repair_complete);
        let c = apply_status_change(&mut t, TicketStatus::RepairComplete, t0()).unwrap();
        assert!(!c.entered_repair_complete);
    }

    #[test]
    fn history_rendering_marks_internal_and_alert_entries() {
        let at = t0();
        let entries = vec![
            TicketHistoryEntry {
                history_id: 1,
                ticket_id: 1,
                kind: "status".into(),
                content: "Status: Awaiting diagnosis → In repair".into(),
                created_at: at,
            },
            TicketHistoryEntry {
                history_id: 2,
                ticket_id: 1,
                kind: "internal".into(),
                content: "ordered screen from supplier".into(),
                created_at: at,
            },
            TicketHistoryEntry {
                history_id: 3,
                ticket_id: 1,
                kind: "alert".into(),
                content: "water damage found".into(),
                created_at: at,
            },
        ];
        let text = render_history(&entries);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Status: Awaiting diagnosis → In repair"));
        assert!(lines[1].contains("[internal] ordered screen"));
        assert!(lines[2].contains("[!] water damage"));
    }

    #[test]
    fn public_kind_filter() {
        assert!(is_public_kind("status"));
        assert!(is_public_kind("note"));
        assert!(!is_public_kind("internal"));
        assert!(!is_public_kind("alert"));
    }
}
