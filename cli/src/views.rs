//! # Views
//!
//! Turns store state into text. Nothing here touches the network or the
//! session; every function is a pure rendering of what it is given, so the
//! screens are tested without a backend.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use riyada_client::config::DASHBOARD_RECENT_COUNT;
use riyada_client::types::{
    AuditLog, Direction, FinancialSummary, Identity, LedgerEntry, Page, Payment,
    PaymentStatusInfo, Registration, TransactionRecord, UserId, UserProfile,
};
use riyada_client::wallet::{format_amount, format_relative_date, format_signed, WalletState};
use riyada_client::ClientError;

const RULE: &str = "----------------------------------------------------------------";

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Sent => "Sent",
        Direction::Received => "Received",
        Direction::TopUp => "Top-up",
    }
}

fn when(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    ts.map(|t| format_relative_date(t, now))
        .unwrap_or_else(|| "-".to_string())
}

// ---------------------------------------------------------------------------
// Banners
// ---------------------------------------------------------------------------

/// Error banner. Validation failures list one field per line.
pub fn error_banner(err: &ClientError) -> String {
    match err {
        ClientError::Validation(errors) => {
            let mut out = String::from("error: please fix the following");
            for (field, message) in errors.iter() {
                let _ = write!(out, "\n  {field}: {message}");
            }
            out
        }
        other => format!("error: {other}"),
    }
}

pub fn success_banner(message: &str) -> String {
    format!("ok: {message}")
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub fn welcome(identity: &Identity) -> String {
    format!("Welcome back, {}!", identity.display_name)
}

pub fn registration(outcome: &Registration) -> String {
    if outcome.logged_in {
        format!(
            "{}\nLogged in as {} <{}>",
            success_banner(&outcome.message),
            outcome.identity.display_name,
            outcome.identity.email
        )
    } else {
        success_banner(&outcome.message)
    }
}

pub fn whoami(identity: Option<&Identity>) -> String {
    match identity {
        Some(i) => format!("{} <{}>\nuser id: {}", i.display_name, i.email, i.id),
        None => "Not logged in".to_string(),
    }
}

pub fn profile(profile: &UserProfile) -> String {
    let mut out = format!("{} <{}>\nuser id: {}", profile.display_name(), profile.email, profile.id);
    if let Some(phone) = &profile.phone {
        let _ = write!(out, "\nphone:   {phone}");
    }
    if let Some(created) = profile.created_at {
        let _ = write!(out, "\nmember since {}", created.format("%Y-%m-%d"));
    }
    out
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// One history row: kind, signed amount, who or what, when.
pub fn transaction_line(record: &TransactionRecord, now: DateTime<Utc>) -> String {
    let subject = record
        .counterparty_email
        .as_deref()
        .or(record.description.as_deref())
        .unwrap_or("-");
    format!(
        "{:<9} {:>14}  {:<30} {}",
        direction_label(record.direction),
        format_signed(record.direction, record.amount),
        subject,
        when(record.timestamp, now)
    )
}

pub fn dashboard(identity: &Identity, state: &WalletState, now: DateTime<Utc>) -> String {
    let mut out = welcome(identity);
    let _ = write!(
        out,
        "\n\nBalance: {} {}",
        format_amount(state.balance()),
        state.snapshot.currency
    );
    if let Some(e) = &state.balance_error {
        let _ = write!(out, "\n  (could not refresh balance: {e})");
    }

    let _ = write!(out, "\n\nRecent activity\n{RULE}");
    let recent = state.recent(DASHBOARD_RECENT_COUNT);
    if recent.is_empty() {
        out.push_str("\nNo transactions yet");
    }
    for record in recent {
        let _ = write!(out, "\n{}", transaction_line(record, now));
    }
    if let Some(e) = &state.transactions_error {
        let _ = write!(out, "\n  (could not refresh history: {e})");
    }
    out
}

pub fn history(records: &[&TransactionRecord], now: DateTime<Utc>) -> String {
    if records.is_empty() {
        return "No transactions found".to_string();
    }
    let mut out = String::from(RULE);
    for record in records {
        let _ = write!(out, "\n{}", transaction_line(record, now));
    }
    let _ = write!(out, "\n{RULE}\n{} transaction(s)", records.len());
    out
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

pub fn payment_line(payment: &Payment, me: &UserId, now: DateTime<Utc>) -> String {
    let direction = payment.direction_for(me);
    format!(
        "{}  {:>14}  {:<28} {:<10} {}",
        payment.id,
        format_signed(direction, payment.amount),
        payment.counterparty_email(me).unwrap_or("-"),
        payment.status,
        when(payment.created_at, now)
    )
}

pub fn payments(list: &[Payment], me: &UserId, now: DateTime<Utc>) -> String {
    if list.is_empty() {
        return "No payments yet".to_string();
    }
    let mut out = String::from(RULE);
    for p in list {
        let _ = write!(out, "\n{}", payment_line(p, me, now));
    }
    out
}

pub fn payment_detail(payment: &Payment) -> String {
    let mut out = format!(
        "payment   {}\nto        {}\namount    {} {}\nstatus    {}",
        payment.id,
        payment.to_email,
        format_amount(payment.amount),
        payment.currency,
        payment.status
    );
    if let Some(reference) = &payment.reference_id {
        let _ = write!(out, "\nreference {reference}");
    }
    if let Some(d) = &payment.description {
        let _ = write!(out, "\nnote      {d}");
    }
    if let Some(reason) = &payment.failure_reason {
        let _ = write!(out, "\nreason    {reason}");
    }
    if let Some(at) = payment.created_at {
        let _ = write!(out, "\ncreated   {}", at.format("%Y-%m-%d %H:%M"));
    }
    out
}

pub fn payment_status(info: &PaymentStatusInfo) -> String {
    let mut out = format!("{}  {}", info.reference_id, info.status);
    if let Some(reason) = &info.failure_reason {
        let _ = write!(out, " ({reason})");
    }
    out
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub fn ledger_line(entry: &LedgerEntry, now: DateTime<Utc>) -> String {
    format!(
        "{}  {:<10} {:>14} {:<4} {:<10} {}",
        entry.id,
        entry.transaction_type,
        format_amount(entry.amount),
        entry.currency,
        entry.status,
        when(entry.created_at, now)
    )
}

pub fn ledger_entries(entries: &[LedgerEntry], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return "No ledger entries".to_string();
    }
    let mut out = String::from(RULE);
    for e in entries {
        let _ = write!(out, "\n{}", ledger_line(e, now));
    }
    out
}

pub fn ledger_page(page: &Page<LedgerEntry>, now: DateTime<Utc>) -> String {
    let mut out = ledger_entries(&page.content, now);
    let _ = write!(
        out,
        "\npage {} of {} ({} entries)",
        page.number + 1,
        page.total_pages.max(1),
        page.total_elements
    );
    if !page.is_last() {
        let _ = write!(out, "; next: --page {}", page.number + 1);
    }
    out
}

pub fn ledger_detail(entry: &LedgerEntry) -> String {
    let mut out = format!(
        "entry     {}\ntype      {}\namount    {} {}\nstatus    {}",
        entry.id,
        entry.transaction_type,
        format_amount(entry.amount),
        entry.currency,
        entry.status
    );
    if let Some(p) = entry.payment_id {
        let _ = write!(out, "\npayment   {p}");
    }
    if let Some(from) = &entry.sender_user_id {
        let _ = write!(out, "\nfrom      {from}");
    }
    if let Some(to) = &entry.receiver_user_id {
        let _ = write!(out, "\nto        {to}");
    }
    if let Some(d) = &entry.description {
        let _ = write!(out, "\nnote      {d}");
    }
    out
}

pub fn audit_trail(logs: &[AuditLog]) -> String {
    if logs.is_empty() {
        return "No audit records".to_string();
    }
    let mut out = String::new();
    for (i, log) in logs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let at = log
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(out, "{at}  {}", log.action);
        if let Some(by) = &log.user_id {
            let _ = write!(out, " by {by}");
        }
        match (&log.old_values, &log.new_values) {
            (Some(old), Some(new)) => {
                let _ = write!(out, "\n    {old} -> {new}");
            }
            (None, Some(new)) => {
                let _ = write!(out, "\n    {new}");
            }
            _ => {}
        }
    }
    out
}

pub fn analytics(summary: &FinancialSummary) -> String {
    let net = summary.net();
    let net_text = if net.is_sign_negative() && !net.is_zero() {
        format_amount(net)
    } else {
        format!("+{}", format_amount(net))
    };
    format!(
        "Total sent      {:>14}\nTotal received  {:>14}\nNet             {:>14}\nTransactions    {:>14}",
        format_amount(summary.sent()),
        format_amount(summary.received()),
        net_text,
        summary.count()
    )
}
