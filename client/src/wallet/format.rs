//! Display helpers for amounts, dates, and the history filter bar.
//!
//! Rounding happens here and nowhere else; stored amounts keep full
//! precision.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DISPLAY_DECIMALS;
use crate::types::{Direction, TransactionRecord};

/// `$1,234.50`. Negative amounts render as `-$5.00`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded =
        amount.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", DISPLAY_DECIMALS as usize, rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{frac}")
    }
}

/// `-$50.00` for money sent, `+$50.00` for everything else.
pub fn format_signed(direction: Direction, amount: Decimal) -> String {
    let body = format_amount(amount.abs());
    if direction.is_outgoing() {
        format!("-{body}")
    } else {
        format!("+{body}")
    }
}

/// "Today", "Yesterday", "3 days ago", then a plain date after a week.
pub fn format_relative_date(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now.date_naive() - timestamp.date_naive()).num_days();
    match days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        _ => timestamp.format("%Y-%m-%d").to_string(),
    }
}

// ---------------------------------------------------------------------------
// History Filter
// ---------------------------------------------------------------------------

/// Time window for the history view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Period {
    #[default]
    AllTime,
    Last7Days,
    Last30Days,
    Last3Months,
}

impl Period {
    fn span(&self) -> Option<Duration> {
        match self {
            Period::AllTime => None,
            Period::Last7Days => Some(Duration::days(7)),
            Period::Last30Days => Some(Duration::days(30)),
            Period::Last3Months => Some(Duration::days(90)),
        }
    }
}

/// Client-side filter over the cached transaction list. Never reorders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub direction: Option<Direction>,
    pub period: Period,
    /// Case-insensitive match against counterparty and description.
    pub search: Option<String>,
}

impl HistoryFilter {
    pub fn matches(&self, record: &TransactionRecord, now: DateTime<Utc>) -> bool {
        if self.direction.is_some_and(|d| d != record.direction) {
            return false;
        }

        if let Some(span) = self.period.span() {
            // Undated rows can't be placed in a window.
            match record.timestamp {
                Some(ts) if ts >= now - span => {}
                _ => return false,
            }
        }

        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [&record.counterparty_email, &record.description]
                    .into_iter()
                    .flatten()
                    .any(|hay| hay.to_lowercase().contains(&needle))
            }
        }
    }

    pub fn apply<'a>(
        &self,
        records: &'a [TransactionRecord],
        now: DateTime<Utc>,
    ) -> Vec<&'a TransactionRecord> {
        records.iter().filter(|r| self.matches(r, now)).collect()
    }
}
