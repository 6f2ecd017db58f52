//! SLA clock: injectable time source and pure derivations
//!
//! The clock never mutates a card and owns no timers. The SLA start time
//! is derived from the ledger on every read so an intervening resubmission
//! resets it; nothing here is cached.
use std::sync::Mutex;

use chrono::Utc;

use super::card::{CardStatus, ContentCard, TimeStamp};
use super::config::SlaThresholds;
use super::ledger::{self, AuditAction};

/// Zero-argument current-time capability. Production uses [`SystemClock`];
/// tests use [`FixedClock`] to simulate elapsed time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp<Utc> {
        TimeStamp::new()
    }
}

/// A settable clock for tests.
#[derive(Debug)]
pub struct FixedClock {
    at: Mutex<TimeStamp<Utc>>,
}

impl FixedClock {
    pub fn new(at: TimeStamp<Utc>) -> Self {
        Self { at: Mutex::new(at) }
    }
    pub fn set(&self, at: TimeStamp<Utc>) {
        *self.at.lock().expect("clock mutex poisoned") = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> TimeStamp<Utc> {
        self.at.lock().expect("clock mutex poisoned").clone()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SlaStatus {
    Ok,
    Warning,
    Breached,
}

/// The moment the approval clock started: the most recent
/// submitted-for-approval entry, falling back to the card's creation time.
pub fn sla_start_time(card: &ContentCard) -> TimeStamp<Utc> {
    ledger::last_entry_for_action(card, AuditAction::SubmittedForApproval)
        .map(|e| e.timestamp().clone())
        .unwrap_or_else(|| card.created_at.clone())
}

/// Fractional hours since the clock started. `None` whenever the card is
/// not pending approval, regardless of history.
pub fn sla_hours_elapsed(card: &ContentCard, now: &TimeStamp<Utc>) -> Option<f64> {
    if card.status != CardStatus::PendingApproval {
        return None;
    }
    Some(sla_start_time(card).hours_until(now))
}

pub fn sla_status(
    card: &ContentCard,
    thresholds: &SlaThresholds,
    now: &TimeStamp<Utc>,
) -> Option<SlaStatus> {
    let elapsed = sla_hours_elapsed(card, now)?;
    if elapsed >= thresholds.breach_hours {
        Some(SlaStatus::Breached)
    } else if elapsed >= thresholds.warning_hours {
        Some(SlaStatus::Warning)
    } else {
        Some(SlaStatus::Ok)
    }
}

pub fn sla_remaining_hours(
    card: &ContentCard,
    thresholds: &SlaThresholds,
    now: &TimeStamp<Utc>,
) -> Option<f64> {
    let elapsed = sla_hours_elapsed(card, now)?;
    Some((thresholds.breach_hours - elapsed).max(0.0))
}

/// One consistent read for the three UI call sites (inline strip, detail
/// modal, bulk view).
#[derive(Debug, Clone, PartialEq)]
pub struct SlaSnapshot {
    pub hours_elapsed: Option<f64>,
    pub hours_remaining: Option<f64>,
    pub status: Option<SlaStatus>,
}

pub fn sla_snapshot(
    card: &ContentCard,
    thresholds: &SlaThresholds,
    now: &TimeStamp<Utc>,
) -> SlaSnapshot {
    SlaSnapshot {
        hours_elapsed: sla_hours_elapsed(card, now),
        hours_remaining: sla_remaining_hours(card, thresholds, now),
        status: sla_status(card, thresholds, now),
    }
}

/// Render a fractional hour count for display: `< 1m`, `Nm`, `Nh Mm`, or
/// `Nd Hh`.
pub fn format_duration(hours: f64) -> String {
    let total_minutes = (hours.max(0.0) * 60.0).floor() as i64;
    if total_minutes < 1 {
        return "< 1m".to_string();
    }
    if total_minutes < 60 {
        return format!("{total_minutes}m");
    }
    if total_minutes < 24 * 60 {
        let h = total_minutes / 60;
        let m = total_minutes % 60;
        return format!("{h}h {m}m");
    }
    let d = total_minutes / (24 * 60);
    let h = (total_minutes / 60) % 24;
    format!("{d}d {h}h")
}
