//! Core card types, the draft builder, and the edit patch
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

use super::error::DraftError;
use super::ledger::{AuditAction, AuditEntry};
use super::utils;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Platform {
    #[n(0)]
    Instagram,
    #[n(1)]
    Facebook,
    #[n(2)]
    Twitter,
    #[n(3)]
    LinkedIn,
    #[n(4)]
    TikTok,
    #[n(5)]
    YouTube,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::Twitter => "Twitter",
            Platform::LinkedIn => "LinkedIn",
            Platform::TikTok => "TikTok",
            Platform::YouTube => "YouTube",
        };
        write!(f, "{name}")
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum CardStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    PendingApproval,
    #[n(2)]
    Approved,
    #[n(3)]
    Scheduled,
    #[n(4)]
    Rejected,
    #[n(5)]
    Published,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardStatus::Draft => "draft",
            CardStatus::PendingApproval => "pending_approval",
            CardStatus::Approved => "approved",
            CardStatus::Scheduled => "scheduled",
            CardStatus::Rejected => "rejected",
            CardStatus::Published => "published",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Fractional hours from this timestamp to a later one. Negative when
    /// `later` is actually earlier.
    pub fn hours_until(&self, later: &TimeStamp<Utc>) -> f64 {
        (later.0 - self.0).num_seconds() as f64 / 3600.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// The current actor, as resolved by the host's session layer. All
/// authorization comparisons use `id`; `name` and `email` ride along for
/// presentation and notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl Actor {
    pub fn new(id: String, name: String, email: String) -> Self {
        Self { id, name, email }
    }
}

/// The unit of work: one social-media post moving through the approval
/// workflow. Lifecycle mutation goes through the state machine, which
/// returns a new card value and never touches the caller's copy.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct ContentCard {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub project_id: String,
    #[n(2)]
    pub platform: Platform,
    #[n(3)]
    pub title: String,
    #[n(4)]
    pub caption: String,
    #[n(5)]
    pub hashtags: Vec<String>,
    #[n(6)]
    pub status: CardStatus,
    // member ids designated to decide; membership by id, duplicates ignored
    #[n(7)]
    pub approvers: Vec<String>,
    #[n(8)]
    pub approved_by: Option<String>,
    #[n(9)]
    pub approved_by_name: Option<String>,
    #[n(10)]
    pub approved_at: Option<TimeStamp<Utc>>,
    #[n(11)]
    pub rejected_by: Option<String>,
    #[n(12)]
    pub rejected_by_name: Option<String>,
    #[n(13)]
    pub rejected_at: Option<TimeStamp<Utc>>,
    #[n(14)]
    pub rejection_reason: Option<String>,
    #[n(15)]
    pub scheduled_date: Option<String>,
    #[n(16)]
    pub scheduled_time: Option<String>,
    #[n(17)]
    audit_log: Vec<AuditEntry>,
    #[n(18)]
    pub created_by: String,
    #[n(19)]
    pub created_by_email: String,
    #[n(20)]
    pub created_at: TimeStamp<Utc>,
    #[n(21)]
    pub last_edited_by: Option<String>,
    #[n(22)]
    pub last_edited_at: Option<TimeStamp<Utc>>,
    // opaque payload; the engine passes it through unmodified
    #[n(23)]
    pub media_urls: Vec<String>,
}

impl ContentCard {
    /// Ordered ledger, oldest entry first.
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit_log
    }

    pub fn is_approver(&self, member_id: &str) -> bool {
        self.approvers.iter().any(|a| a == member_id)
    }

    pub(crate) fn push_entry(&mut self, entry: AuditEntry) {
        self.audit_log.push(entry);
    }

    pub(crate) fn clear_approval(&mut self) {
        self.approved_by = None;
        self.approved_by_name = None;
        self.approved_at = None;
    }

    pub(crate) fn clear_rejection(&mut self) {
        self.rejected_by = None;
        self.rejected_by_name = None;
        self.rejected_at = None;
        self.rejection_reason = None;
    }
}

// used for constructing drafts
#[derive(Debug, Default)]
pub struct CardDraft {
    project_id: Option<String>,
    platform: Option<Platform>,
    title: Option<String>,
    caption: Option<String>,
    hashtags: Vec<String>,
    approvers: Vec<String>,
    scheduled_date: Option<String>,
    scheduled_time: Option<String>,
    media_urls: Vec<String>,
}

impl CardDraft {
    /// Construct a new builder object, this becomes the basis for a draft
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }
    pub fn set_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn set_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }
    pub fn add_hashtag(mut self, tag: &str) -> Self {
        self.hashtags.push(tag.to_string());
        self
    }
    pub fn add_approver(mut self, member_id: &str) -> Self {
        if !self.approvers.iter().any(|a| a == member_id) {
            self.approvers.push(member_id.to_string());
        }
        self
    }
    pub fn set_schedule(mut self, date: &str, time: &str) -> Self {
        self.scheduled_date = Some(date.to_string());
        self.scheduled_time = Some(time.to_string());
        self
    }
    pub fn add_media_url(mut self, url: &str) -> Self {
        self.media_urls.push(url.to_string());
        self
    }

    /// Checks required fields, mints the card id, and opens the ledger
    /// with the creation entry.
    pub fn build(self, actor: &Actor, at: TimeStamp<Utc>) -> Result<ContentCard, DraftError> {
        let project_id = self
            .project_id
            .filter(|p| !p.trim().is_empty())
            .ok_or(DraftError::MissingProject)?;
        let platform = self.platform.ok_or(DraftError::MissingPlatform)?;
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or(DraftError::MissingTitle)?;

        let created = AuditEntry::new(
            AuditAction::Created,
            actor.name.clone(),
            actor.email.clone(),
            at.clone(),
            None,
        );

        Ok(ContentCard {
            id: utils::new_card_id(),
            project_id,
            platform,
            title,
            caption: self.caption.unwrap_or_default(),
            hashtags: self.hashtags,
            status: CardStatus::Draft,
            approvers: self.approvers,
            approved_by: None,
            approved_by_name: None,
            approved_at: None,
            rejected_by: None,
            rejected_by_name: None,
            rejected_at: None,
            rejection_reason: None,
            scheduled_date: self.scheduled_date,
            scheduled_time: self.scheduled_time,
            audit_log: vec![created],
            created_by: actor.name.clone(),
            created_by_email: actor.email.clone(),
            created_at: at,
            last_edited_by: None,
            last_edited_at: None,
            media_urls: self.media_urls,
        })
    }
}

/// Field updates applied through the `edit` action while a card is in
/// draft or rejected. Fields left as `None` are untouched.
#[derive(Debug, Clone, Default)]
pub struct CardPatch {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub hashtags: Option<Vec<String>>,
    pub media_urls: Option<Vec<String>>,
    pub approvers: Option<Vec<String>>,
    pub scheduled_date: Option<String>,
    pub scheduled_time: Option<String>,
    pub clear_schedule: bool,
}

impl CardPatch {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn set_caption(mut self, caption: &str) -> Self {
        self.caption = Some(caption.to_string());
        self
    }
    pub fn set_hashtags(mut self, tags: Vec<String>) -> Self {
        self.hashtags = Some(tags);
        self
    }
    pub fn set_media_urls(mut self, urls: Vec<String>) -> Self {
        self.media_urls = Some(urls);
        self
    }
    pub fn set_approvers(mut self, member_ids: Vec<String>) -> Self {
        self.approvers = Some(member_ids);
        self
    }
    pub fn set_schedule(mut self, date: &str, time: &str) -> Self {
        self.scheduled_date = Some(date.to_string());
        self.scheduled_time = Some(time.to_string());
        self
    }
    pub fn set_clear_schedule(mut self) -> Self {
        self.clear_schedule = true;
        self
    }

    /// Apply the patch, returning the names of the fields that changed.
    pub(crate) fn apply_to(self, card: &mut ContentCard) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(title) = self.title {
            if title != card.title {
                card.title = title;
                changed.push("title");
            }
        }
        if let Some(caption) = self.caption {
            if caption != card.caption {
                card.caption = caption;
                changed.push("caption");
            }
        }
        if let Some(hashtags) = self.hashtags {
            if hashtags != card.hashtags {
                card.hashtags = hashtags;
                changed.push("hashtags");
            }
        }
        if let Some(media_urls) = self.media_urls {
            if media_urls != card.media_urls {
                card.media_urls = media_urls;
                changed.push("media");
            }
        }
        if let Some(approvers) = self.approvers {
            if approvers != card.approvers {
                card.approvers = approvers;
                changed.push("approvers");
            }
        }

        let mut schedule_changed = false;
        if self.clear_schedule {
            schedule_changed = card.scheduled_date.is_some() || card.scheduled_time.is_some();
            card.scheduled_date = None;
            card.scheduled_time = None;
        } else {
            if let Some(date) = self.scheduled_date {
                if card.scheduled_date.as_deref() != Some(date.as_str()) {
                    card.scheduled_date = Some(date);
                    schedule_changed = true;
                }
            }
            if let Some(time) = self.scheduled_time {
                if card.scheduled_time.as_deref() != Some(time.as_str()) {
                    card.scheduled_time = Some(time);
                    schedule_changed = true;
                }
            }
        }
        if schedule_changed {
            changed.push("schedule");
        }

        changed
    }
}
