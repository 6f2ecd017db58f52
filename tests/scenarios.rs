use anyhow::Context;
use std::sync::{Arc, Mutex};

use card_approval::{
    bulk::{BulkApprovalCoordinator, BulkDecision},
    card::{Actor, CardDraft, CardStatus, Platform, TimeStamp},
    clock::{self, FixedClock, SlaStatus},
    config::{SlaConfigProvider, SlaThresholds},
    ledger::AuditAction,
    notify::{NotificationMessage, NotificationSender},
    service::CardService,
    store::SledCardStore,
};

use tempfile::tempdir; // Use for test db cleanup.

/// Captures outbound messages so tests can assert on delivery.
struct RecordingSender(Mutex<Vec<NotificationMessage>>);

impl RecordingSender {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }
    fn messages(&self) -> Vec<NotificationMessage> {
        self.0.lock().unwrap().clone()
    }
}

impl NotificationSender for RecordingSender {
    fn send(&self, message: &NotificationMessage) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A sender whose channel is down.
struct FailingSender;

impl NotificationSender for FailingSender {
    fn send(&self, _message: &NotificationMessage) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unreachable")
    }
}

fn author() -> Actor {
    Actor::new(
        "member_author".to_string(),
        "Avery Lane".to_string(),
        "avery@example.com".to_string(),
    )
}

fn approver() -> Actor {
    Actor::new(
        "member_approver".to_string(),
        "Jordan Diaz".to_string(),
        "jordan@example.com".to_string(),
    )
}

#[test]
fn draft_submit_and_approve() -> anyhow::Result<()> {
    // Sled uses file-based locking to prevent concurrent access, so each
    // test gets its own database under a tempdir for simplified cleanup.
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("draft_submit_and_approve.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 1, 1, 0, 0, 0)));
    let sender = Arc::new(RecordingSender::new());
    let service = CardService::new(SledCardStore::new(db), sender.clone(), clock.clone());

    let author = author();
    let approver = approver();

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_spring")
            .set_platform(Platform::Instagram)
            .set_title("Spring launch teaser")
            .set_caption("Sneak peek at the new line")
            .add_hashtag("#spring")
            .add_approver(&approver.id),
        &author,
    )?;
    assert_eq!(card.status, CardStatus::Draft);

    clock.set(TimeStamp::new_with(2025, 1, 1, 2, 0, 0));
    let card = service
        .submit_card(&card.id, &author)
        .context("Card failed on submit: ")?;
    assert_eq!(card.status, CardStatus::PendingApproval);

    clock.set(TimeStamp::new_with(2025, 1, 1, 5, 0, 0));
    let card = service
        .approve_card(&card.id, &approver)
        .context("Card failed on approval: ")?;
    assert_eq!(card.status, CardStatus::Approved);
    assert_eq!(card.approved_by.as_deref(), Some("member_approver"));
    assert_eq!(card.approved_by_name.as_deref(), Some("Jordan Diaz"));

    let actions: Vec<_> = card.audit_log().iter().map(|e| e.action()).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created,
            AuditAction::SubmittedForApproval,
            AuditAction::Approved,
            AuditAction::EmailNotification,
        ]
    );

    // the decision reaches the card's creator
    let sent = sender.messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "avery@example.com");
    assert!(sent[0].subject.contains("approved"));

    Ok(())
}

#[test]
fn scheduled_approval_and_publish() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("scheduled_approval_and_publish.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 2, 1, 9, 0, 0)));
    let sender = Arc::new(RecordingSender::new());
    let service = CardService::new(SledCardStore::new(db), sender.clone(), clock.clone());

    let author = author();
    let approver = approver();

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_valentines")
            .set_platform(Platform::Facebook)
            .set_title("Valentines giveaway")
            .set_schedule("2025-02-14", "09:00")
            .add_approver(&approver.id),
        &author,
    )?;

    let card = service.submit_card(&card.id, &author)?;
    let card = service.approve_card(&card.id, &approver)?;

    // a schedule present at approval time routes to scheduled
    assert_eq!(card.status, CardStatus::Scheduled);

    let actions: Vec<_> = card.audit_log().iter().map(|e| e.action()).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Created,
            AuditAction::SubmittedForApproval,
            AuditAction::Approved,
            AuditAction::Scheduled,
            AuditAction::EmailNotification,
        ]
    );
    let scheduled = &card.audit_log()[3];
    assert_eq!(scheduled.performed_by(), "System");
    assert!(scheduled.details().unwrap().contains("2025-02-14"));

    // every entry of the transition shares one timestamp
    let approve_ts = card.audit_log()[2].timestamp();
    assert_eq!(card.audit_log()[3].timestamp(), approve_ts);
    assert_eq!(card.audit_log()[4].timestamp(), approve_ts);

    clock.set(TimeStamp::new_with(2025, 2, 14, 9, 5, 0));
    let card = service.publish_card(&card.id, &author)?;
    assert_eq!(card.status, CardStatus::Published);
    assert_eq!(
        card.audit_log().last().unwrap().action(),
        AuditAction::Published
    );

    Ok(())
}

#[test]
fn rejection_resubmission_resets_sla_clock() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("rejection_resubmission_resets_sla_clock.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 1, 1, 0, 0, 0)));
    let sender = Arc::new(RecordingSender::new());
    let service = CardService::new(SledCardStore::new(db), sender.clone(), clock.clone());

    let author = author();
    let approver = approver();

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_spring")
            .set_platform(Platform::LinkedIn)
            .set_title("Hiring announcement")
            .add_approver(&approver.id),
        &author,
    )?;

    clock.set(TimeStamp::new_with(2025, 1, 1, 2, 0, 0));
    let card = service.submit_card(&card.id, &author)?;

    clock.set(TimeStamp::new_with(2025, 1, 1, 10, 0, 0));
    let card = service.reject_card(&card.id, &approver, "Tone is off-brand")?;
    assert_eq!(card.status, CardStatus::Rejected);
    assert_eq!(card.rejection_reason.as_deref(), Some("Tone is off-brand"));

    // the rejection reason lands verbatim in the ledger
    let rejected = card
        .audit_log()
        .iter()
        .find(|e| e.action() == AuditAction::Rejected)
        .unwrap();
    assert_eq!(rejected.details(), Some("Tone is off-brand"));

    // resubmission restarts the approval clock from the new submission
    let resubmitted_at = TimeStamp::new_with(2025, 1, 2, 9, 0, 0);
    clock.set(resubmitted_at.clone());
    let card = service.submit_card(&card.id, &author)?;
    assert_eq!(card.status, CardStatus::PendingApproval);
    assert!(card.rejected_by.is_none());
    assert!(card.rejection_reason.is_none());
    assert_eq!(clock::sla_start_time(&card), resubmitted_at);

    Ok(())
}

#[test]
fn revert_to_draft_clears_provenance() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("revert_to_draft_clears_provenance.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 3, 1, 0, 0, 0)));
    let sender = Arc::new(RecordingSender::new());
    let service = CardService::new(SledCardStore::new(db), sender.clone(), clock.clone());

    let author = author();
    let approver = approver();

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_spring")
            .set_platform(Platform::TikTok)
            .set_title("Behind the scenes")
            .add_approver(&approver.id),
        &author,
    )?;
    let card = service.submit_card(&card.id, &author)?;
    let card = service.reject_card(&card.id, &approver, "Wrong aspect ratio")?;

    let card = service.revert_card(&card.id, &author, "Starting over with new footage")?;
    assert_eq!(card.status, CardStatus::Draft);
    assert!(card.rejected_by.is_none());
    assert!(card.rejected_by_name.is_none());
    assert!(card.rejected_at.is_none());
    assert!(card.rejection_reason.is_none());
    assert!(card.approved_by.is_none());

    let status_changed = card
        .audit_log()
        .iter()
        .find(|e| e.action() == AuditAction::StatusChanged)
        .unwrap();
    assert!(
        status_changed
            .details()
            .unwrap()
            .contains("Starting over with new footage")
    );

    Ok(())
}

#[test]
fn bulk_approve_filters_by_authorization() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("bulk_approve_filters_by_authorization.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 4, 1, 8, 0, 0)));
    let sender = Arc::new(RecordingSender::new());
    let service = CardService::new(SledCardStore::new(db), sender.clone(), clock.clone());

    let author = author();
    let approver = approver();
    let other_approver = Actor::new(
        "member_other".to_string(),
        "Sam Reyes".to_string(),
        "sam@example.com".to_string(),
    );

    // five pending cards; the actor is an approver on the first three
    let mut ids = Vec::new();
    for i in 0..5 {
        let assigned = if i < 3 { &approver } else { &other_approver };
        let card = service.create_card(
            CardDraft::new()
                .set_project("proj_april")
                .set_platform(Platform::Twitter)
                .set_title(&format!("April teaser {i}"))
                .add_approver(&assigned.id),
            &author,
        )?;
        let card = service.submit_card(&card.id, &author)?;
        ids.push(card.id);
    }

    let all_cards: Vec<_> = ids
        .iter()
        .map(|id| service.load_card(id))
        .collect::<Result<_, _>>()?;
    let selectable = BulkApprovalCoordinator::selectable(&all_cards, &approver);
    assert_eq!(selectable.len(), 3);

    // the whole stale selection is executed; unauthorized cards are skipped
    let outcomes =
        BulkApprovalCoordinator::execute(&service, &ids, &approver, &BulkDecision::Approve);
    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    assert_eq!(applied, 3);

    for id in &ids[..3] {
        let card = service.load_card(id)?;
        assert_eq!(card.status, CardStatus::Approved);
    }
    for id in &ids[3..] {
        let card = service.load_card(id)?;
        assert_eq!(card.status, CardStatus::PendingApproval);
        // untouched ledgers: created + submitted only
        assert_eq!(card.audit_log().len(), 2);
    }

    Ok(())
}

#[test]
fn sla_status_over_a_dated_scenario() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("sla_status_over_a_dated_scenario.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 1, 1, 0, 0, 0)));
    let sender = Arc::new(RecordingSender::new());
    let service = CardService::new(SledCardStore::new(db), sender.clone(), clock.clone());

    let author = author();
    let approver = approver();
    let thresholds = SlaThresholds::new(24.0, 48.0);

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_jan")
            .set_platform(Platform::YouTube)
            .set_title("Year in review")
            .add_approver(&approver.id),
        &author,
    )?;

    clock.set(TimeStamp::new_with(2025, 1, 1, 2, 0, 0));
    let card = service.submit_card(&card.id, &author)?;

    // 23h after submission
    clock.set(TimeStamp::new_with(2025, 1, 2, 1, 0, 0));
    let snapshot = service.sla(&card, &thresholds);
    assert_eq!(snapshot.status, Some(SlaStatus::Ok));
    assert_eq!(snapshot.hours_elapsed, Some(23.0));
    assert_eq!(snapshot.hours_remaining, Some(25.0));

    // 25h
    clock.set(TimeStamp::new_with(2025, 1, 2, 3, 0, 0));
    assert_eq!(service.sla(&card, &thresholds).status, Some(SlaStatus::Warning));

    // 49h
    clock.set(TimeStamp::new_with(2025, 1, 3, 3, 0, 0));
    let snapshot = service.sla(&card, &thresholds);
    assert_eq!(snapshot.status, Some(SlaStatus::Breached));
    assert_eq!(snapshot.hours_remaining, Some(0.0));

    Ok(())
}

#[test]
fn failed_delivery_never_reverses_a_decision() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("failed_delivery_never_reverses_a_decision.db"),
    )?);
    db.clear()?;

    let clock = Arc::new(FixedClock::new(TimeStamp::new_with(2025, 5, 1, 0, 0, 0)));
    let service = CardService::new(SledCardStore::new(db), FailingSender, clock.clone());

    let author = author();
    let approver = approver();

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_may")
            .set_platform(Platform::Instagram)
            .set_title("May day post")
            .add_approver(&approver.id),
        &author,
    )?;
    let card = service.submit_card(&card.id, &author)?;
    let card = service.approve_card(&card.id, &approver)?;

    assert_eq!(card.status, CardStatus::Approved);
    // the notification entry records the attempt regardless of delivery
    assert_eq!(
        card.audit_log().last().unwrap().action(),
        AuditAction::EmailNotification
    );
    assert_eq!(card.audit_log().last().unwrap().performed_by(), "System");

    // and the persisted copy agrees
    let reloaded = service.load_card(&card.id)?;
    assert_eq!(reloaded.status, CardStatus::Approved);

    Ok(())
}

#[test]
fn tenant_thresholds_round_trip() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(sled::open(
        temp_dir.path().join("tenant_thresholds_round_trip.db"),
    )?);
    db.clear()?;

    let provider = SlaConfigProvider::new(db);

    // unset tenants resolve to the platform defaults
    let defaults = provider.load("tenant_a")?;
    assert_eq!(defaults, SlaThresholds::default());
    assert_eq!(defaults.warning_hours, 24.0);
    assert_eq!(defaults.breach_hours, 48.0);

    let custom = SlaThresholds::new(12.0, 36.0);
    provider.save(&custom, "tenant_a")?;
    assert_eq!(provider.load("tenant_a")?, custom);

    // other tenants are unaffected
    assert_eq!(provider.load("tenant_b")?, SlaThresholds::default());

    // invalid thresholds are rejected before any write
    assert!(provider.save(&SlaThresholds::new(48.0, 24.0), "tenant_a").is_err());
    assert_eq!(provider.load("tenant_a")?, custom);

    Ok(())
}
