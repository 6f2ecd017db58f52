//! Walks one card through the full approval workflow on a local sled db.
use std::sync::Arc;

use card_approval::{
    card::{Actor, CardDraft, Platform},
    config::SlaConfigProvider,
    notify::NoopSender,
    service::CardService,
    store::SledCardStore,
};

fn main() -> anyhow::Result<()> {
    let db = Arc::new(sled::open("sled")?);

    if !db.is_empty() {
        db.clear()?;
    }

    let service = CardService::with_system_clock(SledCardStore::new(db.clone()), NoopSender);

    let author = Actor::new(
        "member_author".to_string(),
        "Avery Lane".to_string(),
        "avery@example.com".to_string(),
    );
    let approver = Actor::new(
        "member_approver".to_string(),
        "Jordan Diaz".to_string(),
        "jordan@example.com".to_string(),
    );

    let card = service.create_card(
        CardDraft::new()
            .set_project("proj_demo")
            .set_platform(Platform::Instagram)
            .set_title("Summer launch teaser")
            .set_caption("First look at the new range")
            .add_hashtag("#summer")
            .add_approver(&approver.id),
        &author,
    )?;

    let card = service.submit_card(&card.id, &author)?;

    let thresholds = SlaConfigProvider::new(db).load("tenant_demo")?;
    let snapshot = service.sla(&card, &thresholds);
    println!("{snapshot:#?}");

    let card = service.approve_card(&card.id, &approver)?;
    println!("{:#?}", card.audit_log());

    Ok(())
}
