//! Identifier minting
//!
//! Ids are uuid7 values wrapped in bech32m with a human-readable prefix, so
//! they sort by creation time and are recognisable at a glance in ledgers
//! and logs.

use bech32::Bech32m;
use uuid7::uuid7;

/// Construct a unique id then encode using bech32 with the given prefix
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

fn mint(hrp: &str) -> String {
    new_uuid_to_bech32(hrp).expect("a fixed hrp and uuid payload always encode")
}

/// Card ids are assigned once at creation and never reused.
pub fn new_card_id() -> String {
    mint("card_")
}

/// Audit entry ids, unique within a card's ledger.
pub fn new_entry_id() -> String {
    mint("entry_")
}

/// Broadcast event ids for the approval event feed.
pub fn new_event_id() -> String {
    mint("event_")
}

/// Member ids for tests and fixtures.
pub fn new_member_id() -> String {
    mint("member_")
}
