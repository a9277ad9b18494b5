use chrono::{TimeZone, Utc};
use serde_json::json;
use ticketchain_ledger::{
    ChainError, GENESIS_PREVIOUS_HASH, Ledger, Payload, Timestamp, codec, compute_hash,
};

fn at(secs: i64) -> Timestamp {
    Timestamp::from_datetime(Utc.timestamp_opt(1_714_550_400 + secs, 0).unwrap())
}

fn booking(name: &str, route: &str, tickets: u32) -> Payload {
    Payload::from_fields([
        ("name", json!(name)),
        ("route", json!(route)),
        ("tickets", json!(tickets)),
    ])
}

/// Rewrites one field of one record in an encoded ledger and decodes it again.
fn tamper(ledger: &Ledger, index: usize, field: &str, value: serde_json::Value) -> Ledger {
    let mut records: serde_json::Value =
        serde_json::from_slice(&codec::encode(ledger).unwrap()).unwrap();
    records[index][field] = value;
    codec::decode(&serde_json::to_vec(&records).unwrap()).unwrap()
}

// ── Genesis ─────────────────────────────────────────────────────

#[test]
fn genesis_ledger_has_one_block() {
    let ledger = Ledger::empty_with_genesis(at(0)).unwrap();
    assert_eq!(ledger.len(), 1);

    let genesis = ledger.get(0).unwrap();
    assert_eq!(genesis.previous_hash(), GENESIS_PREVIOUS_HASH);
    assert_eq!(genesis.data().as_value(), &json!("Genesis Block"));
    assert!(ledger.validate().is_ok());
}

#[test]
fn tail_hash_of_genesis_ledger() {
    let ledger = Ledger::empty_with_genesis(at(0)).unwrap();
    assert_eq!(ledger.tail_hash().unwrap(), ledger.get(0).unwrap().hash());
}

// ── Append ──────────────────────────────────────────────────────

#[test]
fn append_chains_to_tail() {
    let ledger = Ledger::empty_with_genesis(at(0)).unwrap();
    let ledger = ledger.append(booking("Alice", "A to B", 2), at(1)).unwrap();
    let ledger = ledger.append(booking("Bob", "B to C", 1), at(2)).unwrap();

    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.get(1).unwrap().previous_hash(), ledger.get(0).unwrap().hash());
    assert_eq!(ledger.get(2).unwrap().previous_hash(), ledger.get(1).unwrap().hash());
    assert!(ledger.validate().is_ok());
}

#[test]
fn append_leaves_original_untouched() {
    let original = Ledger::empty_with_genesis(at(0)).unwrap();
    let extended = original.append(booking("Alice", "A to B", 2), at(1)).unwrap();

    assert_eq!(original.len(), 1);
    assert_eq!(extended.len(), 2);
    assert!(extended.extends(&original));
    assert!(!original.extends(&extended));
}

#[test]
fn append_to_empty_ledger_fails() {
    let empty = codec::decode(b"[]").unwrap();
    let err = empty.append(booking("Alice", "A to B", 2), at(1)).unwrap_err();
    assert!(matches!(
        err,
        ticketchain_ledger::LedgerError::Chain(ChainError::Empty)
    ));
}

#[test]
fn append_rejects_float_payload() {
    let ledger = Ledger::empty_with_genesis(at(0)).unwrap();
    let err = ledger
        .append(Payload::from_fields([("tickets", json!(1.5))]), at(1))
        .unwrap_err();
    assert!(matches!(err, ticketchain_ledger::LedgerError::Encoding(_)));
}

#[test]
fn position_of_finds_blocks() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap();
    let hash = ledger.tail_hash().unwrap().to_string();
    assert_eq!(ledger.position_of(&hash), Some(1));
    assert_eq!(ledger.position_of("nope"), None);
}

#[test]
fn diverged_ledgers_do_not_extend_each_other() {
    let base = Ledger::empty_with_genesis(at(0)).unwrap();
    let a = base.append(booking("Alice", "A to B", 2), at(1)).unwrap();
    let b = base.append(booking("Bob", "B to C", 1), at(1)).unwrap();
    assert!(a.extends(&base));
    assert!(b.extends(&base));
    assert!(!a.extends(&b));
}

// ── Validate ────────────────────────────────────────────────────

#[test]
fn validate_rejects_empty_ledger() {
    let empty = codec::decode(b"[]").unwrap();
    assert_eq!(empty.validate().unwrap_err(), ChainError::Empty);
}

#[test]
fn validate_detects_tampered_data() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap()
        .append(booking("Bob", "B to C", 1), at(2))
        .unwrap();

    let tampered = tamper(&ledger, 1, "data", json!({"name": "Alice", "route": "A to C", "tickets": 2}));
    let err = tampered.validate().unwrap_err();
    assert!(matches!(err, ChainError::HashMismatch { index: 1, .. }));
    assert_eq!(err.index(), 1);
}

#[test]
fn validate_detects_tampered_timestamp() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap();
    let tampered = tamper(&ledger, 1, "timestamp", json!(at(99).as_str()));
    assert_eq!(tampered.validate().unwrap_err().index(), 1);
}

#[test]
fn validate_detects_rewritten_hash() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap()
        .append(booking("Bob", "B to C", 1), at(2))
        .unwrap();

    // Block 1 gets a forged hash; the check fails at block 1, not block 2.
    let tampered = tamper(&ledger, 1, "hash", json!("f".repeat(64)));
    let err = tampered.validate().unwrap_err();
    assert!(matches!(err, ChainError::HashMismatch { index: 1, .. }));
}

#[test]
fn validate_detects_broken_link() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap()
        .append(booking("Bob", "B to C", 1), at(2))
        .unwrap();

    let tampered = tamper(&ledger, 2, "previous_hash", json!("0".repeat(64)));
    let err = tampered.validate().unwrap_err();
    assert!(matches!(err, ChainError::BrokenLink { index: 2, .. }));
}

#[test]
fn validate_detects_bad_genesis_link() {
    let ledger = Ledger::empty_with_genesis(at(0)).unwrap();
    let tampered = tamper(&ledger, 0, "previous_hash", json!("1"));
    assert!(matches!(
        tampered.validate().unwrap_err(),
        ChainError::GenesisLink { .. }
    ));
}

#[test]
fn validate_rejects_booking_in_genesis_position() {
    // Correctly hashed and linked to the sentinel, but not a genesis block.
    let data = booking("Mallory", "A to C", 5);
    let timestamp = at(0);
    let hash = compute_hash(&timestamp, &data, GENESIS_PREVIOUS_HASH).unwrap();
    let records = json!([{
        "timestamp": timestamp.as_str(),
        "data": data.as_value(),
        "previous_hash": GENESIS_PREVIOUS_HASH,
        "hash": hash,
    }]);
    let ledger = codec::decode(&serde_json::to_vec(&records).unwrap()).unwrap();

    let err = ledger.validate().unwrap_err();
    assert_eq!(err, ChainError::GenesisPayload);
    assert_eq!(err.index(), 0);
}

#[test]
fn validate_detects_rewritten_genesis_payload() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap();
    let tampered = tamper(&ledger, 0, "data", json!("Genesis Block!"));
    assert_eq!(tampered.validate().unwrap_err(), ChainError::GenesisPayload);
}

#[test]
fn validate_reports_unhashable_remote_payload() {
    let ledger = Ledger::empty_with_genesis(at(0))
        .unwrap()
        .append(booking("Alice", "A to B", 2), at(1))
        .unwrap();
    let tampered = tamper(&ledger, 1, "data", json!({"tickets": 2.5}));
    assert!(matches!(
        tampered.validate().unwrap_err(),
        ChainError::Unhashable { index: 1, .. }
    ));
}
