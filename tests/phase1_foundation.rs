//! Phase 1 tests: Data structures, decay and the interaction store.

use slim_stream::config::{AggregationMode, StoreConfig};
use slim_stream::engine::Decay;
use slim_stream::index::{IdTable, InteractionEntry, InteractionStore, SparseRow};
use slim_stream::model::CoefficientMatrix;
use slim_stream::types::error::SlimError;
use slim_stream::types::header::FileHeader;
use slim_stream::types::{
    InteractionEvent, InteractionEventBuilder, FORMAT_VERSION, MAX_ID_LEN, SLIM_MAGIC,
};

use proptest::prelude::*;
use std::io::Cursor;

const SECOND: u64 = 1_000_000;

fn store(decay: Decay) -> InteractionStore {
    InteractionStore::new(decay, StoreConfig::default())
}

// ==================== Event Tests ====================

#[test]
fn test_event_defaults_to_implicit_weight() {
    let event = InteractionEvent::new("u1", "i1", 42);
    assert_eq!(event.user_id, "u1");
    assert_eq!(event.item_id, "i1");
    assert_eq!(event.timestamp, 42);
    assert!((event.raw_weight - 1.0).abs() < f32::EPSILON);
    assert!(event.validate().is_ok());
}

#[test]
fn test_event_builder() {
    let event = InteractionEventBuilder::new("u1", "i1")
        .timestamp(7)
        .weight(4.5)
        .build();
    assert_eq!(event.timestamp, 7);
    assert!((event.raw_weight - 4.5).abs() < f32::EPSILON);

    let stamped = InteractionEventBuilder::new("u1", "i1").build();
    assert!(stamped.timestamp > 0);
}

#[test]
fn test_event_rejects_bad_identifiers() {
    let empty = InteractionEvent::new("", "i1", 1);
    assert!(matches!(
        empty.validate(),
        Err(SlimError::InvalidIdentifier { kind: "user", .. })
    ));

    let long = InteractionEvent::new("u1", "x".repeat(MAX_ID_LEN + 1), 1);
    assert!(matches!(
        long.validate(),
        Err(SlimError::InvalidIdentifier { kind: "item", .. })
    ));

    let control = InteractionEvent::new("u\n1", "i1", 1);
    assert!(control.validate().is_err());

    let max_len = InteractionEvent::new("u1", "x".repeat(MAX_ID_LEN), 1);
    assert!(max_len.validate().is_ok());
}

#[test]
fn test_event_rejects_bad_weights() {
    for bad in [-1.0f32, f32::NAN, f32::INFINITY] {
        let event = InteractionEventBuilder::new("u1", "i1")
            .timestamp(1)
            .weight(bad)
            .build();
        assert!(matches!(event.validate(), Err(SlimError::InvalidWeight(_))));
    }
    let zero = InteractionEventBuilder::new("u1", "i1")
        .timestamp(1)
        .weight(0.0)
        .build();
    assert!(zero.validate().is_ok());
}

#[test]
fn test_event_json_roundtrip() {
    let event = InteractionEvent::new("u1", "i1", 99);
    let json = serde_json::to_string(&event).unwrap();
    let back: InteractionEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
}

// ==================== Header Tests ====================

#[test]
fn test_header_roundtrip() {
    let header = FileHeader {
        item_count: 3,
        user_count: 2,
        coefficient_count: 4,
        interaction_count: 4,
        id_block_offset: 64,
        coefficient_table_offset: 100,
        interaction_table_offset: 148,
        ..FileHeader::new()
    };
    let mut buf = Vec::new();
    header.write_to(&mut buf).unwrap();
    assert_eq!(buf.len(), 64);
    assert_eq!(&buf[..4], &SLIM_MAGIC);

    let back = FileHeader::read_from(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(back, header);
    assert_eq!(back.version, FORMAT_VERSION);
}

#[test]
fn test_header_bad_magic() {
    let mut buf = Vec::new();
    FileHeader::new().write_to(&mut buf).unwrap();
    buf[0] = b'X';
    assert!(matches!(
        FileHeader::read_from(&mut Cursor::new(&buf)),
        Err(SlimError::InvalidMagic)
    ));
}

#[test]
fn test_header_bad_version() {
    let mut buf = Vec::new();
    FileHeader::new().write_to(&mut buf).unwrap();
    buf[4] = 99;
    assert!(matches!(
        FileHeader::read_from(&mut Cursor::new(&buf)),
        Err(SlimError::UnsupportedVersion(99))
    ));
}

#[test]
fn test_header_truncated() {
    let buf = vec![0x53, 0x4C, 0x49, 0x4D, 1, 0, 0, 0];
    assert!(matches!(
        FileHeader::read_from(&mut Cursor::new(&buf)),
        Err(SlimError::Truncated)
    ));
}

// ==================== Id Table Tests ====================

#[test]
fn test_id_table_interning_is_stable() {
    let mut table = IdTable::new("item");
    assert_eq!(table.intern("a"), 0);
    assert_eq!(table.intern("b"), 1);
    assert_eq!(table.intern("a"), 0);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("b"), Some(1));
    assert_eq!(table.get("c"), None);
    assert_eq!(table.name(1), Some("b"));
    assert_eq!(table.name(5), None);
    assert_eq!(table.names().collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn test_id_table_from_names_rejects_duplicates() {
    let table = IdTable::from_names("user", ["u1", "u2"]).unwrap();
    assert_eq!(table.get("u2"), Some(1));
    assert_eq!(table.kind(), "user");

    assert!(matches!(
        IdTable::from_names("user", ["u1", "u1"]),
        Err(SlimError::InvalidIdentifier { kind: "user", .. })
    ));
    assert!(IdTable::from_names("user", [""]).is_err());
}

// ==================== Sparse Row Tests ====================

#[test]
fn test_sparse_row_keeps_columns_sorted() {
    let mut row = SparseRow::new();
    assert!(row.upsert(5, 0.5f32));
    assert!(row.upsert(1, 0.1));
    assert!(row.upsert(3, 0.3));
    assert!(!row.upsert(3, 0.33));
    let cols: Vec<u32> = row.entries().iter().map(|(c, _)| *c).collect();
    assert_eq!(cols, vec![1, 3, 5]);
    assert_eq!(row.get(3), Some(0.33));
    assert_eq!(row.remove(1), Some(0.1));
    assert_eq!(row.get(1), None);
    assert_eq!(row.len(), 2);
}

// ==================== Decay Tests ====================

#[test]
fn test_decay_disabled_is_identity() {
    let decay = Decay::none();
    assert!(!decay.is_enabled());
    assert_eq!(decay.factor(0).unwrap(), 1.0);
    assert_eq!(decay.factor(i64::MAX).unwrap(), 1.0);
}

#[test]
fn test_decay_half_life() {
    let decay = Decay::with_half_life(60.0).unwrap();
    assert!(decay.is_enabled());
    assert_eq!(decay.factor(0).unwrap(), 1.0);
    let one = decay.factor(60 * SECOND as i64).unwrap();
    let two = decay.factor(120 * SECOND as i64).unwrap();
    assert!((one - 0.5).abs() < 1e-5, "one half-life: {one}");
    assert!((two - 0.25).abs() < 1e-5, "two half-lives: {two}");
}

#[test]
fn test_decay_rate() {
    let decay = Decay::with_rate(0.1).unwrap();
    assert!((decay.rate_per_second() - 0.1).abs() < 1e-12);
    let f = decay.factor(10 * SECOND as i64).unwrap();
    assert!((f - (-1.0f32).exp()).abs() < 1e-5);
}

#[test]
fn test_decay_negative_age_is_error() {
    let decay = Decay::with_rate(1.0).unwrap();
    assert!(matches!(decay.factor(-1), Err(SlimError::NegativeAge(-1))));
    assert!(matches!(
        decay.between(10, 5),
        Err(SlimError::NegativeAge(-5))
    ));
}

#[test]
fn test_decay_projection_saturates_at_zero_age() {
    let decay = Decay::with_rate(1.0).unwrap();
    assert_eq!(decay.project(3.0, 10 * SECOND, 5 * SECOND), 3.0);
    assert!(decay.project(3.0, 0, SECOND) < 3.0);
}

#[test]
fn test_decay_never_reaches_zero() {
    let decay = Decay::with_rate(1_000.0).unwrap();
    let f = decay.factor(1_000 * SECOND as i64).unwrap();
    assert!(f > 0.0);
}

#[test]
fn test_decay_rejects_invalid_parameters() {
    assert!(Decay::with_rate(-0.5).is_err());
    assert!(Decay::with_rate(f64::NAN).is_err());
    assert!(Decay::with_half_life(0.0).is_err());
}

proptest! {
    #[test]
    fn prop_decay_is_monotone(rate in 0.0f64..5.0, a in 0u64..1_000_000_000, b in 0u64..1_000_000_000) {
        let decay = Decay::with_rate(rate).unwrap();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let f_lo = decay.factor(lo as i64).unwrap();
        let f_hi = decay.factor(hi as i64).unwrap();
        prop_assert!(f_hi <= f_lo);
        prop_assert!(f_hi > 0.0 && f_lo <= 1.0);
    }
}

// ==================== Interaction Store Tests ====================

#[test]
fn test_store_first_event_creates_entry() {
    let mut s = store(Decay::none());
    let outcome = s.record(0, 0, 1.0, 100).unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.weight, 1.0);
    assert_eq!(s.entry_count(), 1);
    assert_eq!(s.latest_timestamp(), 100);
    assert_eq!(
        s.entry(0, 0),
        Some(InteractionEntry {
            weight: 1.0,
            timestamp: 100
        })
    );
    assert_eq!(s.users_of(0), &[0]);
}

#[test]
fn test_store_duplicate_event_adds_weights() {
    let mut s = store(Decay::with_rate(0.5).unwrap());
    s.record(0, 0, 1.25, 100).unwrap();
    let outcome = s.record(0, 0, 2.0, 100).unwrap();
    assert!(!outcome.created);
    assert!((outcome.weight - 3.25).abs() < 1e-6);
    assert_eq!(s.entry_count(), 1);
}

#[test]
fn test_store_rebases_before_adding() {
    let decay = Decay::with_half_life(10.0).unwrap();
    let mut s = store(decay);
    s.record(0, 0, 2.0, 0).unwrap();
    let outcome = s.record(0, 0, 1.0, 10 * SECOND).unwrap();
    // 2.0 halves to 1.0, plus the new 1.0
    assert!((outcome.weight - 2.0).abs() < 1e-4);
    assert_eq!(s.entry(0, 0).unwrap().timestamp, 10 * SECOND);
}

#[test]
fn test_store_caps_at_max_weight() {
    let config = StoreConfig {
        max_weight: 3.0,
        ..StoreConfig::default()
    };
    let mut s = InteractionStore::new(Decay::none(), config);
    s.record(0, 0, 2.0, 1).unwrap();
    let outcome = s.record(0, 0, 2.0, 2).unwrap();
    assert_eq!(outcome.weight, 3.0);
    assert_eq!(s.record(0, 1, 50.0, 3).unwrap().weight, 3.0);
}

#[test]
fn test_store_replace_mode() {
    let config = StoreConfig {
        aggregation: AggregationMode::Replace,
        ..StoreConfig::default()
    };
    let mut s = InteractionStore::new(Decay::none(), config);
    s.record(0, 0, 5.0, 1).unwrap();
    assert_eq!(s.record(0, 0, 2.0, 2).unwrap().weight, 2.0);
}

#[test]
fn test_store_rejects_out_of_order_beyond_tolerance() {
    let mut s = store(Decay::none());
    s.record(0, 0, 1.0, 10 * SECOND).unwrap();
    let err = s.record(0, 0, 1.0, 5 * SECOND).unwrap_err();
    assert!(matches!(
        err,
        SlimError::OutOfOrder {
            timestamp,
            stored,
            ..
        } if timestamp == 5 * SECOND && stored == 10 * SECOND
    ));
    // Rejected event left the aggregate alone
    assert_eq!(s.entry(0, 0).unwrap().weight, 1.0);
    assert_eq!(s.check_order(0, 0, 5 * SECOND), Some(10 * SECOND));
    assert_eq!(s.check_order(0, 0, 10 * SECOND), None);
}

#[test]
fn test_store_accepts_late_event_within_tolerance() {
    let mut s = store(Decay::with_rate(1.0).unwrap());
    s.record(0, 0, 1.0, 10 * SECOND).unwrap();
    let outcome = s.record(0, 0, 1.0, 10 * SECOND - SECOND / 2).unwrap();
    assert!((outcome.weight - 2.0).abs() < 1e-6);
    assert_eq!(s.entry(0, 0).unwrap().timestamp, 10 * SECOND);
}

#[test]
fn test_store_rejects_invalid_weight() {
    let mut s = store(Decay::none());
    assert!(matches!(
        s.record(0, 0, -1.0, 1),
        Err(SlimError::InvalidWeight(_))
    ));
    assert_eq!(s.entry_count(), 0);
}

#[test]
fn test_store_read_projection_does_not_mutate() {
    let mut s = store(Decay::with_half_life(1.0).unwrap());
    s.record(0, 3, 4.0, 0).unwrap();
    let w = s.weight_at(0, 3, SECOND);
    assert!((w - 2.0).abs() < 1e-4);
    assert_eq!(s.entry(0, 3).unwrap().weight, 4.0);
    assert_eq!(s.weight_at(0, 9, SECOND), 0.0);
    assert_eq!(s.weight_at(7, 3, SECOND), 0.0);
}

#[test]
fn test_store_user_vector_and_recency() {
    let mut s = store(Decay::none());
    s.record(0, 2, 1.0, 30).unwrap();
    s.record(0, 0, 2.0, 10).unwrap();
    s.record(0, 1, 0.0, 20).unwrap();
    // Zero weights are dropped from the vector
    assert_eq!(s.user_vector(0, 30), vec![(0, 2.0), (2, 1.0)]);
    assert_eq!(s.recent_items(0, 0), vec![2, 1, 0]);
    assert_eq!(s.recent_items(0, 2), vec![2, 1]);
    assert_eq!(s.user_degree(0), 3);
    assert!(s.user_vector(5, 30).is_empty());
}

#[test]
fn test_store_recent_items_partial_selection_matches_full_order() {
    let mut s = store(Decay::none());
    // Scrambled timestamps with ties, resolved by item index
    for item in 0..40u32 {
        s.record(0, item, 1.0, u64::from((item * 7) % 13)).unwrap();
    }
    let all = s.recent_items(0, 0);
    assert_eq!(all.len(), 40);
    for limit in [1, 3, 12, 39, 40, 100] {
        let top = s.recent_items(0, limit);
        assert_eq!(top, all[..limit.min(40)].to_vec(), "limit {limit}");
    }
    assert_eq!(all[0], 11);
}

#[test]
fn test_store_clone_is_independent() {
    let mut s = store(Decay::none());
    s.record(0, 0, 1.0, 1).unwrap();
    let frozen = s.clone();
    s.record(0, 0, 1.0, 2).unwrap();
    s.record(1, 0, 1.0, 3).unwrap();
    assert_eq!(frozen.entry(0, 0).unwrap().weight, 1.0);
    assert_eq!(frozen.entry_count(), 1);
    assert_eq!(frozen.users_of(0), &[0]);
    assert_eq!(s.users_of(0), &[0, 1]);
}

proptest! {
    #[test]
    fn prop_rebasing_matches_direct_decay(
        a in 0.1f32..3.0,
        b in 0.1f32..3.0,
        gap in 0u64..20_000_000,
        tail in 0u64..20_000_000,
    ) {
        let decay = Decay::with_half_life(5.0).unwrap();
        let mut s = store(decay);
        s.record(0, 0, a, 0).unwrap();
        s.record(0, 0, b, gap).unwrap();
        let now = gap + tail;
        let read = s.weight_at(0, 0, now);
        let direct = a * decay.factor(now as i64).unwrap()
            + b * decay.factor(tail as i64).unwrap();
        prop_assert!((read - direct).abs() <= 1e-4 * direct.max(1.0));
    }
}

// ==================== Coefficient Matrix Tests ====================

#[test]
fn test_matrix_set_get_remove() {
    let mut m = CoefficientMatrix::new();
    m.set(0, 1, 0.5).unwrap();
    m.set(2, 1, -0.25).unwrap();
    assert_eq!(m.get(0, 1), 0.5);
    assert_eq!(m.get(1, 0), 0.0);
    assert_eq!(m.nnz(), 2);
    assert_eq!(m.row(2), &[(1, -0.25)]);
    assert_eq!(m.max_abs(), 0.5);

    m.set(0, 1, 0.0).unwrap();
    assert_eq!(m.nnz(), 1);
    assert_eq!(m.get(0, 1), 0.0);
    assert_eq!(m.remove(2, 1), Some(-0.25));
    assert_eq!(m.nnz(), 0);
    assert!(m.row(9).is_empty());
}

#[test]
fn test_matrix_rejects_diagonal() {
    let mut m = CoefficientMatrix::new();
    assert!(matches!(m.set(3, 3, 1.0), Err(SlimError::SelfCoefficient(3))));
    assert_eq!(m.nnz(), 0);
}

#[test]
fn test_matrix_rejects_non_finite() {
    let mut m = CoefficientMatrix::new();
    assert!(matches!(
        m.set(0, 1, f32::NAN),
        Err(SlimError::NumericInstability { row: 0, col: 1, .. })
    ));
}

#[test]
fn test_matrix_triples_are_row_major() {
    let m = CoefficientMatrix::from_triples(vec![(2, 0, 1.0), (0, 2, 2.0), (0, 1, 3.0)]).unwrap();
    let triples: Vec<_> = m.triples().collect();
    assert_eq!(triples, vec![(0, 1, 3.0), (0, 2, 2.0), (2, 0, 1.0)]);
}

#[test]
fn test_matrix_clone_is_copy_on_write() {
    let mut m = CoefficientMatrix::new();
    m.set(0, 1, 1.0).unwrap();
    let frozen = m.clone();
    m.set(0, 1, 2.0).unwrap();
    m.set(4, 0, 1.0).unwrap();
    assert_eq!(frozen.get(0, 1), 1.0);
    assert_eq!(frozen.nnz(), 1);
    assert_eq!(m.get(0, 1), 2.0);
    assert_eq!(m.nnz(), 2);
}
