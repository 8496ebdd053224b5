//! Property-based test generators using proptest.
//!
//! Provides strategies for generating edits and request shapes that keep
//! the invariants clients rely on: client sequences are positive and keys
//! are never empty.

use proptest::prelude::*;
use tessera_protocol::{ClientId, Operation, Primitive};

/// Strategy for generating client IDs.
pub fn client_id_strategy() -> impl Strategy<Value = ClientId> {
    prop::array::uniform16(any::<u8>()).prop_map(ClientId::from_bytes)
}

/// Strategy for generating root keys from a small alphabet, so generated
/// edits collide often.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "title", "body"]).prop_map(str::to_owned)
}

/// Strategy for generating primitive values.
pub fn primitive_strategy() -> impl Strategy<Value = Primitive> {
    prop_oneof![
        Just(Primitive::Null),
        any::<bool>().prop_map(Primitive::Bool),
        any::<i64>().prop_map(Primitive::Integer),
        "[a-z]{0,12}".prop_map(Primitive::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Primitive::Bytes),
    ]
}

/// Strategy for generating one operation; sets outnumber removals.
pub fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        4 => (key_strategy(), primitive_strategy())
            .prop_map(|(key, value)| Operation::Set { key, value }),
        1 => key_strategy().prop_map(Operation::remove),
    ]
}

/// Strategy for generating the operations of one change.
pub fn operations_strategy() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(), 1..4)
}

/// Strategy for generating a batch of local edits, one change per entry.
pub fn edit_batch_strategy(max_changes: usize) -> impl Strategy<Value = Vec<Vec<Operation>>> {
    prop::collection::vec(operations_strategy(), 1..=max_changes.max(1))
}

/// Strategy for generating the client sequences of a request that resends
/// an already-pushed prefix.
///
/// Yields `(pushed, resent)`: `1..=pushed` were acknowledged before, and the
/// request carries `1..=resent`, so `resent` may be smaller, equal or larger.
pub fn retry_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..20, 1u64..30)
}

/// Strategy for generating a snapshot threshold and a gap around it.
pub fn threshold_gap_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..40).prop_flat_map(|threshold| (Just(threshold), 0..threshold * 2))
}
