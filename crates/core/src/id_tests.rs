// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uuid_idgen_generates_unique_ids() {
    let ids = UuidIdGen;
    let a = ids.next();
    let b = ids.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36, "should be a hyphenated uuid");
}

#[test]
fn sequential_idgen_counts_up() {
    let ids = SequentialIdGen::new("t");
    assert_eq!(ids.next(), "t-1");
    assert_eq!(ids.next(), "t-2");
    assert_eq!(ids.next(), "t-3");
}

#[test]
fn sequential_idgen_clones_share_counter() {
    let ids = SequentialIdGen::default();
    let other = ids.clone();
    assert_eq!(ids.next(), "timer-1");
    assert_eq!(other.next(), "timer-2");
}
