use crate::cache::CacheLine;
use crate::replacement_policies::{
    FirstInFirstOut, LeastRecentlyUsed, MostRecentlyUsed, RandomReplacement, ReplacementPolicy,
};

fn line(valid: bool, recency: u64) -> CacheLine {
    CacheLine {
        valid,
        dirty: false,
        tag: 0,
        recency,
        data: Vec::new(),
    }
}

#[test]
fn lru_selects_the_smallest_stamp() {
    let mut policy = LeastRecentlyUsed::new();
    let lines = [line(true, 5), line(true, 3), line(true, 4)];
    assert_eq!(policy.select_victim(&lines), 1);
}

#[test]
fn lru_ties_break_towards_the_lowest_way() {
    let mut policy = LeastRecentlyUsed::new();
    let lines = [line(true, 7), line(true, 7), line(true, 9)];
    assert_eq!(policy.select_victim(&lines), 0);
}

#[test]
fn lru_skips_invalid_lines() {
    let mut policy = LeastRecentlyUsed::new();
    let lines = [line(false, 0), line(true, 8), line(true, 6)];
    assert_eq!(policy.select_victim(&lines), 2);
}

#[test]
fn lru_stamps_on_access_and_fill() {
    let mut policy = LeastRecentlyUsed::new();
    let mut lines = vec![line(true, 0), line(true, 0)];
    policy.update_on_fill(&mut lines, 0);
    policy.update_on_access(&mut lines, 1);
    assert_eq!(lines[0].recency, 1);
    assert_eq!(lines[1].recency, 2);
    policy.update_on_access(&mut lines, 0);
    assert_eq!(lines[0].recency, 3);
}

#[test]
fn fifo_does_not_restamp_on_access() {
    let mut policy = FirstInFirstOut::new();
    let mut lines = vec![line(true, 0), line(true, 0)];
    policy.update_on_fill(&mut lines, 0);
    policy.update_on_fill(&mut lines, 1);
    policy.update_on_access(&mut lines, 0);
    policy.update_on_access(&mut lines, 0);
    assert_eq!(lines[0].recency, 1);
    assert_eq!(policy.select_victim(&lines), 0);
}

#[test]
fn mru_selects_the_largest_stamp() {
    let mut policy = MostRecentlyUsed::new();
    let lines = [line(true, 1), line(true, 3), line(true, 2)];
    assert_eq!(policy.select_victim(&lines), 1);
}

#[test]
fn mru_ties_break_towards_the_lowest_way() {
    let mut policy = MostRecentlyUsed::new();
    let lines = [line(true, 4), line(true, 4), line(true, 1)];
    assert_eq!(policy.select_victim(&lines), 0);
}

#[test]
fn random_victims_stay_in_bounds() {
    let mut policy = RandomReplacement::new(Some(9));
    // Validity is deliberately irrelevant to the random policy
    let lines = [line(true, 1), line(false, 0), line(true, 2), line(false, 0)];
    for _ in 0..200 {
        assert!(policy.select_victim(&lines) < lines.len());
    }
}

#[test]
fn seeded_random_is_reproducible() {
    let lines = vec![line(true, 0); 8];
    let mut first = RandomReplacement::new(Some(1234));
    let mut second = RandomReplacement::new(Some(1234));
    let picks: Vec<usize> = (0..32).map(|_| first.select_victim(&lines)).collect();
    let again: Vec<usize> = (0..32).map(|_| second.select_victim(&lines)).collect();
    assert_eq!(picks, again);
    // reset() rewinds the seeded stream
    first.reset();
    let rewound: Vec<usize> = (0..32).map(|_| first.select_victim(&lines)).collect();
    assert_eq!(picks, rewound);
}

#[test]
fn policy_reset_restarts_the_clock() {
    let mut policy = LeastRecentlyUsed::new();
    let mut lines = vec![line(true, 0), line(true, 0)];
    policy.update_on_fill(&mut lines, 0);
    policy.update_on_fill(&mut lines, 1);
    policy.reset();
    let mut fresh = vec![line(true, 0), line(true, 0)];
    policy.update_on_fill(&mut fresh, 0);
    assert_eq!(fresh[0].recency, 1);
}
