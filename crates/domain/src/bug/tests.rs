use std::str::FromStr;

use bugzot_core::AppError;
use proptest::prelude::*;

use super::{BUG_TITLE_MAX_LENGTH, BugPriority, BugStatus, validate_bug_title};

const ALLOWED_EDGES: &[(BugStatus, BugStatus)] = &[
    (BugStatus::Open, BugStatus::InProgress),
    (BugStatus::InProgress, BugStatus::Resolved),
    (BugStatus::Resolved, BugStatus::Closed),
    (BugStatus::Closed, BugStatus::Reopened),
    (BugStatus::Reopened, BugStatus::InProgress),
];

fn arb_status() -> impl Strategy<Value = BugStatus> {
    prop_oneof![
        Just(BugStatus::Open),
        Just(BugStatus::InProgress),
        Just(BugStatus::Resolved),
        Just(BugStatus::Closed),
        Just(BugStatus::Reopened),
    ]
}

#[test]
fn only_workflow_edges_are_permitted() {
    for from in BugStatus::all() {
        for to in BugStatus::all() {
            let expected = ALLOWED_EDGES.contains(&(*from, *to));
            let result = from.transition_to(*to);
            if expected {
                assert_eq!(result.ok(), Some(*to), "{from:?} -> {to:?}");
            } else {
                assert!(
                    matches!(result, Err(AppError::InvalidTransition(_))),
                    "{from:?} -> {to:?} should be rejected"
                );
            }
        }
    }
}

#[test]
fn self_loops_are_invalid() {
    for status in BugStatus::all() {
        assert!(!status.can_transition_to(*status));
    }
}

#[test]
fn closed_is_the_only_status_without_open_work() {
    let open_work: Vec<_> = BugStatus::all()
        .iter()
        .filter(|status| status.is_open_work())
        .collect();
    assert_eq!(open_work.len(), 4);
    assert!(!BugStatus::Closed.is_open_work());
}

#[test]
fn status_storage_values_parse_back() {
    for status in BugStatus::all() {
        assert_eq!(BugStatus::from_str(status.as_str()).ok(), Some(*status));
    }
    assert!(BugStatus::from_str("wontfix").is_err());
}

#[test]
fn priority_defaults_to_medium() {
    assert_eq!(BugPriority::default(), BugPriority::Medium);
    assert_eq!(BugPriority::from_str("critical").ok(), Some(BugPriority::Critical));
}

#[test]
fn title_is_trimmed_and_bounded() {
    assert_eq!(
        validate_bug_title("  Crash on save ").unwrap_or_default(),
        "Crash on save"
    );
    assert!(validate_bug_title("y".repeat(BUG_TITLE_MAX_LENGTH + 1)).is_err());
    assert!(validate_bug_title("   ").is_err());
}

proptest! {
    #[test]
    fn transition_result_matches_edge_table(from in arb_status(), to in arb_status()) {
        let allowed = ALLOWED_EDGES.contains(&(from, to));
        prop_assert_eq!(from.transition_to(to).is_ok(), allowed);
    }

    #[test]
    fn every_status_has_exactly_one_successor(status in arb_status()) {
        prop_assert_eq!(status.next_statuses().len(), 1);
    }
}
