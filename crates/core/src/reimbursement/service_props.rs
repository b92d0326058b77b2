//! Property-based tests for the reimbursement transition guard.

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use crate::reimbursement::error::TransitionError;
use crate::reimbursement::service::ReimbursementService;
use crate::reimbursement::types::{ReimbursementAction, ReimbursementStatus};

fn arb_status() -> impl Strategy<Value = ReimbursementStatus> {
    prop_oneof![
        Just(ReimbursementStatus::Pending),
        Just(ReimbursementStatus::Approved),
        Just(ReimbursementStatus::Rejected),
        Just(ReimbursementStatus::Paid),
    ]
}

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn arb_reason() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ]{0,99}"
}

/// Every way a caller can drive the guard.
#[derive(Debug, Clone)]
enum Command {
    Approve(Uuid),
    Reject(Uuid, String),
    MarkPaid,
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        arb_uuid().prop_map(Command::Approve),
        (arb_uuid(), arb_reason()).prop_map(|(u, r)| Command::Reject(u, r)),
        Just(Command::MarkPaid),
    ]
}

fn run(status: ReimbursementStatus, command: &Command) -> Result<ReimbursementAction, TransitionError> {
    let now = Utc::now();
    match command {
        Command::Approve(user) => ReimbursementService::approve(status, *user, now),
        Command::Reject(user, reason) => ReimbursementService::reject(status, *user, reason),
        Command::MarkPaid => ReimbursementService::mark_paid(status, now),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The guard accepts exactly the transitions the state machine allows.
    #[test]
    fn prop_guard_matches_transition_table(status in arb_status(), command in arb_command()) {
        let target = match &command {
            Command::Approve(_) => ReimbursementStatus::Approved,
            Command::Reject(..) => ReimbursementStatus::Rejected,
            Command::MarkPaid => ReimbursementStatus::Paid,
        };

        let result = run(status, &command);
        prop_assert_eq!(
            result.is_ok(),
            ReimbursementService::is_valid_transition(status, target)
        );
        if let Ok(action) = result {
            prop_assert_eq!(action.new_status(), target);
        }
    }

    /// Terminal states reject every command.
    #[test]
    fn prop_terminal_states_are_final(command in arb_command()) {
        for status in [ReimbursementStatus::Rejected, ReimbursementStatus::Paid] {
            let is_conflict = matches!(
                run(status, &command),
                Err(TransitionError::InvalidTransition { .. })
            );
            prop_assert!(is_conflict);
        }
    }

    /// Approval stamps the caller as approver.
    #[test]
    fn prop_approve_records_caller(user in arb_uuid()) {
        let action = ReimbursementService::approve(ReimbursementStatus::Pending, user, Utc::now()).unwrap();
        let is_approver = matches!(action, ReimbursementAction::Approve { approved_by, .. } if approved_by == user);
        prop_assert!(is_approver);
    }

    /// Whitespace-only reasons fail validation in every status.
    #[test]
    fn prop_blank_reason_always_rejected(status in arb_status(), blank in "[ \t\n]{0,10}") {
        prop_assert_eq!(
            ReimbursementService::reject(status, Uuid::nil(), &blank),
            Err(TransitionError::RejectionReasonRequired)
        );
    }

    /// Applying a random command sequence never leaves the lifecycle graph.
    #[test]
    fn prop_sequences_stay_on_graph(commands in proptest::collection::vec(arb_command(), 1..20)) {
        let mut status = ReimbursementStatus::Pending;
        for command in &commands {
            if let Ok(action) = run(status, command) {
                let next = action.new_status();
                prop_assert!(ReimbursementService::is_valid_transition(status, next));
                status = next;
            }
        }
    }
}
