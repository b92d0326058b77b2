//! Notices sent to users after a reimbursement changes state.
//!
//! Building the notice is pure; storing and emailing it is done by the
//! notifier in the API crate on a detached task.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A claim was approved.
    ReimbursementApproved,
    /// A claim was rejected.
    ReimbursementRejected,
    /// A claim was paid out.
    ReimbursementPaid,
    /// Anything else.
    General,
}

impl NotificationKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReimbursementApproved => "REIMBURSEMENT_APPROVED",
            Self::ReimbursementRejected => "REIMBURSEMENT_REJECTED",
            Self::ReimbursementPaid => "REIMBURSEMENT_PAID",
            Self::General => "GENERAL",
        }
    }

    /// Parses a kind; unknown values map to `General`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "REIMBURSEMENT_APPROVED" => Self::ReimbursementApproved,
            "REIMBURSEMENT_REJECTED" => Self::ReimbursementRejected,
            "REIMBURSEMENT_PAID" => Self::ReimbursementPaid,
            _ => Self::General,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference type stored with reimbursement notices.
pub const REIMBURSEMENT_REFERENCE: &str = "reimbursement";

/// A notification ready to be stored and delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Recipient.
    pub user_id: Uuid,
    /// Kind.
    pub kind: NotificationKind,
    /// Short title, also used as email subject.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Record the notice is about.
    pub reference_id: Option<Uuid>,
    /// Table name of `reference_id`.
    pub reference_type: Option<String>,
}

impl Notice {
    /// Notice for the submitter of an approved claim.
    #[must_use]
    pub fn reimbursement_approved(
        submitter: Uuid,
        reimbursement_id: Uuid,
        title: &str,
        amount: Decimal,
    ) -> Self {
        Self::about_reimbursement(
            submitter,
            reimbursement_id,
            NotificationKind::ReimbursementApproved,
            "Reimbursement approved".to_string(),
            format!("Your reimbursement \"{title}\" for {amount} has been approved."),
        )
    }

    /// Notice for the submitter of a rejected claim.
    #[must_use]
    pub fn reimbursement_rejected(
        submitter: Uuid,
        reimbursement_id: Uuid,
        title: &str,
        reason: &str,
    ) -> Self {
        Self::about_reimbursement(
            submitter,
            reimbursement_id,
            NotificationKind::ReimbursementRejected,
            "Reimbursement rejected".to_string(),
            format!("Your reimbursement \"{title}\" was rejected. Reason: {reason}"),
        )
    }

    /// Notice for the submitter of a paid claim.
    #[must_use]
    pub fn reimbursement_paid(
        submitter: Uuid,
        reimbursement_id: Uuid,
        title: &str,
        amount: Decimal,
    ) -> Self {
        Self::about_reimbursement(
            submitter,
            reimbursement_id,
            NotificationKind::ReimbursementPaid,
            "Reimbursement paid".to_string(),
            format!("Your reimbursement \"{title}\" for {amount} has been paid."),
        )
    }

    fn about_reimbursement(
        user_id: Uuid,
        reimbursement_id: Uuid,
        kind: NotificationKind,
        title: String,
        message: String,
    ) -> Self {
        Self {
            user_id,
            kind,
            title,
            message,
            reference_id: Some(reimbursement_id),
            reference_type: Some(REIMBURSEMENT_REFERENCE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(NotificationKind::ReimbursementApproved)]
    #[case(NotificationKind::ReimbursementRejected)]
    #[case(NotificationKind::ReimbursementPaid)]
    #[case(NotificationKind::General)]
    fn test_kind_round_trips(#[case] kind: NotificationKind) {
        assert_eq!(NotificationKind::parse(kind.as_str()), kind);
    }

    #[test]
    fn test_unknown_kind_is_general() {
        assert_eq!(NotificationKind::parse("TASK_ASSIGNED"), NotificationKind::General);
    }

    #[test]
    fn test_rejected_notice_carries_reason() {
        let submitter = Uuid::new_v4();
        let claim = Uuid::new_v4();
        let notice = Notice::reimbursement_rejected(submitter, claim, "Taxi", "no receipt");

        assert_eq!(notice.user_id, submitter);
        assert_eq!(notice.kind, NotificationKind::ReimbursementRejected);
        assert!(notice.message.contains("no receipt"));
        assert_eq!(notice.reference_id, Some(claim));
        assert_eq!(notice.reference_type.as_deref(), Some("reimbursement"));
    }

    #[test]
    fn test_paid_notice_mentions_amount() {
        let notice = Notice::reimbursement_paid(Uuid::nil(), Uuid::nil(), "Hotel", dec!(450000));
        assert_eq!(notice.title, "Reimbursement paid");
        assert!(notice.message.contains("450000"));
    }
}
