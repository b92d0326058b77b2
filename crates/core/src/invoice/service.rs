//! Invoice status changes.

use chrono::{DateTime, Utc};

use super::types::InvoiceStatus;

/// Result of changing an invoice's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Status to persist.
    pub new_status: InvoiceStatus,
    /// Payment timestamp to persist (`None` clears it).
    pub paid_at: Option<DateTime<Utc>>,
}

/// Stateless invoice rules.
pub struct InvoiceService;

impl InvoiceService {
    /// Computes the fields written when an invoice moves to `target`.
    ///
    /// Every status may move to every other status. Moving to PAID stamps
    /// `paid_at = now` (again, when already PAID). Any other target clears it.
    #[must_use]
    pub fn change_status(target: InvoiceStatus, now: DateTime<Utc>) -> StatusChange {
        StatusChange {
            new_status: target,
            paid_at: (target == InvoiceStatus::Paid).then_some(now),
        }
    }

    /// Fields for a newly created invoice in `status`.
    #[must_use]
    pub fn initial_status(status: Option<InvoiceStatus>, now: DateTime<Utc>) -> StatusChange {
        Self::change_status(status.unwrap_or_default(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(InvoiceStatus::Unpaid)]
    #[case(InvoiceStatus::Debt)]
    #[case(InvoiceStatus::Paid)]
    fn test_change_status_keeps_paid_at_consistent(#[case] target: InvoiceStatus) {
        let now = Utc::now();
        let change = InvoiceService::change_status(target, now);
        assert_eq!(change.new_status, target);
        assert_eq!(change.paid_at.is_some(), target == InvoiceStatus::Paid);
    }

    #[test]
    fn test_paid_stamps_now() {
        let now = Utc::now();
        let change = InvoiceService::change_status(InvoiceStatus::Paid, now);
        assert_eq!(change.paid_at, Some(now));
    }

    #[test]
    fn test_leaving_paid_clears_timestamp() {
        let change = InvoiceService::change_status(InvoiceStatus::Debt, Utc::now());
        assert_eq!(change.paid_at, None);
    }

    #[test]
    fn test_initial_status_defaults_to_unpaid() {
        let change = InvoiceService::initial_status(None, Utc::now());
        assert_eq!(change.new_status, InvoiceStatus::Unpaid);
        assert_eq!(change.paid_at, None);
    }

    #[test]
    fn test_created_paid_is_stamped() {
        let now = Utc::now();
        let change = InvoiceService::initial_status(Some(InvoiceStatus::Paid), now);
        assert_eq!(change.paid_at, Some(now));
    }
}
