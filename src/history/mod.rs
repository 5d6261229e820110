/// Download-history state machine
///
/// Pure transition planning for product status events. The repository layer
/// executes the plan inside a row-locked transaction, so the read-plan-write
/// sequence is atomic per (site, satellite, product) key even with several
/// downloader processes reporting concurrently.
use crate::domain::Status;

/// The single row mutation a status event resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First observation of the product: new row, retry counter starts at 1.
    Insert { status: Status, retries: i16 },
    /// Status-only update; the retry counter is untouched.
    UpdateStatus { status: Status },
    /// Failure bookkeeping: bumped retry counter, or a forced abort once the
    /// retry budget is exhausted.
    UpdateStatusAndRetries { status: Status, retries: i16 },
}

/// Plans the row mutation for one incoming status event.
///
/// `existing` is the current (status, retries) of the row when one exists.
/// Rules:
/// - no row yet: insert at the event status with retries = 1 (any status can
///   be the first one observed);
/// - a `Failed` event increments retries, unless the counter already reached
///   `max_retries`, in which case the status is forced to `Aborted` and the
///   counter stays put;
/// - every other event only overwrites the status.
pub fn plan_transition(
    existing: Option<(Status, i16)>,
    event: Status,
    max_retries: i16,
) -> Transition {
    let Some((_, retries)) = existing else {
        return Transition::Insert {
            status: event,
            retries: 1,
        };
    };
    if event == Status::Failed {
        if retries >= max_retries {
            Transition::UpdateStatusAndRetries {
                status: Status::Aborted,
                retries,
            }
        } else {
            Transition::UpdateStatusAndRetries {
                status: Status::Failed,
                retries: retries + 1,
            }
        }
    } else {
        Transition::UpdateStatus { status: event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_event_inserts_with_one_retry() {
        for event in [Status::Downloading, Status::Downloaded, Status::Failed] {
            assert_eq!(
                plan_transition(None, event, 3),
                Transition::Insert {
                    status: event,
                    retries: 1
                }
            );
        }
    }

    #[test]
    fn test_non_failed_events_update_status_only() {
        for event in [
            Status::Downloading,
            Status::Downloaded,
            Status::Processed,
            Status::Aborted,
        ] {
            assert_eq!(
                plan_transition(Some((Status::Downloading, 2)), event, 3),
                Transition::UpdateStatus { status: event }
            );
        }
    }

    #[test]
    fn test_repeated_non_failed_event_is_idempotent_on_retries() {
        // Same status twice: retries are never part of the plan, so the
        // counter cannot drift.
        let plan = plan_transition(Some((Status::Downloaded, 2)), Status::Downloaded, 3);
        assert_eq!(
            plan,
            Transition::UpdateStatus {
                status: Status::Downloaded
            }
        );
    }

    #[test]
    fn test_failed_increments_until_budget_exhausted() {
        // maxRetries = 3: counter walks 1 -> 2 -> 3 staying Failed...
        assert_eq!(
            plan_transition(Some((Status::Failed, 1)), Status::Failed, 3),
            Transition::UpdateStatusAndRetries {
                status: Status::Failed,
                retries: 2
            }
        );
        assert_eq!(
            plan_transition(Some((Status::Failed, 2)), Status::Failed, 3),
            Transition::UpdateStatusAndRetries {
                status: Status::Failed,
                retries: 3
            }
        );
        // ...and the next failure aborts without incrementing past 3.
        assert_eq!(
            plan_transition(Some((Status::Failed, 3)), Status::Failed, 3),
            Transition::UpdateStatusAndRetries {
                status: Status::Aborted,
                retries: 3
            }
        );
    }

    #[test]
    fn test_failure_after_insert_with_low_budget() {
        // First event Downloading inserts at retries = 1; a failure bumps to
        // 2; with maxRetries = 2 the next failure aborts, counter unchanged.
        assert_eq!(
            plan_transition(None, Status::Downloading, 2),
            Transition::Insert {
                status: Status::Downloading,
                retries: 1
            }
        );
        assert_eq!(
            plan_transition(Some((Status::Downloading, 1)), Status::Failed, 2),
            Transition::UpdateStatusAndRetries {
                status: Status::Failed,
                retries: 2
            }
        );
        assert_eq!(
            plan_transition(Some((Status::Failed, 2)), Status::Failed, 2),
            Transition::UpdateStatusAndRetries {
                status: Status::Aborted,
                retries: 2
            }
        );
    }
}
