//! Quota enforcement rules.
//!
//! [`apply`] validates one [`UsageAction`] against the plan limits and
//! returns the mutated snapshot. It never performs I/O and never touches its
//! input: on failure the caller still holds the unmodified snapshot, so a
//! rejected action cannot leak a partial write into the store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OintmentError, Result};

use super::plan::PlanLimits;
use super::snapshot::UsageSnapshot;

/// Metered actions accepted by `POST /usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageAction {
    StartSession,
    EndSession,
    ProjectSubmission,
    CoreRun,
}

impl UsageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageAction::StartSession => "start-session",
            UsageAction::EndSession => "end-session",
            UsageAction::ProjectSubmission => "project-submission",
            UsageAction::CoreRun => "core-run",
        }
    }
}

impl fmt::Display for UsageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageAction {
    type Err = OintmentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "start-session" => Ok(UsageAction::StartSession),
            "end-session" => Ok(UsageAction::EndSession),
            "project-submission" => Ok(UsageAction::ProjectSubmission),
            "core-run" => Ok(UsageAction::CoreRun),
            other => Err(OintmentError::InvalidAction(format!(
                "Unsupported usage action: {other}"
            ))),
        }
    }
}

/// Apply `action` to a copy of `snapshot`, enforcing `limits`.
///
/// `core_id` is only consulted for [`UsageAction::CoreRun`], where it is
/// required.
pub fn apply(
    snapshot: &UsageSnapshot,
    limits: &PlanLimits,
    action: UsageAction,
    core_id: Option<&str>,
) -> Result<UsageSnapshot> {
    let mut next = snapshot.clone();

    match action {
        UsageAction::StartSession => {
            if snapshot.active_sessions >= limits.max_sessions {
                return Err(limit_exceeded(
                    action,
                    snapshot.active_sessions,
                    limits.max_sessions,
                    "Session limit reached. Please close an active session before starting a new one."
                        .to_string(),
                ));
            }
            next.active_sessions += 1;
        }
        UsageAction::EndSession => {
            next.active_sessions = snapshot.active_sessions.saturating_sub(1);
        }
        UsageAction::ProjectSubmission => {
            let limit = limits.max_project_submissions_per_month;
            if snapshot.project_submissions >= limit {
                return Err(limit_exceeded(
                    action,
                    snapshot.project_submissions,
                    limit,
                    format!("Monthly project submission limit reached ({limit})."),
                ));
            }
            next.project_submissions += 1;
        }
        UsageAction::CoreRun => {
            let core_id = core_id.filter(|c| !c.is_empty()).ok_or_else(|| {
                OintmentError::InvalidAction(
                    "coreId is required for core-run usage tracking".to_string(),
                )
            })?;
            let limit = limits.max_runs_per_core;
            let current = snapshot.core_run_count(core_id);
            if current >= limit {
                return Err(limit_exceeded(
                    action,
                    current,
                    limit,
                    format!("Core {core_id} already executed {limit} runs this cycle."),
                ));
            }
            next.core_runs.insert(core_id.to_string(), current + 1);
        }
    }

    Ok(next)
}

fn limit_exceeded(action: UsageAction, current: u32, limit: u32, message: String) -> OintmentError {
    OintmentError::LimitExceeded {
        action: action.as_str().to_string(),
        current,
        limit,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> UsageSnapshot {
        UsageSnapshot::empty("alice", "2025-09")
    }

    fn limits() -> PlanLimits {
        PlanLimits::default()
    }

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(
            "start-session".parse::<UsageAction>().unwrap(),
            UsageAction::StartSession
        );
        assert_eq!(
            "core-run".parse::<UsageAction>().unwrap(),
            UsageAction::CoreRun
        );
    }

    #[test]
    fn test_parse_unknown_action_is_invalid() {
        let err = "delete-everything".parse::<UsageAction>().unwrap_err();
        assert!(matches!(err, OintmentError::InvalidAction(_)));
    }

    #[test]
    fn test_start_then_end_session_restores_count() {
        let mut snap = fresh();
        snap.active_sessions = 2;
        let started = apply(&snap, &limits(), UsageAction::StartSession, None).unwrap();
        assert_eq!(started.active_sessions, 3);
        let ended = apply(&started, &limits(), UsageAction::EndSession, None).unwrap();
        assert_eq!(ended.active_sessions, 2);
    }

    #[test]
    fn test_end_session_never_underflows() {
        let ended = apply(&fresh(), &limits(), UsageAction::EndSession, None).unwrap();
        assert_eq!(ended.active_sessions, 0);
    }

    #[test]
    fn test_session_limit() {
        let mut snap = fresh();
        snap.active_sessions = limits().max_sessions;
        let err = apply(&snap, &limits(), UsageAction::StartSession, None).unwrap_err();
        match err {
            OintmentError::LimitExceeded {
                action,
                current,
                limit,
                ..
            } => {
                assert_eq!(action, "start-session");
                assert_eq!(current, 4);
                assert_eq!(limit, 4);
            }
            other => panic!("expected LimitExceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_project_submission_limit_message() {
        let mut snap = fresh();
        snap.project_submissions = 30;
        let err = apply(&snap, &limits(), UsageAction::ProjectSubmission, None).unwrap_err();
        assert_eq!(err.to_string(), "Monthly project submission limit reached (30).");
    }

    #[test]
    fn test_core_run_exhausts_exactly_at_limit() {
        let limits = limits();
        let mut snap = fresh();
        for _ in 0..limits.max_runs_per_core {
            snap = apply(&snap, &limits, UsageAction::CoreRun, Some("roaster")).unwrap();
        }
        assert_eq!(snap.core_run_count("roaster"), limits.max_runs_per_core);

        let err = apply(&snap, &limits, UsageAction::CoreRun, Some("roaster")).unwrap_err();
        assert!(matches!(err, OintmentError::LimitExceeded { .. }));
        assert_eq!(snap.core_run_count("roaster"), limits.max_runs_per_core);
    }

    #[test]
    fn test_core_runs_are_counted_per_core() {
        let limits = limits();
        let mut snap = fresh();
        for _ in 0..limits.max_runs_per_core {
            snap = apply(&snap, &limits, UsageAction::CoreRun, Some("roaster")).unwrap();
        }
        let snap = apply(&snap, &limits, UsageAction::CoreRun, Some("matrix")).unwrap();
        assert_eq!(snap.core_run_count("matrix"), 1);
    }

    #[test]
    fn test_core_run_requires_core_id() {
        for core in [None, Some("")] {
            let err = apply(&fresh(), &limits(), UsageAction::CoreRun, core).unwrap_err();
            assert!(
                matches!(err, OintmentError::InvalidAction(_)),
                "core {core:?} should be rejected as invalid"
            );
        }
    }

    #[test]
    fn test_core_ids_are_opaque() {
        let snap = apply(&fresh(), &limits(), UsageAction::CoreRun, Some(" roaster ")).unwrap();
        assert_eq!(snap.core_run_count(" roaster "), 1);
        assert_eq!(snap.core_run_count("roaster"), 0);
    }

    #[test]
    fn test_failure_leaves_input_untouched() {
        let mut snap = fresh();
        snap.project_submissions = 30;
        let before = snap.clone();
        let _ = apply(&snap, &limits(), UsageAction::ProjectSubmission, None);
        assert_eq!(snap, before);
    }

    #[test]
    fn test_counters_stay_within_limits_over_many_actions() {
        let limits = PlanLimits {
            max_sessions: 2,
            max_project_submissions_per_month: 3,
            max_runs_per_core: 1,
        };
        let actions = [
            (UsageAction::StartSession, None),
            (UsageAction::ProjectSubmission, None),
            (UsageAction::CoreRun, Some("a")),
            (UsageAction::CoreRun, Some("b")),
            (UsageAction::EndSession, None),
        ];
        let mut snap = fresh();
        for round in 0..10 {
            for (action, core) in actions {
                if let Ok(next) = apply(&snap, &limits, action, core) {
                    snap = next;
                }
                assert!(snap.active_sessions <= limits.max_sessions, "round {round}");
                assert!(snap.project_submissions <= limits.max_project_submissions_per_month);
                assert!(snap.core_runs.values().all(|r| *r <= limits.max_runs_per_core));
            }
        }
    }
}
