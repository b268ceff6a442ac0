//! Typed view over a ClusterScan's `Created` and `Completed` conditions
//!
//! The persisted form is a Kubernetes condition list. Reconciliation reads
//! it into [`ScanConditions`], advances it through the transition table and
//! writes it back. Both conditions only ever move forward:
//!
//! ```text
//! Created:   Unset -> True
//! Completed: Unknown -> False -> True
//! ```
//!
//! `Completed=False` is written by the scan runner when it has finished and
//! means "tear me down"; the controller then advances it to `True`.

use std::fmt;

use crate::crd::{find_condition, set_condition, ClusterScanStatus, Condition, ConditionStatus};
use crate::Error;

/// Condition type recording that the scan runner was deployed
pub const CREATED_CONDITION: &str = "Created";

/// Condition type recording scan completion and teardown
pub const COMPLETED_CONDITION: &str = "Completed";

/// State of the `Created` condition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum CreatedState {
    /// Runner not deployed yet
    #[default]
    Unset,
    /// Runner deployed
    True,
}

/// State of the `Completed` condition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompletedState {
    /// Scan still running (or never started)
    #[default]
    Unknown,
    /// Runner finished; teardown pending
    False,
    /// Teardown done
    True,
}

impl fmt::Display for CreatedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => write!(f, "Unset"),
            Self::True => write!(f, "True"),
        }
    }
}

impl fmt::Display for CompletedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::False => write!(f, "False"),
            Self::True => write!(f, "True"),
        }
    }
}

impl CreatedState {
    fn from_condition(condition: Option<&Condition>) -> Self {
        match condition.map(|c| &c.status) {
            Some(ConditionStatus::True) => Self::True,
            _ => Self::Unset,
        }
    }
}

impl CompletedState {
    fn from_condition(condition: Option<&Condition>) -> Self {
        match condition.map(|c| &c.status) {
            Some(ConditionStatus::True) => Self::True,
            Some(ConditionStatus::False) => Self::False,
            _ => Self::Unknown,
        }
    }

    fn status(self) -> ConditionStatus {
        match self {
            Self::Unknown => ConditionStatus::Unknown,
            Self::False => ConditionStatus::False,
            Self::True => ConditionStatus::True,
        }
    }
}

/// Check a single step against the monotonic table.
///
/// Staying put is always allowed; moving to an earlier state never is.
fn check_forward<S: Ord + fmt::Display>(
    condition: &'static str,
    from: S,
    to: S,
) -> Result<S, Error> {
    if to < from {
        return Err(Error::IllegalTransition {
            condition,
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(to)
}

/// Typed snapshot of a scan's lifecycle conditions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanConditions {
    created: CreatedState,
    completed: CompletedState,
}

impl ScanConditions {
    /// Read the conditions from a (possibly absent) status block
    pub fn from_status(status: Option<&ClusterScanStatus>) -> Self {
        let conditions = status.map(|s| s.conditions.as_slice()).unwrap_or(&[]);
        Self {
            created: CreatedState::from_condition(find_condition(conditions, CREATED_CONDITION)),
            completed: CompletedState::from_condition(find_condition(
                conditions,
                COMPLETED_CONDITION,
            )),
        }
    }

    /// Current `Created` state
    pub fn created(&self) -> CreatedState {
        self.created
    }

    /// Current `Completed` state
    pub fn completed(&self) -> CompletedState {
        self.completed
    }

    /// True once the runner has been deployed
    pub fn is_created(&self) -> bool {
        self.created == CreatedState::True
    }

    /// True when the runner has finished and teardown has not happened yet
    pub fn needs_teardown(&self) -> bool {
        self.completed == CompletedState::False
    }

    /// True once teardown has finished
    pub fn is_completed(&self) -> bool {
        self.completed == CompletedState::True
    }

    /// Move `Created` to `target`, rejecting regressions
    pub fn advance_created(&mut self, target: CreatedState) -> Result<(), Error> {
        self.created = check_forward(CREATED_CONDITION, self.created, target)?;
        Ok(())
    }

    /// Move `Completed` to `target`, rejecting regressions
    pub fn advance_completed(&mut self, target: CompletedState) -> Result<(), Error> {
        self.completed = check_forward(COMPLETED_CONDITION, self.completed, target)?;
        Ok(())
    }

    /// Record a successful deploy: `Created=True`, `Completed=Unknown`.
    ///
    /// Fails if `Completed` already moved past `Unknown`, since resetting it
    /// would move it backwards.
    pub fn mark_created(&mut self) -> Result<(), Error> {
        let mut next = *self;
        next.advance_created(CreatedState::True)?;
        next.advance_completed(CompletedState::Unknown)?;
        *self = next;
        Ok(())
    }

    /// Record a finished teardown: `Completed=True`
    pub fn mark_completed(&mut self) -> Result<(), Error> {
        self.advance_completed(CompletedState::True)
    }

    /// Write both conditions into `status`, leaving other condition types alone
    pub fn write_to(&self, status: &mut ClusterScanStatus) {
        if self.created == CreatedState::True {
            set_condition(
                &mut status.conditions,
                Condition::new(
                    CREATED_CONDITION,
                    ConditionStatus::True,
                    "RunnerDeployed",
                    "Scan runner deployed",
                ),
            );
        }

        let (reason, message) = match self.completed {
            CompletedState::Unknown => ("ScanRunning", "Scan in progress"),
            CompletedState::False => ("ScanFinished", "Scan finished, teardown pending"),
            CompletedState::True => ("RunnerRemoved", "Scan finished and runner removed"),
        };
        set_condition(
            &mut status.conditions,
            Condition::new(COMPLETED_CONDITION, self.completed.status(), reason, message),
        );
    }
}
