use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Draft,
    Pending,
    UnderReview,
    Interview,
    WaitingList,
    Recommended,
    Placed,
    Rejected,
}

/// Order in which an application normally progresses.
pub const STATUS_SEQUENCE: [ApplicationStatus; 7] = [
    ApplicationStatus::Draft,
    ApplicationStatus::Pending,
    ApplicationStatus::UnderReview,
    ApplicationStatus::Interview,
    ApplicationStatus::WaitingList,
    ApplicationStatus::Recommended,
    ApplicationStatus::Placed,
];

impl ApplicationStatus {
    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "Draft",
            ApplicationStatus::Pending => "Submitted",
            ApplicationStatus::UnderReview => "Under Review",
            ApplicationStatus::Interview => "Interview Stage",
            ApplicationStatus::WaitingList => "Waiting List",
            ApplicationStatus::Recommended => "Recommended",
            ApplicationStatus::Placed => "Successfully Placed",
            ApplicationStatus::Rejected => "Not Selected",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "Profile has not been submitted yet",
            ApplicationStatus::Pending => "Profile submitted and waiting for review",
            ApplicationStatus::UnderReview => "The Elkkana team is reviewing your profile",
            ApplicationStatus::Interview => "You have been invited to an interview",
            ApplicationStatus::WaitingList => "You are on the Elkkana waiting list",
            ApplicationStatus::Recommended => "Your profile has been recommended to a partner company",
            ApplicationStatus::Placed => "Congratulations! You have been placed",
            ApplicationStatus::Rejected => "Unfortunately you were not selected this time",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Placed | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStep {
    pub status: ApplicationStatus,
    pub label: &'static str,
    pub description: &'static str,
    pub is_completed: bool,
    pub is_current: bool,
}

impl TimelineStep {
    fn new(status: ApplicationStatus, is_completed: bool, is_current: bool) -> Self {
        Self {
            status,
            label: status.label(),
            description: status.description(),
            is_completed,
            is_current,
        }
    }
}

/// Progress timeline for an application in `current` status.
///
/// A rejected application shows the review stages it went through,
/// followed by the rejection as the current step.
pub fn timeline(current: ApplicationStatus) -> Vec<TimelineStep> {
    if current == ApplicationStatus::Rejected {
        let mut steps: Vec<TimelineStep> = STATUS_SEQUENCE[..3]
            .iter()
            .map(|status| TimelineStep::new(*status, true, false))
            .collect();
        steps.push(TimelineStep::new(ApplicationStatus::Rejected, true, true));
        return steps;
    }

    let current_index = STATUS_SEQUENCE
        .iter()
        .position(|status| *status == current)
        .unwrap_or(0);

    STATUS_SEQUENCE
        .iter()
        .enumerate()
        .map(|(index, status)| {
            let is_current = index == current_index;
            let is_completed = index < current_index || (is_current && status.is_terminal());
            TimelineStep::new(*status, is_completed, is_current)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_timeline_marks_only_first_step_current() {
        let steps = timeline(ApplicationStatus::Draft);

        assert_eq!(steps.len(), STATUS_SEQUENCE.len());
        assert!(steps[0].is_current);
        assert!(!steps[0].is_completed);
        assert!(steps.iter().skip(1).all(|s| !s.is_current && !s.is_completed));
    }

    #[test]
    fn interview_timeline_completes_earlier_steps() {
        let steps = timeline(ApplicationStatus::Interview);

        let completed: Vec<_> = steps.iter().filter(|s| s.is_completed).map(|s| s.status).collect();
        assert_eq!(
            completed,
            vec![
                ApplicationStatus::Draft,
                ApplicationStatus::Pending,
                ApplicationStatus::UnderReview,
            ]
        );
        assert_eq!(steps[3].status, ApplicationStatus::Interview);
        assert!(steps[3].is_current);
    }

    #[test]
    fn placed_timeline_is_fully_completed() {
        let steps = timeline(ApplicationStatus::Placed);
        assert!(steps.iter().all(|s| s.is_completed));
        assert!(steps.last().unwrap().is_current);
    }

    #[test]
    fn rejected_timeline_ends_with_rejection() {
        let steps = timeline(ApplicationStatus::Rejected);

        assert_eq!(steps.len(), 4);
        let last = steps.last().unwrap();
        assert_eq!(last.status, ApplicationStatus::Rejected);
        assert!(last.is_current);
        assert_eq!(last.label, "Not Selected");
    }

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ApplicationStatus::UnderReview).unwrap();
        assert_eq!(json, "\"under_review\"");
    }
}
