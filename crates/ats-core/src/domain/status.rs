//! Application status and the transition rules between statuses.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ValidationError;

/// Review status of an application.
///
/// A flat enumeration: by default any status may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    New,
    Shortlisted,
    Interviewed,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::New,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interviewed,
        ApplicationStatus::Rejected,
        ApplicationStatus::Hired,
    ];

    /// Wire name, as used in query strings and request bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::New => "NEW",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::Interviewed => "INTERVIEWED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Hired => "HIRED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::New => "New",
            ApplicationStatus::Shortlisted => "Shortlisted",
            ApplicationStatus::Interviewed => "Interviewed",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Hired => "Hired",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status '{0}'")]
pub struct ParseStatusError(String);

impl FromStr for ApplicationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Which status changes a recruiter may make.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status to any other.
    #[default]
    Unrestricted,

    /// Explicit table of legal `from -> to` moves. Staying on the same status is always legal.
    Table(HashMap<ApplicationStatus, HashSet<ApplicationStatus>>),
}

impl TransitionPolicy {
    pub fn table(
        moves: impl IntoIterator<Item = (ApplicationStatus, ApplicationStatus)>,
    ) -> Self {
        let mut table: HashMap<ApplicationStatus, HashSet<ApplicationStatus>> = HashMap::new();
        for (from, to) in moves {
            table.entry(from).or_default().insert(to);
        }
        TransitionPolicy::Table(table)
    }

    pub fn allows(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        match self {
            TransitionPolicy::Unrestricted => true,
            TransitionPolicy::Table(table) => {
                from == to || table.get(&from).is_some_and(|targets| targets.contains(&to))
            }
        }
    }

    pub fn check(
        &self,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<(), ValidationError> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(ValidationError::IllegalTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("NEW", ApplicationStatus::New)]
    #[case("shortlisted", ApplicationStatus::Shortlisted)]
    #[case(" Interviewed ", ApplicationStatus::Interviewed)]
    #[case("hired", ApplicationStatus::Hired)]
    fn parses_status_names(#[case] input: &str, #[case] expected: ApplicationStatus) {
        assert_eq!(input.parse::<ApplicationStatus>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("ARCHIVED".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn wire_names_match_serde() {
        for status in ApplicationStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn unrestricted_policy_allows_any_move() {
        let policy = TransitionPolicy::default();
        for from in ApplicationStatus::ALL {
            for to in ApplicationStatus::ALL {
                assert!(policy.allows(from, to));
            }
        }
    }

    #[rstest]
    #[case(ApplicationStatus::New, ApplicationStatus::Shortlisted, true)]
    #[case(ApplicationStatus::Shortlisted, ApplicationStatus::Interviewed, true)]
    #[case(ApplicationStatus::New, ApplicationStatus::Hired, false)]
    #[case(ApplicationStatus::Hired, ApplicationStatus::Hired, true)]
    fn table_policy_only_allows_listed_moves(
        #[case] from: ApplicationStatus,
        #[case] to: ApplicationStatus,
        #[case] allowed: bool,
    ) {
        let policy = TransitionPolicy::table([
            (ApplicationStatus::New, ApplicationStatus::Shortlisted),
            (ApplicationStatus::Shortlisted, ApplicationStatus::Interviewed),
        ]);
        assert_eq!(policy.allows(from, to), allowed);
        assert_eq!(policy.check(from, to).is_ok(), allowed);
    }
}
