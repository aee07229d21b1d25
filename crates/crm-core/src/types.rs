use crate::error::CrmError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned row identifier. `0` marks a record that has not been persisted yet.
pub type RecordId = u64;

// ---------------------------------------------------------------------------
// EnrollmentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Removed,
}

impl EnrollmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "Active",
            EnrollmentStatus::Completed => "Completed",
            EnrollmentStatus::Removed => "Removed",
        }
    }

    /// Completed and Removed accept no further transitions.
    pub fn is_terminal(self) -> bool {
        !matches!(self, EnrollmentStatus::Active)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(EnrollmentStatus::Active),
            "completed" => Ok(EnrollmentStatus::Completed),
            "removed" => Ok(EnrollmentStatus::Removed),
            _ => Err(CrmError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// StepType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    #[serde(alias = "Email")]
    Email,
    #[serde(alias = "Call")]
    Call,
    #[serde(alias = "LinkedIn", alias = "Linkedin")]
    Linkedin,
    #[serde(alias = "Other")]
    Other,
}

impl StepType {
    pub fn all() -> &'static [StepType] {
        &[
            StepType::Email,
            StepType::Call,
            StepType::Linkedin,
            StepType::Other,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepType::Email => "email",
            StepType::Call => "call",
            StepType::Linkedin => "linkedin",
            StepType::Other => "other",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepType {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(StepType::Email),
            "call" => Ok(StepType::Call),
            "linkedin" => Ok(StepType::Linkedin),
            "other" => Ok(StepType::Other),
            "" => Err(CrmError::validation("step type is required")),
            other => {
                let expected: Vec<&str> = StepType::all().iter().map(|t| t.as_str()).collect();
                Err(CrmError::validation(format!(
                    "unknown step type '{other}' (expected one of: {})",
                    expected.join(", ")
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DealStage
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum DealStage {
    #[default]
    Discovery,
    Proposal,
    Negotiation,
    #[serde(rename = "Closed Won")]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    ClosedLost,
}

impl DealStage {
    pub fn all() -> &'static [DealStage] {
        &[
            DealStage::Discovery,
            DealStage::Proposal,
            DealStage::Negotiation,
            DealStage::ClosedWon,
            DealStage::ClosedLost,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DealStage::Discovery => "Discovery",
            DealStage::Proposal => "Proposal",
            DealStage::Negotiation => "Negotiation",
            DealStage::ClosedWon => "Closed Won",
            DealStage::ClosedLost => "Closed Lost",
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }
}

impl fmt::Display for DealStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DealStage {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn squash(s: &str) -> String {
            s.chars()
                .filter(|c| !matches!(c, ' ' | '-' | '_'))
                .collect::<String>()
                .to_ascii_lowercase()
        }
        let wanted = squash(s);
        DealStage::all()
            .iter()
            .copied()
            .find(|stage| squash(stage.as_str()) == wanted)
            .ok_or_else(|| CrmError::InvalidStage(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_type_parses_any_case() {
        assert_eq!("Email".parse::<StepType>().unwrap(), StepType::Email);
        assert_eq!("LinkedIn".parse::<StepType>().unwrap(), StepType::Linkedin);
        assert_eq!(" call ".parse::<StepType>().unwrap(), StepType::Call);
        assert!("".parse::<StepType>().is_err());
        assert!("fax".parse::<StepType>().is_err());
    }

    #[test]
    fn unknown_step_type_lists_every_type() {
        let err = "fax".parse::<StepType>().unwrap_err().to_string();
        for t in StepType::all() {
            assert!(err.contains(t.as_str()), "{err}");
        }
    }

    #[test]
    fn step_type_deserializes_capitalized_aliases() {
        let t: StepType = serde_yaml::from_str("LinkedIn").unwrap();
        assert_eq!(t, StepType::Linkedin);
        let t: StepType = serde_yaml::from_str("email").unwrap();
        assert_eq!(t, StepType::Email);
    }

    #[test]
    fn deal_stage_roundtrips_display() {
        for stage in DealStage::all() {
            let parsed: DealStage = stage.to_string().parse().unwrap();
            assert_eq!(parsed, *stage);
        }
        assert_eq!("closed-won".parse::<DealStage>().unwrap(), DealStage::ClosedWon);
    }

    #[test]
    fn enrollment_status_terminal_states() {
        assert!(!EnrollmentStatus::Active.is_terminal());
        assert!(EnrollmentStatus::Completed.is_terminal());
        assert!(EnrollmentStatus::Removed.is_terminal());
        assert_eq!(
            "removed".parse::<EnrollmentStatus>().unwrap(),
            EnrollmentStatus::Removed
        );
    }
}
