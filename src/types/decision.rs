//! Authorization decisions and rule effects.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};

/// Which final decisions were still reachable when an evaluation could not be
/// determined (XACML 3.0 §7.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedIndeterminate {
    Deny,
    Permit,
    DenyOrPermit,
}

impl ExtendedIndeterminate {
    pub fn for_effect(effect: Effect) -> Self {
        match effect {
            Effect::Deny => ExtendedIndeterminate::Deny,
            Effect::Permit => ExtendedIndeterminate::Permit,
        }
    }
}

/// The outcome of evaluating a rule, policy, or policy set against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate(ExtendedIndeterminate),
}

impl Decision {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Decision::Indeterminate(_))
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Decision::Permit => write!(f, "Permit"),
            Decision::Deny => write!(f, "Deny"),
            Decision::NotApplicable => write!(f, "NotApplicable"),
            Decision::Indeterminate(ExtendedIndeterminate::Deny) => write!(f, "Indeterminate{{D}}"),
            Decision::Indeterminate(ExtendedIndeterminate::Permit) => {
                write!(f, "Indeterminate{{P}}")
            }
            Decision::Indeterminate(ExtendedIndeterminate::DenyOrPermit) => {
                write!(f, "Indeterminate{{DP}}")
            }
        }
    }
}

/// The effect a rule carries when it applies.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
)]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    pub fn decision(self) -> Decision {
        match self {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }

    /// The decision when this effect's evaluation failed: indeterminate, with
    /// only this effect's branch still reachable.
    pub fn indeterminate(self) -> Decision {
        Decision::Indeterminate(ExtendedIndeterminate::for_effect(self))
    }

    pub fn opposite(self) -> Effect {
        match self {
            Effect::Permit => Effect::Deny,
            Effect::Deny => Effect::Permit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_forms() {
        insta::assert_snapshot!(Decision::Permit, @"Permit");
        insta::assert_snapshot!(Decision::NotApplicable, @"NotApplicable");
        insta::assert_snapshot!(
            Decision::Indeterminate(ExtendedIndeterminate::DenyOrPermit),
            @"Indeterminate{DP}"
        );
    }

    #[test]
    fn test_effect_decision_mapping() {
        assert_eq!(Effect::Permit.decision(), Decision::Permit);
        assert_eq!(Effect::Deny.decision(), Decision::Deny);
        assert_eq!(
            Effect::Deny.indeterminate(),
            Decision::Indeterminate(ExtendedIndeterminate::Deny)
        );
        assert_eq!(Effect::Permit.opposite(), Effect::Deny);
    }

    #[test]
    fn test_effect_from_str() {
        assert_eq!(Effect::from_str("Permit").unwrap(), Effect::Permit);
        assert!(Effect::from_str("Maybe").is_err());
    }

    #[test]
    fn test_decision_serde_round_trip() {
        for decision in [
            Decision::Permit,
            Decision::Deny,
            Decision::NotApplicable,
            Decision::Indeterminate(ExtendedIndeterminate::Permit),
        ] {
            let json = serde_json::to_value(decision).unwrap();
            let back: Decision = serde_json::from_value(json).unwrap();
            assert_eq!(back, decision);
        }
    }
}
