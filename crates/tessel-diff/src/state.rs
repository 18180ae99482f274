//! Member optionality states and the transitions allowed between them.

use std::fmt;

use serde::{Deserialize, Serialize};
use tessel_core::traits::ids;
use tessel_core::{Model, Shape};
use tessel_resolve::NullabilityRecord;

/// The four optionality states a structure member can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberState {
    /// Neither required nor defaulted.
    Optional,
    /// `@required` without a default.
    Required,
    /// Has an effective default, whether or not it is also required.
    Defaulted,
    /// `@required` and `@clientOptional`: required for servers, optional for
    /// clients.
    ClientOptionalRequired,
}

impl MemberState {
    /// Classify a structure member of `model`.
    pub fn of(model: &Model, member: &Shape) -> Self {
        let has_default = NullabilityRecord::resolve(model, member).is_some_and(|r| r.has_default);
        let required = member.has_trait(&ids::required());
        if has_default {
            MemberState::Defaulted
        } else if required && member.has_trait(&ids::client_optional()) {
            MemberState::ClientOptionalRequired
        } else if required {
            MemberState::Required
        } else {
            MemberState::Optional
        }
    }

    /// Transitions that are always backward compatible. Anything else either
    /// depends on context or is a violation.
    pub fn valid_transitions(&self) -> &'static [MemberState] {
        use MemberState::*;
        match self {
            Optional => &[ClientOptionalRequired],
            Required => &[Defaulted, ClientOptionalRequired],
            Defaulted => &[],
            ClientOptionalRequired => &[Optional, Defaulted],
        }
    }

    pub fn can_transition_to(&self, target: MemberState) -> bool {
        *self == target || self.valid_transitions().contains(&target)
    }
}

impl fmt::Display for MemberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberState::Optional => write!(f, "optional"),
            MemberState::Required => write!(f, "required"),
            MemberState::Defaulted => write!(f, "defaulted"),
            MemberState::ClientOptionalRequired => write!(f, "required (client optional)"),
        }
    }
}
