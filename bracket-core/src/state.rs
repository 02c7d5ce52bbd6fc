//! The lifecycle of a tournament.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The lifecycle state of a [`Tournament`].
///
/// ```text
/// pending -> checking_in -> underway <-> awaiting_review -> complete
///    \__________________________/
/// ```
///
/// Every state except `pending` can be reset back to `pending`.
///
/// [`Tournament`]: crate::Tournament
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TournamentState {
    /// Participants can be added, removed and seeded.
    #[default]
    Pending,
    /// Participants confirm their attendance.
    CheckingIn,
    Underway,
    /// All matches are complete but the final ranks are not confirmed yet.
    AwaitingReview,
    Complete,
}

impl TournamentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CheckingIn => "checking_in",
            Self::Underway => "underway",
            Self::AwaitingReview => "awaiting_review",
            Self::Complete => "complete",
        }
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` if the participant list can no longer be changed.
    #[inline]
    pub fn participants_frozen(&self) -> bool {
        !matches!(self, Self::Pending | Self::CheckingIn)
    }

    /// Returns `true` if matches exist and can receive results.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Underway | Self::AwaitingReview)
    }

    /// `pending -> checking_in`
    pub fn open_check_in(self) -> Result<Self> {
        match self {
            Self::Pending => Ok(Self::CheckingIn),
            state => Err(invalid("open check-in", state)),
        }
    }

    /// `pending | checking_in -> underway`
    pub fn start(self) -> Result<Self> {
        match self {
            Self::Pending | Self::CheckingIn => Ok(Self::Underway),
            state => Err(invalid("start", state)),
        }
    }

    /// `underway -> awaiting_review`
    pub fn review(self) -> Result<Self> {
        match self {
            Self::Underway => Ok(Self::AwaitingReview),
            state => Err(invalid("review", state)),
        }
    }

    /// `awaiting_review -> underway`, after a result was reopened.
    pub fn resume(self) -> Result<Self> {
        match self {
            Self::AwaitingReview | Self::Underway => Ok(Self::Underway),
            state => Err(invalid("resume", state)),
        }
    }

    /// `underway | awaiting_review -> complete`
    pub fn complete(self) -> Result<Self> {
        match self {
            Self::Underway | Self::AwaitingReview => Ok(Self::Complete),
            state => Err(invalid("complete", state)),
        }
    }

    /// `* -> pending`
    pub fn reset(self) -> Result<Self> {
        match self {
            Self::Pending => Err(invalid("reset", self)),
            _ => Ok(Self::Pending),
        }
    }
}

fn invalid(action: &'static str, state: TournamentState) -> Error {
    Error::InvalidState { action, state }
}

impl Display for TournamentState {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown tournament state: {0:?}")]
pub struct ParseStateError(String);

impl FromStr for TournamentState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "checking_in" => Ok(Self::CheckingIn),
            "underway" => Ok(Self::Underway),
            "awaiting_review" => Ok(Self::AwaitingReview),
            "complete" => Ok(Self::Complete),
            _ => Err(ParseStateError(s.to_owned())),
        }
    }
}
