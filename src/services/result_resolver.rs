use serde::Serialize;
use thiserror::Error;

use crate::dao::models::{EliminationReason, MatchupEntity, TiePolicy};

/// Final result of a matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Home team scored more.
    HomeWin,
    /// Away team scored more.
    AwayWin,
    /// Equal final scores.
    Tie,
}

/// Outcome of a completed matchup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Which side won, or a tie.
    pub outcome: Outcome,
    /// `None` on a tie.
    pub winning_team: Option<String>,
}

impl Resolution {
    /// Whether a pick on `team` counts as correct under `policy`.
    pub fn is_correct_for(&self, team: &str, policy: TiePolicy) -> bool {
        match self.outcome {
            Outcome::Tie => policy == TiePolicy::Survive,
            Outcome::HomeWin | Outcome::AwayWin => self.winning_team.as_deref() == Some(team),
        }
    }

    /// Reason recorded when a pick on this matchup eliminates its owner.
    pub fn elimination_reason(&self) -> EliminationReason {
        match self.outcome {
            Outcome::Tie => EliminationReason::TiedPick,
            Outcome::HomeWin | Outcome::AwayWin => EliminationReason::IncorrectPick,
        }
    }
}

/// Why a matchup cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The matchup is still being played.
    #[error("matchup `{0}` is not complete")]
    NotComplete(String),
    /// Marked complete without both scores.
    #[error("matchup `{0}` is complete but has no final score")]
    MissingScore(String),
}

/// Decide the outcome of a completed matchup.
pub fn resolve(matchup: &MatchupEntity) -> Result<Resolution, ResolveError> {
    if !matchup.complete {
        return Err(ResolveError::NotComplete(matchup.id.clone()));
    }
    let (Some(home), Some(away)) = (matchup.home_score, matchup.away_score) else {
        return Err(ResolveError::MissingScore(matchup.id.clone()));
    };

    let resolution = match home.cmp(&away) {
        std::cmp::Ordering::Greater => Resolution {
            outcome: Outcome::HomeWin,
            winning_team: Some(matchup.home_team.clone()),
        },
        std::cmp::Ordering::Less => Resolution {
            outcome: Outcome::AwayWin,
            winning_team: Some(matchup.away_team.clone()),
        },
        std::cmp::Ordering::Equal => Resolution {
            outcome: Outcome::Tie,
            winning_team: None,
        },
    };
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn matchup(home: Option<u32>, away: Option<u32>, complete: bool) -> MatchupEntity {
        MatchupEntity {
            id: "2024-w1-kc-den".into(),
            season: 2024,
            week: 1,
            home_team: "DEN".into(),
            away_team: "KC".into(),
            home_score: home,
            away_score: away,
            complete,
            scheduled_start: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn away_win_picks_the_away_team() {
        let resolution = resolve(&matchup(Some(20), Some(27), true)).expect("resolves");
        assert_eq!(resolution.outcome, Outcome::AwayWin);
        assert!(resolution.is_correct_for("KC", TiePolicy::Eliminate));
        assert!(!resolution.is_correct_for("DEN", TiePolicy::Eliminate));
        assert_eq!(
            resolution.elimination_reason(),
            EliminationReason::IncorrectPick
        );
    }

    #[test]
    fn tie_is_its_own_outcome_and_follows_policy() {
        let resolution = resolve(&matchup(Some(17), Some(17), true)).expect("resolves");
        assert_eq!(resolution.outcome, Outcome::Tie);
        assert_eq!(resolution.winning_team, None);

        for team in ["KC", "DEN"] {
            assert!(!resolution.is_correct_for(team, TiePolicy::Eliminate));
            assert!(resolution.is_correct_for(team, TiePolicy::Survive));
        }
        assert_eq!(resolution.elimination_reason(), EliminationReason::TiedPick);
    }

    #[test]
    fn incomplete_or_scoreless_matchups_do_not_resolve() {
        assert_eq!(
            resolve(&matchup(Some(3), Some(0), false)),
            Err(ResolveError::NotComplete("2024-w1-kc-den".into()))
        );
        assert_eq!(
            resolve(&matchup(None, Some(0), true)),
            Err(ResolveError::MissingScore("2024-w1-kc-den".into()))
        );
    }
}
