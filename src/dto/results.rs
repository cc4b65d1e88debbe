use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dao::models::MatchupEntity,
    dto::{format_system_time, validation::validate_team_code},
    error::InvariantViolation,
    services::result_processor::WeekReport,
};

/// Matchup as submitted by an operator for manual ingest.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchupInput {
    /// Feed identifier, stable across updates.
    pub id: String,
    /// NFL season year.
    pub season: u16,
    /// Week of the season.
    pub week: u32,
    /// Home team code.
    pub home_team: String,
    /// Away team code.
    pub away_team: String,
    /// Home score, once known.
    #[serde(default)]
    pub home_score: Option<u32>,
    /// Away score, once known.
    #[serde(default)]
    pub away_score: Option<u32>,
    /// Whether the score is final.
    #[serde(default)]
    pub complete: bool,
    /// RFC 3339 kickoff time.
    pub scheduled_start: String,
}

impl Validate for MatchupInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.id.trim().is_empty() {
            errors.add("id", ValidationError::new("required"));
        }
        if self.week == 0 {
            errors.add("week", ValidationError::new("range"));
        }
        if let Err(e) = validate_team_code(&self.home_team) {
            errors.add("home_team", e);
        }
        if let Err(e) = validate_team_code(&self.away_team) {
            errors.add("away_team", e);
        }
        if self.complete && (self.home_score.is_none() || self.away_score.is_none()) {
            let mut err = ValidationError::new("scores_required");
            err.message = Some("A complete matchup needs both scores".into());
            errors.add("complete", err);
        }
        if OffsetDateTime::parse(&self.scheduled_start, &Rfc3339).is_err() {
            errors.add("scheduled_start", ValidationError::new("rfc3339"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl TryFrom<MatchupInput> for MatchupEntity {
    type Error = String;

    fn try_from(input: MatchupInput) -> Result<Self, Self::Error> {
        let start = OffsetDateTime::parse(&input.scheduled_start, &Rfc3339)
            .map_err(|err| format!("invalid scheduled_start `{}`: {err}", input.scheduled_start))?;
        Ok(MatchupEntity {
            id: input.id.trim().to_owned(),
            season: input.season,
            week: input.week,
            home_team: input.home_team,
            away_team: input.away_team,
            home_score: input.home_score,
            away_score: input.away_score,
            complete: input.complete,
            scheduled_start: SystemTime::from(start),
        })
    }
}

/// Batch of matchups for `PUT /matchups`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchupBatch {
    /// At least one matchup.
    pub matchups: Vec<MatchupInput>,
}

impl Validate for MatchupBatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.matchups.is_empty() {
            errors.add("matchups", ValidationError::new("length"));
        }
        for matchup in &self.matchups {
            if let Err(matchup_errors) = matchup.validate() {
                errors.merge_self("matchups", Err(matchup_errors));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Number of matchups stored by an ingest.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Matchups written.
    pub saved: usize,
}

/// Public projection of a stored matchup.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchupView {
    /// Feed identifier, stable across updates.
    pub id: String,
    /// NFL season year.
    pub season: u16,
    /// Week of the season.
    pub week: u32,
    /// Home team code.
    pub home_team: String,
    /// Away team code.
    pub away_team: String,
    /// Home score, once known.
    pub home_score: Option<u32>,
    /// Away score, once known.
    pub away_score: Option<u32>,
    /// Whether the score is final.
    pub complete: bool,
    /// Kickoff, RFC 3339.
    pub scheduled_start: String,
}

impl From<MatchupEntity> for MatchupView {
    fn from(matchup: MatchupEntity) -> Self {
        Self {
            id: matchup.id,
            season: matchup.season,
            week: matchup.week,
            home_team: matchup.home_team,
            away_team: matchup.away_team,
            home_score: matchup.home_score,
            away_score: matchup.away_score,
            complete: matchup.complete,
            scheduled_start: format_system_time(matchup.scheduled_start),
        }
    }
}

/// Inconsistent stored data found while processing a week.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvariantView {
    /// Participant whose records are inconsistent.
    pub participant_id: Uuid,
    /// Week being processed.
    pub week: u32,
    /// What was found.
    pub detail: String,
}

impl From<InvariantViolation> for InvariantView {
    fn from(violation: InvariantViolation) -> Self {
        Self {
            participant_id: violation.participant_id,
            week: violation.week,
            detail: violation.detail,
        }
    }
}

/// Outcome of `POST /games/{id}/weeks/{week}/process`.
#[derive(Debug, Serialize, ToSchema)]
pub struct WeekReportView {
    /// Processed game.
    pub game_id: Uuid,
    /// Processed week.
    pub week: u32,
    /// Picks scored by this run.
    pub picks_resolved: u32,
    /// Participants eliminated by this run.
    pub participants_eliminated: Vec<Uuid>,
    /// Participants left unevaluated; a later run retries them.
    pub skipped: Vec<Uuid>,
    /// Participants waiting on unfinished matchups.
    pub pending: Vec<Uuid>,
    /// Inconsistent records found. The affected participants are left untouched.
    pub invariant_violations: Vec<InvariantView>,
    /// Whether the game is completed after the run.
    pub game_completed: bool,
    /// Sole survivor, once the game completed with one.
    pub winner: Option<Uuid>,
}

impl From<WeekReport> for WeekReportView {
    fn from(report: WeekReport) -> Self {
        Self {
            game_id: report.game_id,
            week: report.week,
            picks_resolved: report.picks_resolved,
            participants_eliminated: report.participants_eliminated,
            skipped: report.skipped,
            pending: report.pending,
            invariant_violations: report
                .invariant_violations
                .into_iter()
                .map(InvariantView::from)
                .collect(),
            game_completed: report.game_completed,
            winner: report.winner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(complete: bool, home_score: Option<u32>) -> MatchupInput {
        MatchupInput {
            id: "kc-den".into(),
            season: 2024,
            week: 1,
            home_team: "DEN".into(),
            away_team: "KC".into(),
            home_score,
            away_score: Some(27),
            complete,
            scheduled_start: "2024-09-08T20:25:00Z".into(),
        }
    }

    #[test]
    fn complete_matchup_requires_scores() {
        assert!(input(true, None).validate().is_err());
        assert!(input(true, Some(20)).validate().is_ok());
        assert!(input(false, None).validate().is_ok());
    }

    #[test]
    fn input_converts_kickoff_time() {
        let matchup = MatchupEntity::try_from(input(true, Some(20))).expect("valid input");
        assert_eq!(
            format_system_time(matchup.scheduled_start),
            "2024-09-08T20:25:00Z"
        );
    }
}
