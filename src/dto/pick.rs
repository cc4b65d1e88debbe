use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::PickEntity,
    dto::{
        format_system_time,
        validation::{validate_player_id, validate_team_code},
    },
    services::{pick_validator::PickSubmission, team_ledger::TeamUsage},
};

/// Request to pick a team for one slot of a week.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitPickRequest {
    /// Player submitting the pick.
    pub player_id: String,
    /// Week the pick counts for.
    pub week: u32,
    /// Team code, case-insensitive (e.g. `KC`).
    pub team_id: String,
    /// Matchup the team plays in.
    pub matchup_id: String,
    /// 1, or 2 from the two-pick week onward.
    #[serde(default = "default_slot")]
    pub slot: u8,
}

fn default_slot() -> u8 {
    1
}

impl Validate for SubmitPickRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_player_id(&self.player_id) {
            errors.add("player_id", e);
        }
        if let Err(e) = validate_team_code(&self.team_id) {
            errors.add("team_id", e);
        }
        if self.matchup_id.trim().is_empty() {
            errors.add("matchup_id", validator::ValidationError::new("required"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl SubmitPickRequest {
    /// Submission for `game_id`, taken from the path.
    pub fn into_submission(self, game_id: Uuid) -> PickSubmission {
        PickSubmission {
            game_id,
            player_id: self.player_id,
            week: self.week,
            team_id: self.team_id,
            matchup_id: self.matchup_id,
            slot: self.slot,
        }
    }
}

/// Public projection of a stored pick.
#[derive(Debug, Serialize, ToSchema)]
pub struct PickView {
    /// Pick id.
    pub id: Uuid,
    /// Owner of the pick.
    pub participant_id: Uuid,
    /// Week the pick counts for.
    pub week: u32,
    /// Slot within the week.
    pub slot: u8,
    /// Team code.
    pub team_id: String,
    /// Matchup the team plays in.
    pub matchup_id: String,
    /// Absent until the matchup is resolved.
    pub correct: Option<bool>,
    /// Last submission, RFC 3339.
    pub submitted_at: String,
}

impl From<PickEntity> for PickView {
    fn from(pick: PickEntity) -> Self {
        Self {
            id: pick.id,
            participant_id: pick.participant_id,
            week: pick.week,
            slot: pick.slot,
            team_id: pick.team_id,
            matchup_id: pick.matchup_id,
            correct: pick.correct,
            submitted_at: format_system_time(pick.submitted_at),
        }
    }
}

/// A team already spent by a participant.
#[derive(Debug, Serialize, ToSchema)]
pub struct TeamUsageView {
    /// Spent team code.
    pub team_id: String,
    /// Week it was spent in.
    pub week: u32,
    /// Slot it was spent in.
    pub slot: u8,
    /// Matchup of that pick.
    pub matchup_id: String,
    /// Outcome, once resolved.
    pub correct: Option<bool>,
}

impl From<TeamUsage> for TeamUsageView {
    fn from(usage: TeamUsage) -> Self {
        Self {
            team_id: usage.team_id,
            week: usage.week,
            slot: usage.slot,
            matchup_id: usage.matchup_id,
            correct: usage.correct,
        }
    }
}
