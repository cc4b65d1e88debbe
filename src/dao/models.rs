use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a survivor game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Accepting participants.
    Open,
    /// Running; joins are closed.
    Active,
    /// Finalized, optionally with a winner.
    Completed,
    /// Abandoned before it started.
    Cancelled,
}

impl GameStatus {
    /// Whether the status can still move forward.
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Cancelled)
    }
}

/// Status of a participant within a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Still alive in the pool.
    Active,
    /// Knocked out; see `eliminated_week` and `elimination_reason`.
    Eliminated,
}

/// Why a participant left the pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EliminationReason {
    /// A required pick lost.
    IncorrectPick,
    /// A required pick tied while ties eliminate.
    TiedPick,
    /// A required pick was never submitted before the week locked.
    MissingPick,
}

/// How a tied matchup is scored for the participants who picked either side.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// A tie counts as a loss for both teams' backers.
    #[default]
    Eliminate,
    /// A tie counts as a win for both teams' backers.
    Survive,
}

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Display name of the pool.
    pub name: String,
    /// Entry fee charged per participant, in cents.
    pub entry_fee_cents: u64,
    /// Total prize pool, in cents.
    pub prize_pool_cents: u64,
    /// Maximum number of participants.
    pub capacity: u32,
    /// Number of participants admitted so far.
    pub participant_count: u32,
    /// NFL season year the game is played in.
    pub season: u16,
    /// First week counted by the game (inclusive).
    pub start_week: u32,
    /// Last week counted by the game (inclusive).
    pub end_week: u32,
    /// First week where two picks are required.
    pub two_pick_week: u32,
    /// Scoring rule for tied matchups.
    pub tie_policy: TiePolicy,
    /// Lifecycle position of the game.
    pub status: GameStatus,
    /// Sole survivor once the game completed, if any.
    pub winner: Option<Uuid>,
    /// When the game was created.
    pub created_at: SystemTime,
    /// Last write, bumped together with `version`.
    pub updated_at: SystemTime,
    /// Set by the `open → active` transition.
    pub started_at: Option<SystemTime>,
    /// Set when the game completes or is cancelled.
    pub completed_at: Option<SystemTime>,
    /// Optimistic concurrency token, bumped by the store on every update.
    pub version: u64,
}

impl GameEntity {
    /// Number of picks each active participant owes for `week`.
    pub fn required_picks(&self, week: u32) -> u8 {
        if week >= self.two_pick_week { 2 } else { 1 }
    }

    /// Whether `week` falls inside the game's bounds.
    pub fn covers_week(&self, week: u32) -> bool {
        (self.start_week..=self.end_week).contains(&week)
    }
}

/// A player's seat in one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Primary key of the participant.
    pub id: Uuid,
    /// Game the seat belongs to.
    pub game_id: Uuid,
    /// Opaque identifier of the player owning this seat.
    pub player_id: String,
    /// Whether the participant is still alive.
    pub status: ParticipantStatus,
    /// Week that knocked the participant out.
    pub eliminated_week: Option<u32>,
    /// Why the participant was knocked out.
    pub elimination_reason: Option<EliminationReason>,
    /// When the seat was taken.
    pub joined_at: SystemTime,
    /// When the elimination was written.
    pub eliminated_at: Option<SystemTime>,
    /// Optimistic concurrency token, bumped by the store on every update.
    pub version: u64,
}

impl ParticipantEntity {
    /// Whether the participant can still submit picks.
    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }
}

/// A team chosen by a participant for one week slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PickEntity {
    /// Primary key of the pick.
    pub id: Uuid,
    /// Game the pick was made in.
    pub game_id: Uuid,
    /// Owner of the pick.
    pub participant_id: Uuid,
    /// Matchup the team plays in that week.
    pub matchup_id: String,
    /// Team code, upper case (e.g. `KC`).
    pub team_id: String,
    /// Week the pick counts for.
    pub week: u32,
    /// 1, or 2 from the two-pick week onward.
    pub slot: u8,
    /// `None` until the matchup is resolved.
    pub correct: Option<bool>,
    /// Last submission time; overwrites refresh it.
    pub submitted_at: SystemTime,
    /// When `correct` was written.
    pub resolved_at: Option<SystemTime>,
}

/// A scheduled NFL game as reported by the score feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchupEntity {
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
    /// Known once the matchup kicked off.
    pub home_score: Option<u32>,
    /// Known once the matchup kicked off.
    pub away_score: Option<u32>,
    /// Final whistle; scores no longer change.
    pub complete: bool,
    /// Kickoff. Picks on this matchup lock from then on.
    pub scheduled_start: SystemTime,
}

impl MatchupEntity {
    /// Whether `team` plays in this matchup.
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// Whether picks on this matchup are frozen at `now`.
    pub fn is_locked_at(&self, now: SystemTime) -> bool {
        self.complete || now >= self.scheduled_start
    }
}
