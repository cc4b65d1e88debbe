use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    EliminationReason, GameEntity, GameStatus, MatchupEntity, ParticipantEntity,
    ParticipantStatus, PickEntity, TiePolicy,
};

use super::error::MongoDaoError;

// Identifiers are stored as hyphenated strings so ad-hoc queries stay readable.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    entry_fee_cents: i64,
    prize_pool_cents: i64,
    capacity: u32,
    participant_count: u32,
    season: u16,
    start_week: u32,
    end_week: u32,
    two_pick_week: u32,
    #[serde(default)]
    tie_policy: TiePolicy,
    status: GameStatus,
    winner: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
    started_at: Option<DateTime>,
    completed_at: Option<DateTime>,
    version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: String,
    player_id: String,
    status: ParticipantStatus,
    eliminated_week: Option<u32>,
    elimination_reason: Option<EliminationReason>,
    joined_at: DateTime,
    eliminated_at: Option<DateTime>,
    version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPickDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: String,
    participant_id: String,
    matchup_id: String,
    team_id: String,
    week: u32,
    slot: u8,
    correct: Option<bool>,
    submitted_at: DateTime,
    resolved_at: Option<DateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchupDocument {
    #[serde(rename = "_id")]
    id: String,
    season: u16,
    week: u32,
    home_team: String,
    away_team: String,
    home_score: Option<u32>,
    away_score: Option<u32>,
    complete: bool,
    scheduled_start: DateTime,
}

impl MongoPickDocument {
    pub fn id(&self) -> &str {
        &self.id
    }
}

pub fn doc_id(id: impl ToString) -> Document {
    doc! {"_id": id.to_string()}
}

/// Storage representation of an optimistic concurrency token.
pub fn stored_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn stored_cents(cents: u64) -> i64 {
    i64::try_from(cents).unwrap_or(i64::MAX)
}

fn parse_uuid(collection: &'static str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|err| MongoDaoError::CorruptDocument {
        collection,
        id: raw.to_owned(),
        detail: err.to_string(),
    })
}

fn non_negative(collection: &'static str, id: &str, value: i64) -> Result<u64, MongoDaoError> {
    u64::try_from(value).map_err(|_| MongoDaoError::CorruptDocument {
        collection,
        id: id.to_owned(),
        detail: format!("negative value {value}"),
    })
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            entry_fee_cents: stored_cents(value.entry_fee_cents),
            prize_pool_cents: stored_cents(value.prize_pool_cents),
            capacity: value.capacity,
            participant_count: value.participant_count,
            season: value.season,
            start_week: value.start_week,
            end_week: value.end_week,
            two_pick_week: value.two_pick_week,
            tie_policy: value.tie_policy,
            status: value.status,
            winner: value.winner.map(|id| id.to_string()),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            completed_at: value.completed_at.map(DateTime::from_system_time),
            version: stored_version(value.version),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        const COLLECTION: &str = "games";
        Ok(Self {
            id: parse_uuid(COLLECTION, &value.id)?,
            entry_fee_cents: non_negative(COLLECTION, &value.id, value.entry_fee_cents)?,
            prize_pool_cents: non_negative(COLLECTION, &value.id, value.prize_pool_cents)?,
            version: non_negative(COLLECTION, &value.id, value.version)?,
            winner: value
                .winner
                .as_deref()
                .map(|raw| parse_uuid(COLLECTION, raw))
                .transpose()?,
            name: value.name,
            capacity: value.capacity,
            participant_count: value.participant_count,
            season: value.season,
            start_week: value.start_week,
            end_week: value.end_week,
            two_pick_week: value.two_pick_week,
            tie_policy: value.tie_policy,
            status: value.status,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
            started_at: value.started_at.map(DateTime::to_system_time),
            completed_at: value.completed_at.map(DateTime::to_system_time),
        })
    }
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id.to_string(),
            player_id: value.player_id,
            status: value.status,
            eliminated_week: value.eliminated_week,
            elimination_reason: value.elimination_reason,
            joined_at: DateTime::from_system_time(value.joined_at),
            eliminated_at: value.eliminated_at.map(DateTime::from_system_time),
            version: stored_version(value.version),
        }
    }
}

impl TryFrom<MongoParticipantDocument> for ParticipantEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoParticipantDocument) -> Result<Self, Self::Error> {
        const COLLECTION: &str = "participants";
        Ok(Self {
            id: parse_uuid(COLLECTION, &value.id)?,
            game_id: parse_uuid(COLLECTION, &value.game_id)?,
            version: non_negative(COLLECTION, &value.id, value.version)?,
            player_id: value.player_id,
            status: value.status,
            eliminated_week: value.eliminated_week,
            elimination_reason: value.elimination_reason,
            joined_at: value.joined_at.to_system_time(),
            eliminated_at: value.eliminated_at.map(DateTime::to_system_time),
        })
    }
}

impl From<PickEntity> for MongoPickDocument {
    fn from(value: PickEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id.to_string(),
            participant_id: value.participant_id.to_string(),
            matchup_id: value.matchup_id,
            team_id: value.team_id,
            week: value.week,
            slot: value.slot,
            correct: value.correct,
            submitted_at: DateTime::from_system_time(value.submitted_at),
            resolved_at: value.resolved_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoPickDocument> for PickEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPickDocument) -> Result<Self, Self::Error> {
        const COLLECTION: &str = "picks";
        Ok(Self {
            id: parse_uuid(COLLECTION, &value.id)?,
            game_id: parse_uuid(COLLECTION, &value.game_id)?,
            participant_id: parse_uuid(COLLECTION, &value.participant_id)?,
            matchup_id: value.matchup_id,
            team_id: value.team_id,
            week: value.week,
            slot: value.slot,
            correct: value.correct,
            submitted_at: value.submitted_at.to_system_time(),
            resolved_at: value.resolved_at.map(DateTime::to_system_time),
        })
    }
}

impl From<MatchupEntity> for MongoMatchupDocument {
    fn from(value: MatchupEntity) -> Self {
        Self {
            id: value.id,
            season: value.season,
            week: value.week,
            home_team: value.home_team,
            away_team: value.away_team,
            home_score: value.home_score,
            away_score: value.away_score,
            complete: value.complete,
            scheduled_start: DateTime::from_system_time(value.scheduled_start),
        }
    }
}

impl From<MongoMatchupDocument> for MatchupEntity {
    fn from(value: MongoMatchupDocument) -> Self {
        Self {
            id: value.id,
            season: value.season,
            week: value.week,
            home_team: value.home_team,
            away_team: value.away_team,
            home_score: value.home_score,
            away_score: value.away_score,
            complete: value.complete,
            scheduled_start: value.scheduled_start.to_system_time(),
        }
    }
}
