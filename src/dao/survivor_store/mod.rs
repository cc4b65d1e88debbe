pub mod memory;
/// MongoDB backend, behind the `mongo-store` feature.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use std::time::SystemTime;

use crate::dao::models::{GameEntity, MatchupEntity, ParticipantEntity, PickEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games, participants, picks and matchups.
/// Matchup by feed id.
/// Entities carrying a `version` are updated with compare-and-swap semantics: the
/// write succeeds only when the stored version equals the submitted one, and the
/// store returns the entity with its bumped version. A lost race surfaces as
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict).
pub trait SurvivorStore: Send + Sync {
    /// Insert a new game.
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Every game, oldest first.
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Replace a game, guarded by its `version`.
    fn update_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<GameEntity>>;

    /// Insert a participant, rejecting a second seat for the same (game, player).
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Participant by id.
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Seat held by `player_id` in the game, if any.
    fn find_participant_by_player(
        &self,
        game_id: Uuid,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Participants of a game in join order.
    fn list_participants(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Replace a participant, guarded by its `version`.
    fn update_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<ParticipantEntity>>;

    /// Insert or overwrite the pick stored for (participant, week, slot).
    /// Matchup by feed id.
    /// An overwrite keeps the existing pick id. Fails with `Duplicate` when another
    /// pick of the same participant already holds the team.
    fn upsert_pick(&self, pick: PickEntity) -> BoxFuture<'static, StorageResult<PickEntity>>;
    /// Every pick of one participant, all weeks.
    fn list_picks_for_participant(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PickEntity>>>;
    /// Every pick of a game for one week.
    fn list_picks_for_week(
        &self,
        game_id: Uuid,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<PickEntity>>>;
    /// Record the outcome of a pick only if it is still unresolved.
    /// Matchup by feed id.
    /// Returns `true` when this call set the value.
    fn resolve_pick(
        &self,
        pick_id: Uuid,
        correct: bool,
        resolved_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert or replace a matchup by id.
    fn save_matchup(&self, matchup: MatchupEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Matchup by feed id.
    fn find_matchup(&self, id: String)
    -> BoxFuture<'static, StorageResult<Option<MatchupEntity>>>;
    /// Matchups of a season week.
    fn list_matchups(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchupEntity>>>;

    /// Cheap round trip to the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
