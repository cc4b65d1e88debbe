use std::sync::Arc;

use uuid::Uuid;

use crate::{
    dao::{
        models::{GameEntity, MatchupEntity, ParticipantEntity, PickEntity, TiePolicy},
        survivor_store::SurvivorStore,
    },
    error::ServiceError,
    services::{
        elimination::EliminationTracker,
        lifecycle::{GameLifecycle, GameSettings, StandingEntry},
        notifications::NotificationSink,
        pick_validator::{PickSubmission, PickValidator, normalize_team},
        result_processor::{WeekReport, WeeklyResultProcessor},
        retry::RetryPolicy,
        team_ledger::TeamUsage,
    },
    state::clock::Clock,
};

/// Collaborators needed to assemble a [`SurvivorCore`].
pub struct CoreDeps {
    /// Store shared by every component.
    pub store: Arc<dyn SurvivorStore>,
    /// Receives elimination and completion alerts.
    pub notifier: Arc<dyn NotificationSink>,
    /// Time used for locks and timestamps.
    pub clock: Arc<dyn Clock>,
    /// Budget for lost compare-and-swap races.
    pub retry: RetryPolicy,
    /// Tie rule for games created without one.
    pub default_tie_policy: TiePolicy,
}

/// The survivor pool engine: lifecycle, picks, result processing and eliminations wired to one
/// store.
#[derive(Clone)]
pub struct SurvivorCore {
    /// Game status and seats.
    pub lifecycle: GameLifecycle,
    /// Pick submission.
    pub picks: PickValidator,
    /// Eliminations and the finalization they trigger.
    pub eliminations: EliminationTracker,
    /// Weekly processing.
    pub results: WeeklyResultProcessor,
    store: Arc<dyn SurvivorStore>,
}

impl SurvivorCore {
    /// Wire every component to `deps.store`.
    pub fn new(deps: CoreDeps) -> Self {
        let CoreDeps {
            store,
            notifier,
            clock,
            retry,
            default_tie_policy,
        } = deps;

        let lifecycle = GameLifecycle::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            retry,
            default_tie_policy,
        );
        let eliminations = EliminationTracker::new(
            store.clone(),
            notifier,
            clock.clone(),
            retry,
            lifecycle.clone(),
        );
        let results = WeeklyResultProcessor::new(
            store.clone(),
            clock.clone(),
            lifecycle.clone(),
            eliminations.clone(),
        );
        let picks = PickValidator::new(store.clone(), clock);

        Self {
            lifecycle,
            picks,
            eliminations,
            results,
            store,
        }
    }

    /// See [`GameLifecycle::create_game`].
    pub async fn create_game(&self, settings: GameSettings) -> Result<GameEntity, ServiceError> {
        self.lifecycle.create_game(settings).await
    }

    /// See [`GameLifecycle::join_game`].
    pub async fn join_game(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<ParticipantEntity, ServiceError> {
        self.lifecycle.join_game(game_id, player_id).await
    }

    /// See [`GameLifecycle::start_game`].
    pub async fn start_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.lifecycle.start_game(game_id).await
    }

    /// See [`GameLifecycle::cancel_game`].
    pub async fn cancel_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.lifecycle.cancel_game(game_id).await
    }

    /// See [`PickValidator::submit_pick`].
    pub async fn submit_pick(&self, submission: PickSubmission) -> Result<PickEntity, ServiceError> {
        self.picks.submit_pick(submission).await
    }

    /// See [`WeeklyResultProcessor::process_week`].
    pub async fn process_week(&self, game_id: Uuid, week: u32) -> Result<WeekReport, ServiceError> {
        self.results.process_week(game_id, week).await
    }

    /// Game by id.
    pub async fn get_game(&self, game_id: Uuid) -> Result<GameEntity, ServiceError> {
        self.lifecycle.get_game(game_id).await
    }

    /// Every game.
    pub async fn list_games(&self) -> Result<Vec<GameEntity>, ServiceError> {
        self.lifecycle.list_games().await
    }

    /// Seats of a game in join order.
    pub async fn list_participants(
        &self,
        game_id: Uuid,
    ) -> Result<Vec<ParticipantEntity>, ServiceError> {
        self.lifecycle.list_participants(game_id).await
    }

    /// Game and its ordered leaderboard.
    pub async fn standings(
        &self,
        game_id: Uuid,
    ) -> Result<(GameEntity, Vec<StandingEntry>), ServiceError> {
        self.lifecycle.standings(game_id).await
    }

    /// Picks of one player, by week then slot.
    pub async fn picks_for_player(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<Vec<PickEntity>, ServiceError> {
        self.picks.picks_for_player(game_id, player_id).await
    }

    /// Teams spent by one player.
    pub async fn team_usage(
        &self,
        game_id: Uuid,
        player_id: &str,
    ) -> Result<Vec<TeamUsage>, ServiceError> {
        self.picks.team_usage(game_id, player_id).await
    }

    /// Store matchups as reported by a score feed or an operator, normalising team codes.
    pub async fn save_matchups(&self, matchups: Vec<MatchupEntity>) -> Result<usize, ServiceError> {
        let count = matchups.len();
        for mut matchup in matchups {
            if matchup.id.trim().is_empty() || matchup.week == 0 {
                return Err(ServiceError::InvalidInput(
                    "matchup needs an id and a week".into(),
                ));
            }
            matchup.home_team = normalize_team(&matchup.home_team);
            matchup.away_team = normalize_team(&matchup.away_team);
            if matchup.home_team == matchup.away_team {
                return Err(ServiceError::InvalidInput(format!(
                    "matchup `{}` lists {} on both sides",
                    matchup.id, matchup.home_team
                )));
            }
            self.store.save_matchup(matchup).await?;
        }
        Ok(count)
    }

    /// Stored matchups of a season week.
    pub async fn list_matchups(
        &self,
        season: u16,
        week: u32,
    ) -> Result<Vec<MatchupEntity>, ServiceError> {
        Ok(self.store.list_matchups(season, week).await?)
    }
}
