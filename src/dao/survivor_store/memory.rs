//! Process-local [`SurvivorStore`] used for tests and `STORAGE_BACKEND=memory`.

use std::{collections::HashMap, sync::Arc, time::SystemTime};

use dashmap::DashMap;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{GameEntity, MatchupEntity, ParticipantEntity, PickEntity},
    storage::{StorageError, StorageResult},
    survivor_store::SurvivorStore,
};

/// Process-local store for tests and `STORAGE_BACKEND=memory`. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemorySurvivorStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: RwLock<Tables>,
    matchups: DashMap<String, MatchupEntity>,
}

#[derive(Default)]
struct Tables {
    games: HashMap<Uuid, GameEntity>,
    participants: IndexMap<Uuid, ParticipantEntity>,
    picks: IndexMap<Uuid, PickEntity>,
}

impl InMemorySurvivorStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_game(&self, game: GameEntity) -> StorageResult<()> {
        let mut tables = self.inner.tables.write().await;
        if tables.games.contains_key(&game.id) {
            return Err(StorageError::duplicate("game", game.id.to_string()));
        }
        tables.games.insert(game.id, game);
        Ok(())
    }

    async fn update_game(&self, mut game: GameEntity) -> StorageResult<GameEntity> {
        let mut tables = self.inner.tables.write().await;
        let Some(stored) = tables.games.get_mut(&game.id) else {
            return Err(StorageError::conflict("game", game.id));
        };
        if stored.version != game.version {
            return Err(StorageError::conflict("game", game.id));
        }
        game.version += 1;
        *stored = game.clone();
        Ok(game)
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> StorageResult<()> {
        let mut tables = self.inner.tables.write().await;
        let taken = tables
            .participants
            .values()
            .any(|p| p.game_id == participant.game_id && p.player_id == participant.player_id);
        if taken {
            return Err(StorageError::duplicate(
                "participant",
                format!("{}/{}", participant.game_id, participant.player_id),
            ));
        }
        tables.participants.insert(participant.id, participant);
        Ok(())
    }

    async fn update_participant(
        &self,
        mut participant: ParticipantEntity,
    ) -> StorageResult<ParticipantEntity> {
        let mut tables = self.inner.tables.write().await;
        let Some(stored) = tables.participants.get_mut(&participant.id) else {
            return Err(StorageError::conflict("participant", participant.id));
        };
        if stored.version != participant.version {
            return Err(StorageError::conflict("participant", participant.id));
        }
        participant.version += 1;
        *stored = participant.clone();
        Ok(participant)
    }

    async fn upsert_pick(&self, mut pick: PickEntity) -> StorageResult<PickEntity> {
        let mut tables = self.inner.tables.write().await;

        let mut existing_id = None;
        for stored in tables.picks.values() {
            if stored.participant_id != pick.participant_id {
                continue;
            }
            let same_slot = stored.week == pick.week && stored.slot == pick.slot;
            if same_slot {
                existing_id = Some(stored.id);
            } else if stored.team_id == pick.team_id {
                return Err(StorageError::duplicate(
                    "pick",
                    format!("{}/{}", pick.participant_id, pick.team_id),
                ));
            }
        }

        if let Some(id) = existing_id {
            pick.id = id;
        }
        tables.picks.insert(pick.id, pick.clone());
        Ok(pick)
    }

    async fn resolve_pick(
        &self,
        pick_id: Uuid,
        correct: bool,
        resolved_at: SystemTime,
    ) -> StorageResult<bool> {
        let mut tables = self.inner.tables.write().await;
        match tables.picks.get_mut(&pick_id) {
            Some(pick) if pick.correct.is_none() => {
                pick.correct = Some(correct);
                pick.resolved_at = Some(resolved_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl SurvivorStore for InMemorySurvivorStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables.games.get(&id).cloned())
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            let mut games: Vec<GameEntity> = tables.games.values().cloned().collect();
            games.sort_by_key(|game| game.created_at);
            Ok(games)
        })
    }

    fn update_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move { store.update_game(game).await })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_participant(participant).await })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables.participants.get(&id).cloned())
        })
    }

    fn find_participant_by_player(
        &self,
        game_id: Uuid,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables
                .participants
                .values()
                .find(|p| p.game_id == game_id && p.player_id == player_id)
                .cloned())
        })
    }

    fn list_participants(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables
                .participants
                .values()
                .filter(|p| p.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn update_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<ParticipantEntity>> {
        let store = self.clone();
        Box::pin(async move { store.update_participant(participant).await })
    }

    fn upsert_pick(&self, pick: PickEntity) -> BoxFuture<'static, StorageResult<PickEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_pick(pick).await })
    }

    fn list_picks_for_participant(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PickEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables
                .picks
                .values()
                .filter(|pick| pick.participant_id == participant_id)
                .cloned()
                .collect())
        })
    }

    fn list_picks_for_week(
        &self,
        game_id: Uuid,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<PickEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.inner.tables.read().await;
            Ok(tables
                .picks
                .values()
                .filter(|pick| pick.game_id == game_id && pick.week == week)
                .cloned()
                .collect())
        })
    }

    fn resolve_pick(
        &self,
        pick_id: Uuid,
        correct: bool,
        resolved_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.resolve_pick(pick_id, correct, resolved_at).await })
    }

    fn save_matchup(&self, matchup: MatchupEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.matchups.insert(matchup.id.clone(), matchup);
            Ok(())
        })
    }

    fn find_matchup(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchupEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.matchups.get(&id).map(|entry| entry.value().clone())) })
    }

    fn list_matchups(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchupEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut matchups: Vec<MatchupEntity> = store
                .inner
                .matchups
                .iter()
                .filter(|entry| entry.season == season && entry.week == week)
                .map(|entry| entry.value().clone())
                .collect();
            matchups.sort_by(|a, b| {
                a.scheduled_start
                    .cmp(&b.scheduled_start)
                    .then_with(|| a.id.cmp(&b.id))
            });
            Ok(matchups)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
