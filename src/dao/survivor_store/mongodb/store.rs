use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::{PingBudget, establish_connection},
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGameDocument, MongoMatchupDocument, MongoParticipantDocument, MongoPickDocument,
        doc_id, stored_version,
    },
};
use crate::dao::{
    models::{GameEntity, MatchupEntity, ParticipantEntity, PickEntity},
    storage::{StorageError, StorageResult},
    survivor_store::SurvivorStore,
};

const GAME_COLLECTION_NAME: &str = "games";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const PICK_COLLECTION_NAME: &str = "picks";
const MATCHUP_COLLECTION_NAME: &str = "matchups";

const PARTICIPANT_PLAYER_INDEX: &str = "participant_player_idx";
const PICK_SLOT_INDEX: &str = "pick_slot_idx";
const PICK_TEAM_INDEX: &str = "pick_team_idx";
const PICK_WEEK_INDEX: &str = "pick_week_idx";
const MATCHUP_WEEK_INDEX: &str = "matchup_week_idx";

const DUPLICATE_KEY_CODE: i32 = 11000;

/// [`SurvivorStore`] backed by the `games`, `participants`, `picks` and `matchups`
/// collections.
#[derive(Clone)]
pub struct MongoSurvivorStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = establish_connection(
            &self.config.options,
            &self.config.database_name,
            PingBudget::Reconnect,
        )
        .await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// Message of a duplicate-key write error, if `err` is one.
fn duplicate_key_message(err: &MongoError) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            Some(write_error.message.as_str())
        }
        _ => None,
    }
}

impl MongoSurvivorStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name, PingBudget::Startup)
                .await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let indexes: [(&'static str, &'static str, Document, bool); 5] = [
            (
                PARTICIPANT_COLLECTION_NAME,
                PARTICIPANT_PLAYER_INDEX,
                doc! {"game_id": 1, "player_id": 1},
                true,
            ),
            (
                PICK_COLLECTION_NAME,
                PICK_SLOT_INDEX,
                doc! {"participant_id": 1, "week": 1, "slot": 1},
                true,
            ),
            (
                PICK_COLLECTION_NAME,
                PICK_TEAM_INDEX,
                doc! {"participant_id": 1, "team_id": 1},
                true,
            ),
            (
                PICK_COLLECTION_NAME,
                PICK_WEEK_INDEX,
                doc! {"game_id": 1, "week": 1},
                false,
            ),
            (
                MATCHUP_COLLECTION_NAME,
                MATCHUP_WEEK_INDEX,
                doc! {"season": 1, "week": 1},
                false,
            ),
        ];

        for (collection, name, keys, unique) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .unique(Some(unique))
                        .build(),
                )
                .build();

            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION_NAME)
    }

    async fn participants(&self) -> Collection<MongoParticipantDocument> {
        self.database().await.collection(PARTICIPANT_COLLECTION_NAME)
    }

    async fn picks(&self) -> Collection<MongoPickDocument> {
        self.database().await.collection(PICK_COLLECTION_NAME)
    }

    async fn matchups(&self) -> Collection<MongoMatchupDocument> {
        self.database().await.collection(MATCHUP_COLLECTION_NAME)
    }

    async fn insert_game(&self, game: GameEntity) -> StorageResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if duplicate_key_message(&source).is_some() {
                    StorageError::duplicate("game", id.to_string())
                } else {
                    MongoDaoError::SaveGame {
                        id: id.to_string(),
                        source,
                    }
                    .into()
                }
            })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> StorageResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                id: id.to_string(),
                source,
            })?;

        Ok(document.map(GameEntity::try_from).transpose()?)
    }

    async fn list_games(&self) -> StorageResult<Vec<GameEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(doc! {})
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        documents
            .into_iter()
            .map(|document| GameEntity::try_from(document).map_err(Into::into))
            .collect()
    }

    async fn update_game(&self, mut game: GameEntity) -> StorageResult<GameEntity> {
        let id = game.id;
        let expected = stored_version(game.version);
        game.version += 1;
        let document: MongoGameDocument = game.clone().into();

        let result = self
            .games()
            .await
            .replace_one(doc! {"_id": id.to_string(), "version": expected}, &document)
            .await
            .map_err(|source| MongoDaoError::SaveGame {
                id: id.to_string(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::conflict("game", id));
        }
        Ok(game)
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> StorageResult<()> {
        let key = format!("{}/{}", participant.game_id, participant.player_id);
        let id = participant.id;
        let document: MongoParticipantDocument = participant.into();
        self.participants()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if duplicate_key_message(&source).is_some() {
                    StorageError::duplicate("participant", key)
                } else {
                    MongoDaoError::SaveParticipant {
                        id: id.to_string(),
                        source,
                    }
                    .into()
                }
            })?;
        Ok(())
    }

    async fn find_participant_where(
        &self,
        filter: Document,
        key: String,
    ) -> StorageResult<Option<ParticipantEntity>> {
        let document = self
            .participants()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { key, source })?;

        Ok(document.map(ParticipantEntity::try_from).transpose()?)
    }

    async fn list_participants(&self, game_id: Uuid) -> StorageResult<Vec<ParticipantEntity>> {
        let key = game_id.to_string();
        let documents: Vec<MongoParticipantDocument> = self
            .participants()
            .await
            .find(doc! {"game_id": game_id.to_string()})
            .sort(doc! {"joined_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::LoadParticipants {
                key: key.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadParticipants { key, source })?;

        documents
            .into_iter()
            .map(|document| ParticipantEntity::try_from(document).map_err(Into::into))
            .collect()
    }

    async fn update_participant(
        &self,
        mut participant: ParticipantEntity,
    ) -> StorageResult<ParticipantEntity> {
        let id = participant.id;
        let expected = stored_version(participant.version);
        participant.version += 1;
        let document: MongoParticipantDocument = participant.clone().into();

        let result = self
            .participants()
            .await
            .replace_one(doc! {"_id": id.to_string(), "version": expected}, &document)
            .await
            .map_err(|source| MongoDaoError::SaveParticipant {
                id: id.to_string(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::conflict("participant", id));
        }
        Ok(participant)
    }

    async fn upsert_pick(&self, mut pick: PickEntity) -> StorageResult<PickEntity> {
        let participant_id = pick.participant_id.to_string();
        let collection = self.picks().await;

        let existing = collection
            .find_one(doc! {
                "participant_id": &participant_id,
                "week": i64::from(pick.week),
                "slot": i32::from(pick.slot),
            })
            .await
            .map_err(|source| MongoDaoError::SavePick {
                participant_id: participant_id.clone(),
                source,
            })?;

        if let Some(existing) = existing {
            pick.id = Uuid::parse_str(existing.id()).map_err(|err| {
                MongoDaoError::CorruptDocument {
                    collection: PICK_COLLECTION_NAME,
                    id: existing.id().to_owned(),
                    detail: err.to_string(),
                }
            })?;
        }

        let document: MongoPickDocument = pick.clone().into();
        collection
            .replace_one(doc_id(pick.id), &document)
            .upsert(true)
            .await
            .map_err(|source| match duplicate_key_message(&source) {
                Some(message) if message.contains(PICK_TEAM_INDEX) => StorageError::duplicate(
                    "pick",
                    format!("{participant_id}/{}", pick.team_id),
                ),
                // Another writer created the same slot between our lookup and write.
                Some(_) => StorageError::conflict("pick", format!("{participant_id}/{}", pick.week)),
                None => MongoDaoError::SavePick {
                    participant_id: participant_id.clone(),
                    source,
                }
                .into(),
            })?;

        Ok(pick)
    }

    async fn list_picks_where(&self, filter: Document, key: String) -> StorageResult<Vec<PickEntity>> {
        let documents: Vec<MongoPickDocument> = self
            .picks()
            .await
            .find(filter)
            .sort(doc! {"week": 1, "slot": 1})
            .await
            .map_err(|source| MongoDaoError::LoadPicks {
                key: key.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadPicks { key, source })?;

        documents
            .into_iter()
            .map(|document| PickEntity::try_from(document).map_err(Into::into))
            .collect()
    }

    async fn resolve_pick(
        &self,
        pick_id: Uuid,
        correct: bool,
        resolved_at: SystemTime,
    ) -> StorageResult<bool> {
        let result = self
            .picks()
            .await
            .update_one(
                doc! {"_id": pick_id.to_string(), "correct": null},
                doc! {"$set": {
                    "correct": correct,
                    "resolved_at": DateTime::from_system_time(resolved_at),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::ResolvePick {
                id: pick_id.to_string(),
                source,
            })?;

        Ok(result.modified_count == 1)
    }

    async fn save_matchup(&self, matchup: MatchupEntity) -> StorageResult<()> {
        let id = matchup.id.clone();
        let document: MongoMatchupDocument = matchup.into();
        self.matchups()
            .await
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveMatchup { id, source })?;
        Ok(())
    }

    async fn find_matchup(&self, id: String) -> StorageResult<Option<MatchupEntity>> {
        let document = self
            .matchups()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadMatchups { key: id, source })?;
        Ok(document.map(Into::into))
    }

    async fn list_matchups(&self, season: u16, week: u32) -> StorageResult<Vec<MatchupEntity>> {
        let key = format!("{season}/{week}");
        let documents: Vec<MongoMatchupDocument> = self
            .matchups()
            .await
            .find(doc! {"season": i32::from(season), "week": i64::from(week)})
            .sort(doc! {"scheduled_start": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::LoadMatchups {
                key: key.clone(),
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadMatchups { key, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl SurvivorStore for MongoSurvivorStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await })
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
            store
                .find_participant_where(doc_id(id), id.to_string())
                .await
        })
    }

    fn find_participant_by_player(
        &self,
        game_id: Uuid,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let key = format!("{game_id}/{player_id}");
            store
                .find_participant_where(
                    doc! {"game_id": game_id.to_string(), "player_id": player_id},
                    key,
                )
                .await
        })
    }

    fn list_participants(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(game_id).await })
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
            store
                .list_picks_where(
                    doc! {"participant_id": participant_id.to_string()},
                    participant_id.to_string(),
                )
                .await
        })
    }

    fn list_picks_for_week(
        &self,
        game_id: Uuid,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<PickEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_picks_where(
                    doc! {"game_id": game_id.to_string(), "week": i64::from(week)},
                    format!("{game_id}/{week}"),
                )
                .await
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
        Box::pin(async move { store.save_matchup(matchup).await })
    }

    fn find_matchup(
        &self,
        id: String,
    ) -> BoxFuture<'static, StorageResult<Option<MatchupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_matchup(id).await })
    }

    fn list_matchups(
        &self,
        season: u16,
        week: u32,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchupEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_matchups(season, week).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
