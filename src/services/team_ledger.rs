//! Which teams a participant has already spent.
//!
//! The ledger is derived from the participant's stored picks rather than kept as a separate
//! table, so it can never drift from them. Reads are plain snapshots.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    dao::{models::PickEntity, survivor_store::SurvivorStore},
    error::ServiceError,
};

/// One team spent by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamUsage {
    /// Spent team code.
    pub team_id: String,
    /// Week it was spent in.
    pub week: u32,
    /// Slot it was spent in.
    pub slot: u8,
    /// Matchup of that pick.
    pub matchup_id: String,
    /// `None` until the matchup is resolved.
    pub correct: Option<bool>,
}

impl From<&PickEntity> for TeamUsage {
    fn from(pick: &PickEntity) -> Self {
        Self {
            team_id: pick.team_id.clone(),
            week: pick.week,
            slot: pick.slot,
            matchup_id: pick.matchup_id.clone(),
            correct: pick.correct,
        }
    }
}

/// Pick that already holds `team_id` outside of (`week`, `slot`).
///
/// The pick stored in the same week and slot is the one being overwritten, so re-submitting the
/// same team there is not a reuse.
pub fn conflicting_use<'a>(
    picks: &'a [PickEntity],
    team_id: &str,
    week: u32,
    slot: u8,
) -> Option<&'a PickEntity> {
    picks
        .iter()
        .find(|pick| pick.team_id == team_id && !(pick.week == week && pick.slot == slot))
}

/// Read side of team usage.
#[derive(Clone)]
pub struct TeamLedger {
    store: Arc<dyn SurvivorStore>,
}

impl TeamLedger {
    /// Ledger over `store`.
    pub fn new(store: Arc<dyn SurvivorStore>) -> Self {
        Self { store }
    }

    /// Teams used by the participant, ordered by week then slot.
    pub async fn used_teams(&self, participant_id: Uuid) -> Result<Vec<TeamUsage>, ServiceError> {
        let mut picks = self.store.list_picks_for_participant(participant_id).await?;
        picks.sort_by_key(|pick| (pick.week, pick.slot));
        Ok(picks.iter().map(TeamUsage::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::survivor_store::memory::InMemorySurvivorStore;

    fn pick(participant_id: Uuid, week: u32, slot: u8, team: &str) -> PickEntity {
        PickEntity {
            id: Uuid::new_v4(),
            game_id: Uuid::nil(),
            participant_id,
            matchup_id: format!("m-{week}-{team}"),
            team_id: team.into(),
            week,
            slot,
            correct: None,
            submitted_at: SystemTime::UNIX_EPOCH,
            resolved_at: None,
        }
    }

    #[test]
    fn same_week_and_slot_is_an_overwrite_not_a_reuse() {
        let participant = Uuid::new_v4();
        let picks = vec![pick(participant, 1, 1, "KC")];

        assert!(conflicting_use(&picks, "KC", 1, 1).is_none());
        assert!(conflicting_use(&picks, "KC", 5, 1).is_some());
        assert!(conflicting_use(&picks, "KC", 1, 2).is_some());
        assert!(conflicting_use(&picks, "DEN", 5, 1).is_none());
    }

    #[tokio::test]
    async fn used_teams_are_ordered_by_week_and_slot() {
        let store: Arc<dyn SurvivorStore> = Arc::new(InMemorySurvivorStore::new());
        let participant = Uuid::new_v4();
        for (week, slot, team) in [(12, 2, "BUF"), (3, 1, "KC"), (12, 1, "PHI")] {
            store
                .upsert_pick(pick(participant, week, slot, team))
                .await
                .expect("pick stored");
        }

        let ledger = TeamLedger::new(store);
        let teams: Vec<_> = ledger
            .used_teams(participant)
            .await
            .expect("ledger read")
            .into_iter()
            .map(|usage| usage.team_id)
            .collect();

        assert_eq!(teams, ["KC", "PHI", "BUF"]);
    }
}
