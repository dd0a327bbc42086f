//! Typed administrative surface.
//!
//! These are the operations an operator console or HTTP layer would
//! expose. They reuse the coordinator, so an admin action takes the same
//! room locks and produces the same broadcasts as the equivalent player
//! request. Failures come back as [`AdminError`] with a stable status.

use std::sync::Arc;

use handgame_protocol::{Hand, HandEntry, MoveRecord, Participant, ParticipantId, RankedStanding, Room, RoomId};

use crate::{ErrorStatus, LifecycleStore, RoomCoordinator, RoomError};

/// Window offset used by [`Admin::force_start`] when none is given.
pub const DEFAULT_TIME_OFFSET: u32 = 5;
/// Window duration used by [`Admin::force_start`] when none is given.
pub const DEFAULT_TIME_DURATION: u32 = 60;
/// Page size of [`Admin::recent_hands`] when no limit is given.
pub const DEFAULT_RECENT_HANDS: usize = 15;

/// A failed admin operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AdminError {
    pub status: ErrorStatus,
    pub message: String,
}

impl From<RoomError> for AdminError {
    fn from(e: RoomError) -> Self {
        Self {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Administrative operations over a shared coordinator.
pub struct Admin<S: LifecycleStore> {
    coordinator: Arc<RoomCoordinator<S>>,
}

impl<S: LifecycleStore> Clone for Admin<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<S: LifecycleStore> Admin<S> {
    pub fn new(coordinator: Arc<RoomCoordinator<S>>) -> Self {
        Self { coordinator }
    }

    fn store(&self) -> &S {
        self.coordinator.store()
    }

    pub async fn list_rooms(&self) -> AdminResult<Vec<Room>> {
        Ok(self.store().list_rooms().await?)
    }

    /// The current Waiting room, created if there is none.
    pub async fn open_room(&self) -> AdminResult<Room> {
        Ok(self.store().open_room().await?)
    }

    pub async fn get_room(&self, room: RoomId) -> AdminResult<Room> {
        Ok(self.store().get_room(room).await?)
    }

    /// Removes a participant from a Waiting room, with the same reply,
    /// close and broadcast a player's own quit produces.
    pub async fn remove_participant(
        &self,
        room: RoomId,
        participant: ParticipantId,
    ) -> AdminResult<Room> {
        Ok(self.coordinator.quit(room, participant).await?)
    }

    /// Number of seats in the room.
    pub async fn count_participants(&self, room: RoomId) -> AdminResult<usize> {
        Ok(self.store().get_room(room).await?.participants.len())
    }

    /// Starts a Waiting room. Missing window values fall back to
    /// [`DEFAULT_TIME_OFFSET`] and [`DEFAULT_TIME_DURATION`].
    pub async fn force_start(
        &self,
        room: RoomId,
        time_offset: Option<u32>,
        time_duration: Option<u32>,
    ) -> AdminResult<Room> {
        let offset = time_offset.unwrap_or(DEFAULT_TIME_OFFSET);
        let duration = time_duration.unwrap_or(DEFAULT_TIME_DURATION);
        tracing::info!(room_id = %room, offset, duration, "admin start");
        Ok(self.coordinator.start(room, offset, duration).await?)
    }

    /// Ends a Playing room whose window has elapsed.
    pub async fn force_end(&self, room: RoomId) -> AdminResult<Room> {
        tracing::info!(room_id = %room, "admin end");
        Ok(self.coordinator.end(room).await?)
    }

    /// Submits a hand for a participant, as if they had sent it.
    pub async fn submit_hand(
        &self,
        room: RoomId,
        participant: ParticipantId,
        hand: Hand,
    ) -> AdminResult<MoveRecord> {
        Ok(self.coordinator.submit_hand(room, participant, hand).await?)
    }

    /// Newest moves first, [`DEFAULT_RECENT_HANDS`] of them unless `limit`
    /// says otherwise.
    pub async fn recent_hands(
        &self,
        room: RoomId,
        limit: Option<usize>,
    ) -> AdminResult<Vec<HandEntry>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_HANDS);
        Ok(self.coordinator.recent_hands(room, Some(limit)).await?)
    }

    pub async fn all_hands(&self, room: RoomId) -> AdminResult<Vec<HandEntry>> {
        Ok(self.coordinator.hand_list(room).await?)
    }

    pub async fn standings(&self, room: RoomId) -> AdminResult<Vec<RankedStanding>> {
        Ok(self.coordinator.game_list(room).await?)
    }

    pub async fn list_participants(&self) -> AdminResult<Vec<Participant>> {
        Ok(self.store().list_participants().await?)
    }

    /// Registers a participant without seating them.
    pub async fn register_participant(
        &self,
        affiliation: &str,
        name: &str,
    ) -> AdminResult<Participant> {
        let affiliation = affiliation.trim();
        let name = name.trim();
        if affiliation.is_empty() || name.is_empty() {
            return Err(AdminError {
                status: ErrorStatus::BadRequest,
                message: "affiliation and name are required".into(),
            });
        }
        Ok(self
            .store()
            .find_or_create_participant(affiliation, name)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::{ManualClock, MemoryStore};

    fn setup() -> (Admin<MemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new().with_clock(clock.clone()));
        (Admin::new(Arc::new(RoomCoordinator::new(store))), clock)
    }

    async fn seat(admin: &Admin<MemoryStore>, name: &str) -> (ParticipantId, RoomId) {
        let p = admin.register_participant("team", name).await.unwrap();
        let room = admin.store().seat_in_open_room(p.id).await.unwrap();
        (p.id, room.id)
    }

    #[tokio::test]
    async fn test_force_start_uses_default_window() {
        let (admin, _) = setup();
        let (_, room) = seat(&admin, "kim").await;

        let started = admin.force_start(room, None, None).await.unwrap();

        assert_eq!((started.time_offset, started.time_duration), (5, 60));
    }

    #[tokio::test]
    async fn test_force_start_twice_maps_to_conflict() {
        let (admin, _) = setup();
        let (_, room) = seat(&admin, "kim").await;
        admin.force_start(room, Some(0), Some(10)).await.unwrap();

        let err = admin.force_start(room, None, None).await.unwrap_err();

        assert_eq!(err.status, ErrorStatus::Conflict);
        assert_eq!(err.status.code(), 409);
        assert_eq!(err.message, "Room is not in a wait mode");
    }

    #[tokio::test]
    async fn test_get_unknown_room_maps_to_not_found() {
        let (admin, _) = setup();
        let err = admin.get_room(RoomId(404)).await.unwrap_err();
        assert_eq!(err.status.code(), 404);
        assert_eq!(err.to_string(), "Room not found");
    }

    #[tokio::test]
    async fn test_remove_participant_not_seated_maps_to_not_found() {
        let (admin, _) = setup();
        let (_, room) = seat(&admin, "kim").await;
        let outsider = admin.register_participant("team", "out").await.unwrap();

        let err = admin.remove_participant(room, outsider.id).await.unwrap_err();

        assert_eq!(err.status, ErrorStatus::NotFound);
        assert_eq!(err.message, "Person does not exist in the Room");
    }

    #[tokio::test]
    async fn test_remove_participant_updates_count() {
        let (admin, _) = setup();
        let (kim, room) = seat(&admin, "kim").await;
        seat(&admin, "lee").await;
        assert_eq!(admin.count_participants(room).await.unwrap(), 2);

        admin.remove_participant(room, kim).await.unwrap();

        assert_eq!(admin.count_participants(room).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_hands_defaults_to_fifteen() {
        let (admin, _) = setup();
        let (kim, room) = seat(&admin, "kim").await;
        admin.force_start(room, Some(0), Some(60)).await.unwrap();
        for _ in 0..20 {
            admin.submit_hand(room, kim, Hand::Rock).await.unwrap();
        }

        assert_eq!(admin.recent_hands(room, None).await.unwrap().len(), 15);
        assert_eq!(admin.recent_hands(room, Some(3)).await.unwrap().len(), 3);
        assert_eq!(admin.all_hands(room).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_force_end_before_window_is_precondition_failed() {
        let (admin, clock) = setup();
        let (_, room) = seat(&admin, "kim").await;
        admin.force_start(room, Some(0), Some(10)).await.unwrap();

        let err = admin.force_end(room).await.unwrap_err();
        assert_eq!(err.status.code(), 412);

        clock.advance(TimeDelta::seconds(11));
        admin.force_end(room).await.unwrap();
    }

    #[tokio::test]
    async fn test_register_participant_blank_is_bad_request() {
        let (admin, _) = setup();
        let err = admin.register_participant(" ", "kim").await.unwrap_err();
        assert_eq!(err.status.code(), 400);
    }

    #[tokio::test]
    async fn test_standings_rank_submitted_hands() {
        let (admin, _) = setup();
        let (kim, room) = seat(&admin, "kim").await;
        let (lee, _) = seat(&admin, "lee").await;
        admin.force_start(room, Some(0), Some(60)).await.unwrap();
        admin.submit_hand(room, kim, Hand::Rock).await.unwrap();
        admin.submit_hand(room, lee, Hand::Paper).await.unwrap();

        let ranked = admin.standings(room).await.unwrap();

        assert_eq!(ranked[0].name, "lee");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].name, "kim");
    }
}
