//! In-memory [`LifecycleStore`].
//!
//! All tables live behind one `std::sync::Mutex`. Every trait method takes
//! the lock once, does its checks and writes, and releases it before
//! returning, so a method is atomic and no lock is ever held across an
//! `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use handgame_protocol::{
    Hand, MoveRecord, Participant, ParticipantId, Room, RoomId, RoomState, Standing,
};

use crate::{Clock, ClassicRule, LifecycleStore, MoveWindow, RoomError, ScoringRule, SystemClock};

#[derive(Debug, Default)]
struct Tables {
    next_participant: u64,
    next_room: u64,
    participants: BTreeMap<ParticipantId, Participant>,
    by_identity: HashMap<(String, String), ParticipantId>,
    rooms: BTreeMap<RoomId, Room>,
    /// Append-only, oldest first.
    moves: Vec<MoveRecord>,
    standings: HashMap<(RoomId, ParticipantId), Standing>,
}

impl Tables {
    fn room(&self, room: RoomId) -> Result<&Room, RoomError> {
        self.rooms.get(&room).ok_or(RoomError::RoomNotFound)
    }

    fn room_mut(&mut self, room: RoomId) -> Result<&mut Room, RoomError> {
        self.rooms.get_mut(&room).ok_or(RoomError::RoomNotFound)
    }

    fn open_room_id(&mut self) -> RoomId {
        if let Some(room) = self
            .rooms
            .values()
            .find(|r| r.state == RoomState::Waiting)
        {
            return room.id;
        }

        self.next_room += 1;
        let id = RoomId(self.next_room);
        self.rooms.insert(
            id,
            Room {
                id,
                state: RoomState::Waiting,
                start_time: None,
                time_offset: 0,
                time_duration: 0,
                participants: Vec::new(),
            },
        );
        tracing::info!(room_id = %id, "room opened");
        id
    }

    /// The latest hand of every seated participant other than `except`
    /// who has thrown at least once.
    fn opponent_hands(&self, room: &Room, except: ParticipantId) -> Vec<Hand> {
        let seated: HashSet<ParticipantId> = room
            .participants
            .iter()
            .copied()
            .filter(|p| *p != except)
            .collect();
        let mut seen = HashSet::new();
        self.moves
            .iter()
            .rev()
            .filter(|m| m.room_id == room.id && seated.contains(&m.participant_id))
            .filter(|m| seen.insert(m.participant_id))
            .map(|m| m.hand)
            .collect()
    }
}

/// A [`LifecycleStore`] kept entirely in process memory.
///
/// ```
/// use handgame_room::{LifecycleStore, MemoryStore};
///
/// # block_on(async {
/// let store = MemoryStore::new();
/// let kim = store.find_or_create_participant("blue", "kim").await.unwrap();
/// let room = store.seat_in_open_room(kim.id).await.unwrap();
/// assert!(room.is_seated(kim.id));
/// # });
/// # fn block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub struct MemoryStore {
    tables: Mutex<Tables>,
    clock: Arc<dyn Clock>,
    rule: Arc<dyn ScoringRule>,
}

impl MemoryStore {
    /// A store on the system clock with [`ClassicRule`] scoring.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            clock: Arc::new(SystemClock),
            rule: Arc::new(ClassicRule),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the scoring rule.
    pub fn with_rule(mut self, rule: Arc<dyn ScoringRule>) -> Self {
        self.rule = rule;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RoomError> {
        self.tables.lock().map_err(|_| {
            tracing::error!("memory store lock poisoned");
            RoomError::StoreUnavailable
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LifecycleStore for MemoryStore {
    async fn find_or_create_participant(
        &self,
        affiliation: &str,
        name: &str,
    ) -> Result<Participant, RoomError> {
        let mut t = self.lock()?;
        let key = (affiliation.to_string(), name.to_string());
        if let Some(id) = t.by_identity.get(&key) {
            return t
                .participants
                .get(id)
                .cloned()
                .ok_or(RoomError::StoreUnavailable);
        }

        t.next_participant += 1;
        let id = ParticipantId(t.next_participant);
        let participant = Participant {
            id,
            affiliation: key.0.clone(),
            name: key.1.clone(),
        };
        t.participants.insert(id, participant.clone());
        t.by_identity.insert(key, id);
        tracing::info!(participant_id = %id, affiliation, name, "participant created");
        Ok(participant)
    }

    async fn get_participant(&self, participant: ParticipantId) -> Result<Participant, RoomError> {
        self.lock()?
            .participants
            .get(&participant)
            .cloned()
            .ok_or(RoomError::ParticipantNotFound)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, RoomError> {
        Ok(self.lock()?.participants.values().cloned().collect())
    }

    async fn seat_in_open_room(&self, participant: ParticipantId) -> Result<Room, RoomError> {
        let mut t = self.lock()?;
        if !t.participants.contains_key(&participant) {
            return Err(RoomError::ParticipantNotFound);
        }

        let elsewhere = t.rooms.values().any(|r| {
            r.state == RoomState::Playing && r.is_seated(participant)
        });
        if elsewhere {
            return Err(RoomError::AlreadySeatedElsewhere);
        }

        // At most one room is ever Waiting, so any seat outside a Playing
        // room is already the open room.
        let open = t.open_room_id();

        let room = t.room_mut(open)?;
        if room.is_seated(participant) {
            return Ok(room.clone());
        }
        room.participants.push(participant);
        let snapshot = room.clone();
        t.standings
            .insert((open, participant), Standing::baseline(open, participant));
        tracing::info!(%participant, room_id = %open, "participant seated");
        Ok(snapshot)
    }

    async fn open_room(&self) -> Result<Room, RoomError> {
        let mut t = self.lock()?;
        let open = t.open_room_id();
        t.room(open).cloned()
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, RoomError> {
        Ok(self.lock()?.rooms.values().cloned().collect())
    }

    async fn get_room(&self, room: RoomId) -> Result<Room, RoomError> {
        self.lock()?.room(room).cloned()
    }

    async fn transition_to_playing(
        &self,
        room: RoomId,
        time_offset: u32,
        time_duration: u32,
    ) -> Result<Room, RoomError> {
        let now = self.clock.now();
        let mut t = self.lock()?;
        let r = t.room_mut(room)?;
        if !r.state.can_transition_to(RoomState::Playing) {
            return Err(RoomError::NotInWaitingState);
        }
        r.state = RoomState::Playing;
        r.start_time = Some(now);
        r.time_offset = time_offset;
        r.time_duration = time_duration;
        Ok(r.clone())
    }

    async fn transition_to_ended(&self, room: RoomId) -> Result<Room, RoomError> {
        let now = self.clock.now();
        let mut t = self.lock()?;
        let r = t.room_mut(room)?;
        if !r.state.can_transition_to(RoomState::Ended) {
            return Err(RoomError::RoomNotPlaying);
        }
        match MoveWindow::of(r) {
            Some(window) if window.has_elapsed(now) => {}
            _ => return Err(RoomError::NotYetOver),
        }
        r.state = RoomState::Ended;
        Ok(r.clone())
    }

    async fn vacate_seat(
        &self,
        room: RoomId,
        participant: ParticipantId,
    ) -> Result<Room, RoomError> {
        let mut t = self.lock()?;
        if t.room(room)?.state != RoomState::Waiting {
            return Err(RoomError::NotInWaitingState);
        }
        if !t.participants.contains_key(&participant) {
            return Err(RoomError::ParticipantNotFound);
        }

        let r = t.room_mut(room)?;
        let before = r.participants.len();
        r.participants.retain(|p| *p != participant);
        if r.participants.len() == before {
            return Err(RoomError::NotSeatedInRoom);
        }
        let snapshot = r.clone();
        t.standings.remove(&(room, participant));
        Ok(snapshot)
    }

    async fn record_move(
        &self,
        room: RoomId,
        participant: ParticipantId,
        hand: Hand,
    ) -> Result<(MoveRecord, Standing), RoomError> {
        let now = self.clock.now();
        let mut t = self.lock()?;

        let r = t.room(room)?;
        if r.state != RoomState::Playing {
            return Err(RoomError::RoomNotPlaying);
        }
        MoveWindow::of(r)
            .ok_or(RoomError::RoomNotPlaying)?
            .check(now)?;
        if !t.participants.contains_key(&participant) {
            return Err(RoomError::ParticipantNotFound);
        }
        if !t.standings.contains_key(&(room, participant)) {
            return Err(RoomError::MissingBaselineMove);
        }

        let opponents = t.opponent_hands(r, participant);
        let scored = self.rule.score(hand, &opponents);
        let record = MoveRecord {
            room_id: room,
            participant_id: participant,
            hand,
            score: scored.score,
            time: now,
        };
        t.moves.push(record.clone());

        let standing = t
            .standings
            .get_mut(&(room, participant))
            .ok_or(RoomError::MissingBaselineMove)?;
        scored.apply(standing);
        Ok((record, standing.clone()))
    }

    async fn list_moves(
        &self,
        room: RoomId,
        limit: Option<usize>,
    ) -> Result<Vec<MoveRecord>, RoomError> {
        let t = self.lock()?;
        t.room(room)?;
        Ok(t.moves
            .iter()
            .rev()
            .filter(|m| m.room_id == room)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn list_standings(&self, room: RoomId) -> Result<Vec<Standing>, RoomError> {
        let t = self.lock()?;
        let r = t.room(room)?;
        Ok(r.participants
            .iter()
            .filter_map(|p| t.standings.get(&(room, *p)).cloned())
            .collect())
    }

    async fn standing(
        &self,
        room: RoomId,
        participant: ParticipantId,
    ) -> Result<Standing, RoomError> {
        let t = self.lock()?;
        t.room(room)?;
        t.standings
            .get(&(room, participant))
            .cloned()
            .ok_or(RoomError::MissingBaselineMove)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::ManualClock;

    fn clocked() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        (MemoryStore::new().with_clock(clock.clone()), clock)
    }

    async fn seated(store: &MemoryStore, name: &str) -> (ParticipantId, RoomId) {
        let p = store.find_or_create_participant("team", name).await.unwrap();
        let room = store.seat_in_open_room(p.id).await.unwrap();
        (p.id, room.id)
    }

    // -- participants -----------------------------------------------------

    #[tokio::test]
    async fn test_find_or_create_participant_same_identity_same_id() {
        let store = MemoryStore::new();
        let a = store.find_or_create_participant("blue", "kim").await.unwrap();
        let b = store.find_or_create_participant("blue", "kim").await.unwrap();
        let c = store.find_or_create_participant("red", "kim").await.unwrap();

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_eq!(store.list_participants().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_participant_unknown_returns_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get_participant(ParticipantId(9)).await,
            Err(RoomError::ParticipantNotFound)
        );
    }

    // -- seating ----------------------------------------------------------

    #[tokio::test]
    async fn test_seat_in_open_room_creates_room_and_baseline() {
        let store = MemoryStore::new();
        let (p, room) = seated(&store, "kim").await;

        let r = store.get_room(room).await.unwrap();
        assert_eq!(r.state, RoomState::Waiting);
        assert_eq!(r.participants, vec![p]);
        assert_eq!(
            store.standing(room, p).await.unwrap(),
            Standing::baseline(room, p)
        );
    }

    #[tokio::test]
    async fn test_seat_in_open_room_twice_is_idempotent() {
        let store = MemoryStore::new();
        let (p, room) = seated(&store, "kim").await;

        let again = store.seat_in_open_room(p).await.unwrap();

        assert_eq!(again.id, room);
        assert_eq!(again.participants, vec![p]);
    }

    #[tokio::test]
    async fn test_seat_in_open_room_while_playing_elsewhere_is_rejected() {
        let store = MemoryStore::new();
        let (p, room) = seated(&store, "kim").await;
        store.transition_to_playing(room, 0, 60).await.unwrap();

        let result = store.seat_in_open_room(p).await;

        assert_eq!(result, Err(RoomError::AlreadySeatedElsewhere));
        let rooms = store.list_rooms().await.unwrap();
        assert!(rooms.iter().filter(|r| r.is_seated(p)).count() == 1);
    }

    #[tokio::test]
    async fn test_seat_in_open_room_after_room_ended_seats_in_new_room() {
        let (store, clock) = clocked();
        let (p, room) = seated(&store, "kim").await;
        store.transition_to_playing(room, 0, 10).await.unwrap();
        clock.advance(TimeDelta::seconds(11));
        store.transition_to_ended(room).await.unwrap();

        let next = store.seat_in_open_room(p).await.unwrap();

        assert_ne!(next.id, room);
        assert!(next.is_seated(p));
    }

    #[tokio::test]
    async fn test_seat_unknown_participant_returns_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.seat_in_open_room(ParticipantId(3)).await,
            Err(RoomError::ParticipantNotFound)
        );
    }

    // -- transitions ------------------------------------------------------

    #[tokio::test]
    async fn test_transition_to_playing_stamps_start_time() {
        let (store, clock) = clocked();
        let (_, room) = seated(&store, "kim").await;

        let r = store.transition_to_playing(room, 5, 60).await.unwrap();

        assert_eq!(r.state, RoomState::Playing);
        assert_eq!(r.start_time, Some(clock.now()));
        assert_eq!((r.time_offset, r.time_duration), (5, 60));
    }

    #[tokio::test]
    async fn test_transitions_out_of_order_fail_without_mutation() {
        let (store, clock) = clocked();
        let (_, room) = seated(&store, "kim").await;

        assert_eq!(store.transition_to_ended(room).await, Err(RoomError::RoomNotPlaying));
        assert_eq!(store.get_room(room).await.unwrap().state, RoomState::Waiting);

        store.transition_to_playing(room, 0, 10).await.unwrap();
        let before = store.get_room(room).await.unwrap();
        assert_eq!(
            store.transition_to_playing(room, 1, 1).await,
            Err(RoomError::NotInWaitingState)
        );
        assert_eq!(store.get_room(room).await.unwrap(), before);

        assert_eq!(store.transition_to_ended(room).await, Err(RoomError::NotYetOver));
        clock.advance(TimeDelta::seconds(11));
        assert_eq!(
            store.transition_to_ended(room).await.unwrap().state,
            RoomState::Ended
        );
        assert_eq!(
            store.transition_to_playing(room, 0, 10).await,
            Err(RoomError::NotInWaitingState)
        );
        assert_eq!(store.transition_to_ended(room).await, Err(RoomError::RoomNotPlaying));
    }

    #[tokio::test]
    async fn test_transition_unknown_room_returns_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.transition_to_playing(RoomId(42), 0, 0).await,
            Err(RoomError::RoomNotFound)
        );
    }

    // -- vacate -----------------------------------------------------------

    #[tokio::test]
    async fn test_vacate_seat_removes_seat_and_standing() {
        let store = MemoryStore::new();
        let (p, room) = seated(&store, "kim").await;
        let (q, _) = seated(&store, "lee").await;

        let r = store.vacate_seat(room, p).await.unwrap();

        assert_eq!(r.participants, vec![q]);
        assert_eq!(store.standing(room, p).await, Err(RoomError::MissingBaselineMove));
        assert_eq!(store.list_standings(room).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_vacate_seat_error_order() {
        let store = MemoryStore::new();
        let (p, room) = seated(&store, "kim").await;
        let outsider = store.find_or_create_participant("team", "out").await.unwrap();

        assert_eq!(store.vacate_seat(RoomId(99), p).await, Err(RoomError::RoomNotFound));
        assert_eq!(
            store.vacate_seat(room, ParticipantId(99)).await,
            Err(RoomError::ParticipantNotFound)
        );
        assert_eq!(
            store.vacate_seat(room, outsider.id).await,
            Err(RoomError::NotSeatedInRoom)
        );

        store.transition_to_playing(room, 0, 60).await.unwrap();
        assert_eq!(store.vacate_seat(room, p).await, Err(RoomError::NotInWaitingState));
    }

    // -- moves ------------------------------------------------------------

    #[tokio::test]
    async fn test_record_move_is_gated_by_window() {
        let (store, clock) = clocked();
        let (p, room) = seated(&store, "kim").await;
        store.transition_to_playing(room, 5, 60).await.unwrap();

        clock.advance(TimeDelta::seconds(4));
        assert_eq!(
            store.record_move(room, p, Hand::Rock).await,
            Err(RoomError::WindowNotOpenYet)
        );

        clock.advance(TimeDelta::seconds(1));
        assert!(store.record_move(room, p, Hand::Rock).await.is_ok());

        clock.advance(TimeDelta::seconds(60));
        assert!(store.record_move(room, p, Hand::Paper).await.is_ok());

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(
            store.record_move(room, p, Hand::Rock).await,
            Err(RoomError::WindowClosed)
        );
        assert_eq!(store.list_moves(room, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_move_validation_order() {
        let store = MemoryStore::new();
        let (p, room) = seated(&store, "kim").await;
        let outsider = store.find_or_create_participant("team", "out").await.unwrap();

        assert_eq!(
            store.record_move(RoomId(99), p, Hand::Rock).await,
            Err(RoomError::RoomNotFound)
        );
        assert_eq!(
            store.record_move(room, ParticipantId(99), Hand::Rock).await,
            Err(RoomError::RoomNotPlaying)
        );

        store.transition_to_playing(room, 0, 60).await.unwrap();
        assert_eq!(
            store.record_move(room, ParticipantId(99), Hand::Rock).await,
            Err(RoomError::ParticipantNotFound)
        );
        assert_eq!(
            store.record_move(room, outsider.id, Hand::Rock).await,
            Err(RoomError::MissingBaselineMove)
        );
    }

    #[tokio::test]
    async fn test_record_move_scores_against_latest_opponent_hands() {
        let store = MemoryStore::new();
        let (kim, room) = seated(&store, "kim").await;
        let (lee, _) = seated(&store, "lee").await;
        store.transition_to_playing(room, 0, 60).await.unwrap();

        let (first, _) = store.record_move(room, kim, Hand::Rock).await.unwrap();
        assert_eq!(first.score, 0);

        let (_, lee_standing) = store.record_move(room, lee, Hand::Paper).await.unwrap();
        assert_eq!((lee_standing.score, lee_standing.win), (1, 1));

        // kim's latest is now scissors, so lee's next paper loses.
        store.record_move(room, kim, Hand::Scissors).await.unwrap();
        let (_, lee_standing) = store.record_move(room, lee, Hand::Paper).await.unwrap();
        assert_eq!(lee_standing.score, 0);
        assert_eq!((lee_standing.win, lee_standing.draw, lee_standing.loss), (1, 0, 1));

        let moves = store.list_moves(room, Some(2)).await.unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].participant_id, lee);
        assert_eq!(moves[1].hand, Hand::Scissors);
    }

    #[tokio::test]
    async fn test_list_moves_unknown_room_returns_not_found() {
        let store = MemoryStore::new();
        assert_eq!(store.list_moves(RoomId(1), None).await, Err(RoomError::RoomNotFound));
        assert_eq!(store.list_standings(RoomId(1)).await, Err(RoomError::RoomNotFound));
    }
}
