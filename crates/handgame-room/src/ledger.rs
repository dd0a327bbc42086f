//! Turning stored moves and standings into what clients see.

use std::collections::HashMap;

use handgame_protocol::{HandEntry, MoveRecord, Participant, ParticipantId, RankedStanding, Standing};

/// Ranks a room's standings.
///
/// Sorted by score, then wins, then draws, all descending. The sort is
/// stable, so rows that tie on all three keep their input order, and each
/// row's rank is simply its 1-based position. Standings whose participant
/// is missing from `people` are dropped.
pub fn rank_standings(
    standings: &[Standing],
    people: &HashMap<ParticipantId, Participant>,
) -> Vec<RankedStanding> {
    let mut sorted: Vec<&Standing> = standings.iter().collect();
    sorted.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.win.cmp(&a.win))
            .then(b.draw.cmp(&a.draw))
    });

    sorted
        .into_iter()
        .filter_map(|s| people.get(&s.participant_id).map(|p| (s, p)))
        .enumerate()
        .map(|(index, (s, p))| RankedStanding {
            rank: index + 1,
            affiliation: p.affiliation.clone(),
            name: p.name.clone(),
            score: s.score,
            win: s.win,
            draw: s.draw,
            lose: s.loss,
            room_id: s.room_id,
        })
        .collect()
}

/// Joins moves (already newest first) with their participants' names.
pub fn hand_entries(
    moves: &[MoveRecord],
    people: &HashMap<ParticipantId, Participant>,
) -> Vec<HandEntry> {
    moves
        .iter()
        .filter_map(|m| {
            people.get(&m.participant_id).map(|p| HandEntry {
                affiliation: p.affiliation.clone(),
                name: p.name.clone(),
                hand: m.hand,
                score: m.score,
                time: m.time,
                room_id: m.room_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use handgame_protocol::{Hand, RoomId};

    use super::*;

    fn person(id: u64, name: &str) -> (ParticipantId, Participant) {
        (
            ParticipantId(id),
            Participant {
                id: ParticipantId(id),
                affiliation: "team".into(),
                name: name.into(),
            },
        )
    }

    fn standing(id: u64, score: i64, win: u32, draw: u32) -> Standing {
        Standing {
            score,
            win,
            draw,
            ..Standing::baseline(RoomId(1), ParticipantId(id))
        }
    }

    #[test]
    fn test_rank_standings_orders_by_score_win_draw() {
        let people: HashMap<_, _> = [person(1, "c"), person(2, "b"), person(3, "a")].into();
        let standings = vec![standing(3, 3, 3, 3), standing(2, 5, 2, 0), standing(1, 5, 2, 1)];

        let ranked = rank_standings(&standings, &people);

        let order: Vec<_> = ranked.iter().map(|r| (r.rank, r.score, r.win, r.draw)).collect();
        assert_eq!(order, vec![(1, 5, 2, 1), (2, 5, 2, 0), (3, 3, 3, 3)]);
        assert_eq!(ranked[0].name, "c");
    }

    #[test]
    fn test_rank_standings_full_tie_keeps_input_order_with_distinct_ranks() {
        let people: HashMap<_, _> = [person(1, "first"), person(2, "second")].into();
        let standings = vec![standing(1, 0, 0, 0), standing(2, 0, 0, 0)];

        let ranked = rank_standings(&standings, &people);

        assert_eq!(ranked[0].name, "first");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_hand_entries_joins_names_and_keeps_order() {
        let people: HashMap<_, _> = [person(1, "kim"), person(2, "lee")].into();
        let now = Utc::now();
        let moves = vec![
            MoveRecord {
                room_id: RoomId(1),
                participant_id: ParticipantId(2),
                hand: Hand::Paper,
                score: 1,
                time: now,
            },
            MoveRecord {
                room_id: RoomId(1),
                participant_id: ParticipantId(1),
                hand: Hand::Rock,
                score: 0,
                time: now,
            },
        ];

        let entries = hand_entries(&moves, &people);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "lee");
        assert_eq!(entries[0].hand, Hand::Paper);
        assert_eq!(entries[1].name, "kim");
    }
}
