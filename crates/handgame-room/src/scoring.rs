//! Scoring rules: what a hand earns against the rest of the room.
//!
//! A rule sees the submitted hand and the latest hand of every other
//! seated participant who has thrown at least once, and returns the
//! per-move score plus which counter (win, draw or lose) to bump.

use handgame_protocol::{Hand, Standing};

/// The counter a scored move increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Lose,
}

/// A scored move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveScore {
    pub score: i64,
    pub outcome: Outcome,
}

impl MoveScore {
    /// Folds this move into a standing: adds the score and increments
    /// exactly one counter.
    pub fn apply(&self, standing: &mut Standing) {
        standing.score += self.score;
        match self.outcome {
            Outcome::Win => standing.win += 1,
            Outcome::Draw => standing.draw += 1,
            Outcome::Lose => standing.loss += 1,
        }
    }
}

/// A pluggable scoring rule.
pub trait ScoringRule: Send + Sync + 'static {
    /// Scores `hand` against the opponents' latest hands.
    fn score(&self, hand: Hand, opponents: &[Hand]) -> MoveScore;
}

/// The default rule: +1 for every opponent hand beaten, -1 for every
/// opponent hand lost to. The sign of the total decides the outcome, and
/// a move with nobody to play against is a draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicRule;

impl ScoringRule for ClassicRule {
    fn score(&self, hand: Hand, opponents: &[Hand]) -> MoveScore {
        let score: i64 = opponents
            .iter()
            .map(|&other| {
                if hand.beats(other) {
                    1
                } else if other.beats(hand) {
                    -1
                } else {
                    0
                }
            })
            .sum();
        let outcome = match score {
            s if s > 0 => Outcome::Win,
            s if s < 0 => Outcome::Lose,
            _ => Outcome::Draw,
        };
        MoveScore { score, outcome }
    }
}
