use crate::deal::DealSpec;
use crate::scoring::{self, DealType};
use crate::seats::Seat;
use crate::wire::card::{Card, Suit};
use std::collections::HashSet;

/// Why a `TRICK` reply from a client was rejected (spec §4.4, step 2). Every
/// variant maps to a `WRONG<n>` reply; the referee never distinguishes them
/// on the wire, but keeping them distinct makes the logic and its tests
/// legible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayError {
    NotYourTurn,
    WrongTrickNumber,
    CardNotHeld,
    MustFollowSuit,
}

/// What happened to a trick after a play was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The trick still needs more plays.
    Continuing,
    /// The fourth card completed the trick; carries the resolved result.
    TrickComplete(TrickResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrickResult {
    pub trick_no: u32,
    pub cards: [Card; 4],
    pub winner: Seat,
    pub points: u32,
    pub deal_complete: bool,
}

/// Mutable per-deal state: each seat's remaining hand, the in-progress
/// trick, and the running per-seat points (spec §3 `HandState`).
#[derive(Debug, Clone)]
pub struct HandState {
    deal_type: DealType,
    remaining: [HashSet<Card>; 4],
    trick_idx: usize, // 0-based, 0..13
    lead_seat: Seat,
    plays: Vec<(Seat, Card)>,
    points: [u32; 4],
    taken_history: Vec<(Seat, [Card; 4])>,
}

impl HandState {
    pub fn new(deal: &DealSpec) -> Self {
        let mut remaining: [HashSet<Card>; 4] = Default::default();
        for seat in Seat::ALL {
            remaining[seat.index()] = deal.hand(seat).iter().copied().collect();
        }
        Self {
            deal_type: deal.deal_type,
            remaining,
            trick_idx: 0,
            lead_seat: deal.first_leader,
            plays: Vec::with_capacity(4),
            points: [0; 4],
            taken_history: Vec::with_capacity(13),
        }
    }

    pub fn trick_no(&self) -> u32 {
        self.trick_idx as u32 + 1
    }

    pub fn points(&self) -> [u32; 4] {
        self.points
    }

    pub fn holds(&self, seat: Seat, card: Card) -> bool {
        self.remaining[seat.index()].contains(&card)
    }

    pub fn remaining_count(&self, seat: Seat) -> usize {
        self.remaining[seat.index()].len()
    }

    /// Seat expected to play next, given how many cards have landed in the
    /// current trick.
    pub fn next_to_play(&self) -> Seat {
        let mut seat = self.lead_seat;
        for _ in 0..self.plays.len() {
            seat = seat.next();
        }
        seat
    }

    /// Cards played so far this trick, in play order — used to build the
    /// in-flight `TRICK<n>` prompt (spec §4.3 catch-up burst, §4.4 step 1).
    pub fn plays_so_far(&self) -> Vec<Card> {
        self.plays.iter().map(|(_, c)| *c).collect()
    }

    pub fn completed_tricks(&self) -> &[(Seat, [Card; 4])] {
        &self.taken_history
    }

    pub fn deal_complete(&self) -> bool {
        self.trick_idx >= 13
    }

    /// Lead suit of the in-progress trick, if any card has been played yet.
    fn lead_suit(&self) -> Option<Suit> {
        self.plays.first().map(|(_, c)| c.suit)
    }

    /// Validates and applies a play from `seat` for wire trick number
    /// `trick_no`. On success, advances state and returns whether the trick
    /// completed.
    pub fn apply_play(
        &mut self,
        seat: Seat,
        trick_no: u32,
        card: Card,
    ) -> Result<PlayOutcome, PlayError> {
        if seat != self.next_to_play() {
            return Err(PlayError::NotYourTurn);
        }
        if trick_no != self.trick_no() {
            return Err(PlayError::WrongTrickNumber);
        }
        if !self.holds(seat, card) {
            return Err(PlayError::CardNotHeld);
        }
        if let Some(lead) = self.lead_suit() {
            if card.suit != lead && self.remaining[seat.index()].iter().any(|c| c.suit == lead) {
                return Err(PlayError::MustFollowSuit);
            }
        }

        self.remaining[seat.index()].remove(&card);
        self.plays.push((seat, card));

        if self.plays.len() < 4 {
            return Ok(PlayOutcome::Continuing);
        }

        Ok(PlayOutcome::TrickComplete(self.resolve_trick()))
    }

    fn resolve_trick(&mut self) -> TrickResult {
        let lead_suit = self.lead_suit().expect("trick cannot resolve with no plays");
        let (winner, _) = self
            .plays
            .iter()
            .filter(|(_, c)| c.suit == lead_suit)
            .max_by_key(|(_, c)| c.rank)
            .copied()
            .expect("lead suit is always held by at least the leader");

        let mut cards_by_seat = [None; 4];
        for &(seat, card) in &self.plays {
            cards_by_seat[seat.index()] = Some(card);
        }
        // Cards in canonical N,E,S,W order for the TAKEN broadcast and the
        // scoring engine, matching the original server's wire layout.
        let cards: [Card; 4] = cards_by_seat.map(|c| c.expect("all four seats played"));

        let points = scoring::trick_points(self.deal_type, self.trick_idx, &cards);
        self.points[winner.index()] += points;
        self.taken_history.push((winner, cards));

        let trick_no = self.trick_no();
        self.trick_idx += 1;
        self.lead_seat = winner;
        self.plays.clear();

        TrickResult {
            trick_no,
            cards,
            winner,
            points,
            deal_complete: self.trick_idx >= 13,
        }
    }
}
