use crate::deal::DealSpec;
use crate::seats::Seat;

/// Ordered list of scripted deals plus the cumulative per-seat totals
/// carried across completed deals (spec §3 `TournamentState`).
pub struct TournamentState {
    deals: Vec<DealSpec>,
    current: usize,
    totals: [u32; 4],
}

impl TournamentState {
    pub fn new(deals: Vec<DealSpec>) -> Self {
        Self { deals, current: 0, totals: [0; 4] }
    }

    pub fn current_deal(&self) -> Option<&DealSpec> {
        self.deals.get(self.current)
    }

    pub fn totals(&self) -> [u32; 4] {
        self.totals
    }

    /// Folds a completed deal's per-seat points into the running totals and
    /// advances to the next scripted deal, if any.
    pub fn finish_current_deal(&mut self, points: [u32; 4]) {
        for seat in Seat::ALL {
            self.totals[seat.index()] += points[seat.index()];
        }
        self.current += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.deals.len()
    }
}
