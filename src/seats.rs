use crate::error::WireError;
use std::fmt;

/// One of the four table positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    North,
    East,
    South,
    West,
}

impl Seat {
    pub const ALL: [Seat; 4] = [Seat::North, Seat::East, Seat::South, Seat::West];

    pub fn as_wire(self) -> char {
        match self {
            Seat::North => 'N',
            Seat::East => 'E',
            Seat::South => 'S',
            Seat::West => 'W',
        }
    }

    pub fn from_wire(c: char) -> Result<Self, WireError> {
        Ok(match c {
            'N' => Seat::North,
            'E' => Seat::East,
            'S' => Seat::South,
            'W' => Seat::West,
            other => return Err(WireError::BadSeat(other)),
        })
    }

    /// Clockwise successor: N -> E -> S -> W -> N.
    pub fn next(self) -> Seat {
        match self {
            Seat::North => Seat::East,
            Seat::East => Seat::South,
            Seat::South => Seat::West,
            Seat::West => Seat::North,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::North => 0,
            Seat::East => 1,
            Seat::South => 2,
            Seat::West => 3,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

/// Tracks which of the four seats is currently occupied, and by which
/// connection id. A seat is vacant iff its entry is `None`.
#[derive(Debug, Default)]
pub struct SeatTable<Id> {
    occupants: [Option<Id>; 4],
}

impl<Id: Copy + PartialEq> SeatTable<Id> {
    pub fn new() -> Self {
        Self { occupants: [None, None, None, None] }
    }

    pub fn is_vacant(&self, seat: Seat) -> bool {
        self.occupants[seat.index()].is_none()
    }

    pub fn occupant(&self, seat: Seat) -> Option<Id> {
        self.occupants[seat.index()]
    }

    pub fn seat_of(&self, id: Id) -> Option<Seat> {
        Seat::ALL.into_iter().find(|&s| self.occupants[s.index()] == Some(id))
    }

    /// Seats a connection. Caller must have already checked `is_vacant`.
    pub fn seat(&mut self, seat: Seat, id: Id) {
        self.occupants[seat.index()] = Some(id);
    }

    /// Frees a seat, e.g. on disconnect.
    pub fn vacate(&mut self, seat: Seat) {
        self.occupants[seat.index()] = None;
    }

    pub fn all_occupied(&self) -> bool {
        self.occupants.iter().all(Option::is_some)
    }

    /// Seat letters of every currently occupied seat, in canonical N,E,S,W
    /// order — used to build the `BUSY<list>` message (spec §4.1, §4.3).
    pub fn occupied_letters(&self) -> String {
        Seat::ALL
            .into_iter()
            .filter(|&s| self.occupant(s).is_some())
            .map(|s| s.as_wire())
            .collect()
    }
}
