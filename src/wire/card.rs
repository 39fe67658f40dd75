use crate::error::WireError;
use std::fmt;

/// Card rank, totally ordered `Two < Three < ... < Ten < Jack < Queen < King < Ace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    /// Wire token: single rank characters, except `"10"` for Ten.
    pub fn as_wire(self) -> &'static str {
        match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        }
    }

    pub fn from_wire(token: &str) -> Result<Self, WireError> {
        Ok(match token {
            "2" => Rank::Two,
            "3" => Rank::Three,
            "4" => Rank::Four,
            "5" => Rank::Five,
            "6" => Rank::Six,
            "7" => Rank::Seven,
            "8" => Rank::Eight,
            "9" => Rank::Nine,
            "10" => Rank::Ten,
            "J" => Rank::Jack,
            "Q" => Rank::Queen,
            "K" => Rank::King,
            "A" => Rank::Ace,
            other => return Err(WireError::BadRank(other.to_string())),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    pub fn as_wire(self) -> char {
        match self {
            Suit::Club => 'C',
            Suit::Diamond => 'D',
            Suit::Heart => 'H',
            Suit::Spade => 'S',
        }
    }

    pub fn from_wire(c: char) -> Result<Self, WireError> {
        Ok(match c {
            'C' => Suit::Club,
            'D' => Suit::Diamond,
            'H' => Suit::Heart,
            'S' => Suit::Spade,
            other => return Err(WireError::BadSuit(other)),
        })
    }
}

/// A playing card: `(rank, suit)`, serialised as rank-token then suit-char
/// with no separator (`"10"` + `"H"` => `"10H"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// The standard 52-card deck in a fixed, deterministic order (suit-major,
    /// rank-minor) — used to validate that a deal's four hands partition it.
    pub fn standard_deck() -> Vec<Card> {
        let mut deck = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                deck.push(Card::new(rank, suit));
            }
        }
        deck
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.as_wire(), self.suit.as_wire())
    }
}

/// Reads exactly one card from the front of `s`, returning the remainder.
///
/// Implements the codec rule from spec §4.1: read the rank character, peek
/// for a following `0` to collapse the `"1"`+`"0"` pair into Ten, then read
/// the suit character. Never panics on malformed input.
pub fn take_card(s: &str) -> Result<(Card, &str), WireError> {
    let mut chars = s.char_indices();
    let (_, first) = chars
        .next()
        .ok_or_else(|| WireError::Malformed("expected a card, found end of input".into()))?;

    let (rank_str, rest) = if first == '1' {
        match chars.next() {
            Some((idx, '0')) => {
                let end = idx + 1;
                (&s[..end], &s[end..])
            }
            _ => return Err(WireError::BadRank("1".into())),
        }
    } else {
        let end = first.len_utf8();
        (&s[..end], &s[end..])
    };

    let rank = Rank::from_wire(rank_str)?;

    let mut rest_chars = rest.char_indices();
    let (_, suit_ch) = rest_chars
        .next()
        .ok_or_else(|| WireError::Malformed("card missing suit character".into()))?;
    let suit = Suit::from_wire(suit_ch)?;
    let suit_end = suit_ch.len_utf8();

    Ok((Card::new(rank, suit), &rest[suit_end..]))
}

/// Reads exactly `n` consecutive cards, erroring if fewer are present or if
/// trailing bytes remain that are not a further card when more are expected.
pub fn take_n_cards(mut s: &str, n: usize) -> Result<(Vec<Card>, &str), WireError> {
    let mut cards = Vec::with_capacity(n);
    for _ in 0..n {
        let (card, rest) = take_card(s)?;
        cards.push(card);
        s = rest;
    }
    Ok((cards, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_card() {
        for card in Card::standard_deck() {
            let wire = card.to_string();
            let (parsed, rest) = take_card(&wire).unwrap();
            assert_eq!(parsed, card);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn ten_is_two_chars_never_standalone() {
        let (card, rest) = take_card("10H").unwrap();
        assert_eq!(card, Card::new(Rank::Ten, Suit::Heart));
        assert!(rest.is_empty());

        assert!(take_card("1H").is_err());
    }

    #[test]
    fn rank_order_is_total() {
        assert!(Rank::Two < Rank::Three);
        assert!(Rank::Ten < Rank::Jack);
        assert!(Rank::King < Rank::Ace);
    }

    #[test]
    fn deck_has_52_distinct_cards() {
        let deck = Card::standard_deck();
        assert_eq!(deck.len(), 52);
        let unique: std::collections::HashSet<_> = deck.iter().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn take_n_cards_stops_exactly_at_n() {
        let (cards, rest) = take_n_cards("2C3D4H", 2).unwrap();
        assert_eq!(cards, vec![Card::new(Rank::Two, Suit::Club), Card::new(Rank::Three, Suit::Diamond)]);
        assert_eq!(rest, "4H");
    }
}
