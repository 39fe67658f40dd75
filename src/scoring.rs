use crate::wire::card::{Card, Rank, Suit};
use std::fmt;

/// Selects which of the seven scoring rules governs a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealType {
    Tricks,      // 1: +1 per trick
    Hearts,      // 2: +1 per heart card taken
    Queens,      // 3: +5 per queen taken
    JacksKings,  // 4: +2 per jack or king taken
    KingOfHearts,// 5: +18 if K♥ is in the trick
    LastTwo,     // 6: +10 for the 7th and 13th tricks
    All,         // 7: sum of rules 1..6
}

impl DealType {
    pub fn from_wire(c: char) -> Option<Self> {
        Some(match c {
            '1' => DealType::Tricks,
            '2' => DealType::Hearts,
            '3' => DealType::Queens,
            '4' => DealType::JacksKings,
            '5' => DealType::KingOfHearts,
            '6' => DealType::LastTwo,
            '7' => DealType::All,
            _ => return None,
        })
    }

    pub fn as_wire(self) -> char {
        match self {
            DealType::Tricks => '1',
            DealType::Hearts => '2',
            DealType::Queens => '3',
            DealType::JacksKings => '4',
            DealType::KingOfHearts => '5',
            DealType::LastTwo => '6',
            DealType::All => '7',
        }
    }

    /// Σ points over all 13 tricks for this deal type — used to validate
    /// the deal-total invariant (spec §8, property 3).
    pub fn deal_total(self) -> u32 {
        match self {
            DealType::Tricks => 13,
            DealType::Hearts => 13,
            DealType::Queens => 20,
            DealType::JacksKings => 16,
            DealType::KingOfHearts => 18,
            DealType::LastTwo => 20,
            DealType::All => 13 + 13 + 20 + 16 + 18 + 20,
        }
    }
}

impl fmt::Display for DealType {
    /// Human-readable rule summary, used by the interactive client.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DealType::Tricks => "tricks (+1 each)",
            DealType::Hearts => "hearts (+1 per heart)",
            DealType::Queens => "queens (+5 each)",
            DealType::JacksKings => "jacks & kings (+2 each)",
            DealType::KingOfHearts => "king of hearts (+18)",
            DealType::LastTwo => "7th & 13th tricks (+10 each)",
            DealType::All => "all rules combined",
        };
        write!(f, "{name}")
    }
}

/// Points awarded to the winner of trick `trick_idx` (0-indexed, 0..13)
/// given the four cards played in that trick, under `deal_type`.
pub fn trick_points(deal_type: DealType, trick_idx: usize, cards: &[Card; 4]) -> u32 {
    match deal_type {
        DealType::Tricks => 1,
        DealType::Hearts => count_hearts(cards),
        DealType::Queens => count_queens(cards) * 5,
        DealType::JacksKings => count_jacks_or_kings(cards) * 2,
        DealType::KingOfHearts => {
            if has_king_of_hearts(cards) { 18 } else { 0 }
        }
        DealType::LastTwo => {
            if trick_idx == 6 || trick_idx == 12 { 10 } else { 0 }
        }
        DealType::All => {
            trick_points(DealType::Tricks, trick_idx, cards)
                + trick_points(DealType::Hearts, trick_idx, cards)
                + trick_points(DealType::Queens, trick_idx, cards)
                + trick_points(DealType::JacksKings, trick_idx, cards)
                + trick_points(DealType::KingOfHearts, trick_idx, cards)
                + trick_points(DealType::LastTwo, trick_idx, cards)
        }
    }
}

fn count_hearts(cards: &[Card; 4]) -> u32 {
    cards.iter().filter(|c| c.suit == Suit::Heart).count() as u32
}

fn count_queens(cards: &[Card; 4]) -> u32 {
    cards.iter().filter(|c| c.rank == Rank::Queen).count() as u32
}

fn count_jacks_or_kings(cards: &[Card; 4]) -> u32 {
    cards
        .iter()
        .filter(|c| c.rank == Rank::Jack || c.rank == Rank::King)
        .count() as u32
}

fn has_king_of_hearts(cards: &[Card; 4]) -> bool {
    cards.iter().any(|c| c.rank == Rank::King && c.suit == Suit::Heart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::card::Card;

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn type1_awards_one_per_trick() {
        let cards = [
            c(Rank::Two, Suit::Club),
            c(Rank::Three, Suit::Club),
            c(Rank::Four, Suit::Club),
            c(Rank::Five, Suit::Club),
        ];
        assert_eq!(trick_points(DealType::Tricks, 0, &cards), 1);
    }

    #[test]
    fn type2_counts_hearts() {
        let cards = [
            c(Rank::Two, Suit::Heart),
            c(Rank::Three, Suit::Heart),
            c(Rank::Four, Suit::Club),
            c(Rank::King, Suit::Heart),
        ];
        assert_eq!(trick_points(DealType::Hearts, 0, &cards), 3);
    }

    #[test]
    fn type3_counts_queens_times_five() {
        let cards = [
            c(Rank::Queen, Suit::Heart),
            c(Rank::Queen, Suit::Club),
            c(Rank::Four, Suit::Club),
            c(Rank::King, Suit::Heart),
        ];
        assert_eq!(trick_points(DealType::Queens, 0, &cards), 10);
    }

    #[test]
    fn type5_king_of_hearts_bonus() {
        let with = [
            c(Rank::King, Suit::Heart),
            c(Rank::Two, Suit::Club),
            c(Rank::Three, Suit::Club),
            c(Rank::Four, Suit::Club),
        ];
        let without = [
            c(Rank::King, Suit::Club),
            c(Rank::Two, Suit::Club),
            c(Rank::Three, Suit::Club),
            c(Rank::Four, Suit::Club),
        ];
        assert_eq!(trick_points(DealType::KingOfHearts, 3, &with), 18);
        assert_eq!(trick_points(DealType::KingOfHearts, 3, &without), 0);
    }

    #[test]
    fn type6_only_seventh_and_thirteenth_tricks() {
        let cards = [
            c(Rank::Two, Suit::Club),
            c(Rank::Three, Suit::Club),
            c(Rank::Four, Suit::Club),
            c(Rank::Five, Suit::Club),
        ];
        assert_eq!(trick_points(DealType::LastTwo, 5, &cards), 0);
        assert_eq!(trick_points(DealType::LastTwo, 6, &cards), 10);
        assert_eq!(trick_points(DealType::LastTwo, 12, &cards), 10);
    }

    #[test]
    fn type7_is_sum_of_types_one_through_six() {
        let cards = [
            c(Rank::King, Suit::Heart),
            c(Rank::Queen, Suit::Heart),
            c(Rank::Jack, Suit::Club),
            c(Rank::Ten, Suit::Club),
        ];
        let expected: u32 = (1..=6)
            .map(|t| trick_points(DealType::from_wire(char::from_digit(t, 10).unwrap()).unwrap(), 6, &cards))
            .sum();
        assert_eq!(trick_points(DealType::All, 6, &cards), expected);
    }

    #[test]
    fn deal_totals_match_spec_constants() {
        assert_eq!(DealType::Tricks.deal_total(), 13);
        assert_eq!(DealType::Hearts.deal_total(), 13);
        assert_eq!(DealType::Queens.deal_total(), 20);
        assert_eq!(DealType::JacksKings.deal_total(), 16);
        assert_eq!(DealType::KingOfHearts.deal_total(), 18);
        assert_eq!(DealType::LastTwo.deal_total(), 20);
        assert_eq!(DealType::All.deal_total(), 98);
    }
}
