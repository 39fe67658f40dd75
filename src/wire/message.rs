use crate::error::WireError;
use crate::scoring::DealType;
use crate::seats::Seat;
use crate::wire::card::{take_n_cards, Card};
use std::fmt;

/// One protocol message, direction-agnostic. Both the server and the client
/// decode and encode the same enum; the session loops are responsible for
/// rejecting messages that are well-formed but out of place for the current
/// direction/state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `IAM<X>` — client announces its seat.
    Iam(Seat),
    /// `BUSY<list>` — seat already taken; list is 1-4 occupied seat letters.
    Busy(Vec<Seat>),
    /// `DEAL<type><leader><13 cards>`.
    Deal { deal_type: DealType, leader: Seat, hand: Vec<Card> },
    /// `TRICK<n><0..3 cards>` server->client, or `TRICK<n><card>` client->server.
    Trick { trick_no: u32, cards: Vec<Card> },
    /// `WRONG<n>`.
    Wrong { trick_no: u32 },
    /// `TAKEN<n><4 cards><winner>`.
    Taken { trick_no: u32, cards: [Card; 4], winner: Seat },
    /// `SCORE<N><n><E><n><S><n><W><n>`.
    Score { points: [u32; 4] },
    /// `TOTAL<...>`, same shape as `Score`.
    Total { points: [u32; 4] },
}

impl Message {
    /// Parses one already-framed (CRLF-stripped) message line.
    pub fn parse(line: &str) -> Result<Self, WireError> {
        if let Some(rest) = line.strip_prefix("IAM") {
            let seat = one_char(rest)?;
            return Ok(Message::Iam(Seat::from_wire(seat)?));
        }
        if let Some(rest) = line.strip_prefix("BUSY") {
            if rest.is_empty() || rest.len() > 4 {
                return Err(WireError::Malformed(format!("bad BUSY list {rest:?}")));
            }
            let seats = rest
                .chars()
                .map(Seat::from_wire)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Message::Busy(seats));
        }
        if let Some(rest) = line.strip_prefix("DEAL") {
            let mut chars = rest.char_indices();
            let (_, type_ch) = chars
                .next()
                .ok_or_else(|| WireError::Malformed("DEAL missing type".into()))?;
            let deal_type = DealType::from_wire(type_ch)
                .ok_or_else(|| WireError::Malformed(format!("bad deal type {type_ch:?}")))?;
            let (_, leader_ch) = chars
                .next()
                .ok_or_else(|| WireError::Malformed("DEAL missing leader".into()))?;
            let leader = Seat::from_wire(leader_ch)?;
            let cards_start = type_ch.len_utf8() + leader_ch.len_utf8();
            let (hand, remainder) = take_n_cards(&rest[cards_start..], 13)?;
            if !remainder.is_empty() {
                return Err(WireError::Malformed(format!("trailing bytes in DEAL: {remainder:?}")));
            }
            return Ok(Message::Deal { deal_type, leader, hand });
        }
        if let Some(rest) = line.strip_prefix("WRONG") {
            let trick_no = parse_trick_no(rest)?;
            return Ok(Message::Wrong { trick_no });
        }
        if let Some(rest) = line.strip_prefix("TRICK") {
            let (digits, after_digits) = split_leading_digits(rest)?;
            let trick_no: u32 = digits
                .parse()
                .map_err(|_| WireError::Malformed(format!("bad trick number {digits:?}")))?;
            // 0..=3 cards may follow (server view) or exactly 1 (client reply);
            // the codec stays permissive here and lets the referee enforce
            // the exact count expected for the current direction/state.
            let mut cards = Vec::new();
            let mut remainder = after_digits;
            while !remainder.is_empty() {
                let (card, rest) = take_card(remainder)?;
                cards.push(card);
                remainder = rest;
            }
            if cards.len() > 4 {
                return Err(WireError::Malformed("TRICK carries more than 4 cards".into()));
            }
            return Ok(Message::Trick { trick_no, cards });
        }
        if let Some(rest) = line.strip_prefix("TAKEN") {
            let (digits, after_digits) = split_leading_digits(rest)?;
            let trick_no: u32 = digits
                .parse()
                .map_err(|_| WireError::Malformed(format!("bad trick number {digits:?}")))?;
            let (cards, after_cards) = take_n_cards(after_digits, 4)?;
            let mut winner_chars = after_cards.char_indices();
            let (_, winner_ch) = winner_chars
                .next()
                .ok_or_else(|| WireError::Malformed("TAKEN missing winner".into()))?;
            let winner = Seat::from_wire(winner_ch)?;
            if after_cards[winner_ch.len_utf8()..].len() != 0 {
                return Err(WireError::Malformed("trailing bytes in TAKEN".into()));
            }
            let cards: [Card; 4] = cards
                .try_into()
                .map_err(|_| WireError::Malformed("TAKEN must carry exactly 4 cards".into()))?;
            return Ok(Message::Taken { trick_no, cards, winner });
        }
        if let Some(rest) = line.strip_prefix("SCORE") {
            return Ok(Message::Score { points: parse_per_seat_points(rest)? });
        }
        if let Some(rest) = line.strip_prefix("TOTAL") {
            return Ok(Message::Total { points: parse_per_seat_points(rest)? });
        }
        Err(WireError::Malformed(format!("unrecognised message {line:?}")))
    }
}

fn one_char(s: &str) -> Result<char, WireError> {
    let mut chars = s.chars();
    let c = chars
        .next()
        .ok_or_else(|| WireError::Malformed("expected one more character".into()))?;
    if chars.next().is_some() {
        return Err(WireError::Malformed(format!("expected exactly one character, got {s:?}")));
    }
    Ok(c)
}

fn split_leading_digits(s: &str) -> Result<(&str, &str), WireError> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return Err(WireError::Malformed(format!("expected a decimal number, got {s:?}")));
    }
    Ok((&s[..end], &s[end..]))
}

fn parse_trick_no(s: &str) -> Result<u32, WireError> {
    s.parse()
        .map_err(|_| WireError::Malformed(format!("bad trick number {s:?}")))
}

fn take_card(s: &str) -> Result<(Card, &str), WireError> {
    crate::wire::card::take_card(s)
}

/// `<N><n><E><n><S><n><W><n>` shared by SCORE and TOTAL.
fn parse_per_seat_points(s: &str) -> Result<[u32; 4], WireError> {
    let mut points = [0u32; 4];
    let mut rest = s;
    for seat in Seat::ALL {
        let mut chars = rest.char_indices();
        let (_, letter) = chars
            .next()
            .ok_or_else(|| WireError::Malformed("missing seat letter in score".into()))?;
        let parsed_seat = Seat::from_wire(letter)?;
        if parsed_seat != seat {
            return Err(WireError::Malformed(format!(
                "expected seat {seat} next in score, found {parsed_seat}"
            )));
        }
        let after_letter = &rest[letter.len_utf8()..];
        let (digits, after_digits) = split_leading_digits(after_letter)?;
        points[seat.index()] = digits
            .parse()
            .map_err(|_| WireError::Malformed(format!("bad score number {digits:?}")))?;
        rest = after_digits;
    }
    if !rest.is_empty() {
        return Err(WireError::Malformed(format!("trailing bytes in score: {rest:?}")));
    }
    Ok(points)
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Iam(seat) => write!(f, "IAM{seat}"),
            Message::Busy(seats) => {
                write!(f, "BUSY")?;
                for s in seats {
                    write!(f, "{s}")?;
                }
                Ok(())
            }
            Message::Deal { deal_type, leader, hand } => {
                write!(f, "DEAL{}{leader}", deal_type.as_wire())?;
                for c in hand {
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Message::Trick { trick_no, cards } => {
                write!(f, "TRICK{trick_no}")?;
                for c in cards {
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Message::Wrong { trick_no } => write!(f, "WRONG{trick_no}"),
            Message::Taken { trick_no, cards, winner } => {
                write!(f, "TAKEN{trick_no}")?;
                for c in cards {
                    write!(f, "{c}")?;
                }
                write!(f, "{winner}")
            }
            Message::Score { points } => write_points("SCORE", points, f),
            Message::Total { points } => write_points("TOTAL", points, f),
        }
    }
}

fn write_points(tag: &str, points: &[u32; 4], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{tag}")?;
    for seat in Seat::ALL {
        write!(f, "{seat}{}", points[seat.index()])?;
    }
    Ok(())
}
