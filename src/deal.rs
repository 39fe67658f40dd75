use crate::error::DealFileError;
use crate::scoring::DealType;
use crate::seats::Seat;
use crate::wire::card::{take_n_cards, Card};
use std::collections::HashSet;
use std::path::Path;

/// One scripted deal: scoring type, opening leader, and each seat's 13-card
/// hand in the order listed in the script file.
#[derive(Debug, Clone)]
pub struct DealSpec {
    pub deal_type: DealType,
    pub first_leader: Seat,
    pub hands: [Vec<Card>; 4],
}

impl DealSpec {
    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat.index()]
    }
}

/// Parses a deal-script file into an ordered list of [`DealSpec`] (spec
/// §4.2, §6.3): repeating groups of 5 lines (one header, four hands in
/// N,E,S,W order). Fatal at startup on any malformed record.
pub fn load_deal_script(path: &Path) -> Result<Vec<DealSpec>, DealFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DealFileError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let lines: Vec<&str> = contents.lines().collect();
    if lines.is_empty() || lines.len() % 5 != 0 {
        return Err(DealFileError::BadLineCount(lines.len()));
    }

    let mut deals = Vec::with_capacity(lines.len() / 5);
    for (record_idx, chunk) in lines.chunks(5).enumerate() {
        deals.push(parse_record(record_idx, chunk)?);
    }
    Ok(deals)
}

fn parse_record(record_idx: usize, chunk: &[&str]) -> Result<DealSpec, DealFileError> {
    let header = chunk[0];
    let mut header_chars = header.chars();
    let type_ch = header_chars
        .next()
        .ok_or_else(|| header_err(record_idx, header))?;
    let leader_ch = header_chars
        .next()
        .ok_or_else(|| header_err(record_idx, header))?;
    if header_chars.next().is_some() {
        return Err(header_err(record_idx, header));
    }
    let deal_type = DealType::from_wire(type_ch).ok_or_else(|| header_err(record_idx, header))?;
    let first_leader = Seat::from_wire(leader_ch).map_err(|_| header_err(record_idx, header))?;

    let mut hands: [Vec<Card>; 4] = Default::default();
    for (i, seat) in Seat::ALL.into_iter().enumerate() {
        let line = chunk[1 + i];
        let (cards, rest) = take_n_cards(line, 13).map_err(|_| DealFileError::BadHand {
            record: record_idx,
            seat: seat.as_wire(),
            line: line.to_string(),
        })?;
        if !rest.is_empty() {
            return Err(DealFileError::BadHand {
                record: record_idx,
                seat: seat.as_wire(),
                line: line.to_string(),
            });
        }
        hands[i] = cards;
    }

    let deck: HashSet<Card> = hands.iter().flatten().copied().collect();
    if deck.len() != 52 || hands.iter().map(|h| h.len()).sum::<usize>() != 52 {
        return Err(DealFileError::BadDeck { record: record_idx });
    }
    let standard: HashSet<Card> = Card::standard_deck().into_iter().collect();
    if deck != standard {
        return Err(DealFileError::BadDeck { record: record_idx });
    }

    Ok(DealSpec { deal_type, first_leader, hands })
}

fn header_err(record: usize, line: &str) -> DealFileError {
    DealFileError::BadHeader { record, line: line.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn single_deal_file(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{body}").unwrap();
        f
    }

    fn standard_hands_text() -> String {
        // A trivially valid partition: 13 consecutive cards per seat from
        // the canonical standard-deck ordering.
        let deck = Card::standard_deck();
        deck.chunks(13)
            .map(|chunk| chunk.iter().map(|c| c.to_string()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn parses_single_well_formed_deal() {
        let body = format!("1N\n{}\n", standard_hands_text());
        let f = single_deal_file(&body);
        let deals = load_deal_script(f.path()).unwrap();
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].deal_type, DealType::Tricks);
        assert_eq!(deals[0].first_leader, Seat::North);
        assert_eq!(deals[0].hand(Seat::North).len(), 13);
    }

    #[test]
    fn rejects_line_count_not_multiple_of_five() {
        let f = single_deal_file("1N\n2C\n");
        assert!(matches!(
            load_deal_script(f.path()),
            Err(DealFileError::BadLineCount(_))
        ));
    }

    #[test]
    fn rejects_deck_that_is_not_a_full_permutation() {
        // Repeats 2C in two hands instead of using the full deck.
        let bad_hand = "2C".repeat(13);
        let body = format!("1N\n{bad_hand}\n{bad_hand}\n{bad_hand}\n{bad_hand}\n");
        let f = single_deal_file(&body);
        assert!(matches!(
            load_deal_script(f.path()),
            Err(DealFileError::BadDeck { .. })
        ));
    }

    #[test]
    fn rejects_bad_header() {
        let body = format!("9N\n{}\n", standard_hands_text());
        let f = single_deal_file(&body);
        assert!(matches!(
            load_deal_script(f.path()),
            Err(DealFileError::BadHeader { .. })
        ));
    }

    #[test]
    fn parses_multiple_deals_in_order() {
        let one = standard_hands_text();
        let body = format!("1N\n{one}\n7E\n{one}\n");
        let f = single_deal_file(&body);
        let deals = load_deal_script(f.path()).unwrap();
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].first_leader, Seat::North);
        assert_eq!(deals[1].first_leader, Seat::East);
        assert_eq!(deals[1].deal_type, DealType::All);
    }
}
