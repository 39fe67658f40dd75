//! Drives `KierkiCodec` directly against in-memory buffers, simulating a
//! short session's worth of traffic (seat claim, a dealt hand, one full
//! trick, score and running total) without opening a socket. Also exercises
//! `SeatTable` as the admission layer a real listener would drive.

use bytes::BytesMut;
use kierki::scoring::DealType;
use kierki::seats::{Seat, SeatTable};
use kierki::wire::card::{Card, Rank, Suit};
use kierki::wire::{KierkiCodec, Message};
use tokio_util::codec::{Decoder, Encoder};

fn encode_all(codec: &mut KierkiCodec, messages: &[Message]) -> BytesMut {
    let mut buf = BytesMut::new();
    for msg in messages {
        codec.encode(msg.clone(), &mut buf).unwrap();
    }
    buf
}

fn decode_all(codec: &mut KierkiCodec, mut buf: BytesMut) -> Vec<Message> {
    let mut out = Vec::new();
    while let Some(msg) = codec.decode(&mut buf).unwrap() {
        out.push(msg);
    }
    assert!(buf.is_empty(), "leftover bytes after decoding a complete session");
    out
}

#[test]
fn a_full_trick_exchange_round_trips_through_the_codec() {
    let hand = Card::standard_deck()[..13].to_vec();
    let messages = vec![
        Message::Iam(Seat::North),
        Message::Deal { deal_type: DealType::Tricks, leader: Seat::North, hand },
        Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Two, Suit::Club)] },
        Message::Wrong { trick_no: 1 },
        Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Three, Suit::Club)] },
        Message::Taken {
            trick_no: 1,
            cards: [
                Card::new(Rank::Three, Suit::Club),
                Card::new(Rank::Four, Suit::Club),
                Card::new(Rank::Five, Suit::Club),
                Card::new(Rank::Six, Suit::Club),
            ],
            winner: Seat::West,
        },
        Message::Score { points: [0, 0, 0, 1] },
        Message::Total { points: [13, 0, 0, 1] },
    ];

    let mut codec = KierkiCodec;
    let buf = encode_all(&mut codec, &messages);
    let decoded = decode_all(&mut codec, buf);
    assert_eq!(decoded, messages);
}

/// Frames arriving split across several reads (as a slow client would
/// deliver them byte-by-byte) still decode one at a time, never early and
/// never merged.
#[test]
fn frames_split_across_multiple_buffer_fills_still_decode_one_at_a_time() {
    let mut codec = KierkiCodec;
    let whole = encode_all(
        &mut codec,
        &[Message::Iam(Seat::South), Message::Wrong { trick_no: 4 }],
    );

    let mut partial = BytesMut::new();
    let mut decoded = Vec::new();
    for byte in whole.iter().copied() {
        partial.extend_from_slice(&[byte]);
        while let Some(msg) = codec.decode(&mut partial).unwrap() {
            decoded.push(msg);
        }
    }

    assert_eq!(decoded, vec![Message::Iam(Seat::South), Message::Wrong { trick_no: 4 }]);
}

#[test]
fn seat_admission_rejects_a_second_claim_on_an_already_occupied_seat() {
    let mut table: SeatTable<u32> = SeatTable::new();
    assert!(table.is_vacant(Seat::East));
    table.seat(Seat::East, 1);
    assert!(!table.is_vacant(Seat::East));

    // A second connection claiming the same seat must be refused by the
    // caller (the table itself just reports occupancy); the session loop
    // would reply BUSY<occupied letters> instead of calling `seat` again.
    let busy = Message::Busy(
        Seat::ALL
            .into_iter()
            .filter(|&s| !table.is_vacant(s))
            .collect(),
    );
    assert_eq!(busy, Message::Busy(vec![Seat::East]));

    table.seat(Seat::West, 2);
    assert!(!table.all_occupied());
    table.seat(Seat::North, 3);
    table.seat(Seat::South, 4);
    assert!(table.all_occupied());
}
