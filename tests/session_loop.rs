//! Drives `kierki::session::Server` over real `TcpStream`s, the way an
//! actual client pair would, instead of calling into `HandState`/
//! `KierkiCodec` directly. Covers the two scenarios spec §8 calls out that
//! the other integration tests can't reach from inside the library: a
//! rejected off-suit play's `WRONG<n>` payload, and the exact catch-up burst
//! a reconnecting seat observes mid-deal.

use kierki::deal::DealSpec;
use kierki::logger::Logger;
use kierki::scoring::DealType;
use kierki::seats::Seat;
use kierki::session::Server;
use kierki::wire::card::{Card, Rank, Suit};
use kierki::wire::{KierkiCodec, Message};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

type Link = Framed<TcpStream, KierkiCodec>;

/// Starts a server on an OS-assigned loopback port and runs it on a spawned
/// task, returning the address clients should connect to.
async fn start_server(deals: Vec<DealSpec>) -> SocketAddr {
    let server = Server::bind(
        "127.0.0.1:0".parse().unwrap(),
        Duration::from_secs(5),
        deals,
        Logger::new(0),
    )
    .await
    .unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.run());
    addr
}

/// Connects, announces `seat`, and returns the framed link without consuming
/// the `DEAL` reply — callers read whatever catch-up burst they expect.
async fn connect_as(addr: SocketAddr, seat: Seat) -> Link {
    use futures::SinkExt;
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut link = Framed::new(stream, KierkiCodec);
    link.send(Message::Iam(seat)).await.unwrap();
    link
}

async fn recv(link: &mut Link) -> Message {
    use futures::StreamExt;
    link.next().await.expect("connection closed early").expect("malformed frame")
}

async fn send(link: &mut Link, msg: Message) {
    use futures::SinkExt;
    link.send(msg).await.unwrap();
}

/// A minimal deal built the way `hand.rs`'s own unit tests build one: only
/// as many cards per seat as the scenario needs, not a full 52-card
/// partition. East holds both the lead suit and an off-suit card, so it can
/// be forced into a follow-suit violation.
fn follow_suit_trap_deal() -> DealSpec {
    let mut hands: [Vec<Card>; 4] = Default::default();
    hands[Seat::North.index()] = vec![Card::new(Rank::Two, Suit::Club)];
    hands[Seat::East.index()] = vec![Card::new(Rank::Three, Suit::Club), Card::new(Rank::Four, Suit::Spade)];
    hands[Seat::South.index()] = vec![Card::new(Rank::Five, Suit::Club)];
    hands[Seat::West.index()] = vec![Card::new(Rank::Six, Suit::Club)];
    DealSpec { deal_type: DealType::Tricks, first_leader: Seat::North, hands }
}

/// Two tricks' worth of cards per seat, clubs then diamonds, so a first
/// trick can resolve before the reconnection scenario's in-flight second
/// trick begins.
fn two_trick_deal() -> DealSpec {
    let mut hands: [Vec<Card>; 4] = Default::default();
    hands[Seat::North.index()] = vec![Card::new(Rank::Two, Suit::Club), Card::new(Rank::Two, Suit::Diamond)];
    hands[Seat::East.index()] = vec![Card::new(Rank::Three, Suit::Club), Card::new(Rank::Three, Suit::Diamond)];
    hands[Seat::South.index()] = vec![Card::new(Rank::Four, Suit::Club), Card::new(Rank::Four, Suit::Diamond)];
    hands[Seat::West.index()] = vec![Card::new(Rank::Five, Suit::Club), Card::new(Rank::Five, Suit::Diamond)];
    DealSpec { deal_type: DealType::Tricks, first_leader: Seat::North, hands }
}

/// S3: a client that plays off-suit while holding the lead suit is
/// rejected, and the `WRONG<n>` it receives carries the server's own trick
/// number, not whatever bogus one the client sent alongside the illegal
/// card (the bug under review sent the client's value back verbatim).
#[tokio::test]
async fn off_suit_play_is_rejected_with_the_servers_own_trick_number() {
    let addr = start_server(vec![follow_suit_trap_deal()]).await;

    let mut north = connect_as(addr, Seat::North).await;
    let mut east = connect_as(addr, Seat::East).await;
    let mut south = connect_as(addr, Seat::South).await;
    let mut west = connect_as(addr, Seat::West).await;

    assert!(matches!(recv(&mut north).await, Message::Deal { .. }));
    assert!(matches!(recv(&mut east).await, Message::Deal { .. }));
    assert!(matches!(recv(&mut south).await, Message::Deal { .. }));
    assert!(matches!(recv(&mut west).await, Message::Deal { .. }));

    assert_eq!(recv(&mut north).await, Message::Trick { trick_no: 1, cards: vec![] });
    send(&mut north, Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Two, Suit::Club)] }).await;

    assert_eq!(
        recv(&mut east).await,
        Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Two, Suit::Club)] }
    );

    // East holds 3C (follows suit) and 4S (does not); sends the illegal 4S
    // under a deliberately wrong trick number to prove the reply ignores it.
    send(
        &mut east,
        Message::Trick { trick_no: 77, cards: vec![Card::new(Rank::Four, Suit::Spade)] },
    )
    .await;

    assert_eq!(recv(&mut east).await, Message::Wrong { trick_no: 1 });
}

/// S6: a seat that disconnects mid-deal and reconnects sees `DEAL`, then one
/// `TAKEN` per trick already resolved, then the in-flight `TRICK` prompt —
/// never replayed trick-by-trick play messages, and never missing any of
/// the completed tricks.
#[tokio::test]
async fn reconnecting_mid_deal_replays_completed_tricks_then_the_live_trick() {
    let addr = start_server(vec![two_trick_deal()]).await;

    let mut north = connect_as(addr, Seat::North).await;
    let mut east = connect_as(addr, Seat::East).await;
    let mut south = connect_as(addr, Seat::South).await;
    let mut west = connect_as(addr, Seat::West).await;

    for link in [&mut north, &mut east, &mut south, &mut west] {
        assert!(matches!(recv(link).await, Message::Deal { .. }));
    }

    // Trick 1: N, E, S, W all play clubs; West's 5C wins.
    assert_eq!(recv(&mut north).await, Message::Trick { trick_no: 1, cards: vec![] });
    send(&mut north, Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Two, Suit::Club)] }).await;

    recv(&mut east).await;
    send(&mut east, Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Three, Suit::Club)] }).await;

    recv(&mut south).await;
    send(&mut south, Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Four, Suit::Club)] }).await;

    recv(&mut west).await;
    send(&mut west, Message::Trick { trick_no: 1, cards: vec![Card::new(Rank::Five, Suit::Club)] }).await;

    let taken1 = Message::Taken {
        trick_no: 1,
        cards: [
            Card::new(Rank::Two, Suit::Club),
            Card::new(Rank::Three, Suit::Club),
            Card::new(Rank::Four, Suit::Club),
            Card::new(Rank::Five, Suit::Club),
        ],
        winner: Seat::West,
    };
    for link in [&mut north, &mut east, &mut south, &mut west] {
        assert_eq!(recv(link).await, taken1.clone());
    }

    // Trick 2 (diamonds): West leads, then North, then East — South's turn
    // is still pending when South disconnects.
    assert_eq!(recv(&mut west).await, Message::Trick { trick_no: 2, cards: vec![] });
    send(&mut west, Message::Trick { trick_no: 2, cards: vec![Card::new(Rank::Five, Suit::Diamond)] }).await;

    assert_eq!(
        recv(&mut north).await,
        Message::Trick { trick_no: 2, cards: vec![Card::new(Rank::Five, Suit::Diamond)] }
    );
    send(&mut north, Message::Trick { trick_no: 2, cards: vec![Card::new(Rank::Two, Suit::Diamond)] }).await;

    assert_eq!(
        recv(&mut east).await,
        Message::Trick {
            trick_no: 2,
            cards: vec![Card::new(Rank::Five, Suit::Diamond), Card::new(Rank::Two, Suit::Diamond)],
        }
    );

    drop(south);
    // Give the server's event loop a chance to observe the EOF and vacate
    // the seat before East's play lands, so the ordering below is fixed.
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(&mut east, Message::Trick { trick_no: 2, cards: vec![Card::new(Rank::Three, Suit::Diamond)] }).await;

    let mut south = connect_as(addr, Seat::South).await;
    assert!(matches!(recv(&mut south).await, Message::Deal { .. }));
    assert_eq!(recv(&mut south).await, taken1);
    assert_eq!(
        recv(&mut south).await,
        Message::Trick {
            trick_no: 2,
            cards: vec![
                Card::new(Rank::Five, Suit::Diamond),
                Card::new(Rank::Two, Suit::Diamond),
                Card::new(Rank::Three, Suit::Diamond),
            ],
        }
    );
}
