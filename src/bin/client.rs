use clap::{ArgGroup, Parser};
use futures::{SinkExt, StreamExt};
use kierki::config::AddrFamily;
use kierki::logger::Logger;
use kierki::scoring::DealType;
use kierki::seats::Seat;
use kierki::wire::{Card, KierkiCodec, Message};
use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write as _};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use tokio_util::codec::Framed;

// ── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "kierki-client",
    version,
    about = "Kierki tournament client",
    long_about = "Connects to a running Kierki server and occupies one seat.\n\
                  In automatic mode the client plays every trick by itself;\n\
                  otherwise it reads commands from the terminal:\n  \
                    cards     — list the cards still in hand\n  \
                    tricks    — list the tricks taken so far this deal\n  \
                    !<card>   — play a card, e.g. !10H or !QC"
)]
#[command(group(ArgGroup::new("seat").args(["north", "east", "south", "west"]).required(true)))]
struct Args {
    /// Server host to connect to.
    #[arg(short = 'h', long)]
    host: String,

    /// Server port to connect to.
    #[arg(short = 'p', long)]
    port: u16,

    /// Force IPv4.
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    ipv4: bool,

    /// Force IPv6.
    #[arg(short = '6', long = "ipv6")]
    ipv6: bool,

    /// Play automatically instead of reading the terminal.
    #[arg(short = 'a', long = "automatic")]
    automatic: bool,

    #[arg(short = 'N', long = "north")]
    north: bool,
    #[arg(short = 'E', long = "east")]
    east: bool,
    #[arg(short = 'S', long = "south")]
    south: bool,
    #[arg(short = 'W', long = "west")]
    west: bool,
}

impl Args {
    fn family(&self) -> AddrFamily {
        if self.ipv4 {
            AddrFamily::V4
        } else if self.ipv6 {
            AddrFamily::V6
        } else {
            AddrFamily::Any
        }
    }

    fn seat(&self) -> Seat {
        if self.north {
            Seat::North
        } else if self.east {
            Seat::East
        } else if self.south {
            Seat::South
        } else {
            Seat::West
        }
    }
}

// ── CLIENT EVENTS (operational logging) ────────────────────────────────────

enum ClientEvent<'a> {
    Connecting { target: &'a str },
    Connected { addr: SocketAddr },
    Busy { occupied: &'a str },
    DealStarted { deal_type: DealType, leader: Seat },
    TrickResolved { trick_no: u32, winner: Seat, points: u32 },
    DealScored { totals: [u32; 4] },
    ServerClosed,
}

impl fmt::Display for ClientEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::Connecting { target } => write!(f, "Connecting to {target}…"),
            ClientEvent::Connected { addr } => write!(f, "Connected to {addr}"),
            ClientEvent::Busy { occupied } => write!(f, "Seat already occupied (taken: {occupied})"),
            ClientEvent::DealStarted { deal_type, leader } => {
                write!(f, "New deal: {deal_type}, {leader} leads")
            }
            ClientEvent::TrickResolved { trick_no, winner, points } => {
                write!(f, "Trick {trick_no} taken by {winner} (+{points})")
            }
            ClientEvent::DealScored { totals } => write!(
                f,
                "Deal scored; totals N={} E={} S={} W={}",
                totals[0], totals[1], totals[2], totals[3]
            ),
            ClientEvent::ServerClosed => write!(f, "Server closed the connection"),
        }
    }
}

// ── HAND STATE (client-side view, spec §4.7) ───────────────────────────────

struct ClientHand {
    deal_type: DealType,
    leader: Seat,
    cards: HashSet<Card>,
    completed: Vec<(u32, [Card; 4], Seat)>,
}

impl ClientHand {
    fn new(deal_type: DealType, leader: Seat, hand: Vec<Card>) -> Self {
        Self { deal_type, leader, cards: hand.into_iter().collect(), completed: Vec::new() }
    }
}

/// Chooses a card for the current prompt, respecting follow-suit first, then
/// spec §15's resolved rank policy: the lowest card that still beats the
/// current high of the lead suit if one exists; else the lowest lead-suit
/// card; else the lowest card overall. `excluded` holds cards already
/// rejected with `WRONG` for this same prompt.
fn choose_card(hand: &HashSet<Card>, plays_so_far: &[Card], excluded: &HashSet<Card>) -> Card {
    let candidates: Vec<Card> = hand.iter().copied().filter(|c| !excluded.contains(c)).collect();
    let lead_suit = plays_so_far.first().map(|c| c.suit);

    let legal: Vec<Card> = match lead_suit {
        Some(suit) => {
            let following: Vec<Card> = candidates.iter().copied().filter(|c| c.suit == suit).collect();
            if following.is_empty() {
                candidates
            } else {
                following
            }
        }
        None => candidates,
    };

    if let Some(suit) = lead_suit {
        let current_high = plays_so_far.iter().filter(|c| c.suit == suit).map(|c| c.rank).max();
        if let Some(high) = current_high {
            if let Some(card) = legal
                .iter()
                .copied()
                .filter(|c| c.suit == suit && c.rank > high)
                .min_by_key(|c| c.rank)
            {
                return card;
            }
        }
        if let Some(card) = legal.iter().copied().filter(|c| c.suit == suit).min_by_key(|c| c.rank) {
            return card;
        }
    }

    legal
        .into_iter()
        .min_by_key(|c| (c.rank, suit_order(c.suit)))
        .expect("a seat prompted for a card always still holds at least one")
}

fn suit_order(suit: kierki::wire::card::Suit) -> usize {
    kierki::wire::card::Suit::ALL.iter().position(|&s| s == suit).unwrap()
}

// ── TERMINAL RENDERING ──────────────────────────────────────────────────────

fn print_hand(hand: &ClientHand) {
    let mut cards: Vec<Card> = hand.cards.iter().copied().collect();
    cards.sort_by_key(|c| (suit_order(c.suit), c.rank));
    print!("  Hand:");
    for c in &cards {
        print!(" {c}");
    }
    println!();
}

fn print_tricks(hand: &ClientHand) {
    if hand.completed.is_empty() {
        println!("  No tricks taken yet this deal.");
        return;
    }
    for (trick_no, cards, winner) in &hand.completed {
        print!("  Trick {trick_no}:");
        for c in cards {
            print!(" {c}");
        }
        println!(" — won by {winner}");
    }
    println!("  Current leader: {}", hand.leader);
}

fn print_prompt(seat: Seat, trick_no: u32, plays_so_far: &[Card]) {
    print!("\n[{seat}] Trick {trick_no}, so far:");
    for c in plays_so_far {
        print!(" {c}");
    }
    print!(" — your play (cards / tricks / !<card>) > ");
    io::stdout().flush().ok();
}

// ── MAIN ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log = Logger::new(0);
    let seat = args.seat();

    let target = format!("{}:{}", args.host, args.port);
    log.info(ClientEvent::Connecting { target: &target });

    let candidates = match lookup_host(&target).await {
        Ok(addrs) => addrs.filter(|a| args.family().matches(a.ip())).collect::<Vec<_>>(),
        Err(e) => {
            eprintln!("Failed to resolve {target}: {e}");
            std::process::exit(1);
        }
    };
    let Some(&addr) = candidates.first() else {
        eprintln!("No address for {target} matched the requested address family");
        std::process::exit(1);
    };

    let stream = match TcpStream::connect(addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {addr}: {e}");
            std::process::exit(1);
        }
    };
    log.info(ClientEvent::Connected { addr });

    let mut framed = Framed::new(stream, KierkiCodec);
    if framed.send(Message::Iam(seat)).await.is_err() {
        eprintln!("Failed to send IAM{seat}");
        std::process::exit(1);
    }

    let mut hand: Option<ClientHand> = None;
    let mut prompt: Option<(u32, Vec<Card>)> = None;
    let mut pending_play: Option<Card> = None;
    let mut wrong_set: HashSet<Card> = HashSet::new();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            frame = framed.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        eprintln!("Protocol error: {e}");
                        break;
                    }
                    None => {
                        log.info(ClientEvent::ServerClosed);
                        println!("\nConnection closed by server.");
                        break;
                    }
                };

                match msg {
                    Message::Busy(occupied) => {
                        let list: String = occupied.iter().map(|s| s.as_wire()).collect();
                        log.warn(ClientEvent::Busy { occupied: &list });
                        println!("Seat {seat} is already taken ({list}). Exiting.");
                        break;
                    }
                    Message::Deal { deal_type, leader, hand: cards } => {
                        log.info(ClientEvent::DealStarted { deal_type, leader });
                        println!("\n=== New deal: {deal_type}, {leader} leads ===");
                        hand = Some(ClientHand::new(deal_type, leader, cards));
                        if let Some(h) = &hand {
                            print_hand(h);
                        }
                        prompt = None;
                        pending_play = None;
                        wrong_set.clear();
                    }
                    Message::Taken { trick_no, cards, winner } => {
                        if let Some(h) = &mut hand {
                            let points = kierki::scoring::trick_points(h.deal_type, (trick_no - 1) as usize, &cards);
                            log.info(ClientEvent::TrickResolved { trick_no, winner, points });
                            println!("\nTrick {trick_no} taken by {winner}.");
                            h.completed.push((trick_no, cards, winner));
                            h.leader = winner;
                        }
                        if let Some(card) = pending_play.take() {
                            if let Some(h) = &mut hand {
                                h.cards.remove(&card);
                            }
                        }
                        prompt = None;
                        wrong_set.clear();
                    }
                    Message::Score { points } => {
                        println!(
                            "\nDeal complete. Scores: N={} E={} S={} W={}",
                            points[0], points[1], points[2], points[3]
                        );
                    }
                    Message::Total { points } => {
                        log.info(ClientEvent::DealScored { totals: points });
                        println!(
                            "Running totals: N={} E={} S={} W={}",
                            points[0], points[1], points[2], points[3]
                        );
                    }
                    Message::Wrong { trick_no } => {
                        if let Some(card) = pending_play.take() {
                            wrong_set.insert(card);
                        }
                        println!("\nRejected: that play is not legal for trick {trick_no}.");
                        if let (Some(h), Some((pt, cards))) = (&hand, &prompt) {
                            if *pt == trick_no {
                                retry_play(&mut framed, &log, h, seat, *pt, cards, &wrong_set, args.automatic, &mut pending_play).await;
                            }
                        }
                    }
                    Message::Trick { trick_no, cards } => {
                        prompt = Some((trick_no, cards.clone()));
                        if let Some(h) = &hand {
                            retry_play(&mut framed, &log, h, seat, trick_no, &cards, &wrong_set, args.automatic, &mut pending_play).await;
                        }
                    }
                    Message::Iam(_) => {
                        // Never sent server->client; ignore defensively.
                    }
                }
            }

            line = stdin_lines.next_line(), if !args.automatic => {
                let raw = match line {
                    Ok(Some(l)) => l,
                    _ => {
                        println!("\nInput closed.");
                        break;
                    }
                };
                handle_command(raw.trim(), &hand, &mut framed, &prompt, &mut pending_play, &wrong_set, seat).await;
            }
        }
    }
}

/// Decides and sends a play for the current prompt: automatically, or by
/// prompting the terminal and waiting for the next command iteration.
async fn retry_play(
    framed: &mut Framed<TcpStream, KierkiCodec>,
    log: &Logger,
    hand: &ClientHand,
    seat: Seat,
    trick_no: u32,
    plays_so_far: &[Card],
    wrong_set: &HashSet<Card>,
    automatic: bool,
    pending_play: &mut Option<Card>,
) {
    if automatic {
        let card = choose_card(&hand.cards, plays_so_far, wrong_set);
        *pending_play = Some(card);
        log.verbose(format!("playing {card} for trick {trick_no}"));
        let _ = framed.send(Message::Trick { trick_no, cards: vec![card] }).await;
    } else {
        print_prompt(seat, trick_no, plays_so_far);
    }
}

async fn handle_command(
    raw: &str,
    hand: &Option<ClientHand>,
    framed: &mut Framed<TcpStream, KierkiCodec>,
    prompt: &Option<(u32, Vec<Card>)>,
    pending_play: &mut Option<Card>,
    wrong_set: &HashSet<Card>,
    seat: Seat,
) {
    if raw.is_empty() {
        return;
    }
    let Some(hand) = hand else {
        println!("  No deal in progress yet.");
        return;
    };

    match raw {
        "cards" => print_hand(hand),
        "tricks" => print_tricks(hand),
        other if other.starts_with('!') => {
            let Some((trick_no, _plays_so_far)) = prompt else {
                println!("  It is not {seat}'s turn to play.");
                return;
            };
            let token = &other[1..];
            match kierki::wire::card::take_card(token) {
                Ok((card, rest)) if rest.is_empty() => {
                    if wrong_set.contains(&card) {
                        println!("  {card} was already rejected for this trick.");
                        return;
                    }
                    if !hand.cards.contains(&card) {
                        println!("  {card} is not in hand.");
                        return;
                    }
                    *pending_play = Some(card);
                    let _ = framed.send(Message::Trick { trick_no: *trick_no, cards: vec![card] }).await;
                }
                _ => println!("  Could not parse {token:?} as a card (e.g. 10H, QC, AS)."),
            }
        }
        other => println!("  Unknown command {other:?}. Try: cards, tricks, !<card>"),
    }
}
