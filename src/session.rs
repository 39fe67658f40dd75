//! Session loop / server core (spec §4.6): a single task multiplexing the
//! listener, up to four seated connections, and a bounded set of pending
//! (pre-`IAM`) connections, driving the deal/trick state machine to the end
//! of a scripted tournament. Lives in the library so it can be driven
//! end-to-end from tests without a subprocess, the way
//! `Rick-Wilson-bridge-solver` keeps its solver core in `src/lib.rs` behind a
//! thin `src/bin/*/main.rs`.

use crate::deal::DealSpec;
use crate::error::WireError;
use crate::hand::{HandState, PlayError, PlayOutcome};
use crate::logger::Logger;
use crate::seats::Seat;
use crate::tournament::TournamentState;
use crate::wire::{Card, KierkiCodec, Message};
use futures::future::{select_all, BoxFuture};
use futures::FutureExt;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

// ── DISPLAY EVENTS ────────────────────────────────────────────────────────

enum Event<'a> {
    Listening { addr: SocketAddr },
    Seated { seat: Seat, addr: SocketAddr },
    Busy { seat: Seat, addr: SocketAddr, occupied: &'a str },
    SeatVacated { seat: Seat },
    PendingClosed { addr: SocketAddr, reason: &'a str },
    PendingSlotsFull,
    DealStarted { deal_type: char, leader: Seat },
    TrickResolved { trick_no: u32, winner: Seat, points: u32 },
    DealScored { totals: [u32; 4] },
    TournamentComplete,
    AcceptError { reason: String },
    WrongPlay { seat: Seat, trick_no: u32, reason: PlayError },
}

impl fmt::Display for PlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PlayError::NotYourTurn => "not this seat's turn",
            PlayError::WrongTrickNumber => "trick number does not match",
            PlayError::CardNotHeld => "card not held",
            PlayError::MustFollowSuit => "must follow suit",
        };
        write!(f, "{text}")
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Listening { addr } => write!(f, "Server listening on {addr}"),
            Event::Seated { seat, addr } => write!(f, "Seat {seat} occupied by {addr}"),
            Event::Busy { seat, addr, occupied } => {
                write!(f, "{addr} requested occupied seat {seat} (occupied: {occupied})")
            }
            Event::SeatVacated { seat } => write!(f, "Seat {seat} vacated; referee paused"),
            Event::PendingClosed { addr, reason } => write!(f, "Closed pending {addr}: {reason}"),
            Event::PendingSlotsFull => write!(f, "No free pending slot; new connection closed"),
            Event::DealStarted { deal_type, leader } => {
                write!(f, "Deal started: type {deal_type}, leader {leader}")
            }
            Event::TrickResolved { trick_no, winner, points } => {
                write!(f, "Trick {trick_no} taken by {winner} (+{points})")
            }
            Event::DealScored { totals } => write!(
                f,
                "Deal complete; totals N={} E={} S={} W={}",
                totals[0], totals[1], totals[2], totals[3]
            ),
            Event::TournamentComplete => write!(f, "Tournament complete; closing all seats"),
            Event::AcceptError { reason } => write!(f, "Accept error: {reason}"),
            Event::WrongPlay { seat, trick_no, reason } => {
                write!(f, "{seat} sent an invalid play for trick {trick_no}: {reason}")
            }
        }
    }
}

// ── REPORT LOGGING (spec §6.4) ─────────────────────────────────────────────

/// Logs one exchanged message to stdout in the mandated report format, with
/// the literal characters `\r\n` appended (not a real line terminator).
fn report(src: SocketAddr, dst: SocketAddr, msg: &Message) {
    let now = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f");
    println!("[{src},{dst},{now}] {msg}\\r\\n");
}

// ── CONNECTION WRAPPER ──────────────────────────────────────────────────────

struct Conn {
    framed: Framed<TcpStream, KierkiCodec>,
    peer: SocketAddr,
    local: SocketAddr,
    last_activity: Instant,
}

impl Conn {
    fn new(stream: TcpStream, peer: SocketAddr) -> std::io::Result<Self> {
        let local = stream.local_addr()?;
        Ok(Self {
            framed: Framed::new(stream, KierkiCodec),
            peer,
            local,
            last_activity: Instant::now(),
        })
    }

    /// Sends one message, logging it per spec §6.4. Returns `false` if the
    /// write failed (broken pipe/ECONNRESET — treated as peer close).
    async fn send(&mut self, msg: Message) -> bool {
        use futures::SinkExt;
        report(self.local, self.peer, &msg);
        self.framed.send(msg).await.is_ok()
    }
}

// ── SERVER STATE ────────────────────────────────────────────────────────────

/// Owns every live connection and the tournament's progress. Constructed via
/// [`Server::bind`], then driven to completion with [`Server::run`].
pub struct Server {
    listener: TcpListener,
    bound_addr: SocketAddr,
    pending: [Option<Conn>; 4],
    seats: [Option<Conn>; 4],
    timeout: Duration,
    tournament: TournamentState,
    current_deal: Option<DealSpec>,
    hand: Option<HandState>,
    /// `(trick_no, plays_len, sent_at)` of the last `TRICK` prompt sent for
    /// the in-flight trick — `plays_len` disambiguates successive prompts
    /// within the same trick as cards are played.
    prompt: Option<(u32, usize, Instant)>,
    log: Logger,
    /// Set once `SIGINT` is observed: stops accepting new connections and
    /// lets the in-flight deal finish, but closes the tournament out at the
    /// next deal boundary instead of advancing to another scripted deal
    /// (spec §5's signal handling, resolved per SPEC_FULL.md §15).
    shutting_down: bool,
}

enum Tag {
    Listener,
    Pending(usize),
    Seat(Seat),
    Timeout,
    Interrupt,
}

enum SlotEvent {
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Frame(Option<Result<Message, WireError>>),
    Timeout,
    Interrupted,
}

impl Server {
    /// Binds `addr` and loads the first scripted deal. `deals` must be
    /// non-empty.
    pub async fn bind(
        addr: SocketAddr,
        timeout: Duration,
        deals: Vec<DealSpec>,
        log: Logger,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!deals.is_empty(), "deal script contains no deals");

        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;
        log.info(Event::Listening { addr: bound_addr });

        let tournament = TournamentState::new(deals);
        let current_deal = tournament.current_deal().cloned();
        let hand = current_deal.as_ref().map(HandState::new);
        if let Some(deal) = &current_deal {
            log.info(Event::DealStarted { deal_type: deal.deal_type.as_wire(), leader: deal.first_leader });
        }

        Ok(Self {
            listener,
            bound_addr,
            pending: Default::default(),
            seats: Default::default(),
            timeout: timeout.max(Duration::from_secs(1)),
            tournament,
            current_deal,
            hand,
            prompt: None,
            log,
            shutting_down: false,
        })
    }

    /// The address actually bound — useful when `addr`'s port was `0`.
    pub fn local_addr(&self) -> SocketAddr {
        self.bound_addr
    }

    /// Drives the deal/trick state machine (spec §4.6) until the tournament
    /// is exhausted. Single task, no spawned children — every suspension
    /// point is the `select_all` await in `select_next`.
    pub async fn run(mut self) {
        loop {
            if self.hand.is_none() {
                self.log.info(Event::TournamentComplete);
                for seat in Seat::ALL {
                    self.seats[seat.index()] = None;
                }
                break;
            }

            self.ensure_prompt().await;

            let (tag, event) = self.select_next().await;
            match (tag, event) {
                (Tag::Listener, SlotEvent::Accepted(result)) => self.on_accept(result).await,
                (Tag::Pending(i), SlotEvent::Frame(frame)) => self.on_pending_frame(i, frame).await,
                (Tag::Seat(seat), SlotEvent::Frame(frame)) => self.on_seat_frame(seat, frame).await,
                (Tag::Timeout, SlotEvent::Timeout) => self.on_timeout().await,
                (Tag::Interrupt, SlotEvent::Interrupted) => self.on_interrupt(),
                _ => unreachable!("select_next tag/event pairing is always consistent"),
            }
        }
    }

    fn on_interrupt(&mut self) {
        if !self.shutting_down {
            self.log.warn("SIGINT received: no longer accepting new connections; finishing the in-flight deal");
            self.shutting_down = true;
        }
    }

    // ── MULTIPLEXING ────────────────────────────────────────────────────────

    async fn select_next(&mut self) -> (Tag, SlotEvent) {
        let mut futs: Vec<BoxFuture<'_, SlotEvent>> = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();

        if !self.shutting_down {
            futs.push(self.listener.accept().map(SlotEvent::Accepted).boxed());
            tags.push(Tag::Listener);
        }

        // Kept unconditionally, even while shutting down: it is otherwise
        // possible for `pending`, `seats`, and `next_deadline` to all be
        // empty at once (SIGINT arrives, then the last seated client
        // disconnects before anyone reconnects), which would leave `futs`
        // empty and make `select_all` panic. A second SIGINT while already
        // shutting down is a no-op in `on_interrupt`.
        futs.push(
            async {
                let _ = tokio::signal::ctrl_c().await;
                SlotEvent::Interrupted
            }
            .boxed(),
        );
        tags.push(Tag::Interrupt);

        for (i, slot) in self.pending.iter_mut().enumerate() {
            if let Some(conn) = slot {
                futs.push(read_frame(conn).boxed());
                tags.push(Tag::Pending(i));
            }
        }
        for seat in Seat::ALL {
            if let Some(conn) = &mut self.seats[seat.index()] {
                futs.push(read_frame(conn).boxed());
                tags.push(Tag::Seat(seat));
            }
        }

        if let Some(deadline) = self.next_deadline() {
            futs.push(
                async move {
                    tokio::time::sleep_until(deadline.into()).await;
                    SlotEvent::Timeout
                }
                .boxed(),
            );
            tags.push(Tag::Timeout);
        }

        let (event, idx, _rest) = select_all(futs).await;
        (tags.swap_remove(idx), event)
    }

    fn next_deadline(&self) -> Option<Instant> {
        let mut earliest: Option<Instant> = None;
        for slot in self.pending.iter().flatten() {
            let d = slot.last_activity + self.timeout;
            earliest = Some(earliest.map_or(d, |e| e.min(d)));
        }
        if self.all_seated() {
            if let Some((_, _, sent_at)) = self.prompt {
                let d = sent_at + self.timeout;
                earliest = Some(earliest.map_or(d, |e| e.min(d)));
            }
        }
        earliest
    }

    fn all_seated(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    fn occupied_letters(&self) -> String {
        Seat::ALL
            .into_iter()
            .filter(|s| self.seats[s.index()].is_some())
            .map(|s| s.as_wire())
            .collect()
    }

    // ── ADMISSION (spec §4.3, §4.6) ─────────────────────────────────────────

    async fn on_accept(&mut self, result: std::io::Result<(TcpStream, SocketAddr)>) {
        let (stream, addr) = match result {
            Ok(pair) => pair,
            Err(e) => {
                self.log.warn(Event::AcceptError { reason: e.to_string() });
                return;
            }
        };
        let conn = match Conn::new(stream, addr) {
            Ok(c) => c,
            Err(e) => {
                self.log.warn(Event::AcceptError { reason: e.to_string() });
                return;
            }
        };
        match self.pending.iter().position(Option::is_none) {
            Some(slot) => self.pending[slot] = Some(conn),
            None => self.log.warn(Event::PendingSlotsFull),
        }
    }

    async fn on_pending_frame(&mut self, i: usize, frame: Option<Result<Message, WireError>>) {
        let Some(conn) = self.pending[i].take() else { return };
        match frame {
            Some(Ok(Message::Iam(seat))) => self.try_seat(seat, conn).await,
            Some(Ok(_other)) => {
                self.log.warn(Event::PendingClosed {
                    addr: conn.peer,
                    reason: "non-IAM message while pending",
                });
            }
            Some(Err(e)) => {
                self.log.warn(Event::PendingClosed { addr: conn.peer, reason: &e.to_string() });
            }
            None => {
                self.log.verbose(Event::PendingClosed { addr: conn.peer, reason: "EOF" });
            }
        }
        // If `try_seat` didn't re-home `conn` into `self.seats`, it is
        // dropped here, closing the socket — covers BUSY and malformed IAM.
    }

    async fn try_seat(&mut self, seat: Seat, mut conn: Conn) {
        if self.seats[seat.index()].is_some() {
            let occupied = self.occupied_letters();
            self.log.info(Event::Busy { seat, addr: conn.peer, occupied: &occupied });
            let list = Seat::ALL.into_iter().filter(|s| self.seats[s.index()].is_some()).collect();
            conn.send(Message::Busy(list)).await;
            return;
        }

        self.log.info(Event::Seated { seat, addr: conn.peer });

        if let Some(deal) = &self.current_deal {
            let deal_msg = Message::Deal {
                deal_type: deal.deal_type,
                leader: deal.first_leader,
                hand: deal.hand(seat).to_vec(),
            };
            if !conn.send(deal_msg).await {
                return;
            }

            if let Some(hand) = &self.hand {
                let in_progress = hand.trick_no() > 1 || !hand.plays_so_far().is_empty();
                if in_progress {
                    for (idx, &(winner, cards)) in hand.completed_tricks().iter().enumerate() {
                        let trick_no = idx as u32 + 1;
                        if !conn.send(Message::Taken { trick_no, cards, winner }).await {
                            return;
                        }
                    }
                    let msg = Message::Trick { trick_no: hand.trick_no(), cards: hand.plays_so_far() };
                    if !conn.send(msg).await {
                        return;
                    }
                    if hand.next_to_play() == seat {
                        self.prompt = Some((hand.trick_no(), hand.plays_so_far().len(), Instant::now()));
                    }
                }
            }
        }

        conn.last_activity = Instant::now();
        self.seats[seat.index()] = Some(conn);
    }

    // ── SEAT I/O (spec §4.4) ─────────────────────────────────────────────────

    async fn on_seat_frame(&mut self, seat: Seat, frame: Option<Result<Message, WireError>>) {
        match frame {
            Some(Ok(Message::Trick { trick_no, cards })) if cards.len() == 1 => {
                self.on_play(seat, trick_no, cards[0]).await;
            }
            Some(Ok(_other)) => {
                self.close_seat_with_reason(seat, "unexpected message from seated client");
            }
            Some(Err(e)) => {
                let reason = e.to_string();
                self.close_seat_with_reason(seat, &reason);
            }
            None => self.vacate(seat),
        }
    }

    fn close_seat_with_reason(&mut self, seat: Seat, reason: &str) {
        if let Some(conn) = &self.seats[seat.index()] {
            self.log.warn(Event::PendingClosed { addr: conn.peer, reason });
        }
        self.vacate(seat);
    }

    async fn on_play(&mut self, seat: Seat, trick_no: u32, card: Card) {
        // The authoritative trick number, read before (and independent of)
        // `apply_play`: a `WRONG<n>` reply must always echo the server's own
        // `trickIdx+1`, never whatever `n` the client happened to submit
        // (spec §4.4 step 2, invariant 4).
        let Some(authoritative_trick_no) = self.hand.as_ref().map(|h| h.trick_no()) else { return };
        let Some(hand) = &mut self.hand else { return };
        match hand.apply_play(seat, trick_no, card) {
            Ok(PlayOutcome::Continuing) => {
                // Next seat to play differs from the one just prompted;
                // clearing forces `ensure_prompt` to issue a fresh TRICK.
                self.prompt = None;
            }
            Ok(PlayOutcome::TrickComplete(result)) => {
                self.log.info(Event::TrickResolved {
                    trick_no: result.trick_no,
                    winner: result.winner,
                    points: result.points,
                });
                let taken = Message::Taken { trick_no: result.trick_no, cards: result.cards, winner: result.winner };
                self.broadcast(taken).await;
                self.prompt = None;
                if result.deal_complete {
                    self.finish_deal().await;
                }
            }
            Err(reason) => {
                self.log.debug(Event::WrongPlay { seat, trick_no: authoritative_trick_no, reason });
                if let Some(conn) = &mut self.seats[seat.index()] {
                    conn.send(Message::Wrong { trick_no: authoritative_trick_no }).await;
                }
            }
        }
    }

    async fn finish_deal(&mut self) {
        let Some(hand) = &self.hand else { return };
        let points = hand.points();
        self.broadcast(Message::Score { points }).await;

        self.tournament.finish_current_deal(points);
        let totals = self.tournament.totals();
        self.broadcast(Message::Total { points: totals }).await;
        self.log.info(Event::DealScored { totals });

        self.prompt = None;
        let next_deal = if self.shutting_down { None } else { self.tournament.current_deal().cloned() };
        match next_deal {
            Some(deal) => {
                self.log.info(Event::DealStarted { deal_type: deal.deal_type.as_wire(), leader: deal.first_leader });
                self.hand = Some(HandState::new(&deal));
                for seat in Seat::ALL {
                    if let Some(conn) = &mut self.seats[seat.index()] {
                        let msg = Message::Deal {
                            deal_type: deal.deal_type,
                            leader: deal.first_leader,
                            hand: deal.hand(seat).to_vec(),
                        };
                        conn.send(msg).await;
                    }
                }
                self.current_deal = Some(deal);
            }
            None => {
                self.current_deal = None;
                self.hand = None; // `run`'s next iteration sees the tournament is over.
            }
        }
    }

    async fn broadcast(&mut self, msg: Message) {
        for seat in Seat::ALL {
            if let Some(conn) = &mut self.seats[seat.index()] {
                conn.send(msg.clone()).await;
            }
        }
    }

    fn vacate(&mut self, seat: Seat) {
        if self.seats[seat.index()].take().is_some() {
            self.log.info(Event::SeatVacated { seat });
            self.prompt = None;
        }
    }

    // ── RE-PROMPT / CATCH-UP (spec §4.4 step 1, re-prompt policy) ───────────

    /// Sends a fresh `TRICK` prompt to the current next-to-play seat exactly
    /// once per distinct `(trick_no, plays_len)` state; does nothing while
    /// any seat is vacant (the referee pauses per spec §4.3's invariant).
    async fn ensure_prompt(&mut self) {
        if !self.all_seated() {
            return;
        }
        let Some(hand) = &self.hand else { return };
        if hand.deal_complete() {
            return;
        }
        let signature = (hand.trick_no(), hand.plays_so_far().len());
        let already_current = matches!(self.prompt, Some((t, p, _)) if (t, p) == signature);
        if already_current {
            return;
        }
        self.prompt = Some((signature.0, signature.1, Instant::now()));
        self.send_current_prompt().await;
    }

    async fn send_current_prompt(&mut self) {
        let Some(hand) = &self.hand else { return };
        let seat = hand.next_to_play();
        let msg = Message::Trick { trick_no: hand.trick_no(), cards: hand.plays_so_far() };
        if let Some(conn) = &mut self.seats[seat.index()] {
            conn.send(msg).await;
        }
    }

    async fn on_timeout(&mut self) {
        let now = Instant::now();

        for i in 0..self.pending.len() {
            let expired = self.pending[i]
                .as_ref()
                .is_some_and(|c| now.duration_since(c.last_activity) >= self.timeout);
            if expired {
                let addr = self.pending[i].take().unwrap().peer;
                self.log.verbose(Event::PendingClosed { addr, reason: "idle timeout" });
            }
        }

        if self.all_seated() {
            if let Some((t, p, sent_at)) = self.prompt {
                if now.duration_since(sent_at) >= self.timeout {
                    self.prompt = Some((t, p, now));
                    self.send_current_prompt().await;
                }
            }
        }
    }
}

async fn read_frame(conn: &mut Conn) -> SlotEvent {
    use futures::StreamExt;
    let item = conn.framed.next().await;
    conn.last_activity = Instant::now();
    if let Some(Ok(msg)) = &item {
        report(conn.peer, conn.local, msg);
    }
    SlotEvent::Frame(item)
}
