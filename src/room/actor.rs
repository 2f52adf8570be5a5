//! Room Actor
//!
//! One tokio task per active room. The task owns the [`Room`], the
//! room's single phase timer and the members' event channels, so every
//! mutation of a room is applied in arrival order without locks.
//!
//! Each accepted mutation is persisted, then broadcast as `room_update`,
//! then followed by a phase notice and/or the result when applicable.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::core::clock::{Millis, now_millis};
use crate::store::RoomStore;
use super::RoomTimings;
use super::state::{Phase, PhaseChange, PlayerId, Room, RoomError, RoomId, RoomResult, Transition};

/// Command queue depth per room.
const COMMAND_BUFFER: usize = 32;

/// Events pushed to room members.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Full snapshot after a mutation.
    Updated(Room),
    /// Room entered the commit phase.
    CommitPhase {
        /// Room identifier.
        room_id: RoomId,
        /// Commit deadline (Unix ms).
        deadline: Millis,
    },
    /// Room entered the reveal phase.
    RevealPhase {
        /// Room identifier.
        room_id: RoomId,
        /// Reveal deadline (Unix ms).
        deadline: Millis,
    },
    /// Room settled.
    Result {
        /// Room identifier.
        room_id: RoomId,
        /// Final outcome.
        result: RoomResult,
    },
}

/// Sender half of a member's event channel.
pub type EventSender = mpsc::Sender<RoomEvent>;

type Reply = oneshot::Sender<Result<Room, RoomError>>;

enum Command {
    Join { player: PlayerId, events: Option<EventSender>, reply: Reply },
    Commit { player: PlayerId, commitment: String, reply: Reply },
    Reveal { player: PlayerId, seed: String, reply: Reply },
    Snapshot { reply: oneshot::Sender<Room> },
}

/// Timer owned by the actor. Only one is armed at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    /// Phase window.
    Phase(Phase),
    /// Settled room retention; the actor exits when it fires.
    Retire,
}

/// Cloneable handle to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    id: RoomId,
    commands: mpsc::Sender<Command>,
}

impl RoomHandle {
    /// Room identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<Room, RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| RoomError::NotFound)?;
        response.await.map_err(|_| RoomError::NotFound)?
    }

    /// Take the second seat. `events` receives this player's broadcasts.
    pub async fn join(&self, player: PlayerId, events: Option<EventSender>) -> Result<Room, RoomError> {
        self.request(|reply| Command::Join { player, events, reply }).await
    }

    /// Submit a seed commitment.
    pub async fn commit(&self, player: PlayerId, commitment: String) -> Result<Room, RoomError> {
        self.request(|reply| Command::Commit { player, commitment, reply }).await
    }

    /// Reveal a seed.
    pub async fn reveal(&self, player: PlayerId, seed: String) -> Result<Room, RoomError> {
        self.request(|reply| Command::Reveal { player, seed, reply }).await
    }

    /// Current room state.
    pub async fn snapshot(&self) -> Option<Room> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::Snapshot { reply }).await.ok()?;
        response.await.ok()
    }
}

/// The task that owns one room.
pub struct RoomActor {
    room: Room,
    members: Vec<(PlayerId, EventSender)>,
    timer: Option<(Timer, Instant)>,
    store: Arc<dyn RoomStore>,
    timings: RoomTimings,
    commands: mpsc::Receiver<Command>,
}

impl RoomActor {
    /// Spawn an actor for `room`.
    ///
    /// `room` must be a fresh waiting room; `member` subscribes its creator.
    pub fn spawn(
        room: Room,
        member: Option<(PlayerId, EventSender)>,
        store: Arc<dyn RoomStore>,
        timings: RoomTimings,
    ) -> RoomHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = RoomHandle { id: room.id.clone(), commands: tx };

        let actor = RoomActor {
            room,
            members: member.into_iter().collect(),
            timer: None,
            store,
            timings,
            commands: rx,
        };
        tokio::spawn(actor.run());

        handle
    }

    async fn run(mut self) {
        debug!("Room {} actor started", self.room.id);

        loop {
            let deadline = self.timer.map(|(_, at)| at);

            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(cmd) => self.handle(cmd).await,
                        None => break,
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    match self.timer.take() {
                        Some((Timer::Phase(phase), _)) => self.on_phase_timeout(phase).await,
                        Some((Timer::Retire, _)) => break,
                        None => {}
                    }
                }
            }
        }

        debug!("Room {} actor stopped", self.room.id);
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Join { player, events, reply } => {
                let outcome = self.room.join(player.clone(), now_millis(), &self.timings);
                if outcome.is_ok() {
                    if let Some(events) = events {
                        self.members.push((player, events));
                    }
                }
                self.finish(outcome, reply).await;
            }
            Command::Commit { player, commitment, reply } => {
                let outcome = self.room.commit(&player, &commitment, now_millis(), &self.timings);
                self.finish(outcome, reply).await;
            }
            Command::Reveal { player, seed, reply } => {
                let outcome = self.room.reveal(&player, &seed);
                self.finish(outcome, reply).await;
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.room.clone());
            }
        }
    }

    async fn finish(&mut self, outcome: Result<Transition, RoomError>, reply: Reply) {
        let response = match outcome {
            Ok(transition) => {
                self.apply(transition).await;
                Ok(self.room.clone())
            }
            Err(e) => Err(e),
        };
        let _ = reply.send(response);
    }

    async fn on_phase_timeout(&mut self, phase: Phase) {
        match self.room.expire(phase) {
            Some(transition) => {
                info!("Room {} {:?} window elapsed", self.room.id, phase);
                self.apply(transition).await;
            }
            None => debug!("Room {} stale {:?} timer ignored", self.room.id, phase),
        }
    }

    /// Persist, broadcast, and re-arm timers after an accepted mutation.
    async fn apply(&mut self, transition: Transition) {
        if let Err(e) = self.store.save(&self.room).await {
            warn!("Failed to persist room {}: {}", self.room.id, e);
        }

        self.broadcast(RoomEvent::Updated(self.room.clone()));

        match transition.phase {
            Some(PhaseChange::Commit { deadline }) => {
                self.arm(Timer::Phase(Phase::Commit), self.timings.commit_window);
                self.broadcast(RoomEvent::CommitPhase { room_id: self.room.id.clone(), deadline });
            }
            Some(PhaseChange::Reveal { deadline }) => {
                // replaces the pending commit timer
                self.arm(Timer::Phase(Phase::Reveal), self.timings.reveal_window);
                self.broadcast(RoomEvent::RevealPhase { room_id: self.room.id.clone(), deadline });
            }
            None => {}
        }

        if transition.settled {
            if let Some(result) = self.room.result.clone() {
                info!(
                    "Room {} settled: {:?}, winner {:?}",
                    self.room.id, result.reason, result.winner_id
                );
                self.broadcast(RoomEvent::Result { room_id: self.room.id.clone(), result });
            }
            self.arm(Timer::Retire, self.timings.ttl());
        }
    }

    fn arm(&mut self, timer: Timer, after: std::time::Duration) {
        self.timer = Some((timer, Instant::now() + after));
    }

    fn broadcast(&mut self, event: RoomEvent) {
        self.members.retain(|(player, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Dropping room event for slow player {}", player);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }
}
