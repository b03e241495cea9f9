//! # GameStarter: debounced roster and start decision.
//!
//! Converts noisy per-player push/release signals into a stable roster and a single
//! latched "start the game" decision.
//!
//! ## Player state machine
//! ```text
//!            push (join_delay > 0)              join timer elapsed
//!   Idle ─────────────────────────► PendingJoin ─────────────────► Joined
//!    ▲  ◄───────────────────────────── │ release                    │  ▲
//!    │                                                       release │  │ push
//!    │              leave timer elapsed                              ▼  │
//!    └──────────────────────────────────────────────────────── PendingLeave
//! ```
//! A zero delay applies the corresponding transition at once.
//!
//! ## Start countdown
//! ```text
//! step_time(dt):
//!   ├─► advance player timers (first-mention order), apply elapsed transitions
//!   ├─► roster mutated?  yes → countdown = game_start_delay if roster ≥ 2, else none
//!   │                    no  → countdown -= dt
//!   └─► countdown == 0  → should_start = true (latched until reset)
//! ```
//! The countdown is re-armed on the tick that changed the roster and only starts
//! counting on the next tick.
//!
//! ## Concurrency
//! All clones of a [`GameStarter`] and every [`PlayerHandle`] share one mutex-guarded
//! state. No operation performs I/O or awaits while holding it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::config::Config;

/// Minimum roster size for a round.
pub const MIN_PLAYERS: usize = 2;

/// Membership state of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Not a candidate; no timer running.
    #[default]
    Idle,
    /// Pushed; join timer running.
    PendingJoin,
    /// Counted in the roster.
    Joined,
    /// Released while joined; leave timer running, still counted.
    PendingLeave,
}

#[derive(Debug, Default)]
struct PlayerRecord {
    state: PlayerState,
    timer: Option<Duration>,
}

#[derive(Debug)]
struct StarterState {
    game_start_delay: Duration,
    join_delay: Duration,
    leave_delay: Duration,
    players: HashMap<String, PlayerRecord>,
    /// Identifiers in first-mention order.
    mentioned: Vec<String>,
    roster: Vec<String>,
    countdown: Option<Duration>,
    should_start: bool,
}

impl StarterState {
    fn record(&mut self, id: &str) -> &mut PlayerRecord {
        if !self.players.contains_key(id) {
            self.mentioned.push(id.to_string());
        }
        self.players.entry(id.to_string()).or_default()
    }

    fn push(&mut self, id: &str) {
        let join_delay = self.join_delay;
        let rec = self.record(id);
        let state = rec.state;
        match state {
            PlayerState::Idle if join_delay.is_zero() => {
                rec.state = PlayerState::Joined;
                self.enter_roster(id);
                self.arm_countdown();
            }
            PlayerState::Idle => {
                rec.state = PlayerState::PendingJoin;
                rec.timer = Some(join_delay);
            }
            PlayerState::PendingLeave => {
                rec.state = PlayerState::Joined;
                rec.timer = None;
                debug!(player = id, "leave cancelled");
            }
            PlayerState::PendingJoin | PlayerState::Joined => {}
        }
    }

    fn release(&mut self, id: &str) {
        let leave_delay = self.leave_delay;
        let rec = self.record(id);
        let state = rec.state;
        match state {
            PlayerState::Joined if leave_delay.is_zero() => {
                rec.state = PlayerState::Idle;
                self.leave_roster(id);
                self.arm_countdown();
            }
            PlayerState::Joined => {
                rec.state = PlayerState::PendingLeave;
                rec.timer = Some(leave_delay);
            }
            PlayerState::PendingJoin => {
                rec.state = PlayerState::Idle;
                rec.timer = None;
                debug!(player = id, "join cancelled");
            }
            PlayerState::Idle | PlayerState::PendingLeave => {}
        }
    }

    fn step(&mut self, dt: Duration) {
        let mut changed = false;

        for id in &self.mentioned {
            let Some(rec) = self.players.get_mut(id) else {
                continue;
            };
            let Some(left) = rec.timer else {
                continue;
            };
            let left = left.saturating_sub(dt);
            if !left.is_zero() {
                rec.timer = Some(left);
                continue;
            }
            rec.timer = None;
            match rec.state {
                PlayerState::PendingJoin => {
                    rec.state = PlayerState::Joined;
                    self.roster.push(id.clone());
                    debug!(player = %id, roster = self.roster.len(), "player joined");
                    changed = true;
                }
                PlayerState::PendingLeave => {
                    rec.state = PlayerState::Idle;
                    self.roster.retain(|p| p != id);
                    debug!(player = %id, roster = self.roster.len(), "player left");
                    changed = true;
                }
                PlayerState::Idle | PlayerState::Joined => {}
            }
        }

        if changed {
            self.arm_countdown();
        } else if let Some(left) = self.countdown {
            self.countdown = Some(left.saturating_sub(dt));
            self.latch_if_elapsed();
        }
    }

    fn enter_roster(&mut self, id: &str) {
        self.roster.push(id.to_string());
        debug!(player = id, roster = self.roster.len(), "player joined");
    }

    fn leave_roster(&mut self, id: &str) {
        self.roster.retain(|p| p != id);
        debug!(player = id, roster = self.roster.len(), "player left");
    }

    /// Restarts or cancels the countdown after a roster mutation.
    fn arm_countdown(&mut self) {
        self.countdown = (self.roster.len() >= MIN_PLAYERS).then_some(self.game_start_delay);
        self.latch_if_elapsed();
    }

    fn latch_if_elapsed(&mut self) {
        if self.countdown == Some(Duration::ZERO) {
            self.countdown = None;
            if !self.should_start {
                debug!(roster = ?self.roster, "start countdown elapsed");
            }
            self.should_start = true;
        }
    }

    fn reset(&mut self) {
        for rec in self.players.values_mut() {
            *rec = PlayerRecord::default();
        }
        self.roster.clear();
        self.countdown = None;
        self.should_start = false;
    }
}

/// Debounce/aggregation state machine deciding when a round starts.
///
/// Cheap to clone; clones share state.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use lobbyvisor::GameStarter;
///
/// let gs = GameStarter::new(Duration::from_secs(5), Duration::from_secs(1), Duration::from_millis(500));
/// gs.player("A").push();
/// gs.player("B").push();
///
/// gs.step_time(Duration::from_secs(1));
/// assert_eq!(gs.joined_players(), vec!["A", "B"]);
/// assert!(!gs.should_start());
///
/// gs.step_time(Duration::from_secs(5));
/// assert!(gs.should_start());
/// ```
#[derive(Clone, Debug)]
pub struct GameStarter {
    inner: Arc<Mutex<StarterState>>,
}

impl GameStarter {
    /// Creates a starter; a zero delay disables that debounce.
    pub fn new(game_start_delay: Duration, join_delay: Duration, leave_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StarterState {
                game_start_delay,
                join_delay,
                leave_delay,
                players: HashMap::new(),
                mentioned: Vec::new(),
                roster: Vec::new(),
                countdown: None,
                should_start: false,
            })),
        }
    }

    /// Creates a starter from the configured delays.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.game_start_delay, cfg.join_delay, cfg.leave_delay)
    }

    fn lock(&self) -> MutexGuard<'_, StarterState> {
        lock(&self.inner)
    }

    /// Returns the push/release handle for `id`, creating the player on first mention.
    pub fn player(&self, id: &str) -> PlayerHandle {
        self.lock().record(id);
        PlayerHandle {
            id: Arc::from(id),
            inner: Arc::clone(&self.inner),
        }
    }

    /// Advances every running timer by `dt`.
    pub fn step_time(&self, dt: Duration) {
        self.lock().step(dt);
    }

    /// Returns `true` once the start countdown has elapsed (until [`reset`](Self::reset)).
    pub fn should_start(&self) -> bool {
        self.lock().should_start
    }

    /// Returns the roster in join order.
    pub fn joined_players(&self) -> Vec<String> {
        self.lock().roster.clone()
    }

    /// Returns the state of `id` (`Idle` for unknown players).
    pub fn state(&self, id: &str) -> PlayerState {
        self.lock()
            .players
            .get(id)
            .map(|rec| rec.state)
            .unwrap_or_default()
    }

    /// Remaining start countdown, if one is running.
    pub fn countdown(&self) -> Option<Duration> {
        self.lock().countdown
    }

    /// Returns every player to `Idle`, clears the roster and cancels the countdown.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// If a start was decided, returns the roster and resets, in one step.
    pub fn take_start(&self) -> Option<Vec<String>> {
        let mut state = self.lock();
        if !state.should_start {
            return None;
        }
        let roster = std::mem::take(&mut state.roster);
        state.reset();
        Some(roster)
    }
}

/// Push/release capability for one player.
#[derive(Clone, Debug)]
pub struct PlayerHandle {
    id: Arc<str>,
    inner: Arc<Mutex<StarterState>>,
}

impl PlayerHandle {
    /// Player identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Records a join intent.
    pub fn push(&self) {
        lock(&self.inner).push(&self.id);
    }

    /// Records a leave intent.
    pub fn release(&self) {
        lock(&self.inner).release(&self.id);
    }

    /// Current membership state.
    pub fn state(&self) -> PlayerState {
        lock(&self.inner)
            .players
            .get(&*self.id)
            .map(|rec| rec.state)
            .unwrap_or_default()
    }
}

// A panic while holding the lock cannot leave a half-applied transition behind.
fn lock(inner: &Mutex<StarterState>) -> MutexGuard<'_, StarterState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
