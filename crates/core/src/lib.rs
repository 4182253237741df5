//! Core type aliases, identity types, and constants for quizsync.
//!
//! This crate provides the foundational types and configuration parameters
//! used throughout the quizsync workspace.

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Score reported by a client, last-write-wins within a round.
pub type Points = u32;
/// Whole seconds on the shared round clock.
pub type Secs = u32;
/// Milliseconds since the Unix epoch, signed so drift math can go negative.
pub type EpochMs = i64;

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

// ============================================================================
// ROOM IDENTITY
// Rooms are addressed on the wire by decimal string, never by raw integer:
// the transport layer treats integer zero as "every connection", so a bare
// `0` at a fan-out call site silently becomes a global broadcast. RoomId is
// range-checked at construction and only ever renders as a string.
// ============================================================================
/// Lowest difficulty level.
pub const MIN_ROOM: i64 = 0;
/// Number of static difficulty rooms.
pub const NUM_ROOMS: i64 = 4;

/// A validated difficulty room. Constructed only through [`RoomId::parse`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RoomId(u8);

impl RoomId {
    /// Validate a client-supplied difficulty level into a room id.
    pub fn parse(level: i64) -> Option<Self> {
        (MIN_ROOM..MIN_ROOM + NUM_ROOMS)
            .contains(&level)
            .then_some(Self(level as u8))
    }
    /// Every static room, lowest level first.
    pub fn all() -> impl Iterator<Item = Self> {
        (MIN_ROOM..MIN_ROOM + NUM_ROOMS).map(|level| Self(level as u8))
    }
    /// String form used for transport fan-out addressing.
    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl Display for RoomId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl serde::Serialize for RoomId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.key())
    }
}

// ============================================================================
// ROUND CADENCE
// One cycle = one Play window followed by one Lobby window. All rooms share
// the cycle; it is anchored to wall-clock multiples of CYCLE_SECS.
// ============================================================================
/// Full round length in seconds.
pub const CYCLE_SECS: Secs = 180;
/// Inter-round lobby length in seconds.
pub const LOBBY_SECS: Secs = 30;
/// Most lobby seconds the coarse adjustment may drop in one cycle.
pub const MAX_SKIP_FWD: Secs = 9;

// ============================================================================
// TICK CALIBRATION
// The recurring timer runs slightly fast by default and is nudged between a
// small set of discrete periods to keep firings near the whole second.
// ============================================================================
/// Baseline recurring tick period (ms).
pub const NORMAL_TICK_MS: u64 = 990;
/// Catch-up period when firing late (ms).
pub const FAST_TICK_MS: u64 = 976;
/// Back-off period when firing early (ms).
pub const SLOW_TICK_MS: u64 = 1004;
/// Aggressive catch-up period, large-skew mode only (ms).
pub const FASTER_TICK_MS: u64 = 960;
/// Aggressive back-off period, large-skew mode only (ms).
pub const SLOWER_TICK_MS: u64 = 1020;
/// Phase error beyond which the period is nudged (ms).
pub const ERR_THRESHOLD_MS: i64 = 10;
/// Phase error beyond which large-skew mode nudges harder (ms).
pub const ERR_THRESHOLD_LARGE_MS: i64 = 25;
/// Lead applied to the first one-shot so it lands just before the boundary (ms).
pub const INIT_OFFSET_MS: i64 = -10;

// ============================================================================
// NETWORK
// ============================================================================
/// Default listening endpoint.
pub const DEFAULT_BIND: &str = "0.0.0.0:6789";

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Register Ctrl+C handler for immediate termination.
pub fn trap() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("install ctrl-c handler");
        println!();
        log::warn!("interrupt received, exiting");
        std::process::exit(0);
    });
}
