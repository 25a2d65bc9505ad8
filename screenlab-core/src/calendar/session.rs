//! Session clock for the CN A-share trading day.
//!
//! | phase              | range          |
//! |--------------------|----------------|
//! | pre-open           | until 09:15    |
//! | morning auction    | 09:15 – 11:30  |
//! | midday pause       | 11:30 – 13:00  |
//! | afternoon auction  | 13:00 – 15:00  |
//! | closed             | from 15:00     |
//!
//! Continuous trading begins at 09:30; the 09:15–09:25 opening call and the
//! 14:57–15:00 closing call sit inside the auction phases.

use chrono::NaiveTime;

/// Opening call auction starts.
pub const MORNING_AUCTION_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 15, 0) {
    Some(t) => t,
    None => panic!("invalid session-clock constant"),
};

/// Continuous trading starts.
pub const CONTINUOUS_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => panic!("invalid session-clock constant"),
};

/// Morning session ends.
pub const MORNING_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(11, 30, 0) {
    Some(t) => t,
    None => panic!("invalid session-clock constant"),
};

/// Afternoon session starts.
pub const AFTERNOON_OPEN: NaiveTime = match NaiveTime::from_hms_opt(13, 0, 0) {
    Some(t) => t,
    None => panic!("invalid session-clock constant"),
};

/// The close.
pub const AFTERNOON_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(15, 0, 0) {
    Some(t) => t,
    None => panic!("invalid session-clock constant"),
};

/// Where a wall-clock time falls in the trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    PreOpen,
    Auction,
    Pause,
    Closed,
}

/// Classify a time of day against the session table.
pub fn phase_at(time: NaiveTime) -> SessionPhase {
    if time < MORNING_AUCTION_OPEN {
        SessionPhase::PreOpen
    } else if time < MORNING_CLOSE {
        SessionPhase::Auction
    } else if time < AFTERNOON_OPEN {
        SessionPhase::Pause
    } else if time < AFTERNOON_CLOSE {
        SessionPhase::Auction
    } else {
        SessionPhase::Closed
    }
}

/// Continuous trading has begun (09:30 onwards, pause included).
pub fn is_open(time: NaiveTime) -> bool {
    time >= CONTINUOUS_OPEN
}

/// The session has closed for the day.
pub fn is_closed(time: NaiveTime) -> bool {
    time >= AFTERNOON_CLOSE
}

/// Inside either auction span (calls included).
pub fn is_trading_time(time: NaiveTime) -> bool {
    phase_at(time) == SessionPhase::Auction
}
