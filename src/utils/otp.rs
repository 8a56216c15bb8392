//! One-Time Passcodes
//!
//! Generation and comparison of the 4-digit password reset code, and the
//! countdown that bounds how long a code may be entered.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;

use super::security::secrets_equal;

/// Smallest code value; keeps every code exactly four digits
pub const RESET_CODE_MIN: u16 = 1000;

/// Largest code value
pub const RESET_CODE_MAX: u16 = 9999;

/// Seconds a freshly issued code stays valid
pub const DEFAULT_CODE_WINDOW_SECS: u32 = 300;

/// Generate a 4-digit numeric reset code in `[1000, 9999]`
pub fn generate_reset_code() -> String {
    rand::thread_rng()
        .gen_range(RESET_CODE_MIN..=RESET_CODE_MAX)
        .to_string()
}

/// Compares a stored code with a submitted one without early exit
pub fn codes_match(expected: &str, submitted: &str) -> bool {
    secrets_equal(expected, submitted.trim())
}

/// Seconds-resolution countdown for an issued code
///
/// Starts at its initial value, decrements once per tick and stops at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    initial: u32,
    remaining: u32,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_WINDOW_SECS)
    }
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            initial: seconds,
            remaining: seconds,
        }
    }

    /// Remaining time of a code issued at `issued_at` with a `window` second lifetime
    pub fn for_issued_at(issued_at: DateTime<Utc>, now: DateTime<Utc>, window: u32) -> Self {
        let elapsed = (now - issued_at).num_seconds().max(0);
        let remaining = (window as i64 - elapsed).max(0) as u32;
        Self {
            initial: window,
            remaining,
        }
    }

    /// Advances one second; returns the new remaining value
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Restarts from the initial value (resend)
    pub fn reset(&mut self) {
        self.remaining = self.initial;
    }

    /// `MM:SS`
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    /// Runs the countdown on a one-second interval
    ///
    /// The receiver observes every remaining value down to zero; the task
    /// ends after publishing zero or once all receivers are dropped.
    pub fn spawn(mut self) -> watch::Receiver<u32> {
        let (tx, rx) = watch::channel(self.remaining);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // first tick completes immediately
            interval.tick().await;

            while !self.is_finished() {
                interval.tick().await;
                if tx.send(self.tick()).is_err() {
                    break;
                }
            }
        });

        rx
    }
}
