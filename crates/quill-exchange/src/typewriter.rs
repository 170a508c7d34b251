// SPDX-FileCopyrightText: 2026 Quill Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental reveal scheduler for answers that arrive faster than they
//! should be displayed.
//!
//! When a terminal payload lands before any token streamed, the store plays
//! the final text back through a [`Typewriter`]: a cursor advanced over the
//! string at a per-character interval clamped between a minimum and maximum,
//! with the whole reveal additionally capped so long answers still finish in
//! bounded time. Callers inject `Instant`s, which keeps pacing deterministic
//! under test.

use std::time::{Duration, Instant};

/// Pacing bounds for a reveal.
#[derive(Debug, Clone, Copy)]
pub struct RevealPacing {
    /// Fastest allowed per-character interval.
    pub min_char_delay: Duration,
    /// Slowest allowed per-character interval.
    pub max_char_delay: Duration,
    /// Upper bound on the whole reveal, shrinking the interval for long text.
    pub max_total: Duration,
}

impl Default for RevealPacing {
    fn default() -> Self {
        Self {
            min_char_delay: Duration::from_millis(8),
            max_char_delay: Duration::from_millis(40),
            max_total: Duration::from_millis(2500),
        }
    }
}

/// A cancellable cursor over a final string, advanced on each tick.
#[derive(Debug)]
pub struct Typewriter {
    text: String,
    /// Byte offset of each char boundary, with a trailing sentinel at `text.len()`.
    boundaries: Vec<usize>,
    cursor: usize,
    char_interval: Duration,
    last_release: Instant,
}

impl Typewriter {
    /// Starts a reveal over `text` at `now`.
    pub fn new(text: impl Into<String>, pacing: RevealPacing, now: Instant) -> Self {
        let text = text.into();
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());

        let char_count = boundaries.len() - 1;
        let char_interval = if char_count == 0 {
            pacing.min_char_delay
        } else {
            (pacing.max_total / char_count as u32)
                .clamp(pacing.min_char_delay, pacing.max_char_delay)
        };

        Self {
            text,
            boundaries,
            cursor: 0,
            char_interval,
            last_release: now,
        }
    }

    /// Advances the cursor by however many characters `now` has earned.
    ///
    /// Returns true if the cursor moved. Time is only consumed in whole
    /// character intervals, so fractional progress carries over to the next
    /// tick instead of being dropped.
    pub fn advance(&mut self, now: Instant) -> bool {
        if self.is_done() {
            return false;
        }
        let elapsed = now.duration_since(self.last_release);
        let steps = (elapsed.as_micros() / self.char_interval.as_micros().max(1)) as usize;
        if steps == 0 {
            return false;
        }
        let steps = steps.min(self.remaining());
        self.cursor += steps;
        self.last_release += self.char_interval * steps as u32;
        true
    }

    /// The revealed prefix of the final text.
    pub fn revealed(&self) -> &str {
        &self.text[..self.boundaries[self.cursor]]
    }

    /// The complete final text.
    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn is_done(&self) -> bool {
        self.cursor == self.boundaries.len() - 1
    }

    fn remaining(&self) -> usize {
        self.boundaries.len() - 1 - self.cursor
    }
}
