//! Human-readable request numbers: `REQ-<year>-<NNNN>`.
//!
//! This module only knows the format. Serialising allocation across
//! concurrent writers is the storage backend's job; it feeds the most recent
//! number it holds for the year into [`next_after`] while holding a write
//! lock.

use std::fmt;

use serde::{Deserialize, Serialize};

const PREFIX: &str = "REQ";
const WIDTH: usize = 4;

/// A formatted request number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestNumber(String);

impl RequestNumber {
  pub fn format(year: i32, sequence: u32) -> Self {
    Self(format!("{PREFIX}-{year}-{sequence:0width$}", width = WIDTH))
  }

  /// Wrap a number read back from storage. No format check: legacy rows
  /// may not follow the current shape.
  pub fn from_stored(s: String) -> Self { Self(s) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for RequestNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

fn is_counter(s: &str) -> bool {
  s.len() >= WIDTH && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parse the trailing counter of `number` if it belongs to `year`.
pub fn parse_sequence(number: &str, year: i32) -> Option<u32> {
  let expected = format!("{PREFIX}-{year}-");
  let counter = number.strip_prefix(&expected)?;
  if !is_counter(counter) {
    return None;
  }
  counter.parse().ok()
}

/// Outcome of computing the next number for a year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextNumber {
  pub number:    RequestNumber,
  /// Set when a previous number existed but its counter did not parse and
  /// the sequence restarted at 1.
  pub restarted: bool,
}

/// The number following `latest`, the most recently inserted number for
/// `year`. No prior number starts the year at 1. A prior number whose
/// counter does not parse also restarts at 1 and is flagged so the caller
/// can report it.
pub fn next_after(latest: Option<&str>, year: i32) -> NextNumber {
  match latest {
    None => NextNumber {
      number:    RequestNumber::format(year, 1),
      restarted: false,
    },
    Some(prev) => match parse_sequence(prev, year) {
      Some(n) => NextNumber {
        number:    RequestNumber::format(year, n.saturating_add(1)),
        restarted: false,
      },
      None => NextNumber {
        number:    RequestNumber::format(year, 1),
        restarted: true,
      },
    },
  }
}
