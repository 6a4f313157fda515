//! Author, committer and tagger signatures
//!
//! ## Format
//!
//! ```text
//! <name tokens...> <<email>> <unix-seconds> <±HHMM>
//! ```
//!
//! The instant comes from the unix timestamp alone. The timezone offset is kept
//! next to it and never folded into the instant.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Regex for the `±HHMM` timezone token
const TZ_OFFSET_REGEX: &str = r"^([+-]?)(\d{2})(\d{2})$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    name: String,
    email: String,
    instant: DateTime<Utc>,
    tz_offset_millis: i64,
}

impl Actor {
    pub fn new(name: String, email: String, instant: DateTime<Utc>, tz_offset_millis: i64) -> Self {
        Actor {
            name,
            email,
            instant,
            tz_offset_millis,
        }
    }

    /// Build an actor from the whitespace-separated tokens following the
    /// header key. The last three tokens are email, timestamp and offset; any
    /// tokens before them form the name.
    pub fn from_tokens(kind: &'static str, tokens: &[&str]) -> Result<Self> {
        let [name @ .., email, timestamp, tz_offset] = tokens else {
            return Err(Error::parse(
                kind,
                format!("signature needs email, timestamp and offset: {tokens:?}"),
            ));
        };

        let email = email
            .strip_prefix('<')
            .and_then(|email| email.strip_suffix('>'))
            .ok_or_else(|| Error::parse(kind, format!("email not wrapped in <>: {email}")))?;

        let seconds = timestamp
            .parse::<i64>()
            .map_err(|_| Error::parse(kind, format!("invalid timestamp {timestamp}")))?;
        let instant = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| Error::parse(kind, format!("timestamp out of range {timestamp}")))?;

        Ok(Actor {
            name: name.join(" "),
            email: email.to_string(),
            instant,
            tz_offset_millis: Self::parse_tz_offset(kind, tz_offset)?,
        })
    }

    fn parse_tz_offset(kind: &'static str, token: &str) -> Result<i64> {
        let invalid = || Error::parse(kind, format!("invalid timezone offset {token}"));
        let captures = regex::Regex::new(TZ_OFFSET_REGEX)
            .map_err(|_| invalid())?
            .captures(token)
            .ok_or_else(invalid)?;

        let sign = if &captures[1] == "-" { -1 } else { 1 };
        let hours = captures[2].parse::<i64>().map_err(|_| invalid())?;
        let minutes = captures[3].parse::<i64>().map_err(|_| invalid())?;

        Ok(sign * (hours * 60 + minutes) * MILLIS_PER_MINUTE)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn tz_offset_millis(&self) -> i64 {
        self.tz_offset_millis
    }

    /// Format the offset back into `±HHMM`
    pub fn tz_offset(&self) -> String {
        let sign = if self.tz_offset_millis < 0 { '-' } else { '+' };
        let minutes = self.tz_offset_millis.abs() / MILLIS_PER_MINUTE;
        format!("{}{:02}{:02}", sign, minutes / 60, minutes % 60)
    }

    /// Format complete actor info as stored in the object
    ///
    /// String in format "Name <email> timestamp timezone"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.instant.timestamp(),
            self.tz_offset()
        )
    }
}
