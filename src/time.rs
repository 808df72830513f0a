// Copyright 2017-2018 Peter Williams <peter@newton.cx> and collaborators
// Licensed under the MIT License

/*! Time values and timeouts.

DRMAA2 stores times as `time_t`, with the values -3 through 0 reserved:
0 is "zero", -1 "infinite", -2 "now" and -3 "unset". Anything else is
seconds since the epoch (for instants) or a number of seconds (for
timeouts and durations).

*/

use chrono::{DateTime, TimeZone, Utc};
use libc::time_t;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// The value of a time field: a real instant or one of the magic values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeValue {
    Zero,
    Infinite,
    Now,
    At(DateTime<Utc>),
}

impl TimeValue {
    pub(crate) fn from_raw(raw: time_t) -> Option<TimeValue> {
        // The sentinels all sit at or below zero, so check them before
        // treating the value as a timestamp.
        match raw {
            sys::DRMAA2_UNSET_TIME => None,
            sys::DRMAA2_ZERO_TIME => Some(TimeValue::Zero),
            sys::DRMAA2_INFINITE_TIME => Some(TimeValue::Infinite),
            sys::DRMAA2_NOW => Some(TimeValue::Now),
            t => Utc.timestamp_opt(t as i64, 0).single().map(TimeValue::At),
        }
    }

    /// Instants must fall after the epoch, where the magic values cannot
    /// be confused with them, and must be whole seconds.
    pub(crate) fn to_raw(value: Option<TimeValue>, field: &'static str) -> Result<time_t, Error> {
        Ok(match value {
            None => sys::DRMAA2_UNSET_TIME,
            Some(TimeValue::Zero) => sys::DRMAA2_ZERO_TIME,
            Some(TimeValue::Infinite) => sys::DRMAA2_INFINITE_TIME,
            Some(TimeValue::Now) => sys::DRMAA2_NOW,
            Some(TimeValue::At(t)) => {
                let out_of_range = || Error::OutOfRange { field, value: t.to_rfc3339() };

                if t.timestamp() <= 0 || t.timestamp_subsec_nanos() != 0 {
                    return Err(out_of_range());
                }

                time_t::try_from(t.timestamp()).map_err(|_| out_of_range())?
            }
        })
    }

    /// The instant, if this is not one of the magic values.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match *self {
            TimeValue::At(t) => Some(t),
            _ => None,
        }
    }
}

impl From<DateTime<Utc>> for TimeValue {
    fn from(t: DateTime<Utc>) -> Self {
        TimeValue::At(t)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TimeValue::Zero => f.write_str("zero"),
            TimeValue::Infinite => f.write_str("infinite"),
            TimeValue::Now => f.write_str("now"),
            TimeValue::At(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl FromStr for TimeValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "zero" => Ok(TimeValue::Zero),
            "infinite" => Ok(TimeValue::Infinite),
            "now" => Ok(TimeValue::Now),
            _ => DateTime::parse_from_rfc3339(s)
                .map(|t| TimeValue::At(t.with_timezone(&Utc)))
                .map_err(|_| Error::UnknownSymbol { kind: "time", name: s.to_owned() }),
        }
    }
}


/// How long a blocking wait may take.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Timeout {
    /// Check once and return immediately.
    Zero,

    /// Wait as long as it takes.
    Infinite,

    /// The library's "now" value, which Grid Engine treats like `Zero`.
    Now,

    After(Duration),
}

impl Timeout {
    pub(crate) fn to_raw(self) -> time_t {
        match self {
            Timeout::Zero => sys::DRMAA2_ZERO_TIME,
            Timeout::Infinite => sys::DRMAA2_INFINITE_TIME,
            Timeout::Now => sys::DRMAA2_NOW,
            Timeout::After(d) => {
                let secs = d.as_secs();

                if secs > time_t::max_value() as u64 {
                    time_t::max_value()
                } else {
                    // Sub-second waits round down to a zero timeout.
                    secs as time_t
                }
            }
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::After(d)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Timeout::Zero => f.write_str("zero"),
            Timeout::Infinite => f.write_str("infinite"),
            Timeout::Now => f.write_str("now"),
            Timeout::After(d) => write!(f, "{}s", d.as_secs()),
        }
    }
}

/// Parses the symbolic names, or a whole number of seconds with an
/// optional trailing `s`.
impl FromStr for Timeout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "zero" => Ok(Timeout::Zero),
            "infinite" => Ok(Timeout::Infinite),
            "now" => Ok(Timeout::Now),
            _ => s
                .strip_suffix('s')
                .unwrap_or(s)
                .parse::<u64>()
                .map(|n| Timeout::After(Duration::from_secs(n)))
                .map_err(|_| Error::UnknownSymbol { kind: "timeout", name: s.to_owned() }),
        }
    }
}
