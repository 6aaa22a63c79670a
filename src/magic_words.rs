//! Magic words: argument-less, template-like keywords such as
//! `{{CURRENTYEAR}}`.

use std::{collections::HashMap, fmt, sync::Arc};
use time::OffsetDateTime;

/// A magic word implementation.
pub type MagicWord = Box<dyn Fn() -> String + Send + Sync>;

/// A source of the current time for date and time magic words.
pub type Clock = Arc<dyn Fn(Zone) -> OffsetDateTime + Send + Sync>;

/// Magic word errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No magic word exists with the given name.
    #[error("unknown magic word '{0}'")]
    NotFound(String),
}

/// The time zone used by a date and time magic word.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Zone {
    /// `CURRENT*` magic words.
    Utc,
    /// `LOCAL*` magic words.
    Local,
}

/// A date field formatter.
type DateField = fn(&mut String, &OffsetDateTime) -> fmt::Result;

/// The name → implementation map of magic words.
pub struct MagicWordRegistry {
    /// Registered magic words. Names are case-sensitive.
    words: HashMap<String, MagicWord>,
}

impl MagicWordRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            words: HashMap::new(),
        }
    }

    /// Creates a registry containing the built-in date and time magic words,
    /// reading the time from the given clock.
    pub fn with_clock(clock: Clock) -> Self {
        let mut registry = Self::new();
        for (suffix, field) in DATE_FIELDS.entries() {
            for (prefix, zone) in [("CURRENT", Zone::Utc), ("LOCAL", Zone::Local)] {
                let clock = Arc::clone(&clock);
                let field = *field;
                registry.insert(format!("{prefix}{suffix}"), move || {
                    let mut out = String::new();
                    // Writing to a `String` never fails
                    let _ = field(&mut out, &clock(zone));
                    out
                });
            }
        }
        registry
    }

    /// Adds or replaces a magic word.
    pub fn insert<F>(&mut self, name: impl Into<String>, word: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.words.insert(name.into(), Box::new(word));
    }

    /// Returns true if a magic word with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.words.contains_key(name)
    }

    /// Evaluates the magic word with the given name.
    pub fn call(&self, name: &str) -> Result<String, Error> {
        self.words
            .get(name)
            .map(|word| word())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }
}

impl Default for MagicWordRegistry {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl fmt::Debug for MagicWordRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.words.keys()).finish()
    }
}

/// Returns a clock which reads the system time.
///
/// If the local offset cannot be determined, local time is UTC.
pub fn system_clock() -> Clock {
    Arc::new(|zone| match zone {
        Zone::Utc => OffsetDateTime::now_utc(),
        Zone::Local => OffsetDateTime::now_local().unwrap_or_else(|err| {
            log::debug!("could not read local time offset: {err}");
            OffsetDateTime::now_utc()
        }),
    })
}

/// Returns a clock which is stopped at the given time, for both zones.
pub fn fixed_clock(time: OffsetDateTime) -> Clock {
    Arc::new(move |_| time)
}

/// Date and time fields, by magic word suffix.
static DATE_FIELDS: phf::Map<&'static str, DateField> = phf::phf_map! {
    "YEAR" => date::year,
    "MONTH" => date::month_lz,
    "MONTH1" => date::month,
    "MONTHNAME" => date::month_name,
    "MONTHABBREV" => date::month_abbr,
    "DAY" => date::day,
    "DAY2" => date::day_lz,
    "DOW" => date::day_of_week,
    "DAYNAME" => date::day_name,
    "TIME" => date::clock_time,
    "HOUR" => date::hour,
    "WEEK" => date::week,
    "TIMESTAMP" => date::timestamp,
};

mod date {
    //! Date and time field formatters.

    use core::fmt::{self, Write as _};
    use time::OffsetDateTime;

    /// `{{LOCALTIME}}` or `{{CURRENTTIME}}`
    pub fn clock_time(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{:02}:{:02}", time.hour(), time.minute())
    }

    /// `{{LOCALDAY}}` or `{{CURRENTDAY}}`
    pub fn day(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", time.day())
    }

    /// `{{LOCALDAY2}}` or `{{CURRENTDAY2}}`
    pub fn day_lz(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{:02}", time.day())
    }

    /// `{{LOCALDAYNAME}}` or `{{CURRENTDAYNAME}}`
    pub fn day_name(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", time.weekday())
    }

    /// `{{LOCALDOW}}` or `{{CURRENTDOW}}`
    pub fn day_of_week(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", time.weekday().number_days_from_sunday())
    }

    /// `{{LOCALHOUR}}` or `{{CURRENTHOUR}}`
    pub fn hour(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{:02}", time.hour())
    }

    /// `{{LOCALMONTH1}}` or `{{CURRENTMONTH1}}`
    pub fn month(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", u8::from(time.month()))
    }

    /// `{{LOCALMONTHABBREV}}` or `{{CURRENTMONTHABBREV}}`
    pub fn month_abbr(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        let name = time.month().to_string();
        out.push_str(name.get(..3).unwrap_or(&name));
        Ok(())
    }

    /// `{{LOCALMONTH}}` or `{{CURRENTMONTH}}`
    pub fn month_lz(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{:02}", u8::from(time.month()))
    }

    /// `{{LOCALMONTHNAME}}` or `{{CURRENTMONTHNAME}}`
    pub fn month_name(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", time.month())
    }

    /// `{{LOCALTIMESTAMP}}` or `{{CURRENTTIMESTAMP}}`
    pub fn timestamp(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(
            out,
            "{}{:02}{:02}{:02}{:02}{:02}",
            time.year(),
            u8::from(time.month()),
            time.day(),
            time.hour(),
            time.minute(),
            time.second()
        )
    }

    /// `{{LOCALWEEK}}` or `{{CURRENTWEEK}}`
    pub fn week(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", time.iso_week())
    }

    /// `{{LOCALYEAR}}` or `{{CURRENTYEAR}}`
    pub fn year(out: &mut String, time: &OffsetDateTime) -> fmt::Result {
        write!(out, "{}", time.year())
    }
}
