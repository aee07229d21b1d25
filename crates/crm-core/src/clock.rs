use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone};

/// Wall-clock instant with the operator's local offset attached. The offset
/// decides where calendar days begin and end for due-date checks.
pub type Timestamp = DateTime<FixedOffset>;

/// Source of "now". Injected everywhere a due date is computed or compared.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl FixedClock {
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Midnight at the start of `ts`'s calendar day, in `ts`'s own offset.
pub fn start_of_day(ts: &Timestamp) -> Timestamp {
    ts.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| ts.offset().from_local_datetime(&midnight).single())
        .unwrap_or(*ts)
}

/// The calendar day `ts` falls on when viewed from `offset`.
pub fn calendar_day(ts: &Timestamp, offset: &FixedOffset) -> NaiveDate {
    ts.with_timezone(offset).date_naive()
}

pub fn add_days(ts: &Timestamp, days: u32) -> Timestamp {
    *ts + Duration::days(i64::from(days))
}
