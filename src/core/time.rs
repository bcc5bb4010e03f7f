use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime};

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
pub(crate) fn parse_instant(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
        .or_else(|_| {
            PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        })
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Parses a `YYYY-MM-DD` calendar day.
pub(crate) fn parse_day(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Open interval covering one UTC day: `(day 00:00, day 00:00 + 24h)`.
pub(crate) fn day_window(day: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = day.midnight().assume_utc();
    (start, start + Duration::days(1))
}

/// Time left before `deadline`, or `None` once it has passed.
pub(crate) fn remaining_until(
    deadline: OffsetDateTime,
    now: OffsetDateTime,
) -> Option<std::time::Duration> {
    let left = deadline - now;
    if left <= Duration::ZERO {
        return None;
    }
    std::time::Duration::try_from(left).ok()
}
