use std::sync::OnceLock;

use chrono::{
  DateTime,
  Datelike,
  FixedOffset,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeDelta,
  Utc
};
use regex::Regex;

const ISO_FORMAT: &str =
  "%Y-%m-%dT%H:%M:%S%.f";

/// Years a parsed timestamp may fall
/// in; anything outside is absent.
const SUPPORTED_YEARS: std::ops::RangeInclusive<
  i32
> = 1..=9999;

const OFFSET_FORMATS: [&str; 6] = [
  "%Y-%m-%dT%H:%M:%S%.f%:z",
  "%Y-%m-%dT%H:%M:%S%.f%z",
  "%Y-%m-%d %H:%M:%S%.f%:z",
  "%Y-%m-%d %H:%M:%S%.f%z",
  "%Y-%m-%dT%H:%M%:z",
  "%Y-%m-%d %H:%M%:z"
];

const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M"
];

/// A date as it reaches the pipeline,
/// before normalization.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum DateValue<'a> {
  /// Already canonical naive UTC.
  Canonical(NaiveDateTime),
  /// Parsed but still zone-aware.
  Zoned(DateTime<FixedOffset>),
  /// Raw ISO-8601 text.
  Text(&'a str)
}

impl From<NaiveDateTime>
  for DateValue<'_>
{
  fn from(value: NaiveDateTime) -> Self {
    Self::Canonical(value)
  }
}

impl From<DateTime<FixedOffset>>
  for DateValue<'_>
{
  fn from(
    value: DateTime<FixedOffset>
  ) -> Self {
    Self::Zoned(value)
  }
}

impl From<DateTime<Utc>>
  for DateValue<'_>
{
  fn from(value: DateTime<Utc>) -> Self {
    Self::Canonical(value.naive_utc())
  }
}

impl<'a> From<&'a str>
  for DateValue<'a>
{
  fn from(value: &'a str) -> Self {
    Self::Text(value)
  }
}

/// Collapses any supported date
/// representation into a naive UTC
/// timestamp. Unparseable input yields
/// `None`, never an error.
#[must_use]
pub fn normalize(
  value: Option<DateValue<'_>>
) -> Option<NaiveDateTime> {
  match value? {
    | DateValue::Canonical(ndt) => {
      Some(ndt)
    }
    | DateValue::Zoned(dt) => {
      Some(dt.naive_utc())
    }
    | DateValue::Text(raw) => {
      parse_text(raw)
        .filter(within_supported_years)
    }
  }
}

#[must_use]
pub fn parse_timestamp(
  raw: &str
) -> Option<NaiveDateTime> {
  normalize(Some(DateValue::Text(raw)))
}

#[must_use]
pub fn format_iso(
  dt: &NaiveDateTime
) -> String {
  dt.format(ISO_FORMAT).to_string()
}

fn within_supported_years(
  ts: &NaiveDateTime
) -> bool {
  let ok =
    SUPPORTED_YEARS.contains(&ts.year());
  if !ok {
    tracing::debug!(
      year = ts.year(),
      "timestamp outside supported years; \
       treating as absent"
    );
  }
  ok
}

fn parse_text(
  raw: &str
) -> Option<NaiveDateTime> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.naive_utc());
  }

  let zoned = token
    .strip_suffix('Z')
    .or_else(|| {
      token.strip_suffix('z')
    })
    .map(|rest| format!("{rest}+00:00"));
  let candidate =
    zoned.as_deref().unwrap_or(token);

  for fmt in OFFSET_FORMATS {
    if let Ok(dt) =
      DateTime::parse_from_str(
        candidate, fmt
      )
    {
      return Some(dt.naive_utc());
    }
  }

  if zoned.is_none() {
    for fmt in NAIVE_FORMATS {
      if let Ok(ndt) =
        NaiveDateTime::parse_from_str(
          token, fmt
        )
      {
        return Some(ndt);
      }
    }

    if let Ok(date) =
      NaiveDate::parse_from_str(
        token, "%Y-%m-%d"
      )
    {
      return Some(
        date.and_time(NaiveTime::MIN)
      );
    }
  }

  tracing::debug!(
    input = raw,
    "unrecognized timestamp; treating \
     as absent"
  );
  None
}

/// Parses a query parameter date. On
/// top of ISO-8601 this understands
/// `now`, `today`, `tomorrow`,
/// `yesterday` and `+Nd`/`-Nh`/`+Nm`
/// offsets from `now`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_query_date(
  input: &str,
  now: NaiveDateTime
) -> Option<NaiveDateTime> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let midnight = now
    .date()
    .and_time(NaiveTime::MIN);

  match lower.as_str() {
    | "now" => return Some(now),
    | "today" => return Some(midnight),
    | "tomorrow" => {
      return midnight.checked_add_signed(
        TimeDelta::days(1)
      );
    }
    | "yesterday" => {
      return midnight.checked_sub_signed(
        TimeDelta::days(1)
      );
    }
    | _ => {}
  }

  if let Some(caps) = relative_re()
    .and_then(|re| re.captures(token))
  {
    let num: i64 =
      caps.name("num")?.as_str().parse().ok()?;
    let delta =
      match caps.name("unit")?.as_str() {
        | "d" => TimeDelta::try_days(num)?,
        | "h" => TimeDelta::try_hours(num)?,
        | "m" => {
          TimeDelta::try_minutes(num)?
        }
        | _ => return None
      };

    let shifted = if caps
      .name("sign")?
      .as_str()
      == "-"
    {
      now.checked_sub_signed(delta)
    } else {
      now.checked_add_signed(delta)
    };
    return shifted
      .filter(within_supported_years);
  }

  parse_timestamp(token)
}

fn relative_re() -> Option<&'static Regex>
{
  static RELATIVE_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  RELATIVE_RE
    .get_or_init(|| {
      Regex::new(
        r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$"
      )
      .map_err(|err| {
        tracing::error!(
          error = %err,
          "internal regex compile failure"
        );
      })
      .ok()
    })
    .as_ref()
}

/// Serde adapter for optional canonical
/// timestamps. Writes ISO-8601 without a
/// zone suffix; reads leniently through
/// the normalizer, so a malformed stored
/// value comes back as `None`.
pub mod iso_date_serde {
  use chrono::NaiveDateTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };
  use serde_json::Value;

  pub fn serialize<S>(
    dt: &Option<NaiveDateTime>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match dt {
      | Some(value) => {
        serializer.serialize_str(
          &super::format_iso(value)
        )
      }
      | None => serializer.serialize_none()
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<
    Option<NaiveDateTime>,
    D::Error
  >
  where
    D: Deserializer<'de>
  {
    let raw =
      Option::<Value>::deserialize(
        deserializer
      )?;
    Ok(match raw {
      | Some(Value::String(text)) => {
        let parsed =
          super::parse_timestamp(&text);
        if parsed.is_none()
          && !text.trim().is_empty()
        {
          tracing::warn!(
            value = %text,
            "stored timestamp is malformed; \
             treating as absent"
          );
        }
        parsed
      }
      | Some(Value::Null) | None => None,
      | Some(other) => {
        tracing::warn!(
          value = %other,
          "stored timestamp has wrong type; \
           treating as absent"
        );
        None
      }
    })
  }
}
