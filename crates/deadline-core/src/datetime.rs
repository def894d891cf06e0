use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str =
  "deadline-time.toml";
const TIMEZONE_ENV_VAR: &str =
  "DEADLINE_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str =
  "DEADLINE_TIME_CONFIG";

pub const DATE_FORMAT: &str =
  "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
  timezone: Option<String>,
  time:     Option<TimezoneSection>
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
  timezone: Option<String>
}

/// Configured zone for "today", or
/// `None` to follow the system clock.
pub fn project_timezone()
-> Option<&'static Tz> {
  static PROJECT_TZ: OnceLock<
    Option<Tz>
  > = OnceLock::new();
  PROJECT_TZ
    .get_or_init(
      resolve_project_timezone
    )
    .as_ref()
}

#[must_use]
pub fn local_date(
  now: DateTime<Utc>
) -> NaiveDate {
  match project_timezone() {
    | Some(tz) => {
      now.with_timezone(tz).date_naive()
    }
    | None => {
      now
        .with_timezone(&Local)
        .date_naive()
    }
  }
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date.format(DATE_FORMAT).to_string()
}

fn resolve_project_timezone()
-> Option<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(
        &raw,
        TIMEZONE_ENV_VAR
      )
  {
    return Some(tz);
  }

  if let Some(path) =
    timezone_config_path()
    && let Some(tz) =
      load_timezone_from_file(&path)
  {
    return Some(tz);
  }

  tracing::debug!(
    "no timezone configured; using \
     system local time"
  );
  None
}

fn timezone_config_path()
-> Option<PathBuf> {
  if let Ok(raw) = std::env::var(
    TIMEZONE_CONFIG_ENV_VAR
  ) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  std::env::current_dir().ok().map(
    |dir| {
      dir.join(TIMEZONE_CONFIG_FILE)
    }
  )
}

fn load_timezone_from_file(
  path: &PathBuf
) -> Option<Tz> {
  if !path.exists() {
    tracing::debug!(
      file = %path.display(),
      "timezone config file not found"
    );
    return None;
  }

  let raw = match fs::read_to_string(
    path
  ) {
    | Ok(raw) => raw,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed reading timezone config file"
      );
      return None;
    }
  };

  let parsed = match toml::from_str::<
    TimezoneConfig
  >(&raw)
  {
    | Ok(parsed) => parsed,
    | Err(err) => {
      tracing::error!(
        file = %path.display(),
        error = %err,
        "failed parsing timezone config file"
      );
      return None;
    }
  };

  let timezone =
    parsed.timezone.or_else(|| {
      parsed.time.and_then(|section| {
        section.timezone
      })
    });
  let Some(timezone) = timezone else {
    tracing::warn!(
      file = %path.display(),
      "timezone config had no timezone field"
    );
    return None;
  };

  parse_timezone(
    timezone.as_str(),
    &format!("file:{}", path.display())
  )
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured project timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Resolves a due-date input to
/// `YYYY-MM-DD`. Relative forms are
/// measured from `today`.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<String> {
  let token = input.trim();
  let lower = token.to_ascii_lowercase();

  if lower.is_empty() {
    return Err(anyhow!(
      "due date is empty"
    ));
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      DATE_FORMAT
    )
  {
    return Ok(format_date(date));
  }

  let resolved = match lower.as_str() {
    | "today" | "now" => Some(today),
    | "tomorrow" => {
      today.succ_opt()
    }
    | "yesterday" => {
      today.pred_opt()
    }
    | other => {
      if let Some(weekday) =
        parse_weekday(other)
      {
        Some(next_weekday(
          today, weekday
        ))
      } else if let Some(caps) =
        Regex::new(
          r"^([+-]?)(\d{1,4})([dw])$"
        )
        .map_err(|e| {
          anyhow!(
            "internal regex compile \
             failure: {e}"
          )
        })?
        .captures(other)
      {
        let amount: i64 = caps[2]
          .parse()
          .map_err(|err| {
            anyhow!(
              "invalid offset \
               {other}: {err}"
            )
          })?;
        let days = match &caps[3] {
          | "w" => amount * 7,
          | _ => amount
        };
        let signed = if &caps[1] == "-"
        {
          -days
        } else {
          days
        };
        today.checked_add_signed(
          Duration::days(signed)
        )
      } else {
        None
      }
    }
  };

  resolved.map(format_date).ok_or_else(
    || {
      anyhow!(
        "unrecognized due date: \
         {token} (use YYYY-MM-DD, \
         today, tomorrow, a weekday \
         or +Nd/+Nw)"
      )
    }
  )
}

fn parse_weekday(
  token: &str
) -> Option<Weekday> {
  let weekday = match token {
    | "monday" | "mon" => Weekday::Mon,
    | "tuesday" | "tue" => Weekday::Tue,
    | "wednesday" | "wed" => {
      Weekday::Wed
    }
    | "thursday" | "thu" => {
      Weekday::Thu
    }
    | "friday" | "fri" => Weekday::Fri,
    | "saturday" | "sat" => {
      Weekday::Sat
    }
    | "sunday" | "sun" => Weekday::Sun,
    | _ => return None
  };
  Some(weekday)
}

fn next_weekday(
  today: NaiveDate,
  weekday: Weekday
) -> NaiveDate {
  let current =
    today.weekday().num_days_from_monday();
  let target =
    weekday.num_days_from_monday();
  let mut delta = (7 + target
    - current)
    % 7;
  if delta == 0 {
    delta = 7;
  }
  today + Duration::days(i64::from(delta))
}
