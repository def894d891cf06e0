use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::session::DEFAULT_CATEGORY;

const RC_ENV_VAR: &str = "DEADLINERC";
const RC_FILE_NAME: &str =
  ".deadlinerc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "data.location".to_string(),
      "~/.deadline".to_string()
    );
    map.insert(
      "tabs".to_string(),
      DEFAULT_CATEGORY.to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading deadlinerc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no deadlinerc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// `None` when the key is unset or
  /// holds something other than an
  /// on/off word.
  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    let value = self.map.get(key)?;
    let flag = parse_bool(value);
    if flag.is_none() {
      warn!(key, value = %value, "not a boolean setting");
    }
    flag
  }

  /// Configured tab names, in order,
  /// without blanks or repeats.
  pub fn tabs(&self) -> Vec<String> {
    let mut out: Vec<String> =
      Vec::new();
    for name in self
      .get("tabs")
      .unwrap_or_default()
      .split(',')
      .map(str::trim)
      .filter(|name| !name.is_empty())
    {
      if !out.iter().any(|t| t == name)
      {
        out.push(name.to_string());
      }
    }
    if out.is_empty() {
      out.push(
        DEFAULT_CATEGORY.to_string()
      );
    }
    out
  }

  pub fn default_tab(&self) -> String {
    self
      .get("default.tab")
      .map(|tab| tab.trim().to_string())
      .filter(|tab| !tab.is_empty())
      .or_else(|| {
        self.tabs().into_iter().next()
      })
      .unwrap_or_else(|| {
        DEFAULT_CATEGORY.to_string()
      })
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let text = fs::read_to_string(path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    self.loaded_files.push(path.to_path_buf());

    let dir = path
      .parent()
      .unwrap_or_else(|| Path::new("."));
    for (idx, raw) in
      text.lines().enumerate()
    {
      let entry = parse_line(raw)
        .with_context(|| {
          format!(
            "{}:{}",
            path.display(),
            idx + 1
          )
        })?;
      match entry {
        | None => {}
        | Some(RcLine::Setting(key, value)) => {
          trace!(key, value, "config setting");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
        | Some(RcLine::Include(target)) => {
          let target =
            dir.join(expand_home(target));
          if self.loaded_files.contains(&target) {
            warn!(include = %target.display(), "include cycle; skipping");
          } else if !target.is_file() {
            warn!(include = %target.display(), "missing include; skipping");
          } else {
            debug!(include = %target.display(), "following include");
            self.load_file(&target)?;
          }
        }
      }
    }

    Ok(())
  }
}

enum RcLine<'a> {
  Include(&'a str),
  Setting(&'a str, &'a str)
}

/// Blank and comment-only lines yield
/// `None`.
fn parse_line(
  raw: &str
) -> anyhow::Result<Option<RcLine<'_>>> {
  let line = raw
    .split('#')
    .next()
    .unwrap_or_default()
    .trim();
  if line.is_empty() {
    return Ok(None);
  }

  if let Some(target) =
    line.strip_prefix("include ")
  {
    let target = target.trim();
    if target.is_empty() {
      bail!("include needs a path");
    }
    return Ok(Some(RcLine::Include(target)));
  }

  match line.split_once('=') {
    | Some((key, value)) => Ok(Some(
      RcLine::Setting(key.trim(), value.trim())
    )),
    | None => {
      bail!("expected key = value, got {raw:?}")
    }
  }
}

/// Command-line override first, then
/// `data.location`, then `~/.deadline`.
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  if let Some(dir) = override_dir {
    return Ok(dir.to_path_buf());
  }
  let location = cfg
    .get("data.location")
    .filter(|v| !v.trim().is_empty())
    .unwrap_or_else(|| {
      "~/.deadline".to_string()
    });
  let dir = expand_home(location.trim());
  if dir.starts_with("~") {
    bail!(
      "cannot expand {location}: no home \
       directory"
    );
  }
  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(expand_home(
      &path.to_string_lossy()
    )));
  }

  match std::env::var(RC_ENV_VAR) {
    | Ok(value) if value == "/dev/null" => {
      return Ok(None);
    }
    | Ok(value) => {
      return Ok(Some(expand_home(&value)));
    }
    | Err(_) => {}
  }

  let Some(home) = dirs::home_dir() else {
    warn!("no home directory; skipping deadlinerc");
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  Ok(candidate.is_file().then_some(candidate))
}

/// Leading `~/` becomes the home
/// directory when one is known.
fn expand_home(raw: &str) -> PathBuf {
  match (raw.strip_prefix("~/"), dirs::home_dir()) {
    | (Some(rest), Some(home)) => home.join(rest),
    | _ => PathBuf::from(raw)
  }
}

fn parse_bool(s: &str) -> Option<bool> {
  match s.trim().to_ascii_lowercase().as_str() {
    | "1" | "y" | "yes" | "on" | "true" => Some(true),
    | "0" | "n" | "no" | "off" | "false" => Some(false),
    | _ => None
  }
}
