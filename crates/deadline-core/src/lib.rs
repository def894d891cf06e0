pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod history;
pub mod render;
pub mod session;
pub mod storage;
pub mod task;
pub mod task_store;
pub mod theme;
pub mod view;
#[cfg(feature = "web")]
pub mod web_storage;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use session::Session;
pub use storage::KeyValueStore;
pub use task::{
  Priority,
  Task
};
pub use task_store::Rejection;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting deadline CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.deadlinerc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    storage::DirStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open data \
           directory at {}",
          data_dir.display()
        )
      })?;

  let tab = cli
    .tab
    .clone()
    .unwrap_or_else(|| {
      cfg.default_tab()
    });
  let mut session =
    Session::open(store, &tab);

  let stdout = io::stdout();
  let renderer = render::Renderer::new(
    &cfg,
    stdout.is_terminal()
  );
  let today =
    datetime::local_date(Utc::now());

  let mut out = stdout.lock();
  commands::dispatch(
    &mut session,
    &cfg,
    &renderer,
    &mut out,
    today,
    cli
      .command
      .unwrap_or(cli::Command::List)
  )?;

  info!("done");
  Ok(())
}
