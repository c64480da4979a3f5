//! Command parsing and execution for the `grc` binary.
//!
//! # Invariants
//! - Commands write results to the provided writer only; diagnostics go to
//!   the log.
//! - Every draft edit that changes the draft is recorded in the activity feed.

use grc_core::db::DbError;
use grc_core::{
    normalize_to_100, ActivityAction, ActivityFeed, ActivityKind, ConfigError, ConsoleConfig,
    DraftError, MappingChange, MappingDraft, MappingSet, SqliteSessionStore, StoreError,
    WeightedItem,
};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::Path;

pub const USAGE: &str = "usage:
  grc ping | version
  grc normalize <weight>...
  grc draft <base.json> show | diff | changes
  grc draft <base.json> add <requirement> <control> [weight]
  grc draft <base.json> weight <requirement> <control> <weight>
  grc draft <base.json> remove <requirement> <control>
  grc draft <base.json> normalize <requirement>
  grc draft <base.json> reset | export [dir]
  grc feed [limit] | feed clear";

const DEFAULT_FEED_LIMIT: usize = 10;

#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Config(ConfigError),
    Db(DbError),
    Store(StoreError),
    Draft(DraftError),
    Baseline(String),
    Io(std::io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{message}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Draft(err) => write!(f, "{err}"),
            Self::Baseline(message) => write!(f, "cannot load baseline: {message}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Draft(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Usage(_) | Self::Baseline(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DraftError> for CliError {
    fn from(value: DraftError) -> Self {
        Self::Draft(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Handles commands that need no configuration or storage.
///
/// Returns `true` when the command was handled.
pub fn run_probe(args: &[String], out: &mut impl Write) -> Result<bool, CliError> {
    match args.first().map(String::as_str) {
        Some("ping") => writeln!(out, "grc_core ping={}", grc_core::ping())?,
        Some("version") => writeln!(out, "grc_core version={}", grc_core::core_version())?,
        Some("normalize") => normalize(&args[1..], out)?,
        None | Some("help" | "--help" | "-h") => writeln!(out, "{USAGE}")?,
        Some(_) => return Ok(false),
    }
    Ok(true)
}

/// Runs a storage-backed command against an opened database.
pub fn run_command(
    config: &ConsoleConfig,
    conn: &Connection,
    args: &[String],
    out: &mut impl Write,
) -> Result<(), CliError> {
    match args.first().map(String::as_str) {
        Some("draft") => {
            let base_path = args
                .get(1)
                .ok_or_else(|| CliError::Usage("draft requires a baseline file".to_string()))?;
            let base = load_baseline(Path::new(base_path))?;
            draft(config, conn, base, &args[2..], out)
        }
        Some("feed") => feed(config, conn, &args[1..], out),
        Some(other) => Err(CliError::Usage(format!("unknown command `{other}`"))),
        None => Err(CliError::Usage("missing command".to_string())),
    }
}

fn normalize(args: &[String], out: &mut impl Write) -> Result<(), CliError> {
    if args.is_empty() {
        return Err(CliError::Usage("normalize requires weights".to_string()));
    }
    let items = args
        .iter()
        .enumerate()
        .map(|(index, raw)| -> Result<WeightedItem<usize>, CliError> {
            Ok(WeightedItem::new(index + 1, parse_arg(raw, "weight")?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for item in normalize_to_100(&items) {
        writeln!(out, "{}\t{}", item.id, item.weight)?;
    }
    Ok(())
}

fn draft(
    config: &ConsoleConfig,
    conn: &Connection,
    base: MappingSet,
    args: &[String],
    out: &mut impl Write,
) -> Result<(), CliError> {
    let store = SqliteSessionStore::try_new(conn, config.session_id.as_str())?;
    let mut draft = MappingDraft::open(base, store)?;
    let version_id = draft.version_id();

    let edited = match args.first().map(String::as_str) {
        None | Some("show") => {
            write_draft(&draft, out)?;
            None
        }
        Some("diff") => {
            let summary = draft.diff_summary();
            for (requirement_id, diff) in &summary.requirements {
                writeln!(
                    out,
                    "{requirement_id}\t+{} -{} ~{}",
                    diff.added, diff.removed, diff.changed
                )?;
            }
            writeln!(out, "total\t{}", summary.totals.total)?;
            None
        }
        Some("changes") => {
            for change in draft.pending_changes() {
                writeln!(out, "{}", describe_change(&change))?;
            }
            None
        }
        Some("add") => {
            let requirement_id = required(args, 1, "requirement")?;
            let control_id = parse_arg(required(args, 2, "control")?, "control")?;
            let added = match args.get(3) {
                Some(raw) => draft.add_mapping(requirement_id, control_id, parse_arg(raw, "weight")?),
                None => draft.add_default_mapping(requirement_id, control_id),
            };
            writeln!(out, "{}", if added { "added" } else { "unchanged" })?;
            added.then_some(ActivityAction::Created)
        }
        Some("weight") => {
            let requirement_id = required(args, 1, "requirement")?;
            let control_id = parse_arg(required(args, 2, "control")?, "control")?;
            let weight = parse_arg(required(args, 3, "weight")?, "weight")?;
            let updated = draft.update_weight(requirement_id, control_id, weight);
            writeln!(out, "{}", if updated { "updated" } else { "not mapped" })?;
            updated.then_some(ActivityAction::Updated)
        }
        Some("remove") => {
            let requirement_id = required(args, 1, "requirement")?;
            let control_id = parse_arg(required(args, 2, "control")?, "control")?;
            let removed = draft.remove_mapping(requirement_id, control_id);
            writeln!(out, "{}", if removed { "removed" } else { "not mapped" })?;
            removed.then_some(ActivityAction::Deleted)
        }
        Some("normalize") => {
            let requirement_id = required(args, 1, "requirement")?;
            let normalized = draft.normalize_requirement(requirement_id);
            writeln!(
                out,
                "{}\ttotal={}",
                if normalized { "normalized" } else { "not mapped" },
                draft.total_weight(requirement_id)
            )?;
            normalized.then_some(ActivityAction::Updated)
        }
        Some("reset") => {
            draft.reset_draft();
            writeln!(out, "reset")?;
            Some(ActivityAction::Reset)
        }
        Some("export") => {
            let dir = args
                .get(1)
                .map(|raw| Path::new(raw).to_path_buf())
                .unwrap_or_else(|| config.export_dir());
            let path = draft.export_to_dir(dir)?;
            writeln!(out, "{}", path.display())?;
            Some(ActivityAction::Exported)
        }
        Some(other) => return Err(CliError::Usage(format!("unknown draft command `{other}`"))),
    };

    if let Some(message) = draft.last_persist_error() {
        writeln!(out, "warning: draft not saved: {message}")?;
    }

    if let Some(action) = edited {
        let feed_store = SqliteSessionStore::try_new(conn, config.session_id.as_str())?;
        let mut feed = ActivityFeed::open(feed_store, config.feed_capacity);
        let label = format!("mapping draft v{version_id}");
        if let Err(err) = feed.record(ActivityKind::Mapping, action, label) {
            log::warn!("event=feed_record module=cli status=error error={err}");
        }
    }
    Ok(())
}

fn feed(
    config: &ConsoleConfig,
    conn: &Connection,
    args: &[String],
    out: &mut impl Write,
) -> Result<(), CliError> {
    let store = SqliteSessionStore::try_new(conn, config.session_id.as_str())?;
    let mut feed = ActivityFeed::open(store, config.feed_capacity);

    match args.first().map(String::as_str) {
        Some("clear") => {
            feed.clear();
            writeln!(out, "cleared")?;
        }
        limit => {
            let limit = match limit {
                Some(raw) => parse_arg(raw, "limit")?,
                None => DEFAULT_FEED_LIMIT,
            };
            for entry in feed.recent(limit) {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    entry.at_ms,
                    entry.kind.as_str(),
                    entry.action.as_str(),
                    entry.label
                )?;
            }
        }
    }
    Ok(())
}

fn write_draft<S: grc_core::SessionStore>(
    draft: &MappingDraft<S>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    writeln!(out, "version {}", draft.version_id())?;
    for requirement_id in draft.requirement_ids() {
        let diff = draft.diff_for_requirement(&requirement_id);
        writeln!(
            out,
            "{requirement_id}\ttotal={}\t+{} -{} ~{}",
            draft.total_weight(&requirement_id),
            diff.added,
            diff.removed,
            diff.changed
        )?;
        for row in draft.get_for_requirement(&requirement_id) {
            writeln!(out, "  {}\t{}", row.control_id, row.weight)?;
        }
    }
    Ok(())
}

fn describe_change(change: &MappingChange) -> String {
    match change {
        MappingChange::Added {
            requirement_id,
            control_id,
            weight,
        } => format!("+ {requirement_id}\t{control_id}\t{weight}"),
        MappingChange::Removed {
            requirement_id,
            control_id,
        } => format!("- {requirement_id}\t{control_id}"),
        MappingChange::Reweighted {
            requirement_id,
            control_id,
            from,
            to,
        } => format!("~ {requirement_id}\t{control_id}\t{from}->{to}"),
    }
}

fn load_baseline(path: &Path) -> Result<MappingSet, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| CliError::Baseline(format!("{}: {err}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|err| CliError::Baseline(format!("{}: {err}", path.display())))
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, CliError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("missing <{name}>")))
}

fn parse_arg<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, CliError> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::Usage(format!("invalid {name} `{raw}`")))
}
