// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use roster_app::{
    Density, Field, LayoutMode, Preferences, SortKey, ViewCatalog, ViewSnapshot,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "roster";

pub const COLUMNS_KEY: &str = "registry.cols.v1";
pub const DENSITY_KEY: &str = "registry.density.v1";
pub const LAYOUT_KEY: &str = "registry.view.v1";
pub const SORT_KEY: &str = "registry.sort.v1";
pub const VIEWS_KEY: &str = "registry.views.v1";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[("settings", &["key", "value", "updated_at"])];

/// Key/value persistence for display preferences and saved views.
///
/// Every typed reader tolerates missing or malformed values by returning the
/// default; only storage failures surface as errors.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }
        Ok(())
    }

    pub fn load_preferences(&self) -> Result<Preferences> {
        Ok(Preferences {
            visible_columns: self.load_visible_columns()?,
            density: self.load_density()?,
            layout: self.load_layout()?,
            sort: self.load_sort()?,
        })
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.save_visible_columns(&preferences.visible_columns)?;
        self.put_setting_raw(DENSITY_KEY, preferences.density.as_str())?;
        self.put_setting_raw(LAYOUT_KEY, preferences.layout.as_str())?;
        self.save_sort(&preferences.sort)
    }

    /// JSON array of field keys. Unknown keys are dropped; an empty result
    /// falls back to the default column set.
    pub fn load_visible_columns(&self) -> Result<Vec<Field>> {
        let Some(raw) = self.get_setting_raw(COLUMNS_KEY)? else {
            return Ok(Field::default_visible());
        };
        let keys: Vec<String> = match serde_json::from_str(&raw) {
            Ok(keys) => keys,
            Err(error) => {
                debug!(key = COLUMNS_KEY, %error, "ignoring malformed setting");
                return Ok(Field::default_visible());
            }
        };
        let wanted: BTreeSet<Field> = keys.iter().filter_map(|key| Field::parse(key)).collect();
        let columns: Vec<Field> = Field::COLUMNS
            .into_iter()
            .filter(|field| wanted.contains(field))
            .collect();
        if columns.is_empty() {
            return Ok(Field::default_visible());
        }
        Ok(columns)
    }

    pub fn save_visible_columns(&self, columns: &[Field]) -> Result<()> {
        let keys: Vec<&str> = columns.iter().map(|field| field.key()).collect();
        let raw = serde_json::to_string(&keys).context("encode visible columns")?;
        self.put_setting_raw(COLUMNS_KEY, &raw)
    }

    pub fn load_density(&self) -> Result<Density> {
        let raw = self.get_setting_raw(DENSITY_KEY)?;
        Ok(parse_or_default(DENSITY_KEY, raw, Density::parse))
    }

    pub fn load_layout(&self) -> Result<LayoutMode> {
        let raw = self.get_setting_raw(LAYOUT_KEY)?;
        Ok(parse_or_default(LAYOUT_KEY, raw, LayoutMode::parse))
    }

    /// JSON array of `{key, direction}`. Any malformed entry discards the
    /// whole value.
    pub fn load_sort(&self) -> Result<Vec<SortKey>> {
        let raw = self.get_setting_raw(SORT_KEY)?;
        Ok(parse_or_default(SORT_KEY, raw, |raw| {
            serde_json::from_str(raw).ok()
        }))
    }

    pub fn save_sort(&self, sort: &[SortKey]) -> Result<()> {
        let raw = serde_json::to_string(sort).context("encode sort")?;
        self.put_setting_raw(SORT_KEY, &raw)
    }

    pub fn load_views(&self) -> Result<ViewCatalog> {
        let raw = self.get_setting_raw(VIEWS_KEY)?;
        let views: Vec<ViewSnapshot> = parse_or_default(VIEWS_KEY, raw, |raw| {
            serde_json::from_str(raw).ok()
        });
        Ok(ViewCatalog::new(views))
    }

    /// The whole catalogue is written as one value, so a save is atomic.
    pub fn save_views(&self, views: &ViewCatalog) -> Result<()> {
        let raw = serde_json::to_string(views).context("encode saved views")?;
        self.put_setting_raw(VIEWS_KEY, &raw)?;
        info!(count = views.len(), "saved views written");
        Ok(())
    }

    pub fn get_setting_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read setting {key}"))
    }

    pub fn put_setting_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET
                  value = excluded.value,
                  updated_at = excluded.updated_at
                ",
                params![key, value, now],
            )
            .with_context(|| format!("upsert setting {key}"))?;
        Ok(())
    }
}

fn parse_or_default<T: Default>(
    key: &str,
    raw: Option<String>,
    parse: impl FnOnce(&str) -> Option<T>,
) -> T {
    let Some(raw) = raw else {
        return T::default();
    };
    match parse(raw.trim()) {
        Some(value) => value,
        None => {
            debug!(key, value = %raw, "ignoring malformed setting");
            T::default()
        }
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("ROSTER_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set ROSTER_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("roster.db"))
}

pub fn export_dir() -> Result<PathBuf> {
    let root = dirs::download_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow!("cannot resolve a download or home directory for CSV export"))?;
    Ok(root)
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; point [storage].db_path at a roster database or remove the file"
            );
        }
        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing columns {}; remove the database so it can be recreated",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

#[cfg(test)]
mod tests {
    use super::parse_or_default;
    use roster_app::Density;

    #[test]
    fn parse_or_default_handles_missing_and_bad_values() {
        assert_eq!(parse_or_default("k", None, Density::parse), Density::Comfortable);
        assert_eq!(
            parse_or_default("k", Some("huge".to_owned()), Density::parse),
            Density::Comfortable
        );
        assert_eq!(
            parse_or_default("k", Some(" compact ".to_owned()), Density::parse),
            Density::Compact
        );
    }
}
