//! Sqlite-backed settings persistence.

use std::path::Path;

use anyhow::Context as _;
use rusqlite::{Connection, OptionalExtension as _};
use timetable_core::{LayoutConfig, Settings, Theme};

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                theme TEXT NOT NULL
            );
            INSERT OR IGNORE INTO settings (id, theme)
            VALUES (1, 'dark');
            "#,
        )?;

        self.add_settings_column("layout_json TEXT NOT NULL DEFAULT '{}'")?;
        Ok(())
    }

    fn add_settings_column(&self, definition: &str) -> anyhow::Result<()> {
        match self
            .conn
            .execute(&format!("ALTER TABLE settings ADD COLUMN {definition}"), [])
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                if msg.contains("duplicate column name") {
                    Ok(())
                } else {
                    Err(err).with_context(|| format!("add settings column: {definition}"))
                }
            }
        }
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT theme, layout_json FROM settings WHERE id = 1",
                [],
                |row| {
                    let theme: String = row.get(0)?;
                    let layout_json: String = row.get(1)?;
                    Ok((theme, layout_json))
                },
            )
            .optional()?;

        let (theme, layout_json) = match row {
            Some(value) => value,
            None => ("dark".to_string(), "{}".to_string()),
        };

        let theme = theme.parse::<Theme>().unwrap_or_default();
        let layout: LayoutConfig = serde_json::from_str(&layout_json).unwrap_or_else(|err| {
            log::warn!("ignoring unreadable layout settings: {err}");
            LayoutConfig::default()
        });

        let mut settings = Settings { theme, layout };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();
        let layout_json = serde_json::to_string(&settings.layout)?;

        self.conn.execute(
            "UPDATE settings SET theme = ?, layout_json = ? WHERE id = 1",
            (settings.theme.as_str(), layout_json),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_db_has_default_settings() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let settings = storage.load_settings()?;
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.layout, LayoutConfig::default());
        Ok(())
    }

    #[test]
    fn settings_roundtrip() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut settings = storage.load_settings()?;
        settings.theme = Theme::Light;
        settings.layout.anchor_day = "Monday".to_string();
        settings.layout.split_gap = 22.5;
        storage.save_settings(&settings)?;

        let settings2 = storage.load_settings()?;
        assert_eq!(settings2.theme, Theme::Light);
        assert_eq!(settings2.layout.anchor_day, "monday");
        assert_eq!(settings2.layout.split_gap, 22.5);
        Ok(())
    }

    #[test]
    fn unreadable_layout_falls_back_to_defaults() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        storage
            .conn
            .execute("UPDATE settings SET layout_json = 'not json' WHERE id = 1", [])?;
        let settings = storage.load_settings()?;
        assert_eq!(settings.layout, LayoutConfig::default());
        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        storage.migrate()?;
        storage.migrate()?;
        assert_eq!(storage.load_settings()?.theme, Theme::Dark);
        Ok(())
    }
}
