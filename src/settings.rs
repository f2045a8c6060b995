use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::components::history::DEFAULT_HISTORY_CAPACITY;
use crate::components::tools::{DEFAULT_BRUSH_SIZE, MAX_BRUSH_SIZE, ToolKind};

/// Editor preferences that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Maximum number of snapshots in the undo history.
    pub max_undo_steps: usize,
    /// Brush diameter in pixels.
    pub brush_size: u32,
    /// Tool active when a session starts.
    pub default_tool: ToolKind,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            max_undo_steps: DEFAULT_HISTORY_CAPACITY,
            brush_size: DEFAULT_BRUSH_SIZE,
            default_tool: ToolKind::Clone,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/retouchfe/retouchfe_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\RetouchFE\retouchfe_settings.cfg
    /// On macOS:   ~/Library/Application Support/RetouchFE/retouchfe_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("RetouchFE").join("retouchfe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("RetouchFE")
                    .join("retouchfe_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("retouchfe").join("retouchfe_settings.cfg"))
        }
    }

    /// Load from the platform path. A missing or unreadable file yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Load from an explicit file; unlike [`load`](Self::load) a missing
    /// file is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("could not read settings '{}'", path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Parse `key = value` lines. Unknown keys, comments and malformed
    /// values are ignored and leave the default in place.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "brush_size" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.brush_size = v.clamp(1, MAX_BRUSH_SIZE);
                    }
                }
                "default_tool" => {
                    if let Some(tool) = ToolKind::from_name(val) {
                        s.default_tool = tool;
                    }
                }
                _ => {
                    tracing::debug!("ignoring unknown settings key '{}'", key);
                }
            }
        }
        s
    }

    pub fn serialize(&self) -> String {
        format!(
            "max_undo_steps={}\nbrush_size={}\ndefault_tool={}\n",
            self.max_undo_steps, self.brush_size, self.default_tool
        )
    }

    /// Write to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create '{}'", parent.display()))?;
        }
        std::fs::write(path, self.serialize())
            .with_context(|| format!("could not write settings '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_known_keys() {
        let s = EditorSettings::parse("max_undo_steps = 7\nbrush_size=33\ndefault_tool = blur\n");
        assert_eq!(s.max_undo_steps, 7);
        assert_eq!(s.brush_size, 33);
        assert_eq!(s.default_tool, ToolKind::Blur);
    }

    #[test]
    fn parse_ignores_garbage() {
        let s = EditorSettings::parse("# comment\nbrush_size=huge\nnonsense\ncolor=red\nmax_undo_steps=0\n");
        assert_eq!(s.brush_size, DEFAULT_BRUSH_SIZE);
        assert_eq!(s.max_undo_steps, 1);
        assert_eq!(s.default_tool, ToolKind::Clone);
    }

    #[test]
    fn serialize_parses_back() {
        let s = EditorSettings {
            max_undo_steps: 12,
            brush_size: 5,
            default_tool: ToolKind::Restore,
        };
        assert_eq!(EditorSettings::parse(&s.serialize()), s);
    }

    #[test]
    fn oversized_brush_is_capped() {
        let s = EditorSettings::parse("brush_size=4294967295
");
        assert_eq!(s.brush_size, MAX_BRUSH_SIZE);
    }

    #[test]
    fn save_to_then_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("retouchfe_settings.cfg");
        let s = EditorSettings {
            max_undo_steps: 4,
            brush_size: 64,
            default_tool: ToolKind::Fill,
        };
        s.save_to(&path).unwrap();
        assert_eq!(EditorSettings::load_from(&path).unwrap(), s);
        assert!(EditorSettings::load_from(&dir.path().join("absent.cfg")).is_err());
    }
}
