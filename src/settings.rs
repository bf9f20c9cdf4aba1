use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::scoring::QuizRules;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UserSettings {
    rules: QuizRules,
}

/// `settings.json` in the data directory. Unreadable or invalid content
/// falls back to defaults rather than blocking startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            let parsed: UserSettings = serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring malformed settings in {}: {err}", path.display());
                UserSettings::default()
            });
            match parsed.rules.validate() {
                Ok(()) => parsed,
                Err(err) => {
                    warn!("ignoring invalid quiz rules in {}: {err:#}", path.display());
                    UserSettings::default()
                }
            }
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn rules(&self) -> QuizRules {
        match self.data.read() {
            Ok(guard) => guard.rules.clone(),
            Err(poisoned) => poisoned.into_inner().rules.clone(),
        }
    }

    /// Takes effect for controllers built afterwards.
    pub fn update_rules(&self, rules: QuizRules) -> Result<()> {
        rules.validate()?;

        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.rules = rules;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("quiz-proctor-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn defaults_when_file_missing() {
        let store = SettingsStore::new(temp_path()).unwrap();
        assert_eq!(store.rules(), QuizRules::default());
    }

    #[test]
    fn persists_valid_rules_and_rejects_invalid() {
        let path = temp_path();
        let store = SettingsStore::new(path.clone()).unwrap();

        let rules = QuizRules {
            duration_secs: 900,
            ..QuizRules::default()
        };
        store.update_rules(rules.clone()).unwrap();

        let invalid = QuizRules {
            pass_threshold: 99,
            ..QuizRules::default()
        };
        assert!(store.update_rules(invalid).is_err());
        assert_eq!(store.rules(), rules);

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.rules().duration_secs, 900);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_path();
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.rules(), QuizRules::default());

        let _ = fs::remove_file(path);
    }
}
