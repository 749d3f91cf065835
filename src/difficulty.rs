use std::collections::HashMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Difficulty Profiles
// ============================================================================

/// Price/budget ranges and shopping time for one difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub id: String,
    pub min_price: i32,
    pub max_price: i32,
    pub min_budget: i32,
    pub max_budget: i32,
    pub timer_secs: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDifficultyProfile {
    pub min_price: i32,
    pub max_price: i32,
    pub min_budget: i32,
    pub max_budget: i32,
    pub timer_secs: u32,
}

impl DifficultyProfile {
    fn from_raw(id: &str, raw: &RawDifficultyProfile) -> Self {
        Self {
            id: id.to_string(),
            min_price: raw.min_price,
            max_price: raw.max_price,
            min_budget: raw.min_budget,
            max_budget: raw.max_budget,
            timer_secs: raw.timer_secs,
        }
    }
}

/// Registry for difficulty tiers. Always holds the three built-in tiers;
/// TOML files may adjust them or add new ones.
pub struct DifficultyRegistry {
    profiles: HashMap<String, DifficultyProfile>,
}

impl DifficultyRegistry {
    pub fn with_defaults() -> Self {
        let defaults = [
            ("easy", 1, 5, 10, 20, 30),
            ("medium", 5, 15, 20, 50, 25),
            ("hard", 10, 30, 50, 100, 20),
        ];

        let mut profiles = HashMap::new();
        for (id, min_price, max_price, min_budget, max_budget, timer_secs) in defaults {
            profiles.insert(
                id.to_string(),
                DifficultyProfile {
                    id: id.to_string(),
                    min_price,
                    max_price,
                    min_budget,
                    max_budget,
                    timer_secs,
                },
            );
        }
        Self { profiles }
    }

    /// Load tier overrides from `<data_dir>/difficulties.toml` if present.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), String> {
        let path = data_dir.join("difficulties.toml");

        if !path.exists() {
            warn!("Difficulty config does not exist: {:?}", path);
            return Ok(());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

        let table: HashMap<String, RawDifficultyProfile> = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

        for (id, raw) in table {
            let profile = DifficultyProfile::from_raw(&id, &raw);
            if profile.min_price > profile.max_price || profile.min_budget > profile.max_budget {
                warn!("Ignoring difficulty '{}': empty price or budget range", id);
                continue;
            }
            self.profiles.insert(id, profile);
        }

        info!("Loaded {} difficulty tiers", self.profiles.len());

        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&DifficultyProfile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }
}

impl Default for DifficultyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
