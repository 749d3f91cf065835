use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::toy_def::{RawToyDefinition, ToyDefinition};

/// Built-in catalog, used when no data files are present and as the base the
/// TOML files extend. `(id, icon, name)`.
const DEFAULT_CATALOG: &[(&str, &str, &str)] = &[
    ("teddy_bear", "\u{1F9F8}", "Teddy Bear"),
    ("toy_car", "\u{1F697}", "Toy Car"),
    ("soccer_ball", "\u{26BD}", "Soccer Ball"),
    ("game_console", "\u{1F3AE}", "Game Console"),
    ("yo_yo", "\u{1FA80}", "Yo-Yo"),
    ("dice", "\u{1F3B2}", "Dice"),
    ("paint_set", "\u{1F3A8}", "Paint Set"),
    ("dart_board", "\u{1F3AF}", "Dart Board"),
    ("kite", "\u{1FA81}", "Kite"),
    ("guitar", "\u{1F3B8}", "Guitar"),
    ("keyboard", "\u{1F3B9}", "Keyboard"),
    ("trumpet", "\u{1F3BA}", "Trumpet"),
    ("drums", "\u{1F941}", "Drums"),
    ("circus_tent", "\u{1F3AA}", "Circus Tent"),
    ("theater_mask", "\u{1F3AD}", "Theater Mask"),
    ("movie_clapper", "\u{1F3AC}", "Movie Clapper"),
    ("microphone", "\u{1F3A4}", "Microphone"),
    ("headphones", "\u{1F3A7}", "Headphones"),
    ("magic_hat", "\u{1F3A9}", "Magic Hat"),
    ("balloon", "\u{1F388}", "Balloon"),
    ("basketball", "\u{1F3C0}", "Basketball"),
    ("football", "\u{1F3C8}", "Football"),
    ("baseball", "\u{26BE}", "Baseball"),
    ("tennis_ball", "\u{1F3BE}", "Tennis Ball"),
    ("volleyball", "\u{1F3D0}", "Volleyball"),
    ("ping_pong", "\u{1F3D3}", "Ping Pong"),
    ("hockey_stick", "\u{1F3D2}", "Hockey Stick"),
    ("bow_arrow", "\u{1F3F9}", "Bow & Arrow"),
    ("fishing_rod", "\u{1F3A3}", "Fishing Rod"),
    ("skateboard", "\u{1F6F9}", "Skateboard"),
    ("scooter", "\u{1F6F4}", "Scooter"),
    ("bicycle", "\u{1F6B2}", "Bicycle"),
    ("toy_train", "\u{1F682}", "Toy Train"),
    ("toy_plane", "\u{2708}\u{FE0F}", "Toy Plane"),
    ("helicopter", "\u{1F681}", "Helicopter"),
    ("rocket", "\u{1F680}", "Rocket"),
    ("ufo", "\u{1F6F8}", "UFO"),
    ("robot", "\u{1F916}", "Robot"),
    ("dinosaur", "\u{1F996}", "Dinosaur"),
    ("brontosaurus", "\u{1F995}", "Brontosaurus"),
    ("bear_toy", "\u{1F43B}", "Bear Toy"),
    ("panda", "\u{1F43C}", "Panda"),
    ("lion", "\u{1F981}", "Lion"),
    ("tiger", "\u{1F42F}", "Tiger"),
    ("fox", "\u{1F98A}", "Fox"),
    ("bunny", "\u{1F430}", "Bunny"),
    ("dog_toy", "\u{1F436}", "Dog Toy"),
    ("cat_toy", "\u{1F431}", "Cat Toy"),
    ("unicorn", "\u{1F984}", "Unicorn"),
    ("dragon", "\u{1F409}", "Dragon"),
];

/// Registry for all toy definitions
pub struct ToyRegistry {
    toys: HashMap<String, ToyDefinition>,
}

impl ToyRegistry {
    pub fn new() -> Self {
        Self {
            toys: HashMap::new(),
        }
    }

    /// Create a registry pre-filled with the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (id, icon, name) in DEFAULT_CATALOG {
            registry.toys.insert(
                id.to_string(),
                ToyDefinition {
                    id: id.to_string(),
                    icon: icon.to_string(),
                    name: name.to_string(),
                },
            );
        }
        registry
    }

    /// Load all toy definitions from a directory, extending (and possibly
    /// overriding) whatever is already registered.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<(), String> {
        let toys_dir = data_dir.join("toys");

        if !toys_dir.exists() {
            warn!("Toys directory does not exist: {:?}", toys_dir);
            return Ok(());
        }

        let entries = std::fs::read_dir(&toys_dir)
            .map_err(|e| format!("Failed to read toys directory: {}", e))?;

        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

                // Parse as table of toys
                let table: HashMap<String, RawToyDefinition> = toml::from_str(&content)
                    .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

                for (id, raw) in table {
                    if self.toys.contains_key(&id) {
                        warn!("Duplicate toy ID '{}' in {:?}, overwriting", id, path);
                    }
                    let toy = ToyDefinition::from_raw(&id, &raw);
                    self.toys.insert(id, toy);
                }
            }
        }

        info!("Loaded {} toy definitions", self.toys.len());

        Ok(())
    }

    /// Get a toy definition by ID
    pub fn get(&self, id: &str) -> Option<&ToyDefinition> {
        self.toys.get(id)
    }

    /// Check if a toy exists
    pub fn contains(&self, id: &str) -> bool {
        self.toys.contains_key(id)
    }

    /// Get the number of loaded toys
    pub fn len(&self) -> usize {
        self.toys.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.toys.is_empty()
    }

    /// Catalog in a stable order (sorted by id), so shelf generation with a
    /// seeded random source stays reproducible.
    pub fn catalog(&self) -> Vec<ToyDefinition> {
        let mut toys: Vec<ToyDefinition> = self.toys.values().cloned().collect();
        toys.sort_by(|a, b| a.id.cmp(&b.id));
        toys
    }
}

impl Default for ToyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_catalog_size() {
        let registry = ToyRegistry::with_defaults();
        assert_eq!(registry.len(), 50);
        assert!(registry.contains("teddy_bear"));
        assert_eq!(registry.get("dragon").unwrap().name, "Dragon");
    }

    #[test]
    fn test_catalog_is_sorted() {
        let registry = ToyRegistry::with_defaults();
        let catalog = registry.catalog();
        for pair in catalog.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn test_load_toys_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        let toys_dir = temp_dir.path().join("toys");
        std::fs::create_dir(&toys_dir).unwrap();

        let toml_content = r#"
[chess_set]
icon = "♟"
name = "Chess Set"

[puzzle]
name = "Jigsaw Puzzle"
"#;

        let mut file = std::fs::File::create(toys_dir.join("extra.toml")).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let mut registry = ToyRegistry::new();
        registry.load_from_directory(temp_dir.path()).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("chess_set").unwrap().name, "Chess Set");
        // Missing icon falls back to a placeholder
        assert_eq!(registry.get("puzzle").unwrap().name, "Jigsaw Puzzle");
        assert!(!registry.get("puzzle").unwrap().icon.is_empty());
    }

    #[test]
    fn test_missing_directory_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = ToyRegistry::with_defaults();
        registry.load_from_directory(temp_dir.path()).unwrap();
        assert_eq!(registry.len(), 50);
    }
}
