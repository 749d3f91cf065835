use serde::{Deserialize, Serialize};

// ============================================================================
// Raw Toy Definition (direct from TOML)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RawToyDefinition {
    pub icon: Option<String>,
    pub name: Option<String>,
}

// ============================================================================
// Resolved Toy Definition
// ============================================================================

/// Static catalog entry. Prices are rolled per round, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToyDefinition {
    pub id: String,
    pub icon: String,
    pub name: String,
}

impl ToyDefinition {
    pub fn from_raw(id: &str, raw: &RawToyDefinition) -> Self {
        Self {
            id: id.to_string(),
            icon: raw.icon.clone().unwrap_or_else(|| "\u{1F381}".to_string()),
            name: raw.name.clone().unwrap_or_else(|| id.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_fills_defaults() {
        let raw = RawToyDefinition {
            icon: None,
            name: None,
        };
        let toy = ToyDefinition::from_raw("teddy_bear", &raw);
        assert_eq!(toy.id, "teddy_bear");
        assert_eq!(toy.name, "teddy_bear");
        assert!(!toy.icon.is_empty());
    }

    #[test]
    fn test_from_raw_keeps_values() {
        let raw = RawToyDefinition {
            icon: Some("\u{1F9F8}".to_string()),
            name: Some("Teddy Bear".to_string()),
        };
        let toy = ToyDefinition::from_raw("teddy_bear", &raw);
        assert_eq!(toy.name, "Teddy Bear");
        assert_eq!(toy.icon, "\u{1F9F8}");
    }
}
