//! Entity and material name validation.

use crate::error::{ConditionError, Result};
use progression_core::VocabularyConfig;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_]+$").ok()).as_ref()
}

/// Known entity kinds and material names.
///
/// Tokens are normalized to lower case. A permissive vocabulary accepts any
/// identifier-shaped token; a closed one additionally requires membership.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entities: Option<HashSet<String>>,
    materials: Option<HashSet<String>>,
}

impl Vocabulary {
    /// Accept any identifier-shaped name.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Accept only the listed names.
    pub fn closed<E, M>(entities: E, materials: M) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        Self {
            entities: Some(normalize_all(entities)),
            materials: Some(normalize_all(materials)),
        }
    }

    /// Build from the configuration section. An empty list leaves that
    /// category permissive.
    pub fn from_config(config: &VocabularyConfig) -> Self {
        let closed = |names: &[String]| (!names.is_empty()).then(|| normalize_all(names));
        Self {
            entities: closed(config.entities.as_slice()),
            materials: closed(config.materials.as_slice()),
        }
    }

    /// Validate and normalize an entity name.
    pub fn entity(&self, name: &str) -> Result<String> {
        check(name, self.entities.as_ref(), "entity")
    }

    /// Validate and normalize a material name.
    pub fn material(&self, name: &str) -> Result<String> {
        check(name, self.materials.as_ref(), "material")
    }

    /// Validate and normalize an item name (items are materials).
    pub fn item(&self, name: &str) -> Result<String> {
        check(name, self.materials.as_ref(), "item")
    }
}

fn normalize_all<I>(names: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .collect()
}

fn check(name: &str, known: Option<&HashSet<String>>, field: &'static str) -> Result<String> {
    let token = name.trim().to_lowercase();
    let shaped = token_pattern().is_some_and(|re| re.is_match(&token));
    let valid = shaped && known.map_or(true, |set| set.contains(&token));
    if valid {
        Ok(token)
    } else {
        Err(ConditionError::InvalidEnumValue {
            field,
            value: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_normalizes() {
        let vocab = Vocabulary::permissive();
        assert_eq!(vocab.entity("ZOMBIE").unwrap(), "zombie");
        assert_eq!(vocab.material("Iron_Ore").unwrap(), "iron_ore");
    }

    #[test]
    fn test_permissive_rejects_malformed() {
        let vocab = Vocabulary::permissive();
        assert!(vocab.entity("zom bie").is_err());
        assert!(vocab.material("").is_err());
        assert!(vocab.material("mod:gem").is_err());
    }

    #[test]
    fn test_closed_requires_membership() {
        let vocab = Vocabulary::closed(["zombie", "SKELETON"], ["stone"]);
        assert_eq!(vocab.entity("Skeleton").unwrap(), "skeleton");
        assert_eq!(
            vocab.entity("creeper"),
            Err(ConditionError::InvalidEnumValue {
                field: "entity",
                value: "creeper".to_string()
            })
        );
        assert!(vocab.material("dirt").is_err());
    }

    #[test]
    fn test_from_config_empty_list_is_permissive() {
        let config = VocabularyConfig {
            entities: vec!["zombie".to_string()],
            materials: Vec::new(),
        };
        let vocab = Vocabulary::from_config(&config);
        assert!(vocab.entity("creeper").is_err());
        assert!(vocab.material("anything_goes").is_ok());
    }
}
