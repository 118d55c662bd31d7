//! Condition factory.
//!
//! Maps a configuration kind name to a constructor. Constructors receive the
//! factory itself so nested records (prerequisite extras, composite members)
//! are built through the same registry.

use crate::condition::{CompositeCondition, Condition};
use crate::config::ConditionConfig;
use crate::error::{ConditionError, Result};
use crate::resolver::PlaceholderResolver;
use crate::vocabulary::Vocabulary;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a condition from its configuration record.
pub type Constructor =
    Box<dyn Fn(&ConditionConfig, &ConditionFactory) -> Result<Condition> + Send + Sync>;

/// Registry of condition constructors, keyed by lower-cased kind name.
#[derive(Default)]
pub struct ConditionFactory {
    constructors: HashMap<String, Constructor>,
}

impl ConditionFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with the six built-in kinds registered.
    pub fn with_builtins(vocabulary: Vocabulary, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        let vocabulary = Arc::new(vocabulary);
        let mut factory = Self::new();

        let vocab = vocabulary.clone();
        factory.register("kills", move |config, _| kill(config, &vocab));

        let vocab = vocabulary.clone();
        factory.register("collect", move |config, _| collect(config, &vocab));

        let vocab = vocabulary.clone();
        factory.register("break", move |config, _| break_block(config, &vocab));

        factory.register("placeholder", move |config, _| external_metric(config, resolver.as_ref()));

        let vocab = vocabulary;
        factory.register("prerequisite", move |config, factory| {
            prerequisite(config, factory, &vocab)
        });

        factory.register("composite", composite);

        factory
    }

    /// Register (or replace) the constructor for a kind.
    pub fn register<F>(&mut self, kind: &str, constructor: F)
    where
        F: Fn(&ConditionConfig, &ConditionFactory) -> Result<Condition> + Send + Sync + 'static,
    {
        let kind = kind.to_lowercase();
        if self.constructors.insert(kind.clone(), Box::new(constructor)).is_some() {
            tracing::debug!(kind = %kind, "Replaced condition constructor");
        }
    }

    /// Whether a constructor is registered for `kind`.
    pub fn is_registered(&self, kind: &str) -> bool {
        self.constructors.contains_key(&kind.to_lowercase())
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Build a condition from its record.
    pub fn create(&self, config: &ConditionConfig) -> Result<Condition> {
        let kind = config.kind().ok_or(ConditionError::MissingType)?;
        let constructor = self
            .constructors
            .get(&kind.to_lowercase())
            .ok_or_else(|| ConditionError::UnknownKind(kind.to_string()))?;
        constructor(config, self)
    }
}

fn kill(config: &ConditionConfig, vocabulary: &Vocabulary) -> Result<Condition> {
    Ok(Condition::Kill {
        entity: vocabulary.entity(config.get_str("entity").unwrap_or("zombie"))?,
        required: config.get_u64("amount", 50)?,
    })
}

fn collect(config: &ConditionConfig, vocabulary: &Vocabulary) -> Result<Condition> {
    let material = config.get_str("material").unwrap_or("apple");
    let (target, custom) = if material.contains(':') {
        (material.trim().to_lowercase(), true)
    } else {
        (vocabulary.material(material)?, false)
    };
    Ok(Condition::Collect {
        target,
        required: config.get_u64("amount", 50)?,
        custom,
    })
}

fn break_block(config: &ConditionConfig, vocabulary: &Vocabulary) -> Result<Condition> {
    Ok(Condition::Break {
        target: vocabulary.material(config.get_str("material").unwrap_or("stone"))?,
        required: config.get_u64("amount", 100)?,
    })
}

fn external_metric(config: &ConditionConfig, resolver: &dyn PlaceholderResolver) -> Result<Condition> {
    let name = config
        .get_str("placeholder")
        .ok_or(ConditionError::MissingField("placeholder"))?;

    let mut placeholder = name.trim().to_string();
    if !placeholder.starts_with('%') {
        placeholder.insert(0, '%');
    }
    if placeholder.len() == 1 || !placeholder.ends_with('%') {
        placeholder.push('%');
    }

    let required = config.get_f64("amount", 1000.0)?;

    if !resolver.is_available() {
        return Err(ConditionError::ResolverUnavailable);
    }

    Ok(Condition::ExternalMetric {
        placeholder,
        required,
    })
}

fn prerequisite(
    config: &ConditionConfig,
    factory: &ConditionFactory,
    vocabulary: &Vocabulary,
) -> Result<Condition> {
    let name = config.get_str("item").unwrap_or("wooden_sword");
    let item = if name.contains(':') {
        name.trim().to_lowercase()
    } else {
        vocabulary.item(name)?
    };

    let additional = config
        .section("additional_condition")
        .and_then(|extra| match factory.create(&extra) {
            Ok(condition) => Some(Box::new(condition)),
            Err(e) => {
                tracing::warn!(item = %item, error = %e, "Failed to create additional condition");
                None
            }
        });

    Ok(Condition::Prerequisite { item, additional })
}

fn composite(config: &ConditionConfig, factory: &ConditionFactory) -> Result<Condition> {
    let mut conditions = Vec::new();

    for section in config.sections("conditions") {
        let Some(kind) = section.kind() else {
            tracing::warn!("Missing type in composite sub-condition");
            continue;
        };
        match factory.create(&section) {
            Ok(condition) => conditions.push(condition),
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Skipping composite sub-condition");
            }
        }
    }

    if conditions.is_empty() {
        tracing::warn!("Composite condition has no valid sub-conditions");
    }

    Ok(Condition::Composite(CompositeCondition::new(conditions)))
}
