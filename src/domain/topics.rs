//! The topic catalog: the fixed set of mysteries an article may be generated for.
//!
//! The catalog is built once at startup and never mutated. Lookups match the
//! normalized id exactly, and construction rejects ids that are not already in
//! normalized form so that lookup, cache keys and lock keys agree.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

const DEFAULT_DIFFICULTY: u8 = 3;

/// Broad subject area used for filtering the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cosmology,
    Physics,
    Life,
    Mind,
    Earth,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Cosmology,
        Category::Physics,
        Category::Life,
        Category::Mind,
        Category::Earth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Cosmology => "cosmology",
            Category::Physics => "physics",
            Category::Life => "life",
            Category::Mind => "mind",
            Category::Earth => "earth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Cosmology => "Cosmology",
            Category::Physics => "Physics",
            Category::Life => "Life",
            Category::Mind => "Mind & Brain",
            Category::Earth => "Earth",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|category| category.as_str() == key)
    }
}

/// Static description of one open question, used as generation context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDescriptor {
    pub id: String,
    pub title: String,
    pub hook: String,
    pub category: Category,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub known: Vec<String>,
    #[serde(default)]
    pub unknown: Vec<String>,
    #[serde(default)]
    pub hypotheses: Vec<String>,
    #[serde(default)]
    pub how_to_test: Vec<String>,
}

fn default_difficulty() -> u8 {
    DEFAULT_DIFFICULTY
}

/// Normalize a requested topic id: percent-decode, trim, lowercase.
pub fn normalize_topic_id(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded.trim().to_lowercase()
}

/// Read-only lookup of topic id to descriptor, preserving declaration order.
#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: Vec<TopicDescriptor>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    topics: Vec<TopicDescriptor>,
}

impl TopicCatalog {
    pub fn new(topics: Vec<TopicDescriptor>) -> Result<Self, DomainError> {
        let mut index = HashMap::with_capacity(topics.len());

        for (position, topic) in topics.iter().enumerate() {
            if topic.id.is_empty() {
                return Err(DomainError::catalog(format!(
                    "topic #{position} has an empty id"
                )));
            }
            if normalize_topic_id(&topic.id) != topic.id {
                return Err(DomainError::catalog(format!(
                    "topic id `{}` is not normalized (expected lowercase, trimmed, undecoded)",
                    topic.id
                )));
            }
            if !(1..=5).contains(&topic.difficulty) {
                return Err(DomainError::catalog(format!(
                    "topic `{}` difficulty {} is outside 1-5",
                    topic.id, topic.difficulty
                )));
            }
            if index.insert(topic.id.clone(), position).is_some() {
                return Err(DomainError::DuplicateTopic(topic.id.clone()));
            }
        }

        Ok(Self { topics, index })
    }

    /// Parse a catalog from TOML made of `[[topics]]` tables.
    pub fn from_toml(source: &str) -> Result<Self, DomainError> {
        let file: CatalogFile = toml::from_str(source)
            .map_err(|err| DomainError::catalog(err.to_string()))?;
        if file.topics.is_empty() {
            return Err(DomainError::catalog("catalog file defines no topics"));
        }
        Self::new(file.topics)
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> &'static TopicCatalog {
        &BUILTIN
    }

    pub fn get(&self, id: &str) -> Option<&TopicDescriptor> {
        self.index.get(id).map(|position| &self.topics[*position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopicDescriptor> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Filter by category and by a case-insensitive substring over title, hook and category.
    pub fn search(&self, query: &str, category: Option<Category>) -> Vec<&TopicDescriptor> {
        let needle = query.trim().to_lowercase();

        self.topics
            .iter()
            .filter(|topic| category.is_none_or(|wanted| topic.category == wanted))
            .filter(|topic| {
                if needle.is_empty() {
                    return true;
                }
                let haystack = format!(
                    "{} {} {}",
                    topic.title,
                    topic.hook,
                    topic.category.as_str()
                )
                .to_lowercase();
                haystack.contains(&needle)
            })
            .collect()
    }
}

fn facts(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

static BUILTIN: Lazy<TopicCatalog> = Lazy::new(|| {
    let topics = vec![
        TopicDescriptor {
            id: "dark-matter".to_string(),
            title: "What is dark matter?".to_string(),
            hook: "Most of the matter in the universe does not shine, absorb or reflect light."
                .to_string(),
            category: Category::Cosmology,
            difficulty: 3,
            known: facts(&[
                "Galaxies rotate too fast for their visible mass",
                "Gravitational lensing maps mass that emits no light",
                "The cosmic microwave background requires extra non-baryonic matter",
            ]),
            unknown: facts(&[
                "What particle, if any, dark matter is made of",
                "Whether it interacts through any force besides gravity",
            ]),
            hypotheses: facts(&[
                "Weakly interacting massive particles",
                "Axions or axion-like particles",
                "Primordial black holes",
                "Modified gravity instead of new matter",
            ]),
            how_to_test: facts(&[
                "Underground direct-detection experiments",
                "Collider searches for missing energy",
                "Precision maps of galaxy-scale structure",
            ]),
        },
        TopicDescriptor {
            id: "dark-energy".to_string(),
            title: "Why is the universe's expansion speeding up?".to_string(),
            hook: "Something is pushing the cosmos apart faster every year.".to_string(),
            category: Category::Cosmology,
            difficulty: 4,
            known: facts(&[
                "Distant supernovae are dimmer than a decelerating universe predicts",
                "Dark energy makes up roughly two thirds of the cosmic energy budget",
            ]),
            unknown: facts(&[
                "Whether dark energy is constant over time",
                "Why its measured value is so small",
            ]),
            hypotheses: facts(&[
                "A cosmological constant from vacuum energy",
                "A slowly evolving field (quintessence)",
                "A breakdown of general relativity at large scales",
            ]),
            how_to_test: facts(&[
                "Baryon acoustic oscillation surveys",
                "Weak lensing tomography",
                "Larger supernova samples at high redshift",
            ]),
        },
        TopicDescriptor {
            id: "matter-antimatter".to_string(),
            title: "Why is there more matter than antimatter?".to_string(),
            hook: "The Big Bang should have made equal amounts, and they should have annihilated."
                .to_string(),
            category: Category::Physics,
            difficulty: 4,
            known: facts(&[
                "The observable universe is made almost entirely of matter",
                "The Standard Model contains some CP violation, but far too little",
            ]),
            unknown: facts(&["Which process created the tiny early surplus of matter"]),
            hypotheses: facts(&[
                "Leptogenesis through heavy neutrinos",
                "Electroweak baryogenesis",
            ]),
            how_to_test: facts(&[
                "Neutrino oscillation experiments comparing neutrinos and antineutrinos",
                "Searches for a neutron electric dipole moment",
                "Precision antihydrogen spectroscopy",
            ]),
        },
        TopicDescriptor {
            id: "origin-of-life".to_string(),
            title: "How did life begin?".to_string(),
            hook: "Somewhere between chemistry and biology lies a step nobody has reproduced."
                .to_string(),
            category: Category::Life,
            difficulty: 3,
            known: facts(&[
                "Life on Earth appeared within a billion years of the planet forming",
                "Amino acids and nucleotides can form without living cells",
            ]),
            unknown: facts(&[
                "How self-replicating molecules first arose",
                "Where on early Earth it happened",
            ]),
            hypotheses: facts(&[
                "An RNA world preceding DNA and proteins",
                "Hydrothermal vent metabolism first",
                "Wet-dry cycles in surface ponds",
            ]),
            how_to_test: facts(&[
                "Laboratory evolution of self-replicating RNA",
                "Sample return from Mars and icy moons",
            ]),
        },
        TopicDescriptor {
            id: "consciousness".to_string(),
            title: "What is consciousness?".to_string(),
            hook: "We can map neurons firing, but not why any of it feels like something."
                .to_string(),
            category: Category::Mind,
            difficulty: 5,
            known: facts(&[
                "Specific brain regions correlate with conscious perception",
                "Anesthesia can switch consciousness off reversibly",
            ]),
            unknown: facts(&[
                "Why physical processes give rise to subjective experience",
                "Which systems besides humans are conscious",
            ]),
            hypotheses: facts(&[
                "Global workspace theory",
                "Integrated information theory",
                "Higher-order theories",
            ]),
            how_to_test: facts(&[
                "Adversarial collaborations pitting theories against each other",
                "Measures of perturbational complexity in patients",
            ]),
        },
        TopicDescriptor {
            id: "earth-core-magnetism".to_string(),
            title: "Why does Earth's magnetic field flip?".to_string(),
            hook: "North and south have swapped hundreds of times, on no fixed schedule."
                .to_string(),
            category: Category::Earth,
            difficulty: 2,
            known: facts(&[
                "The field is generated by convection in the liquid outer core",
                "Volcanic rocks record past reversals",
            ]),
            unknown: facts(&[
                "What triggers a reversal",
                "How long the field stays weak during a flip",
            ]),
            hypotheses: facts(&[
                "Chaotic dynamics inside the geodynamo",
                "Heat-flow changes at the core-mantle boundary",
            ]),
            how_to_test: facts(&[
                "Satellite monitoring of the South Atlantic Anomaly",
                "High-resolution geodynamo simulations",
            ]),
        },
    ];

    match TopicCatalog::new(topics) {
        Ok(catalog) => catalog,
        Err(err) => panic!("built-in topic catalog is invalid: {err}"),
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_contains_dark_matter() {
        let catalog = TopicCatalog::builtin();
        let topic = catalog.get("dark-matter").expect("dark-matter topic");
        assert_eq!(topic.category, Category::Cosmology);
        assert!(!topic.known.is_empty());
    }

    #[test]
    fn normalization_decodes_trims_and_lowercases() {
        assert_eq!(normalize_topic_id("  Dark-Matter "), "dark-matter");
        assert_eq!(normalize_topic_id("dark%2Dmatter"), "dark-matter");
        assert_eq!(normalize_topic_id("%20ORIGIN-of-life%20"), "origin-of-life");
    }

    #[test]
    fn rejects_non_normalized_ids() {
        let mut topic = TopicCatalog::builtin().get("dark-matter").cloned().unwrap();
        topic.id = "Dark-Matter".to_string();
        let err = TopicCatalog::new(vec![topic]).unwrap_err();
        assert!(err.to_string().contains("not normalized"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let topic = TopicCatalog::builtin().get("dark-matter").cloned().unwrap();
        let err = TopicCatalog::new(vec![topic.clone(), topic]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn search_filters_by_category_and_text() {
        let catalog = TopicCatalog::builtin();

        let cosmology = catalog.search("", Some(Category::Cosmology));
        assert!(cosmology.iter().all(|t| t.category == Category::Cosmology));
        assert!(cosmology.iter().any(|t| t.id == "dark-matter"));

        let by_text = catalog.search("  ANTIMATTER ", None);
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].id, "matter-antimatter");

        let by_category_name = catalog.search("mind", None);
        assert!(by_category_name.iter().any(|t| t.id == "consciousness"));

        assert!(catalog.search("no such mystery", None).is_empty());
    }

    #[test]
    fn parses_toml_catalog_with_defaults() {
        let source = r#"
            [[topics]]
            id = "ball-lightning"
            title = "What is ball lightning?"
            hook = "Glowing spheres that drift through rooms."
            category = "physics"
            known = ["Witnessed for centuries"]
        "#;

        let catalog = TopicCatalog::from_toml(source).expect("valid catalog");
        let topic = catalog.get("ball-lightning").expect("topic");
        assert_eq!(topic.difficulty, 3);
        assert!(topic.hypotheses.is_empty());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn empty_toml_catalog_is_rejected() {
        assert!(TopicCatalog::from_toml("").is_err());
    }
}
