//! Taxonomy Store — the closed vocabularies every extracted label is checked against.
//!
//! Loaded once at startup from the three dictionaries produced by the CSV
//! conversion step, then shared read-only as `Arc<Taxonomy>`. Document order is
//! preserved at every level because the prompt lists labels in that order.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub mod stats;

pub const COUNTRIES_FILE: &str = "countries_dict.json";
pub const DEGREES_FILE: &str = "degrees_dict.json";
pub const MAJORS_FILE: &str = "majors_dict.json";

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to read taxonomy file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed taxonomy file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// An insertion-ordered `name → value` mapping with exact, case-sensitive lookup.
/// A repeated name keeps its first position and takes the last value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary<V = i64> {
    entries: IndexMap<String, V>,
}

impl<V> Default for Vocabulary<V> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<V> Vocabulary<V> {
    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for Vocabulary<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A top-level major and its second-tier children.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MajorEntry {
    pub id: i64,
    pub children: Vocabulary,
}

pub type MajorVocabulary = Vocabulary<MajorEntry>;

impl Vocabulary<MajorEntry> {
    pub fn children_of(&self, major: &str) -> Option<&Vocabulary> {
        self.get(major).map(|entry| &entry.children)
    }

    /// Every top-level major that lists `sub_major` as a child.
    /// Sub-major text is only unique within its parent, so this may return several.
    pub fn parents_of<'a>(&'a self, sub_major: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.iter()
            .filter(move |(_, entry)| entry.children.contains(sub_major))
            .map(|(name, _)| name)
    }

    pub fn sub_major_count(&self) -> usize {
        self.entries.values().map(|entry| entry.children.len()).sum()
    }
}

/// The three closed vocabularies. Never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    countries: Vocabulary,
    degrees: Vocabulary,
    majors: MajorVocabulary,
}

impl Taxonomy {
    pub fn new(countries: Vocabulary, degrees: Vocabulary, majors: MajorVocabulary) -> Self {
        Self {
            countries,
            degrees,
            majors,
        }
    }

    /// Loads `countries_dict.json`, `degrees_dict.json` and `majors_dict.json` from `dir`.
    /// All three must be present and well-formed.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let dir = dir.as_ref();

        let taxonomy = Self::new(
            read_json(&dir.join(COUNTRIES_FILE))?,
            read_json(&dir.join(DEGREES_FILE))?,
            read_json(&dir.join(MAJORS_FILE))?,
        );

        info!(
            "Taxonomy loaded from {}: {} countries, {} degrees, {} majors ({} sub-majors)",
            dir.display(),
            taxonomy.countries.len(),
            taxonomy.degrees.len(),
            taxonomy.majors.len(),
            taxonomy.majors.sub_major_count()
        );

        Ok(taxonomy)
    }

    pub fn countries(&self) -> &Vocabulary {
        &self.countries
    }

    pub fn degrees(&self) -> &Vocabulary {
        &self.degrees
    }

    pub fn majors(&self) -> &MajorVocabulary {
        &self.majors
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, TaxonomyError> {
    let text = fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| TaxonomyError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Small fixture shared by the tagging tests.
#[cfg(test)]
pub(crate) fn sample_taxonomy() -> Taxonomy {
    let countries = r#"{"美国": 1, "英国": 2, "澳大利亚": 3, "日本": 4, "加拿大": 5}"#;
    let degrees = r#"{"本科": 1, "硕士": 2, "博士": 3}"#;
    let majors = r#"{
        "理工科": {"id": 10, "children": {"计算机": 101, "统计学": 102, "数学": 103}},
        "商科": {"id": 20, "children": {"金融学": 201, "会计": 202}},
        "艺术": {"id": 30, "children": {"设计": 301, "数学": 302}}
    }"#;
    Taxonomy::new(
        serde_json::from_str(countries).unwrap(),
        serde_json::from_str(degrees).unwrap(),
        serde_json::from_str(majors).unwrap(),
    )
}
