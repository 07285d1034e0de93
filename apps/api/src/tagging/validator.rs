//! Result validation — narrows raw candidates to labels that exist verbatim in the taxonomy.
//!
//! Acceptance is exact, case-sensitive key membership. A sub-major is only
//! accepted under the major that was itself accepted, never under some other
//! parent that happens to carry the same text.

use serde::{Serialize, Serializer};
use tracing::debug;

use super::parser::RawCandidate;
use crate::taxonomy::{Taxonomy, Vocabulary};

/// A label confirmed to be an exact member of its vocabulary, with its taxonomy id.
/// Serialises as the plain label text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLabel {
    name: String,
    id: i64,
}

impl ValidatedLabel {
    fn check(vocabulary: &Vocabulary, candidate: Option<&str>) -> Option<Self> {
        let name = candidate?;
        vocabulary.get(name).map(|&id| Self {
            name: name.to_string(),
            id,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> i64 {
        self.id
    }
}

impl AsRef<str> for ValidatedLabel {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl Serialize for ValidatedLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidatedLabels {
    pub country: Option<ValidatedLabel>,
    pub degree: Option<ValidatedLabel>,
    pub major: Option<ValidatedLabel>,
    pub sub_major: Option<ValidatedLabel>,
}

/// Taxonomy ids of the accepted labels, for consumers that key on ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelIds {
    pub country: Option<i64>,
    pub degree: Option<i64>,
    pub major: Option<i64>,
    pub sub_major: Option<i64>,
}

impl ValidatedLabels {
    pub fn ids(&self) -> LabelIds {
        LabelIds {
            country: self.country.as_ref().map(ValidatedLabel::id),
            degree: self.degree.as_ref().map(ValidatedLabel::id),
            major: self.major.as_ref().map(ValidatedLabel::id),
            sub_major: self.sub_major.as_ref().map(ValidatedLabel::id),
        }
    }
}

/// Pure: the same candidate and taxonomy always yield the same labels.
pub fn validate(candidate: &RawCandidate, taxonomy: &Taxonomy) -> ValidatedLabels {
    let country = ValidatedLabel::check(taxonomy.countries(), candidate.country.as_deref());
    let degree = ValidatedLabel::check(taxonomy.degrees(), candidate.degree.as_deref());
    let major = candidate.major.as_deref().and_then(|name| {
        taxonomy.majors().get(name).map(|entry| ValidatedLabel {
            name: name.to_string(),
            id: entry.id,
        })
    });

    let sub_major = major.as_ref().and_then(|major| {
        let children = taxonomy.majors().children_of(major.as_str())?;
        ValidatedLabel::check(children, candidate.sub_major.as_deref())
    });

    if let (Some(raw_sub), None) = (candidate.sub_major.as_deref(), &sub_major) {
        let owners: Vec<&str> = taxonomy.majors().parents_of(raw_sub).collect();
        debug!(
            "Dropped sub_major {raw_sub:?} (major {:?}); listed under {:?}",
            candidate.major, owners
        );
    }

    ValidatedLabels {
        country,
        degree,
        major,
        sub_major,
    }
}
