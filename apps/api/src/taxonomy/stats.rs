use serde::Serialize;

use super::Taxonomy;

/// Vocabulary sizes, shown to users so they can tell the dictionaries loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyStats {
    pub countries: usize,
    pub degrees: usize,
    pub majors: usize,
    pub sub_majors: usize,
}

impl From<&Taxonomy> for TaxonomyStats {
    fn from(taxonomy: &Taxonomy) -> Self {
        Self {
            countries: taxonomy.countries().len(),
            degrees: taxonomy.degrees().len(),
            majors: taxonomy.majors().len(),
            sub_majors: taxonomy.majors().sub_major_count(),
        }
    }
}
