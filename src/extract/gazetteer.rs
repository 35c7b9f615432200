//! Reference data the extractors validate candidates against.
//!
//! Both gazetteers are built once by the caller and then shared read-only,
//! so lower-cased forms are computed up front instead of on every lookup.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while building a gazetteer.
#[derive(Debug, Error)]
pub enum GazetteerError {
    #[error("street name at position {0} is empty")]
    EmptyStreet(usize),

    #[error("district name at position {0} is empty")]
    EmptyDistrict(usize),

    #[error("district '{0}' has no variants")]
    NoVariants(String),

    #[error("district '{district}' has an empty variant")]
    EmptyVariant { district: String },

    #[error("failed to read street names from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A known street name together with its case-folded form.
#[derive(Debug, Clone)]
pub(crate) struct StreetEntry {
    pub(crate) name: String,
    pub(crate) folded: String,
}

/// Ordered list of canonical street names.
#[derive(Debug, Clone, Default)]
pub struct StreetGazetteer {
    entries: Vec<StreetEntry>,
}

impl StreetGazetteer {
    /// Builds a gazetteer from canonical names, keeping their order and casing.
    ///
    /// # Errors
    /// Returns [`GazetteerError::EmptyStreet`] if any name is blank.
    pub fn new<I, S>(names: I) -> Result<Self, GazetteerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .enumerate()
            .map(|(position, name)| {
                let name = name.into();
                if name.trim().is_empty() {
                    return Err(GazetteerError::EmptyStreet(position));
                }
                let folded = name.to_lowercase();
                Ok(StreetEntry { name, folded })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries })
    }

    /// Parses a newline-delimited list, one street per line.
    ///
    /// Lines are trimmed and blank lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| StreetEntry {
                name: line.to_string(),
                folded: line.to_lowercase(),
            })
            .collect();

        Self { entries }
    }

    /// Loads a newline-delimited street list from disk.
    ///
    /// # Errors
    /// Returns [`GazetteerError::Read`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GazetteerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| GazetteerError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse(&contents))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical names in gazetteer order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub(crate) fn entries(&self) -> &[StreetEntry] {
        &self.entries
    }

    /// Returns the first entry equal to `candidate`, ignoring case.
    pub fn lookup(&self, candidate: &str) -> Option<&str> {
        let folded = candidate.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.folded == folded)
            .map(|entry| entry.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct District {
    pub(crate) name: String,
    pub(crate) folded_variants: Vec<String>,
}

/// Ordered mapping from canonical district name to its spelling variants.
#[derive(Debug, Clone, Default)]
pub struct DistrictGazetteer {
    districts: Vec<District>,
}

impl DistrictGazetteer {
    /// Builds a gazetteer; iteration order is the order of `districts`.
    ///
    /// # Errors
    /// Returns an error for a blank district name, an empty variant list or a
    /// blank variant.
    pub fn new<I, N, V, S>(districts: I) -> Result<Self, GazetteerError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut built = Vec::new();

        for (position, (name, variants)) in districts.into_iter().enumerate() {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(GazetteerError::EmptyDistrict(position));
            }

            let mut folded_variants = Vec::new();
            for variant in variants {
                let variant = variant.as_ref();
                if variant.trim().is_empty() {
                    return Err(GazetteerError::EmptyVariant { district: name });
                }
                folded_variants.push(variant.to_lowercase());
            }

            if folded_variants.is_empty() {
                return Err(GazetteerError::NoVariants(name));
            }

            built.push(District {
                name,
                folded_variants,
            });
        }

        Ok(Self { districts: built })
    }

    /// The eighteen districts of Kraków with common spellings, transliterations
    /// and the neighbourhoods that belong to each of them.
    pub fn krakow() -> Self {
        let districts = KRAKOW_DISTRICTS
            .iter()
            .map(|(name, variants)| District {
                name: (*name).to_string(),
                folded_variants: variants.iter().map(|v| v.to_lowercase()).collect(),
            })
            .collect();

        Self { districts }
    }

    pub fn len(&self) -> usize {
        self.districts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.districts.iter().map(|district| district.name.as_str())
    }

    pub(crate) fn districts(&self) -> &[District] {
        &self.districts
    }
}

const KRAKOW_DISTRICTS: &[(&str, &[&str])] = &[
    ("Stare Miasto", &["Stare Miasto", "Старе Място", "Old Town", "Downtown"]),
    (
        "Grzegórzki",
        &["Grzegórzki", "Grzegorzki", "Dąbie", "Dabie", "Osiedle Oficerskie"],
    ),
    (
        "Prądnik Czerwony",
        &[
            "Prądnik Czerwony",
            "Pradnik Czerwony",
            "Olsza",
            "Rakowice",
            "Ugorek",
            "Wieczystą",
        ],
    ),
    (
        "Prądnik Biały",
        &[
            "Prądnik Biały",
            "Pradnik Bialy",
            "Azory",
            "Bronowice Wielkie",
            "Górka Narodowa",
            "Gorka Narodowa",
        ],
    ),
    (
        "Krowodrza",
        &["Krowodrza", "Krowoderska", "Łobzów", "Lobzow", "Młynówka Królewska"],
    ),
    (
        "Bronowice",
        &["Bronowice", "Bronowice Małe", "Bronowice Male", "Mydlniki"],
    ),
    (
        "Zwierzyniec",
        &[
            "Zwierzyniec",
            "Wola Justowska",
            "Półwsie Zwierzynieckie",
            "Przegorzały",
            "Bielany",
        ],
    ),
    (
        "Dębniki",
        &[
            "Dębniki", "Debniki", "Zakrzówek", "Tyniec", "Kostrze", "Bodzów", "Kobierzyn",
            "Ruczaj",
        ],
    ),
    (
        "Łagiewniki",
        &["Łagiewniki", "Lagiewniki", "Borek Fałęcki", "Borek Falecki"],
    ),
    (
        "Swoszowice",
        &["Swoszowice", "Wróblowice", "Wroblowice", "Rajsko", "Opatkowice"],
    ),
    (
        "Podgórze Duchackie",
        &[
            "Podgórze Duchackie",
            "Podgorze Duchackie",
            "Kurdwanów",
            "Kurdwanow",
            "Piaski Wielkie",
            "Wola Duchacka",
        ],
    ),
    (
        "Bieżanów-Prokocim",
        &["Bieżanów", "Biezanow", "Prokocim", "Rżąka", "Rzaka"],
    ),
    (
        "Podgórze",
        &[
            "Podgórze", "Podgorze", "Płaszów", "Plaszow", "Zabłocie", "Zablocie", "Bonarka",
        ],
    ),
    (
        "Czyżyny",
        &[
            "Czyżyny",
            "Czyzyny",
            "Łęg",
            "Leg",
            "Centralna",
            "Rondo Czyżyńskie",
            "Czyzynskie",
        ],
    ),
    (
        "Mistrzejowice",
        &[
            "Mistrzejowice",
            "Batowice",
            "Osiedle Złotego Wieku",
            "Osiedle Tysiaclecia",
        ],
    ),
    (
        "Bieńczyce",
        &[
            "Bieńczyce",
            "Bienczyce",
            "Osiedle Przy Arce",
            "Osiedle Jagiellońskie",
        ],
    ),
    (
        "Wzgórza Krzesławickie",
        &[
            "Wzgórza Krzesławickie",
            "Wzgorza Krzeslawickie",
            "Grębałów",
            "Grebalow",
            "Kantorowice",
        ],
    ),
    (
        "Nowa Huta",
        &["Nowa Huta", "Mogiła", "Mogila", "Pleszów", "Pleszow", "Branice"],
    ),
];
