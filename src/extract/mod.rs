//! Structured data from free-form listing text.
//!
//! Everything here is pure: no I/O, no shared mutable state. Gazetteers are
//! built once by the caller and can be shared across tasks behind an `Arc`.

pub mod district;
pub mod fields;
pub mod gazetteer;
pub mod street;

pub use district::extract_district;
pub use gazetteer::{DistrictGazetteer, GazetteerError, StreetGazetteer};
pub use street::extract_street;

/// Gazetteers used to resolve where a listing is.
#[derive(Debug, Clone)]
pub struct Locator {
    pub streets: StreetGazetteer,
    pub districts: DistrictGazetteer,
}

impl Locator {
    pub fn new(streets: StreetGazetteer, districts: DistrictGazetteer) -> Self {
        Self { streets, districts }
    }

    /// Street and district for a listing's combined title and description.
    pub fn locate(&self, text: &str) -> (Option<String>, Option<String>) {
        let street = extract_street(text, &self.streets).map(str::to_string);
        let district = extract_district(text, &self.districts).map(str::to_string);
        (street, district)
    }
}
