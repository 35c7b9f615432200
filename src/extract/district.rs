use super::gazetteer::DistrictGazetteer;

/// Finds the district a listing mentions.
///
/// Districts are tried in gazetteer order and the first one with any variant
/// occurring in the text wins, even when a later district also matches.
pub fn extract_district<'g>(text: &str, districts: &'g DistrictGazetteer) -> Option<&'g str> {
    let folded = text.to_lowercase();
    districts
        .districts()
        .iter()
        .find(|district| {
            district
                .folded_variants
                .iter()
                .any(|variant| folded.contains(variant.as_str()))
        })
        .map(|district| district.name.as_str())
}
