//! Street name extraction from Polish listing text.
//!
//! Listings rarely name the street in a consistent way, so the text is run
//! through an ordered list of indicator patterns (`ul.`, `ulicy`, `aleja`, ...).
//! Each pattern yields at most one candidate, which is normalized to the
//! nominative case and only accepted if the gazetteer knows it. When no
//! candidate validates, the gazetteer itself is scanned for whole-word hits.

use std::sync::LazyLock;

use regex::Regex;

use super::gazetteer::StreetGazetteer;

/// Lexical cue that precedes a street name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// `ul`, `ul.` or `ul. `, but not the words `ulica`/`ulicy`.
    Ul,
    Ulicy,
    Ulica,
    /// `al.` glued to the name.
    AlDot,
    /// `al. ` followed by a space.
    AlDotSpace,
    Alei,
    Aleja,
}

impl Indicator {
    fn prefix(self) -> &'static str {
        match self {
            Self::Ul => r"\bul\.?\s*",
            Self::Ulicy => "ulicy ",
            Self::Ulica => "ulica ",
            Self::AlDot => r"al\.",
            Self::AlDotSpace => r"al\. ",
            Self::Alei => "alei ",
            Self::Aleja => "aleja ",
        }
    }

    /// `ul` must not be the start of `ulica`/`ulicy`; those have their own patterns.
    fn rejects(self, matched: &str) -> bool {
        match self {
            Self::Ul => matched
                .strip_prefix("ul")
                .is_some_and(|rest| rest.starts_with("ica") || rest.starts_with("icy")),
            _ => false,
        }
    }
}

/// How much text after the indicator becomes the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// One name: up to the end of the word for `ul`, the rest of the line otherwise.
    Phrase,
    /// Two whitespace-separated tokens, for names like `Stefana Batorego`.
    TwoWords,
}

/// One entry of the ordered pattern list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreetPattern {
    pub priority: usize,
    pub indicator: Indicator,
    pub capture: Capture,
}

impl StreetPattern {
    const fn new(priority: usize, indicator: Indicator, capture: Capture) -> Self {
        Self {
            priority,
            indicator,
            capture,
        }
    }

    fn source(&self) -> String {
        let capture = match (self.capture, self.indicator) {
            // Shortest non-digit run that ends at a word boundary or right
            // before a house number.
            (Capture::Phrase, Indicator::Ul) => r"([^\d]+?)(?:\s+\d|\b)",
            (Capture::Phrase, Indicator::AlDot) => r"(\S.*)",
            (Capture::Phrase, _) => r"(.+)",
            (Capture::TwoWords, _) => r"(\S+\s+\S+)",
        };
        format!("{}{}", self.indicator.prefix(), capture)
    }
}

/// Patterns in the order they are tried. First validated candidate wins.
pub const STREET_PATTERNS: [StreetPattern; 14] = [
    StreetPattern::new(0, Indicator::Ul, Capture::Phrase),
    StreetPattern::new(1, Indicator::Ulicy, Capture::Phrase),
    StreetPattern::new(2, Indicator::Ulica, Capture::Phrase),
    StreetPattern::new(3, Indicator::AlDot, Capture::Phrase),
    StreetPattern::new(4, Indicator::AlDotSpace, Capture::Phrase),
    StreetPattern::new(5, Indicator::Alei, Capture::Phrase),
    StreetPattern::new(6, Indicator::Aleja, Capture::Phrase),
    StreetPattern::new(7, Indicator::Ul, Capture::TwoWords),
    StreetPattern::new(8, Indicator::Ulicy, Capture::TwoWords),
    StreetPattern::new(9, Indicator::Ulica, Capture::TwoWords),
    StreetPattern::new(10, Indicator::AlDot, Capture::TwoWords),
    StreetPattern::new(11, Indicator::AlDotSpace, Capture::TwoWords),
    StreetPattern::new(12, Indicator::Alei, Capture::TwoWords),
    StreetPattern::new(13, Indicator::Aleja, Capture::TwoWords),
];

struct CompiledPattern {
    pattern: StreetPattern,
    regex: Regex,
}

impl CompiledPattern {
    /// First match of this pattern that the indicator accepts.
    fn first_capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        let mut start = 0;
        while let Some(captures) = self.regex.captures_at(text, start) {
            let whole = captures.get(0)?;
            if !self.pattern.indicator.rejects(&text[whole.start()..]) {
                return captures.get(1).map(|m| m.as_str());
            }
            start = whole.start() + next_char_len(&text[whole.start()..]);
        }
        None
    }
}

static COMPILED_PATTERNS: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| {
    STREET_PATTERNS
        .iter()
        .map(|pattern| {
            let source = pattern.source();
            let regex = Regex::new(&source)
                .unwrap_or_else(|e| panic!("invalid street pattern '{source}': {e}"));
            CompiledPattern {
                pattern: *pattern,
                regex,
            }
        })
        .collect()
});

static SAINT_ABBREVIATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bśw\b").expect("valid abbreviation pattern"));

/// Genitive and adjectival endings rewritten to the nominative `-a`, in order.
const NOMINATIVE_SUFFIXES: [&str; 3] = ["iego", "iej", "ej"];

/// A raw pattern match and its normalized form, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'t> {
    pub pattern: StreetPattern,
    pub raw: &'t str,
    pub normalized: String,
}

/// All pattern candidates for `text`, in pattern priority order.
pub fn candidates(text: &str) -> impl Iterator<Item = Candidate<'_>> {
    COMPILED_PATTERNS.iter().filter_map(move |compiled| {
        compiled.first_capture(text).map(|raw| Candidate {
            pattern: compiled.pattern,
            raw,
            normalized: normalize_candidate(raw),
        })
    })
}

/// Finds the street a listing is on.
///
/// Returns the gazetteer's spelling of the street, never the text as written.
pub fn extract_street<'g>(text: &str, known_streets: &'g StreetGazetteer) -> Option<&'g str> {
    candidates(text)
        .find_map(|candidate| known_streets.lookup(&candidate.normalized))
        .or_else(|| find_known_street(text, known_streets))
}

/// Trims, expands `św` and applies at most one nominative rewrite.
pub fn normalize_candidate(raw: &str) -> String {
    let expanded = SAINT_ABBREVIATION.replace_all(raw.trim(), "świętego");
    to_nominative(&expanded)
}

pub fn to_nominative(candidate: &str) -> String {
    NOMINATIVE_SUFFIXES
        .iter()
        .find_map(|suffix| strip_suffix_ignore_case(candidate, suffix))
        .map_or_else(|| candidate.to_string(), |stem| format!("{stem}a"))
}

fn strip_suffix_ignore_case<'a>(value: &'a str, suffix: &str) -> Option<&'a str> {
    let split = value.len().checked_sub(suffix.len())?;
    if !value.is_char_boundary(split) || !value[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    Some(&value[..split])
}

/// First gazetteer entry present in `text` as a whole word, ignoring case.
fn find_known_street<'g>(text: &str, known_streets: &'g StreetGazetteer) -> Option<&'g str> {
    let folded = text.to_lowercase();
    known_streets
        .entries()
        .iter()
        .find(|entry| contains_whole_word(&folded, &entry.folded))
        .map(|entry| entry.name.as_str())
}

fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    let (Some(first), Some(last)) = (needle.chars().next(), needle.chars().next_back()) else {
        return false;
    };

    let mut from = 0;
    while let Some(offset) = haystack[from..].find(needle) {
        let at = from + offset;
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        if is_boundary(before, Some(first)) && is_boundary(Some(last), after) {
            return true;
        }
        from = at + next_char_len(&haystack[at..]);
    }
    false
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_boundary(left: Option<char>, right: Option<char>) -> bool {
    left.is_some_and(is_word_char) != right.is_some_and(is_word_char)
}

fn next_char_len(s: &str) -> usize {
    s.chars().next().map_or(1, char::len_utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn krakow_streets() -> StreetGazetteer {
        StreetGazetteer::new([
            "lubomirska",
            "Długa",
            "Karmelicka",
            "monte cassino",
            "Stefana Batorego",
            "Świętego Filipa",
            "Dębska",
        ])
        .unwrap()
    }

    #[test]
    fn ul_dot_without_space_before_house_number() {
        let text = "Mieszkanie przy ul.Lubomirskiego 10";
        assert_eq!(extract_street(text, &krakow_streets()), Some("lubomirska"));
    }

    #[test]
    fn ul_dot_with_space() {
        let text = "Nowy dom na ul. Lubomirskiego";
        assert_eq!(extract_street(text, &krakow_streets()), Some("lubomirska"));
    }

    #[test]
    fn ulicy_phrase() {
        let text = "Sprzedam mieszkanie przy ulicy Lubomirskiego";
        assert_eq!(extract_street(text, &krakow_streets()), Some("lubomirska"));
    }

    #[test]
    fn aleja_phrase() {
        let text = "Luksusowe apartamenty przy aleja Lubomirskiego";
        assert_eq!(extract_street(text, &krakow_streets()), Some("lubomirska"));
    }

    /// Checks the resolved street and the pattern whose candidate validated.
    fn assert_resolved(text: &str, expected: &str, indicator: Indicator, capture: Capture) {
        let streets = krakow_streets();
        assert_eq!(extract_street(text, &streets), Some(expected), "for {text:?}");

        let resolved = candidates(text)
            .find(|candidate| streets.lookup(&candidate.normalized).is_some())
            .map(|candidate| candidate.pattern)
            .unwrap();
        assert_eq!(
            (resolved.indicator, resolved.capture),
            (indicator, capture),
            "for {text:?}"
        );
    }

    #[test]
    fn ul_indicator() {
        assert_resolved("Pokój, ul. Karmelicka", "Karmelicka", Indicator::Ul, Capture::Phrase);
        assert_resolved(
            "Pokój, ul. Stefana Batorego 5",
            "Stefana Batorego",
            Indicator::Ul,
            Capture::TwoWords,
        );
    }

    #[test]
    fn ulicy_indicator() {
        assert_resolved(
            "Pokój przy ulicy Karmelickiej",
            "Karmelicka",
            Indicator::Ulicy,
            Capture::Phrase,
        );
        assert_resolved(
            "Pokój przy ulicy Stefana Batorego 5",
            "Stefana Batorego",
            Indicator::Ulicy,
            Capture::TwoWords,
        );
    }

    #[test]
    fn ulica_indicator() {
        assert_resolved("Pokój, ulica Karmelicka", "Karmelicka", Indicator::Ulica, Capture::Phrase);
        assert_resolved(
            "Pokój, ulica Stefana Batorego 5",
            "Stefana Batorego",
            Indicator::Ulica,
            Capture::TwoWords,
        );
    }

    #[test]
    fn al_dot_glued_indicator() {
        assert_resolved("Biuro, al.Karmelicka", "Karmelicka", Indicator::AlDot, Capture::Phrase);
        assert_resolved(
            "Biuro, al.Stefana Batorego 3",
            "Stefana Batorego",
            Indicator::AlDot,
            Capture::TwoWords,
        );
    }

    #[test]
    fn al_dot_space_indicator() {
        assert_resolved(
            "Biuro, al. Karmelicka",
            "Karmelicka",
            Indicator::AlDotSpace,
            Capture::Phrase,
        );
        assert_resolved(
            "Biuro, al. Stefana Batorego 3",
            "Stefana Batorego",
            Indicator::AlDotSpace,
            Capture::TwoWords,
        );
    }

    #[test]
    fn alei_indicator() {
        assert_resolved("Lokal w alei Karmelicka", "Karmelicka", Indicator::Alei, Capture::Phrase);
        assert_resolved(
            "Lokal w alei Stefana Batorego 3",
            "Stefana Batorego",
            Indicator::Alei,
            Capture::TwoWords,
        );
    }

    #[test]
    fn aleja_indicator() {
        assert_resolved("Lokal, aleja Karmelicka", "Karmelicka", Indicator::Aleja, Capture::Phrase);
        assert_resolved(
            "Lokal, aleja Stefana Batorego 3",
            "Stefana Batorego",
            Indicator::Aleja,
            Capture::TwoWords,
        );
    }

    #[test]
    fn iego_suffix_becomes_a() {
        let streets = StreetGazetteer::new(["Nowaka"]).unwrap();
        assert_eq!(
            extract_street("Mieszkanie przy ul. Nowakiego", &streets),
            Some("Nowaka")
        );
    }

    #[test]
    fn iej_suffix_becomes_a() {
        let streets = StreetGazetteer::new(["Kowalska"]).unwrap();
        assert_eq!(
            extract_street("Nieruchomość przy ul. Kowalskiej", &streets),
            Some("Kowalska")
        );
    }

    #[test]
    fn no_indicator_and_no_known_street() {
        let text = "Brak informacji o ulicach i alejach.";
        assert_eq!(extract_street(text, &krakow_streets()), None);
    }

    #[test]
    fn two_word_name_after_single_word_miss() {
        let text = "Klimatyczne, 3 pokojowe mieszkanie 71 m2, okolice ul. Monte Cassino \
                    Mieszkanie 56 m2 zlokalizowane jest w samym centrum Krakowa, przy ul. Lubomirskiego";
        assert_eq!(extract_street(text, &krakow_streets()), Some("monte cassino"));
    }

    #[test]
    fn house_number_and_slashes_around_name() {
        let text = "Nowoczesne mieszkanie: Swoszowice / Opatkowice / ul. Dębskiego / 2 pokoje. \
                    Mieszkanie znajduje się na ul. Macieja Dębskiego 21d.";
        assert_eq!(extract_street(text, &krakow_streets()), Some("Dębska"));
    }

    #[test]
    fn ul_pattern_skips_ulicy_and_takes_later_ul() {
        let text = "Pokój przy ulicy Długiej, blisko ul. Karmelicka";
        assert_eq!(extract_street(text, &krakow_streets()), Some("Karmelicka"));
    }

    #[test]
    fn saint_abbreviation_is_expanded() {
        let text = "Mieszkanie przy ul. św Filipa 5";
        assert_eq!(extract_street(text, &krakow_streets()), Some("Świętego Filipa"));
    }

    #[test]
    fn unvalidated_candidate_falls_through_to_later_patterns() {
        let streets = StreetGazetteer::new(["Pokoju"]).unwrap();
        let text = "Mieszkanie przy ul. Nieznanej, obok aleja Pokoju";
        assert_eq!(extract_street(text, &streets), Some("Pokoju"));
    }

    #[test]
    fn known_street_found_without_indicator() {
        let streets = StreetGazetteer::new(["Józefa"]).unwrap();
        let text = "Przytulna kawalerka na Kazimierzu, JÓZEFA 12";
        assert_eq!(extract_street(text, &streets), Some("Józefa"));
    }

    #[test]
    fn fallback_ignores_names_inside_longer_words() {
        let streets = StreetGazetteer::new(["Długa"]).unwrap();
        assert_eq!(extract_street("Mieszkanie na Długachowskiej", &streets), None);
    }

    #[test]
    fn fallback_prefers_earlier_gazetteer_entry() {
        let streets = StreetGazetteer::new(["Krakowska", "Dietla"]).unwrap();
        assert_eq!(
            extract_street("Róg Dietla i Krakowska", &streets),
            Some("Krakowska")
        );
    }

    #[test]
    fn ul_prefix_returns_gazetteer_spelling_regardless_of_case() {
        let streets = krakow_streets();
        for name in streets.names() {
            let text = format!("Oferta: ul. {}", name.to_uppercase());
            assert_eq!(extract_street(&text, &streets), Some(name), "for {name}");
        }
    }

    #[test]
    fn nominative_rewrite_is_idempotent() {
        for word in ["Nowakiego", "Kowalskiej", "Długiej", "Krótkej", "Karmelicka"] {
            let once = to_nominative(word);
            assert_eq!(to_nominative(&once), once, "for {word}");
        }
    }

    #[test]
    fn nominative_rules_apply_in_order() {
        assert_eq!(to_nominative("Nowakiego"), "Nowaka");
        assert_eq!(to_nominative("KOWALSKIEJ"), "KOWALSKa");
        assert_eq!(to_nominative("Krótkej"), "Krótka");
        assert_eq!(to_nominative("Zabłocie"), "Zabłocie");
    }

    #[test]
    fn candidates_report_their_pattern() {
        let found: Vec<_> = candidates("ul. Stefana Batorego").collect();
        assert_eq!(found[0].pattern.indicator, Indicator::Ul);
        assert_eq!(found[0].pattern.capture, Capture::Phrase);
        assert_eq!(found[0].raw, "Stefana");
        let two_words = found
            .iter()
            .find(|c| c.pattern.capture == Capture::TwoWords)
            .unwrap();
        assert_eq!(two_words.pattern.priority, 7);
        assert_eq!(two_words.normalized, "Stefana Batorego");
    }

    #[test]
    fn pattern_priorities_match_positions() {
        for (position, pattern) in STREET_PATTERNS.iter().enumerate() {
            assert_eq!(pattern.priority, position);
        }
    }
}
