use once_cell::sync::Lazy;
use regex::Regex;

// Applied in order, first match only.
static ALIASES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)just\s*eat", "Just Eat"),
        (r"(?i)uber\s*eats", "Uber Eats"),
        (r"(?i)deliveroo", "Deliveroo"),
        (r"(?i)foodhub", "Foodhub"),
        (r"(?i)zapp", "Zapp"),
        (r"(?i)dishpatch", "Dishpatch"),
        (r"(?i)gophr", "Gophr"),
        (r"(?i)snappy\s*shopper", "Snappy Shopper"),
    ]
    .into_iter()
    .map(|(pattern, canonical)| {
        (
            Regex::new(pattern).expect("alias pattern is valid"),
            canonical,
        )
    })
    .collect()
});

const LOGO_OVERRIDES: &[(&str, &str)] = &[
    ("deliveroo", "deliveroo.png"),
    ("zapp", "zapp.png"),
    ("ubereats", "ubereats.png"),
    ("justeat", "justeat.png"),
    ("foodhub", "foodhub.png"),
    ("snappyshopper", "snappyshopper.png"),
    ("dishpatch", "dishpatch.png"),
    ("gophr", "gophr.png"),
    ("stuart", "stuart.png"),
    ("glovo", "glovo.png"),
];

/// Canonical display name for a delivery app, used as the join key everywhere.
///
/// Known aliases collapse to a fixed spelling ("UBER EATS", "ubereats" ->
/// "Uber Eats"); anything else comes back lowercased with each ASCII word
/// capitalised. Normalizing an already normalized name is a no-op.
pub fn normalize_app_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut value = trimmed.to_lowercase();
    for (pattern, canonical) in ALIASES.iter() {
        value = pattern.replacen(&value, 1, *canonical).into_owned();
    }

    title_case(&value)
}

// Upper-cases the first ASCII letter after a non-word boundary.
fn title_case(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut prev_is_word = false;

    for ch in input.chars() {
        let is_word = ch.is_ascii_alphanumeric() || ch == '_';
        if is_word && !prev_is_word {
            output.push(ch.to_ascii_uppercase());
        } else {
            output.push(ch);
        }
        prev_is_word = is_word;
    }

    output
}

/// Image path for an app's logo.
pub fn logo_filename(app: &str) -> String {
    let key: String = app
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();

    match LOGO_OVERRIDES.iter().find(|(name, _)| *name == key) {
        Some((_, file)) => format!("/delivery-logos/{file}"),
        None => format!("/delivery-logos/{key}.png"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_aliases_collapse_to_canonical_spelling() {
        assert_eq!(normalize_app_name("UBER EATS"), "Uber Eats");
        assert_eq!(normalize_app_name("uber eats"), "Uber Eats");
        assert_eq!(normalize_app_name("ubereats"), "Uber Eats");
        assert_eq!(normalize_app_name("JustEat"), "Just Eat");
        assert_eq!(normalize_app_name("  snappy   shopper "), "Snappy Shopper");
    }

    #[test]
    fn unknown_names_are_title_cased() {
        assert_eq!(normalize_app_name("stuart"), "Stuart");
        assert_eq!(normalize_app_name("GLOVO express"), "Glovo Express");
        assert_eq!(normalize_app_name("o'neil couriers"), "O'Neil Couriers");
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(normalize_app_name(""), "");
        assert_eq!(normalize_app_name("   "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "UBER EATS",
            "just   eat",
            "deliveroo plus",
            "zapp zapp",
            "Snappy's Shopper",
            "straße kurier",
            "42 deliveries",
            "mixed_Case-name",
            "",
        ];
        for sample in samples {
            let once = normalize_app_name(sample);
            assert_eq!(normalize_app_name(&once), once, "input {sample:?}");
        }
    }

    #[test]
    fn logo_filenames_strip_punctuation() {
        assert_eq!(logo_filename("Deliveroo"), "/delivery-logos/deliveroo.png");
        assert_eq!(logo_filename("Uber Eats"), "/delivery-logos/ubereats.png");
        assert_eq!(
            logo_filename("Snappy's Shopper"),
            "/delivery-logos/snappysshopper.png"
        );
        assert_eq!(logo_filename("UnknownApp"), "/delivery-logos/unknownapp.png");
    }
}
