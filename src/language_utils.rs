/*!
 * Language tag utilities.
 *
 * The annotator writes a `lang` attribute onto every RTL node. The tag is
 * configurable, so it is validated and normalised here with ISO 639 data.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// ISO 639-2/B codes that differ from their terminology form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("per", "fas"),
    ("may", "msa"),
    ("fre", "fra"),
    ("ger", "deu"),
];

/// Languages written primarily in the Arabic script
const ARABIC_SCRIPT_LANGUAGES: &[&str] = &[
    "fas", "pes", "prs", "ara", "urd", "pus", "snd", "uig", "ckb", "kur", "bal", "glk", "mzn",
    "lrc", "azb",
];

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminology)| *terminology)
}

/// Split a BCP 47 style tag into its primary language subtag and the rest
fn split_tag(tag: &str) -> (String, Option<String>) {
    let trimmed = tag.trim();
    match trimmed.split_once(['-', '_']) {
        Some((primary, rest)) => (primary.to_lowercase(), Some(rest.to_string())),
        None => (trimmed.to_lowercase(), None),
    }
}

fn resolve(primary: &str) -> Option<Language> {
    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(primary)
            .or_else(|| bibliographic_to_terminology(primary).and_then(Language::from_639_3)),
        _ => None,
    }
}

/// Normalise a language tag for use in a `lang` attribute.
///
/// The primary subtag is reduced to its ISO 639-1 form when one exists
/// (`per` and `fas` both become `fa`); a region subtag is kept and
/// upper-cased (`fa_ir` becomes `fa-IR`).
pub fn normalize_language_tag(tag: &str) -> Result<String> {
    let (primary, rest) = split_tag(tag);
    let language = resolve(&primary)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language tag: {}", tag))?;

    let primary = language
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| language.to_639_3().to_string());

    match rest {
        Some(region) if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(format!("{}-{}", primary, region.to_uppercase()))
        }
        Some(subtags) if !subtags.is_empty() => Ok(format!("{}-{}", primary, subtags)),
        _ => Ok(primary),
    }
}

/// Whether the tag names a language usually written in the Arabic script
pub fn is_arabic_script_language(tag: &str) -> bool {
    let (primary, _) = split_tag(tag);
    resolve(&primary)
        .map(|language| ARABIC_SCRIPT_LANGUAGES.contains(&language.to_639_3()))
        .unwrap_or(false)
}
