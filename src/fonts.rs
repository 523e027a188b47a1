/*!
 * Typeface catalog.
 *
 * Maps the font names offered to the user onto a CSS family and, for web
 * fonts, the stylesheet that declares their faces. Names outside the
 * catalog are used verbatim as a family with nothing to fetch.
 */

use url::Url;

/// Font used when nothing (or nothing usable) is selected
pub const DEFAULT_FONT: &str = "Vazirmatn";

/// Families appended after the selected typeface
pub const FALLBACK_FAMILIES: &str =
    "'Tahoma', 'Iranian Sans', 'IRANSans', system-ui, -apple-system, BlinkMacSystemFont, sans-serif";

/// One entry of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontFace {
    /// Name as stored in the settings
    pub name: &'static str,
    /// CSS family declared by the stylesheet
    pub family: &'static str,
    pub stylesheet: Option<&'static str>,
}

impl FontFace {
    pub fn stylesheet_url(&self) -> Option<Url> {
        self.stylesheet.and_then(|href| Url::parse(href).ok())
    }
}

static CATALOG: &[FontFace] = &[
    FontFace {
        name: "Vazirmatn",
        family: "Vazirmatn",
        stylesheet: Some("https://fonts.googleapis.com/css2?family=Vazirmatn:wght@400;700&display=swap"),
    },
    FontFace {
        name: "Vazir",
        family: "Vazirmatn",
        stylesheet: Some("https://cdn.jsdelivr.net/gh/rastikerdar/vazirmatn@v33.003/Vazirmatn-font-face.css"),
    },
    FontFace {
        name: "Sahel",
        family: "Sahel",
        stylesheet: Some("https://cdn.jsdelivr.net/gh/rastikerdar/sahel-font@v3.4.0/dist/font-face.css"),
    },
    FontFace {
        name: "Samim",
        family: "Samim",
        stylesheet: Some("https://cdn.jsdelivr.net/gh/rastikerdar/samim-font@v4.0.5/dist/font-face.css"),
    },
    FontFace {
        name: "Shabnam",
        family: "Shabnam",
        stylesheet: Some("https://cdn.jsdelivr.net/gh/rastikerdar/shabnam-font@v5.0.1/dist/font-face.css"),
    },
    FontFace {
        name: "Tahoma",
        family: "Tahoma",
        stylesheet: None,
    },
];

pub fn catalog() -> &'static [FontFace] {
    CATALOG
}

/// Find a catalog entry, ignoring case and surrounding whitespace
pub fn lookup(name: &str) -> Option<&'static FontFace> {
    let name = name.trim();
    CATALOG.iter().find(|face| face.name.eq_ignore_ascii_case(name))
}

/// CSS `font-family` value for a typeface name
pub fn family_stack(typeface: &str) -> String {
    let family = lookup(typeface).map(|face| face.family).unwrap_or(typeface.trim());
    // the name lands inside a <style> element
    let cleaned: String = family
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '<' | '>'))
        .collect();
    let quoted = cleaned.trim().replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}', {}", quoted, FALLBACK_FAMILIES)
}
