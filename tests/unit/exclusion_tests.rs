/*!
 * Tests for the exclusion policy
 */

use persian_rtl::app_config::ExclusionConfig;
use persian_rtl::dom::ElementData;
use persian_rtl::exclusion::ExclusionPolicy;

use crate::common;

#[test]
fn test_excludesElement_withStructuralTags_shouldExclude() {
    let policy = ExclusionPolicy::default();
    for tag in ["script", "style", "head", "noscript", "svg"] {
        assert!(policy.excludes_element(&ElementData::new(tag)), "{} should be excluded", tag);
    }
    assert!(!policy.excludes_element(&ElementData::new("p")));
    assert!(!policy.excludes_element(&ElementData::new("span")));
}

#[test]
fn test_excludesElement_withVerbatimMarkers_shouldMatchTagsAndClassSubstrings() {
    let policy = ExclusionPolicy::default();
    assert!(policy.excludes_element(&ElementData::new("pre")));
    assert!(policy.excludes_element(&ElementData::new("code")));
    assert!(policy.excludes_element(&ElementData::with_attrs("div", [("class", "message language-rust")])));
    assert!(policy.excludes_element(&ElementData::with_attrs("span", [("class", "hljs-keyword")])));
    assert!(policy.excludes_element(&ElementData::with_attrs("div", [("class", "Code-Block")])));
    assert!(!policy.excludes_element(&ElementData::with_attrs("div", [("class", "message")])));
}

#[test]
fn test_excludesElement_withTagSubstring_shouldNotExclude() {
    // tags match exactly; only class names match by substring
    let policy = ExclusionPolicy::default();
    assert!(!policy.excludes_element(&ElementData::new("precode")));
}

#[test]
fn test_isExcluded_withExcludedAncestor_shouldInheritVerdict() {
    let doc = common::page("<pre><div><span>سلام</span></div></pre><p><span>x</span></p>");
    let policy = ExclusionPolicy::default();

    let inside = common::find_element(&doc, "span", "سلام");
    let outside = common::find_element(&doc, "span", "x");
    assert!(policy.is_excluded(&doc, inside));
    assert!(!policy.is_excluded(&doc, outside));
}

#[test]
fn test_isExcluded_afterClassChange_shouldBeRecomputed() {
    let mut doc = common::page("<div class=\"hljs\"><p>سلام</p></div>");
    let policy = ExclusionPolicy::default();
    let p = common::find_tag(&doc, "p");
    let div = doc.parent(p).unwrap();

    assert!(policy.is_excluded(&doc, p));
    doc.remove_class(div, "hljs").unwrap();
    assert!(!policy.is_excluded(&doc, p));
}

#[test]
fn test_customConfig_withOwnMarkers_shouldUseOnlyThem() {
    let config = ExclusionConfig {
        skip_tags: vec!["SCRIPT".to_string()],
        verbatim_tags: vec!["listing".to_string()],
        verbatim_class_markers: vec!["verbatim".to_string()],
    };
    let policy = ExclusionPolicy::new(&config);
    assert!(policy.excludes_element(&ElementData::new("script")));
    assert!(policy.excludes_element(&ElementData::with_attrs("div", [("class", "my-verbatim-box")])));
    assert!(policy.excludes_element(&ElementData::new("listing")));
    assert!(!policy.excludes_element(&ElementData::with_attrs("div", [("class", "listing")])));
    assert!(!policy.excludes_element(&ElementData::new("pre")));
}

#[test]
fn test_excludesElement_withClassContainingShortTagName_shouldNotExclude() {
    let policy = ExclusionPolicy::default();
    for class in ["whitespace-pre-wrap", "bottom-bar", "button", "settings", "preview", "barcode", "sample"] {
        assert!(
            !policy.excludes_element(&ElementData::with_attrs("div", [("class", class)])),
            "class {} should not be excluded",
            class
        );
    }
}
