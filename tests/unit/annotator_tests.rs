/*!
 * Tests for the subtree annotator
 */

use persian_rtl::annotator::{Annotator, Direction, ScriptClass};
use persian_rtl::app_config::{Config, InlinePolicy, UnicodeBidi};
use persian_rtl::dom::{Document, ElementData};
use persian_rtl::errors::DomError;

use crate::common::{element, find_element, find_tag, is_marked_ltr, is_marked_rtl, page};

fn annotate_all(annotator: &mut Annotator, doc: &mut Document) {
    let root = doc.root();
    annotator.annotate(doc, root).expect("annotation should succeed");
}

#[test]
fn test_annotate_withLatinAndPersianParagraphs_shouldMarkEachDirection() {
    let mut doc = page("<p>Hello world</p><p>سلام دنیا</p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let latin = find_element(&doc, "p", "Hello world");
    let persian = find_element(&doc, "p", "سلام دنیا");

    assert!(is_marked_ltr(&doc, latin));
    assert!(!element(&doc, latin).has_class("rtl-persian"));
    assert_eq!(element(&doc, latin).attr("lang"), None);

    assert!(is_marked_rtl(&doc, persian));
    assert!(element(&doc, persian).has_class("rtl-persian"));
    assert_eq!(element(&doc, persian).attr("lang"), Some("fa"));
    assert_eq!(element(&doc, persian).style("unicode-bidi"), Some("isolate"));

    let state = annotator.state(persian).unwrap();
    assert!(state.processed);
    assert_eq!(state.direction, Direction::Rtl);
    assert_eq!(state.script_class, ScriptClass::Target);
}

#[test]
fn test_annotate_withCodeBlock_shouldAddNoAttributes() {
    let mut doc = page("<p>سلام</p><pre><code>سلام <span class=\"x\">دنیا</span></code></pre>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let pre = find_tag(&doc, "pre");
    let code = find_tag(&doc, "code");
    let span = find_tag(&doc, "span");
    assert!(element(&doc, pre).attributes().is_empty());
    assert!(element(&doc, code).attributes().is_empty());
    assert_eq!(element(&doc, span).attributes(), vec![("class".to_string(), "x".to_string())]);
    assert!(annotator.state(code).is_none());
}

#[test]
fn test_annotate_twice_shouldNotMutateOnSecondCall() {
    let mut doc = page(
        "<p>Hello</p><div>سلام <b>bold</b> <i>متن</i></div><ol><li>یک</li><li>دو</li></ol>\
         <h2><span>hi</span><span>سلام</span></h2>",
    );
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let revision = doc.revision();
    let html = doc.to_html();
    annotate_all(&mut annotator, &mut doc);

    assert_eq!(doc.revision(), revision);
    assert_eq!(doc.to_html(), html);
}

#[test]
fn test_annotate_withRestoredMarks_shouldReassertPreviousDecision() {
    let mut doc = page("<p>سلام</p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    // the host re-render wiped the inline style
    let p = find_tag(&doc, "p");
    doc.remove_attr(p, "style").unwrap();
    annotator.annotate(&mut doc, p).unwrap();

    assert!(is_marked_rtl(&doc, p));
}

#[test]
fn test_annotate_withHeadingOfMixedSpans_shouldMarkHeadingAsOneUnit() {
    let mut doc = page("<h2><span>hello</span><span>سلام</span></h2>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let heading = find_tag(&doc, "h2");
    let latin = find_element(&doc, "span", "hello");
    let persian = find_element(&doc, "span", "سلام");
    assert!(is_marked_rtl(&doc, heading));
    assert!(is_marked_rtl(&doc, latin));
    assert!(is_marked_rtl(&doc, persian));
}

#[test]
fn test_annotate_withLatinHeading_shouldMarkHeadingLtr() {
    let mut doc = page("<div>سلام<h3>Chapter <em>one</em></h3></div>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let heading = find_tag(&doc, "h3");
    let em = find_tag(&doc, "em");
    assert!(is_marked_ltr(&doc, heading));
    assert_eq!(element(&doc, em).style("direction"), None);
}

#[test]
fn test_annotate_whenTextAddedInsideHeading_shouldReevaluateWholeHeading() {
    let mut doc = page("<h1>Intro</h1>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);
    let heading = find_tag(&doc, "h1");
    assert!(is_marked_ltr(&doc, heading));

    let span = doc.create_element(heading, "span").unwrap();
    doc.append_text(span, " مقدمه").unwrap();
    annotator.annotate(&mut doc, span).unwrap();

    assert!(is_marked_rtl(&doc, heading));
    assert!(is_marked_rtl(&doc, span));
}

#[test]
fn test_annotate_withPersianOrderedList_shouldMirrorList() {
    let mut doc = page("<ol><li>یک</li><li>دو</li></ol>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let list = find_tag(&doc, "ol");
    let list_element = element(&doc, list);
    assert_eq!(list_element.style("direction"), Some("rtl"));
    assert_eq!(list_element.style("padding-right"), Some("2rem"));
    assert_eq!(list_element.style("padding-left"), Some("0"));
    assert_eq!(list_element.attr("data-rtl-list"), Some("true"));

    for item in doc.children(list) {
        assert!(is_marked_rtl(&doc, item));
        // markers keep their own character order
        assert_eq!(element(&doc, item).style("unicode-bidi"), None);
    }
}

#[test]
fn test_annotate_withExistingListPadding_shouldMoveItToTheRight() {
    let mut doc = page("<ul style=\"padding-left: 40px; margin-left: 8px\"><li>یک</li></ul>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let list = element(&doc, find_tag(&doc, "ul"));
    assert_eq!(list.style("padding-right"), Some("40px"));
    assert_eq!(list.style("padding-left"), Some("0"));
    assert_eq!(list.style("margin-right"), Some("8px"));
    assert_eq!(list.style("margin-left"), None);
}

#[test]
fn test_annotate_withMixedList_shouldNotMirror() {
    let mut doc = page("<ul><li>یک</li><li>two</li></ul>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let list = find_tag(&doc, "ul");
    assert_eq!(element(&doc, list).attr("data-rtl-list"), None);
    let latin = find_element(&doc, "li", "two");
    assert!(is_marked_ltr(&doc, latin));
}

#[test]
fn test_annotate_whenItemAppendedToList_shouldMirrorParentList() {
    let mut doc = page("<ol></ol>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let list = find_tag(&doc, "ol");
    let added = doc.append_html(list, "<li>سلام</li>").unwrap();
    annotator.annotate(&mut doc, added[0]).unwrap();

    assert_eq!(element(&doc, list).attr("data-rtl-list"), Some("true"));
}

#[test]
fn test_inheritPolicy_withLatinInlineInRtlContainer_shouldInheritRtl() {
    let mut doc = page("<div>سلام <span>hello</span></div>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let container = find_tag(&doc, "div");
    let span = find_tag(&doc, "span");
    assert!(is_marked_rtl(&doc, container));
    assert!(is_marked_rtl(&doc, span));
    assert!(annotator.state(span).unwrap().inherited);
}

#[test]
fn test_independentPolicy_withLatinInlineInRtlContainer_shouldLeaveInlineUnmarked() {
    let mut config = Config::default();
    config.annotation.inline_policy = InlinePolicy::Independent;
    let mut doc = page("<div>سلام <span>hello</span></div>");
    let mut annotator = Annotator::new(&config);
    annotate_all(&mut annotator, &mut doc);

    let container = find_tag(&doc, "div");
    let span = find_tag(&doc, "span");
    assert!(is_marked_rtl(&doc, container));
    assert!(element(&doc, span).attributes().is_empty());
}

#[test]
fn test_annotate_withLatinParagraphInRtlContainer_shouldDecideIndependently() {
    let mut doc = page("<div>سلام<p>Hello</p><span>world</span></div>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let paragraph = find_tag(&doc, "p");
    let span = find_tag(&doc, "span");
    assert!(is_marked_ltr(&doc, paragraph));
    assert!(is_marked_rtl(&doc, span));
}

#[test]
fn test_annotate_withExcludedDescendantOfRtlContainer_shouldNotPropagateIntoIt() {
    let mut doc = page("<div>سلام <code>x</code> <span class=\"hljs-string\">y</span></div>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    assert!(element(&doc, find_tag(&doc, "code")).attributes().is_empty());
    assert_eq!(element(&doc, find_tag(&doc, "span")).attributes().len(), 1);
}

#[test]
fn test_annotate_afterContentChange_shouldRederiveDirection() {
    let mut doc = page("<p>سلام</p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);
    let p = find_tag(&doc, "p");
    assert!(is_marked_rtl(&doc, p));

    let text = doc.children(p)[0];
    doc.set_text(text, "Hello").unwrap();
    annotator.annotate(&mut doc, p).unwrap();

    assert!(is_marked_ltr(&doc, p));
    assert!(!element(&doc, p).has_class("rtl-persian"));
    assert_eq!(element(&doc, p).attr("lang"), None);
    assert_eq!(element(&doc, p).style("unicode-bidi"), None);
}

#[test]
fn test_annotate_withInheritedMarkAndUnchangedText_shouldNotDowngrade() {
    let mut doc = page("<div>سلام <span>hello</span></div>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    // revisiting the inline element on its own keeps its RTL mark
    let span = find_tag(&doc, "span");
    let revision = doc.revision();
    annotator.annotate(&mut doc, span).unwrap();
    assert!(is_marked_rtl(&doc, span));
    assert_eq!(doc.revision(), revision);
}

#[test]
fn test_annotate_withPersianOnlyInsideInlineChild_shouldMarkParagraphRtl() {
    let mut doc = page("<p><strong>سلام دنیا</strong></p><ul><li><em>یک</em></li></ul>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let paragraph = find_tag(&doc, "p");
    assert!(is_marked_rtl(&doc, paragraph));
    assert_eq!(element(&doc, paragraph).style("text-align"), Some("right"));
    assert!(is_marked_rtl(&doc, find_tag(&doc, "strong")));
    assert!(is_marked_rtl(&doc, find_tag(&doc, "li")));
    assert_eq!(element(&doc, find_tag(&doc, "ul")).attr("data-rtl-list"), Some("true"));
}

#[test]
fn test_annotate_withCodeInsideLatinParagraph_shouldIgnoreCodeText() {
    let mut doc = page("<p>Run <code>سلام</code> now</p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    assert!(is_marked_ltr(&doc, find_tag(&doc, "p")));
    assert!(element(&doc, find_tag(&doc, "code")).attributes().is_empty());
}

#[test]
fn test_annotate_whenInlineChildTextChanges_shouldReevaluateParagraph() {
    let mut doc = page("<p><strong>Hello</strong></p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);
    let paragraph = find_tag(&doc, "p");
    let strong = find_tag(&doc, "strong");
    assert!(is_marked_ltr(&doc, paragraph));

    let text = doc.children(strong)[0];
    doc.set_text(text, "سلام").unwrap();
    annotator.annotate(&mut doc, strong).unwrap();

    assert!(is_marked_rtl(&doc, paragraph));
    assert!(is_marked_rtl(&doc, strong));
}

#[test]
fn test_annotate_withClassesContainingShortTagNames_shouldStillAnnotate() {
    let mut doc = page(
        "<p class=\"whitespace-pre-wrap\">سلام دنیا</p><div class=\"bottom-bar\"><p>سلام</p></div>",
    );
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let wrapped = find_element(&doc, "p", "سلام دنیا");
    let nested = find_element(&doc, "p", "سلام");
    assert_eq!(element(&doc, wrapped).style("direction"), Some("rtl"));
    assert!(is_marked_rtl(&doc, wrapped));
    assert!(is_marked_rtl(&doc, nested));
}

#[test]
fn test_annotate_withEmptyElements_shouldNotForceDirection() {
    let mut doc = page("<div>   </div><p></p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    assert!(element(&doc, find_tag(&doc, "div")).attributes().is_empty());
    assert!(element(&doc, find_tag(&doc, "p")).attributes().is_empty());
}

#[test]
fn test_annotate_withLiveInput_shouldLeaveInputToRegistry() {
    let mut doc = page("<div>سلام<textarea>hello</textarea></div>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let textarea = find_tag(&doc, "textarea");
    assert!(element(&doc, textarea).attributes().is_empty());
}

#[test]
fn test_annotate_withDetachedRoot_shouldBeSilentNoOp() {
    let mut doc = page("<div><p>سلام</p></div>");
    let p = find_tag(&doc, "p");
    let div = doc.parent(p).unwrap();
    doc.remove(div).unwrap();

    let mut annotator = Annotator::default();
    let revision = doc.revision();
    let report = annotator.annotate(&mut doc, p).unwrap();

    assert_eq!(report.visited, 0);
    assert_eq!(doc.revision(), revision);
}

#[test]
fn test_annotate_withForeignNodeId_shouldReturnUnknownNode() {
    let big = page("<p>a</p><p>b</p><p>c</p><p>d</p>");
    let foreign = *big.descendants(big.root()).last().unwrap();

    let mut doc = Document::new();
    let mut annotator = Annotator::default();
    let result = annotator.annotate(&mut doc, foreign);
    assert_eq!(result, Err(DomError::UnknownNode(foreign)));
}

#[test]
fn test_annotate_withBidiOverrideConfig_shouldWriteConfiguredValue() {
    let mut config = Config::default();
    config.annotation.unicode_bidi = UnicodeBidi::BidiOverride;
    config.annotation.language_tag = "per".to_string();
    let mut doc = page("<p>سلام</p>");
    let mut annotator = Annotator::new(&config);
    annotate_all(&mut annotator, &mut doc);

    let p = element(&doc, find_tag(&doc, "p"));
    assert_eq!(p.style("unicode-bidi"), Some("bidi-override"));
    assert_eq!(p.attr("lang"), Some("fa"));
}

#[test]
fn test_prune_afterRemoval_shouldForgetDetachedNodes() {
    let mut doc = page("<p>سلام</p><p>Hello</p>");
    let mut annotator = Annotator::default();
    annotate_all(&mut annotator, &mut doc);

    let p = find_element(&doc, "p", "سلام");
    doc.remove(p).unwrap();
    assert!(annotator.prune(&doc) >= 1);
    assert!(annotator.state(p).is_none());
}

#[test]
fn test_annotate_withElementBuiltByHost_shouldMarkIt() {
    let mut doc = page("");
    let body = doc.body().unwrap();
    let p = doc
        .append_element(body, ElementData::with_attrs("p", [("class", "message")]))
        .unwrap();
    doc.append_text(p, "درود").unwrap();

    let mut annotator = Annotator::default();
    let report = annotator.annotate(&mut doc, p).unwrap();
    assert_eq!(report.marked_rtl, 1);
    assert!(element(&doc, p).has_class("message"));
    assert!(element(&doc, p).has_class("rtl-persian"));
}
