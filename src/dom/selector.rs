//! CSS selector matching for [`Document::query_selector_all`].
//!
//! Parsing and matching are done by the `selectors` crate (the engine behind
//! Servo's style system). This module only adapts the document to it:
//! [`ElementRef`] implements [`selectors::Element`] over a `(&Document, NodeId)`
//! pair, and [`UiSelectors`] fixes the string types the parser produces.
//!
//! Standard selector syntax is accepted: combinators (` `, `>`, `+`, `~`),
//! attribute operators, `:not()` and the tree-structural pseudo-classes.
//! Non tree-structural pseudo-classes (`:hover`, `:focus`) and pseudo-elements
//! have no meaning for an in-memory document and fail with
//! [`UiError::InvalidSelector`].

use cssparser::{Parser as CssParser, ParserInput, ToCss};
use selectors::attr::{
    AttrSelectorOperation, AttrSelectorOperator, CaseSensitivity, NamespaceConstraint,
};
use selectors::matching::{
    ElementSelectorFlags, IgnoreNthChildForInvalidation, MatchingContext, MatchingMode,
    NeedsSelectorFlags, QuirksMode, matches_selector_list,
};
use selectors::parser::{ParseRelative, SelectorParseErrorKind};
use selectors::{NthIndexCache, OpaqueElement};

use crate::dom::{Document, NodeId};
use crate::error::{Result, UiError};

pub use selectors::parser::SelectorList;

/// A parsed selector list over this document's string types.
pub type Selectors = SelectorList<UiSelectors>;

// =============================================================================
// Parsing
// =============================================================================

/// Parse a comma-separated selector list.
pub fn parse_selector_list(selector: &str) -> Result<Selectors> {
    let mut input = ParserInput::new(selector);
    let mut parser = CssParser::new(&mut input);
    let parsed = SelectorList::parse(&SelectorParser, &mut parser, ParseRelative::No);
    parsed.map_err(|err| UiError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!(
            "{:?} at line {}, column {}",
            err.kind, err.location.line, err.location.column
        ),
    })
}

/// The elements of `candidates` matched by `list`, order preserved.
pub fn filter_matching(
    doc: &Document,
    list: &Selectors,
    candidates: impl IntoIterator<Item = NodeId>,
) -> Vec<NodeId> {
    let mut nth_index_cache = NthIndexCache::default();
    let mut context = MatchingContext::new(
        MatchingMode::Normal,
        None,
        &mut nth_index_cache,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        IgnoreNthChildForInvalidation::No,
    );
    candidates
        .into_iter()
        .filter(|&node| doc.is_element(node))
        .filter(|&node| matches_selector_list(list, &ElementRef::new(doc, node), &mut context))
        .collect()
}

struct SelectorParser;

impl<'i> selectors::parser::Parser<'i> for SelectorParser {
    type Impl = UiSelectors;
    type Error = SelectorParseErrorKind<'i>;

    fn parse_non_ts_pseudo_class(
        &self,
        location: cssparser::SourceLocation,
        name: cssparser::CowRcStr<'i>,
    ) -> std::result::Result<NonTsPseudoClass, cssparser::ParseError<'i, Self::Error>> {
        Err(location.new_custom_error(
            SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name),
        ))
    }

    fn parse_pseudo_element(
        &self,
        location: cssparser::SourceLocation,
        name: cssparser::CowRcStr<'i>,
    ) -> std::result::Result<PseudoElement, cssparser::ParseError<'i, Self::Error>> {
        Err(location.new_custom_error(
            SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name),
        ))
    }

    fn parse_non_ts_functional_pseudo_class<'t>(
        &self,
        name: cssparser::CowRcStr<'i>,
        parser: &mut CssParser<'i, 't>,
    ) -> std::result::Result<NonTsPseudoClass, cssparser::ParseError<'i, Self::Error>> {
        Err(parser.new_custom_error(SelectorParseErrorKind::UnsupportedPseudoClassOrElement(name)))
    }

    fn default_namespace(&self) -> Option<()> {
        None
    }

    fn namespace_for_prefix(&self, _prefix: &CssString) -> Option<()> {
        None
    }
}

// =============================================================================
// Selector implementation types
// =============================================================================

/// Owned string the parser stores identifiers and attribute values in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CssString(pub String);

impl CssString {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CssString {
    fn from(value: &str) -> Self {
        CssString(value.to_string())
    }
}

impl std::borrow::Borrow<str> for CssString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl ToCss for CssString {
    fn to_css<W>(&self, dest: &mut W) -> std::fmt::Result
    where
        W: std::fmt::Write,
    {
        cssparser::serialize_identifier(&self.0, dest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiSelectors;

impl selectors::SelectorImpl for UiSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssString;
    type Identifier = CssString;
    type LocalName = CssString;
    type NamespacePrefix = CssString;
    type NamespaceUrl = ();
    type BorrowedLocalName = str;
    type BorrowedNamespaceUrl = ();
    type NonTSPseudoClass = NonTsPseudoClass;
    type PseudoElement = PseudoElement;
}

/// No non tree-structural pseudo-class is supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonTsPseudoClass {}

impl selectors::parser::NonTSPseudoClass for NonTsPseudoClass {
    type Impl = UiSelectors;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl ToCss for NonTsPseudoClass {
    fn to_css<W>(&self, _dest: &mut W) -> std::fmt::Result
    where
        W: std::fmt::Write,
    {
        match *self {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = UiSelectors;
}

impl ToCss for PseudoElement {
    fn to_css<W>(&self, _dest: &mut W) -> std::fmt::Result
    where
        W: std::fmt::Write,
    {
        match *self {}
    }
}

// =============================================================================
// Element adapter
// =============================================================================

/// An element of a [`Document`] as seen by the selector engine.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl std::fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

impl<'a> ElementRef<'a> {
    pub fn new(doc: &'a Document, node: NodeId) -> Self {
        Self { doc, node }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    fn at(&self, node: NodeId) -> Self {
        Self::new(self.doc, node)
    }

    fn attribute(&self, name: &str) -> Option<&'a str> {
        self.doc.attribute(self.node, name)
    }

    fn siblings(&self) -> &'a [NodeId] {
        match self.doc.parent(self.node) {
            Some(parent) => self.doc.children(parent),
            None => &[],
        }
    }
}

fn eq_case(a: &str, b: &str, case: CaseSensitivity) -> bool {
    match case {
        CaseSensitivity::CaseSensitive => a == b,
        CaseSensitivity::AsciiCaseInsensitive => a.eq_ignore_ascii_case(b),
    }
}

fn attr_value_matches(
    actual: &str,
    operator: AttrSelectorOperator,
    expected: &str,
    case: CaseSensitivity,
) -> bool {
    let (actual, expected) = match case {
        CaseSensitivity::CaseSensitive => (actual.to_string(), expected.to_string()),
        CaseSensitivity::AsciiCaseInsensitive => {
            (actual.to_ascii_lowercase(), expected.to_ascii_lowercase())
        }
    };
    match operator {
        AttrSelectorOperator::Equal => actual == expected,
        AttrSelectorOperator::Includes => {
            actual.split_ascii_whitespace().any(|word| word == expected)
        }
        AttrSelectorOperator::DashMatch => {
            actual == expected || actual.starts_with(&format!("{expected}-"))
        }
        AttrSelectorOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrSelectorOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrSelectorOperator::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

impl selectors::Element for ElementRef<'_> {
    type Impl = UiSelectors;

    fn opaque(&self) -> OpaqueElement {
        // Identity must be stable across adapters for the nth-index cache
        match self.doc.node(self.node) {
            Some(node) => OpaqueElement::new(node),
            None => OpaqueElement::new(self.doc),
        }
    }

    fn parent_element(&self) -> Option<Self> {
        self.doc
            .parent(self.node)
            .filter(|&parent| self.doc.is_element(parent))
            .map(|parent| self.at(parent))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let siblings = self.siblings();
        let position = siblings.iter().position(|&s| s == self.node)?;
        siblings[..position]
            .iter()
            .rev()
            .find(|&&s| self.doc.is_element(s))
            .map(|&s| self.at(s))
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let siblings = self.siblings();
        let position = siblings.iter().position(|&s| s == self.node)?;
        siblings[position + 1..]
            .iter()
            .find(|&&s| self.doc.is_element(s))
            .map(|&s| self.at(s))
    }

    fn first_element_child(&self) -> Option<Self> {
        self.doc
            .children(self.node)
            .iter()
            .find(|&&child| self.doc.is_element(child))
            .map(|&child| self.at(child))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.doc.tag_name(self.node) == Some(local_name)
    }

    fn has_namespace(&self, _ns: &()) -> bool {
        true
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.doc.tag_name(self.node) == other.doc.tag_name(other.node)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&()>,
        local_name: &CssString,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        if !matches!(ns, NamespaceConstraint::Specific(())) {
            return false;
        }
        let Some(actual) = self.attribute(local_name.as_str()) else {
            return false;
        };
        match operation {
            AttrSelectorOperation::Exists => true,
            AttrSelectorOperation::WithValue {
                operator,
                case_sensitivity,
                value,
            } => attr_value_matches(actual, *operator, value.as_str(), *case_sensitivity),
        }
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &NonTsPseudoClass,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match *pc {}
    }

    fn match_pseudo_element(
        &self,
        pe: &PseudoElement,
        _context: &mut MatchingContext<Self::Impl>,
    ) -> bool {
        match *pe {}
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn is_link(&self) -> bool {
        matches!(self.doc.tag_name(self.node), Some("a" | "area"))
            && self.attribute("href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        self.doc.tag_name(self.node) == Some("slot")
    }

    fn has_id(&self, id: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.attribute("id")
            .is_some_and(|own| eq_case(own, id.as_str(), case_sensitivity))
    }

    fn has_class(&self, name: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.attribute("class").is_some_and(|classes| {
            classes
                .split_ascii_whitespace()
                .any(|class| eq_case(class, name.as_str(), case_sensitivity))
        })
    }

    fn imported_part(&self, _name: &CssString) -> Option<CssString> {
        None
    }

    fn is_part(&self, _name: &CssString) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.doc.children(self.node).iter().all(|&child| {
            !self.doc.is_element(child) && self.doc.text_content(child).is_empty()
        })
    }

    fn is_root(&self) -> bool {
        self.doc.parent(self.node) == Some(self.doc.root())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{apply_update, element, materialize, update};

    /// `<div class="bar"><span/><span class="on"/><span/></div><p class="bar"><span/></p>`
    fn fixture() -> (Document, NodeId, Vec<NodeId>, NodeId) {
        let mut doc = Document::new();
        let bar = doc.create_element("div");
        doc.set_attribute(bar, "class", "bar main").unwrap();
        doc.set_attribute(bar, "id", "hearts").unwrap();
        doc.append_child(doc.root(), bar).unwrap();
        let mut spans = Vec::new();
        for i in 0..3 {
            let span = doc.create_element("span");
            if i == 1 {
                doc.set_attribute(span, "class", "on").unwrap();
                doc.set_attribute(span, "data-slot", "1").unwrap();
            }
            doc.append_child(bar, span).unwrap();
            spans.push(span);
        }
        let p = doc.create_element("p");
        doc.set_attribute(p, "class", "bar").unwrap();
        doc.append_child(doc.root(), p).unwrap();
        let nested = doc.create_element("span");
        doc.append_child(p, nested).unwrap();
        (doc, bar, spans, nested)
    }

    #[test]
    fn test_class_and_tag() {
        let (doc, bar, spans, nested) = fixture();
        assert_eq!(doc.query_selector_all("div.bar").unwrap(), vec![bar]);
        assert_eq!(doc.query_selector_all("DIV.bar").unwrap(), vec![bar]);
        assert_eq!(doc.query_selector_all("#hearts").unwrap(), vec![bar]);
        assert_eq!(doc.query_selector_all(".on").unwrap(), vec![spans[1]]);

        let all_spans = doc.query_selector_all("span").unwrap();
        assert_eq!(all_spans, vec![spans[0], spans[1], spans[2], nested]);
    }

    #[test]
    fn test_combinators() {
        let (doc, _bar, spans, nested) = fixture();
        assert_eq!(doc.query_selector_all(".main > span").unwrap(), spans);
        assert_eq!(doc.query_selector_all("p span").unwrap(), vec![nested]);
        assert!(doc.query_selector_all("p > div").unwrap().is_empty());
        assert_eq!(doc.query_selector_all(".on + span").unwrap(), vec![spans[2]]);
        assert_eq!(
            doc.query_selector_all("span:first-child ~ span").unwrap(),
            vec![spans[1], spans[2]]
        );
    }

    #[test]
    fn test_nth_child() {
        let (doc, _bar, spans, nested) = fixture();
        assert_eq!(
            doc.query_selector_all(".bar span:nth-child(2)").unwrap(),
            vec![spans[1]]
        );
        assert_eq!(
            doc.query_selector_all(".main span:nth-child(odd)").unwrap(),
            vec![spans[0], spans[2]]
        );
        assert_eq!(
            doc.query_selector_all("span:first-child").unwrap(),
            vec![spans[0], nested]
        );
        assert_eq!(
            doc.query_selector_all(".main :last-child").unwrap(),
            vec![spans[2]]
        );
        assert_eq!(
            doc.query_selector_all(".main span:nth-child(-n+2)").unwrap(),
            vec![spans[0], spans[1]]
        );
    }

    #[test]
    fn test_attribute_selectors() {
        let (doc, _bar, spans, _nested) = fixture();
        assert_eq!(doc.query_selector_all("[data-slot]").unwrap(), vec![spans[1]]);
        assert_eq!(
            doc.query_selector_all("span[data-slot=\"1\"]").unwrap(),
            vec![spans[1]]
        );
        assert!(doc.query_selector_all("[data-slot=2]").unwrap().is_empty());
        assert_eq!(doc.query_selector_all("[class~=main]").unwrap().len(), 1);
        assert_eq!(doc.query_selector_all("[id$=arts]").unwrap().len(), 1);
    }

    #[test]
    fn test_negation_and_text_children() {
        let (mut doc, bar, spans, _nested) = fixture();
        let text = doc.create_text("x");
        doc.prepend_child(bar, text).unwrap();
        assert_eq!(
            doc.query_selector_all(".main > span:not(.on)").unwrap(),
            vec![spans[0], spans[2]]
        );
        // Text nodes never count as siblings
        assert_eq!(
            doc.query_selector_all(".main > span:first-child").unwrap(),
            vec![spans[0]]
        );
        assert!(doc.matches(spans[2], ":empty").unwrap());
        assert!(!doc.matches(bar, ":empty").unwrap());
    }

    #[test]
    fn test_selector_list_document_order() {
        let (doc, bar, spans, _nested) = fixture();
        assert_eq!(
            doc.query_selector_all(".on, div").unwrap(),
            vec![bar, spans[1]]
        );
    }

    #[test]
    fn test_invalid_selectors() {
        let (doc, ..) = fixture();
        for bad in ["", "div,", "..a", ":hover", "span::before", "span:nth-child(x)", "a >"] {
            let err = doc.query_selector_all(bad).unwrap_err();
            assert!(
                matches!(err, UiError::InvalidSelector { .. }),
                "expected invalid selector for {bad:?}"
            );
        }
    }

    #[test]
    fn test_standard_selectors_as_update_context() {
        let mut doc = Document::new();
        let menu = materialize(&mut doc, &element("div").children((0..3).map(|i| {
            let slot = element("button").attr("class", "slot");
            match i {
                0 => slot.attr("data-name", "hamburger"),
                1 => slot.attr("class", "slot used").attr("data-name", "fries"),
                _ => slot.attr("data-name", "egg"),
            }
        })))
        .unwrap();
        let root = doc.root();
        doc.append_child(root, menu).unwrap();
        let slots = doc.element_children(menu);

        let cases: [(&str, Vec<NodeId>); 5] = [
            (".slot:not(.used)", vec![slots[0], slots[2]]),
            (".slot + .slot", vec![slots[1], slots[2]]),
            (".slot ~ .slot", vec![slots[1], slots[2]]),
            ("[data-name^=\"ham\"]", vec![slots[0]]),
            (".slot:nth-of-type(2)", vec![slots[1]]),
        ];
        for (selector, expected) in cases {
            for &slot in &slots {
                doc.remove_attribute(slot, "data-hit").unwrap();
            }
            let count = apply_update(&mut doc, &update().attr("data-hit", true), selector).unwrap();
            assert_eq!(count, expected.len(), "{selector}");
            let hit: Vec<NodeId> = slots
                .iter()
                .copied()
                .filter(|&slot| doc.attribute(slot, "data-hit") == Some("true"))
                .collect();
            assert_eq!(hit, expected, "{selector}");
        }
    }
}
