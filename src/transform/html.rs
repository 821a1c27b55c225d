//! HTML cleaning: policy-driven rendering of parsed HTML into text.
//!
//! An article's DOM is walked once; each element is either kept verbatim,
//! kept with attributes stripped, replaced by start/end strings, or
//! dropped with its entire contents. The plain-text policy replaces
//! structural tags with sentinel words (`thisisah1tag`, ...) so sentence
//! segmentation cannot split inside a tag span, and the html annotation
//! step can recover the structure afterwards.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::Html;

use crate::utils::registered_domain;

/// Sentinel words used by the plain-text policy, paired with the tag each
/// one stands for. The link sentinel is suffixed with the link's domain.
pub const SENTINEL_TAGS: &[(&str, &str)] = &[
    ("thisisah1tag", "h1"),
    ("thisisah2tag", "h2"),
    ("thisisah3tag", "h3"),
    ("thisisah4tag", "h4"),
    ("thisisalinktag", "a"),
    ("thisisalistitemtag", "li"),
    ("thisisatablerowtag", "tr"),
];

/// Tags whose entire contents are dropped.
const DROP_WITH_CONTENTS: &[&str] = &["style", "script"];

/// How the rendering walk treats one element.
#[derive(Debug, Clone)]
enum TagAction {
    /// Keep the tag, attributes stripped.
    Keep,
    /// Keep the tag as a link, attributes reduced to a domain-only href.
    KeepLink,
    /// Replace the start/end tags with the given strings.
    Replace(String, String),
}

/// Rendering policy: per-tag actions plus the default for unlisted tags.
#[derive(Debug, Clone, Default)]
pub struct TagPolicy {
    actions: HashMap<&'static str, TagAction>,
    /// Appended for tags with no listed action (start and end alike).
    default_replacement: String,
    /// Append the link's registered domain to the `a` replacement string.
    include_link_domains: bool,
}

impl TagPolicy {
    /// Policy for `leave_some_html`: headers survive attribute-stripped,
    /// links survive with a domain-only href, `br`/`p` become breaks.
    pub fn limited_html() -> Self {
        let mut actions = HashMap::new();
        for tag in ["h1", "h2", "h3", "h4"] {
            actions.insert(tag, TagAction::Keep);
        }
        actions.insert("a", TagAction::KeepLink);
        actions.insert("br", TagAction::Replace(".\n".into(), ".\n".into()));
        actions.insert("p", TagAction::Replace("\n".into(), "\n".into()));
        Self {
            actions,
            default_replacement: String::new(),
            include_link_domains: false,
        }
    }

    /// Policy for `html_to_plain_text`: structural tags become sentinel
    /// words with sentence-terminating replacements, so downstream
    /// segmentation sees plain prose.
    pub fn limited_html_plain_text() -> Self {
        let mut actions = HashMap::new();
        actions.insert("br", TagAction::Replace(".\n".into(), ".\n".into()));
        actions.insert("h1", TagAction::Replace(" thisisah1tag ".into(), ". \n".into()));
        actions.insert("h2", TagAction::Replace(" thisisah2tag ".into(), ". \n".into()));
        actions.insert("h3", TagAction::Replace(" thisisah3tag ".into(), ". \n".into()));
        actions.insert("h4", TagAction::Replace(" thisisah4tag ".into(), ". \n".into()));
        actions.insert("a", TagAction::Replace(" thisisalinktag ".into(), " ".into()));
        actions.insert("li", TagAction::Replace("\n thisisalistitemtag ".into(), ". \n".into()));
        actions.insert("tr", TagAction::Replace("\n thisisatablerowtag ".into(), ". \n".into()));
        actions.insert("p", TagAction::Replace("\n".into(), ". \n".into()));
        actions.insert("div", TagAction::Replace(". \n".into(), ". \n".into()));
        Self {
            actions,
            default_replacement: String::new(),
            include_link_domains: true,
        }
    }

    /// Policy for full text extraction: no tags survive, block-level tags
    /// contribute sentence breaks.
    pub fn plain_text() -> Self {
        let mut actions = HashMap::new();
        actions.insert("br", TagAction::Replace(".\n".into(), ".\n".into()));
        for tag in ["h1", "h2", "h3", "h4", "p", "div"] {
            actions.insert(tag, TagAction::Replace("\n".into(), ". \n".into()));
        }
        Self {
            actions,
            default_replacement: String::new(),
            include_link_domains: false,
        }
    }
}

/// Render HTML to text under the given policy.
///
/// Comments, doctypes, and processing instructions are dropped, as are
/// `style`/`script` elements with their contents.
pub fn render(html: &str, policy: &TagPolicy) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    render_node(document.tree.root(), policy, &mut out);
    out
}

fn render_node(node: ego_tree::NodeRef<'_, Node>, policy: &TagPolicy, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&text.text),
        Node::Element(element) => {
            let name = element.name();
            if DROP_WITH_CONTENTS.contains(&name) {
                return;
            }
            match policy.actions.get(name) {
                Some(TagAction::Keep) => {
                    out.push('<');
                    out.push_str(name);
                    out.push('>');
                    render_children(node, policy, out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
                Some(TagAction::KeepLink) => {
                    let domain = link_domain(&element);
                    out.push_str("<a href=\"");
                    out.push_str(&domain);
                    out.push_str("\">");
                    render_children(node, policy, out);
                    out.push_str("</a>");
                }
                Some(TagAction::Replace(start, end)) => {
                    if name == "a" && policy.include_link_domains {
                        out.push_str(start.trim_end());
                        out.push_str(&link_domain(&element));
                        out.push(' ');
                    } else {
                        out.push_str(start);
                    }
                    render_children(node, policy, out);
                    out.push_str(end);
                }
                None => {
                    out.push_str(&policy.default_replacement);
                    render_children(node, policy, out);
                    out.push_str(&policy.default_replacement);
                }
            }
        }
        // Comments, doctypes, and processing instructions carry no text.
        _ => render_children(node, policy, out),
    }
}

fn render_children(
    node: ego_tree::NodeRef<'_, Node>,
    policy: &TagPolicy,
    out: &mut String,
) {
    for child in node.children() {
        render_node(child, policy, out);
    }
}

/// Registered domain of an element's href/src, or `NA` when the link is
/// a filepath or otherwise has no domain.
fn link_domain(element: &scraper::node::Element) -> String {
    element
        .attr("href")
        .or_else(|| element.attr("src"))
        .and_then(registered_domain)
        .unwrap_or_else(|| "NA".to_string())
}

// ---------------------------------------------------------------------------
// String cleanup helpers
// ---------------------------------------------------------------------------

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());
static BR_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<br/*>").unwrap());
static SPACE_NEWLINE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \n]{2,}").unwrap());
static PERIOD_SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.][. ]{2,}").unwrap());
static QUESTION_SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?][. ]{2,}").unwrap());
static BANG_SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[!][. ]{2,}").unwrap());
static PERIOD_BREAK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.][. \n]{2,}").unwrap());
static QUESTION_BREAK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?][. \n]{2,}").unwrap());
static BANG_BREAK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[!][. \n]{2,}").unwrap());

/// Replace every occurrence of the given characters.
pub fn replace_chars(text: &str, chars_to_replace: &[char], replacement: &str) -> String {
    let mut out = text.to_string();
    for c in chars_to_replace {
        out = out.replace(*c, replacement);
    }
    out
}

/// Newlines in raw HTML are not rendered; clear them before parsing so
/// they cannot masquerade as text breaks.
pub fn clear_non_rendered_newlines(text: &str) -> String {
    text.replace('\n', " ")
}

/// Collapse runs of punctuation and whitespace left behind by tag
/// replacement (`. . .` from nested blocks, `?.` from question headers).
pub fn normalize_punctuation_and_whitespace(text: &str) -> String {
    let text = text.replace("?.", "?");
    let text = MULTI_SPACE.replace_all(&text, " ");
    let text = PERIOD_SPACE_RUN.replace_all(&text, ". ");
    let text = QUESTION_SPACE_RUN.replace_all(&text, "? ");
    let text = BANG_SPACE_RUN.replace_all(&text, "! ");
    let text = PERIOD_BREAK_RUN.replace_all(&text, ". \n");
    let text = QUESTION_BREAK_RUN.replace_all(&text, "? \n");
    let text = BANG_BREAK_RUN.replace_all(&text, "! \n");

    // A document must not open with a stray period from a replaced tag.
    let mut text = text.trim_start().to_string();
    if text.starts_with('.') {
        text = text.replacen('.', "", 1).trim_start().to_string();
    }
    text
}

/// Collapse `<br>` tags and newline runs into single ` \n` breaks.
pub fn condense_line_breaks(text: &str) -> String {
    let text = MULTI_SPACE.replace_all(text, " ");
    let text = text.trim();
    let text = BR_TAG.replace_all(text, "\n");
    SPACE_NEWLINE_RUN.replace_all(&text, " \n").into_owned()
}

/// The shared tail of every cleaning policy: tabs and non-breaking
/// spaces to spaces, then punctuation/whitespace normalization, then
/// line-break condensing.
pub fn finalize_text(text: &str) -> String {
    let text = replace_chars(text, &['\t', '\u{a0}'], " ");
    let text = normalize_punctuation_and_whitespace(&text);
    condense_line_breaks(&text)
}
