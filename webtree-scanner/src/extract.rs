use scraper::{ElementRef, Html, Selector};

/// Shorter cleaned text than this is not worth keeping.
const MIN_CONTENT_CHARS: usize = 50;

const UNWANTED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "embed",
    "nav", "header", "footer", "aside", "form",
    "button", "input", "select", "textarea",
];

// Matched as substrings of the lower-cased class or id attribute.
const UNWANTED_PATTERNS: &[&str] = &[
    "nav", "menu", "sidebar", "footer", "header",
    "advertisement", "ad-", "social", "share",
    "comment", "related", "recommended",
    "cookie", "banner", "popup", "modal",
];

const MAIN_TERMS: &[&str] = &["content", "main", "article", "body", "post"];

/// Title from `<title>`, description from the meta description tag or,
/// when that tag is absent, from `og:description`.
pub fn extract_metadata(document: &Html) -> (Option<String>, Option<String>) {
    let title_selector = Selector::parse("title").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().map(str::trim).collect::<String>());

    let description_selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    let og_selector = Selector::parse(r#"meta[property="og:description"]"#).unwrap();
    let description = document
        .select(&description_selector)
        .next()
        .or_else(|| document.select(&og_selector).next())
        .map(|meta| meta.value().attr("content").unwrap_or("").trim().to_string());

    (
        title.filter(|t| !t.is_empty()),
        description.filter(|d| !d.is_empty()),
    )
}

/// Cleaned main text of a page, or `None` when less than 50 characters remain.
///
/// Boilerplate elements (scripts, navigation, forms, anything whose class or id
/// looks like a menu, ad, cookie banner...) are pruned together with their
/// subtrees. The first surviving `<main>`, `<article>` or content-like `<div>`
/// is used, falling back to `<body>` and then the whole document.
pub fn extract_content(document: &Html) -> Option<String> {
    let main = find_unpruned(document, "main", |_| true)
        .or_else(|| find_unpruned(document, "article", |_| true))
        .or_else(|| find_unpruned(document, "div", |el| attr_has_main_term(el, "class")))
        .or_else(|| find_unpruned(document, "div", |el| attr_has_main_term(el, "id")))
        .or_else(|| find_unpruned(document, "body", |_| true));

    let mut pieces = Vec::new();
    collect_text(main.unwrap_or_else(|| document.root_element()), &mut pieces);

    let text = pieces.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() < MIN_CONTENT_CHARS {
        return None;
    }
    Some(text)
}

fn find_unpruned<'a>(
    document: &'a Html,
    tag: &str,
    accept: impl Fn(ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .find(|el| !is_pruned(*el) && accept(*el))
}

fn attr_has_main_term(element: ElementRef<'_>, attr: &str) -> bool {
    element
        .value()
        .attr(attr)
        .map(str::to_lowercase)
        .is_some_and(|value| MAIN_TERMS.iter().any(|term| value.contains(term)))
}

fn is_boilerplate(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if UNWANTED_TAGS.contains(&value.name()) {
        return true;
    }
    ["class", "id"].iter().any(|attr| {
        value
            .attr(attr)
            .map(str::to_lowercase)
            .is_some_and(|v| UNWANTED_PATTERNS.iter().any(|p| v.contains(p)))
    })
}

/// The element or one of its ancestors is boilerplate.
fn is_pruned(element: ElementRef<'_>) -> bool {
    is_boilerplate(element) || element.ancestors().filter_map(ElementRef::wrap).any(is_boilerplate)
}

fn collect_text<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    if is_boilerplate(element) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed);
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }
}
