use crate::error::{Result, ScanError};
use crate::tree::{DEFAULT_RELATIONSHIP, LinkContext};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Characters of page text kept on each side of an anchor.
const CONTEXT_CHARS: usize = 100;

/// Minimum context left once the anchor text is removed from it.
const MIN_CONTEXT_CHARS: usize = 20;

const NAVIGATIONAL_TERMS: &[&str] = &[
    "home", "homepage", "main page", "back", "top", "menu", "navigation",
    "login", "log in", "sign in", "sign up", "register", "subscribe",
    "share", "tweet", "facebook", "email", "print", "download",
    "click here", "read more", "more", "see more", "learn more",
    "here", "this", "next", "previous", "prev", "continue",
    "help", "about", "about us", "contact", "privacy", "terms",
    "comments", "discussion", "talk", "forum",
    "pdf", "xml", "rss", "atom", "feed",
];

const SKIP_URL_PATTERNS: &[&str] = &[
    "login", "signin", "signup", "register", "subscribe",
    "special:", "talk:", "user:", "action=edit", "action=history",
];

/// Relationship categories, tested in this order; the first hit wins.
const RELATIONSHIPS: &[(&str, &[&str])] = &[
    (
        "origins/locations",
        &[
            "country", "region", "origin", "from", "grown in", "produced in",
            "colombian", "brazilian", "ethiopian", "kenyan", "yunnan", "sumatra",
            "africa", "asia", "america", "continent", "colombia", "brazil",
            "ethiopia", "kenya", "yemen", "vietnam", "indonesia", "java",
        ],
    ),
    (
        "types/varieties",
        &[
            "type", "variety", "species", "kind", "form", "class", "category",
            "arabica", "robusta", "liberica", "typica", "bourbon",
            "different", "various", "several",
        ],
    ),
    (
        "processes/methods",
        &[
            "process", "method", "technique", "how to", "way", "procedure",
            "roasting", "brewing", "grinding", "ferment", "dry", "wet",
            "preparation", "making", "processing", "production",
        ],
    ),
    (
        "products/drinks",
        &[
            "drink", "beverage", "product", "serve", "espresso", "cappuccino",
            "latte", "americano", "macchiato", "mocha", "frappe",
        ],
    ),
    (
        "components/ingredients",
        &[
            "contains", "ingredient", "chemical", "compound", "element",
            "caffeine", "acid", "oil", "antioxidant", "flavor", "aroma",
            "composition", "molecule",
        ],
    ),
    (
        "history/timeline",
        &[
            "history", "origin", "ancient", "traditional", "first", "discover",
            "century", "year", "era", "period", "historical", "originally",
            "began", "started",
        ],
    ),
    (
        "people/organizations",
        &[
            "company", "brand", "founder", "person", "grower", "farmer",
            "organization", "association", "expert", "barista",
        ],
    ),
    (
        "health/effects",
        &[
            "health", "benefit", "effect", "impact", "risk", "study",
            "research", "disease", "medical", "nutrition",
        ],
    ),
    (
        "culture/economics",
        &[
            "culture", "social", "ritual", "ceremony", "tradition",
            "economy", "trade", "market", "price", "industry", "business",
        ],
    ),
    (
        "equipment/tools",
        &[
            "machine", "equipment", "tool", "grinder", "maker", "pot",
            "filter", "press", "device",
        ],
    ),
];

/// Tag a link with a relationship category from its anchor and context text.
pub fn classify(anchor_text: &str, surrounding_text: &str) -> &'static str {
    let combined = format!(
        "{} {}",
        anchor_text.to_lowercase(),
        surrounding_text.to_lowercase()
    );

    RELATIONSHIPS
        .iter()
        .find(|(_, indicators)| indicators.iter().any(|ind| combined.contains(ind)))
        .map(|(name, _)| *name)
        .unwrap_or(DEFAULT_RELATIONSHIP)
}

/// Drop the fragment; strings that do not parse are returned unchanged.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Host (plus explicit port) of a URL, or an empty string.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            let host = u.host_str()?.to_string();
            Some(match u.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host,
            })
        })
        .unwrap_or_default()
}

fn bare_domain(domain: &str) -> String {
    domain.trim().to_lowercase().replace("www.", "")
}

/// Which domains links may point at.
#[derive(Debug, Clone, Default)]
pub enum DomainFilter {
    #[default]
    AllowAll,
    TopDomains(HashSet<String>),
}

impl DomainFilter {
    pub fn top_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DomainFilter::TopDomains(domains.into_iter().map(|d| bare_domain(d.as_ref())).collect())
    }

    /// Load the first `top_n` rows of the `Root Domain` column of a CSV file.
    pub fn from_csv(path: &Path, top_n: usize) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut lines = content.lines();

        let header = lines
            .next()
            .ok_or_else(|| ScanError::DomainList(format!("{} is empty", path.display())))?;
        let column = split_csv_line(header)
            .iter()
            .position(|h| h == "Root Domain")
            .ok_or_else(|| {
                ScanError::DomainList(format!("{} has no 'Root Domain' column", path.display()))
            })?;

        let domains: HashSet<String> = lines
            .filter(|line| !line.trim().is_empty())
            .take(top_n)
            .filter_map(|line| split_csv_line(line).into_iter().nth(column))
            .map(|d| bare_domain(&d))
            .filter(|d| !d.is_empty())
            .collect();

        info!("Loaded {} top domains from {}", domains.len(), path.display());
        Ok(DomainFilter::TopDomains(domains))
    }

    pub fn allows(&self, url: &str) -> bool {
        match self {
            DomainFilter::AllowAll => true,
            DomainFilter::TopDomains(domains) => Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(bare_domain))
                .is_some_and(|host| domains.contains(&host)),
        }
    }
}

/// Split one CSV record. Commas inside double quotes stay in the field and
/// `""` inside quotes is a literal quote.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Pulls classified, filtered outgoing links from a parsed page.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    filter_meaningful: bool,
    domains: DomainFilter,
}

impl LinkExtractor {
    pub fn new() -> Self {
        Self {
            filter_meaningful: true,
            domains: DomainFilter::AllowAll,
        }
    }

    pub fn with_filter_meaningful(mut self, filter: bool) -> Self {
        self.filter_meaningful = filter;
        self
    }

    pub fn with_domain_filter(mut self, domains: DomainFilter) -> Self {
        self.domains = domains;
        self
    }

    pub fn extract_links(&self, document: &Html, base_url: &str) -> Vec<LinkContext> {
        let Ok(base) = Url::parse(base_url) else {
            debug!("Cannot resolve links against invalid base URL {}", base_url);
            return Vec::new();
        };
        let normalized_base = normalize_url(base_url);

        let link_selector = Selector::parse("a[href]").unwrap();
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&link_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(mut resolved) = base.join(href) else {
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            resolved.set_fragment(None);
            let url = resolved.to_string();

            if url == normalized_base || !self.domains.allows(&url) || seen.contains(&url) {
                continue;
            }

            let anchor_text = stripped_text(element);
            let surrounding_text = context_around(element, &anchor_text);
            let relationship = classify(&anchor_text, &surrounding_text);
            let link = LinkContext::new(url, anchor_text, surrounding_text, relationship);

            if !self.filter_meaningful || is_meaningful(&link) {
                seen.insert(link.url.clone());
                links.push(link);
            }
        }

        debug!("Extracted {} links from {}", links.len(), base_url);
        links
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Text nodes trimmed and concatenated without separators.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn context_around(link: ElementRef<'_>, anchor_text: &str) -> String {
    let Some(parent) = link.parent().and_then(ElementRef::wrap) else {
        return String::new();
    };
    let text = stripped_text(parent);

    match text.find(anchor_text) {
        Some(byte_idx) => {
            let idx = text[..byte_idx].chars().count();
            let start = idx.saturating_sub(CONTEXT_CHARS);
            let end = idx + anchor_text.chars().count() + CONTEXT_CHARS;
            text.chars().skip(start).take(end - start).collect()
        }
        None => text.chars().take(CONTEXT_CHARS * 2).collect(),
    }
}

/// Rejects navigational boilerplate links.
pub fn is_meaningful(link: &LinkContext) -> bool {
    let anchor = link.anchor_text.to_lowercase();
    let context = link.surrounding_text.to_lowercase();
    let url = link.url.to_lowercase();
    let anchor_chars = anchor.chars().count();

    if anchor_chars < 2 {
        return false;
    }
    if NAVIGATIONAL_TERMS.contains(&anchor.as_str()) {
        return false;
    }
    if anchor.chars().all(char::is_numeric) {
        return false;
    }
    if anchor.starts_with('[') && anchor.ends_with(']') {
        return false;
    }
    if SKIP_URL_PATTERNS.iter().any(|p| url.contains(p)) {
        return false;
    }
    if !context.is_empty() {
        let remainder = context.replace(&anchor, "");
        if remainder.trim().chars().count() < MIN_CONTEXT_CHARS {
            return false;
        }
    }

    let word_count = anchor.split_whitespace().count();
    if word_count == 1 && anchor_chars <= 4 {
        return false;
    }
    word_count <= 8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASE: &str = "https://example.com/coffee";

    fn links_of(html: &str, extractor: &LinkExtractor) -> Vec<LinkContext> {
        extractor.extract_links(&Html::parse_document(html), BASE)
    }

    #[test]
    fn test_classify_first_match_wins() {
        // "origin" appears in both origins/locations and history/timeline
        assert_eq!(classify("Coffee origin", ""), "origins/locations");
        assert_eq!(classify("Espresso", "a strong shot"), "products/drinks");
        assert_eq!(classify("Grinder reviews", ""), "equipment/tools");
        assert_eq!(classify("Zzz", "qqq"), DEFAULT_RELATIONSHIP);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let first = classify("The History of Espresso", "invented in the 19th century");
        for _ in 0..10 {
            assert_eq!(classify("The History of Espresso", "invented in the 19th century"), first);
        }
    }

    #[test]
    fn test_normalize_url_strips_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page#section"),
            "https://example.com/page"
        );
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.example.com/a"), "www.example.com");
        assert_eq!(extract_domain("http://localhost:8080/"), "localhost:8080");
        assert_eq!(extract_domain("nonsense"), "");
    }

    #[test]
    fn test_domain_filter_strips_www_and_port() {
        let filter = DomainFilter::top_domains(["www.wikipedia.org"]);
        assert!(filter.allows("https://wikipedia.org/wiki/Coffee"));
        assert!(filter.allows("https://www.wikipedia.org:443/wiki/Tea"));
        assert!(!filter.allows("https://example.com/"));
        assert!(DomainFilter::AllowAll.allows("https://anything.test/"));
    }

    #[test]
    fn test_domain_filter_from_csv() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Rank,Root Domain,Linking Root Domains")?;
        writeln!(file, "1,www.google.com,100")?;
        writeln!(file, "2,\"wikipedia.org\",90")?;
        writeln!(file, "3,example.com,80")?;

        let filter = DomainFilter::from_csv(file.path(), 2)?;
        assert!(filter.allows("https://google.com/"));
        // subdomains are not folded into their parent domain
        assert!(!filter.allows("https://en.wikipedia.org/"));
        assert!(filter.allows("https://wikipedia.org/wiki/Coffee"));
        assert!(!filter.allows("https://example.com/"));
        Ok(())
    }

    #[test]
    fn test_domain_filter_reads_quoted_fields() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "\"Rank\",\"Title, short\",\"Root Domain\",\"Linking Root Domains\"")?;
        writeln!(file, "1,\"Google, Inc.\",google.com,\"1,000\"")?;
        writeln!(file, "2,\"The \"\"Free\"\" Encyclopedia\",wikipedia.org,900")?;

        let filter = DomainFilter::from_csv(file.path(), 10)?;
        assert!(filter.allows("https://google.com/"));
        assert!(filter.allows("https://wikipedia.org/wiki/Tea"));
        assert!(!filter.allows("https://inc.test/"));
        Ok(())
    }

    #[test]
    fn test_split_csv_line_handles_quotes() {
        assert_eq!(split_csv_line("a, \"b,c\" ,d"), ["a", "b,c", "d"]);
        assert_eq!(split_csv_line("\"say \"\"hi\"\"\",x"), ["say \"hi\"", "x"]);
        assert_eq!(split_csv_line(""), [""]);
    }

    #[test]
    fn test_domain_filter_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Rank,Domain").unwrap();
        assert!(matches!(
            DomainFilter::from_csv(file.path(), 10),
            Err(ScanError::DomainList(_))
        ));
    }

    #[test]
    fn test_extracts_absolute_links_with_context() {
        let html = r#"<html><body>
            <p>Many farmers in the highlands grow beans. <a href="/coffee/ethiopia#top">Ethiopian coffee farms</a> produce some of the most celebrated lots in the world.</p>
        </body></html>"#;
        let links = links_of(html, &LinkExtractor::new());
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.url, "https://example.com/coffee/ethiopia");
        assert_eq!(link.anchor_text, "Ethiopian coffee farms");
        assert!(link.surrounding_text.contains("Ethiopian coffee farms"));
        assert_eq!(link.relationship, "origins/locations");
    }

    #[test]
    fn test_drops_self_links_non_http_and_duplicates() {
        let html = r#"<html><body><p>
            Long enough surrounding text for every link in this paragraph here.
            <a href="https://example.com/coffee#intro">Coffee overview page</a>
            <a href="mailto:someone@example.com">Write to the editors</a>
            <a href="javascript:void(0)">Toggle the sidebar now</a>
            <a href="/brewing">Brewing methods guide</a>
            <a href="/brewing#again">Brewing methods guide</a>
        </p></body></html>"#;
        let links = links_of(html, &LinkExtractor::new());
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/brewing"]);
    }

    #[test]
    fn test_filters_navigational_anchors() {
        let html = r#"<html><body><p>
            This paragraph provides plenty of context for the anchors inside it.
            <a href="/">Home</a>
            <a href="/login">Account access portal</a>
            <a href="/7">7</a>
            <a href="/edit">[edit]</a>
            <a href="/tea">Tea</a>
            <a href="/long">one two three four five six seven eight nine</a>
            <a href="/roasting">Roasting profiles explained</a>
        </p></body></html>"#;
        let links = links_of(html, &LinkExtractor::new());
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/roasting"]);

        let unfiltered = links_of(html, &LinkExtractor::new().with_filter_meaningful(false));
        assert_eq!(unfiltered.len(), 7);
    }

    #[test]
    fn test_rejects_links_without_context() {
        let html = r#"<html><body><div><a href="/lonely">A lonely link anchor</a></div></body></html>"#;
        assert!(links_of(html, &LinkExtractor::new()).is_empty());
    }

    #[test]
    fn test_domain_filter_applies_to_links() {
        let html = r#"<html><body><p>
            Plenty of context around these links so they survive filtering rules.
            <a href="https://wikipedia.org/wiki/Coffee">Coffee on Wikipedia</a>
            <a href="https://random.test/coffee">Coffee elsewhere online</a>
        </p></body></html>"#;
        let extractor =
            LinkExtractor::new().with_domain_filter(DomainFilter::top_domains(["wikipedia.org"]));
        let links = links_of(html, &extractor);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://wikipedia.org/wiki/Coffee");
    }

    #[test]
    fn test_is_meaningful_context_threshold() {
        let short = LinkContext::new("https://e.com/x", "Coffee culture", "Coffee culture here", "x");
        assert!(!is_meaningful(&short));
        let long = LinkContext::new(
            "https://e.com/x",
            "Coffee culture",
            "Read about Coffee culture across many countries",
            "x",
        );
        assert!(is_meaningful(&long));
    }
}
