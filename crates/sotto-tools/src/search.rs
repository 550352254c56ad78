//! Web search with a four-provider fallback chain.
//!
//! Order: Serper (Google SERP) -> Tavily -> Brave -> DuckDuckGo HTML.  The
//! first three need API keys and may carry structured side channels (answer
//! box, knowledge graph, infobox) that are rendered as prefix lines before
//! the numbered result list; DuckDuckGo needs no key and always exists as
//! the last resort.  Each attempt is bounded by the configured per-provider
//! timeout, and a provider only "succeeds" when it yields at least one
//! formatted row.

use serde_json::Value;
use tracing::{debug, info, warn};

/// Maximum number of organic results per provider.
const MAX_RESULTS: usize = 8;

/// Maximum snippet length in characters.
const SNIPPET_MAX_LEN: usize = 500;

/// Default per-provider timeout in seconds.
const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

const SERPER_URL: &str = "https://google.serper.dev/search";
const TAVILY_URL: &str = "https://api.tavily.com/search";
const BRAVE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Realistic browser User-Agent so the DuckDuckGo HTML endpoint answers.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Search client holding the provider keys and a shared HTTP client.
pub struct SearchClient {
    http: reqwest::Client,
    serper_api_key: Option<String>,
    tavily_api_key: Option<String>,
    brave_api_key: Option<String>,
}

impl SearchClient {
    /// Create a client with explicit keys (`None` disables that provider).
    pub fn new(
        serper_api_key: Option<String>,
        tavily_api_key: Option<String>,
        brave_api_key: Option<String>,
        timeout_secs: f64,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(std::time::Duration::from_secs_f64(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            serper_api_key: serper_api_key.filter(|k| !k.is_empty()),
            tavily_api_key: tavily_api_key.filter(|k| !k.is_empty()),
            brave_api_key: brave_api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Create a client configured from the environment
    /// (`SERPER_API_KEY`, `TAVILY_API_KEY`, `BRAVE_API_KEY`, `SEARCH_TIMEOUT`).
    pub fn from_env() -> Self {
        let timeout = std::env::var("SEARCH_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(
            std::env::var("SERPER_API_KEY").ok(),
            std::env::var("TAVILY_API_KEY").ok(),
            std::env::var("BRAVE_API_KEY").ok(),
            timeout,
        )
    }

    /// Run the fallback chain for a query.
    ///
    /// Returns the formatted result block of the first provider that yields
    /// anything, or `None` when every provider came up empty.
    pub async fn search(&self, query: &str) -> Option<String> {
        if let Some(key) = &self.serper_api_key {
            match self.search_serper(query, key).await {
                Ok(Some(text)) => return Some(text),
                Ok(None) => debug!(query, "serper returned no results, falling back"),
                Err(e) => warn!(error = %e, "serper search failed, falling back"),
            }
        }

        if let Some(key) = &self.tavily_api_key {
            match self.search_tavily(query, key).await {
                Ok(Some(text)) => return Some(text),
                Ok(None) => debug!(query, "tavily returned no results, falling back"),
                Err(e) => warn!(error = %e, "tavily search failed, falling back"),
            }
        }

        if let Some(key) = &self.brave_api_key {
            match self.search_brave(query, key).await {
                Ok(Some(text)) => return Some(text),
                Ok(None) => debug!(query, "brave returned no results, falling back"),
                Err(e) => warn!(error = %e, "brave search failed, falling back"),
            }
        }

        match self.search_duckduckgo(query).await {
            Ok(Some(text)) => Some(text),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "duckduckgo search failed");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Serper (Google SERP)
    // -----------------------------------------------------------------------

    async fn search_serper(&self, query: &str, api_key: &str) -> reqwest::Result<Option<String>> {
        let resp = self
            .http
            .post(SERPER_URL)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({"q": query, "num": MAX_RESULTS}))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = resp.json().await?;
        let formatted = format_serper_response(query, &body);
        if formatted.is_some() {
            info!(query, engine = "serper", "search completed");
        }
        Ok(formatted)
    }

    // -----------------------------------------------------------------------
    // Tavily
    // -----------------------------------------------------------------------

    async fn search_tavily(&self, query: &str, api_key: &str) -> reqwest::Result<Option<String>> {
        let resp = self
            .http
            .post(TAVILY_URL)
            .header("X-API-Key", api_key)
            .json(&serde_json::json!({
                "query": query,
                "max_results": MAX_RESULTS,
                "include_answer": true,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: Value = resp.json().await?;
        let formatted = format_tavily_response(query, &body);
        if formatted.is_some() {
            info!(query, engine = "tavily", "search completed");
        }
        Ok(formatted)
    }

    // -----------------------------------------------------------------------
    // Brave
    // -----------------------------------------------------------------------

    async fn search_brave(&self, query: &str, api_key: &str) -> reqwest::Result<Option<String>> {
        let resp = self
            .http
            .get(BRAVE_URL)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &MAX_RESULTS.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let body: Value = resp.json().await?;
        let formatted = format_brave_response(query, &body);
        if formatted.is_some() {
            info!(query, engine = "brave", "search completed");
        }
        Ok(formatted)
    }

    // -----------------------------------------------------------------------
    // DuckDuckGo HTML
    // -----------------------------------------------------------------------

    async fn search_duckduckgo(&self, query: &str) -> reqwest::Result<Option<String>> {
        // POST with form data is more reliable than GET for DDG.
        let resp = self
            .http
            .post(DUCKDUCKGO_HTML_URL)
            .form(&[("q", query), ("kl", ""), ("df", "")])
            .send()
            .await?
            .error_for_status()?;

        let html = resp.text().await?;
        let rows = parse_duckduckgo_rows(&html, MAX_RESULTS);
        if rows.is_empty() {
            return Ok(None);
        }
        info!(query, engine = "duckduckgo", count = rows.len(), "search completed");
        Ok(Some(format_rows(query, &[], &rows)))
    }
}

// ---------------------------------------------------------------------------
// Result formatting
// ---------------------------------------------------------------------------

/// One organic search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRow {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Render the standard result block:
///
/// ```text
/// Web search results for 'query':
/// <prefix lines from structured side channels>
/// 1. Title (url)
///    Snippet text...
/// ```
fn format_rows(query: &str, prefix_lines: &[String], rows: &[SearchRow]) -> String {
    let mut lines = vec![format!("Web search results for '{query}':")];
    lines.extend_from_slice(prefix_lines);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("{}. {} ({})", i + 1, row.title, row.url));
        if !row.snippet.is_empty() {
            lines.push(format!("   {}", row.snippet));
        }
    }
    lines.join("\n")
}

/// Format a Serper response: answer box and knowledge graph become prefix
/// lines before the organic rows.  Returns `None` when nothing usable came
/// back.
pub fn format_serper_response(query: &str, body: &Value) -> Option<String> {
    let mut prefix: Vec<String> = Vec::new();

    let answer_box = &body["answerBox"];
    if answer_box.is_object() {
        if let Some(title) = answer_box["title"].as_str().filter(|s| !s.is_empty()) {
            prefix.push(format!("Featured: {title}"));
        }
        if let Some(answer) = answer_box["answer"].as_str().filter(|s| !s.is_empty()) {
            prefix.push(format!("  {answer}"));
        }
        let snippet = strip_html_tags(answer_box["snippet"].as_str().unwrap_or(""));
        if !snippet.is_empty() {
            prefix.push(format!("  {}", truncate_chars(&snippet, SNIPPET_MAX_LEN)));
        }
        if let Some(items) = answer_box["list"].as_array() {
            for item in items.iter().take(10) {
                let text = item.as_str().map(str::to_owned).unwrap_or_else(|| item.to_string());
                prefix.push(format!("  - {}", strip_html_tags(&text)));
            }
        }
    }

    let kg = &body["knowledgeGraph"];
    if kg.is_object() {
        if let Some(title) = kg["title"].as_str().filter(|s| !s.is_empty()) {
            match kg["type"].as_str().filter(|s| !s.is_empty()) {
                Some(kind) => prefix.push(format!("Knowledge Graph: {title} ({kind})")),
                None => prefix.push(format!("Knowledge Graph: {title}")),
            }
        }
        let desc = strip_html_tags(kg["description"].as_str().unwrap_or(""));
        if !desc.is_empty() {
            prefix.push(format!("  {}", truncate_chars(&desc, SNIPPET_MAX_LEN)));
        }
        if let Some(attrs) = kg["attributes"].as_object() {
            for (key, val) in attrs {
                let rendered = val
                    .as_str()
                    .map(str::to_owned)
                    .unwrap_or_else(|| val.to_string());
                prefix.push(format!("  {key}: {rendered}"));
            }
        }
    }

    let rows: Vec<SearchRow> = body["organic"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(MAX_RESULTS)
                .map(|r| SearchRow {
                    title: strip_html_tags(r["title"].as_str().unwrap_or("No title")),
                    url: r["link"].as_str().unwrap_or("").to_owned(),
                    snippet: truncate_chars(
                        &strip_html_tags(r["snippet"].as_str().unwrap_or("")),
                        SNIPPET_MAX_LEN,
                    ),
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() && prefix.is_empty() {
        return None;
    }
    Some(format_rows(query, &prefix, &rows))
}

/// Format a Tavily response: the direct answer (when present) leads.
pub fn format_tavily_response(query: &str, body: &Value) -> Option<String> {
    let mut prefix: Vec<String> = Vec::new();
    if let Some(answer) = body["answer"].as_str().filter(|s| !s.is_empty()) {
        prefix.push(format!("Direct answer: {answer}"));
        prefix.push(String::new());
    }

    let rows: Vec<SearchRow> = body["results"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(MAX_RESULTS)
                .map(|r| SearchRow {
                    title: strip_html_tags(r["title"].as_str().unwrap_or("No title")),
                    url: r["url"].as_str().unwrap_or("").to_owned(),
                    snippet: truncate_chars(
                        &strip_html_tags(r["content"].as_str().unwrap_or("")),
                        SNIPPET_MAX_LEN,
                    ),
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() && prefix.is_empty() {
        return None;
    }
    Some(format_rows(query, &prefix, &rows))
}

/// Format a Brave response: the infobox (structured facts) leads.
pub fn format_brave_response(query: &str, body: &Value) -> Option<String> {
    let mut prefix: Vec<String> = Vec::new();

    let infobox = &body["infobox"];
    if infobox.is_object() {
        if let Some(title) = infobox["title"].as_str().filter(|s| !s.is_empty()) {
            prefix.push(format!("Infobox: {title}"));
        }
        let desc = strip_html_tags(infobox["description"].as_str().unwrap_or(""));
        if !desc.is_empty() {
            prefix.push(format!("  {}", truncate_chars(&desc, SNIPPET_MAX_LEN)));
        }
        if let Some(facts) = infobox["facts"].as_array() {
            for fact in facts.iter().take(8) {
                prefix.push(format!(
                    "  {}: {}",
                    fact["label"].as_str().unwrap_or_default(),
                    strip_html_tags(fact["value"].as_str().unwrap_or_default()),
                ));
            }
        }
    }

    let rows: Vec<SearchRow> = body
        .pointer("/web/results")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .take(MAX_RESULTS)
                .map(|r| SearchRow {
                    title: strip_html_tags(r["title"].as_str().unwrap_or("No title")),
                    url: r["url"].as_str().unwrap_or("").to_owned(),
                    snippet: truncate_chars(
                        &strip_html_tags(r["description"].as_str().unwrap_or("")),
                        SNIPPET_MAX_LEN,
                    ),
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() && prefix.is_empty() {
        return None;
    }
    Some(format_rows(query, &prefix, &rows))
}

// ---------------------------------------------------------------------------
// DuckDuckGo HTML parsing
// ---------------------------------------------------------------------------

/// Scrape result rows out of the DuckDuckGo HTML page.
pub fn parse_duckduckgo_rows(html: &str, max_results: usize) -> Vec<SearchRow> {
    let title_marker = "class=\"result__a\"";
    let snippet_marker = "class=\"result__snippet\"";

    let title_positions = marker_positions(html, title_marker);
    let snippet_positions = marker_positions(html, snippet_marker);

    let mut rows = Vec::new();
    for (i, &title_pos) in title_positions.iter().enumerate() {
        if rows.len() >= max_results {
            break;
        }

        let url = extract_href_before(&html[..title_pos]).unwrap_or_default();
        let title = extract_tag_text(&html[title_pos + title_marker.len()..], "</a>");

        let snippet = snippet_positions
            .get(i)
            .map(|&pos| {
                let raw = extract_tag_text(&html[pos + snippet_marker.len()..], "</");
                strip_html_tags(&raw).trim().to_owned()
            })
            .unwrap_or_default();

        let clean_url = clean_ddg_url(&url);
        if !title.is_empty() || !clean_url.is_empty() {
            rows.push(SearchRow {
                title: strip_html_tags(&title),
                url: clean_url,
                snippet: truncate_chars(&snippet, SNIPPET_MAX_LEN),
            });
        }
    }

    rows
}

/// All byte offsets of `marker` within `html`.
fn marker_positions(html: &str, marker: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(pos) = html[from..].find(marker) {
        positions.push(from + pos);
        from += pos + marker.len();
    }
    positions
}

/// The last `href="..."` value before the marker position.
fn extract_href_before(html_before: &str) -> Option<String> {
    let marker = "href=\"";
    let start = html_before.rfind(marker)? + marker.len();
    let rest = &html_before[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_owned())
}

/// The text between the tag's closing `>` and `end_marker`.
fn extract_tag_text(html_after_marker: &str, end_marker: &str) -> String {
    let Some(closing) = html_after_marker.find('>') else {
        return String::new();
    };
    let content = &html_after_marker[closing + 1..];
    let end = content.find(end_marker).unwrap_or(content.len());
    content[..end].to_owned()
}

/// DuckDuckGo wraps destinations in a redirect URL; unwrap it.
fn clean_ddg_url(url: &str) -> String {
    if url.contains("duckduckgo.com/l/") {
        if let Some(start) = url.find("uddg=") {
            let encoded = &url[start + 5..];
            let encoded = encoded.split('&').next().unwrap_or(encoded);
            return url_decode(encoded);
        }
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{rest}");
    }
    url.to_owned()
}

/// Minimal percent-decoding for the redirect unwrapping above.
fn url_decode(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => {
                let hex: String = chars.by_ref().take(2).collect();
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                } else {
                    result.push('%');
                    result.push_str(&hex);
                }
            }
            '+' => result.push(' '),
            _ => result.push(ch),
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Strip HTML tags and decode common entities.
pub fn strip_html_tags(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut inside_tag = false;

    for ch in input.chars() {
        match ch {
            '<' => inside_tag = true,
            '>' => inside_tag = false,
            _ if !inside_tag => result.push(ch),
            _ => {}
        }
    }

    result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

/// Cap a string at `max` characters (not bytes, so multibyte text is safe).
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        s.chars().take(max).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serper_renders_answer_box_and_knowledge_graph() {
        let body = json!({
            "answerBox": {"title": "S&P 500", "answer": "6,412.31"},
            "knowledgeGraph": {
                "title": "NVIDIA", "type": "Company",
                "description": "American technology company",
                "attributes": {"CEO": "Jensen Huang"}
            },
            "organic": [
                {"title": "Market <b>today</b>", "link": "https://example.com",
                 "snippet": "Stocks rose."}
            ]
        });

        let text = format_serper_response("s&p 500 today", &body).unwrap();
        assert!(text.starts_with("Web search results for 's&p 500 today':"));
        assert!(text.contains("Featured: S&P 500"));
        assert!(text.contains("  6,412.31"));
        assert!(text.contains("Knowledge Graph: NVIDIA (Company)"));
        assert!(text.contains("  CEO: Jensen Huang"));
        assert!(text.contains("1. Market today (https://example.com)"));
        assert!(text.contains("   Stocks rose."));
    }

    #[test]
    fn serper_empty_body_is_none() {
        assert!(format_serper_response("q", &json!({})).is_none());
        assert!(format_serper_response("q", &json!({"organic": []})).is_none());
    }

    #[test]
    fn serper_answer_box_alone_succeeds() {
        let body = json!({"answerBox": {"answer": "42"}});
        let text = format_serper_response("meaning of life", &body).unwrap();
        assert!(text.contains("  42"));
    }

    #[test]
    fn tavily_direct_answer_leads() {
        let body = json!({
            "answer": "Water boils at 100 C at sea level.",
            "results": [
                {"title": "Boiling point", "url": "https://a.com", "content": "Details."}
            ]
        });
        let text = format_tavily_response("boiling point", &body).unwrap();
        let first_lines: Vec<&str> = text.lines().take(2).collect();
        assert_eq!(first_lines[1], "Direct answer: Water boils at 100 C at sea level.");
        assert!(text.contains("1. Boiling point (https://a.com)"));
    }

    #[test]
    fn brave_infobox_facts_render_before_rows() {
        let body = json!({
            "infobox": {
                "title": "Apple Inc.",
                "description": "Technology company",
                "facts": [{"label": "Market cap", "value": "$4.1T"}]
            },
            "web": {"results": [
                {"title": "Apple", "url": "https://apple.com", "description": "Official site"}
            ]}
        });
        let text = format_brave_response("apple market cap", &body).unwrap();
        assert!(text.contains("Infobox: Apple Inc."));
        assert!(text.contains("  Market cap: $4.1T"));
        assert!(text.contains("1. Apple (https://apple.com)"));
    }

    #[test]
    fn ddg_rows_extract_title_url_snippet() {
        let html = r#"
        <div class="result">
            <a rel="nofollow" href="https://example.com" class="result__a">Example Title</a>
            <span class="result__snippet">A snippet about Example.</span>
        </div>
        <div class="result">
            <a rel="nofollow" href="https://other.com" class="result__a">Other Result</a>
            <span class="result__snippet">Another snippet.</span>
        </div>
        "#;

        let rows = parse_duckduckgo_rows(html, 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Example Title");
        assert_eq!(rows[0].url, "https://example.com");
        assert_eq!(rows[0].snippet, "A snippet about Example.");

        let text = format_rows("example", &[], &rows);
        assert!(text.contains("2. Other Result (https://other.com)"));
    }

    #[test]
    fn ddg_respects_max_results() {
        let html = r#"
        <a href="https://a.com" class="result__a">A</a>
        <a href="https://b.com" class="result__a">B</a>
        <a href="https://c.com" class="result__a">C</a>
        "#;
        assert_eq!(parse_duckduckgo_rows(html, 2).len(), 2);
    }

    #[test]
    fn ddg_redirect_urls_are_unwrapped() {
        assert_eq!(
            clean_ddg_url("//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc"),
            "https://example.com/page"
        );
        assert_eq!(clean_ddg_url("//example.com/p"), "https://example.com/p");
        assert_eq!(clean_ddg_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn strip_html_tags_handles_tags_and_entities() {
        assert_eq!(strip_html_tags("<b>hello</b> world"), "hello world");
        assert_eq!(strip_html_tags("a &amp; b"), "a & b");
        assert_eq!(strip_html_tags("&quot;quoted&quot;"), "\"quoted\"");
        assert_eq!(strip_html_tags(""), "");
    }

    #[test]
    fn truncate_chars_is_multibyte_safe() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn chain_skips_providers_without_keys() {
        let client = SearchClient::new(None, None, None, 5.0);
        assert!(client.serper_api_key.is_none());
        assert!(client.tavily_api_key.is_none());
        assert!(client.brave_api_key.is_none());

        let client = SearchClient::new(Some(String::new()), Some("tk".into()), None, 5.0);
        assert!(client.serper_api_key.is_none(), "empty key disables provider");
        assert_eq!(client.tavily_api_key.as_deref(), Some("tk"));
    }
}
