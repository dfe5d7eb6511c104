use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::future::retry;
use reqwest::{Client, RequestBuilder, StatusCode};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use solstice_core::tool::{
    Error as ToolError, Outcome, Tool, ToolResult,
};

const USER_AGENT: &str = "Solstice Assistant (mailto:research@example.com)";

/// Sends one GET request with retry on transient failures.
///
/// Connection errors, timeouts, 429 and 5xx responses are retried under
/// an exponential backoff capped at 15 seconds; everything else fails
/// the call outright.
async fn send_with_retry<F>(
    make_request: F,
) -> Result<reqwest::Response, ToolError>
where
    F: Fn() -> RequestBuilder,
{
    let policy = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(15)),
        ..Default::default()
    };
    retry(policy, || async {
        let resp = make_request().send().await.map_err(|err| {
            let err = ToolError::execution_error()
                .with_reason(format!("request failed: {err}"));
            backoff::Error::transient(err)
        })?;

        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
        {
            return Err(backoff::Error::transient(
                ToolError::execution_error()
                    .with_reason(format!("API error: {status}")),
            ));
        }
        if !status.is_success() {
            return Err(backoff::Error::permanent(
                ToolError::execution_error()
                    .with_reason(format!("API error: {status}")),
            ));
        }
        Ok(resp)
    })
    .await
}

async fn get_json<T, F>(make_request: F) -> Result<T, ToolError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let resp = send_with_retry(make_request).await?;
    resp.json::<T>().await.map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("failed to parse response: {err}"))
    })
}

async fn get_text<F>(make_request: F) -> Result<String, ToolError>
where
    F: Fn() -> RequestBuilder,
{
    let resp = send_with_retry(make_request).await?;
    resp.text().await.map_err(|err| {
        ToolError::execution_error()
            .with_reason(format!("failed to read response: {err}"))
    })
}

/// Clamps a caller-supplied result count to a sane request size.
#[inline]
fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(5).clamp(1, 20)
}

// ----------------------------
// DuckDuckGo Instant Answer API
// ----------------------------

#[derive(Deserialize, JsonSchema)]
pub struct DdgParameters {
    #[schemars(
        description = "Query for instant answer (e.g., 'what is photosynthesis', 'define quantum')."
    )]
    query: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Answer", default)]
    answer: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractSource", default)]
    abstract_source: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "Definition", default)]
    definition: String,
    #[serde(rename = "DefinitionURL", default)]
    definition_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
}

/// A tool for quick fact lookup via the DuckDuckGo Instant Answer API.
pub struct DdgInstantAnswerTool {
    client: Client,
    parameter_schema: Value,
}

impl DdgInstantAnswerTool {
    /// Creates a new instant answer tool.
    #[inline]
    pub fn new() -> Self {
        DdgInstantAnswerTool {
            client: Client::new(),
            parameter_schema: schema_for!(DdgParameters).to_value(),
        }
    }
}

impl Default for DdgInstantAnswerTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DdgInstantAnswerTool {
    type Input = DdgParameters;

    fn name(&self) -> &str {
        "ddg_instant_answer"
    }

    fn description(&self) -> &str {
        "Get instant answers from DuckDuckGo for quick facts, \
         definitions, calculations, and summaries. Great for quick \
         information lookup."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: DdgParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let query = input.query.trim().to_owned();
            if query.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("query is required"));
            }

            let answer: InstantAnswer = get_json(|| {
                client
                    .get("https://api.duckduckgo.com/")
                    .query(&[
                        ("q", query.as_str()),
                        ("format", "json"),
                        ("no_html", "1"),
                        ("skip_disambig", "1"),
                    ])
                    .timeout(Duration::from_secs(10))
            })
            .await?;

            match format_instant_answer(&query, &answer) {
                Some(output) => Ok(Outcome::new(output)),
                None => Ok(Outcome::new(format!(
                    "No instant answer available for: {query}"
                ))),
            }
        }
    }
}

fn format_instant_answer(
    query: &str,
    answer: &InstantAnswer,
) -> Option<String> {
    let mut lines = vec![format!("DuckDuckGo Instant Answer for: {query}\n")];
    let mut has_content = false;

    if !answer.answer.is_empty() {
        lines.push(format!("Answer: {}", answer.answer));
        has_content = true;
    }
    if !answer.abstract_text.is_empty() {
        lines.push(format!("Summary: {}", answer.abstract_text));
        if !answer.abstract_source.is_empty() {
            lines.push(format!("Source: {}", answer.abstract_source));
        }
        if !answer.abstract_url.is_empty() {
            lines.push(format!("URL: {}", answer.abstract_url));
        }
        has_content = true;
    }
    if !answer.definition.is_empty() {
        lines.push(format!("Definition: {}", answer.definition));
        if !answer.definition_url.is_empty() {
            lines.push(format!("URL: {}", answer.definition_url));
        }
        has_content = true;
    }
    if !answer.related_topics.is_empty() {
        lines.push("\nRelated Topics:".to_owned());
        for topic in answer.related_topics.iter().take(5) {
            if topic.text.is_empty() {
                continue;
            }
            lines.push(format!("- {}", topic.text));
            if !topic.first_url.is_empty() {
                lines.push(format!("  {}", topic.first_url));
            }
        }
        has_content = true;
    }

    has_content.then(|| lines.join("\n"))
}

// --------------
// arXiv Atom API
// --------------

#[derive(Deserialize, JsonSchema)]
pub struct ArxivParameters {
    #[schemars(
        description = "Search query (e.g., 'machine learning', 'quantum computing')."
    )]
    query: String,
    #[schemars(
        description = "Maximum number of results to return (default: 5, max: 20)."
    )]
    max_results: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ArxivEntry {
    title: String,
    authors: String,
    summary: String,
    published: String,
    link: String,
    pdf: String,
}

/// A tool for searching research papers via the arXiv Atom API.
pub struct ArxivSearchTool {
    client: Client,
    parameter_schema: Value,
}

impl ArxivSearchTool {
    /// Creates a new arXiv search tool.
    #[inline]
    pub fn new() -> Self {
        ArxivSearchTool {
            client: Client::new(),
            parameter_schema: schema_for!(ArxivParameters).to_value(),
        }
    }
}

impl Default for ArxivSearchTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for ArxivSearchTool {
    type Input = ArxivParameters;

    fn name(&self) -> &str {
        "arxiv_search"
    }

    fn description(&self) -> &str {
        "Search arXiv for research papers. Returns paper titles, \
         authors, abstracts, and PDF links. Use this for academic \
         research and scientific papers."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ArxivParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let query = input.query.trim().to_owned();
            if query.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("query is required"));
            }
            let max_results = clamp_limit(input.max_results);

            let feed = get_text(|| {
                client
                    .get("http://export.arxiv.org/api/query")
                    .query(&[
                        ("search_query", format!("all:{query}")),
                        ("start", "0".to_owned()),
                        ("max_results", max_results.to_string()),
                    ])
                    .timeout(Duration::from_secs(15))
            })
            .await?;

            let entries = parse_atom_feed(&feed);
            if entries.is_empty() {
                return Ok(Outcome::new(format!(
                    "No results found on arXiv for: {query}"
                )));
            }
            Ok(Outcome::new(format_arxiv_entries(&query, &entries)))
        }
    }
}

/// Scans an Atom feed for `<entry>` blocks.
///
/// The feed shape is stable enough that a plain string scan beats a
/// full XML stack here; entries without a title are skipped.
fn parse_atom_feed(xml: &str) -> Vec<ArxivEntry> {
    let mut entries = Vec::new();
    for chunk in xml.split("<entry>").skip(1) {
        let Some(title) = tag_text(chunk, "title") else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        let authors = chunk
            .split("<author>")
            .skip(1)
            .filter_map(|part| tag_text(part, "name"))
            .collect::<Vec<_>>()
            .join(", ");
        entries.push(ArxivEntry {
            title,
            authors,
            summary: tag_text(chunk, "summary").unwrap_or_default(),
            published: tag_text(chunk, "published").unwrap_or_default(),
            link: link_href(chunk, "text/html").unwrap_or_default(),
            pdf: link_href(chunk, "application/pdf").unwrap_or_default(),
        });
    }
    entries
}

fn tag_text(chunk: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = chunk.find(&open)? + open.len();
    let end = chunk[start..].find(&close)? + start;
    Some(chunk[start..end].trim().replace('\n', " "))
}

fn link_href(chunk: &str, mime: &str) -> Option<String> {
    chunk.split("<link ").skip(1).find_map(|part| {
        if !part.contains(&format!(r#"type="{mime}""#)) {
            return None;
        }
        let start = part.find("href=\"")? + "href=\"".len();
        let end = part[start..].find('"')? + start;
        Some(part[start..end].to_owned())
    })
}

fn format_arxiv_entries(query: &str, entries: &[ArxivEntry]) -> String {
    let mut lines = vec![format!("arXiv Results for: {query}\n")];

    for (index, entry) in entries.iter().enumerate() {
        lines.push(format!("{}. {}", index + 1, entry.title));
        lines.push(format!("   Authors: {}", entry.authors));
        lines.push(format!("   Published: {}", entry.published));
        lines.push(format!("   Link: {}", entry.link));
        lines.push(format!("   PDF: {}", entry.pdf));
        if !entry.summary.is_empty() {
            lines.push(format!(
                "   Abstract: {}",
                truncate(&entry.summary, 300)
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Char-boundary-safe truncation with an ellipsis.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(limit - 3).collect();
    out.push_str("...");
    out
}

// ------------------
// Crossref works API
// ------------------

#[derive(Deserialize, JsonSchema)]
pub struct CrossrefParameters {
    #[schemars(
        description = "Search query or DOI (e.g., '10.1038/nature12373' or 'deep learning')."
    )]
    query: String,
    #[schemars(
        description = "Number of results to return (default: 5, max: 20)."
    )]
    rows: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct WorksList {
    #[serde(default)]
    message: WorksMessage,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct WorkEnvelope {
    #[serde(default)]
    message: Work,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Work {
    #[serde(rename = "DOI", default)]
    doi: String,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<Author>,
    #[serde(rename = "published-print", default)]
    published: PublishedDate,
    #[serde(rename = "URL", default)]
    url: String,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "is-referenced-by-count", default)]
    citations: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Author {
    #[serde(default)]
    given: String,
    #[serde(default)]
    family: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct PublishedDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<i64>>,
}

/// A tool for paper metadata and DOI lookup via the Crossref works API.
pub struct CrossrefSearchTool {
    client: Client,
    parameter_schema: Value,
}

impl CrossrefSearchTool {
    /// Creates a new Crossref search tool.
    #[inline]
    pub fn new() -> Self {
        CrossrefSearchTool {
            client: Client::new(),
            parameter_schema: schema_for!(CrossrefParameters).to_value(),
        }
    }
}

impl Default for CrossrefSearchTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for CrossrefSearchTool {
    type Input = CrossrefParameters;

    fn name(&self) -> &str {
        "crossref_search"
    }

    fn description(&self) -> &str {
        "Search Crossref for paper metadata, DOI lookup, and citation \
         information. Use this for published academic papers and journal \
         articles."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CrossrefParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let query = input.query.trim().to_owned();
            if query.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("query is required"));
            }
            let rows = clamp_limit(input.rows);

            // A query that looks like a DOI becomes a direct lookup.
            let items = if query.starts_with("10.") {
                let envelope: WorkEnvelope = get_json(|| {
                    client
                        .get(format!("https://api.crossref.org/works/{query}"))
                        .header("User-Agent", USER_AGENT)
                        .timeout(Duration::from_secs(15))
                })
                .await?;
                vec![envelope.message]
            } else {
                let list: WorksList = get_json(|| {
                    client
                        .get("https://api.crossref.org/works")
                        .header("User-Agent", USER_AGENT)
                        .query(&[
                            ("query", query.as_str()),
                            ("rows", &rows.to_string()),
                        ])
                        .timeout(Duration::from_secs(15))
                })
                .await?;
                list.message.items
            };

            if items.is_empty() {
                return Ok(Outcome::new(format!(
                    "No results found on Crossref for: {query}"
                )));
            }
            Ok(Outcome::new(format_works(&query, &items)))
        }
    }
}

fn format_works(query: &str, items: &[Work]) -> String {
    let mut lines = vec![format!("Crossref Results for: {query}\n")];

    for (index, item) in items.iter().enumerate() {
        let title = item
            .title
            .first()
            .map(String::as_str)
            .unwrap_or("Untitled");
        let authors = item
            .author
            .iter()
            .map(|author| format!("{} {}", author.given, author.family))
            .collect::<Vec<_>>()
            .join(", ");
        let authors = if authors.is_empty() {
            "Unknown".to_owned()
        } else {
            authors
        };
        let year = item
            .published
            .date_parts
            .first()
            .and_then(|parts| parts.first())
            .map(|year| year.to_string())
            .unwrap_or_else(|| "Unknown".to_owned());

        lines.push(format!("{}. {title}", index + 1));
        lines.push(format!("   Authors: {authors}"));
        if let Some(journal) = item.container_title.first() {
            lines.push(format!("   Journal: {journal}"));
        }
        lines.push(format!("   Year: {year}"));
        lines.push(format!("   DOI: {}", item.doi));
        if !item.url.is_empty() {
            lines.push(format!("   URL: {}", item.url));
        }
        if item.citations > 0 {
            lines.push(format!("   Citations: {}", item.citations));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
