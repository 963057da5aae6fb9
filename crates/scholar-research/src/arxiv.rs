//! arXiv export API client
//!
//! Queries `export.arxiv.org` and parses the Atom feed it returns. Only the
//! fields the store persists are extracted.

use quick_xml::Reader;
use quick_xml::events::Event;

/// One paper from a search result
#[derive(Debug, Clone, PartialEq)]
pub struct ArxivPaper {
    /// Short id, e.g. `2301.00001v1`
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub pdf_url: String,
    /// Publication date, `YYYY-MM-DD`
    pub published: String,
}

/// arXiv client errors
#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("arXiv returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("Feed parse error: {0}")]
    Feed(String),
}

const EXPORT_URL: &str = "http://export.arxiv.org/api/query";

/// Thin client over the arXiv export API
#[derive(Debug, Clone)]
pub struct ArxivClient {
    base_url: String,
}

impl ArxivClient {
    pub fn new() -> Self {
        Self {
            base_url: EXPORT_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Search for papers relevant to a query, most relevant first
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<ArxivPaper>, ArxivError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let response = client
            .get(&self.base_url)
            .query(&[
                ("search_query", format!("all:{}", query)),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ArxivError::Status(response.status()));
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Text fields captured while walking an entry
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    id_url: String,
    title: String,
    authors: Vec<String>,
    summary: String,
    pdf_url: String,
    published: String,
}

impl EntryBuilder {
    fn finish(self) -> ArxivPaper {
        let id = self
            .id_url
            .rsplit('/')
            .next()
            .unwrap_or(&self.id_url)
            .to_string();

        // Not every entry declares a pdf link; the abs URL maps onto one
        let pdf_url = if self.pdf_url.is_empty() {
            self.id_url.replace("/abs/", "/pdf/")
        } else {
            self.pdf_url
        };

        let published = chrono::DateTime::parse_from_rfc3339(&self.published)
            .map(|d| d.date_naive().to_string())
            .unwrap_or_else(|_| self.published.chars().take(10).collect());

        ArxivPaper {
            id,
            title: normalize_whitespace(&self.title),
            authors: self.authors,
            summary: normalize_whitespace(&self.summary),
            pdf_url,
            published,
        }
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an arXiv Atom feed into papers
pub(crate) fn parse_feed(xml: &str) -> Result<Vec<ArxivPaper>, ArxivError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;
    let mut in_author = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    entry = Some(EntryBuilder::default());
                    field = None;
                }
                b"author" if entry.is_some() => in_author = true,
                b"name" if in_author => field = Some(Field::AuthorName),
                b"id" if entry.is_some() && !in_author => field = Some(Field::Id),
                b"title" if entry.is_some() && !in_author => field = Some(Field::Title),
                b"summary" if entry.is_some() && !in_author => field = Some(Field::Summary),
                b"published" if entry.is_some() && !in_author => field = Some(Field::Published),
                b"link" => {
                    if let Some(builder) = entry.as_mut() {
                        capture_pdf_link(&e, builder)?;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link"
                    && let Some(builder) = entry.as_mut()
                {
                    capture_pdf_link(&e, builder)?;
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(builder), Some(current)) = (entry.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| ArxivError::Feed(e.to_string()))?
                        .into_owned();
                    match current {
                        Field::Id => builder.id_url.push_str(&text),
                        Field::Title => builder.title.push_str(&text),
                        Field::Summary => builder.summary.push_str(&text),
                        Field::Published => builder.published.push_str(&text),
                        Field::AuthorName => builder.authors.push(text),
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(builder) = entry.take() {
                        papers.push(builder.finish());
                    }
                    field = None;
                }
                b"author" => {
                    in_author = false;
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ArxivError::Feed(e.to_string())),
        }
    }

    Ok(papers)
}

fn capture_pdf_link(
    e: &quick_xml::events::BytesStart<'_>,
    builder: &mut EntryBuilder,
) -> Result<(), ArxivError> {
    let mut href = None;
    let mut is_pdf = false;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ArxivError::Feed(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ArxivError::Feed(e.to_string()))?
            .into_owned();

        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"title" if value == "pdf" => is_pdf = true,
            _ => {}
        }
    }

    if is_pdf && let Some(href) = href {
        builder.pdf_url = href;
    }

    Ok(())
}
