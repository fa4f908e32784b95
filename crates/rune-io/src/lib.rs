//! Document retrieval for the extractor: local files and guarded HTTP(S) fetches.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum IoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document location `{0}`")]
    InvalidLocation(String),

    #[error("blocked: unsupported scheme `{0}`")]
    UnsupportedScheme(String),

    #[error("blocked: origin `{0}` not allowed")]
    OriginNotAllowed(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

pub type Result<T> = std::result::Result<T, IoError>;

/// Where a document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Url(Url),
}

impl DocumentSource {
    /// Reads `http://`, `https://` and `file://` locations as URLs, anything without a
    /// scheme as a path. Other schemes are rejected.
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(IoError::InvalidLocation(location.to_string()));
        }
        match Url::parse(location) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Url(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::File)
                    .map_err(|_| IoError::InvalidLocation(location.to_string())),
                // Single-letter schemes are Windows drive letters.
                scheme if scheme.len() == 1 => Ok(Self::File(PathBuf::from(location))),
                scheme => Err(IoError::UnsupportedScheme(scheme.to_string())),
            },
            Err(_) => Ok(Self::File(PathBuf::from(location))),
        }
    }

    /// Resolves a link found in this document, such as a stylesheet `href`.
    pub fn resolve_link(&self, href: &str) -> Result<DocumentSource> {
        let href = href.trim();
        if let Ok(url) = Url::parse(href) {
            return match url.scheme() {
                "http" | "https" => Ok(Self::Url(url)),
                _ => Self::parse(href),
            };
        }
        match self {
            Self::File(path) => {
                let relative = href.split(['?', '#']).next().unwrap_or(href);
                let base = path.parent().unwrap_or_else(|| Path::new(""));
                Ok(Self::File(base.join(relative)))
            }
            Self::Url(base) => base
                .join(href)
                .map(Self::Url)
                .map_err(|_| IoError::InvalidLocation(href.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Origins as `scheme://host:port`. Empty allows every origin.
    pub allowed_origins: HashSet<String>,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            allowed_origins: HashSet::new(),
            user_agent: format!("rune-shapes/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchOptions {
    pub fn with_allowed_origins<I: IntoIterator<Item = String>>(mut self, origins: I) -> Self {
        self.allowed_origins = origins.into_iter().map(|o| normalize_origin(&o)).collect();
        self
    }

    fn permits(&self, url: &Url) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.contains(&origin_of(url))
    }
}

/// `scheme://host:port`, with the scheme's default port filled in.
pub fn origin_of(url: &Url) -> String {
    match url.port_or_known_default() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}

fn normalize_origin(origin: &str) -> String {
    match Url::parse(origin.trim()) {
        Ok(url) => origin_of(&url),
        Err(_) => origin.trim().to_string(),
    }
}

/// Reads the document at `source` as text.
pub fn load_document(source: &DocumentSource, options: &FetchOptions) -> Result<String> {
    match source {
        DocumentSource::File(path) => {
            debug!(path = %path.display(), "reading document");
            std::fs::read_to_string(path).map_err(|source| IoError::Read {
                path: path.clone(),
                source,
            })
        }
        DocumentSource::Url(url) => fetch(url, options),
    }
}

fn fetch(url: &Url, options: &FetchOptions) -> Result<String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(IoError::UnsupportedScheme(url.scheme().to_string()));
    }
    if !options.permits(url) {
        warn!(url = %url, "fetch blocked by origin allowlist");
        return Err(IoError::OriginNotAllowed(origin_of(url)));
    }

    let http_err = |source| IoError::Http {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .user_agent(options.user_agent.as_str())
        .timeout(options.timeout)
        .build()
        .map_err(http_err)?;

    debug!(url = %url, timeout_ms = options.timeout.as_millis() as u64, "fetching document");
    let response = client.get(url.clone()).send().map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(IoError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().map_err(http_err)
}

/// Loads every linked stylesheet, skipping the ones that fail with a warning.
pub fn load_stylesheets(
    document: &DocumentSource,
    hrefs: &[String],
    options: &FetchOptions,
) -> Vec<String> {
    hrefs
        .iter()
        .filter_map(|href| {
            let loaded = document
                .resolve_link(href)
                .and_then(|source| load_document(&source, options));
            match loaded {
                Ok(css) => Some(css),
                Err(err) => {
                    warn!(href = %href, error = %err, "skipping stylesheet");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_urls() {
        assert_eq!(
            DocumentSource::parse("out/index.html").unwrap(),
            DocumentSource::File(PathBuf::from("out/index.html"))
        );
        assert!(matches!(
            DocumentSource::parse("https://example.com/app").unwrap(),
            DocumentSource::Url(_)
        ));
        assert!(matches!(
            DocumentSource::parse("ftp://example.com/a.html"),
            Err(IoError::UnsupportedScheme(s)) if s == "ftp"
        ));
        assert!(DocumentSource::parse("  ").is_err());
    }

    #[test]
    fn resolves_links_relative_to_the_document() {
        let file = DocumentSource::File(PathBuf::from("out/index.html"));
        assert_eq!(
            file.resolve_link("generated-styles.css?v=2").unwrap(),
            DocumentSource::File(PathBuf::from("out/generated-styles.css"))
        );

        let page = DocumentSource::parse("https://example.com/app/index.html").unwrap();
        assert_eq!(
            page.resolve_link("../css/site.css").unwrap().to_string(),
            "https://example.com/css/site.css"
        );
        assert_eq!(
            file.resolve_link("https://cdn.example.com/a.css")
                .unwrap()
                .to_string(),
            "https://cdn.example.com/a.css"
        );
    }

    #[test]
    fn origin_allowlist_blocks_before_any_request() {
        let options = FetchOptions::default()
            .with_allowed_origins(["https://example.com".to_string()]);
        let allowed = Url::parse("https://example.com/index.html").unwrap();
        let other = Url::parse("https://other.test/index.html").unwrap();
        assert!(options.permits(&allowed));
        assert!(matches!(
            load_document(&DocumentSource::Url(other), &options),
            Err(IoError::OriginNotAllowed(origin)) if origin == "https://other.test:443"
        ));
    }

    #[test]
    fn reads_local_documents_and_stylesheets() {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.html");
        std::fs::write(&index, "<body><p>hi</p></body>").unwrap();
        std::fs::write(dir.path().join("a.css"), "p { height: 10px; }").unwrap();

        let source = DocumentSource::File(index);
        let options = FetchOptions::default();
        assert_eq!(
            load_document(&source, &options).unwrap(),
            "<body><p>hi</p></body>"
        );
        let sheets = load_stylesheets(
            &source,
            &["a.css".to_string(), "missing.css".to_string()],
            &options,
        );
        assert_eq!(sheets, vec!["p { height: 10px; }".to_string()]);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let source = DocumentSource::File(PathBuf::from("/nonexistent/rune/index.html"));
        assert!(matches!(
            load_document(&source, &FetchOptions::default()),
            Err(IoError::Read { .. })
        ));
    }
}
