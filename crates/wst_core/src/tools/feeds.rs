//! Channel feed checker.
//!
//! Reads a JSON list of feeds, fetches each one over HTTP and reports the
//! newest entry. This is the one tool whose per-item work is not a child
//! process, so it brings its own `Invoker`. A feed that cannot be fetched
//! or parsed becomes an `Error` outcome; the others are unaffected.
//!
//! Feed list format:
//!
//! ```json
//! [
//!   "https://example.org/atom.xml",
//!   { "id": "some channel", "params": { "channel_id": "UC..." } },
//!   { "id": "blog", "params": { "url": "https://blog.example/feed" } }
//! ]
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset};
use reqwest::blocking::Client;
use thiserror::Error;

use super::BatchTool;
use crate::process::{InvokeOptions, Invoker, Outcome, Status};
use crate::report::{render_line, Report};
use crate::runner::Workload;
use crate::work::{WorkItem, WorkListBuilder, WorkListResult};

const CHANNEL_FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

/// Errors fetching or reading one feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("not an Atom or RSS document (root element <{0}>)")]
    NotAFeed(String),

    #[error("no feed URL for {0}")]
    NoUrl(String),
}

/// The newest entry of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    /// Timestamp exactly as the feed wrote it.
    pub updated: String,
    pub link: Option<String>,
}

impl FeedEntry {
    /// `updated` as an RFC 3339 instant; `None` when it does not parse.
    pub fn updated_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.updated).ok()
    }
}

/// URL to fetch for an item: `url` param, `channel_id` param, or the id.
pub fn feed_url(item: &WorkItem) -> Result<String, FeedError> {
    if let Some(url) = item.param("url") {
        return Ok(url.to_string());
    }
    if let Some(channel) = item.param("channel_id") {
        return Ok(format!("{}{}", CHANNEL_FEED_URL, channel));
    }
    if item.id().starts_with("http://") || item.id().starts_with("https://") {
        return Ok(item.id().to_string());
    }
    Err(FeedError::NoUrl(item.id().to_string()))
}

/// Newest entry of an Atom feed, or the first item of an RSS channel.
pub fn latest_entry(xml: &str) -> Result<Option<FeedEntry>, FeedError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "feed" => Ok(root
            .children()
            .filter(|n| n.has_tag_name_local("entry"))
            .map(|entry| FeedEntry {
                title: child_text(entry, "title"),
                updated: {
                    let updated = child_text(entry, "updated");
                    if updated.is_empty() {
                        child_text(entry, "published")
                    } else {
                        updated
                    }
                },
                link: entry
                    .children()
                    .find(|n| n.has_tag_name_local("link"))
                    .and_then(|n| n.attribute("href"))
                    .map(str::to_string),
            })
            .max_by(|a, b| {
                a.updated_at()
                    .cmp(&b.updated_at())
                    .then_with(|| a.updated.cmp(&b.updated))
            })),
        "rss" => Ok(root
            .children()
            .find(|n| n.has_tag_name_local("channel"))
            .and_then(|channel| channel.children().find(|n| n.has_tag_name_local("item")))
            .map(|item| FeedEntry {
                title: child_text(item, "title"),
                updated: child_text(item, "pubDate"),
                link: Some(child_text(item, "link")).filter(|l| !l.is_empty()),
            })),
        other => Err(FeedError::NotAFeed(other.to_string())),
    }
}

trait LocalName {
    fn has_tag_name_local(&self, name: &str) -> bool;
}

impl LocalName for roxmltree::Node<'_, '_> {
    fn has_tag_name_local(&self, name: &str) -> bool {
        self.is_element() && self.tag_name().name() == name
    }
}

fn child_text(node: roxmltree::Node<'_, '_>, name: &str) -> String {
    node.children()
        .find(|n| n.has_tag_name_local(name))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Fetches one feed per item.
pub struct FeedInvoker {
    client: Client,
    dry_run: bool,
}

impl FeedInvoker {
    fn fetch(&self, url: &str) -> Result<Option<FeedEntry>, FeedError> {
        tracing::debug!("GET {}", url);
        let body = self.client.get(url).send()?.error_for_status()?.text()?;
        latest_entry(&body)
    }
}

impl Invoker for FeedInvoker {
    fn invoke(&self, item: WorkItem) -> Outcome {
        let started = Instant::now();

        let url = match feed_url(&item) {
            Ok(url) => url,
            Err(e) => return Outcome::new(item, Status::Error(e.to_string())),
        };
        let commands = vec![format!("GET {}", url)];

        if self.dry_run {
            return Outcome::new(item, Status::DryRun).with_commands(commands);
        }

        let status = match self.fetch(&url) {
            Ok(Some(entry)) => Status::Captured {
                code: 0,
                stdout: format!("{}  {}", entry.updated, entry.title),
            },
            Ok(None) => Status::Captured {
                code: 0,
                stdout: String::new(),
            },
            Err(e) => {
                tracing::warn!("{}: {}", item, e);
                Status::Error(e.to_string())
            }
        };

        Outcome::new(item, status)
            .with_commands(commands)
            .with_elapsed(started.elapsed())
    }
}

/// `wst feeds`
pub struct Feeds {
    list_file: PathBuf,
    client: Client,
}

impl Feeds {
    pub fn new(list_file: PathBuf, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("wst/{}", crate::version()))
            .build()?;
        Ok(Self { list_file, client })
    }
}

impl BatchTool for Feeds {
    fn name(&self) -> &'static str {
        "feeds"
    }

    fn required_programs(&self) -> &[&'static str] {
        &[]
    }

    fn workload(&self) -> Workload {
        Workload::Io
    }

    fn capture_stdout(&self) -> bool {
        true
    }

    fn work_list(&self) -> WorkListResult<Vec<WorkItem>> {
        WorkListBuilder::from_json_file(&self.list_file)
    }

    fn invoker<'a>(&'a self, options: InvokeOptions) -> Box<dyn Invoker + 'a> {
        Box::new(FeedInvoker {
            client: self.client.clone(),
            dry_run: options.dry_run,
        })
    }

    fn arrange(&self, report: &mut Report) {
        report.sort_by_key(|o| o.item().id().to_string());
    }

    fn render(&self, outcome: &Outcome) -> Option<String> {
        match outcome.status() {
            Status::Captured { code: 0, stdout } if stdout.is_empty() => {
                Some(format!("{}: no entries", outcome.item()))
            }
            Status::Captured { code: 0, stdout } => Some(format!("{}: {}", outcome.item(), stdout)),
            _ => Some(render_line(outcome)),
        }
    }
}
