#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use seedline_core::{Target, WorkItem};
use seedline_producer::{
    CapturingReporter, FetchError, FetchedResponse, Fetcher, InMemoryDedupRegistry, ItemExtractor,
    QueueEntry, SeedOutputChannel, SeedProducer,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// How the scripted fetcher answers for one target.
#[derive(Clone)]
pub enum Script {
    Ok,
    ControlledStop,
    RequestError,
    Unexpected,
    Panic,
    /// Succeeds after sleeping
    Slow(Duration),
}

/// Fetcher answering from a per-URL script, recording every call.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(target(url).as_str().to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.calls().into_iter().map(|(url, _)| url).collect()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        target: &Target,
        use_cache: bool,
    ) -> Result<FetchedResponse, FetchError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((target.as_str().to_string(), use_cache));

        match self.scripts.get(target.as_str()).cloned().unwrap_or(Script::Ok) {
            Script::Ok => Ok(response(target)),
            Script::ControlledStop => Err(FetchError::controlled_stop("scan must halt")),
            Script::RequestError => Err(FetchError::Request("connection refused".to_string())),
            Script::Unexpected => Err(FetchError::Unexpected(
                anyhow::anyhow!("socket exploded").context("while reading headers"),
            )),
            Script::Panic => panic!("fetcher bug"),
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(response(target))
            }
        }
    }
}

/// Extractor returning a fixed item list per target URL.
#[derive(Default)]
pub struct ScriptedExtractor {
    items: HashMap<String, Vec<WorkItem>>,
    panic_on: Option<String>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(mut self, target_url: &str, items: &[&str]) -> Self {
        self.items.insert(
            target(target_url).as_str().to_string(),
            items.iter().map(|url| item(url)).collect(),
        );
        self
    }

    pub fn panic_on(mut self, target_url: &str) -> Self {
        self.panic_on = Some(target(target_url).as_str().to_string());
        self
    }
}

impl ItemExtractor for ScriptedExtractor {
    fn extract(&self, response: &FetchedResponse) -> Vec<WorkItem> {
        if self.panic_on.as_deref() == Some(response.target.as_str()) {
            panic!("extractor bug");
        }
        self.items
            .get(response.target.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

pub fn target(url: &str) -> Target {
    Target::new(url).expect("valid test target")
}

pub fn item(url: &str) -> WorkItem {
    WorkItem::get(Url::parse(url).expect("valid test URL"))
}

pub fn response(target: &Target) -> FetchedResponse {
    FetchedResponse {
        target: target.clone(),
        url: target.url().clone(),
        status: 200,
        headers: vec![("content-type".to_string(), "text/html".to_string())],
        body: "<html></html>".to_string(),
        fetched_at: Utc::now(),
    }
}

/// A producer wired to scripted collaborators, plus handles to inspect them.
pub struct Harness {
    pub fetcher: Arc<ScriptedFetcher>,
    pub dedup: InMemoryDedupRegistry,
    pub reporter: Arc<CapturingReporter>,
    pub output: SeedOutputChannel,
    pub producer: SeedProducer,
}

pub fn harness(
    targets: &[&str],
    fetcher: ScriptedFetcher,
    extractor: ScriptedExtractor,
) -> Harness {
    let fetcher = Arc::new(fetcher);
    let dedup = InMemoryDedupRegistry::new();
    let reporter = Arc::new(CapturingReporter::new());
    let producer = SeedProducer::new(
        targets.iter().map(|url| target(url)).collect(),
        fetcher.clone(),
        Arc::new(extractor),
        Arc::new(dedup.clone()),
        reporter.clone(),
    );

    Harness {
        fetcher,
        dedup,
        reporter,
        output: producer.output().clone(),
        producer,
    }
}

/// Drain everything currently in the channel.
pub fn drain(channel: &SeedOutputChannel) -> Vec<QueueEntry> {
    std::iter::from_fn(|| channel.try_dequeue()).collect()
}

/// Item URLs of the drained entries, with `"<sentinel>"` for sentinels.
pub fn describe(entries: &[QueueEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry {
            QueueEntry::Item { item, .. } => item.url().to_string(),
            QueueEntry::Sentinel { .. } => "<sentinel>".to_string(),
        })
        .collect()
}
