//! Fakes shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tabinator::SummaryError;
use tabinator::core::{Tab, TabId};
use tabinator::external::{
    AutomationDriver, ClientTimings, ExternalSummaryClient, PageProbe, SubmitOutcome, SurfaceId,
};
use tabinator::pipeline::SummaryPipeline;
use tabinator::queue::RequestQueue;
use tabinator::tabs::{ContentExtractor, TabRegistry};

pub const GOOD_SUMMARY: &str = "The article explains how the queue keeps two sessions running.";

pub fn tab(id: i64, url: &str) -> Tab {
    Tab {
        id: TabId(id),
        url: url.to_string(),
        title: format!("Tab {id}"),
        fav_icon_url: None,
    }
}

#[derive(Default)]
pub struct FakeTabs {
    tabs: Mutex<Vec<Tab>>,
    /// Tab disappears once it has been looked up this many times.
    vanish_after: Mutex<HashMap<TabId, usize>>,
    lookups: Mutex<HashMap<TabId, usize>>,
}

impl FakeTabs {
    pub fn with(tabs: Vec<Tab>) -> Self {
        Self {
            tabs: Mutex::new(tabs),
            ..Self::default()
        }
    }

    pub fn vanish_after(&self, tab_id: TabId, lookups: usize) {
        self.vanish_after.lock().unwrap().insert(tab_id, lookups);
    }
}

#[async_trait]
impl TabRegistry for FakeTabs {
    async fn get(&self, tab_id: TabId) -> Result<Option<Tab>, SummaryError> {
        let seen = {
            let mut lookups = self.lookups.lock().unwrap();
            let count = lookups.entry(tab_id).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(limit) = self.vanish_after.lock().unwrap().get(&tab_id) {
            if seen > *limit {
                return Ok(None);
            }
        }
        Ok(self
            .tabs
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == tab_id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Tab>, SummaryError> {
        Ok(self.tabs.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct FakeExtractor {
    content: Mutex<HashMap<TabId, Option<String>>>,
    /// Every extraction fails like a page that refuses script injection.
    pub broken: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn with(content: Vec<(i64, Option<&str>)>) -> Self {
        Self {
            content: Mutex::new(
                content
                    .into_iter()
                    .map(|(id, text)| (TabId(id), text.map(str::to_string)))
                    .collect(),
            ),
            broken: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ContentExtractor for FakeExtractor {
    async fn extract(&self, tab_id: TabId, _url: &str) -> Result<Option<String>, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.load(Ordering::SeqCst) {
            return Err(SummaryError::Driver(
                "Cannot access contents of the page".to_string(),
            ));
        }
        Ok(self
            .content
            .lock()
            .unwrap()
            .get(&tab_id)
            .cloned()
            .flatten())
    }
}

/// Driver that plays back a fixed page state.
pub struct ScriptedDriver {
    pub probe: Mutex<PageProbe>,
    pub submit_outcome: Mutex<SubmitOutcome>,
    /// Played back one per `latest_response` call; `fallback_response` afterwards.
    pub responses: Mutex<VecDeque<Option<String>>>,
    pub fallback_response: Mutex<Option<String>>,
    pub hang_on_open: AtomicBool,
    pub hang_on_response: AtomicBool,
    pub hang_on_close: AtomicBool,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    pub fn replying(text: &str) -> Self {
        Self {
            probe: Mutex::new(PageProbe {
                input_ready: true,
                login_wall: false,
            }),
            submit_outcome: Mutex::new(SubmitOutcome::Sent),
            responses: Mutex::new(VecDeque::new()),
            fallback_response: Mutex::new(Some(text.to_string())),
            hang_on_open: AtomicBool::new(false),
            hang_on_response: AtomicBool::new(false),
            hang_on_close: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            max_live: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn login_wall() -> Self {
        let driver = Self::replying(GOOD_SUMMARY);
        *driver.probe.lock().unwrap() = PageProbe {
            input_ready: false,
            login_wall: true,
        };
        driver
    }

    pub fn no_input() -> Self {
        let driver = Self::replying(GOOD_SUMMARY);
        *driver.probe.lock().unwrap() = PageProbe::default();
        driver
    }

    pub fn silent() -> Self {
        let driver = Self::replying(GOOD_SUMMARY);
        *driver.fallback_response.lock().unwrap() = None;
        driver
    }

    pub fn hanging() -> Self {
        let driver = Self::replying(GOOD_SUMMARY);
        driver.hang_on_open.store(true, Ordering::SeqCst);
        driver
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn open_surface(&self, _url: &str) -> Result<SurfaceId, SummaryError> {
        if self.hang_on_open.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        Ok(SurfaceId(format!("surface-{n}")))
    }

    async fn probe(&self, _surface: &SurfaceId) -> Result<PageProbe, SummaryError> {
        Ok(*self.probe.lock().unwrap())
    }

    async fn submit(
        &self,
        _surface: &SurfaceId,
        prompt: &str,
    ) -> Result<SubmitOutcome, SummaryError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(*self.submit_outcome.lock().unwrap())
    }

    async fn latest_response(&self, _surface: &SurfaceId) -> Result<Option<String>, SummaryError> {
        if self.hang_on_response.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return Ok(next);
        }
        Ok(self.fallback_response.lock().unwrap().clone())
    }

    async fn close_surface(&self, _surface: &SurfaceId) -> Result<(), SummaryError> {
        if self.hang_on_close.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn client_for(driver: Arc<ScriptedDriver>) -> Arc<ExternalSummaryClient> {
    Arc::new(ExternalSummaryClient::with_timings(
        driver,
        "https://chatgpt.com",
        ClientTimings::default(),
    ))
}

pub struct Harness {
    pub tabs: Arc<FakeTabs>,
    pub extractor: Arc<FakeExtractor>,
    pub driver: Arc<ScriptedDriver>,
    pub pipeline: Arc<SummaryPipeline>,
}

pub fn harness(tabs: FakeTabs, extractor: FakeExtractor, driver: ScriptedDriver) -> Harness {
    let tabs = Arc::new(tabs);
    let extractor = Arc::new(extractor);
    let driver = Arc::new(driver);
    let pipeline = Arc::new(SummaryPipeline::new(
        tabs.clone(),
        extractor.clone(),
        client_for(driver.clone()),
        RequestQueue::new(),
    ));
    Harness {
        tabs,
        extractor,
        driver,
        pipeline,
    }
}
