// Headless Chromium driver for browser checks
use crate::application::verification_service::{BrowserDriver, BrowserStep, PageSnapshot, VerificationPlan};
use crate::infrastructure::config::BrowserSettings;
use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventLoadingFailed, EventRequestWillBeSent};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

pub struct ChromiumDriver {
    settings: BrowserSettings,
}

impl ChromiumDriver {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn launch_config(&self) -> anyhow::Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.settings.window_width, self.settings.window_height);
        if !self.settings.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(anyhow::Error::msg)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn run(&self, plan: &VerificationPlan) -> anyhow::Result<PageSnapshot> {
        let (mut browser, mut handler) = Browser::launch(self.launch_config()?)
            .await
            .context("Failed to launch Chromium")?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = run_on_new_page(&browser, plan).await;

        if let Err(e) = browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        let _ = browser.wait().await;
        events.abort();
        result
    }
}

/// Console messages and failed requests seen on a page, filled by
/// background listeners while the plan runs.
#[derive(Default)]
struct PageEvents {
    console: Vec<String>,
    failed_requests: Vec<String>,
}

async fn listen(page: &Page) -> anyhow::Result<(Arc<Mutex<PageEvents>>, Vec<JoinHandle<()>>)> {
    let events = Arc::new(Mutex::new(PageEvents::default()));

    let mut console = page.event_listener::<EventConsoleApiCalled>().await?;
    let sink = events.clone();
    let console_task = tokio::spawn(async move {
        while let Some(call) = console.next().await {
            let text: Vec<String> = call
                .args
                .iter()
                .map(|arg| remote_text(arg.value.as_ref(), arg.description.as_deref()))
                .collect();
            let line = console_line(&format!("{:?}", call.r#type), &text.join(" "));
            if let Ok(mut events) = sink.lock() {
                events.console.push(line);
            }
        }
    });

    // loadingFailed only carries the request id
    let urls = Arc::new(Mutex::new(HashMap::new()));
    let mut sent = page.event_listener::<EventRequestWillBeSent>().await?;
    let known = urls.clone();
    let request_task = tokio::spawn(async move {
        while let Some(request) = sent.next().await {
            if let Ok(mut urls) = known.lock() {
                urls.insert(request.request_id.clone(), request.request.url.clone());
            }
        }
    });

    let mut failed = page.event_listener::<EventLoadingFailed>().await?;
    let sink = events.clone();
    let failure_task = tokio::spawn(async move {
        while let Some(failure) = failed.next().await {
            let url = urls.lock().ok().and_then(|urls| urls.get(&failure.request_id).cloned());
            let line = failed_request_line(url.as_deref(), failure.request_id.inner(), &failure.error_text);
            if let Ok(mut events) = sink.lock() {
                events.failed_requests.push(line);
            }
        }
    });

    Ok((events, vec![console_task, request_task, failure_task]))
}

async fn run_on_new_page(browser: &Browser, plan: &VerificationPlan) -> anyhow::Result<PageSnapshot> {
    let page = browser.new_page("about:blank").await?;
    let (events, listeners) = listen(&page).await?;
    let result = run_steps(&page, plan).await;
    for listener in listeners {
        listener.abort();
    }

    let mut snapshot = result?;
    if let Ok(mut events) = events.lock() {
        snapshot.console = std::mem::take(&mut events.console);
        snapshot.failed_requests = std::mem::take(&mut events.failed_requests);
    }
    Ok(snapshot)
}

async fn run_steps(page: &Page, plan: &VerificationPlan) -> anyhow::Result<PageSnapshot> {
    let mut screenshots = Vec::new();

    for step in &plan.steps {
        tracing::debug!("Browser step: {:?}", step);
        match step {
            BrowserStep::Goto(url) => {
                page.goto(url.as_str())
                    .await
                    .with_context(|| format!("Failed to open {url}"))?;
                page.wait_for_navigation().await?;
            }
            BrowserStep::Fill { selector, value } => {
                page.find_element(selector.as_str())
                    .await
                    .with_context(|| format!("No element matches {selector}"))?
                    .click()
                    .await?
                    .type_str(value.as_str())
                    .await?;
            }
            BrowserStep::Click(selector) => {
                page.find_element(selector.as_str())
                    .await
                    .with_context(|| format!("No element matches {selector}"))?
                    .click()
                    .await?;
            }
            BrowserStep::Wait(duration) => tokio::time::sleep(*duration).await,
            BrowserStep::Screenshot(path) => {
                screenshots.push(screenshot(page, path).await?);
            }
            BrowserStep::ClickEach {
                selector,
                settle,
                screenshot_prefix,
            } => {
                let elements = page.find_elements(selector.as_str()).await.unwrap_or_default();
                tracing::info!("Found {} elements matching {}", elements.len(), selector);
                for (n, element) in elements.iter().enumerate() {
                    element.click().await?;
                    tokio::time::sleep(*settle).await;
                    let path = numbered(screenshot_prefix, n + 1);
                    screenshots.push(screenshot(page, &path).await?);
                }
            }
        }
    }

    let title = page.get_title().await?.unwrap_or_default();
    let body_text: String = page
        .evaluate("document.body ? document.body.innerText : ''")
        .await?
        .into_value()?;
    let html = page.content().await?;

    let mut present_selectors = Vec::new();
    for selector in &plan.expect_selectors {
        if page.find_element(selector.as_str()).await.is_ok() {
            present_selectors.push(selector.clone());
        }
    }

    Ok(PageSnapshot {
        title,
        body_text,
        html,
        present_selectors,
        screenshots,
        ..PageSnapshot::default()
    })
}

/// Printable form of a console argument: strings unquoted, other JSON
/// values as JSON, objects by their description.
fn remote_text(value: Option<&Value>, description: Option<&str>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => description.unwrap_or("undefined").to_string(),
        Some(other) => other.to_string(),
    }
}

fn console_line(kind: &str, text: &str) -> String {
    format!("[{}] {}", kind.to_lowercase(), text)
}

fn failed_request_line(url: Option<&str>, request_id: &str, error: &str) -> String {
    match url {
        Some(url) => format!("{url} ({error})"),
        None => format!("request {request_id} ({error})"),
    }
}

async fn screenshot(page: &Page, path: &Path) -> anyhow::Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    page.save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
        .await
        .with_context(|| format!("Failed to save screenshot {}", path.display()))?;
    tracing::info!("Screenshot saved: {}", path.display());
    Ok(path.to_path_buf())
}

fn numbered(prefix: &Path, n: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(format!("-{n}.png"));
    PathBuf::from(name)
}
