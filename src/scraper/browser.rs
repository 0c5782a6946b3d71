//! Browser automation using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as ChromeBrowser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use super::driver::{BrowseResult, BrowserDriver, PageDriver};
use crate::config::BrowserSettings;
use crate::error::{BrowseError, RunError};

/// Interval between selector probes while waiting for an element
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser wrapper for web scraping
pub struct Browser {
    browser: ChromeBrowser,
    handle: tokio::task::JoinHandle<()>,
}

impl Browser {
    /// Launch a new browser instance.
    ///
    /// The user agent and window are fixed here once per session; pages opened
    /// later inherit them.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, RunError> {
        let chrome_path = settings.chrome_path.clone().unwrap_or_else(|| {
            if cfg!(target_os = "macos") {
                "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome".to_string()
            } else if cfg!(target_os = "windows") {
                "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe".to_string()
            } else {
                "google-chrome".to_string()
            }
        });

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .no_sandbox()
            .disable_default_args()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg(format!("--user-agent={}", settings.user_agent))
            .window_size(1280, 720);

        if settings.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(RunError::BrowserLaunch)?;

        let (browser, mut handler) = ChromeBrowser::launch(config)
            .await
            .map_err(|e| RunError::BrowserLaunch(e.to_string()))?;

        // Spawn handler task - must keep running for browser to work
        let handle = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => continue,
                    None => break,
                }
            }
        });

        sleep(Duration::from_secs(1)).await;

        Ok(Self { browser, handle })
    }

    /// Close the browser
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        self.handle.abort();
    }
}

#[async_trait]
impl BrowserDriver for Browser {
    async fn new_page(&self) -> BrowseResult<Box<dyn PageDriver>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromePage { page }))
    }
}

/// One chromiumoxide tab
pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str, limit: Duration) -> BrowseResult<()> {
        match timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowseError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(BrowseError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", limit),
            }),
        }
    }

    async fn wait_for_selector(&self, selector: &str, limit: Duration) -> BrowseResult<()> {
        let deadline = Instant::now() + limit;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowseError::Timeout {
                    selector: selector.to_string(),
                    timeout: limit,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> BrowseResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowseError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn click_nth(&self, selector: &str, index: usize) -> BrowseResult<()> {
        let elements = self.page.find_elements(selector).await?;
        let element = elements
            .get(index)
            .ok_or_else(|| BrowseError::ElementNotFound(format!("{}[{}]", selector, index)))?;
        element.click().await?;
        Ok(())
    }

    async fn wait_for_navigation(&self, limit: Duration) -> BrowseResult<()> {
        match timeout(limit, self.page.wait_for_navigation()).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(BrowseError::NavigationTimeout(limit)),
        }
    }

    async fn content(&self) -> BrowseResult<String> {
        Ok(self.page.content().await?)
    }

    async fn title(&self) -> BrowseResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn close(&self) -> BrowseResult<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}
