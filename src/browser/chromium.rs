//! chromiumoxide (CDP) session provider with stealth evasion.
//!
//! Each session launches its own Chromium process with a freshly
//! sampled fingerprint, so no state survives between fetch attempts.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    AuthChallengeResponse, AuthChallengeResponseResponse, ContinueRequestParams,
    ContinueWithAuthParams, EnableParams as FetchEnableParams, EventAuthRequired,
    EventRequestPaused,
};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::browser::{BrowserProvider, Fingerprint, PageHandle, ReadinessStrategy};
use crate::config::BrowserSettings;
use crate::error::NavigateError;
use crate::proxy::ProxyEndpoint;

/// Extra quiet period approximating "no network activity" on top of a
/// complete document. CDP has no direct networkidle signal.
const NETWORK_IDLE_QUIET: Duration = Duration::from_millis(500);

/// Stealth evasion JavaScript, based on puppeteer-extra-plugin-stealth
/// techniques. Applied after load; injection failures are non-fatal.
const STEALTH_SCRIPTS: &[&str] = &[
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    r#"
    const originalQuery = window.navigator.permissions.query;
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications' ?
        Promise.resolve({ state: Notification.permission }) :
        originalQuery(parameters)
    );
    "#,
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
            { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
        ],
        configurable: true
    });
    "#,
    r#"
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
    "#,
];

/// Session provider backed by per-session Chromium processes.
pub struct ChromiumProvider {
    settings: BrowserSettings,
}

impl ChromiumProvider {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn find_chrome() -> Result<std::path::PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("found Chrome at {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found; install it or point PATH at an executable"
        ))
    }

    fn browser_config(
        &self,
        fingerprint: &Fingerprint,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<BrowserConfig> {
        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(fingerprint.width, fingerprint.height);

        // with_head means NOT headless, confusingly
        if !self.settings.headless {
            builder = builder.with_head();
        }

        if let Some(endpoint) = proxy {
            builder = builder.arg(proxy_arg(endpoint));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer")
            .arg(format!("--lang={}", fingerprint.locale));

        for arg in &self.settings.extra_args {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {}", e))
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn new_page(&self, proxy: Option<&ProxyEndpoint>) -> Result<Box<dyn PageHandle>> {
        let fingerprint = Fingerprint::sample(&self.settings);
        info!(
            headless = self.settings.headless,
            viewport = %format!("{}x{}", fingerprint.width, fingerprint.height),
            locale = %fingerprint.locale,
            proxied = proxy.is_some(),
            "launching browser session"
        );

        let config = self.browser_config(&fingerprint, proxy)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        // Fingerprint overrides must land before any navigation.
        page.execute(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
            .await?;
        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(fingerprint.timezone.clone()))
            .await
        {
            debug!("timezone override skipped: {}", e);
        }
        let languages_script = format!(
            r#"
            Object.defineProperty(navigator, 'languages', {{
                get: () => ['{locale}', '{lang}'],
                configurable: true
            }});
            "#,
            locale = fingerprint.locale,
            lang = fingerprint.locale.split('-').next().unwrap_or("en"),
        );
        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(languages_script))
            .await
        {
            debug!("language override skipped: {}", e);
        }

        let auth_task = match proxy {
            Some(endpoint) => Some(spawn_proxy_auth_responder(&page, endpoint).await?),
            None => None,
        };

        Ok(Box::new(ChromiumPage {
            browser,
            page,
            handler_task,
            auth_task,
        }))
    }
}

/// Proxy flag without credentials; Chromium ignores userinfo in
/// `--proxy-server`, and a raw password has no place on a command line.
fn proxy_arg(endpoint: &ProxyEndpoint) -> String {
    format!("--proxy-server={}", endpoint.server_url())
}

/// Answer the proxy's auth challenges over CDP with the endpoint
/// credentials. With auth handling enabled every request is paused and
/// must be explicitly continued.
async fn spawn_proxy_auth_responder(
    page: &Page,
    endpoint: &ProxyEndpoint,
) -> Result<JoinHandle<()>> {
    page.execute(FetchEnableParams {
        handle_auth_requests: Some(true),
        ..Default::default()
    })
    .await?;

    let mut auth_events = page.event_listener::<EventAuthRequired>().await?;
    let mut paused_events = page.event_listener::<EventRequestPaused>().await?;
    let page = page.clone();
    let username = endpoint.username.clone();
    let password = endpoint.password.clone();

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                event = auth_events.next() => {
                    let Some(event) = event else { break };
                    let response = AuthChallengeResponse {
                        response: AuthChallengeResponseResponse::ProvideCredentials,
                        username: Some(username.clone()),
                        password: Some(password.clone()),
                    };
                    let params = ContinueWithAuthParams::new(event.request_id.clone(), response);
                    if page.execute(params).await.is_err() {
                        break;
                    }
                }
                event = paused_events.next() => {
                    let Some(event) = event else { break };
                    let _ = page
                        .execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await;
                }
            }
        }
    }))
}

/// One page in a dedicated Chromium process.
pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    auth_task: Option<JoinHandle<()>>,
}

impl ChromiumPage {
    /// Poll readiness until the strategy's condition holds. Resolution
    /// is left to the surrounding timeout.
    fn readiness_script(strategy: ReadinessStrategy) -> &'static str {
        match strategy {
            ReadinessStrategy::Load | ReadinessStrategy::NetworkIdle => {
                r#"
                new Promise((resolve) => {
                    const check = () => {
                        if (document.readyState === 'complete') {
                            resolve(document.readyState);
                        } else {
                            setTimeout(check, 100);
                        }
                    };
                    check();
                })
                "#
            }
            ReadinessStrategy::DomContentLoaded => {
                r#"
                new Promise((resolve) => {
                    const check = () => {
                        if (document.readyState === 'interactive' || document.readyState === 'complete') {
                            resolve(document.readyState);
                        } else {
                            setTimeout(check, 100);
                        }
                    };
                    check();
                })
                "#
            }
        }
    }

    async fn navigate_inner(&self, url: &str, strategy: ReadinessStrategy) -> Result<()> {
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("invalid URL: {}", e))?;
        self.page.execute(nav_params).await?;

        let state: String = self
            .page
            .evaluate(Self::readiness_script(strategy).to_string())
            .await?
            .into_value()
            .unwrap_or_else(|_| "unknown".to_string());
        debug!(url, strategy = %strategy, state = %state, "document ready");

        if strategy == ReadinessStrategy::NetworkIdle {
            tokio::time::sleep(NETWORK_IDLE_QUIET).await;
        }

        // Stealth scripts need a real page context, so they run after
        // load. Failures here are best-effort evasion, not errors.
        for script in STEALTH_SCRIPTS {
            if let Err(e) = self.page.evaluate(script.to_string()).await {
                debug!("stealth script injection skipped: {}", e);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(
        &self,
        url: &str,
        strategy: ReadinessStrategy,
        timeout: Duration,
    ) -> Result<(), NavigateError> {
        match tokio::time::timeout(timeout, self.navigate_inner(url, strategy)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(NavigateError::Engine(e)),
            Err(_) => Err(NavigateError::Timeout { strategy, timeout }),
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn close(mut self: Box<Self>) {
        if let Some(task) = &self.auth_task {
            task.abort();
        }
        let _ = self.page.close().await;
        let _ = self.browser.close().await;
        self.handler_task.abort();
    }
}
