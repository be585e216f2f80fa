//! Browser tools sharing one page session.
//!
//! The session fetches pages over HTTP and keeps the current page's HTML and
//! text. Clicking follows links and submits forms found in that HTML; typing
//! fills form fields that the next submission sends. The session belongs to
//! the tools, not the loop: it lives across tasks and is dropped by
//! [`Tool::shutdown`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::Tool;
use crate::constants::{BROWSER_CONTENT_MAX_CHARS, BROWSER_MAX_BODY_SIZE, BROWSER_TIMEOUT_SECS};
use crate::error::ToolError;

const NO_BROWSER: &str = "Error: No browser open.";

/// The page currently open.
struct Page {
    url: Url,
    /// Raw markup, `None` for non-HTML responses.
    html: Option<String>,
    text: String,
    /// Field name -> value typed since the page loaded.
    fills: HashMap<String, String>,
}

/// Where a click or form submission leads.
#[derive(Debug, PartialEq)]
enum Navigation {
    Get(Url),
    PostForm { url: Url, body: String },
}

#[derive(Debug, PartialEq)]
enum ClickTarget {
    Follow(Navigation),
    /// The element exists but clicking it goes nowhere over plain HTTP.
    Inert,
}

#[derive(Default)]
struct SessionState {
    client: Option<reqwest::Client>,
    page: Option<Page>,
}

impl SessionState {
    fn client(&mut self) -> anyhow::Result<reqwest::Client> {
        if let Some(ref client) = self.client {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(BROWSER_TIMEOUT_SECS))
            .user_agent(concat!("embryo/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to start browser session")?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Load `to` and make it the current page. Returns `done` on success
    /// and an `Error: ...` observation when the load fails.
    async fn go(
        &mut self,
        to: Navigation,
        done: String,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let client = self.client()?;
        debug!(?to, "navigating");
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            loaded = load(&client, to) => loaded,
        };
        match loaded {
            Ok(page) => {
                self.page = Some(page);
                Ok(done)
            }
            Err(e) => Ok(format!("Error: {e:#}")),
        }
    }
}

/// Page session shared by the browser tools.
#[derive(Default)]
pub struct BrowserSession {
    state: Mutex<SessionState>,
}

impl BrowserSession {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open(&self, url: &str, cancel: &CancellationToken) -> Result<String, ToolError> {
        let target = match Url::parse(&normalize_url(url)) {
            Ok(target) => target,
            Err(e) => return Ok(format!("Error: invalid URL {url}: {e}")),
        };
        let mut state = self.state.lock().await;
        state
            .go(Navigation::Get(target), format!("Opened {url}"), cancel)
            .await
    }

    async fn click(&self, selector: &str, cancel: &CancellationToken) -> Result<String, ToolError> {
        let mut state = self.state.lock().await;
        let Some(ref page) = state.page else {
            return Ok(NO_BROWSER.into());
        };
        let done = format!("Clicked {selector}");
        match resolve_click(page, selector) {
            Ok(ClickTarget::Follow(to)) => state.go(to, done, cancel).await,
            Ok(ClickTarget::Inert) => {
                debug!(%selector, "click has nowhere to go");
                Ok(done)
            }
            Err(observation) => Ok(observation),
        }
    }

    async fn type_into(&self, selector: &str, text: &str) -> String {
        let mut state = self.state.lock().await;
        let Some(ref mut page) = state.page else {
            return NO_BROWSER.into();
        };
        match resolve_field(page, selector) {
            Ok(name) => {
                debug!(%selector, field = %name, "filling field");
                page.fills.insert(name, text.to_string());
                format!("Typed \"{text}\" into {selector}")
            }
            Err(observation) => observation,
        }
    }

    async fn content(&self) -> Option<String> {
        let state = self.state.lock().await;
        state.page.as_ref().map(|page| {
            debug!(url = %page.url, "reading page content");
            page.text.chars().take(BROWSER_CONTENT_MAX_CHARS).collect()
        })
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        if state.page.take().is_some() || state.client.is_some() {
            debug!("closing browser session");
        }
        state.client = None;
    }
}

/// Fetch a page. HTML is kept for clicks and converted to markdown for reading.
async fn load(client: &reqwest::Client, to: Navigation) -> anyhow::Result<Page> {
    let request = match to {
        Navigation::Get(url) => client.get(url),
        Navigation::PostForm { url, body } => client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body),
    };
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().clone();
    anyhow::ensure!(status.is_success(), "HTTP {status} for {url}");

    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("html"));
    let body = response.text().await?;
    anyhow::ensure!(
        body.len() <= BROWSER_MAX_BODY_SIZE,
        "page too large ({} bytes)",
        body.len()
    );

    Ok(if is_html {
        Page {
            url,
            text: html2md::rewrite_html(&body, false),
            html: Some(body),
            fills: HashMap::new(),
        }
    } else {
        Page {
            url,
            text: body,
            html: None,
            fills: HashMap::new(),
        }
    })
}

/// Bare hosts get `https://`.
fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn parse_selector(selector: &str) -> Result<Selector, String> {
    Selector::parse(selector).map_err(|_| format!("Error: Invalid selector {selector}."))
}

fn first_match<'a>(
    document: &'a Html,
    selector: &Selector,
    raw: &str,
) -> Result<ElementRef<'a>, String> {
    document
        .select(selector)
        .next()
        .ok_or_else(|| format!("Error: No element matches {raw}."))
}

/// `element` itself or its nearest ancestor named `tag`.
fn enclosing<'a>(element: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|e| e.value().name() == tag)
}

fn input_type(element: &ElementRef) -> String {
    element
        .value()
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

fn is_submitter(element: &ElementRef) -> bool {
    match element.value().name() {
        "button" => element
            .value()
            .attr("type")
            .is_none_or(|t| t.eq_ignore_ascii_case("submit")),
        "input" => matches!(input_type(element).as_str(), "submit" | "image"),
        "form" => true,
        _ => false,
    }
}

fn resolve_click(page: &Page, selector: &str) -> Result<ClickTarget, String> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(page.html.as_deref().unwrap_or_default());
    let element = first_match(&document, &parsed, selector)?;

    if let Some(href) = enclosing(element, "a").and_then(|a| a.value().attr("href")) {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") {
            return Ok(ClickTarget::Inert);
        }
        let url = page
            .url
            .join(href)
            .map_err(|e| format!("Error: Bad link {href}: {e}"))?;
        return Ok(ClickTarget::Follow(Navigation::Get(url)));
    }

    if !is_submitter(&element) {
        return Ok(ClickTarget::Inert);
    }
    match enclosing(element, "form") {
        Some(form) => {
            let submitter = (element.value().name() != "form").then_some(element);
            submit_form(page, form, submitter).map(ClickTarget::Follow)
        }
        None => Ok(ClickTarget::Inert),
    }
}

/// Name of the form field `selector` points at.
fn resolve_field(page: &Page, selector: &str) -> Result<String, String> {
    let parsed = parse_selector(selector)?;
    let document = Html::parse_document(page.html.as_deref().unwrap_or_default());
    let element = first_match(&document, &parsed, selector)?;

    let typeable = match element.value().name() {
        "textarea" | "select" => true,
        "input" => !matches!(
            input_type(&element).as_str(),
            "submit" | "image" | "button" | "reset" | "file" | "checkbox" | "radio" | "hidden"
        ),
        _ => false,
    };
    match element.value().attr("name") {
        Some(name) if typeable && !name.is_empty() => Ok(name.to_string()),
        _ => Err(format!("Error: Cannot type into {selector}.")),
    }
}

fn submit_form(
    page: &Page,
    form: ElementRef,
    submitter: Option<ElementRef>,
) -> Result<Navigation, String> {
    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty());
    let mut url = match action {
        Some(action) => page
            .url
            .join(action)
            .map_err(|e| format!("Error: Bad form action {action}: {e}"))?,
        None => page.url.clone(),
    };
    let fields = form_fields(form, submitter, &page.fills);
    let post = form
        .value()
        .attr("method")
        .is_some_and(|m| m.eq_ignore_ascii_case("post"));

    if post {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&fields)
            .finish();
        Ok(Navigation::PostForm { url, body })
    } else {
        url.set_fragment(None);
        url.query_pairs_mut().clear().extend_pairs(&fields);
        Ok(Navigation::Get(url))
    }
}

/// Successful controls of `form` in document order, with typed values
/// replacing the markup's defaults.
fn form_fields(
    form: ElementRef,
    submitter: Option<ElementRef>,
    fills: &HashMap<String, String>,
) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for control in form.descendants().filter_map(ElementRef::wrap) {
        let Some(name) = control.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let value = match control.value().name() {
            "input" => {
                let attr_value = control.value().attr("value");
                match input_type(&control).as_str() {
                    "submit" | "image" | "button" => {
                        if submitter.map(|s| s.id()) != Some(control.id()) {
                            continue;
                        }
                        attr_value.unwrap_or_default().to_string()
                    }
                    "reset" | "file" => continue,
                    "checkbox" | "radio" => {
                        if control.value().attr("checked").is_none() {
                            continue;
                        }
                        attr_value.unwrap_or("on").to_string()
                    }
                    _ => attr_value.unwrap_or_default().to_string(),
                }
            }
            "button" => {
                if submitter.map(|s| s.id()) != Some(control.id()) {
                    continue;
                }
                control.value().attr("value").unwrap_or_default().to_string()
            }
            "textarea" => control.text().collect(),
            "select" => {
                let options: Vec<ElementRef> = control
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .filter(|o| o.value().name() == "option")
                    .collect();
                let chosen = options
                    .iter()
                    .find(|o| o.value().attr("selected").is_some())
                    .or(options.first());
                match chosen {
                    Some(option) => option
                        .value()
                        .attr("value")
                        .map(str::to_string)
                        .unwrap_or_else(|| option.text().collect::<String>().trim().to_string()),
                    None => continue,
                }
            }
            _ => continue,
        };
        let value = fills.get(name).cloned().unwrap_or(value);
        fields.push((name.to_string(), value));
    }
    fields
}

#[derive(Deserialize)]
struct BrowserOpenInput {
    url: Option<String>,
}

pub struct BrowserOpenTool {
    session: Arc<BrowserSession>,
}

impl BrowserOpenTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait::async_trait]
impl Tool for BrowserOpenTool {
    fn name(&self) -> &str {
        "browser_open"
    }

    fn description(&self) -> &str {
        "Opens a URL in the browser session."
    }

    fn usage(&self) -> &str {
        r#"browser_open({"url": "duckduckgo.com"})"#
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let input: BrowserOpenInput = serde_json::from_value(Value::Object(args))
            .context("invalid arguments for browser_open")?;
        let Some(url) = input.url.filter(|u| !u.trim().is_empty()) else {
            return Ok("Error: No URL provided.".into());
        };
        self.session.open(url.trim(), cancel).await
    }

    async fn shutdown(&self) {
        self.session.close().await;
    }
}

#[derive(Deserialize)]
struct BrowserClickInput {
    selector: Option<String>,
}

pub struct BrowserClickTool {
    session: Arc<BrowserSession>,
}

impl BrowserClickTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait::async_trait]
impl Tool for BrowserClickTool {
    fn name(&self) -> &str {
        "browser_click"
    }

    fn description(&self) -> &str {
        "Clicks the element matching a CSS selector: follows links and submits forms."
    }

    fn usage(&self) -> &str {
        r#"browser_click({"selector": "button[type=submit]"})"#
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let input: BrowserClickInput = serde_json::from_value(Value::Object(args))
            .context("invalid arguments for browser_click")?;
        if self.session.content().await.is_none() {
            return Ok(NO_BROWSER.into());
        }
        let Some(selector) = input.selector.filter(|s| !s.trim().is_empty()) else {
            return Ok("Error: No selector provided.".into());
        };
        self.session.click(selector.trim(), cancel).await
    }

    async fn shutdown(&self) {
        self.session.close().await;
    }
}

#[derive(Deserialize)]
struct BrowserTypeInput {
    selector: Option<String>,
    text: Option<String>,
}

pub struct BrowserTypeTool {
    session: Arc<BrowserSession>,
}

impl BrowserTypeTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait::async_trait]
impl Tool for BrowserTypeTool {
    fn name(&self) -> &str {
        "browser_type"
    }

    fn description(&self) -> &str {
        "Types text into the form field matching a CSS selector."
    }

    fn usage(&self) -> &str {
        r#"browser_type({"selector": "input[name=q]", "text": "hello"})"#
    }

    async fn invoke(
        &self,
        args: Map<String, Value>,
        _cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        let input: BrowserTypeInput = serde_json::from_value(Value::Object(args))
            .context("invalid arguments for browser_type")?;
        if self.session.content().await.is_none() {
            return Ok(NO_BROWSER.into());
        }
        let (Some(selector), Some(text)) =
            (input.selector.filter(|s| !s.trim().is_empty()), input.text)
        else {
            return Ok("Error: browser_type requires 'selector' and 'text'.".into());
        };
        Ok(self.session.type_into(selector.trim(), &text).await)
    }

    async fn shutdown(&self) {
        self.session.close().await;
    }
}

pub struct BrowserGetContentTool {
    session: Arc<BrowserSession>,
}

impl BrowserGetContentTool {
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }
}

#[async_trait::async_trait]
impl Tool for BrowserGetContentTool {
    fn name(&self) -> &str {
        "browser_get_content"
    }

    fn description(&self) -> &str {
        "Returns the text content of the current page."
    }

    fn usage(&self) -> &str {
        "browser_get_content({})"
    }

    async fn invoke(
        &self,
        _args: Map<String, Value>,
        _cancel: &CancellationToken,
    ) -> Result<String, ToolError> {
        Ok(self
            .session
            .content()
            .await
            .unwrap_or_else(|| NO_BROWSER.into()))
    }

    async fn shutdown(&self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <p class="intro">Welcome</p>
          <a id="next" href="/page/2">Next</a>
          <a id="noop" href="javascript:void(0)">Menu</a>
          <form id="search" action="/search">
            <input name="q" value="">
            <input type="hidden" name="lang" value="en">
            <input type="checkbox" name="safe">
            <select name="sort">
              <option value="new">Newest</option>
              <option value="top" selected>Top</option>
            </select>
            <button type="submit" name="go" value="1">Search</button>
          </form>
          <form id="login" method="POST" action="https://auth.example.org/login">
            <input name="user">
            <textarea name="note">hi there</textarea>
            <input type="submit" value="Sign in">
          </form>
        </body></html>"#;

    fn page(html: &str) -> Page {
        Page {
            url: Url::parse("https://example.org/home?x=1").unwrap(),
            html: Some(html.to_string()),
            text: html2md::rewrite_html(html, false),
            fills: HashMap::new(),
        }
    }

    async fn session_on(html: &str) -> Arc<BrowserSession> {
        let session = Arc::new(BrowserSession::new());
        session.state.lock().await.page = Some(page(html));
        session
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("google.com"), "https://google.com");
        assert_eq!(normalize_url("http://localhost:8080"), "http://localhost:8080");
        assert_eq!(normalize_url("https://example.org/a"), "https://example.org/a");
    }

    #[test]
    fn test_click_follows_relative_link() {
        let target = resolve_click(&page(SEARCH_PAGE), "#next").unwrap();
        assert_eq!(
            target,
            ClickTarget::Follow(Navigation::Get(
                Url::parse("https://example.org/page/2").unwrap()
            ))
        );
    }

    #[test]
    fn test_click_on_script_link_or_text_is_inert() {
        let page = page(SEARCH_PAGE);
        assert_eq!(resolve_click(&page, "#noop").unwrap(), ClickTarget::Inert);
        assert_eq!(resolve_click(&page, "p.intro").unwrap(), ClickTarget::Inert);
    }

    #[test]
    fn test_click_errors() {
        let page = page(SEARCH_PAGE);
        assert_eq!(
            resolve_click(&page, "#missing").unwrap_err(),
            "Error: No element matches #missing."
        );
        assert_eq!(
            resolve_click(&page, "[[").unwrap_err(),
            "Error: Invalid selector [[."
        );
    }

    #[test]
    fn test_submit_get_form_with_typed_value() {
        let mut page = page(SEARCH_PAGE);
        assert_eq!(resolve_field(&page, "input[name=q]").unwrap(), "q");
        page.fills.insert("q".into(), "rust lang".into());

        let target = resolve_click(&page, "#search button").unwrap();
        assert_eq!(
            target,
            ClickTarget::Follow(Navigation::Get(
                Url::parse("https://example.org/search?q=rust+lang&lang=en&sort=top&go=1").unwrap()
            ))
        );
    }

    #[test]
    fn test_submit_post_form() {
        let mut page = page(SEARCH_PAGE);
        page.fills.insert("user".into(), "ada".into());

        let target = resolve_click(&page, "#login input[type=submit]").unwrap();
        assert_eq!(
            target,
            ClickTarget::Follow(Navigation::PostForm {
                url: Url::parse("https://auth.example.org/login").unwrap(),
                body: "user=ada&note=hi+there".into(),
            })
        );
    }

    #[test]
    fn test_type_needs_named_field() {
        let page = page(SEARCH_PAGE);
        assert_eq!(resolve_field(&page, "textarea").unwrap(), "note");
        assert_eq!(
            resolve_field(&page, "p.intro").unwrap_err(),
            "Error: Cannot type into p.intro."
        );
        assert_eq!(
            resolve_field(&page, "input[name=lang]").unwrap_err(),
            "Error: Cannot type into input[name=lang]."
        );
    }

    #[tokio::test]
    async fn test_content_requires_open_page() {
        let session = Arc::new(BrowserSession::new());
        let tool = BrowserGetContentTool::new(Arc::clone(&session));
        let result = tool
            .invoke(Map::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, "Error: No browser open.");
    }

    #[tokio::test]
    async fn test_content_is_truncated_and_cleared_on_shutdown() {
        let session = Arc::new(BrowserSession::new());
        session.state.lock().await.page = Some(Page {
            url: Url::parse("https://example.org").unwrap(),
            html: None,
            text: "x".repeat(BROWSER_CONTENT_MAX_CHARS + 10),
            fills: HashMap::new(),
        });
        let tool = BrowserGetContentTool::new(Arc::clone(&session));
        let cancel = CancellationToken::new();

        let text = tool.invoke(Map::new(), &cancel).await.unwrap();
        assert_eq!(text.len(), BROWSER_CONTENT_MAX_CHARS);

        tool.shutdown().await;
        let text = tool.invoke(Map::new(), &cancel).await.unwrap();
        assert_eq!(text, "Error: No browser open.");
    }

    #[tokio::test]
    async fn test_open_without_url() {
        let tool = BrowserOpenTool::new(Arc::new(BrowserSession::new()));
        let result = tool
            .invoke(Map::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, "Error: No URL provided.");
    }

    #[tokio::test]
    async fn test_click_and_type_need_open_page() {
        let session = Arc::new(BrowserSession::new());
        let cancel = CancellationToken::new();

        let click = BrowserClickTool::new(Arc::clone(&session));
        let result = click
            .invoke(args(json!({"selector": "a"})), &cancel)
            .await
            .unwrap();
        assert_eq!(result, NO_BROWSER);

        let typing = BrowserTypeTool::new(session);
        let result = typing
            .invoke(args(json!({"selector": "input", "text": "x"})), &cancel)
            .await
            .unwrap();
        assert_eq!(result, NO_BROWSER);
    }

    #[tokio::test]
    async fn test_click_without_selector() {
        let tool = BrowserClickTool::new(session_on(SEARCH_PAGE).await);
        let result = tool
            .invoke(Map::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, "Error: No selector provided.");
    }

    #[tokio::test]
    async fn test_click_inert_element_stays_on_page() {
        let session = session_on(SEARCH_PAGE).await;
        let tool = BrowserClickTool::new(Arc::clone(&session));
        let result = tool
            .invoke(args(json!({"selector": "p.intro"})), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, "Clicked p.intro");
        assert!(session.content().await.unwrap().contains("Welcome"));
    }

    #[tokio::test]
    async fn test_type_requires_selector_and_text() {
        let tool = BrowserTypeTool::new(session_on(SEARCH_PAGE).await);
        let result = tool
            .invoke(args(json!({"selector": "input[name=q]"})), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result, "Error: browser_type requires 'selector' and 'text'.");
    }

    #[tokio::test]
    async fn test_type_records_fill() {
        let session = session_on(SEARCH_PAGE).await;
        let tool = BrowserTypeTool::new(Arc::clone(&session));
        let result = tool
            .invoke(
                args(json!({"selector": "input[name=q]", "text": "rust"})),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, "Typed \"rust\" into input[name=q]");

        let state = session.state.lock().await;
        let fills = &state.page.as_ref().unwrap().fills;
        assert_eq!(fills.get("q").map(String::as_str), Some("rust"));
    }
}
