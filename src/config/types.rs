use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Parts-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Keywords to search for; merged with keywords given on the command line
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    pub output: OutputConfig,
}

/// Description of the catalog site being harvested
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin that relative listing links are resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Search URL with a `{keyword}` placeholder
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Substring identifying a manufacturer detail page after a redirect
    #[serde(rename = "redirect-marker")]
    pub redirect_marker: String,

    /// Query parameter carrying the manufacturer identifier
    #[serde(rename = "manufacturer-param")]
    pub manufacturer_param: String,

    /// Text of the no-results marker when a search found nothing
    #[serde(rename = "no-results-text")]
    pub no_results_text: String,

    /// Category groups eligible for extraction; any other name halts a manufacturer
    #[serde(rename = "allowed-categories")]
    pub allowed_categories: Vec<String>,

    pub selectors: SelectorConfig,
}

impl SiteConfig {
    /// Returns true if rows of this category should be extracted
    pub fn is_allowed_category(&self, name: &str) -> bool {
        self.allowed_categories.iter().any(|c| c == name)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apecauto.com/".to_string(),
            search_url: "https://apecauto.com/search/?pcode={keyword}".to_string(),
            redirect_marker: "searchspareparts".to_string(),
            manufacturer_param: "mfr".to_string(),
            no_results_text: "None".to_string(),
            allowed_categories: vec![
                "Own stock warehouses".to_string(),
                "Requested article".to_string(),
                "Superseded part for the requested article".to_string(),
            ],
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors for the parts of the catalog pages we read
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One link per manufacturer on a search listing page
    #[serde(rename = "listing-link")]
    pub listing_link: String,

    /// Element whose text equals `no-results-text` when nothing matched
    #[serde(rename = "no-results")]
    pub no_results: String,

    /// A category group on a manufacturer page
    pub group: String,

    /// Title of a category group, relative to the group
    #[serde(rename = "group-title")]
    pub group_title: String,

    /// A part row, relative to the group
    pub row: String,

    /// A cell of a row, relative to the row; `{index}` is the 1-based position
    #[serde(rename = "row-cell")]
    pub row_cell: String,

    /// The next-page control
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Class marking the next-page control as disabled
    #[serde(rename = "disabled-class")]
    pub disabled_class: String,

    /// Icon class marking a cell as not applicable
    #[serde(rename = "not-applicable-class")]
    pub not_applicable_class: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_link: "div.table__rows a".to_string(),
            no_results: "#ctl00__content_SparePartsManufacturers1__errorLabel".to_string(),
            group: "div.table__rows-group".to_string(),
            group_title: "div.table__rows-title".to_string(),
            row: "div.table__rows-list > div.table__row".to_string(),
            row_cell: "div.table__row-element:nth-of-type({index}) > div".to_string(),
            next_page: "li.page-next".to_string(),
            disabled_class: "disabled".to_string(),
            not_applicable_class: "icon-nal".to_string(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of manufacturers scraped in parallel
    pub workers: u32,

    /// Number of pooled sessions; defaults to `workers`
    pub sessions: Option<u32>,

    /// Upper bound on every wait for a page element (milliseconds)
    #[serde(rename = "page-timeout-ms")]
    pub page_timeout_ms: u64,

    /// Delay between presence checks while waiting (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Maximum pages visited per manufacturer; unlimited when unset
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,
}

impl CrawlerConfig {
    pub fn session_count(&self) -> usize {
        self.sessions.unwrap_or(self.workers) as usize
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            sessions: None,
            page_timeout_ms: 10_000,
            poll_interval_ms: 250,
            max_pages: None,
        }
    }
}

/// Which session implementation drives the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Headless Chrome over the DevTools protocol
    #[default]
    Chrome,
    /// Plain HTTP requests; cannot run page scripts
    Http,
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub backend: SessionBackend,

    /// Chrome executable; auto-detected when unset
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,

    pub headless: bool,

    /// Disable only when running as root inside a container
    pub sandbox: bool,

    #[serde(rename = "window-width")]
    pub window_width: u32,

    #[serde(rename = "window-height")]
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Chrome,
            chrome_path: None,
            headless: true,
            sandbox: true,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the artifact and the capture folder
    pub directory: String,

    /// File stem of the tabular artifact
    #[serde(rename = "artifact-name", default = "default_artifact_name")]
    pub artifact_name: String,

    /// Subfolder of `directory` receiving page captures
    #[serde(rename = "screenshot-folder", default = "default_screenshot_folder")]
    pub screenshot_folder: String,

    /// Optional path of a markdown run summary
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,

    /// Bounded finalize retries; when unset the operator is prompted until the file is free
    #[serde(rename = "finalize-max-attempts", default)]
    pub finalize_max_attempts: Option<u32>,
}

fn default_artifact_name() -> String {
    "APEC Auto Data".to_string()
}

fn default_screenshot_folder() -> String {
    "APEC Screenshots".to_string()
}
