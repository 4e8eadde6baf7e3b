use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, OutputConfig, SelectorConfig, SiteConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_selectors(&config.site.selectors)?;
    validate_crawler_config(&config.crawler)?;
    validate_browser_config(&config.browser)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the catalog site description
fn validate_site_config(site: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &site.base_url)?;

    if !site.search_url.contains("{keyword}") {
        return Err(ConfigError::Validation(format!(
            "search-url must contain a {{keyword}} placeholder, got '{}'",
            site.search_url
        )));
    }
    validate_http_url("search-url", &site.search_url.replace("{keyword}", "sample"))?;

    if site.manufacturer_param.is_empty() {
        return Err(ConfigError::Validation(
            "manufacturer-param cannot be empty".to_string(),
        ));
    }

    if site.redirect_marker.is_empty() {
        return Err(ConfigError::Validation(
            "redirect-marker cannot be empty".to_string(),
        ));
    }

    if site.allowed_categories.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-categories must name at least one category".to_string(),
        ));
    }

    if site.allowed_categories.iter().any(|c| c.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "allowed-categories cannot contain empty names".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every configured selector parses
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    if !selectors.row_cell.contains("{index}") {
        return Err(ConfigError::Validation(format!(
            "row-cell must contain an {{index}} placeholder, got '{}'",
            selectors.row_cell
        )));
    }

    let row_cell = selectors.row_cell.replace("{index}", "1");
    for (name, value) in [
        ("listing-link", selectors.listing_link.as_str()),
        ("no-results", selectors.no_results.as_str()),
        ("group", selectors.group.as_str()),
        ("group-title", selectors.group_title.as_str()),
        ("row", selectors.row.as_str()),
        ("row-cell", row_cell.as_str()),
        ("next-page", selectors.next_page.as_str()),
    ] {
        validate_selector(name, value)?;
    }

    if selectors.disabled_class.is_empty() || selectors.not_applicable_class.is_empty() {
        return Err(ConfigError::Validation(
            "disabled-class and not-applicable-class cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_selector(name: &str, value: &str) -> Result<(), ConfigError> {
    Selector::parse(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", name, value, e)))
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 32 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 32, got {}",
            config.workers
        )));
    }

    if let Some(sessions) = config.sessions {
        if sessions < 1 || sessions > 32 {
            return Err(ConfigError::Validation(format!(
                "sessions must be between 1 and 32, got {}",
                sessions
            )));
        }
    }

    if config.page_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page-timeout-ms must be >= 100ms, got {}ms",
            config.page_timeout_ms
        )));
    }

    if config.poll_interval_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "poll-interval-ms must be >= 10ms, got {}ms",
            config.poll_interval_ms
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser session configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.window_width == 0 || config.window_height == 0 {
        return Err(ConfigError::Validation(format!(
            "window size must be non-zero, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    if config.chrome_path.as_deref().map(str::trim) == Some("") {
        return Err(ConfigError::Validation(
            "chrome-path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("artifact-name", config.artifact_name.as_str()),
        ("screenshot-folder", config.screenshot_folder.as_str()),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
        if value.contains('/') || value.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "{} must be a plain name, got '{}'",
                name, value
            )));
        }
    }

    if config.finalize_max_attempts == Some(0) {
        return Err(ConfigError::Validation(
            "finalize-max-attempts must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
