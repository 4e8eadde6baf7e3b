use parts_harvester::config::{
    load_config_with_hash, BrowserConfig, Config, CrawlerConfig, OutputConfig, SessionBackend,
    SiteConfig, UserAgentConfig,
};
use parts_harvester::crawler::{run_harvest, Coordinator};
use parts_harvester::output::{MaxAttempts, RetryPolicy};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEYWORD: &str = "0986494104";

/// Creates a test configuration pointing the site at the mock server
fn create_test_config(server_uri: &str, output_dir: &Path) -> Config {
    Config {
        keywords: vec![],
        site: SiteConfig {
            base_url: format!("{}/", server_uri),
            search_url: format!("{}/search/?pcode={{keyword}}", server_uri),
            ..SiteConfig::default()
        },
        crawler: CrawlerConfig {
            workers: 2,
            sessions: Some(2),
            page_timeout_ms: 400, // Short so unrecognized pages time out quickly
            poll_interval_ms: 50,
            max_pages: None,
        },
        browser: BrowserConfig {
            backend: SessionBackend::Http,
            ..BrowserConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            directory: output_dir.to_string_lossy().to_string(),
            artifact_name: "parts".to_string(),
            screenshot_folder: "captures".to_string(),
            summary_path: None,
            finalize_max_attempts: Some(1),
        },
    }
}

fn no_retry() -> Box<dyn RetryPolicy> {
    Box::new(MaxAttempts::new(1, Duration::from_millis(1)))
}

fn row(article: &str, name: &str, price: &str) -> String {
    format!(
        r#"<div class="table__row">
            <div class="table__row-element"><div>BOSCH</div></div>
            <div class="table__row-element"><div>{}</div></div>
            <div class="table__row-element"><div><a href="/part/{}">{}</a></div></div>
            <div class="table__row-element"><div>0.45</div></div>
            <div class="table__row-element"><div><i class="icon icon-nal"></i></div></div>
            <div class="table__row-element"><div>3</div></div>
            <div class="table__row-element"><div>OEM</div></div>
            <div class="table__row-element"><div>{}</div></div>
        </div>"#,
        article,
        article.replace(' ', ""),
        name,
        price
    )
}

fn group(category: &str, rows: &[String]) -> String {
    format!(
        r#"<div class="table__rows-group">
            <div class="table__rows-title">{}</div>
            <div class="table__rows-list">{}</div>
        </div>"#,
        category,
        rows.concat()
    )
}

fn manufacturer_page(groups: &[String], next: Option<&str>) -> String {
    let pager = match next {
        Some(href) => format!(r#"<li class="page-next"><a href="{}">Next</a></li>"#, href),
        None => r#"<li class="page-next disabled"><span>Next</span></li>"#.to_string(),
    };
    format!(
        "<html><body>{}<ul class=\"pager\">{}</ul></body></html>",
        groups.concat(),
        pager
    )
}

fn listing(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">maker</a>"#, href))
        .collect();
    format!(
        r#"<html><body><div class="table__rows">{}</div></body></html>"#,
        anchors
    )
}

async fn mount_page(server: &MockServer, page_path: &str, mfr: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .and(query_param("mfr", mfr))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_search(server: &MockServer, keyword: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("pcode", keyword))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Lists manufacturers A (three pages, halting on the third) and B (never loads)
async fn mount_catalog(server: &MockServer) {
    mount_search(
        server,
        KEYWORD,
        ResponseTemplate::new(200).set_body_string(listing(&[
            "/searchspareparts/p1?mfr=A",
            "/searchspareparts/b?mfr=B",
        ])),
    )
    .await;

    mount_page(
        server,
        "/searchspareparts/p1",
        "A",
        manufacturer_page(
            &[group(
                "Own stock warehouses",
                &[
                    row("0 986 494 104", "Brake pad", "$1,234.50"),
                    row("0 986 494 105", "Brake disc", "42"),
                ],
            )],
            Some("/searchspareparts/p2?mfr=A"),
        ),
    )
    .await;

    mount_page(
        server,
        "/searchspareparts/p2",
        "A",
        manufacturer_page(
            &[group(
                "Requested article",
                &[row("0 986 494 106", "Brake kit", "N/A")],
            )],
            Some("/searchspareparts/p3?mfr=A"),
        ),
    )
    .await;

    mount_page(
        server,
        "/searchspareparts/p3",
        "A",
        manufacturer_page(
            &[group(
                "Related Products",
                &[row("0 986 494 107", "Sensor", "10")],
            )],
            Some("/searchspareparts/p4?mfr=A"),
        ),
    )
    .await;

    mount_page(
        server,
        "/searchspareparts/b",
        "B",
        "<html><body>maintenance</body></html>".to_string(),
    )
    .await;
}

#[tokio::test]
async fn test_full_harvest_over_http() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), dir.path());
    let stats = Coordinator::new(config)
        .unwrap()
        .run(&[KEYWORD.to_string()], no_retry())
        .await
        .unwrap();

    assert_eq!(stats.keywords_searched, 1);
    assert_eq!(stats.manufacturers_discovered, 2);
    assert_eq!(stats.manufacturers_processed, 2);
    assert_eq!(stats.rows_written, 3);
    assert_eq!(stats.load_failures, 1);
    assert_eq!(stats.stop_reasons.get("category_halt"), Some(&1));
    assert_eq!(stats.stop_reasons.get("load_timeout"), Some(&1));

    // The halt page is captured too; B never loaded
    let captures = dir.path().join("captures");
    for page in 1..=3 {
        let name = format!("{} A page {}.html", KEYWORD, page);
        assert!(captures.join(&name).exists(), "missing capture {}", name);
    }
    assert!(!captures.join(format!("{} B page 1.html", KEYWORD)).exists());

    let artifact = stats.artifact.expect("artifact should be written");
    assert_eq!(artifact, dir.path().join("parts.csv"));
    let content = std::fs::read_to_string(&artifact).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4, "header plus three rows:\n{}", content);
    assert!(lines[0].starts_with("Keyword,Category,Manufacturer,Article,Name,"));

    // Worker completion order is not fixed, so look rows up by content
    let pad = lines
        .iter()
        .find(|line| line.contains("Brake pad"))
        .expect("brake pad row");
    assert!(pad.starts_with(&format!("{},Own stock warehouses,BOSCH", KEYWORD)));
    assert!(pad.contains("1234.50"));
    assert!(pad.contains("✔"));
    assert!(pad.contains(&format!("{}/part/0986494104", server.uri())));

    let kit = lines
        .iter()
        .find(|line| line.contains("Brake kit"))
        .expect("brake kit row");
    assert!(kit.contains("Requested article"));
    assert!(kit.contains("N/A"));

    assert!(!content.contains("Sensor"));
    assert!(!content.contains("Related Products"));
}

#[tokio::test]
async fn test_single_match_redirect_is_harvested() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "X1",
        ResponseTemplate::new(302).insert_header("Location", "/searchspareparts/r?mfr=C"),
    )
    .await;
    mount_page(
        &server,
        "/searchspareparts/r",
        "C",
        manufacturer_page(
            &[group("Own stock warehouses", &[row("X1", "Filter", "7.5")])],
            None,
        ),
    )
    .await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), dir.path());
    let stats = Coordinator::new(config)
        .unwrap()
        .run(&["X1".to_string()], no_retry())
        .await
        .unwrap();

    assert_eq!(stats.manufacturers_discovered, 1);
    assert_eq!(stats.rows_written, 1);
    assert_eq!(stats.stop_reasons.get("next_page_disabled"), Some(&1));
    assert!(dir.path().join("captures").join("X1 C page 1.html").exists());

    let content = std::fs::read_to_string(dir.path().join("parts.csv")).unwrap();
    assert!(content.contains("X1,Own stock warehouses,BOSCH,X1,Filter"));
    assert!(content.contains("7.50"));
}

#[tokio::test]
async fn test_no_results_writes_header_only_artifact() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "zzz",
        ResponseTemplate::new(200).set_body_string(
            r#"<html><body><span id="ctl00__content_SparePartsManufacturers1__errorLabel">None</span></body></html>"#,
        ),
    )
    .await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), dir.path());
    let stats = run_harvest(config, &["zzz".to_string()], no_retry())
        .await
        .unwrap();

    assert_eq!(stats.manufacturers_discovered, 0);
    assert_eq!(stats.rows_written, 0);

    let content = std::fs::read_to_string(dir.path().join("parts.csv")).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with("Keyword,"));
}

#[tokio::test]
async fn test_page_limit_stops_pagination() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server.uri(), dir.path());
    config.crawler.max_pages = Some(1);
    let stats = Coordinator::new(config)
        .unwrap()
        .run(&[KEYWORD.to_string()], no_retry())
        .await
        .unwrap();

    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.stop_reasons.get("page_limit"), Some(&1));
    assert!(!dir
        .path()
        .join("captures")
        .join(format!("{} A page 2.html", KEYWORD))
        .exists());
}

#[tokio::test]
async fn test_harvest_from_config_file() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");

    let toml = format!(
        r#"
keywords = ["{keyword}"]

[site]
base-url = "{uri}/"
search-url = "{uri}/search/?pcode={{keyword}}"

[crawler]
workers = 1
page-timeout-ms = 400
poll-interval-ms = 50

[browser]
backend = "http"

[user-agent]
crawler-name = "TestHarvester"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
directory = "{out}"
summary-path = "{out}/summary.md"
finalize-max-attempts = 1
"#,
        keyword = KEYWORD,
        uri = server.uri(),
        out = out.display()
    );
    let config_path = dir.path().join("harvester.toml");
    std::fs::write(&config_path, toml).unwrap();

    let (config, hash) = load_config_with_hash(&config_path).unwrap();
    assert_eq!(config.crawler.session_count(), 1);
    let keywords = config.keywords.clone();

    let stats = Coordinator::new(config)
        .unwrap()
        .with_config_hash(hash.clone())
        .run(&keywords, no_retry())
        .await
        .unwrap();

    assert_eq!(stats.config_hash.as_deref(), Some(hash.as_str()));
    assert_eq!(stats.rows_written, 3);
    assert!(out.join("APEC Auto Data.csv").exists());
    assert!(out.join("APEC Screenshots").is_dir());

    let summary = std::fs::read_to_string(out.join("summary.md")).unwrap();
    assert!(summary.contains("# Parts Harvest Summary"));
}

/// Manufacturer page whose pager posts back through a script link
fn postback_page(groups: &[String], script: &str) -> String {
    format!(
        r#"<html><body>{}<ul class="pager"><li class="page-next"><a href="javascript:{}">Next</a></li></ul></body></html>"#,
        groups.concat(),
        script
    )
}

async fn mount_postback_catalog(server: &MockServer) {
    mount_search(
        server,
        "PB1",
        ResponseTemplate::new(200)
            .set_body_string(listing(&["/searchspareparts/p1?mfr=P"])),
    )
    .await;
    mount_page(
        server,
        "/searchspareparts/p1",
        "P",
        postback_page(
            &[group("Own stock warehouses", &[row("PB1", "Pump", "12")])],
            "window.location.href='/searchspareparts/p2?mfr=P'",
        ),
    )
    .await;
    mount_page(
        server,
        "/searchspareparts/p2",
        "P",
        manufacturer_page(
            &[group("Requested article", &[row("PB2", "Pump seal", "3")])],
            None,
        ),
    )
    .await;
}

#[tokio::test]
async fn test_http_session_cannot_follow_postback_pager() {
    let server = MockServer::start().await;
    mount_postback_catalog(&server).await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), dir.path());
    let stats = Coordinator::new(config)
        .unwrap()
        .run(&["PB1".to_string()], no_retry())
        .await
        .unwrap();

    assert_eq!(stats.rows_written, 1);
    assert_eq!(stats.stop_reasons.get("next_page_failed"), Some(&1));
    assert!(dir.path().join("captures").join("PB1 P page 1.html").exists());
}

#[tokio::test]
#[ignore = "requires a local Chrome installation"]
async fn test_chrome_session_follows_postback_pager() {
    let server = MockServer::start().await;
    mount_postback_catalog(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(&server.uri(), dir.path());
    config.browser = BrowserConfig::default();
    config.crawler.sessions = Some(1);
    config.crawler.page_timeout_ms = 10_000;
    let stats = Coordinator::new(config)
        .unwrap()
        .run(&["PB1".to_string()], no_retry())
        .await
        .unwrap();

    assert_eq!(stats.rows_written, 2);
    assert_eq!(stats.stop_reasons.get("next_page_disabled"), Some(&1));
    let captures = dir.path().join("captures");
    assert!(captures.join("PB1 P page 1.png").exists());
    assert!(captures.join("PB1 P page 2.png").exists());

    let content = std::fs::read_to_string(dir.path().join("parts.csv")).unwrap();
    assert!(content.contains("Pump seal"));
}
