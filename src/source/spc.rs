//! Storm Prediction Center outlook client.
//!
//! Listing: `/cgi-bin-spc/getacrange.pl?date0=YYYYMMDD&date1=YYYYMMDD`
//! returns an HTML page whose fourth table holds the day's outlook links.
//! Each outlook page keeps the discussion in a `<pre>` and the categorical
//! map in the first `<img>` of its second table.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{Outlook, OutlookSource, Result, SourceError};

/// Default SPC website
pub const DEFAULT_SPC_URL: &str = "https://www.spc.noaa.gov";

const LISTING_PATH: &str = "/cgi-bin-spc/getacrange.pl";
const USER_AGENT: &str = concat!("spcview/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector")
}

/// HTTP-backed outlook source
pub struct SpcClient {
    base: Url,
    client: reqwest::Client,
}

impl SpcClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| SourceError::Url(e.to_string()))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { base, client })
    }

    fn resolve(&self, href: &str) -> Result<Url> {
        self.base
            .join(href)
            .map_err(|e| SourceError::Url(format!("{}: {}", href, e)))
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl OutlookSource for SpcClient {
    async fn list_outlooks(&self, date: NaiveDate) -> Result<Vec<String>> {
        let mut url = self.resolve(LISTING_PATH)?;
        let day = date.format("%Y%m%d").to_string();
        url.query_pairs_mut()
            .append_pair("date0", &day)
            .append_pair("date1", &day);

        let body = self.get(url).await?.text().await?;
        let ids = parse_listing(&body);
        info!(date = %day, count = ids.len(), "listed outlooks");
        Ok(ids)
    }

    async fn fetch_outlook(&self, id: &str) -> Result<Outlook> {
        let url = self.resolve(id)?;
        let body = self.get(url.clone()).await?.text().await?;
        parse_outlook(&body, &url)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        if url.is_empty() {
            return Err(SourceError::DataUnavailable("outlook has no image".to_string()));
        }
        let url = self.resolve(url)?;
        let bytes = self.get(url).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Trimmed `.html` hrefs under `root`, in document order
fn html_links(root: ElementRef<'_>) -> Vec<String> {
    root.select(&selector("a[href]"))
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| href.ends_with(".html"))
        .collect()
}

/// Pull outlook identifiers out of a listing page
pub fn parse_listing(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let table = selector("table");

    let listing = document
        .select(&table)
        .nth(3)
        .and_then(|outer| outer.select(&selector("tr")).next())
        .and_then(|row| row.children().filter_map(ElementRef::wrap).nth(2))
        .and_then(|cell| cell.select(&table).next());

    match listing {
        Some(listing) => html_links(listing),
        None => {
            debug!("listing table not found, scanning all links");
            html_links(document.root_element())
                .into_iter()
                .filter(|href| href.contains("/products/outlook/"))
                .collect()
        }
    }
}

/// Pull the discussion and map URL out of an outlook page at `page`
pub fn parse_outlook(html: &str, page: &Url) -> Result<Outlook> {
    let document = Html::parse_document(html);
    let content = document
        .select(&selector("table"))
        .nth(1)
        .ok_or_else(|| SourceError::DataUnavailable(format!("{}: no content table", page)))?;

    let text = content
        .select(&selector("pre"))
        .next()
        .map(|pre| pre.text().collect::<String>())
        .unwrap_or_default();

    let image_url = content
        .select(&selector("img[src]"))
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| page.join(src.trim()).ok())
        .map(|url| url.to_string())
        .unwrap_or_default();

    Ok(Outlook { text, image_url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const LISTING: &str = r#"<html><body>
        <table><tr><td>header</td></tr></table>
        <table><tr><td>nav</td></tr></table>
        <table><tr><td>search</td></tr></table>
        <table>
          <tr>
            <td>left</td>
            <td>spacer</td>
            <td>
              <table>
                <tr><td><a href=" /products/outlook/archive/2024/day1otlk_20240501_0100.html ">0100</a></td></tr>
                <tr><td><a href="/products/outlook/archive/2024/day1otlk_20240501_1300.html">1300</a></td></tr>
                <tr><td><a href="/products/outlook/archive/2024/day1otlk_20240501_1300.gif">map</a></td></tr>
                <tr><td><a href="/products/outlook/archive/2024/day2otlk_20240501_0600.html">0600</a></td></tr>
              </table>
            </td>
          </tr>
        </table>
        <a href="/products/outlook/archive/2024/unrelated.html">footer</a>
    </body></html>"#;

    const OUTLOOK: &str = r#"<html><body>
        <table><tr><td>banner</td></tr></table>
        <table>
          <tr><td><img src="day1otlk_20240501_1300.png"></td></tr>
          <tr><td><pre>
   SPC AC 011252

   Day 1 Convective Outlook
</pre></td></tr>
        </table>
    </body></html>"#;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_listing() {
        assert_eq!(
            parse_listing(LISTING),
            ids(&[
                "/products/outlook/archive/2024/day1otlk_20240501_0100.html",
                "/products/outlook/archive/2024/day1otlk_20240501_1300.html",
                "/products/outlook/archive/2024/day2otlk_20240501_0600.html",
            ])
        );
    }

    #[test]
    fn test_parse_listing_fallback() {
        let html = r#"<p><a href="/products/outlook/day3otlk_0730.html">d3</a>
            <a href="/misc/page.html">other</a></p>"#;
        assert_eq!(parse_listing(html), ids(&["/products/outlook/day3otlk_0730.html"]));
        assert!(parse_listing("<html></html>").is_empty());
    }

    #[test]
    fn test_parse_outlook() {
        let page =
            Url::parse("https://www.spc.noaa.gov/products/outlook/archive/2024/day1otlk_20240501_1300.html")
                .unwrap();
        let outlook = parse_outlook(OUTLOOK, &page).unwrap();
        assert!(outlook.text.contains("SPC AC 011252"));
        assert!(outlook.text.contains("Day 1 Convective Outlook"));
        assert_eq!(
            outlook.image_url,
            "https://www.spc.noaa.gov/products/outlook/archive/2024/day1otlk_20240501_1300.png"
        );
    }

    #[test]
    fn test_parse_outlook_missing_parts() {
        let page = Url::parse("https://www.spc.noaa.gov/x.html").unwrap();
        let outlook = parse_outlook("<table></table><table><tr><td>x</td></tr></table>", &page).unwrap();
        assert_eq!(outlook, Outlook { text: String::new(), image_url: String::new() });

        assert!(matches!(
            parse_outlook("<p>gone</p>", &page),
            Err(SourceError::DataUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_list_outlooks_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("date0", "20240501"))
            .and(query_param("date1", "20240501"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let client = SpcClient::new(&server.uri()).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let listed = client.list_outlooks(date).await.unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_outlook_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/outlook/day1otlk.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OUTLOOK))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/products/outlook/day1otlk_20240501_1300.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .mount(&server)
            .await;

        let client = SpcClient::new(&server.uri()).unwrap();
        let outlook = client.fetch_outlook("/products/outlook/day1otlk.html").await.unwrap();
        assert_eq!(
            outlook.image_url,
            format!("{}/products/outlook/day1otlk_20240501_1300.png", server.uri())
        );

        let image = client.fetch_image(&outlook.image_url).await.unwrap();
        assert_eq!(image, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_missing_page_is_status_error() {
        let server = MockServer::start().await;
        let client = SpcClient::new(&server.uri()).unwrap();
        let result = client.fetch_outlook("/products/outlook/nope.html").await;
        assert!(matches!(result, Err(SourceError::Status(404))));
        assert!(matches!(
            client.fetch_image("").await,
            Err(SourceError::DataUnavailable(_))
        ));
    }
}
