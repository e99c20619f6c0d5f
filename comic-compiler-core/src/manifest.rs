//! Scrapes the title and the ordered image list out of an issue page.
//!
//! Both lookups are tables of rules evaluated in priority order; each rule is a
//! pure function over the parsed document and the first one to produce a value
//! wins.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};

use crate::contract::{Fetcher, ImageManifest};
use crate::error::FetchError;

pub const UNKNOWN_TITLE: &str = "Unknown Comic";

const CHAPTER_SELECTOR: &str = ".chapters_selectbox_holder";
const READING_CONTENT: &str = "div.reading-content";

/// Attributes holding an image location, most direct first.
const IMAGE_SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src"];

type TitleRule = fn(&Html, Option<&Url>) -> Option<String>;

const TITLE_RULES: &[(&str, TitleRule)] = &[
    ("chapter_selector", chapter_selector_title),
    ("heading", heading_title),
    ("url_slug", url_slug_title),
];

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            error!(css, error = ?e, "Invalid CSS selector");
            None
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn chapter_selector_title(doc: &Html, _page_url: Option<&Url>) -> Option<String> {
    let holder = doc.select(&selector(CHAPTER_SELECTOR)?).next()?;
    let selected = selector("option[selected]")
        .and_then(|sel| holder.select(&sel).next())
        .map(element_text)
        .and_then(non_empty);
    selected.or_else(|| {
        let first = holder.select(&selector("option")?).next()?;
        non_empty(element_text(first))
    })
}

fn heading_title(doc: &Html, _page_url: Option<&Url>) -> Option<String> {
    ["h1", "title"].into_iter().find_map(|css| {
        let element = doc.select(&selector(css)?).next()?;
        let collapsed = element
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        non_empty(collapsed)
    })
}

fn url_slug_title(_doc: &Html, page_url: Option<&Url>) -> Option<String> {
    let slug = page_url?
        .path()
        .trim_matches('/')
        .rsplit('/')
        .next()?
        .replace('-', " ");
    non_empty(title_case(&slug))
}

/// Capitalise the first letter of every word and lowercase the rest.
///
/// A word starts at any letter that does not follow another letter, so
/// `"issue 01b"` becomes `"Issue 01B"`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

fn resolve_title(doc: &Html, page_url: Option<&Url>) -> String {
    for (name, rule) in TITLE_RULES {
        if let Some(title) = rule(doc, page_url) {
            debug!(rule = *name, title = %title, "Resolved issue title");
            return title;
        }
    }
    UNKNOWN_TITLE.to_string()
}

fn image_source<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    IMAGE_SOURCE_ATTRS
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty())
}

fn resolve_images(doc: &Html, page_url: Option<&Url>) -> Vec<String> {
    let Some(container) = selector(READING_CONTENT).and_then(|sel| doc.select(&sel).next())
    else {
        return Vec::new();
    };
    let Some(img_selector) = selector("img") else {
        return Vec::new();
    };
    container
        .select(&img_selector)
        .filter_map(|img| {
            let src = image_source(&img)?;
            let absolute = match page_url {
                Some(base) => base.join(src).ok()?,
                None => Url::parse(src).ok()?,
            };
            Some(absolute.to_string())
        })
        .collect()
}

/// Extract the manifest from already fetched page markup.
pub fn extract(page_content: &str, page_url: &str) -> ImageManifest {
    let doc = Html::parse_document(page_content);
    let base = Url::parse(page_url).ok();
    ImageManifest {
        title: resolve_title(&doc, base.as_ref()),
        image_urls: resolve_images(&doc, base.as_ref()),
    }
}

/// Fetch `page_url` and extract its manifest.
///
/// A failed fetch is logged and yields an empty manifest titled
/// [`UNKNOWN_TITLE`], which makes the caller skip the issue.
pub async fn fetch_manifest<F>(fetcher: &F, page_url: &str) -> ImageManifest
where
    F: Fetcher + ?Sized,
{
    info!(url = %page_url, "Fetching issue page");
    let body = match fetcher.fetch(page_url).await {
        Ok(body) => body,
        Err(source) => {
            let err = FetchError {
                url: page_url.to_string(),
                source,
            };
            error!(error = %err, "Could not fetch issue page");
            return ImageManifest {
                title: UNKNOWN_TITLE.to_string(),
                image_urls: Vec::new(),
            };
        }
    };
    let manifest = extract(&String::from_utf8_lossy(&body), page_url);
    if manifest.image_urls.is_empty() {
        warn!(url = %page_url, "No reading-content images found on page");
    } else {
        info!(
            url = %page_url,
            title = %manifest.title,
            images = manifest.image_urls.len(),
            "Found images on page"
        );
    }
    manifest
}
