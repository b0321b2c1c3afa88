//! Selector-cascade extraction helpers and the scroll-settle loop shared
//! by the rendered-page adapters.
//!
//! Target sites redesign their markup without notice; every field is
//! therefore extracted by trying an ordered list of candidate selectors,
//! first non-empty result wins. All DOM work is synchronous on a parsed
//! snapshot so the async adapters never hold a document across awaits.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::scraping::browser::{PageSession, RenderError};

/// Attributes tried, in order, when resolving an image URL; lazy-loading
/// placements hide the real URL behind data attributes.
const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original", "srcset"];

/// First selector in the cascade that yields non-empty trimmed text.
pub fn first_text(scope: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(text) = scope
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty())
        {
            return Some(text);
        }
    }
    None
}

/// First selector in the cascade whose first match carries a non-empty
/// value for `attr`.
pub fn first_attr(scope: ElementRef<'_>, selectors: &[&str], attr: &str) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(value) = scope
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
        {
            return Some(value.to_string());
        }
    }
    None
}

/// Product card elements: the first grid selector that matches anything
/// wins the whole cascade.
pub fn select_cards<'a>(doc: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let cards: Vec<ElementRef<'a>> = doc.select(&selector).collect();
        if !cards.is_empty() {
            return cards;
        }
    }
    Vec::new()
}

/// Resolve an href against the page base; protocol-relative URLs become
/// https.
pub fn resolve_url(href: &str, base: &Url) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        base.join(href).map(|u| u.to_string()).unwrap_or_else(|_| href.to_string())
    }
}

/// Image URL from the first `<img>` in scope, trying direct, lazy-load and
/// srcset attributes in priority order. For srcset the first URL token is
/// taken.
pub fn image_url(scope: ElementRef<'_>, base: &Url) -> String {
    let Ok(img_selector) = Selector::parse("img") else {
        return String::new();
    };
    for img in scope.select(&img_selector) {
        for attr in IMAGE_ATTRS {
            if let Some(raw) = img.value().attr(attr) {
                let token = raw.split_whitespace().next().unwrap_or("");
                if token.is_empty() {
                    continue;
                }
                let resolved = resolve_url(token, base);
                if resolved.starts_with("http") {
                    return resolved;
                }
            }
        }
    }
    String::new()
}

/// Product link: the card element itself when it is an anchor, otherwise
/// the first anchor inside it. Falls back to the page URL.
pub fn link_url(scope: ElementRef<'_>, base: &Url) -> String {
    if scope.value().name() == "a" {
        if let Some(href) = scope.value().attr("href") {
            return resolve_url(href, base);
        }
    }
    let Ok(anchor) = Selector::parse("a") else {
        return base.to_string();
    };
    scope
        .select(&anchor)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| resolve_url(href, base))
        .next()
        .unwrap_or_else(|| base.to_string())
}

/// External id for a card: prefer a data attribute the site exposes,
/// otherwise derive it from the product URL path (stable across scrapes,
/// unlike a generated uuid).
pub fn external_id(scope: ElementRef<'_>, id_attrs: &[&str], product_url: &str) -> String {
    for attr in id_attrs {
        if let Some(value) = scope.value().attr(attr) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    id_from_url(product_url)
}

/// Clamp display text to at most `max` characters, safely across
/// multi-byte names.
pub fn clamp_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Last meaningful path segment of a product URL.
pub fn id_from_url(product_url: &str) -> String {
    Url::parse(product_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(String::from))
        })
        .unwrap_or_else(|| product_url.to_string())
}

/// Knobs for the scroll/click settle loop.
pub struct SettleOptions<'a> {
    /// Comma-joined grid selector counted each round.
    pub grid_selector: &'a str,
    /// "Load more" control cascade, clicked when scrolling stalls.
    pub load_more_selectors: &'a [&'a str],
    pub max_rounds: u32,
    /// Humanized inter-round pause bounds, milliseconds.
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// Scroll (and click "load more" when scrolling stalls) until the grid
/// holds `target` elements, the round ceiling is hit, or the page stops
/// growing with no control left to click. Returns the final element count.
pub async fn settle_listing(
    page: &mut Box<dyn PageSession>,
    opts: &SettleOptions<'_>,
    target: usize,
) -> Result<usize, RenderError> {
    let mut last_count = 0usize;
    let mut count = 0usize;
    let mut stalled_rounds = 0u32;

    for round in 0..opts.max_rounds {
        count = page.element_count(opts.grid_selector).await?;
        tracing::debug!("settle round {}: {} elements", round + 1, count);

        if count >= target {
            break;
        }

        if count == last_count && round > 0 {
            stalled_rounds += 1;
            // Lazy loading is done; an explicit control is the only way to
            // get more. No control, no progress: the listing is settled.
            let clicked = if opts.load_more_selectors.is_empty() {
                false
            } else {
                page.click_first(opts.load_more_selectors).await?
            };
            if clicked {
                stalled_rounds = 0;
                tokio::time::sleep(Duration::from_millis(opts.max_delay_ms)).await;
            } else if stalled_rounds >= 2 {
                break;
            }
        } else {
            stalled_rounds = 0;
        }

        last_count = count;
        page.scroll_by_viewport().await?;

        let delay = if opts.max_delay_ms > opts.min_delay_ms {
            fastrand::u64(opts.min_delay_ms..=opts.max_delay_ms)
        } else {
            opts.min_delay_ms
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_takes_first_non_empty() {
        let doc = Html::parse_fragment(
            r#"<div class="card"><span class="empty"></span><h3 class="title">Knit Midi</h3></div>"#,
        );
        let root = doc.root_element();
        assert_eq!(
            first_text(root, &[".empty", ".title", "h3"]),
            Some("Knit Midi".to_string())
        );
        assert_eq!(first_text(root, &[".nope", ".nada"]), None);
    }

    #[test]
    fn image_url_prefers_direct_then_lazy_then_srcset() {
        let base = Url::parse("https://shop.example.com/list").unwrap();

        let lazy = Html::parse_fragment(r#"<div><img data-src="//cdn.example.com/a.jpg"></div>"#);
        assert_eq!(
            image_url(lazy.root_element(), &base),
            "https://cdn.example.com/a.jpg"
        );

        let srcset = Html::parse_fragment(
            r#"<div><img srcset="https://cdn.example.com/b.jpg 1x, https://cdn.example.com/b2.jpg 2x"></div>"#,
        );
        assert_eq!(
            image_url(srcset.root_element(), &base),
            "https://cdn.example.com/b.jpg"
        );
    }

    #[test]
    fn link_resolution_against_base() {
        let base = Url::parse("https://shop.example.com/collections/all").unwrap();
        let doc = Html::parse_fragment(r#"<div><a href="/products/knit-midi">x</a></div>"#);
        assert_eq!(
            link_url(doc.root_element(), &base),
            "https://shop.example.com/products/knit-midi"
        );
    }

    #[test]
    fn external_id_from_url_path() {
        assert_eq!(
            id_from_url("https://shop.example.com/products/knit-midi?variant=2"),
            "knit-midi"
        );
    }
}
