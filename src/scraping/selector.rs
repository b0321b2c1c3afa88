//! Adapter selection: host-substring table, first match wins.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::extraction::trend::TrendWeights;
use crate::infrastructure::http_client::HttpClient;
use crate::scraping::adapter::SourceAdapter;
use crate::scraping::browser::Browser;
use crate::scraping::feed::ShopifyAdapter;
use crate::scraping::generic::GenericAdapter;
use crate::scraping::hm::HmAdapter;
use crate::scraping::lilly::LillyAdapter;
use crate::scraping::sample::SampleAdapter;
use crate::scraping::shein::SheinAdapter;
use crate::scraping::tullabee::TullabeeAdapter;
use crate::scraping::zara::ZaraAdapter;

/// Which concrete adapter serves a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AdapterKind {
    Shein,
    Zara,
    Hm,
    Tullabee,
    Lilly,
    Shopify,
}

/// Ordered host-substring table. Matching is case-insensitive substring
/// against the www-stripped host, first entry wins — so specific hosts
/// (e.g. `tullabee`, which is Shopify-but-gated) must precede the broad
/// Shopify boutique entries, and no two entries may ambiguously overlap.
const HOST_TABLE: &[(&str, AdapterKind)] = &[
    ("shein", AdapterKind::Shein),
    ("zara", AdapterKind::Zara),
    ("hm.com", AdapterKind::Hm),
    ("www2.hm", AdapterKind::Hm),
    ("tullabee", AdapterKind::Tullabee),
    ("lillypulitzer", AdapterKind::Lilly),
    ("classicwhimsy", AdapterKind::Shopify),
    ("shrimpandgritskids", AdapterKind::Shopify),
    ("jamiekay", AdapterKind::Shopify),
    ("gigiandmax", AdapterKind::Shopify),
    ("stitchyfish", AdapterKind::Shopify),
    ("littlebearsmocks", AdapterKind::Shopify),
    ("zuccinikids", AdapterKind::Shopify),
    ("marienicoleclothing", AdapterKind::Shopify),
    ("morninglavender", AdapterKind::Shopify),
    ("matildajaneclothing", AdapterKind::Shopify),
];

/// Builds adapters for target URLs. Holds the shared HTTP client and
/// browser handle so adapters stay cheap to construct per job.
pub struct AdapterRegistry {
    http: Arc<HttpClient>,
    browser: Arc<dyn Browser>,
    weights: TrendWeights,
    demo_mode: bool,
}

impl AdapterRegistry {
    pub fn new(
        http: Arc<HttpClient>,
        browser: Arc<dyn Browser>,
        weights: TrendWeights,
        demo_mode: bool,
    ) -> Self {
        Self {
            http,
            browser,
            weights,
            demo_mode,
        }
    }

    fn host_of(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .map(|host| host.strip_prefix("www.").unwrap_or(&host).to_string())
            .unwrap_or_default()
    }

    /// Pick the adapter for a URL. Demo mode bypasses matching entirely;
    /// unknown hosts fall back to the generic rendered-page adapter.
    pub fn select(&self, url: &str) -> Box<dyn SourceAdapter> {
        if self.demo_mode {
            debug!("Demo mode active, using sample adapter for {}", url);
            return Box::new(SampleAdapter::new(Arc::clone(&self.http), self.weights));
        }

        let host = Self::host_of(url);
        let kind = HOST_TABLE
            .iter()
            .find(|(pattern, _)| host.contains(pattern))
            .map(|(_, kind)| *kind);

        match kind {
            Some(AdapterKind::Shein) => Box::new(SheinAdapter::new(
                Arc::clone(&self.http),
                Arc::clone(&self.browser),
                self.weights,
            )),
            Some(AdapterKind::Zara) => Box::new(ZaraAdapter::new(
                Arc::clone(&self.http),
                Arc::clone(&self.browser),
                self.weights,
            )),
            Some(AdapterKind::Hm) => Box::new(HmAdapter::new(
                Arc::clone(&self.http),
                Arc::clone(&self.browser),
                self.weights,
            )),
            Some(AdapterKind::Tullabee) => Box::new(TullabeeAdapter::new(
                Arc::clone(&self.http),
                Arc::clone(&self.browser),
                self.weights,
            )),
            Some(AdapterKind::Lilly) => Box::new(LillyAdapter::new(
                Arc::clone(&self.http),
                Arc::clone(&self.browser),
                self.weights,
            )),
            Some(AdapterKind::Shopify) => {
                Box::new(ShopifyAdapter::new(Arc::clone(&self.http), self.weights))
            }
            None => {
                debug!("No dedicated adapter for host '{}', using generic", host);
                Box::new(GenericAdapter::new(
                    Arc::clone(&self.http),
                    Arc::clone(&self.browser),
                    self.weights,
                ))
            }
        }
    }

    /// Hosts with a dedicated adapter, for operator-facing listings.
    pub fn supported_hosts() -> Vec<&'static str> {
        HOST_TABLE.iter().map(|(pattern, _)| *pattern).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::HttpClientConfig;
    use crate::scraping::browser::StaticBrowser;

    fn registry(demo: bool) -> AdapterRegistry {
        let http = Arc::new(HttpClient::new(HttpClientConfig::default()).unwrap());
        let browser = Arc::new(StaticBrowser::new(Arc::clone(&http)));
        AdapterRegistry::new(http, browser, TrendWeights::default(), demo)
    }

    #[test]
    fn host_matching_strips_www_and_is_case_insensitive() {
        assert_eq!(AdapterRegistry::host_of("https://WWW.Zara.com/us/"), "zara.com");
        assert_eq!(AdapterRegistry::host_of("not a url"), "");
    }

    #[test]
    fn dedicated_hosts_map_to_their_adapters() {
        let registry = registry(false);
        assert_eq!(registry.select("https://us.shein.com/trends").name(), "shein");
        assert_eq!(registry.select("https://www.zara.com/us/").name(), "zara");
        assert_eq!(registry.select("https://www2.hm.com/en_us/").name(), "hm");
        assert_eq!(registry.select("https://tullabee.com/collections/all").name(), "tullabee");
        assert_eq!(
            registry.select("https://www.lillypulitzer.com/new-arrivals/").name(),
            "lillypulitzer"
        );
        assert_eq!(
            registry.select("https://classicwhimsy.com/collections/best-sellers").name(),
            "shopify"
        );
    }

    #[test]
    fn unknown_host_falls_back_to_generic() {
        let registry = registry(false);
        assert_eq!(registry.select("https://boutique.example.com/shop").name(), "generic");
    }

    #[test]
    fn demo_mode_bypasses_matching() {
        let registry = registry(true);
        assert_eq!(registry.select("https://us.shein.com/trends").name(), "sample");
    }
}
