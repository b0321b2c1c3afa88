//! Category inference from product names and URL paths.

use crate::domain::FashionCategory;

/// Ordered keyword table; the first category whose keyword list matches
/// wins, so more specific garments (dress, skirt) sit before catch-alls.
const CATEGORY_KEYWORDS: &[(FashionCategory, &[&str])] = &[
    (FashionCategory::Dress, &["dress", "gown", "romper", "jumpsuit", "maxi", "midi dress"]),
    (FashionCategory::Swimwear, &["bikini", "swimsuit", "swimwear", "swim"]),
    (
        FashionCategory::Activewear,
        &["activewear", "yoga", "athletic", "workout", "sports bra", "gym"],
    ),
    (FashionCategory::Skirt, &["skirt", "skort"]),
    (FashionCategory::Coat, &["coat", "parka", "trench", "puffer", "overcoat", "outerwear"]),
    (FashionCategory::Jacket, &["jacket", "blazer", "bomber", "cardigan", "hoodie"]),
    (
        FashionCategory::Pants,
        &["pants", "jeans", "trousers", "legging", "joggers", "shorts", "capri"],
    ),
    (
        FashionCategory::Shoes,
        &["shoes", "boots", "sneakers", "heels", "sandals", "footwear", "slides"],
    ),
    (
        FashionCategory::Accessories,
        &["bag", "tote", "hat", "scarf", "belt", "jewelry", "bow", "headband"],
    ),
    (
        FashionCategory::Top,
        &["top", "shirt", "blouse", "tee", "t-shirt", "sweater", "tank", "tunic", "pullover"],
    ),
];

/// Infers categories from free text with a per-adapter default. Sites that
/// specialize (e.g. kids' dresswear boutiques) default to `Dress`; general
/// apparel sites default to `Top`.
#[derive(Debug, Clone, Copy)]
pub struct CategoryMatcher {
    default: FashionCategory,
}

impl CategoryMatcher {
    pub fn new(default: FashionCategory) -> Self {
        Self { default }
    }

    pub fn default_category(&self) -> FashionCategory {
        self.default
    }

    /// First keyword match in table order, or None.
    pub fn infer(text: &str) -> Option<FashionCategory> {
        let lowered = text.to_lowercase();
        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|(category, _)| *category)
    }

    /// Infer from a product name, falling back to this matcher's default.
    pub fn infer_or_default(&self, name: &str) -> FashionCategory {
        Self::infer(name).unwrap_or(self.default)
    }

    /// Category hint from a listing URL path ("/women/dresses/"), used by
    /// rendered adapters to override per-item guesses when the whole page
    /// is a single-category listing.
    pub fn from_url(url: &str) -> Option<FashionCategory> {
        Self::infer(url)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Floral Maxi Dress", FashionCategory::Dress)]
    #[case("High-Waist Leggings", FashionCategory::Pants)]
    #[case("Pleated Midi Skirt", FashionCategory::Skirt)]
    #[case("Cropped Leather Jacket", FashionCategory::Jacket)]
    #[case("Wool Blend Overcoat", FashionCategory::Coat)]
    #[case("Chain Link Belt", FashionCategory::Accessories)]
    #[case("Silk Button-Up Shirt", FashionCategory::Top)]
    fn keyword_inference(#[case] name: &str, #[case] expected: FashionCategory) {
        assert_eq!(CategoryMatcher::infer(name), Some(expected));
    }

    #[test]
    fn no_match_falls_back_to_adapter_default() {
        let general = CategoryMatcher::new(FashionCategory::Top);
        let kids = CategoryMatcher::new(FashionCategory::Dress);
        assert_eq!(general.infer_or_default("Mystery Box"), FashionCategory::Top);
        assert_eq!(kids.infer_or_default("Mystery Box"), FashionCategory::Dress);
    }

    #[test]
    fn url_path_detection() {
        assert_eq!(
            CategoryMatcher::from_url("https://example.com/kids-girl-dresses-l6057.html"),
            Some(FashionCategory::Dress)
        );
        assert_eq!(CategoryMatcher::from_url("https://example.com/sale"), None);
    }

    #[test]
    fn leggings_alone_reads_as_pants_in_workout_context_only_when_tagged() {
        // "workout" wins over "legging" because activewear precedes pants.
        assert_eq!(
            CategoryMatcher::infer("Workout Leggings"),
            Some(FashionCategory::Activewear)
        );
        assert_eq!(CategoryMatcher::infer("Faux Leather Leggings"), Some(FashionCategory::Pants));
    }
}
