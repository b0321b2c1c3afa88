//! Color and tag extraction against fixed keyword vocabularies.

/// Colors we recognize in product names and variant options.
const COLOR_KEYWORDS: &[&str] = &[
    "pink", "blue", "red", "white", "black", "green", "yellow", "purple", "gray", "grey",
    "navy", "cream", "ivory", "beige", "tan", "camel", "olive", "sage", "coral", "burgundy",
    "lavender", "gold", "silver", "brown",
];

/// Style/occasion descriptors promoted to tags.
const TAG_KEYWORDS: &[&str] = &[
    "casual", "elegant", "vintage", "boho", "minimalist", "floral", "striped", "solid",
    "printed", "lace", "knit", "satin", "leather", "linen", "summer", "winter", "spring",
    "fall", "party", "office", "beach", "workout", "oversized", "cropped", "fitted",
    "plus size", "petite", "maternity", "smocked",
];

/// Internal/system tag prefixes that never surface to the catalog.
const SKIP_TAG_PREFIXES: &[&str] = &["feed-", "supplier-", "return_", "season_", "color_"];

pub const MAX_COLORS: usize = 5;
pub const MAX_TAGS: usize = 10;

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Scan free text for known color words, first occurrence order, capped.
pub fn extract_colors(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut colors = Vec::new();
    for keyword in COLOR_KEYWORDS {
        if colors.len() >= MAX_COLORS {
            break;
        }
        if lowered.contains(keyword) {
            let color = title_case(keyword);
            if !colors.contains(&color) {
                colors.push(color);
            }
        }
    }
    colors
}

/// True when a variant option string looks like a color name.
pub fn looks_like_color(option: &str) -> bool {
    let lowered = option.to_lowercase();
    COLOR_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Scan free text for known style descriptors, capped.
pub fn extract_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tags = Vec::new();
    for keyword in TAG_KEYWORDS {
        if tags.len() >= MAX_TAGS {
            break;
        }
        if lowered.contains(keyword) && !tags.iter().any(|t| t == keyword) {
            tags.push((*keyword).to_string());
        }
    }
    tags
}

/// Clean source-provided tag metadata: drop internal prefixes, normalize
/// underscores, keep at most `MAX_TAGS`.
pub fn clean_source_tags(raw: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for tag in raw {
        if tags.len() >= MAX_TAGS {
            break;
        }
        let lowered = tag.to_lowercase();
        if SKIP_TAG_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            continue;
        }
        let cleaned: String = tag
            .replace('_', " ")
            .split_whitespace()
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ");
        if cleaned.len() > 2 && !tags.contains(&cleaned) {
            tags.push(cleaned);
        }
    }
    tags
}

/// Pull a color name out of a `color_navy` style tag.
pub fn color_from_tag(tag: &str) -> Option<String> {
    let lowered = tag.to_lowercase();
    lowered
        .strip_prefix("color_")
        .map(|rest| title_case(rest.split('_').next().unwrap_or(rest)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_capped_and_deduped() {
        let text = "pink blue red white black green yellow navy";
        let colors = extract_colors(text);
        assert_eq!(colors.len(), MAX_COLORS);
        assert_eq!(colors[0], "Pink");
    }

    #[test]
    fn source_tags_skip_internal_prefixes() {
        let raw = vec![
            "feed-2024".to_string(),
            "color_navy".to_string(),
            "smocked_dress".to_string(),
            "heirloom".to_string(),
        ];
        let tags = clean_source_tags(&raw);
        assert_eq!(tags, vec!["Smocked Dress".to_string(), "Heirloom".to_string()]);
    }

    #[test]
    fn color_tag_prefix() {
        assert_eq!(color_from_tag("color_navy"), Some("Navy".to_string()));
        assert_eq!(color_from_tag("pattern_floral"), None);
    }

    #[test]
    fn tags_from_name() {
        let tags = extract_tags("Oversized Linen Summer Shirt");
        assert!(tags.contains(&"linen".to_string()));
        assert!(tags.contains(&"summer".to_string()));
        assert!(tags.contains(&"oversized".to_string()));
    }
}
