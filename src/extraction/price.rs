//! Price and count parsing for scraped text fragments.

use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d.]+").expect("static regex"));
static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("static regex"));
static COUNT_K_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([\d.]+)k").expect("static regex"));

/// Parse a price out of display text like `"$29.99"`, `"1.299,00 €"` or
/// `"29.99 USD"`. Unparseable input yields 0.0, never an error.
pub fn parse_price(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }
    // Drop thousands separators first, then keep digits and the decimal dot.
    let cleaned: String = text
        .replace(',', "")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    PRICE_RE
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Parse review/sales counts written as `"1,234"`, `"567 sold"` or the
/// shorthand `"1.2k"`.
pub fn parse_count(text: &str) -> u32 {
    if text.trim().is_empty() {
        return 0;
    }
    let lowered = text.to_lowercase().replace(',', "");
    if lowered.contains('k') {
        if let Some(caps) = COUNT_K_RE.captures(&lowered) {
            if let Ok(value) = caps[1].parse::<f64>() {
                return (value * 1000.0) as u32;
            }
        }
    }
    COUNT_RE
        .captures(&lowered)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .unwrap_or(0)
}

/// Parse a star rating out of either a `width: NN%` style attribute
/// (five-star bar) or plain text like `"4.6"`. Clamped to [0, 5].
pub fn parse_rating(text: &str) -> f64 {
    static WIDTH_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"width:\s*([\d.]+)%").expect("static regex"));
    if let Some(caps) = WIDTH_RE.captures(text) {
        if let Ok(pct) = caps[1].parse::<f64>() {
            return ((pct / 20.0) * 10.0).round() / 10.0;
        }
    }
    PRICE_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|v| v.min(5.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("$29.99", 29.99)]
    #[case("29.99 USD", 29.99)]
    #[case("1,299.00", 1299.0)]
    #[case("€45", 45.0)]
    #[case("free", 0.0)]
    #[case("", 0.0)]
    fn price_parsing(#[case] input: &str, #[case] expected: f64) {
        assert!((parse_price(input) - expected).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case("1,234", 1234)]
    #[case("1.2k", 1200)]
    #[case("567 sold", 567)]
    #[case("", 0)]
    #[case("none yet", 0)]
    fn count_parsing(#[case] input: &str, #[case] expected: u32) {
        assert_eq!(parse_count(input), expected);
    }

    #[test]
    fn rating_from_star_bar_width() {
        assert!((parse_rating("width: 90%") - 4.5).abs() < f64::EPSILON);
        assert!((parse_rating("4.8 out of 5") - 4.8).abs() < f64::EPSILON);
        assert!((parse_rating("9.9") - 5.0).abs() < f64::EPSILON);
    }
}
