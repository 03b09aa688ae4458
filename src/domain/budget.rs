use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit regex"));

/// Extracts the minimum bid amount from a free-text budget string.
///
/// Thousands separators are stripped, then the first contiguous digit run is
/// taken as the amount. The observed marketplace formats list the lower bound
/// first ("Budget £10 – 20 GBP"); that ordering is an assumption about the
/// site, not a guaranteed parse. Strings without digits yield 0.
pub fn parse_min_budget(raw: &str) -> u32 {
    let cleaned = raw.replace(',', "");
    DIGIT_RUN
        .find(&cleaned)
        .and_then(|run| run.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_digit_run_as_minimum() {
        assert_eq!(parse_min_budget("Budget £10 – 20 GBP"), 10);
        assert_eq!(parse_min_budget("$500-800"), 500);
        assert_eq!(parse_min_budget("€250 EUR per hour"), 250);
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(parse_min_budget("1,250 USD"), 1250);
        assert_eq!(parse_min_budget("Budget: 12,500 – 37,500 INR"), 12500);
    }

    #[test]
    fn digit_free_strings_fall_back_to_zero() {
        assert_eq!(parse_min_budget("N/A"), 0);
        assert_eq!(parse_min_budget(""), 0);
        assert_eq!(parse_min_budget("Negotiable"), 0);
    }

    #[test]
    fn absurdly_long_runs_do_not_panic() {
        assert_eq!(parse_min_budget("99999999999999999999 USD"), 0);
    }
}
