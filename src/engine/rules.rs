//! Analytics engine: hand-written SQL for the questions we know how to answer exactly.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static CPC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(highest|lowest|max|min)\s.*cpc").expect("CPC pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn from_superlative(word: &str) -> Self {
        match word {
            "highest" | "max" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CpcExtremum(SortDirection),
    Roas,
    TotalSales,
    NoMatch,
}

impl Intent {
    /// The fixed statement for this intent, `None` for [`Intent::NoMatch`].
    pub fn sql(&self) -> Option<String> {
        match self {
            Intent::CpcExtremum(direction) => Some(format!(
                "SELECT item_id, CAST(SUM(ad_spend) AS DOUBLE) / SUM(clicks) AS cpc \
                 FROM ad_sales WHERE clicks > 0 AND ad_spend > 0 \
                 GROUP BY item_id ORDER BY cpc {} LIMIT 1",
                direction
            )),
            Intent::Roas => Some(
                "SELECT CAST(SUM(ad_sales) AS DOUBLE) / SUM(ad_spend) AS roas \
                 FROM ad_sales WHERE ad_spend > 0"
                    .to_string(),
            ),
            Intent::TotalSales => {
                Some("SELECT SUM(total_sales) AS total_sales FROM total_sales".to_string())
            }
            Intent::NoMatch => None,
        }
    }
}

/// Lower-cases and trims a question for matching. The original text is kept for prompts.
pub fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Classifies already-normalized question text. First rule to match wins.
pub fn match_intent(normalized: &str) -> Intent {
    if let Some(captures) = CPC_PATTERN.captures(normalized) {
        return Intent::CpcExtremum(SortDirection::from_superlative(&captures[1]));
    }
    if normalized.contains("roas") {
        return Intent::Roas;
    }
    if normalized.contains("total sales") {
        return Intent::TotalSales;
    }
    Intent::NoMatch
}
