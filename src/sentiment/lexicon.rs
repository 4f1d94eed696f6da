use super::SentimentReading;

pub const POSITIVE_WORDS: &[&str] = &[
    "etf",
    "growth",
    "support",
    "accumulation",
    "bullish",
    "adoption",
    "sec approval",
    "pumping",
    "positive",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "lawsuit",
    "hack",
    "fed",
    "resistance",
    "dump",
    "bearish",
    "scam",
    "crash",
    "regulation",
    "fud",
    "negative",
];

pub const NO_RELEVANT_NEWS: &str = "No relevant news found";

/// Substring hits, so "fed" also matches "federal".
fn hits(title: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| title.contains(*w)).count()
}

/// +1 per title leaning positive, -1 per title leaning negative, 0 on a tie.
/// The headline is the first title with any lexicon hit.
pub fn score_titles<'a, I>(titles: I) -> SentimentReading
where
    I: IntoIterator<Item = &'a str>,
{
    let mut score = 0.0;
    let mut headline: Option<&str> = None;

    for title in titles {
        let lowered = title.to_lowercase();
        let positive = hits(&lowered, POSITIVE_WORDS);
        let negative = hits(&lowered, NEGATIVE_WORDS);

        if positive > negative {
            score += 1.0;
        } else if negative > positive {
            score -= 1.0;
        }

        if headline.is_none() && positive + negative > 0 {
            headline = Some(title);
        }
    }

    SentimentReading {
        score,
        headline: headline.unwrap_or(NO_RELEVANT_NEWS).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_per_title_and_keeps_first_relevant_headline() {
        let reading = score_titles([
            "Markets open quietly",
            "Bitcoin ETF sees record ADOPTION",
            "Exchange hack triggers crash fears",
            "Bullish momentum despite lawsuit",
        ]);
        // +1, -1, tie
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.headline, "Bitcoin ETF sees record ADOPTION");
    }

    #[test]
    fn no_hits_reports_placeholder() {
        let reading = score_titles(["nothing here", "still nothing"]);
        assert_eq!(reading.score, 0.0);
        assert_eq!(reading.headline, NO_RELEVANT_NEWS);
    }

    #[test]
    fn multi_word_terms_match() {
        let reading = score_titles(["Spot product wins SEC approval"]);
        assert_eq!(reading.score, 1.0);
    }
}
