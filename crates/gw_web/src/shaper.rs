use std::collections::VecDeque;

use gw_core::Article;

/// Tuning for the diversity reorder applied before serving.
#[derive(Debug, Clone)]
pub struct ShaperConfig {
    /// Near-duplicate memory: title-keys of the last `window` emitted
    /// items.
    pub window: usize,
    /// How far down the remaining candidates one scan may look.
    pub scan_horizon: usize,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            window: 40,
            scan_horizon: 180,
        }
    }
}

/// Words that carry no identity when comparing headlines.
const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "for", "with", "at", "by",
    "from", "as", "is", "are", "was", "were", "be", "been", "after", "before", "over", "under",
    "amid", "into", "out", "up", "down", "about", "against", "it", "its", "his", "her", "their",
    "this", "that", "these", "those", "he", "she", "they", "you", "your", "will", "would",
    "could", "should", "has", "have", "had", "not", "no", "new", "news", "just", "says", "say",
    "said", "breaking", "exclusive", "live", "update", "updates", "report", "reports", "watch",
    "video",
];

/// Collapse a headline into a token signature: lowercase, URLs and
/// punctuation dropped, stop-words and single characters removed, first
/// ten tokens kept. Two titles with the same key are treated as
/// near-duplicates.
pub fn title_key(title: &str) -> String {
    let lowered = title.to_lowercase();

    let mut cleaned = String::with_capacity(lowered.len());
    for token in lowered.split_whitespace() {
        if token.starts_with("http://") || token.starts_with("https://") || token.starts_with("www.")
        {
            continue;
        }
        for c in token.chars() {
            if c.is_alphanumeric() {
                cleaned.push(c);
            } else {
                cleaned.push(' ');
            }
        }
        cleaned.push(' ');
    }

    cleaned
        .split_whitespace()
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .take(10)
        .collect::<Vec<_>>()
        .join(" ")
}

struct Candidate {
    article: Article,
    key: String,
}

/// Reorder `candidates` (already newest first) so consecutive items avoid
/// repeating a source domain or a near-duplicate headline. Every input
/// item is emitted exactly once: when nothing within the scan horizon
/// satisfies the constraints, the domain check alone is tried, and
/// failing that the front of the queue goes out as-is.
pub fn shape(candidates: Vec<Article>, config: &ShaperConfig) -> Vec<Article> {
    let mut queue: VecDeque<Candidate> = candidates
        .into_iter()
        .map(|article| {
            let key = title_key(&article.title);
            Candidate { article, key }
        })
        .collect();

    let mut out = Vec::with_capacity(queue.len());
    let mut last_domain = String::new();
    let mut recent: VecDeque<String> = VecDeque::with_capacity(config.window);

    while !queue.is_empty() {
        let horizon = config.scan_horizon.min(queue.len());

        let pick = queue
            .iter()
            .take(horizon)
            .position(|c| c.article.source_domain != last_domain && !recent.contains(&c.key))
            .or_else(|| {
                queue
                    .iter()
                    .take(horizon)
                    .position(|c| c.article.source_domain != last_domain)
            })
            .unwrap_or(0);

        let Some(chosen) = queue.remove(pick) else {
            break;
        };

        last_domain = chosen.article.source_domain.clone();
        recent.push_back(chosen.key);
        if recent.len() > config.window {
            recent.pop_front();
        }
        out.push(chosen.article);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(id: i64, domain: &str, title: &str) -> Article {
        Article {
            id,
            title: title.to_string(),
            url: format!("https://{domain}/{id}"),
            category: "world".to_string(),
            source_name: domain.to_string(),
            source_url: format!("https://{domain}/feed"),
            source_domain: domain.to_string(),
            published_at: None,
            created_at: Utc::now(),
            summary: Some("text".to_string()),
            summarized_at: Some(Utc::now()),
        }
    }

    #[test]
    fn key_survives_punctuation_and_stop_words() {
        assert_eq!(
            title_key("Breaking: Markets Crash After Fed Decision!"),
            title_key("Markets Crash After The Fed's Decision")
        );
    }

    #[test]
    fn key_drops_urls_and_caps_tokens() {
        assert_eq!(title_key("Read more at https://example.com/story"), "read more");

        let long = "one two three four five six seven eight nine ten eleven twelve";
        assert_eq!(title_key(long).split_whitespace().count(), 10);
    }

    #[test]
    fn different_headlines_get_different_keys() {
        assert_ne!(
            title_key("Markets Crash After Fed Decision"),
            title_key("Markets Rally After Fed Decision")
        );
    }

    #[test]
    fn output_is_a_permutation_of_the_input() {
        let input: Vec<Article> = (0..20)
            .map(|i| {
                article(
                    i,
                    ["a.com", "b.com", "a.com", "c.com"][(i % 4) as usize],
                    &format!("Distinct headline number {i} about topic {i}"),
                )
            })
            .collect();

        let mut expected: Vec<i64> = input.iter().map(|a| a.id).collect();
        let shaped = shape(input, &ShaperConfig::default());

        let mut got: Vec<i64> = shaped.iter().map(|a| a.id).collect();
        assert_eq!(got.len(), expected.len());
        got.sort();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn consecutive_same_domain_is_broken_up() {
        let input = vec![
            article(1, "a.com", "Completely unrelated story X"),
            article(2, "a.com", "Another thing entirely Y"),
            article(3, "b.com", "Third subject Z"),
        ];

        let shaped = shape(input, &ShaperConfig::default());
        let domains: Vec<&str> = shaped.iter().map(|a| a.source_domain.as_str()).collect();
        assert_eq!(domains, vec!["a.com", "b.com", "a.com"]);
    }

    #[test]
    fn near_duplicate_titles_are_separated() {
        let input = vec![
            article(1, "a.com", "Breaking: Markets Crash After Fed Decision!"),
            article(2, "b.com", "Markets Crash After The Fed's Decision"),
            article(3, "c.com", "Something Else Entirely Happened Today"),
        ];

        let shaped = shape(input, &ShaperConfig::default());
        let ids: Vec<i64> = shaped.iter().map(|a| a.id).collect();
        // the duplicate waits until a fresh headline has gone out
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn uniform_domain_input_keeps_its_order() {
        let input = vec![
            article(1, "a.com", "First distinct headline here"),
            article(2, "a.com", "Second distinct headline here"),
            article(3, "a.com", "Third distinct headline here"),
        ];

        let shaped = shape(input, &ShaperConfig::default());
        let ids: Vec<i64> = shaped.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn horizon_bounds_the_scan() {
        // with a horizon of 1 the shaper degenerates to pass-through
        let config = ShaperConfig {
            window: 40,
            scan_horizon: 1,
        };
        let input = vec![
            article(1, "a.com", "First distinct headline"),
            article(2, "a.com", "Second distinct headline"),
            article(3, "b.com", "Third distinct headline"),
        ];

        let shaped = shape(input, &config);
        let ids: Vec<i64> = shaped.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn window_eviction_forgets_old_titles() {
        let config = ShaperConfig {
            window: 1,
            scan_horizon: 180,
        };
        // two near-duplicates with one fresh item between them: by the
        // time the duplicate is considered again its key has been evicted
        let input = vec![
            article(1, "a.com", "Markets Crash After Fed Decision"),
            article(2, "b.com", "Fresh unrelated headline about weather"),
            article(3, "c.com", "Markets Crash After The Fed Decision"),
        ];

        let shaped = shape(input, &config);
        assert_eq!(shaped.len(), 3);
        let ids: Vec<i64> = shaped.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(shape(Vec::new(), &ShaperConfig::default()).is_empty());
    }
}
