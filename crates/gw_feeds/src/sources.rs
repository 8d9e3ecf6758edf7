use gw_core::FeedSource;

/// Default source catalogue. Feed URLs drift over time; when one starts
/// returning errors or zero items, find the publisher's current RSS
/// endpoint and swap it here.
pub fn default_sources() -> Vec<FeedSource> {
    vec![
        // High-volume tabloids
        FeedSource::new("New York Post", "https://nypost.com/feed/", "world"),
        FeedSource::new(
            "Daily Mail (News)",
            "https://www.dailymail.co.uk/news/index.rss",
            "world",
        ),
        FeedSource::new("The Sun (News)", "https://www.thesun.co.uk/news/feed/", "world"),
        // US politics
        FeedSource::new("Fox News", "https://feeds.foxnews.com/foxnews/latest", "world"),
        FeedSource::new("The Hill", "https://thehill.com/feed/", "politics"),
        FeedSource::new(
            "Washington Examiner",
            "https://www.washingtonexaminer.com/rss",
            "politics",
        ),
        FeedSource::new("Reason", "https://reason.com/latest/feed/", "politics"),
        // Institutional / business anchors
        FeedSource::new(
            "WSJ World News",
            "https://feeds.a.dj.com/rss/RSSWorldNews.xml",
            "world",
        ),
        FeedSource::new(
            "WSJ U.S. Business",
            "https://feeds.a.dj.com/rss/WSJcomUSBusiness.xml",
            "business",
        ),
        FeedSource::new(
            "Financial Times (World)",
            "https://www.ft.com/world?format=rss",
            "world",
        ),
        // International / geopolitics
        FeedSource::new("The Telegraph", "https://www.telegraph.co.uk/rss.xml", "world"),
        FeedSource::new(
            "Al Jazeera (All)",
            "https://www.aljazeera.com/xml/rss/all.xml",
            "world",
        ),
        FeedSource::new(
            "Times of Israel",
            "https://www.timesofisrael.com/feed/",
            "world",
        ),
        // Tech
        FeedSource::new("The Verge", "https://www.theverge.com/rss/index.xml", "tech"),
    ]
}
