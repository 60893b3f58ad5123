//! Category Index
//!
//! Static mapping from category label to a curated set of target URLs, plus
//! the reverse lookup. Both directions are pure and stateless; the declared
//! order is significant so that default collection runs are reproducible.

/// Category returned when a URL matches no curated list.
pub const OTHER_CATEGORY: &str = "other";

/// Curated website categories. Order matters: `all_urls` yields URLs grouped
/// by category in this order, preserving intra-category order.
pub const WEBSITE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "ecommerce",
        &[
            "https://www.amazon.com",
            "https://www.ebay.com",
            "https://www.etsy.com",
            "https://www.walmart.com",
            "https://www.aliexpress.com",
        ],
    ),
    (
        "news",
        &[
            "https://www.cnn.com",
            "https://www.bbc.com",
            "https://www.reuters.com",
            "https://www.apnews.com",
            "https://www.bloomberg.com",
        ],
    ),
    (
        "education",
        &[
            "https://www.wikipedia.org",
            "https://www.khanacademy.org",
            "https://www.ted.com",
            "https://www.coursera.org",
            "https://www.edx.org",
        ],
    ),
    (
        "social",
        &[
            "https://www.reddit.com",
            "https://www.quora.com",
            "https://www.medium.com",
            "https://www.discord.com",
            "https://www.slack.com",
        ],
    ),
    (
        "tech",
        &[
            "https://github.com",
            "https://stackoverflow.com",
            "https://www.producthunt.com",
            "https://news.ycombinator.com",
            "https://www.techcrunch.com",
        ],
    ),
    (
        "entertainment",
        &[
            "https://www.youtube.com",
            "https://www.twitch.tv",
            "https://www.spotify.com",
            "https://www.netflix.com",
            "https://www.hulu.com",
        ],
    ),
    (
        "tools",
        &[
            "https://www.google.com",
            "https://www.dropbox.com",
            "https://www.notion.so",
            "https://www.figma.com",
            "https://www.canva.com",
        ],
    ),
    (
        "finance",
        &[
            "https://www.paypal.com",
            "https://www.stripe.com",
            "https://www.coinbase.com",
            "https://www.robinhood.com",
            "https://www.venmo.com",
        ],
    ),
    (
        "health",
        &[
            "https://www.webmd.com",
            "https://www.mayoclinic.org",
            "https://www.healthline.com",
            "https://www.nih.gov",
            "https://www.who.int",
        ],
    ),
    (
        "travel",
        &[
            "https://www.booking.com",
            "https://www.airbnb.com",
            "https://www.tripadvisor.com",
            "https://www.expedia.com",
            "https://www.hotels.com",
        ],
    ),
];

/// Resolve the category for a URL, or [`OTHER_CATEGORY`] if unmatched.
pub fn category_of(url: &str) -> &'static str {
    WEBSITE_CATEGORIES
        .iter()
        .find(|(_, urls)| urls.contains(&url))
        .map(|(category, _)| *category)
        .unwrap_or(OTHER_CATEGORY)
}

/// All curated URLs, grouped by category in declaration order.
pub fn all_urls() -> Vec<&'static str> {
    WEBSITE_CATEGORIES
        .iter()
        .flat_map(|(_, urls)| urls.iter().copied())
        .collect()
}

/// Category labels in declaration order.
pub fn category_names() -> Vec<&'static str> {
    WEBSITE_CATEGORIES.iter().map(|(c, _)| *c).collect()
}
