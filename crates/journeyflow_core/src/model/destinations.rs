//! Popular destination suggestions for the review form.

/// Default number of suggestions shown under the destination field.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

pub const POPULAR_DESTINATIONS: &[&str] = &[
    "Paris, France",
    "London, UK",
    "New York, USA",
    "Tokyo, Japan",
    "Rome, Italy",
    "Barcelona, Spain",
    "Amsterdam, Netherlands",
    "Prague, Czech Republic",
    "Vienna, Austria",
    "Berlin, Germany",
    "Madrid, Spain",
    "Florence, Italy",
    "Venice, Italy",
    "Athens, Greece",
    "Istanbul, Turkey",
    "Dubai, UAE",
    "Singapore",
    "Hong Kong",
    "Bangkok, Thailand",
    "Sydney, Australia",
    "Melbourne, Australia",
    "Los Angeles, USA",
    "San Francisco, USA",
    "Miami, USA",
    "Las Vegas, USA",
    "Chicago, USA",
    "Boston, USA",
    "Seattle, USA",
    "Toronto, Canada",
    "Vancouver, Canada",
    "Montreal, Canada",
    "Mexico City, Mexico",
    "Cancun, Mexico",
    "Rio de Janeiro, Brazil",
    "Buenos Aires, Argentina",
    "Lima, Peru",
    "Cape Town, South Africa",
    "Marrakech, Morocco",
    "Cairo, Egypt",
    "Mumbai, India",
    "Delhi, India",
    "Goa, India",
    "Kathmandu, Nepal",
    "Bali, Indonesia",
    "Phuket, Thailand",
    "Seoul, South Korea",
    "Beijing, China",
    "Shanghai, China",
    "Moscow, Russia",
    "St. Petersburg, Russia",
    "Stockholm, Sweden",
    "Oslo, Norway",
    "Copenhagen, Denmark",
    "Helsinki, Finland",
    "Reykjavik, Iceland",
    "Dublin, Ireland",
    "Edinburgh, Scotland",
    "Zurich, Switzerland",
    "Geneva, Switzerland",
    "Brussels, Belgium",
    "Lisbon, Portugal",
    "Porto, Portugal",
    "Warsaw, Poland",
    "Krakow, Poland",
    "Budapest, Hungary",
    "Bucharest, Romania",
    "Sofia, Bulgaria",
    "Zagreb, Croatia",
    "Split, Croatia",
    "Santorini, Greece",
    "Mykonos, Greece",
];

/// Returns up to `limit` destinations containing `input`, ignoring case.
///
/// Blank input yields no suggestions.
pub fn suggest_destinations(input: &str, limit: usize) -> Vec<&'static str> {
    let needle = input.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    POPULAR_DESTINATIONS
        .iter()
        .copied()
        .filter(|destination| destination.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}
