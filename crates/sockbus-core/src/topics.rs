use std::fmt;

use crate::errors::TopicParseError;

/// The set of topics a subscription covers. Parsed once from the
/// client's comma-delimited list and fixed for the subscription's
/// lifetime; order is preserved, duplicates and empty segments are
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicSet {
    topics: Vec<String>,
}

impl TopicSet {
    /// Parse a comma-delimited topic list, e.g. `"sports,news"`.
    pub fn parse(raw: &str) -> Result<Self, TopicParseError> {
        let mut topics: Vec<String> = Vec::new();
        for part in raw.split(',') {
            let topic = part.trim();
            if topic.is_empty() {
                continue;
            }
            if !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
        if topics.is_empty() {
            return Err(TopicParseError::Empty);
        }
        Ok(Self { topics })
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.topics
    }
}

impl fmt::Display for TopicSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topics.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_list() {
        let set = TopicSet::parse("sports,news").unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("sports"));
        assert!(set.contains("news"));
        assert!(!set.contains("weather"));
    }

    #[test]
    fn single_topic() {
        let set = TopicSet::parse("sports").unwrap();
        assert_eq!(set.as_slice(), ["sports".to_string()]);
    }

    #[test]
    fn dedupes_and_trims_preserving_order() {
        let set = TopicSet::parse(" sports , news,sports,").unwrap();
        assert_eq!(set.to_string(), "sports,news");
    }

    #[test]
    fn empty_input_rejected() {
        assert!(matches!(TopicSet::parse(""), Err(TopicParseError::Empty)));
        assert!(matches!(TopicSet::parse(",,,"), Err(TopicParseError::Empty)));
        assert!(matches!(TopicSet::parse("  "), Err(TopicParseError::Empty)));
    }

    #[test]
    fn display_rejoins_with_commas() {
        let set = TopicSet::parse("a,b,c").unwrap();
        assert_eq!(set.to_string(), "a,b,c");
    }
}
