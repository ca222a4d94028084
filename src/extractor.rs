//! Fact-extraction capability: content → self-contained narrative facts
//! plus the entity mentions within them.
//!
//! Out of scope as a concrete implementation (an LLM call in production);
//! [`SentenceSplitExtractor`] is a deterministic test/dev stand-in
//! sufficient to drive [`crate::ingest::Ingestor`] and
//! [`crate::link_builder::LinkBuilder`] without a live model.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{EntityType, FactType};

#[derive(Debug, Clone)]
pub struct ExtractedMention {
    pub surface_form: String,
    pub entity_type: EntityType,
}

#[derive(Debug, Clone)]
pub struct ExtractedFact {
    pub text: String,
    pub fact_type: FactType,
    pub entity_mentions: Vec<ExtractedMention>,
}

/// Capability trait for turning raw content into narrative facts.
pub trait FactExtractor: Send + Sync {
    fn extract(&self, content: &str, event_date: DateTime<Utc>) -> Result<Vec<ExtractedFact>>;
}

/// Sentence-initial function words whose capitalization is purely
/// grammatical: these never start a proper-noun span even in first
/// position, where a stored-name comparison can't otherwise tell.
const SENTENCE_INITIAL_STOPWORDS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "he", "she", "it", "they", "we", "i", "his", "her", "its",
    "their", "our", "my", "your", "there", "here", "and", "but", "or", "so", "if", "when", "while", "after", "before",
];

/// Splits content on sentence boundaries and naively tags capitalized
/// multi-word spans as `PERSON` mentions, skipping a short list of
/// sentence-initial function words whose capitalization is grammatical
/// rather than evidence of a proper noun.
/// Every extracted fact is tagged `FactType::World`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SentenceSplitExtractor;

impl SentenceSplitExtractor {
    fn split_sentences(content: &str) -> Vec<&str> {
        content
            .split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn find_mentions(sentence: &str) -> Vec<ExtractedMention> {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        let mut mentions = Vec::new();
        let mut i = 0;
        while i < words.len() {
            let word = words[i].trim_matches(|c: char| !c.is_alphanumeric());
            let is_capitalized = word.chars().next().is_some_and(char::is_uppercase);
            let is_sentence_initial_stopword = i == 0 && SENTENCE_INITIAL_STOPWORDS.contains(&word.to_lowercase().as_str());
            if is_capitalized && !is_sentence_initial_stopword {
                let mut span = vec![word];
                let mut j = i + 1;
                while j < words.len() {
                    let next = words[j].trim_matches(|c: char| !c.is_alphanumeric());
                    if next.chars().next().is_some_and(char::is_uppercase) {
                        span.push(next);
                        j += 1;
                    } else {
                        break;
                    }
                }
                mentions.push(ExtractedMention {
                    surface_form: span.join(" "),
                    entity_type: EntityType::Person,
                });
                i = j;
                continue;
            }
            i += 1;
        }
        mentions
    }
}

impl FactExtractor for SentenceSplitExtractor {
    fn extract(&self, content: &str, event_date: DateTime<Utc>) -> Result<Vec<ExtractedFact>> {
        let _ = event_date;
        Ok(Self::split_sentences(content)
            .into_iter()
            .map(|sentence| ExtractedFact {
                text: sentence.to_string(),
                fact_type: FactType::World,
                entity_mentions: Self::find_mentions(sentence),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries() {
        let facts = SentenceSplitExtractor.extract("Alice works at Google. She loves hiking.", Utc::now()).unwrap();
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn tags_capitalized_spans_as_person_mentions() {
        let facts = SentenceSplitExtractor.extract("Alice Chen works at Google.", Utc::now()).unwrap();
        let mentions = &facts[0].entity_mentions;
        assert!(mentions.iter().any(|m| m.surface_form == "Alice Chen"));
    }

    #[test]
    fn sentence_initial_capitalization_is_not_a_mention() {
        let facts = SentenceSplitExtractor.extract("The dog ran.", Utc::now()).unwrap();
        assert!(facts[0].entity_mentions.is_empty());
    }

    #[test]
    fn sentence_initial_proper_noun_is_still_a_mention() {
        let facts = SentenceSplitExtractor
            .extract("Alice works at Google in Mountain View. Alice loves hiking in Yosemite.", Utc::now())
            .unwrap();
        assert!(facts[0].entity_mentions.iter().any(|m| m.surface_form == "Alice"));
        assert!(facts[1].entity_mentions.iter().any(|m| m.surface_form == "Alice"));
    }
}
