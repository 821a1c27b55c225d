//! Segmentation of cleaned text into words, sentences, or paragraphs.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::html::condense_line_breaks;

/// Unit of division for segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentUnit {
    Words,
    Sentences,
    Paragraphs,
}

impl FromStr for SegmentUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "w" | "word" | "words" => Ok(Self::Words),
            "s" | "sent" | "sents" | "sentence" | "sentences" => Ok(Self::Sentences),
            "p" | "para" | "paragraph" | "paragraphs" => Ok(Self::Paragraphs),
            other => Err(format!("invalid segmentation unit: {}", other)),
        }
    }
}

impl SegmentUnit {
    pub fn segment(&self, text: &str) -> Vec<String> {
        match self {
            Self::Words => tokenize_words(text),
            Self::Sentences => split_sentences(text),
            Self::Paragraphs => split_paragraphs(text),
        }
    }
}

/// Rule-based word tokenizer: whitespace-separated runs, with leading and
/// trailing punctuation split off as tokens of their own. Internal
/// punctuation (contractions, hyphenated words, decimals) stays attached.
pub fn tokenize_words(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for chunk in text.split_whitespace() {
        let mut leading = Vec::new();
        let mut rest = chunk;
        while let Some(c) = rest.chars().next() {
            if c.is_alphanumeric() {
                break;
            }
            leading.push(c.to_string());
            rest = &rest[c.len_utf8()..];
        }

        let mut trailing = Vec::new();
        while let Some(c) = rest.chars().next_back() {
            if c.is_alphanumeric() {
                break;
            }
            trailing.push(c.to_string());
            rest = &rest[..rest.len() - c.len_utf8()];
        }

        tokens.extend(leading);
        if !rest.is_empty() {
            tokens.push(rest.to_string());
        }
        tokens.extend(trailing.into_iter().rev());
    }
    tokens
}

/// Abbreviations that a period may follow without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "st", "vs", "etc", "eg", "e.g", "ie", "i.e", "fig", "no",
    "al", "approx",
];

/// Rule-based sentence splitter.
///
/// A sentence ends at `.`, `!`, or `?` (plus any closing quote or
/// bracket) followed by whitespace and an uppercase letter, digit, or end
/// of text. Periods after known abbreviations, single-letter initials,
/// and inside decimal numbers do not split. Newlines always split.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            push_sentence(&mut sentences, &mut current);
            i += 1;
            continue;
        }
        current.push(c);
        if c == '.' || c == '!' || c == '?' {
            // Decimal number: digit on both sides of the period.
            if c == '.'
                && i > 0
                && chars[i - 1].is_ascii_digit()
                && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())
            {
                i += 1;
                continue;
            }
            if c == '.' && ends_with_abbreviation(&current) {
                i += 1;
                continue;
            }
            // Absorb closing quotes/brackets into the sentence.
            let mut j = i + 1;
            while j < chars.len() && matches!(chars[j], '"' | '\'' | ')' | ']') {
                current.push(chars[j]);
                j += 1;
            }
            // Split when followed by whitespace then an upper-case letter
            // or digit, or at end of text.
            let next_non_space = chars[j..].iter().position(|ch| !ch.is_whitespace());
            let splits = match next_non_space {
                None => true,
                Some(offset) => {
                    let has_space = offset > 0 || chars[j - 1].is_whitespace();
                    let next = chars[j + offset];
                    has_space && (next.is_uppercase() || next.is_ascii_digit())
                }
            };
            if splits {
                push_sentence(&mut sentences, &mut current);
            }
            i = j;
            continue;
        }
        i += 1;
    }
    push_sentence(&mut sentences, &mut current);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

fn ends_with_abbreviation(current: &str) -> bool {
    // `current` ends with the period itself.
    let body = &current[..current.len() - 1];
    let last_word = body
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("");
    if last_word.len() == 1 && last_word.chars().all(|c| c.is_uppercase()) {
        return true;
    }
    ABBREVIATIONS.contains(&last_word.to_ascii_lowercase().as_str())
}

/// Paragraphs: condensed line breaks, one paragraph per line.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    condense_line_breaks(text)
        .split('\n')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_unit_aliases() {
        assert_eq!("w".parse::<SegmentUnit>().unwrap(), SegmentUnit::Words);
        assert_eq!("sents".parse::<SegmentUnit>().unwrap(), SegmentUnit::Sentences);
        assert_eq!(
            "paragraphs".parse::<SegmentUnit>().unwrap(),
            SegmentUnit::Paragraphs
        );
        assert!("chapters".parse::<SegmentUnit>().is_err());
    }

    #[test]
    fn test_tokenize_words_splits_punctuation() {
        assert_eq!(
            tokenize_words("Hello, world."),
            vec!["Hello", ",", "world", "."]
        );
    }

    #[test]
    fn test_tokenize_words_keeps_internal_punctuation() {
        assert_eq!(
            tokenize_words("don't over-exert at 37.5 degrees"),
            vec!["don't", "over-exert", "at", "37.5", "degrees"]
        );
    }

    #[test]
    fn test_tokenize_words_quoted() {
        assert_eq!(
            tokenize_words("\"quoted\" text"),
            vec!["\"", "quoted", "\"", "text"]
        );
    }

    #[test]
    fn test_tokenize_words_empty() {
        assert!(tokenize_words("").is_empty());
        assert!(tokenize_words("   ").is_empty());
    }

    #[test]
    fn test_split_sentences_basic() {
        assert_eq!(
            split_sentences("First sentence. Second sentence."),
            vec!["First sentence.", "Second sentence."]
        );
    }

    #[test]
    fn test_split_sentences_question_and_exclamation() {
        assert_eq!(
            split_sentences("Is this real? Yes! It is."),
            vec!["Is this real?", "Yes!", "It is."]
        );
    }

    #[test]
    fn test_split_sentences_abbreviation_guard() {
        assert_eq!(
            split_sentences("Dr. Smith prescribed rest. It helped."),
            vec!["Dr. Smith prescribed rest.", "It helped."]
        );
    }

    #[test]
    fn test_split_sentences_initials_guard() {
        assert_eq!(
            split_sentences("J. Smith wrote the guideline. It was adopted."),
            vec!["J. Smith wrote the guideline.", "It was adopted."]
        );
    }

    #[test]
    fn test_split_sentences_decimal_guard() {
        assert_eq!(
            split_sentences("Take 2.5 mg daily. Review after a week."),
            vec!["Take 2.5 mg daily.", "Review after a week."]
        );
    }

    #[test]
    fn test_split_sentences_lowercase_continuation() {
        assert_eq!(
            split_sentences("visit www.example.org for more"),
            vec!["visit www.example.org for more"]
        );
    }

    #[test]
    fn test_split_sentences_newline_splits() {
        assert_eq!(
            split_sentences("Heading \nbody text here."),
            vec!["Heading", "body text here."]
        );
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("  \n ").is_empty());
    }

    #[test]
    fn test_split_paragraphs() {
        assert_eq!(
            split_paragraphs("para one\n\npara two\npara three"),
            vec!["para one", "para two", "para three"]
        );
    }

    #[test]
    fn test_split_paragraphs_empty() {
        assert!(split_paragraphs("").is_empty());
    }
}
