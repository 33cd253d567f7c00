//! Key Section Extraction
//!
//! Pulls the abstract, introduction, results and conclusion out of an
//! academic paper so that a document too large for the summarizer can often
//! be reduced to the parts that matter.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Share of words kept from the start of the document when no section is found
pub const FALLBACK_HEAD_FRACTION: f64 = 0.3;
/// Position (as a share of words) where the kept tail of the document begins
pub const FALLBACK_TAIL_START_FRACTION: f64 = 0.8;

/// Separator between extracted sections
const SECTION_SEPARATOR: &str = "\n\n";

/// A heading pattern with its word cap and output rank
pub struct SectionMarker {
    pub name: &'static str,
    pub pattern: Regex,
    pub max_words: usize,
    pub priority: u8,
}

fn marker(name: &'static str, pattern: &str, max_words: usize, priority: u8) -> SectionMarker {
    SectionMarker {
        name,
        pattern: Regex::new(pattern).expect("section marker pattern is valid"),
        max_words,
        priority,
    }
}

lazy_static! {
    static ref MARKERS: Vec<SectionMarker> = vec![
        marker("abstract", r"(?i)\bAbstract\b", 500, 1),
        marker("introduction", r"(?i)\b(\d+\.?\s*)?Introduction\b", 2000, 2),
        marker(
            "results",
            r"(?i)\b(\d+\.?\s*)?(Experimental\s+Results|Results(\s+and\s+Discussion)?)\b",
            3000,
            3,
        ),
        marker("conclusion", r"(?i)\b(\d+\.?\s*)?Conclusion\b", 2000, 4),
    ];
    /// Everything from here on is back matter
    static ref STOP_PATTERN: Regex =
        Regex::new(r"(?i)\b(References|Bibliography|Appendix)").expect("stop pattern is valid");
}

/// An excerpt of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    pub text: String,
    pub word_count: usize,
    pub priority: u8,
}

/// Result of section extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Sections joined in priority order
    pub text: String,
    /// Sections in priority order
    pub sections: Vec<Section>,
    /// True when no heading matched and the beginning/ending split was used
    pub used_fallback: bool,
}

impl Extraction {
    /// Whether the extraction can stand in for the document
    pub fn is_usable(&self) -> bool {
        !self.text.trim().is_empty() && !self.sections.is_empty()
    }

    pub fn total_words(&self) -> usize {
        self.sections.iter().map(|s| s.word_count).sum()
    }
}

/// Word-share split used when no section heading is found
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackSplit {
    pub head_fraction: f64,
    pub tail_start_fraction: f64,
}

impl Default for FallbackSplit {
    fn default() -> Self {
        Self {
            head_fraction: FALLBACK_HEAD_FRACTION,
            tail_start_fraction: FALLBACK_TAIL_START_FRACTION,
        }
    }
}

impl FallbackSplit {
    /// Word index ranges `(head_end, tail_start)` for a document of `total` words
    fn bounds(&self, total: usize) -> (usize, usize) {
        let head_end = ((total as f64 * self.head_fraction.clamp(0.0, 1.0)).floor() as usize).min(total);
        let tail_start =
            ((total as f64 * self.tail_start_fraction.clamp(0.0, 1.0)).floor() as usize).min(total);
        // Never let the two parts overlap
        (head_end, tail_start.max(head_end))
    }
}

/// Extracts key sections from academic documents
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionExtractor {
    pub fallback: FallbackSplit,
}

impl SectionExtractor {
    pub fn new(fallback: FallbackSplit) -> Self {
        Self { fallback }
    }

    pub fn extract(&self, text: &str) -> Extraction {
        // First match of every marker, in document order
        let mut found: Vec<(&SectionMarker, usize)> = MARKERS
            .iter()
            .filter_map(|m| m.pattern.find(text).map(|hit| (m, hit.start())))
            .collect();

        if found.is_empty() {
            info!("No section headings found, using beginning/ending split");
            return self.fallback_extract(text);
        }

        found.sort_by_key(|(_, start)| *start);

        // Back matter is searched for after the last heading, so a stray
        // "references" in the body cannot cut the final section short
        let last_start = found[found.len() - 1].1;
        let stop_pos = STOP_PATTERN
            .find_at(text, last_start)
            .map(|hit| hit.start())
            .unwrap_or(text.len());
        debug!(stop_pos = stop_pos, headings = found.len(), "Located section headings");

        let mut sections: Vec<Section> = found
            .iter()
            .enumerate()
            .map(|(i, (marker, start))| {
                let end = found.get(i + 1).map(|(_, next)| *next).unwrap_or(stop_pos);
                let (text, word_count) = truncate_words(&text[*start..end], marker.max_words);
                Section {
                    name: marker.name.to_string(),
                    text,
                    word_count,
                    priority: marker.priority,
                }
            })
            .collect();

        sections.sort_by_key(|s| s.priority);

        let joined = sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);

        info!(
            sections = %sections
                .iter()
                .map(|s| format!("{} ({} words)", s.name, s.word_count))
                .collect::<Vec<_>>()
                .join(", "),
            "Extracted sections"
        );

        Extraction {
            text: joined,
            sections,
            used_fallback: false,
        }
    }

    fn fallback_extract(&self, text: &str) -> Extraction {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Extraction {
                used_fallback: true,
                ..Default::default()
            };
        }

        let (head_end, tail_start) = self.fallback.bounds(words.len());
        let beginning = words[..head_end].join(" ");
        let ending = words[tail_start..].join(" ");

        let sections = vec![
            Section {
                name: "beginning".to_string(),
                text: beginning.clone(),
                word_count: head_end,
                priority: 1,
            },
            Section {
                name: "ending".to_string(),
                text: ending.clone(),
                word_count: words.len() - tail_start,
                priority: 2,
            },
        ];

        Extraction {
            text: format!("{}{}{}", beginning, SECTION_SEPARATOR, ending),
            sections,
            used_fallback: true,
        }
    }
}

/// Extract with the default fallback split
pub fn extract_sections(text: &str) -> Extraction {
    SectionExtractor::default().extract(text)
}

/// Keep at most `max_words` whitespace-separated words, single-space joined
fn truncate_words(text: &str, max_words: usize) -> (String, usize) {
    let words: Vec<&str> = text.split_whitespace().take(max_words).collect();
    (words.join(" "), words.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize, tag: &str) -> String {
        (0..n).map(|i| format!("{}{}", tag, i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_sections_ordered_by_priority_not_position() {
        // Conclusion appears first in the source, abstract last
        let text = "Conclusion we won. Results were good. 1. Introduction cats. Abstract short.";
        let extraction = extract_sections(text);

        let names: Vec<&str> = extraction.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["abstract", "introduction", "results", "conclusion"]);
        let priorities: Vec<u8> = extraction.sections.iter().map(|s| s.priority).collect();
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
        assert!(extraction.text.starts_with("Abstract short."));
        assert!(!extraction.used_fallback);
    }

    #[test]
    fn test_section_spans_to_next_heading() {
        let text = "Abstract A summary here. Introduction Some context. Conclusion Done.";
        let extraction = extract_sections(text);

        assert_eq!(extraction.sections[0].text, "Abstract A summary here.");
        assert_eq!(extraction.sections[1].text, "Introduction Some context.");
        assert_eq!(extraction.sections[2].text, "Conclusion Done.");
        assert_eq!(
            extraction.text,
            "Abstract A summary here.\n\nIntroduction Some context.\n\nConclusion Done."
        );
    }

    #[test]
    fn test_back_matter_is_excluded() {
        let text = "Abstract Paper. Conclusion It works. References [1] Someone 2020.";
        let extraction = extract_sections(text);
        let conclusion = extraction.sections.iter().find(|s| s.name == "conclusion").unwrap();
        assert_eq!(conclusion.text, "Conclusion It works.");
        assert!(!extraction.text.contains("Someone"));
    }

    #[test]
    fn test_stop_word_before_last_heading_is_ignored() {
        let text = "Abstract See references below. Conclusion Final words. Bibliography X.";
        let extraction = extract_sections(text);
        let abstract_section = &extraction.sections[0];
        assert_eq!(abstract_section.text, "Abstract See references below.");
        assert_eq!(extraction.sections[1].text, "Conclusion Final words.");
    }

    #[test]
    fn test_numbered_and_variant_headings() {
        let text = "2. Introduction x. 4 Experimental Results y. 5. Conclusion z.";
        let extraction = extract_sections(text);
        let names: Vec<&str> = extraction.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["introduction", "results", "conclusion"]);
        assert!(extraction.sections[0].text.starts_with("2. Introduction"));
        assert!(extraction.sections[1].text.starts_with("4 Experimental Results"));
    }

    #[test]
    fn test_plural_conclusions_is_not_a_heading() {
        let text = "Some opening words here. 5. Conclusions we are done now.";
        let extraction = extract_sections(text);
        assert!(extraction.used_fallback);
        let names: Vec<&str> = extraction.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["beginning", "ending"]);
    }

    #[test]
    fn test_word_caps_applied() {
        let text = format!("Abstract {} Introduction tail", words(800, "w"));
        let extraction = extract_sections(&text);
        let abstract_section = &extraction.sections[0];
        assert_eq!(abstract_section.word_count, 500);
        assert_eq!(abstract_section.text.split_whitespace().count(), 500);
    }

    #[test]
    fn test_fallback_when_no_headings() {
        let text = words(100, "w");
        let extraction = extract_sections(&text);

        assert!(extraction.used_fallback);
        assert_eq!(extraction.sections.len(), 2);
        assert_eq!(extraction.sections[0].name, "beginning");
        assert_eq!(extraction.sections[0].word_count, 30);
        assert_eq!(extraction.sections[1].name, "ending");
        assert_eq!(extraction.sections[1].word_count, 20);
        assert!(extraction.sections[0].text.ends_with("w29"));
        assert!(extraction.sections[1].text.starts_with("w80"));
        assert_eq!(
            extraction.text,
            format!("{}\n\n{}", extraction.sections[0].text, extraction.sections[1].text)
        );
    }

    #[test]
    fn test_fallback_not_used_when_any_heading_matches() {
        let text = format!("{} Abstract {}", words(50, "a"), words(50, "b"));
        let extraction = extract_sections(&text);
        assert!(!extraction.used_fallback);
        assert_eq!(extraction.sections.len(), 1);
    }

    #[test]
    fn test_custom_fallback_split() {
        let extractor = SectionExtractor::new(FallbackSplit {
            head_fraction: 0.5,
            tail_start_fraction: 0.9,
        });
        let extraction = extractor.extract(&words(10, "w"));
        assert_eq!(extraction.sections[0].word_count, 5);
        assert_eq!(extraction.sections[1].word_count, 1);
    }

    #[test]
    fn test_fallback_parts_never_overlap() {
        let split = FallbackSplit {
            head_fraction: 0.9,
            tail_start_fraction: 0.2,
        };
        assert_eq!(split.bounds(10), (9, 9));
    }

    #[test]
    fn test_empty_document_is_unusable() {
        let extraction = extract_sections("   \n ");
        assert!(!extraction.is_usable());
        assert!(extraction.sections.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let text = "Abstract a b c. Introduction d e f. Results g h. Conclusion i j. Appendix k.";
        assert_eq!(extract_sections(text), extract_sections(text));
    }
}
