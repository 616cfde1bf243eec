use std::sync::OnceLock;

use regex::Regex;

use leadvox_core::domain::action::ExtractedEntities;
use leadvox_core::domain::lead::{BusinessDomain, LeadSource, LeadStage};

/// Pulls structured fields out of raw text. Pure and total: an input that
/// matches nothing yields an empty `ExtractedEntities`, never an error.
///
/// The vocabulary is bilingual (Ukrainian and English) by construction, not
/// switched per locale; voice transcripts routinely mix both.
#[derive(Clone, Debug, Default)]
pub struct EntityExtractor;

impl EntityExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedEntities {
        let lowered = text.to_lowercase();

        ExtractedEntities {
            lead_id: extract_lead_id(&lowered),
            lead_name: extract_lead_name(text),
            phone: extract_phone(text),
            email: extract_email(text),
            stage: extract_stage(&lowered),
            source: extract_source(&lowered),
            business_domain: extract_business_domain(&lowered),
            note_content: extract_note_content(text, &lowered),
            search_query: extract_search_query(&lowered),
        }
    }
}

/// Most specific phrasing first; the bare `#<digits>` shape is the catch-all.
fn lead_id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"до\s*лід[ау]\s*#?(\d+)",
            r"для\s*лід[ау]\s*#?(\d+)",
            r"лід\s*#?(\d+)",
            r"lead\s*#?(\d+)",
            r"#(\d+)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("static lead id pattern compiles"))
        .collect()
    })
}

fn extract_lead_id(lowered: &str) -> Option<i64> {
    for pattern in lead_id_patterns() {
        if let Some(captures) = pattern.captures(lowered) {
            // Oversized digit runs are discarded silently, not raised.
            if let Some(id) = captures.get(1).and_then(|digits| digits.as_str().parse().ok()) {
                return Some(id);
            }
        }
    }
    None
}

fn phone_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"\+?380\d{9}", r"\+?\d{10,12}"]
            .iter()
            .map(|pattern| Regex::new(pattern).expect("static phone pattern compiles"))
            .collect()
    })
}

fn extract_phone(text: &str) -> Option<String> {
    phone_patterns()
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| found.as_str().to_owned())
}

fn extract_email(text: &str) -> Option<String> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let pattern = EMAIL
        .get_or_init(|| Regex::new(r"[\w.\-]+@[\w.\-]+\.\w+").expect("static email pattern compiles"));
    pattern.find(text).map(|found| found.as_str().to_owned())
}

fn name_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)додай\s+(?:нового\s+)?ліда[.,]?\s*([А-Яа-яЁёЇїІіЄєҐґA-Za-z]+(?:\s+[А-Яа-яЁёЇїІіЄєҐґA-Za-z]+)?)",
            r"(?i)(?:new|add)\s+lead[.,]?\s+([A-Za-zА-Яа-яЁёЇїІіЄєҐґ]+(?:\s+[A-Za-zА-Яа-яЁёЇїІіЄєҐґ]+)?)",
            r"(?i)лід[ау]?[.,]?\s+([А-Яа-яЁёЇїІіЄєҐґA-Za-z]+(?:\s+[А-Яа-яЁёЇїІіЄєҐґA-Za-z]+)?)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("static name pattern compiles"))
        .collect()
    })
}

/// Command words a captured "name" must not contain; keeps the verb of the
/// command itself from being read as a person.
const NAME_STOPLIST: &[&str] =
    &["додай", "додати", "ліда", "номер", "add", "lead", "number", "note", "нотатк"];

fn extract_lead_name(text: &str) -> Option<String> {
    for pattern in name_patterns() {
        if let Some(captures) = pattern.captures(text) {
            let candidate = captures.get(1).map(|name| name.as_str().trim()).unwrap_or("");
            let candidate_lowered = candidate.to_lowercase();
            let looks_like_command =
                NAME_STOPLIST.iter().any(|word| candidate_lowered.contains(word));
            if candidate.chars().count() > 2 && !looks_like_command {
                return Some(candidate.to_owned());
            }
        }
    }
    None
}

fn extract_stage(lowered: &str) -> Option<LeadStage> {
    let table: &[(&[&str], LeadStage)] = &[
        (&["кваліфік", "qualified"], LeadStage::Qualified),
        (&["контактов", "contacted"], LeadStage::Contacted),
        (&["передан", "transferred"], LeadStage::Transferred),
        (&["втрачен", "lost"], LeadStage::Lost),
        (&["нов", "new"], LeadStage::New),
    ];
    table
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(_, stage)| *stage)
}

fn extract_source(lowered: &str) -> Option<LeadSource> {
    if lowered.contains("сканер") || lowered.contains("scanner") {
        Some(LeadSource::Scanner)
    } else if lowered.contains("партнер") || lowered.contains("partner") {
        Some(LeadSource::Partner)
    } else {
        None
    }
}

fn extract_business_domain(lowered: &str) -> Option<BusinessDomain> {
    if lowered.contains("перший") || lowered.contains("first") {
        Some(BusinessDomain::First)
    } else if lowered.contains("другий") || lowered.contains("second") {
        Some(BusinessDomain::Second)
    } else if lowered.contains("третій") || lowered.contains("third") {
        Some(BusinessDomain::Third)
    } else {
        None
    }
}

const SEARCH_TRIGGERS: &[&str] = &["знайди", "шукай", "search", "find"];

fn extract_search_query(lowered: &str) -> Option<String> {
    for trigger in SEARCH_TRIGGERS {
        if let Some(position) = lowered.find(trigger) {
            let query = lowered[position + trigger.len()..].trim();
            if !query.is_empty() {
                return Some(query.to_owned());
            }
        }
    }
    None
}

const NOTE_TRIGGERS: &[&str] = &["додай нотатку", "add note", "запиши", "нотатка"];

fn extract_note_content(text: &str, lowered: &str) -> Option<String> {
    for trigger in NOTE_TRIGGERS {
        if let Some(position) = lowered.find(trigger) {
            // Slice the original text by char offset to keep the author's
            // casing in the note body.
            let skip = lowered[..position].chars().count() + trigger.chars().count();
            let content: String = text.chars().skip(skip).collect();
            let content = content.trim();
            if !content.is_empty() {
                return Some(content.to_owned());
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use leadvox_core::domain::lead::{BusinessDomain, LeadSource, LeadStage};

    use super::EntityExtractor;

    #[test]
    fn extracts_lead_id_from_specific_and_bare_shapes() {
        let extractor = EntityExtractor::new();

        assert_eq!(extractor.extract("покажи лід #15").lead_id, Some(15));
        assert_eq!(extractor.extract("show lead 7").lead_id, Some(7));
        assert_eq!(extractor.extract("додай нотатку до ліда 12").lead_id, Some(12));
        assert_eq!(extractor.extract("#33 виглядає гарячим").lead_id, Some(33));
        assert_eq!(extractor.extract("без ідентифікатора").lead_id, None);
    }

    #[test]
    fn oversized_id_digits_are_discarded_silently() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("lead #99999999999999999999999999");
        assert_eq!(entities.lead_id, None);
    }

    #[test]
    fn extracts_contact_details() {
        let extractor = EntityExtractor::new();
        let entities =
            extractor.extract("додай ліда Марко Вовчок +380501234567 marko@example.com");

        assert_eq!(entities.phone.as_deref(), Some("+380501234567"));
        assert_eq!(entities.email.as_deref(), Some("marko@example.com"));
        assert_eq!(entities.lead_name.as_deref(), Some("Марко Вовчок"));
    }

    #[test]
    fn generic_long_digit_run_counts_as_phone() {
        let extractor = EntityExtractor::new();
        assert_eq!(extractor.extract("call 4915112345678").phone.as_deref(), Some("491511234567"));
    }

    #[test]
    fn rejects_command_words_as_names() {
        let extractor = EntityExtractor::new();
        assert_eq!(extractor.extract("додай ліда номер п'ять").lead_name, None);
        assert_eq!(extractor.extract("додай ліда ще").lead_name, None);
    }

    #[test]
    fn extracts_categorical_tags_in_either_language() {
        let extractor = EntityExtractor::new();

        let scanner = extractor.extract("лід зі сканера, перший напрямок");
        assert_eq!(scanner.source, Some(LeadSource::Scanner));
        assert_eq!(scanner.business_domain, Some(BusinessDomain::First));

        let partner = extractor.extract("partner lead for the second domain");
        assert_eq!(partner.source, Some(LeadSource::Partner));
        assert_eq!(partner.business_domain, Some(BusinessDomain::Second));
    }

    #[test]
    fn extracts_stage_keywords() {
        let extractor = EntityExtractor::new();
        assert_eq!(extractor.extract("знайди кваліфіковані ліди").stage, Some(LeadStage::Qualified));
        assert_eq!(extractor.extract("show contacted leads").stage, Some(LeadStage::Contacted));
    }

    #[test]
    fn search_query_is_remainder_after_trigger() {
        let extractor = EntityExtractor::new();
        assert_eq!(
            extractor.extract("знайди гарячі ліди за тиждень").search_query.as_deref(),
            Some("гарячі ліди за тиждень")
        );
        assert_eq!(extractor.extract("знайди").search_query, None);
    }

    #[test]
    fn note_content_keeps_original_casing() {
        let extractor = EntityExtractor::new();
        let entities = extractor.extract("Додай нотатку Зустріч у Вівторок о 15:00");
        assert_eq!(entities.note_content.as_deref(), Some("Зустріч у Вівторок о 15:00"));
    }

    #[test]
    fn empty_and_adversarial_input_yield_empty_entities() {
        let extractor = EntityExtractor::new();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("\u{0000}\u{FFFD}🤖🤖🤖").is_empty());
    }
}
