use leadvox_core::domain::action::{Action, ExtractedEntities, Intent};

use crate::context::UserContext;
use crate::entities::EntityExtractor;

const PHRASE_CONFIDENCE: f32 = 0.9;
const KEYWORD_CONFIDENCE: f32 = 0.8;
const CONFIRMATION_CONFIDENCE: f32 = 0.95;
const UNKNOWN_CONFIDENCE: f32 = 0.3;

/// One detection rule. A rule matches on the phrase tier when the input
/// contains any whole phrase, and on the keyword tier when the input contains
/// at least one keyword AND at least one verb (independently, not adjacent).
#[derive(Clone, Copy, Debug)]
pub struct IntentRule {
    pub intent: Intent,
    pub phrases: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub verbs: &'static [&'static str],
}

/// The rule table. Order is a contract: within a tier the first matching rule
/// wins, so reordering entries changes classification of ambiguous input.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::CreateLead,
        phrases: &["додай ліда", "додати ліда", "потрібно додати", "новий ліда", "new lead"],
        keywords: &["лід", "ліда", "лідів"],
        verbs: &["додай", "додати", "потрібно", "створи", "створити", "новий", "new", "add", "create"],
    },
    IntentRule {
        intent: Intent::ListLeads,
        phrases: &["покажи ліди", "show leads", "мої ліди", "список лідів"],
        keywords: &["лід", "ліди", "лідів", "lead", "leads"],
        verbs: &["покажи", "показати", "список", "show", "list", "мої", "всі"],
    },
    IntentRule {
        intent: Intent::ShowNotes,
        phrases: &["покажи нотатки", "show notes"],
        keywords: &["нотатк", "нотаток", "нотатки", "заміт", "note", "notes"],
        verbs: &["покажи", "показати", "show", "мої"],
    },
    IntentRule {
        intent: Intent::AddNote,
        phrases: &["додай нотатку", "add note"],
        keywords: &["нотатк", "нотатку", "заміт", "note"],
        verbs: &["додай", "додати", "запиши", "записати", "add", "create"],
    },
    IntentRule {
        intent: Intent::Stats,
        phrases: &["статистика", "show stats"],
        keywords: &["статистик", "звіт", "stats", "дашборд", "dashboard"],
        verbs: &["покажи", "show"],
    },
    IntentRule {
        intent: Intent::Search,
        phrases: &["знайди", "search"],
        keywords: &["знайди", "пошук", "search", "find", "шукай"],
        verbs: &["знайди", "шукай", "search", "find"],
    },
    IntentRule {
        intent: Intent::Sales,
        phrases: &["продажі", "sales", "pipeline"],
        keywords: &["продаж", "sale", "sales", "pipeline", "воронк"],
        verbs: &["покажи", "show"],
    },
    IntentRule {
        intent: Intent::AnalyzeLead,
        phrases: &["гарячі ліди", "hot leads", "оціни ліда"],
        keywords: &["гаряч", "найкращ", "best", "hot", "top", "оцін", "score", "аналіз", "analyze"],
        verbs: &["оціни", "проаналізуй", "analyze"],
    },
    IntentRule {
        intent: Intent::EditLead,
        phrases: &["редагуй ліда", "edit lead"],
        keywords: &["лід", "ліда"],
        verbs: &["редагуй", "редагувати", "зміни", "змінити", "edit", "change", "онов"],
    },
    IntentRule {
        intent: Intent::DeleteLead,
        phrases: &["видали ліда", "delete lead"],
        keywords: &["лід", "ліда", "лідів"],
        verbs: &["видали", "видалити", "delete", "remove"],
    },
];

/// Shared yes/no vocabulary: used by the detection cascade's third tier and
/// by the orchestrator when classifying a reply to a pending confirmation.
pub const AFFIRMATIONS: &[&str] = &["так", "yes", "підтверджую", "confirm", "ок", "окей"];
pub const NEGATIONS: &[&str] = &["ні", "no", "скасуй", "cancel", "відміна"];

pub fn is_affirmative(text: &str) -> bool {
    contains_token(text, AFFIRMATIONS)
}

pub fn is_negative(text: &str) -> bool {
    contains_token(text, NEGATIONS)
}

fn contains_token(text: &str, vocabulary: &[&str]) -> bool {
    text.to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .any(|token| vocabulary.contains(&token))
}

/// Classifies raw text into one `Action`. Pure apart from reading (never
/// mutating) the optional context, and total: unclassifiable input becomes
/// `Intent::Unknown` at low confidence with entities still extracted.
#[derive(Clone, Debug, Default)]
pub struct IntentDetector {
    extractor: EntityExtractor,
}

impl IntentDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&self, text: &str, context: Option<&UserContext>) -> Action {
        let lowered = text.to_lowercase();

        // Tier 1: whole canonical phrases.
        for rule in INTENT_RULES {
            if rule.phrases.iter().any(|phrase| lowered.contains(phrase)) {
                return self.classified(rule.intent, PHRASE_CONFIDENCE, text, context);
            }
        }

        // Tier 2: keyword + verb, both present anywhere in the input.
        for rule in INTENT_RULES {
            let has_keyword = rule.keywords.iter().any(|keyword| lowered.contains(keyword));
            let has_verb = rule.verbs.iter().any(|verb| lowered.contains(verb));
            if has_keyword && has_verb {
                return self.classified(rule.intent, KEYWORD_CONFIDENCE, text, context);
            }
        }

        // Tier 3: bare confirmation / cancellation tokens.
        if is_affirmative(&lowered) {
            return Action::new(Intent::Confirm, ExtractedEntities::default(), CONFIRMATION_CONFIDENCE, text);
        }
        if is_negative(&lowered) {
            return Action::new(Intent::Cancel, ExtractedEntities::default(), CONFIRMATION_CONFIDENCE, text);
        }

        let entities = self.extractor.extract(text);
        Action::new(Intent::Unknown, entities, UNKNOWN_CONFIDENCE, text)
    }

    fn classified(
        &self,
        intent: Intent,
        confidence: f32,
        text: &str,
        context: Option<&UserContext>,
    ) -> Action {
        let mut entities = self.extractor.extract(text);
        // Context only ever fills a missing identifier; it never changes
        // which intent wins.
        if entities.lead_id.is_none() {
            if let Some(context) = context {
                entities.lead_id = context.last_lead_id;
            }
        }
        Action::new(intent, entities, confidence, text)
    }
}

#[cfg(test)]
mod tests {
    use leadvox_core::domain::action::Intent;

    use crate::context::UserContext;

    use super::{is_affirmative, is_negative, IntentDetector, INTENT_RULES};

    #[test]
    fn phrase_tier_wins_in_both_languages() {
        let detector = IntentDetector::new();

        let uk = detector.detect("покажи ліди за тиждень", None);
        assert_eq!(uk.intent, Intent::ListLeads);
        assert!((uk.confidence - 0.9).abs() < f32::EPSILON);

        let en = detector.detect("please show leads", None);
        assert_eq!(en.intent, Intent::ListLeads);
    }

    #[test]
    fn keyword_and_verb_must_both_be_present() {
        let detector = IntentDetector::new();

        let with_both = detector.detect("видалити цього ліда будь ласка", None);
        assert_eq!(with_both.intent, Intent::DeleteLead);
        assert!((with_both.confidence - 0.8).abs() < f32::EPSILON);

        // A keyword without any verb from the same rule is not enough.
        let keyword_only = detector.detect("ліда", None);
        assert_eq!(keyword_only.intent, Intent::Unknown);
    }

    #[test]
    fn exact_phrase_outranks_keyword_verb_combination() {
        let detector = IntentDetector::new();

        // Keyword tier alone would classify this as CreateLead (keyword
        // "лідів" + verb "додай", and CreateLead is declared first), but the
        // DeleteLead phrase must win.
        let action = detector.detect("додай лідів delete lead", None);
        assert_eq!(action.intent, Intent::DeleteLead);
        assert!((action.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn declared_order_breaks_keyword_tier_ties() {
        let detector = IntentDetector::new();

        // Both ListLeads (keyword "ліди" + verb "всі") and DeleteLead
        // (keyword "лід" + verb "видали") satisfy the keyword tier here; the
        // rule declared first wins.
        let action = detector.detect("видали всі ліди", None);
        assert_eq!(action.intent, Intent::ListLeads);

        // Sanity-check the contract itself.
        assert_eq!(INTENT_RULES[0].intent, Intent::CreateLead);
        assert_eq!(INTENT_RULES[INTENT_RULES.len() - 1].intent, Intent::DeleteLead);
    }

    #[test]
    fn english_note_command_is_add_note_not_create_lead() {
        // CreateLead keywords are deliberately Ukrainian-only, so an English
        // note command about a lead does not collide with lead creation.
        let detector = IntentDetector::new();
        let action = detector.detect("add a note to lead #5", None);
        assert_eq!(action.intent, Intent::AddNote);
        assert_eq!(action.entities.lead_id, Some(5));
    }

    #[test]
    fn bare_confirmation_tokens_reach_tier_three() {
        let detector = IntentDetector::new();

        assert_eq!(detector.detect("так", None).intent, Intent::Confirm);
        assert_eq!(detector.detect("yes", None).intent, Intent::Confirm);
        assert_eq!(detector.detect("ні", None).intent, Intent::Cancel);
        assert_eq!(detector.detect("cancel", None).intent, Intent::Cancel);

        let confirm = detector.detect("ок", None);
        assert!((confirm.confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn unmatched_text_is_unknown_with_entities_extracted() {
        let detector = IntentDetector::new();
        let action = detector.detect("подзвони на +380501112233 завтра", None);
        assert_eq!(action.intent, Intent::Unknown);
        assert!((action.confidence - 0.3).abs() < f32::EPSILON);
        assert_eq!(action.entities.phone.as_deref(), Some("+380501112233"));
    }

    #[test]
    fn detect_is_total_on_adversarial_input() {
        let detector = IntentDetector::new();
        for text in ["", "    ", "\u{0000}", "####", "aaaaaaaaaaaaaaaaaaaa", "так ні yes no"] {
            let action = detector.detect(text, None);
            assert!(action.confidence > 0.0, "input {text:?} must classify");
        }
    }

    #[test]
    fn context_fills_missing_identifier_without_changing_intent() {
        let detector = IntentDetector::new();
        let mut context = UserContext::new(7);
        context.last_lead_id = Some(42);
        context.last_lead_name = Some("Nikolas".to_owned());

        let action = detector.detect("покажи нотатки", Some(&context));
        assert_eq!(action.intent, Intent::ShowNotes);
        assert_eq!(action.entities.lead_id, Some(42));

        let explicit = detector.detect("покажи нотатки ліда #9", Some(&context));
        assert_eq!(explicit.entities.lead_id, Some(9));
    }

    #[test]
    fn yes_no_vocabulary_matches_whole_tokens_only() {
        assert!(is_affirmative("Так, підтверджую"));
        assert!(is_negative("ні!"));
        // Tokens embedded inside longer words must not trigger.
        assert!(!is_affirmative("такий собі план"));
        assert!(!is_negative("note"));
    }
}
