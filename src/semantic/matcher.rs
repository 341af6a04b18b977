//! Offline field matching: exact → substring → word overlap → embedding → fuzzy.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, warn};

use crate::conversation::{FieldValue, names};
use crate::semantic::embedding::Embedder;
use crate::semantic::intent::{INTENT_EXAMPLES, Intent, QUALIFIED_CONFIDENCE, QUALIFIED_PATTERNS};
use crate::semantic::knowledge::{self, Category, FAMILY_WORDS, FIELD_SEMANTICS, STOP_WORDS};
use crate::semantic::similarity::{cosine_similarity, fuzzy_score, tokenize};

/// How a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Substring,
    ReverseSubstring,
    WordOverlap,
    Embedding,
    Fuzzy,
    Intent,
    FamilyContext,
    Pattern,
    WordNumber,
}

impl MatchMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Substring => "substring",
            Self::ReverseSubstring => "reverse_substring",
            Self::WordOverlap => "word_overlap",
            Self::Embedding => "embedding",
            Self::Fuzzy => "fuzzy",
            Self::Intent => "intent",
            Self::FamilyContext => "family_context",
            Self::Pattern => "pattern",
            Self::WordNumber => "word_number",
        }
    }
}

/// A matched field value.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticMatch {
    pub field: String,
    pub value: FieldValue,
    pub confidence: f32,
    pub method: MatchMethod,
    pub intent: Option<Intent>,
}

impl SemanticMatch {
    fn new(field: &str, value: FieldValue, confidence: f32, method: MatchMethod) -> Self {
        Self {
            field: field.to_string(),
            value,
            confidence,
            method,
            intent: None,
        }
    }

    fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }
}

const MIN_MATCH: f32 = 0.5;
const EMBEDDING_TRIGGER: f32 = 0.7;
const EMBEDDING_ACCEPT: f32 = 0.6;
const FUZZY_TRIGGER: f32 = 0.6;
const FUZZY_ACCEPT: f32 = 0.6;
const FUZZY_PENALTY: f32 = 0.8;
const REVERSE_PENALTY: f32 = 0.9;
const OVERLAP_PENALTY: f32 = 0.85;
const CONTEXT_BOOST: f32 = 1.3;
const CONTEXT_DOMINANCE: f32 = 0.7;
/// Entries kept in the intent cache before it is cleared.
const INTENT_CACHE_CAPACITY: usize = 1024;
const FAMILY_CONTEXT_CONFIDENCE: f32 = 0.9;

type AgeExtractor = fn(&Captures) -> Option<u32>;

fn group(caps: &Captures, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

static AGE_PATTERNS: Lazy<Vec<(Regex, AgeExtractor)>> = Lazy::new(|| {
    let table: [(&str, AgeExtractor); 6] = [
        (r"(?i)\b(\d{1,3})\s*(years?\s*old|y/?o|yrs?)\b", |c| group(c, 1)),
        (r"(?i)\b(?:i'?m|i am|am)\s*(\d{2,3})\b", |c| group(c, 1)),
        (r"(?i)\bmid[- ]?(\d)0'?s?\b", |c| group(c, 1).map(|d| d * 10 + 5)),
        (r"(?i)\b(early)\s*(\d)0'?s?\b", |c| group(c, 2).map(|d| d * 10 + 2)),
        (r"(?i)\b(late)\s*(\d)0'?s?\b", |c| group(c, 2).map(|d| d * 10 + 8)),
        (r"^(\d{2,3})$", |c| group(c, 1)),
    ];
    table
        .into_iter()
        .map(|(p, f)| (Regex::new(p).expect("valid age pattern"), f))
        .collect()
});

static SPELLED_AGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(twenty|thirty|forty|fifty|sixty|seventy|eighty|ninety)[\s-]?(one|two|three|four|five|six|seven|eight|nine)\b",
    )
    .expect("valid spelled age pattern")
});

fn tens(word: &str) -> Option<u32> {
    let v = match word {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(v)
}

fn ones(word: &str) -> Option<u32> {
    let v = match word {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        _ => return None,
    };
    Some(v)
}

/// Precomputed phrase vectors for one category.
struct CategoryVectors {
    category: &'static Category,
    vectors: Vec<Vec<f32>>,
}

struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    fields: HashMap<&'static str, Vec<CategoryVectors>>,
    intents: Vec<(Intent, Vec<Vec<f32>>)>,
}

impl EmbeddingIndex {
    fn build(embedder: Arc<dyn Embedder>) -> Result<Self, crate::error::EmbeddingError> {
        let embed_all = |phrases: &[&str]| -> Result<Vec<Vec<f32>>, crate::error::EmbeddingError> {
            phrases.iter().map(|p| embedder.embed(p)).collect()
        };

        let mut fields = HashMap::new();
        for (field, categories) in FIELD_SEMANTICS {
            let mut per_field = Vec::with_capacity(categories.len());
            for category in categories.iter() {
                per_field.push(CategoryVectors {
                    category,
                    vectors: embed_all(category.phrases)?,
                });
            }
            fields.insert(*field, per_field);
        }

        let mut intents = Vec::with_capacity(INTENT_EXAMPLES.len());
        for (intent, examples) in INTENT_EXAMPLES {
            intents.push((*intent, embed_all(examples)?));
        }

        Ok(Self {
            embedder,
            fields,
            intents,
        })
    }

    fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.embedder.embed(text) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(error = %e, "Embedding failed, skipping embedding tier");
                None
            }
        }
    }
}

fn max_similarity(query: &[f32], vectors: &[Vec<f32>]) -> f32 {
    vectors
        .iter()
        .map(|v| cosine_similarity(query, v) as f32)
        .fold(0.0, f32::max)
}

fn char_len(s: &str) -> f32 {
    s.chars().count().max(1) as f32
}

/// Intent classification and closed-vocabulary field matching.
///
/// Works fully offline. An optional `Embedder` adds a similarity tier for
/// paraphrases the phrase tables miss.
pub struct SemanticMatcher {
    index: Option<EmbeddingIndex>,
    intent_cache: Mutex<HashMap<String, (Intent, f32)>>,
}

impl Default for SemanticMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticMatcher {
    /// Matcher without an embedding tier.
    pub fn new() -> Self {
        Self {
            index: None,
            intent_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Matcher with an embedding tier. Phrase vectors are computed up front;
    /// if that fails the matcher runs without embeddings.
    pub fn with_embedder(embedder: Arc<dyn Embedder>) -> Self {
        let model = embedder.model_name().to_string();
        let index = match EmbeddingIndex::build(embedder) {
            Ok(index) => {
                debug!(model = %model, "Semantic matcher using embeddings");
                Some(index)
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Could not precompute phrase embeddings");
                None
            }
        };
        Self {
            index,
            intent_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn uses_embeddings(&self) -> bool {
        self.index.is_some()
    }

    /// Classify the intent of a reply. Deterministic, with a bounded cache
    /// keyed by normalized text.
    pub fn classify_intent(&self, text: &str) -> (Intent, f32) {
        let text_lower = text.trim().to_lowercase();

        if let Ok(cache) = self.intent_cache.lock()
            && let Some(hit) = cache.get(&text_lower)
        {
            return *hit;
        }

        let result = self.classify_uncached(&text_lower);
        if let Ok(mut cache) = self.intent_cache.lock() {
            if cache.len() >= INTENT_CACHE_CAPACITY {
                cache.clear();
            }
            cache.insert(text_lower, result);
        }
        result
    }

    fn classify_uncached(&self, text_lower: &str) -> (Intent, f32) {
        for (intent, pattern) in QUALIFIED_PATTERNS.iter() {
            if pattern.is_match(text_lower) {
                return (*intent, QUALIFIED_CONFIDENCE);
            }
        }

        let mut best_intent = Intent::Informative;
        let mut best_score = 0.0_f32;

        for (intent, examples) in INTENT_EXAMPLES {
            for example in examples.iter() {
                if *example == text_lower {
                    return (*intent, 1.0);
                }
                if text_lower.contains(example) {
                    let score = char_len(example) / char_len(text_lower);
                    if score > best_score {
                        best_score = score;
                        best_intent = *intent;
                    }
                }
            }
        }

        if best_score < EMBEDDING_TRIGGER
            && let Some(index) = &self.index
            && let Some(query) = index.embed(text_lower)
        {
            for (intent, vectors) in &index.intents {
                let sim = max_similarity(&query, vectors);
                if sim > best_score {
                    best_score = sim;
                    best_intent = *intent;
                }
            }
        }

        (best_intent, best_score.min(1.0))
    }

    /// Match text against one field's vocabulary.
    pub fn match_field(&self, text: &str, field: &str) -> Option<SemanticMatch> {
        let categories = knowledge::categories(field)?;
        let text_lower = text.trim().to_lowercase();

        let mut best: Option<&Category> = None;
        let mut best_score = 0.0_f32;
        let mut method = MatchMethod::Pattern;

        for category in categories {
            for phrase in category.phrases {
                if *phrase == text_lower {
                    let intent = self.classify_intent(text).0;
                    return Some(
                        SemanticMatch::new(
                            field,
                            FieldValue::text(category.value),
                            1.0,
                            MatchMethod::Exact,
                        )
                        .with_intent(intent),
                    );
                }

                if text_lower.contains(phrase) {
                    let score = char_len(phrase) / char_len(&text_lower);
                    if score > best_score {
                        best_score = score;
                        best = Some(category);
                        method = MatchMethod::Substring;
                    }
                }

                if text_lower.chars().count() > 2 && phrase.contains(text_lower.as_str()) {
                    let score = char_len(&text_lower) / char_len(phrase) * REVERSE_PENALTY;
                    if score > best_score {
                        best_score = score;
                        best = Some(category);
                        method = MatchMethod::ReverseSubstring;
                    }
                }
            }
        }

        let text_words: HashSet<String> = tokenize(&text_lower)
            .into_iter()
            .filter(|w| !STOP_WORDS.contains(w.as_str()))
            .collect();
        if !text_words.is_empty() {
            for category in categories {
                for phrase in category.phrases {
                    let phrase_words: HashSet<String> = tokenize(phrase)
                        .into_iter()
                        .filter(|w| !STOP_WORDS.contains(w.as_str()))
                        .collect();
                    if phrase_words.is_empty() {
                        continue;
                    }
                    let overlap = text_words.intersection(&phrase_words).count();
                    if overlap > 0 {
                        let score = overlap as f32 / text_words.len().max(phrase_words.len()) as f32
                            * OVERLAP_PENALTY;
                        if score > best_score {
                            best_score = score;
                            best = Some(category);
                            method = MatchMethod::WordOverlap;
                        }
                    }
                }
            }
        }

        if best_score < EMBEDDING_TRIGGER
            && let Some(index) = &self.index
            && let Some(per_field) = index.fields.get(field)
            && let Some(query) = index.embed(&text_lower)
        {
            for entry in per_field {
                let sim = max_similarity(&query, &entry.vectors);
                if sim > EMBEDDING_ACCEPT && sim > best_score {
                    best_score = sim;
                    best = Some(entry.category);
                    method = MatchMethod::Embedding;
                }
            }
        }

        if best_score < FUZZY_TRIGGER
            && let Some((category, score)) = fuzzy_match(&text_lower, categories)
            && score > best_score
        {
            best_score = score;
            best = Some(category);
            method = MatchMethod::Fuzzy;
        }

        let category = best?;
        if best_score < MIN_MATCH {
            return None;
        }
        let intent = self.classify_intent(text).0;
        Some(
            SemanticMatch::new(field, FieldValue::text(category.value), best_score, method)
                .with_intent(intent),
        )
    }

    /// Everything detectable in one message.
    ///
    /// `context_field` is the slot the previous question asked about. Short
    /// yes/no/unsure replies are mapped onto it, its own score is boosted, and
    /// when it matched, weaker matches for other slots are dropped.
    pub fn extract_all_fields(
        &self,
        text: &str,
        context_field: Option<&str>,
    ) -> BTreeMap<String, SemanticMatch> {
        let mut results: BTreeMap<String, SemanticMatch> = BTreeMap::new();
        let (intent, intent_confidence) = self.classify_intent(text);

        if let Some(ctx) = context_field
            && let Some(m) = intent_match(ctx, intent, intent_confidence)
        {
            results.insert(ctx.to_string(), m);
        }

        let words = tokenize(text);
        let has_family_context = words.iter().any(|w| FAMILY_WORDS.contains(&w.as_str()));
        if has_family_context && !results.contains_key(names::FAMILY_HISTORY) {
            results.insert(
                names::FAMILY_HISTORY.to_string(),
                SemanticMatch::new(
                    names::FAMILY_HISTORY,
                    FieldValue::text(text.trim()),
                    FAMILY_CONTEXT_CONFIDENCE,
                    MatchMethod::FamilyContext,
                )
                .with_intent(intent),
            );
        }

        for (field, _) in FIELD_SEMANTICS {
            if results.contains_key(*field) {
                continue;
            }
            if *field == names::CONDITIONS && has_family_context {
                continue;
            }
            let Some(mut m) = self.match_field(text, field) else {
                continue;
            };
            if context_field == Some(*field) {
                m.confidence = (m.confidence * CONTEXT_BOOST).min(1.0);
            }
            results.insert(field.to_string(), m);
        }

        if let Some(age) = extract_age(text) {
            results.insert(names::AGE.to_string(), age);
        }

        if let Some(ctx) = context_field
            && results.contains_key(ctx)
        {
            results.retain(|name, m| name == ctx || m.confidence >= CONTEXT_DOMINANCE);
        }

        results
    }

    /// Rephrased question for a field, escalating with the attempt number.
    pub fn clarification(&self, text: &str, field: &str, attempt: u32) -> String {
        knowledge::clarification(text, field, attempt)
    }
}

fn intent_match(ctx: &str, intent: Intent, confidence: f32) -> Option<SemanticMatch> {
    let yes_no = [names::SMOKING, names::ALCOHOL];
    let none_fields = [names::CONDITIONS, names::FAMILY_HISTORY, names::CONSTRAINTS];

    let (value, score) = match intent {
        Intent::Negative if confidence > 0.7 => {
            if none_fields.contains(&ctx) {
                ("none", confidence)
            } else if yes_no.contains(&ctx) {
                ("no", confidence)
            } else {
                return None;
            }
        }
        Intent::Affirmative if confidence > 0.7 => {
            if ctx == names::FAMILY_HISTORY || yes_no.contains(&ctx) {
                ("yes", confidence)
            } else {
                return None;
            }
        }
        Intent::Uncertain if confidence > 0.6 && none_fields.contains(&ctx) => {
            ("uncertain", confidence * 0.7)
        }
        _ => return None,
    };

    Some(
        SemanticMatch::new(ctx, FieldValue::text(value), score, MatchMethod::Intent)
            .with_intent(intent),
    )
}

fn fuzzy_match(text: &str, categories: &'static [Category]) -> Option<(&'static Category, f32)> {
    let mut best: Option<&'static Category> = None;
    let mut best_score = 0.0_f32;
    for category in categories {
        for phrase in category.phrases {
            let score = fuzzy_score(text, phrase);
            if score > best_score {
                best_score = score;
                best = Some(category);
            }
        }
    }
    if best_score >= FUZZY_ACCEPT {
        best.map(|c| (c, best_score * FUZZY_PENALTY))
    } else {
        None
    }
}

/// Age from digits, decade phrases, or spelled-out numbers. 1..=120 only.
pub fn extract_age(text: &str) -> Option<SemanticMatch> {
    let trimmed = text.trim();
    for (pattern, extract) in AGE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(trimmed)
            && let Some(age) = extract(&caps)
            && (1..=120).contains(&age)
        {
            return Some(SemanticMatch::new(
                names::AGE,
                FieldValue::from(age),
                0.95,
                MatchMethod::Pattern,
            ));
        }
    }

    let lower = trimmed.to_lowercase();
    let caps = SPELLED_AGE.captures(&lower)?;
    let age = tens(caps.get(1)?.as_str())? + ones(caps.get(2)?.as_str())?;
    Some(SemanticMatch::new(
        names::AGE,
        FieldValue::from(age),
        0.9,
        MatchMethod::WordNumber,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;

    fn matcher() -> SemanticMatcher {
        SemanticMatcher::new()
    }

    // ── Intent tests ────────────────────────────────────────────────

    #[test]
    fn exact_intents() {
        let m = matcher();
        assert_eq!(m.classify_intent("yes"), (Intent::Affirmative, 1.0));
        assert_eq!(m.classify_intent("  Nope "), (Intent::Negative, 1.0));
        assert_eq!(m.classify_intent("not sure"), (Intent::Uncertain, 1.0));
    }

    #[test]
    fn qualified_intents_win() {
        let m = matcher();
        assert_eq!(
            m.classify_intent("yes but only on weekends"),
            (Intent::QualifiedYes, 0.85)
        );
        assert_eq!(
            m.classify_intent("no, except at weddings"),
            (Intent::QualifiedNo, 0.85)
        );
    }

    #[test]
    fn intent_cache_stays_bounded() {
        let m = matcher();
        for i in 0..(INTENT_CACHE_CAPACITY * 3) {
            m.classify_intent(&format!("message number {i}"));
        }
        let cached = m.intent_cache.lock().unwrap().len();
        assert!(cached <= INTENT_CACHE_CAPACITY);

        // Cleared entries are recomputed identically.
        assert_eq!(m.classify_intent("yes"), (Intent::Affirmative, 1.0));
    }

    #[test]
    fn substring_intent_scores_by_length() {
        let (intent, score) = matcher().classify_intent("i have diabetes");
        assert_eq!(intent, Intent::Affirmative);
        assert!((score - 6.0 / 15.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_text_is_informative() {
        assert_eq!(matcher().classify_intent("rice"), (Intent::Informative, 0.0));
    }

    // ── Field matching tests ────────────────────────────────────────

    #[test]
    fn exact_field_match() {
        let m = matcher().match_field("Male", names::SEX).unwrap();
        assert_eq!(m.value, FieldValue::text("male"));
        assert_eq!(m.confidence, 1.0);
        assert_eq!(m.method, MatchMethod::Exact);
    }

    #[test]
    fn substring_field_match_normalizes_value() {
        let m = matcher()
            .match_field("my doctor says I have high blood pressure", names::CONDITIONS)
            .unwrap();
        assert_eq!(m.value, FieldValue::text("hypertension"));
        // three of five content words beat the 19/41 substring ratio
        assert_eq!(m.method, MatchMethod::WordOverlap);
        assert!((m.confidence - 0.51).abs() < 1e-4);

        let m = matcher().match_field("heart disease!", names::CONDITIONS).unwrap();
        assert_eq!(m.value, FieldValue::text("heart disease"));
        assert_eq!(m.method, MatchMethod::Substring);
    }

    #[test]
    fn word_overlap_ignores_stop_words() {
        let m = matcher().match_field("I don't smoke", names::SMOKING).unwrap();
        assert_eq!(m.value, FieldValue::text("no"));
        assert_eq!(m.method, MatchMethod::WordOverlap);
        assert!((m.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn fuzzy_catches_typos() {
        let m = matcher().match_field("diabetis", names::CONDITIONS).unwrap();
        assert_eq!(m.value, FieldValue::text("diabetes"));
        assert_eq!(m.method, MatchMethod::Fuzzy);
        assert!((m.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn unrelated_text_does_not_match() {
        assert!(matcher().match_field("purple", names::ALCOHOL).is_none());
        assert!(matcher().match_field("anything", names::AGE).is_none());
    }

    // ── Whole-message tests ─────────────────────────────────────────

    #[test]
    fn negative_reply_maps_onto_context_field() {
        let fields = matcher().extract_all_fields("nope", Some(names::CONDITIONS));
        let m = &fields[names::CONDITIONS];
        assert_eq!(m.value, FieldValue::text("none"));
        assert_eq!(m.method, MatchMethod::Intent);

        let fields = matcher().extract_all_fields("nope", Some(names::SMOKING));
        assert_eq!(fields[names::SMOKING].value, FieldValue::text("no"));
    }

    #[test]
    fn affirmative_reply_maps_onto_yes_no_field() {
        let fields = matcher().extract_all_fields("yes", Some(names::FAMILY_HISTORY));
        assert_eq!(fields[names::FAMILY_HISTORY].value, FieldValue::text("yes"));
    }

    #[test]
    fn uncertain_reply_is_discounted() {
        let fields = matcher().extract_all_fields("maybe", Some(names::CONDITIONS));
        let m = &fields[names::CONDITIONS];
        assert_eq!(m.value, FieldValue::text("uncertain"));
        assert!((m.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn family_words_route_to_family_history() {
        let text = "My father has diabetes";
        let fields = matcher().extract_all_fields(text, None);
        assert_eq!(fields[names::FAMILY_HISTORY].value, FieldValue::text(text));
        assert_eq!(fields[names::FAMILY_HISTORY].method, MatchMethod::FamilyContext);
        assert!(!fields.contains_key(names::CONDITIONS));
    }

    #[test]
    fn context_boost_and_dominance() {
        let fields = matcher().extract_all_fields("I drink occasionally", Some(names::ALCOHOL));
        let alcohol = &fields[names::ALCOHOL];
        assert_eq!(alcohol.value, FieldValue::text("occasionally"));
        assert!((alcohol.confidence - 0.78).abs() < 1e-4);
        assert!(!fields.contains_key(names::SMOKING));
        assert!(!fields.contains_key(names::ACTIVITY));
    }

    #[test]
    fn ages() {
        let cases = [
            ("I'm 45", 45.0),
            ("45 years old", 45.0),
            ("mid-40s", 45.0),
            ("early 40s", 42.0),
            ("late 30s", 38.0),
            ("62", 62.0),
            ("forty five", 45.0),
            ("thirty-two", 32.0),
        ];
        for (text, expected) in cases {
            let m = extract_age(text).unwrap_or_else(|| panic!("no age in {text:?}"));
            assert_eq!(m.value.as_f64(), Some(expected), "{text}");
        }
        assert_eq!(extract_age("I'm 45").unwrap().confidence, 0.95);
        assert_eq!(extract_age("forty five").unwrap().confidence, 0.9);
        assert!(extract_age("I am 200 years old").is_none());
        assert!(extract_age("hello").is_none());
    }

    // ── Embedding tests ─────────────────────────────────────────────

    struct KeywordEmbedder;

    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword"
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text == "lung trouble" || text == "asthma" {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    struct BrokenEmbedder;

    impl Embedder for BrokenEmbedder {
        fn model_name(&self) -> &str {
            "broken"
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Failed {
                len: text.len(),
                reason: "offline".into(),
            })
        }
    }

    #[test]
    fn embedding_tier_matches_paraphrase() {
        let m = SemanticMatcher::with_embedder(Arc::new(KeywordEmbedder));
        assert!(m.uses_embeddings());
        let hit = m.match_field("lung trouble", names::CONDITIONS).unwrap();
        assert_eq!(hit.value, FieldValue::text("respiratory condition"));
        assert_eq!(hit.method, MatchMethod::Embedding);
    }

    #[test]
    fn broken_embedder_disables_tier() {
        let m = SemanticMatcher::with_embedder(Arc::new(BrokenEmbedder));
        assert!(!m.uses_embeddings());
        assert_eq!(
            m.match_field("female", names::SEX).unwrap().value,
            FieldValue::text("female")
        );
    }

    // ── Determinism properties ──────────────────────────────────────

    proptest::proptest! {
        #[test]
        fn classify_intent_is_deterministic(text in "[a-z ,'?]{0,40}") {
            let first = matcher().classify_intent(&text);
            let second = matcher().classify_intent(&text);
            proptest::prop_assert_eq!(first, second);
        }

        #[test]
        fn match_field_confidence_is_bounded(text in "[a-z ]{1,30}") {
            if let Some(m) = matcher().match_field(&text, names::CONDITIONS) {
                proptest::prop_assert!(m.confidence >= 0.5 && m.confidence <= 1.0);
            }
        }
    }
}
