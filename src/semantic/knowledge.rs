//! Static vocabulary: field categories, stop words, and clarification wording.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::conversation::names;

/// One normalized value of a field plus the phrases that express it.
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub key: &'static str,
    /// Value written to the slot when this category wins.
    pub value: &'static str,
    pub phrases: &'static [&'static str],
}

const fn category(
    key: &'static str,
    value: &'static str,
    phrases: &'static [&'static str],
) -> Category {
    Category { key, value, phrases }
}

/// Matchable fields and their categories, in matching order.
pub static FIELD_SEMANTICS: &[(&str, &[Category])] = &[
    (
        names::CONDITIONS,
        &[
            category(
                "none",
                "none",
                &[
                    "none",
                    "no",
                    "nothing",
                    "healthy",
                    "fine",
                    "good",
                    "none that i know",
                    "not that i know of",
                    "i don't have any",
                    "don't have any",
                    "no conditions",
                    "no health issues",
                    "no problems",
                    "all clear",
                    "clean bill of health",
                    "i'm healthy",
                    "perfectly healthy",
                    "no medical conditions",
                    "nothing diagnosed",
                    "never been diagnosed",
                ],
            ),
            category(
                "hypertension",
                "hypertension",
                &[
                    "hypertension",
                    "high blood pressure",
                    "high bp",
                    "hbp",
                    "blood pressure issues",
                    "bp issues",
                    "bp problems",
                    "elevated blood pressure",
                    "elevated bp",
                    "pressure is high",
                    "borderline high bp",
                    "borderline hypertension",
                    "my bp is high",
                    "doctor said high bp",
                ],
            ),
            category(
                "diabetes",
                "diabetes",
                &[
                    "diabetes",
                    "diabetic",
                    "type 1",
                    "type 2",
                    "type1",
                    "type2",
                    "blood sugar",
                    "sugar issues",
                    "sugar problems",
                    "high sugar",
                    "glucose issues",
                    "pre-diabetic",
                    "prediabetic",
                    "pre diabetic",
                    "sugar disease",
                    "my sugar is high",
                ],
            ),
            category(
                "heart_disease",
                "heart disease",
                &[
                    "heart disease",
                    "heart problem",
                    "heart issues",
                    "heart condition",
                    "cardiac",
                    "coronary",
                    "heart attack",
                    "heart failure",
                    "cardiovascular",
                    "heart trouble",
                    "bad heart",
                    "angina",
                    "arrhythmia",
                    "afib",
                    "heart surgery",
                ],
            ),
            category(
                "cholesterol",
                "high cholesterol",
                &[
                    "cholesterol",
                    "high cholesterol",
                    "cholesterol issues",
                    "lipid problems",
                    "fatty liver",
                    "triglycerides",
                ],
            ),
            category(
                "stroke",
                "stroke history",
                &[
                    "stroke",
                    "had a stroke",
                    "mini stroke",
                    "tia",
                    "brain attack",
                    "cerebrovascular",
                ],
            ),
            category(
                "kidney_disease",
                "kidney disease",
                &[
                    "kidney disease",
                    "kidney problems",
                    "kidney issues",
                    "renal",
                    "ckd",
                    "chronic kidney",
                    "kidney failure",
                    "dialysis",
                    "kidney stones",
                ],
            ),
            category(
                "asthma",
                "respiratory condition",
                &[
                    "asthma",
                    "asthmatic",
                    "breathing problems",
                    "copd",
                    "respiratory",
                    "inhaler",
                    "wheezing",
                    "bronchitis",
                ],
            ),
            category(
                "obesity",
                "obesity",
                &[
                    "obese",
                    "obesity",
                    "overweight",
                    "morbidly obese",
                    "weight problem",
                    "very heavy",
                    "bmi over 30",
                ],
            ),
        ],
    ),
    (
        names::SEX,
        &[
            category(
                "male",
                "male",
                &[
                    "male",
                    "man",
                    "m",
                    "boy",
                    "guy",
                    "gentleman",
                    "dude",
                    "i'm a man",
                    "i'm a guy",
                    "i am male",
                    "i am a man",
                ],
            ),
            category(
                "female",
                "female",
                &[
                    "female",
                    "woman",
                    "f",
                    "girl",
                    "lady",
                    "gal",
                    "i'm a woman",
                    "i'm a lady",
                    "i am female",
                    "i am a woman",
                ],
            ),
        ],
    ),
    (
        names::SMOKING,
        &[
            category(
                "no",
                "no",
                &[
                    "no",
                    "never",
                    "don't smoke",
                    "dont smoke",
                    "non smoker",
                    "non-smoker",
                    "nonsmoker",
                    "never smoked",
                    "hate smoking",
                    "i don't",
                    "nope",
                    "not me",
                    "no way",
                    "never touched",
                    "never touched a cigarette",
                    "never tried",
                    "don't touch cigarettes",
                    "never have",
                    "never did",
                    "haven't smoked",
                    "havent smoked",
                    "never in my life",
                    "not a smoker",
                    "tobacco free",
                    "smoke free",
                ],
            ),
            category(
                "yes",
                "yes",
                &[
                    "yes",
                    "i smoke",
                    "smoker",
                    "smoking",
                    "cigarettes",
                    "pack a day",
                    "half pack",
                    "few cigarettes",
                    "daily",
                    "regularly",
                    "yeah i smoke",
                    "i do smoke",
                    "smoke daily",
                    "smoke regularly",
                    "chain smoker",
                ],
            ),
            category(
                "former",
                "former",
                &[
                    "quit",
                    "stopped",
                    "gave up",
                    "used to",
                    "former smoker",
                    "ex smoker",
                    "ex-smoker",
                    "not anymore",
                    "i quit",
                    "stopped smoking",
                    "kicked the habit",
                    "years ago",
                    "used to smoke",
                    "gave it up",
                    "no longer smoke",
                ],
            ),
            category(
                "occasionally",
                "occasionally",
                &[
                    "occasionally",
                    "sometimes",
                    "socially",
                    "rarely",
                    "once in a while",
                    "at parties",
                    "when drinking",
                    "not often",
                    "few times",
                    "now and then",
                ],
            ),
        ],
    ),
    (
        names::ALCOHOL,
        &[
            category(
                "no",
                "no",
                &[
                    "no",
                    "never",
                    "don't drink",
                    "dont drink",
                    "teetotal",
                    "sober",
                    "non drinker",
                    "abstain",
                    "not at all",
                    "i don't drink",
                    "never touch alcohol",
                ],
            ),
            category(
                "occasionally",
                "occasionally",
                &[
                    "occasionally",
                    "sometimes",
                    "socially",
                    "rarely",
                    "once in a while",
                    "not often",
                    "seldom",
                    "few times",
                    "social drinker",
                    "at parties",
                    "weekends only",
                    "couple times a month",
                    "not much",
                ],
            ),
            category(
                "regularly",
                "regularly",
                &[
                    "regularly",
                    "daily",
                    "often",
                    "frequently",
                    "every day",
                    "most days",
                    "a lot",
                    "heavy drinker",
                    "couple drinks a day",
                    "every night",
                    "with dinner",
                ],
            ),
        ],
    ),
    (
        names::FAMILY_HISTORY,
        &[
            category(
                "none",
                "none",
                &[
                    "none",
                    "no",
                    "nobody",
                    "no one",
                    "not that i know",
                    "none that i know of",
                    "no family history",
                    "no one in my family",
                    "everyone is healthy",
                    "no hereditary issues",
                ],
            ),
            category(
                "has_history",
                "yes",
                &[
                    "father",
                    "mother",
                    "dad",
                    "mom",
                    "parent",
                    "parents",
                    "grandfather",
                    "grandmother",
                    "grandpa",
                    "grandma",
                    "brother",
                    "sister",
                    "sibling",
                    "uncle",
                    "aunt",
                    "family",
                    "hereditary",
                    "runs in the family",
                    "genetic",
                ],
            ),
        ],
    ),
    (
        names::ACTIVITY,
        &[
            category(
                "sedentary",
                "sedentary",
                &[
                    "sedentary",
                    "inactive",
                    "don't exercise",
                    "no exercise",
                    "sit all day",
                    "desk job",
                    "couch potato",
                    "lazy",
                    "never exercise",
                    "no physical activity",
                    "not active",
                ],
            ),
            category(
                "light",
                "light activity",
                &[
                    "light",
                    "sometimes",
                    "occasionally",
                    "walk a bit",
                    "not much",
                    "here and there",
                    "when i can",
                ],
            ),
            category(
                "moderate",
                "moderate activity",
                &[
                    "moderate",
                    "regular",
                    "few times a week",
                    "walk daily",
                    "30 minutes",
                    "exercise regularly",
                    "gym sometimes",
                ],
            ),
            category(
                "active",
                "very active",
                &[
                    "active",
                    "very active",
                    "daily exercise",
                    "gym daily",
                    "athlete",
                    "sports",
                    "workout every day",
                    "fit",
                ],
            ),
        ],
    ),
    (
        names::WEIGHT,
        &[
            category(
                "underweight",
                "underweight",
                &[
                    "underweight",
                    "too thin",
                    "skinny",
                    "very thin",
                    "below normal weight",
                    "need to gain weight",
                ],
            ),
            category(
                "normal",
                "normal weight",
                &[
                    "normal weight",
                    "healthy weight",
                    "average weight",
                    "normal bmi",
                    "balanced weight",
                ],
            ),
            category(
                "overweight",
                "overweight",
                &[
                    "overweight",
                    "a bit heavy",
                    "chubby",
                    "heavy",
                    "above normal",
                    "need to lose weight",
                    "carrying extra weight",
                ],
            ),
            category(
                "obese",
                "obese",
                &[
                    "obese",
                    "very overweight",
                    "morbidly obese",
                    "severely overweight",
                    "obesity",
                ],
            ),
        ],
    ),
    (
        names::DIET,
        &[
            category(
                "healthy",
                "healthy diet",
                &[
                    "healthy",
                    "balanced",
                    "clean eating",
                    "lots of vegetables",
                    "fruits and vegetables",
                    "whole foods",
                    "nutritious",
                    "eat well",
                    "healthy eating",
                    "good diet",
                ],
            ),
            category(
                "moderate",
                "moderate diet",
                &[
                    "moderate",
                    "average",
                    "mixed",
                    "try to eat healthy",
                    "sometimes healthy",
                    "ok diet",
                    "decent",
                ],
            ),
            category(
                "poor",
                "poor diet",
                &[
                    "junk food",
                    "fast food",
                    "processed food",
                    "unhealthy",
                    "lots of sugar",
                    "high salt",
                    "fried food",
                    "takeaway",
                    "poor diet",
                    "bad diet",
                    "eat out a lot",
                    "snacking",
                ],
            ),
            category(
                "traditional",
                "traditional diet",
                &[
                    "traditional",
                    "local food",
                    "african food",
                    "cultural",
                    "home cooked",
                    "traditional diet",
                    "local dishes",
                    "rice and vegetables",
                ],
            ),
            category(
                "vegetarian",
                "vegetarian/plant-based",
                &[
                    "vegetarian",
                    "vegan",
                    "plant based",
                    "no meat",
                    "plant-based",
                    "meatless",
                ],
            ),
        ],
    ),
];

/// Categories for a field, if the field has a closed vocabulary.
pub fn categories(field: &str) -> Option<&'static [Category]> {
    FIELD_SEMANTICS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, cats)| *cats)
}

/// Words ignored by word-overlap matching.
pub static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "i", "a", "an", "the", "am", "is", "are", "was", "were", "be", "been", "have", "has",
        "had", "do", "does", "did", "don't", "dont", "doesn't", "my", "me", "mine", "we", "our",
        "you", "your", "he", "she", "it", "they", "in", "at", "to", "of", "for", "and", "or",
        "but", "not", "on", "with", "that", "this", "all", "very", "really", "just", "so",
        "like", "also", "being", "would", "could", "should", "will", "can", "may", "about",
        "than", "then", "too", "much", "many", "some", "any",
    ]
    .into_iter()
    .collect()
});

/// Relatives whose mention routes condition talk to family history.
pub static FAMILY_WORDS: &[&str] = &[
    "father",
    "mother",
    "dad",
    "mom",
    "parent",
    "parents",
    "grandfather",
    "grandmother",
    "grandpa",
    "grandma",
    "brother",
    "sister",
    "uncle",
    "aunt",
    "sibling",
];

/// Rephrased question for a field on the given attempt (clamped to 1..=3).
pub fn clarification(text: &str, field: &str, attempt: u32) -> String {
    let attempt = attempt.clamp(1, 3);
    match (field, attempt) {
        (names::CONDITIONS, 1) => format!(
            "I heard \"{text}\". Just to confirm - do you have any diagnosed health conditions like high blood pressure or diabetes? (yes/no)"
        ),
        (names::CONDITIONS, 2) => "Let me ask differently: Has a doctor ever told you that you have hypertension, diabetes, or heart disease?".into(),
        (names::CONDITIONS, _) => "I'll note that as no known conditions. Let's continue.".into(),

        (names::SEX, 1) => "Are you male or female?".into(),
        (names::SEX, 2) => "For your health profile, I need to know: male or female?".into(),
        (names::SEX, _) => "Please type 'male' or 'female'.".into(),

        (names::SMOKING, 1) => format!(
            "When you say \"{text}\", does that mean you currently smoke, used to smoke, or never smoked?"
        ),
        (names::SMOKING, 2) => "Do you smoke cigarettes? (never / sometimes / daily / quit)".into(),
        (names::SMOKING, _) => "I'll continue with the next question.".into(),

        (names::ALCOHOL, 1) => "Regarding alcohol - do you drink never, occasionally, or regularly?".into(),
        (names::ALCOHOL, 2) => "How often do you drink alcohol? (never / social occasions / weekly / daily)".into(),
        (names::ALCOHOL, _) => "I'll continue with the next question.".into(),

        (names::FAMILY_HISTORY, 1) => "Does anyone in your immediate family (parents, siblings) have high blood pressure, diabetes, or heart disease?".into(),
        (names::FAMILY_HISTORY, 2) => "Any family history of these conditions? Just say yes or no.".into(),
        (names::FAMILY_HISTORY, _) => "I'll note no known family history.".into(),

        _ => format!("Could you please clarify your {}?", field.replace('_', " ")),
    }
}
