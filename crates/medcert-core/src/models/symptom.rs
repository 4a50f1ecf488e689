//! Symptom tags selected during intake.

use serde::{Deserialize, Serialize};

/// A symptom tag. Known tags form a closed set; `Other` carries the
/// customer's own wording.
///
/// Serialized as `"fever"` for known tags and `{"other": "..."}` for free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    ColdFlu,
    Fever,
    HeadacheMigraine,
    Gastro,
    BackPain,
    PeriodPain,
    AnxietyStress,
    Injury,
    Respiratory,
    Other(String),
}

impl Symptom {
    /// Every known tag, in display order.
    pub const KNOWN: [Symptom; 9] = [
        Symptom::ColdFlu,
        Symptom::Fever,
        Symptom::HeadacheMigraine,
        Symptom::Gastro,
        Symptom::BackPain,
        Symptom::PeriodPain,
        Symptom::AnxietyStress,
        Symptom::Injury,
        Symptom::Respiratory,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &str {
        match self {
            Symptom::ColdFlu => "Cold / flu",
            Symptom::Fever => "Fever",
            Symptom::HeadacheMigraine => "Headache / migraine",
            Symptom::Gastro => "Gastro",
            Symptom::BackPain => "Back pain",
            Symptom::PeriodPain => "Period pain",
            Symptom::AnxietyStress => "Anxiety / stress",
            Symptom::Injury => "Injury",
            Symptom::Respiratory => "Respiratory",
            Symptom::Other(text) => text.as_str(),
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, Symptom::Other(_))
    }
}

/// Deduplicate symptom tags, keeping the first occurrence of each.
///
/// `Other` text is trimmed before comparison.
pub fn dedupe_symptoms(symptoms: &[Symptom]) -> Vec<Symptom> {
    let mut out: Vec<Symptom> = Vec::with_capacity(symptoms.len());
    for symptom in symptoms {
        let symptom = match symptom {
            Symptom::Other(text) => Symptom::Other(text.trim().to_string()),
            known => known.clone(),
        };
        if !out.contains(&symptom) {
            out.push(symptom);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_shape() {
        let tags = vec![Symptom::Fever, Symptom::Other("sore knee".into())];
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"["fever",{"other":"sore knee"}]"#);

        let back: Vec<Symptom> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tags);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let result: Result<Vec<Symptom>, _> = serde_json::from_str(r#"["sniffles"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_dedupe_keeps_order() {
        let tags = vec![
            Symptom::Gastro,
            Symptom::Fever,
            Symptom::Gastro,
            Symptom::Other(" rash ".into()),
            Symptom::Other("rash".into()),
        ];
        let deduped = dedupe_symptoms(&tags);
        assert_eq!(
            deduped,
            vec![Symptom::Gastro, Symptom::Fever, Symptom::Other("rash".into())]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(Symptom::ColdFlu.label(), "Cold / flu");
        assert_eq!(Symptom::Other("hiccups".into()).label(), "hiccups");
        assert!(Symptom::KNOWN.iter().all(|s| !s.is_other()));
    }
}
