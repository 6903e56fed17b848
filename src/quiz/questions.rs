//! Question sources.
//!
//! The encounter only needs "give me the questions for phase N". The bundled
//! [`QuestionBank`] reads them from a JSON file so content can be edited
//! without recompiling:
//!
//! ```json
//! { "phases": { "1": [ { "text": "...", "options": ["a", "b", "c"], "answer": "a", "example": "..." } ] } }
//! ```

use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::quiz::errors::QuizError;
use crate::quiz::types::{PhaseNumber, Question, MAX_OPTIONS};

pub trait QuestionSource: Send + Sync {
    /// Ordered questions for `phase`. An empty list or error sends the player
    /// back to the overworld.
    fn questions_for_phase(&self, phase: PhaseNumber) -> Result<Vec<Question>, QuizError>;
}

#[derive(Debug, Deserialize)]
struct QuestionBankFile {
    phases: BTreeMap<PhaseNumber, Vec<Question>>,
}

/// In-memory question set keyed by phase.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    phases: BTreeMap<PhaseNumber, Vec<Question>>,
}

impl QuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phase(mut self, phase: PhaseNumber, questions: Vec<Question>) -> Self {
        self.phases.insert(phase, questions);
        self
    }

    /// Load a bank from a JSON file.
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Self, QuizError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let bank = Self::from_json_str(&contents)?;
        debug!(
            "loaded {} phase(s) from {}",
            bank.phases.len(),
            path.display()
        );
        Ok(bank)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, QuizError> {
        let file: QuestionBankFile = serde_json::from_str(contents)?;
        let mut phases = BTreeMap::new();
        for (phase, questions) in file.phases {
            let valid: Vec<Question> = questions
                .into_iter()
                .filter(|q| is_playable(phase, q))
                .collect();
            phases.insert(phase, valid);
        }
        Ok(Self { phases })
    }

    pub fn phase_numbers(&self) -> Vec<PhaseNumber> {
        self.phases.keys().copied().collect()
    }
}

fn is_playable(phase: PhaseNumber, question: &Question) -> bool {
    if question.options.is_empty() || question.options.len() > MAX_OPTIONS {
        warn!(
            "phase {}: skipping question '{}' with {} options",
            phase,
            question.text,
            question.options.len()
        );
        return false;
    }
    if !question.options.iter().any(|opt| question.is_correct(opt)) {
        warn!(
            "phase {}: skipping question '{}' whose answer is not among its options",
            phase, question.text
        );
        return false;
    }
    true
}

impl QuestionSource for QuestionBank {
    fn questions_for_phase(&self, phase: PhaseNumber) -> Result<Vec<Question>, QuizError> {
        self.phases
            .get(&phase)
            .cloned()
            .ok_or_else(|| QuizError::NotFound(format!("questions for phase {}", phase)))
    }
}

/// Starter content written by `quizquest init`.
pub fn starter_bank_json() -> &'static str {
    r##"{
  "phases": {
    "1": [
      { "text": "Which keyword declares an immutable binding?", "options": ["let", "mut", "static"], "answer": "let", "example": "let x = 5;" },
      { "text": "What does Option::None represent?", "options": ["an error", "absence of a value", "zero"], "answer": "absence of a value", "example": "let maybe: Option<u8> = None;" },
      { "text": "Which macro prints a line to stdout?", "options": ["print!", "println!", "write!"], "answer": "println!", "example": "println!(\"hello\");" },
      { "text": "Which type owns a growable UTF-8 string?", "options": ["&str", "String", "char"], "answer": "String", "example": "let s = String::from(\"hi\");" },
      { "text": "Which operator propagates an error?", "options": ["?", "!", "&"], "answer": "?", "example": "let n: u8 = input.parse()?;" }
    ],
    "2": [
      { "text": "Which trait enables {:?} formatting?", "options": ["Display", "Debug", "Clone"], "answer": "Debug", "example": "#[derive(Debug)] struct P;" },
      { "text": "Which collection keeps keys sorted?", "options": ["HashMap", "BTreeMap", "Vec"], "answer": "BTreeMap", "example": "let m: BTreeMap<u8, u8> = BTreeMap::new();" },
      { "text": "Which smart pointer gives shared ownership across threads?", "options": ["Rc", "Box", "Arc"], "answer": "Arc", "example": "let a = Arc::new(5);" },
      { "text": "Which keyword starts a pattern match?", "options": ["match", "switch", "case"], "answer": "match", "example": "match n { 0 => \"zero\", _ => \"other\" }" },
      { "text": "What does `cargo test` run?", "options": ["benchmarks", "tests", "the binary"], "answer": "tests" }
    ]
  }
}
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_bank_parses_with_five_questions_per_phase() {
        let bank = QuestionBank::from_json_str(starter_bank_json()).expect("parse");
        assert_eq!(bank.phase_numbers(), vec![1, 2]);
        for phase in [1, 2] {
            assert_eq!(bank.questions_for_phase(phase).expect("phase").len(), 5);
        }
    }

    #[test]
    fn unknown_phase_is_not_found() {
        let bank = QuestionBank::new();
        assert!(matches!(
            bank.questions_for_phase(9),
            Err(QuizError::NotFound(_))
        ));
    }

    #[test]
    fn malformed_questions_are_skipped() {
        let json = r#"{ "phases": { "1": [
            { "text": "too many", "options": ["a", "b", "c", "d"], "answer": "a" },
            { "text": "no answer", "options": ["a", "b"], "answer": "z" },
            { "text": "ok", "options": ["a", "b"], "answer": "b" }
        ] } }"#;
        let bank = QuestionBank::from_json_str(json).expect("parse");
        let questions = bank.questions_for_phase(1).expect("phase");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "ok");
    }
}
