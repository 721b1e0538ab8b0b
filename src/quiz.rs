//! Quiz engine: the fixed question table, answer validation and scoring.
//!
//! Scoring is deliberately simple: every answer contributes its option index
//! and the sum modulo the number of animals selects the result.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of options offered for every question
pub const OPTIONS_PER_QUESTION: usize = 4;

/// A single quiz question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: u8,
    #[serde(rename = "question")]
    pub prompt: &'static str,
    pub options: [&'static str; OPTIONS_PER_QUESTION],
}

/// The question table, in presentation order
pub static QUESTIONS: [Question; 8] = [
    Question {
        id: 1,
        prompt: "What's your ideal weekend activity?",
        options: ["Hiking", "Reading", "Party", "Napping"],
    },
    Question {
        id: 2,
        prompt: "Pick a snack:",
        options: ["Cheese", "Berries", "Chips", "Sushi"],
    },
    Question {
        id: 3,
        prompt: "Your favorite weather:",
        options: ["Sunny", "Rainy", "Snowy", "Cloudy"],
    },
    Question {
        id: 4,
        prompt: "If you had a superpower, it would be:",
        options: ["Flying", "Invisibility", "Super strength", "Time travel"],
    },
    Question {
        id: 5,
        prompt: "Pick a color:",
        options: ["Blue", "Pink", "Green", "Yellow"],
    },
    Question {
        id: 6,
        prompt: "How do you handle stress?",
        options: ["Exercise", "Talk to friends", "Listen to music", "Sleep"],
    },
    Question {
        id: 7,
        prompt: "What's your morning vibe?",
        options: ["Energetic", "Calm", "Slow", "Moody"],
    },
    Question {
        id: 8,
        prompt: "Pick a travel destination:",
        options: ["Mountains", "Beach", "City", "Forest"],
    },
];

/// The eight possible results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Animal {
    Cat,
    Dog,
    Rabbit,
    Fox,
    Owl,
    Dolphin,
    Panda,
    Tiger,
}

impl Animal {
    /// All animals in scoring order; `score` indexes into this table.
    pub const ALL: [Animal; 8] = [
        Animal::Cat,
        Animal::Dog,
        Animal::Rabbit,
        Animal::Fox,
        Animal::Owl,
        Animal::Dolphin,
        Animal::Panda,
        Animal::Tiger,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Animal::Cat => "Cat",
            Animal::Dog => "Dog",
            Animal::Rabbit => "Rabbit",
            Animal::Fox => "Fox",
            Animal::Owl => "Owl",
            Animal::Dolphin => "Dolphin",
            Animal::Panda => "Panda",
            Animal::Tiger => "Tiger",
        }
    }

    /// Position of this animal in [`Animal::ALL`]
    pub fn index(self) -> usize {
        Animal::ALL.iter().position(|a| *a == self).unwrap_or(0)
    }

    /// File name of the artwork for this animal, e.g. `Fox.png`
    pub fn asset_file_name(self) -> String {
        format!("{}.png", self.name())
    }
}

impl fmt::Display for Animal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Animal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Animal::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::Validation(format!("Unknown animal '{}'", wanted)))
    }
}

impl TryFrom<String> for Animal {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Animal> for String {
    fn from(a: Animal) -> Self {
        a.name().to_string()
    }
}

/// One validated answer per question, each an option index in `0..4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSet(Vec<u8>);

impl AnswerSet {
    pub fn new(answers: Vec<u8>) -> Result<Self> {
        if answers.len() != QUESTIONS.len() {
            return Err(Error::Validation(format!(
                "Expected {} answers, got {}",
                QUESTIONS.len(),
                answers.len()
            )));
        }
        if let Some((pos, bad)) = answers
            .iter()
            .enumerate()
            .find(|(_, a)| **a as usize >= OPTIONS_PER_QUESTION)
        {
            return Err(Error::Validation(format!(
                "Answer {} is out of range: {} (expected 0-{})",
                pos + 1,
                bad,
                OPTIONS_PER_QUESTION - 1
            )));
        }
        Ok(Self(answers))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Score a validated answer set.
pub fn score(answers: &AnswerSet) -> Animal {
    let sum: usize = answers.0.iter().map(|a| *a as usize).sum();
    Animal::ALL[sum % Animal::ALL.len()]
}

/// Validate raw option indices and score them.
pub fn score_indices(answers: &[u8]) -> Result<Animal> {
    let set = AnswerSet::new(answers.to_vec())?;
    Ok(score(&set))
}

/// Letter shown next to an option: 0 -> 'A', 1 -> 'B', ...
pub fn option_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Parse a user's choice given as a letter (`A`-`D`) or a 1-based number.
pub fn parse_choice(input: &str) -> Option<u8> {
    let s = input.trim();
    let mut chars = s.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let idx = match c {
        'a'..='d' => c as u8 - b'a',
        'A'..='D' => c as u8 - b'A',
        '1'..='4' => c as u8 - b'1',
        _ => return None,
    };
    Some(idx)
}

/// Outcome of answering one question in a [`QuizSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// More questions remain; this is the next one
    Next(&'static Question),
    /// All questions answered
    Complete(Animal),
}

/// Step-by-step state for one quiz run.
#[derive(Debug, Clone)]
pub struct QuizSession {
    user_name: String,
    answers: Vec<u8>,
    result: Option<Animal>,
}

impl QuizSession {
    pub fn new(user_name: &str) -> Result<Self> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(Error::Validation("userName is required".into()));
        }
        Ok(Self {
            user_name: user_name.to_string(),
            answers: Vec::with_capacity(QUESTIONS.len()),
            result: None,
        })
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Zero-based index of the question awaiting an answer
    pub fn position(&self) -> usize {
        self.answers.len()
    }

    pub fn current(&self) -> Option<&'static Question> {
        QUESTIONS.get(self.answers.len())
    }

    pub fn answers(&self) -> &[u8] {
        &self.answers
    }

    pub fn result(&self) -> Option<Animal> {
        self.result
    }

    /// Percentage shown on the progress bar for the current question.
    pub fn progress_percent(&self) -> f32 {
        let shown = (self.answers.len() + 1).min(QUESTIONS.len());
        shown as f32 / QUESTIONS.len() as f32 * 100.0
    }

    pub fn answer(&mut self, option: u8) -> Result<Progress> {
        if self.result.is_some() {
            return Err(Error::Validation("Quiz is already complete".into()));
        }
        if option as usize >= OPTIONS_PER_QUESTION {
            return Err(Error::Validation(format!("Option {} does not exist", option)));
        }
        self.answers.push(option);

        match self.current() {
            Some(next) => Ok(Progress::Next(next)),
            None => {
                let animal = score_indices(&self.answers)?;
                self.result = Some(animal);
                Ok(Progress::Complete(animal))
            }
        }
    }
}
