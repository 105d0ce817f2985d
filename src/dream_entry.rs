use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How the dreamer felt. Values outside the fixed set survive a load/save
/// cycle as `Unknown` and render with the neutral glyph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mood {
    Happy,
    Sad,
    Scared,
    Excited,
    Confused,
    Peaceful,
    #[default]
    Neutral,
    Unknown(String),
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Scared,
        Mood::Excited,
        Mood::Confused,
        Mood::Peaceful,
        Mood::Neutral,
    ];

    pub fn parse(value: &str) -> Option<Mood> {
        Mood::ALL.into_iter().find(|m| m.as_str() == value)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Scared => "scared",
            Mood::Excited => "excited",
            Mood::Confused => "confused",
            Mood::Peaceful => "peaceful",
            Mood::Neutral => "neutral",
            Mood::Unknown(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Scared => "Scared",
            Mood::Excited => "Excited",
            Mood::Confused => "Confused",
            Mood::Peaceful => "Peaceful",
            Mood::Neutral => "Neutral",
            Mood::Unknown(raw) => raw,
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Sad => "😢",
            Mood::Scared => "😨",
            Mood::Excited => "🤩",
            Mood::Confused => "😕",
            Mood::Peaceful => "😌",
            Mood::Neutral | Mood::Unknown(_) => "😐",
        }
    }

    /// Next mood in picker order, wrapping around.
    pub fn next(&self) -> Mood {
        let idx = self.position().map_or(0, |i| (i + 1) % Mood::ALL.len());
        Mood::ALL[idx].clone()
    }

    pub fn prev(&self) -> Mood {
        let len = Mood::ALL.len();
        let idx = self.position().map_or(len - 1, |i| (i + len - 1) % len);
        Mood::ALL[idx].clone()
    }

    fn position(&self) -> Option<usize> {
        Mood::ALL.iter().position(|m| m == self)
    }
}

impl From<String> for Mood {
    fn from(value: String) -> Self {
        Mood::parse(&value).unwrap_or(Mood::Unknown(value))
    }
}

impl From<Mood> for String {
    fn from(mood: Mood) -> Self {
        match mood {
            Mood::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamEntry {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub mood: Mood,
    pub tags: Vec<String>,
}

impl DreamEntry {
    pub fn new(id: u64, input: DreamInput) -> Self {
        DreamEntry {
            id,
            title: input.title,
            description: input.description,
            date: input.date,
            mood: input.mood,
            tags: parse_tags(&input.tags_text),
        }
    }

    /// Overwrites every field but the id.
    pub fn apply(&mut self, input: DreamInput) {
        self.title = input.title;
        self.description = input.description;
        self.date = input.date;
        self.mood = input.mood;
        self.tags = parse_tags(&input.tags_text);
    }
}

/// Splits comma-separated tag text, trimming each token and dropping blanks.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Field values accepted by the store for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DreamInput {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub mood: Mood,
    pub tags_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("a dream needs a title")]
    MissingTitle,
    #[error("a dream needs a description")]
    MissingDescription,
    #[error("'{0}' is not a date, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("unknown mood '{0}'")]
    UnknownMood(String),
}

/// Unsaved form contents for a new or edited dream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DreamDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub mood: Mood,
    pub tags: String,
}

impl DreamDraft {
    pub fn new(today: NaiveDate) -> Self {
        DreamDraft {
            title: String::new(),
            description: String::new(),
            date: today.format(DATE_FORMAT).to_string(),
            mood: Mood::Neutral,
            tags: String::new(),
        }
    }

    pub fn from_entry(entry: &DreamEntry) -> Self {
        DreamDraft {
            title: entry.title.clone(),
            description: entry.description.clone(),
            date: entry.date.format(DATE_FORMAT).to_string(),
            mood: entry.mood.clone(),
            tags: entry.tags.join(", "),
        }
    }

    pub fn validate(&self) -> Result<DreamInput, DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingTitle);
        }
        if self.description.trim().is_empty() {
            return Err(DraftError::MissingDescription);
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT)
            .map_err(|_| DraftError::InvalidDate(self.date.clone()))?;
        if let Mood::Unknown(raw) = &self.mood {
            return Err(DraftError::UnknownMood(raw.clone()));
        }

        Ok(DreamInput {
            title: self.title.clone(),
            description: self.description.clone(),
            date,
            mood: self.mood.clone(),
            tags_text: self.tags.clone(),
        })
    }
}
