// messages.rs
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const PRONOUNCE_TOPIC: &str = "hermes/g2p/pronounce";
pub const PHONEMES_TOPIC: &str = "hermes/g2p/phonemes";
pub const ERROR_TOPIC: &str = "hermes/error/g2p";

pub const DEFAULT_SITE_ID: &str = "default";
pub const DEFAULT_NUM_GUESSES: usize = 5;

fn default_site_id() -> String {
    DEFAULT_SITE_ID.to_string()
}

fn default_num_guesses() -> usize {
    DEFAULT_NUM_GUESSES
}

/// Where a pronunciation came from. Serialised flat as either
/// `"dictionaryId"` or `"modelId"`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PronunciationSource {
    #[serde(rename = "dictionaryId")]
    Dictionary(String),
    #[serde(rename = "modelId")]
    Model(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pronunciation {
    pub word: String,
    pub phonemes: Vec<String>,
    #[serde(flatten)]
    pub source: PronunciationSource,
}

impl Pronunciation {
    pub fn from_dictionary(word: &str, dictionary_id: &str, phonemes: Vec<String>) -> Self {
        Self {
            word: word.to_string(),
            phonemes,
            source: PronunciationSource::Dictionary(dictionary_id.to_string()),
        }
    }

    pub fn from_model(word: &str, model_id: &str, phonemes: Vec<String>) -> Self {
        Self {
            word: word.to_string(),
            phonemes,
            source: PronunciationSource::Model(model_id.to_string()),
        }
    }

    pub fn dictionary_id(&self) -> Option<&str> {
        match &self.source {
            PronunciationSource::Dictionary(id) => Some(id),
            PronunciationSource::Model(_) => None,
        }
    }

    pub fn model_id(&self) -> Option<&str> {
        match &self.source {
            PronunciationSource::Model(id) => Some(id),
            PronunciationSource::Dictionary(_) => None,
        }
    }
}

/// Inbound `hermes/g2p/pronounce` payload.
///
/// `dictionaries`: missing, null or empty selects every registered dictionary.
///
/// `models`: missing or null disables guessing, empty selects every
/// registered model, otherwise only the named models are consulted in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronounceRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default = "default_site_id")]
    pub site_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default, rename = "models")]
    pub model_ids: Option<Vec<String>>,
    #[serde(default, rename = "dictionaries")]
    pub dictionary_ids: Option<Vec<String>>,
    #[serde(default = "default_num_guesses")]
    pub num_guesses: usize,
}

impl PronounceRequest {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: String::new(),
            words: words.into_iter().map(Into::into).collect(),
            site_id: default_site_id(),
            session_id: None,
            model_ids: None,
            dictionary_ids: None,
            num_guesses: DEFAULT_NUM_GUESSES,
        }
    }
}

/// Outbound `hermes/g2p/phonemes` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G2pPhonemes {
    pub id: String,
    pub phonemes: BTreeMap<String, Vec<Pronunciation>>,
    pub site_id: String,
    pub session_id: Option<String>,
}

/// Outbound `hermes/error/g2p` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct G2pErrorMessage {
    pub id: String,
    pub error: String,
    pub context: String,
    pub site_id: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum G2pResponse {
    Phonemes(G2pPhonemes),
    Error(G2pErrorMessage),
}

impl G2pResponse {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Phonemes(_) => PHONEMES_TOPIC,
            Self::Error(_) => ERROR_TOPIC,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Phonemes(p) => &p.id,
            Self::Error(e) => &e.id,
        }
    }

    pub fn site_id(&self) -> &str {
        match self {
            Self::Phonemes(p) => &p.site_id,
            Self::Error(e) => &e.site_id,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Phonemes(p) => p.session_id.as_deref(),
            Self::Error(e) => e.session_id.as_deref(),
        }
    }
}
