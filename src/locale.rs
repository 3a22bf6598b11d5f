//! Locale profiles
//!
//! A profile pairs a locale with its recognition language code, the keyword
//! table the classifier matches against, and the utterances spoken back to
//! the user. The two built-in profiles are constructed once and never mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::provider::RecognitionError;
use crate::{Error, Result};

/// Supported locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleId {
    /// English (United States)
    EnUs,
    /// Spanish
    Es,
}

impl LocaleId {
    /// Every supported locale
    pub const ALL: [Self; 2] = [Self::EnUs, Self::Es];

    /// Two-letter language code, also used as the restart parameter
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EnUs => "en",
            Self::Es => "es",
        }
    }

    /// Parse a language code such as `en`, `es`, `en-US` or `es_MX`
    ///
    /// # Errors
    ///
    /// Returns error if the code names an unsupported language
    pub fn from_code(code: &str) -> Result<Self> {
        let language = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match language.as_str() {
            "en" => Ok(Self::EnUs),
            "es" => Ok(Self::Es),
            _ => Err(Error::Locale(format!("unsupported language code: {code}"))),
        }
    }

    /// Resolve the restart parameter, falling back to English when absent or unknown
    #[must_use]
    pub fn from_restart_parameter(code: Option<&str>) -> Self {
        match code.map(Self::from_code) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "unknown restart language, using English");
                Self::EnUs
            }
            None => Self::EnUs,
        }
    }

    /// The built-in profile for this locale
    #[must_use]
    pub fn profile(self) -> &'static LocaleProfile {
        match self {
            Self::EnUs => &ENGLISH,
            Self::Es => &SPANISH,
        }
    }

    /// Locale used for date and time rendering
    #[must_use]
    pub const fn chrono_locale(self) -> chrono::Locale {
        match self {
            Self::EnUs => chrono::Locale::en_US,
            Self::Es => chrono::Locale::es_ES,
        }
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "en-US"),
            Self::Es => write!(f, "es"),
        }
    }
}

/// Named keyword predicates used by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Predicate {
    Open,
    Browser,
    Go,
    Domain,
    Time,
    Date,
    Language,
    English,
    Spanish,
}

impl Predicate {
    /// Every predicate a complete keyword table must cover
    pub const ALL: [Self; 9] = [
        Self::Open,
        Self::Browser,
        Self::Go,
        Self::Domain,
        Self::Time,
        Self::Date,
        Self::Language,
        Self::English,
        Self::Spanish,
    ];

    /// Lowercase name, used in logs and the `locales` listing
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Browser => "browser",
            Self::Go => "go",
            Self::Domain => "domain",
            Self::Time => "time",
            Self::Date => "date",
            Self::Language => "language",
            Self::English => "english",
            Self::Spanish => "spanish",
        }
    }
}

/// Mapping from predicate to its trigger words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    sets: BTreeMap<Predicate, Vec<&'static str>>,
}

impl KeywordTable {
    /// Build a table, rejecting it unless every predicate has at least one keyword
    ///
    /// # Errors
    ///
    /// Returns error if a predicate is missing or has an empty keyword set
    pub fn new(entries: &[(Predicate, &[&'static str])]) -> Result<Self> {
        let mut sets: BTreeMap<Predicate, Vec<&'static str>> = BTreeMap::new();
        for (predicate, words) in entries {
            sets.entry(*predicate)
                .or_default()
                .extend(words.iter().filter(|w| !w.is_empty()));
        }

        for predicate in Predicate::ALL {
            if sets.get(&predicate).is_none_or(Vec::is_empty) {
                return Err(Error::Locale(format!(
                    "keyword set for '{}' is empty",
                    predicate.name()
                )));
            }
        }

        Ok(Self { sets })
    }

    /// Keywords for a predicate
    #[must_use]
    pub fn keywords(&self, predicate: Predicate) -> &[&'static str] {
        self.sets.get(&predicate).map_or(&[], Vec::as_slice)
    }

    /// Whether `text` contains any keyword of `predicate` as a substring
    #[must_use]
    pub fn matches(&self, predicate: Predicate, text: &str) -> bool {
        self.keywords(predicate).iter().any(|k| text.contains(k))
    }
}

/// Fixed utterances spoken in a locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterances {
    pub welcome: &'static str,
    pub opening_browser: &'static str,
    pub no_match: &'static str,
    pub permission_denied: &'static str,
    /// Shown through the notifier, never spoken
    pub language_unsupported: &'static str,
    /// Template with a `{time}` placeholder
    pub time: &'static str,
    /// Template with a `{date}` placeholder
    pub date: &'static str,
}

/// Immutable keyword and language configuration for one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleProfile {
    id: LocaleId,
    recognition_language_code: &'static str,
    keywords: KeywordTable,
    utterances: Utterances,
    time_format: &'static str,
    date_format: &'static str,
}

// Both profiles accept the full bilingual vocabulary so a command spoken in
// either language is understood regardless of the active locale.
const OPEN: &[&str] = &["open", "start", "abrir", "iniciar"];
const BROWSER: &[&str] = &["browser", "navigator", "navegador"];
const GO: &[&str] = &["go", "ir"];
const DOMAIN: &[&str] = &[".com", ".net", ".org"];
const TIME: &[&str] = &["time", "hora"];
const DATE: &[&str] = &["date", "fecha"];
const LANGUAGE: &[&str] = &["language", "idioma", "lenguaje"];
const ENGLISH_WORDS: &[&str] = &["english", "inglés", "ingles"];
const SPANISH_WORDS: &[&str] = &["spanish", "español", "espanol"];

fn bilingual_keywords() -> Result<KeywordTable> {
    KeywordTable::new(&[
        (Predicate::Open, OPEN),
        (Predicate::Browser, BROWSER),
        (Predicate::Go, GO),
        (Predicate::Domain, DOMAIN),
        (Predicate::Time, TIME),
        (Predicate::Date, DATE),
        (Predicate::Language, LANGUAGE),
        (Predicate::English, ENGLISH_WORDS),
        (Predicate::Spanish, SPANISH_WORDS),
    ])
}

static ENGLISH: LazyLock<LocaleProfile> = LazyLock::new(|| {
    LocaleProfile::english().expect("built-in English keyword table is complete")
});

static SPANISH: LazyLock<LocaleProfile> = LazyLock::new(|| {
    LocaleProfile::spanish().expect("built-in Spanish keyword table is complete")
});

impl LocaleProfile {
    /// Construct a profile from its parts
    ///
    /// # Errors
    ///
    /// Returns error if the recognition language code is not two ASCII letters
    pub fn new(
        id: LocaleId,
        recognition_language_code: &'static str,
        keywords: KeywordTable,
        utterances: Utterances,
    ) -> Result<Self> {
        if recognition_language_code.len() != 2
            || !recognition_language_code
                .chars()
                .all(|c| c.is_ascii_lowercase())
        {
            return Err(Error::Locale(format!(
                "invalid recognition language code: {recognition_language_code}"
            )));
        }

        let (time_format, date_format) = match id {
            LocaleId::EnUs => ("%-I:%M %p", "%A, %B %-d, %Y"),
            LocaleId::Es => ("%-H:%M", "%A, %-d de %B de %Y"),
        };

        Ok(Self {
            id,
            recognition_language_code,
            keywords,
            utterances,
            time_format,
            date_format,
        })
    }

    fn english() -> Result<Self> {
        Self::new(
            LocaleId::EnUs,
            "en",
            bilingual_keywords()?,
            Utterances {
                welcome: "Hello! How can I help you?",
                opening_browser: "Opening the browser",
                no_match: "Sorry, I didn't understand. Please try again.",
                permission_denied: "I need permission to use the microphone",
                language_unsupported: "Speech output does not support this language",
                time: "It's {time}",
                date: "Today is {date}",
            },
        )
    }

    fn spanish() -> Result<Self> {
        Self::new(
            LocaleId::Es,
            "es",
            bilingual_keywords()?,
            Utterances {
                welcome: "¡Hola! ¿En qué puedo ayudarte?",
                opening_browser: "Abriendo el navegador",
                no_match: "Lo siento, no entendí. Inténtalo de nuevo.",
                permission_denied: "Necesito permiso para usar el micrófono",
                language_unsupported: "La salida de voz no admite este idioma",
                time: "Son las {time}",
                date: "Hoy es {date}",
            },
        )
    }

    #[must_use]
    pub const fn id(&self) -> LocaleId {
        self.id
    }

    /// Two-letter code sent to the recognizer
    #[must_use]
    pub const fn recognition_language_code(&self) -> &'static str {
        self.recognition_language_code
    }

    #[must_use]
    pub const fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    #[must_use]
    pub const fn utterances(&self) -> &Utterances {
        &self.utterances
    }

    /// Render the time-of-day utterance for `now`
    #[must_use]
    pub fn time_utterance<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let time = now
            .format_localized(self.time_format, self.id.chrono_locale())
            .to_string();
        self.utterances.time.replace("{time}", &time)
    }

    /// Render the date utterance for `now`
    #[must_use]
    pub fn date_utterance<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let date = now
            .format_localized(self.date_format, self.id.chrono_locale())
            .to_string();
        self.utterances.date.replace("{date}", &date)
    }

    /// Human-readable category for a recognition error code
    #[must_use]
    pub const fn error_category(&self, code: RecognitionError) -> &'static str {
        match self.id {
            LocaleId::EnUs => match code {
                RecognitionError::Audio => "Audio recording error",
                RecognitionError::Client => "Client side error",
                RecognitionError::InsufficientPermissions => "Insufficient permissions",
                RecognitionError::Network => "Network error",
                RecognitionError::NetworkTimeout => "Network timeout",
                RecognitionError::NoMatch => "No match",
                RecognitionError::RecognizerBusy => "Recognition service busy",
                RecognitionError::Server => "Error from server",
                RecognitionError::SpeechTimeout => "No speech input",
                RecognitionError::Unknown => "Didn't understand, please try again",
            },
            LocaleId::Es => match code {
                RecognitionError::Audio => "Error al grabar el audio",
                RecognitionError::Client => "Error del cliente",
                RecognitionError::InsufficientPermissions => "Permisos insuficientes",
                RecognitionError::Network => "Error de red",
                RecognitionError::NetworkTimeout => "Tiempo de espera de red agotado",
                RecognitionError::NoMatch => "Sin coincidencias",
                RecognitionError::RecognizerBusy => "El servicio de reconocimiento está ocupado",
                RecognitionError::Server => "Error del servidor",
                RecognitionError::SpeechTimeout => "No se detectó voz",
                RecognitionError::Unknown => "No entendí, inténtalo de nuevo",
            },
        }
    }
}
