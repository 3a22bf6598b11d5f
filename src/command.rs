//! Text to command classification
//!
//! Predicates are checked in a fixed order and the first match wins. Matching
//! is plain substring containment against the profile's keyword sets, so the
//! more specific browser check must run before the URL check.

use std::fmt;

use crate::locale::{LocaleId, LocaleProfile, Predicate};

/// Classified intent of a recognized utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    OpenBrowser,
    OpenUrl { url: String },
    TellTime,
    TellDate,
    SwitchLanguage { target: LocaleId },
    Unrecognized,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenBrowser => write!(f, "open browser"),
            Self::OpenUrl { url } => write!(f, "open url {url}"),
            Self::TellTime => write!(f, "tell time"),
            Self::TellDate => write!(f, "tell date"),
            Self::SwitchLanguage { target } => write!(f, "switch language to {target}"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Classify `text` using the keyword sets of `profile`
///
/// `text` is expected to be lower-cased already.
#[must_use]
pub fn classify(text: &str, profile: &LocaleProfile) -> Command {
    let keywords = profile.keywords();
    let has = |predicate| keywords.matches(predicate, text);

    if has(Predicate::Open) && has(Predicate::Browser) {
        return Command::OpenBrowser;
    }

    if (has(Predicate::Open) || has(Predicate::Go)) && has(Predicate::Domain) {
        let url = text.split_whitespace().last().unwrap_or_default();
        return Command::OpenUrl {
            url: url.to_string(),
        };
    }

    if has(Predicate::Time) {
        return Command::TellTime;
    }

    if has(Predicate::Date) {
        return Command::TellDate;
    }

    if has(Predicate::Language) && has(Predicate::English) {
        return Command::SwitchLanguage {
            target: LocaleId::EnUs,
        };
    }

    if has(Predicate::Language) && has(Predicate::Spanish) {
        return Command::SwitchLanguage {
            target: LocaleId::Es,
        };
    }

    Command::Unrecognized
}
