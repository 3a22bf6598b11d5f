//! Session integration tests
//!
//! Drives the session manager with scripted provider events and checks what
//! the recording fakes observed.

use voice_assistant::{
    InitStatus, LocaleId, RecognitionError, RecognitionEvent, RestartParameter, SessionCue,
    SessionManager, SessionState,
};

mod common;

use common::{FakeFactory, Recorder, event, manager, utterance};

fn started(factory: FakeFactory, language: &str) -> SessionManager<FakeFactory> {
    let (mut manager, _rx) = manager(factory);
    manager.restart(&RestartParameter::new(language)).unwrap();
    manager
}

/// Start listening and feed the events of one heard phrase
fn say(manager: &mut SessionManager<FakeFactory>, phrase: &str) {
    let generation = manager.session().unwrap().generation();
    manager.session_mut().unwrap().start();
    for e in utterance(phrase) {
        manager.dispatch(event(generation, e)).unwrap();
    }
}

#[test]
fn test_welcome_spoken_on_open() {
    let recorder = Recorder::default();
    let manager = started(FakeFactory::new(recorder.clone()), "en");

    let session = manager.session().unwrap();
    assert_eq!(session.locale(), LocaleId::EnUs);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.speech_enabled());
    assert_eq!(recorder.spoken(), vec!["Hello! How can I help you?"]);
    assert!(recorder.log().starts.is_empty());
}

#[test]
fn test_unknown_language_boots_english() {
    let recorder = Recorder::default();
    let manager = started(FakeFactory::new(recorder.clone()), "fr");

    assert_eq!(manager.session().unwrap().locale(), LocaleId::EnUs);
}

#[test]
fn test_time_query_flow() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    say(&mut manager, "What time is it");

    let request = recorder.log().starts[0].clone();
    assert_eq!(request.language, "en");
    assert_eq!(request.max_results, 3);

    let (locale, text) = recorder.last_spoken().unwrap();
    assert_eq!(locale, LocaleId::EnUs);
    assert!(text.starts_with("It's "), "unexpected utterance {text}");
    assert_eq!(manager.session().unwrap().state(), SessionState::Idle);
    assert_eq!(
        recorder.log().cues,
        vec![
            SessionCue::Listening,
            SessionCue::SpeechDetected,
            SessionCue::Processing,
            SessionCue::Idle,
        ]
    );
}

#[test]
fn test_spanish_date_query() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "es");

    say(&mut manager, "¿Qué fecha es hoy?");

    let (locale, text) = recorder.last_spoken().unwrap();
    assert_eq!(locale, LocaleId::Es);
    assert!(text.starts_with("Hoy es "), "unexpected utterance {text}");
    assert_eq!(recorder.log().starts[0].language, "es");
}

#[test]
fn test_open_browser_uses_default_url() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    say(&mut manager, "Open the browser");

    assert_eq!(recorder.log().opened, vec!["google.com"]);
    assert_eq!(recorder.last_spoken().unwrap().1, "Opening the browser");
}

#[test]
fn test_go_to_domain_opens_last_word() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    say(&mut manager, "go to example.com");

    assert_eq!(recorder.log().opened, vec!["example.com"]);
    assert_eq!(recorder.last_spoken().unwrap().1, "Opening the browser");
}

#[test]
fn test_failed_url_open_is_silent() {
    let recorder = Recorder::default();
    let mut factory = FakeFactory::new(recorder.clone());
    factory.navigation_succeeds = false;
    let mut manager = started(factory, "en");

    say(&mut manager, "open wikipedia.org");

    assert_eq!(recorder.log().opened, vec!["wikipedia.org"]);
    assert_eq!(recorder.spoken(), vec!["Hello! How can I help you?"]);
}

#[test]
fn test_unrecognized_phrase_speaks_fallback() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    say(&mut manager, "tell me a joke");

    assert_eq!(
        recorder.last_spoken().unwrap().1,
        "Sorry, I didn't understand. Please try again."
    );
    assert!(recorder.log().opened.is_empty());
}

#[test]
fn test_empty_results_speak_fallback() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    manager.session_mut().unwrap().start();
    manager
        .dispatch(event(1, RecognitionEvent::EndOfSpeech))
        .unwrap();
    manager
        .dispatch(event(1, RecognitionEvent::Results(Vec::new())))
        .unwrap();

    assert_eq!(
        recorder.last_spoken().unwrap().1,
        "Sorry, I didn't understand. Please try again."
    );
    assert_eq!(manager.session().unwrap().state(), SessionState::Idle);
}

#[test]
fn test_only_first_candidate_is_classified() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    manager.session_mut().unwrap().start();
    manager
        .dispatch(event(
            1,
            RecognitionEvent::Results(vec![
                "open the browser".to_string(),
                "what time is it".to_string(),
            ]),
        ))
        .unwrap();

    assert_eq!(recorder.log().opened, vec!["google.com"]);
}

#[test]
fn test_language_switch_twice_leaves_one_session() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");
    assert_eq!(recorder.live_captures(), 1);

    say(&mut manager, "switch language to spanish");

    let session = manager.session().unwrap();
    assert_eq!(session.locale(), LocaleId::Es);
    assert_eq!(session.generation(), 2);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(recorder.live_captures(), 1);
    assert_eq!(
        recorder.last_spoken().unwrap(),
        (LocaleId::Es, "¡Hola! ¿En qué puedo ayudarte?".to_string())
    );

    say(&mut manager, "cambiar idioma a inglés");

    let session = manager.session().unwrap();
    assert_eq!(session.locale(), LocaleId::EnUs);
    assert_eq!(session.generation(), 3);
    assert_eq!(recorder.live_captures(), 1);
    assert_eq!(
        recorder.last_spoken().unwrap(),
        (LocaleId::EnUs, "Hello! How can I help you?".to_string())
    );

    let languages: Vec<_> = recorder
        .log()
        .starts
        .iter()
        .map(|r| r.language)
        .collect();
    assert_eq!(languages, vec!["en", "es"]);
}

#[test]
fn test_sessions_share_static_profiles() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");
    assert!(std::ptr::eq(
        manager.session().unwrap().profile(),
        LocaleId::EnUs.profile()
    ));

    say(&mut manager, "switch language to spanish");

    let session = manager.session().unwrap();
    assert!(std::ptr::eq(session.profile(), LocaleId::Es.profile()));
    assert_eq!(session.request().language, "es");
}

#[test]
fn test_switch_to_current_language_still_restarts() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    say(&mut manager, "set the language to english");

    let session = manager.session().unwrap();
    assert_eq!(session.locale(), LocaleId::EnUs);
    assert_eq!(session.generation(), 2);
    assert_eq!(recorder.live_captures(), 1);
}

#[test]
fn test_stale_events_are_dropped() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    say(&mut manager, "switch language to spanish");
    let spoken_before = recorder.spoken().len();

    manager
        .dispatch(event(
            1,
            RecognitionEvent::Results(vec!["what time is it".to_string()]),
        ))
        .unwrap();
    manager
        .dispatch(event(
            1,
            RecognitionEvent::Error(RecognitionError::Network),
        ))
        .unwrap();

    assert_eq!(recorder.spoken().len(), spoken_before);
    assert_eq!(manager.session().unwrap().state(), SessionState::Idle);
}

#[test]
fn test_recognition_error_recovers_to_idle() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    manager.session_mut().unwrap().start();
    manager
        .dispatch(event(
            1,
            RecognitionEvent::Error(RecognitionError::NetworkTimeout),
        ))
        .unwrap();

    assert_eq!(recorder.last_spoken().unwrap().1, "Network timeout");
    assert_eq!(manager.session().unwrap().state(), SessionState::Idle);
    assert_eq!(recorder.log().cues.last(), Some(&SessionCue::Idle));

    say(&mut manager, "what is the date");
    assert_eq!(recorder.log().starts.len(), 2);
    assert!(recorder.last_spoken().unwrap().1.starts_with("Today is "));
}

#[test]
fn test_provider_refusal_reports_client_error() {
    let recorder = Recorder::default();
    let mut factory = FakeFactory::new(recorder.clone());
    factory.refuse_start = true;
    let mut manager = started(factory, "en");

    manager.session_mut().unwrap().start();

    assert_eq!(manager.session().unwrap().state(), SessionState::Idle);
    assert_eq!(recorder.last_spoken().unwrap().1, "Client side error");
    assert_eq!(recorder.log().cues, vec![SessionCue::Idle]);
}

#[test]
fn test_start_while_listening_is_ignored() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    let session = manager.session_mut().unwrap();
    session.start();
    session.start();

    assert_eq!(recorder.log().starts.len(), 1);
    assert_eq!(session.state(), SessionState::Listening);
}

#[test]
fn test_stop_only_reaches_provider_while_capturing() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    let session = manager.session_mut().unwrap();
    session.stop();
    assert_eq!(recorder.log().stops, 0);

    session.toggle();
    assert_eq!(session.state(), SessionState::Listening);
    session.toggle();
    assert_eq!(recorder.log().stops, 1);
    assert_eq!(session.state(), SessionState::Listening);
}

#[test]
fn test_unsupported_language_disables_speech() {
    let recorder = Recorder::default();
    let mut factory = FakeFactory::new(recorder.clone());
    factory.init_status = InitStatus::UnsupportedLanguage;
    let mut manager = started(factory, "es");

    assert!(!manager.session().unwrap().speech_enabled());
    assert_eq!(
        recorder.log().notices,
        vec!["La salida de voz no admite este idioma"]
    );
    assert_eq!(recorder.log().output_shutdowns, 1);

    say(&mut manager, "qué hora es");
    assert!(recorder.spoken().is_empty());
    assert_eq!(manager.session().unwrap().state(), SessionState::Idle);
}

#[test]
fn test_init_failure_disables_speech_without_notice() {
    let recorder = Recorder::default();
    let mut factory = FakeFactory::new(recorder.clone());
    factory.init_status = InitStatus::Failure;
    let manager = started(factory, "en");

    assert!(!manager.session().unwrap().speech_enabled());
    assert!(recorder.log().notices.is_empty());
    assert!(recorder.spoken().is_empty());
}

#[test]
fn test_permission_denied_is_spoken() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    manager.session_mut().unwrap().permission_denied();

    assert_eq!(
        recorder.last_spoken().unwrap().1,
        "I need permission to use the microphone"
    );
}

#[test]
fn test_shutdown_releases_providers() {
    let recorder = Recorder::default();
    let mut manager = started(FakeFactory::new(recorder.clone()), "en");

    manager.shutdown();

    assert!(manager.session().is_none());
    assert_eq!(recorder.live_captures(), 0);
    assert_eq!(recorder.log().output_shutdowns, 1);
    assert!(manager.session_mut().is_err());
}

#[test]
fn test_events_without_session_are_dropped() {
    let recorder = Recorder::default();
    let (mut manager, _rx) = manager(FakeFactory::new(recorder.clone()));

    manager
        .dispatch(event(1, RecognitionEvent::Ready))
        .unwrap();

    assert!(manager.session().is_none());
    assert!(recorder.log().cues.is_empty());
}
