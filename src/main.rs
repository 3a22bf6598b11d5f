use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_assistant::locale::{LocaleId, Predicate};
use voice_assistant::voice::{AudioPlayback, Microphone, TextToSpeech, rms};
use voice_assistant::{Config, Daemon, classify};

/// Assistant - bilingual voice command assistant
#[derive(Parser)]
#[command(name = "assistant", version, about)]
struct Cli {
    /// Language to start in ("en" or "es")
    #[arg(short, long)]
    language: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Type commands instead of speaking them
    #[arg(long, env = "ASSISTANT_TEXT_MODE")]
    text: bool,

    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show which command a phrase maps to
    Classify {
        /// Phrase as it would be recognized
        text: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// List locale profiles and their keywords
    Locales,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voice_assistant=info",
        1 => "info,voice_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.language.as_deref(), cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Classify { text } => {
                cmd_classify(&config, &text);
                Ok(())
            }
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestTts { text } => test_tts(&config, text).await,
            Command::Locales => {
                cmd_locales();
                Ok(())
            }
        };
    }

    tracing::info!(
        language = %config.language,
        text_mode = cli.text,
        "starting assistant"
    );

    Daemon::new(config, cli.text).run().await?;
    Ok(())
}

/// Print the command a phrase classifies to
fn cmd_classify(config: &Config, text: &str) {
    let profile = config.language.locale().profile();
    let command = classify(&text.to_lowercase(), profile);
    println!("[{}] {command}", profile.id());
}

/// Print every locale profile
fn cmd_locales() {
    for locale in LocaleId::ALL {
        let profile = locale.profile();
        println!(
            "{locale} (recognition language: {})",
            profile.recognition_language_code()
        );
        for predicate in Predicate::ALL {
            println!(
                "  {:<9} {}",
                predicate.name(),
                profile.keywords().keywords(predicate).join(", ")
            );
        }
        println!("  welcome: {}", profile.utterances().welcome);
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut mic = Microphone::open()?;
    mic.start()?;

    println!("Sample rate: {} Hz", voice_assistant::voice::SAMPLE_RATE);
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = mic.take_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    mic.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: String) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let tts = TextToSpeech::new_openai(
        config.api_keys.openai.clone(),
        config.voice.tts_voice.clone(),
        config.voice.tts_model.clone(),
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(&text, config.voice.rate).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || {
        let playback = AudioPlayback::new()?;
        playback.play_mp3(&mp3_data, || false)
    })
    .await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
