//! Speech input/output loop.
//!
//! Recognition and synthesis trigger each other: a finished utterance can
//! restart recognition. [`SpeechLoop`] owns the state of that loop and turns
//! platform callbacks into [`SpeechAction`]s; a [`SpeechIo`] adapter carries
//! them out. Guards are evaluated when a callback arrives, never mid-flight.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;

/// Recognition and synthesis language
pub const SPEECH_LANG: &str = "ja-JP";

/// Delay between the end of an utterance and the automatic restart of
/// recognition while voice output is on
pub const RESTART_DELAY: Duration = Duration::from_millis(500);

pub const SPEECH_PITCH: f32 = 1.1;
pub const SPEECH_RATE: f32 = 0.95;

/// Tooltip of the microphone control when recognition is unavailable
pub const UNSUPPORTED_TOOLTIP: &str = "このブラウザでは音声入力に対応していません";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    Idle,
    Listening,
    Speaking,
}

/// A synthesis voice offered by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// Text to speak plus how to speak it
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub voice: Option<Voice>,
    pub pitch: f32,
    pub rate: f32,
}

/// Side effects requested from the platform
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechAction {
    StartRecognition,
    StopRecognition,
    /// Cancel anything being spoken
    CancelSpeech,
    Speak(Utterance),
    /// Call [`SpeechLoop::on_restart_due`] after the delay
    ScheduleRestart(Duration),
}

/// Platform speech services
pub trait SpeechIo: Send {
    /// Whether speech recognition exists at all
    fn recognition_supported(&self) -> bool;

    /// Voices available for synthesis
    fn voices(&self) -> Vec<Voice>;

    /// Carry out one action. Failures are reported, never retried.
    fn perform(&mut self, action: SpeechAction) -> Result<()>;
}

/// Speech I/O for front-ends without audio: nothing is supported and every
/// action is dropped.
#[derive(Debug, Default, Clone)]
pub struct NoSpeech;

impl SpeechIo for NoSpeech {
    fn recognition_supported(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn perform(&mut self, action: SpeechAction) -> Result<()> {
        debug!(?action, "Speech action dropped");
        Ok(())
    }
}

/// Pick a Japanese voice: Google or Haruka voices first, otherwise any
/// Japanese voice that is not Ichiro.
pub fn select_voice(voices: &[Voice]) -> Option<Voice> {
    let japanese = || voices.iter().filter(|voice| voice.lang.contains("ja"));

    japanese()
        .find(|voice| voice.name.contains("Google") || voice.name.contains("Haruka"))
        .or_else(|| japanese().find(|voice| !voice.name.contains("Ichiro")))
        .cloned()
}

fn leading_filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(えー|あのー|えっと|あー|うーん|そのー)").expect("valid regex"))
}

fn spaced_filler_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" (えー|あのー|えっと) ").expect("valid regex"))
}

fn demonstrative_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(これ|それ|あれ)").expect("valid regex"))
}

/// Tidy a recognition transcript: drop a leading filler and space-delimited
/// fillers, then replace これ/それ/あれ with the product last mentioned by
/// the assistant, if any.
pub fn clean_user_speech(transcript: &str, last_mentioned: Option<&str>) -> String {
    let cleaned = leading_filler_re().replace(transcript, "");
    let cleaned = spaced_filler_re().replace_all(&cleaned, "").into_owned();

    match last_mentioned.filter(|name| !name.is_empty()) {
        Some(name) if demonstrative_re().is_match(&cleaned) => {
            let resolved = demonstrative_re()
                .replace_all(&cleaned, regex::NoExpand(name))
                .into_owned();
            debug!(resolved = %resolved, "Resolved demonstrative");
            resolved
        }
        _ => cleaned,
    }
}

/// Idle ⇄ Listening ⇄ Speaking
#[derive(Debug, Clone)]
pub struct SpeechLoop {
    state: SpeechState,
    supported: bool,
}

impl SpeechLoop {
    pub fn new(recognition_supported: bool) -> Self {
        Self {
            state: SpeechState::Idle,
            supported: recognition_supported,
        }
    }

    pub fn state(&self) -> SpeechState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == SpeechState::Listening
    }

    pub fn recognition_supported(&self) -> bool {
        self.supported
    }

    /// Microphone control pressed
    pub fn toggle_listening(&mut self) -> Vec<SpeechAction> {
        if !self.supported {
            return Vec::new();
        }
        match self.state {
            SpeechState::Listening => vec![SpeechAction::StopRecognition],
            SpeechState::Speaking => vec![SpeechAction::CancelSpeech, SpeechAction::StartRecognition],
            SpeechState::Idle => vec![SpeechAction::StartRecognition],
        }
    }

    pub fn on_recognition_started(&mut self) {
        self.state = SpeechState::Listening;
    }

    /// Recognition stopped, with or without a result
    pub fn on_recognition_ended(&mut self) {
        if self.state == SpeechState::Listening {
            self.state = SpeechState::Idle;
        }
    }

    pub fn on_recognition_error(&mut self, error: &str) {
        warn!(error = %error, "Speech recognition error");
        self.on_recognition_ended();
    }

    /// Speak an assistant reply. Nothing happens while TTS is off.
    pub fn speak(&mut self, text: &str, tts_enabled: bool, voices: &[Voice]) -> Vec<SpeechAction> {
        if !tts_enabled || text.trim().is_empty() {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.state == SpeechState::Listening {
            actions.push(SpeechAction::StopRecognition);
        }
        actions.push(SpeechAction::CancelSpeech);
        actions.push(SpeechAction::Speak(Utterance {
            text: text.to_string(),
            lang: SPEECH_LANG.to_string(),
            voice: select_voice(voices),
            pitch: SPEECH_PITCH,
            rate: SPEECH_RATE,
        }));
        self.state = SpeechState::Speaking;
        actions
    }

    /// Synthesis finished; schedules a recognition restart while voice output is on
    pub fn on_speech_ended(&mut self, tts_enabled: bool) -> Vec<SpeechAction> {
        if self.state != SpeechState::Speaking {
            return Vec::new();
        }
        self.state = SpeechState::Idle;

        if tts_enabled && self.supported {
            debug!("TTS ended, scheduling recognition restart");
            vec![SpeechAction::ScheduleRestart(RESTART_DELAY)]
        } else {
            Vec::new()
        }
    }

    /// The restart delay elapsed. Flags are re-checked here since they may
    /// have changed while waiting.
    pub fn on_restart_due(&mut self, tts_enabled: bool) -> Vec<SpeechAction> {
        if self.state == SpeechState::Idle && tts_enabled && self.supported {
            vec![SpeechAction::StartRecognition]
        } else {
            Vec::new()
        }
    }

    /// TTS switched off
    pub fn cancel_speech(&mut self) -> Vec<SpeechAction> {
        if self.state == SpeechState::Speaking {
            self.state = SpeechState::Idle;
        }
        vec![SpeechAction::CancelSpeech]
    }
}
