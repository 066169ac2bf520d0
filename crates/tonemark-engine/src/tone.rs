use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::Label;

/// General MIDI program 0, acoustic grand piano.
pub const PIANO: u8 = 0;

/// An audio cue: a note name such as `c#4` played on a MIDI program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tone {
    pub note: String,
    pub instrument: u8,
}

impl Tone {
    pub fn new(note: impl Into<String>, instrument: u8) -> Self {
        Self {
            note: note.into(),
            instrument,
        }
    }

    /// Context cues are always played on the piano.
    pub fn for_label(label: &Label) -> Self {
        Self::new(label.note(), PIANO)
    }

    /// Tone played for flagged lines unless configured otherwise: a high E on
    /// tubular bells, well away from the piano used for context cues.
    pub fn default_flag() -> Self {
        Self::new("e6", 14)
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (program {})", self.note, self.instrument)
    }
}

/// Audio output.
pub trait ToneSink {
    fn play(&mut self, tone: &Tone) -> anyhow::Result<()>;
}

/// Play `tone`, logging instead of failing when the output is unavailable.
pub fn play_cue(sink: &mut dyn ToneSink, tone: &Tone) {
    if let Err(e) = sink.play(tone) {
        log::warn!("could not play {tone}: {e:#}");
    }
}

/// Sink that only records tones in the log, for hosts without a MIDI device.
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<Tone>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Tone> {
        self.last.as_ref()
    }
}

impl ToneSink for LogSink {
    fn play(&mut self, tone: &Tone) -> anyhow::Result<()> {
        log::info!("cue {tone}");
        self.last = Some(tone.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Category;

    struct BrokenSink;

    impl ToneSink for BrokenSink {
        fn play(&mut self, _tone: &Tone) -> anyhow::Result<()> {
            anyhow::bail!("no MIDI output")
        }
    }

    #[test]
    fn test_label_tone_uses_piano() {
        let label = Label {
            category: Category::Function,
            weight: 4,
        };
        assert_eq!(Tone::for_label(&label), Tone::new("c#4", PIANO));
    }

    #[test]
    fn test_flag_tone_differs_from_context_tones() {
        assert_ne!(Tone::default_flag().instrument, PIANO);
    }

    #[test]
    fn test_play_cue_swallows_sink_errors() {
        play_cue(&mut BrokenSink, &Tone::default_flag());
    }

    #[test]
    fn test_log_sink_remembers_last_tone() {
        let mut sink = LogSink::new();
        play_cue(&mut sink, &Tone::new("b3", PIANO));
        assert_eq!(sink.last(), Some(&Tone::new("b3", PIANO)));
    }
}
