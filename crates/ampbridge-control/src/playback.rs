//! Playback transport keys and loop mode.
//!
//! The transport keys (`POP`, `NXT`, `PRE`, `STP`) are fire-and-forget: the
//! device acknowledges them only through its notification stream, so these
//! methods return once the command is queued.

use ampbridge_transport::AsyncLine;
use ampbridge_wire::command;

use crate::error::{ControlError, Result};
use crate::media::MediaControl;

impl<T: AsyncLine<Message = String>> MediaControl<T> {
    /// Toggle between playing and paused.
    pub async fn play_pause(&self) -> Result<()> {
        self.press("POP").await
    }

    pub async fn next_track(&self) -> Result<()> {
        self.press("NXT").await
    }

    pub async fn previous_track(&self) -> Result<()> {
        self.press("PRE").await
    }

    pub async fn stop(&self) -> Result<()> {
        self.press("STP").await
    }

    async fn press(&self, cmd: &'static str) -> Result<()> {
        self.ensure_line()?;
        self.transport.send(command::request(cmd)).await?;
        Ok(())
    }

    pub async fn loop_mode(&self) -> Result<LoopMode> {
        let param = self.query("LPM").await?;
        LoopMode::from_api_text(&param).ok_or_else(|| ControlError::no_match("LPM", param.as_bytes()))
    }

    pub async fn set_loop_mode(&self, mode: LoopMode) -> Result<LoopMode> {
        let param = self.query_with_param("LPM", mode.api_text()).await?;
        LoopMode::from_api_text(&param).ok_or_else(|| ControlError::no_match("LPM", param.as_bytes()))
    }
}

/// Track sequencing mode of the built-in player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopMode {
    RepeatAll,
    RepeatOne,
    RepeatShuffle,
    Shuffle,
    Sequence,
}

impl LoopMode {
    /// The token the wire protocol uses for this mode.
    pub fn api_text(self) -> &'static str {
        match self {
            LoopMode::RepeatAll => "REPEATALL",
            LoopMode::RepeatOne => "REPEATONE",
            LoopMode::RepeatShuffle => "REPEATSHUFFLE",
            LoopMode::Shuffle => "SHUFFLE",
            LoopMode::Sequence => "SEQUENCE",
        }
    }

    pub fn from_api_text(text: &str) -> Option<Self> {
        match text {
            "REPEATALL" => Some(LoopMode::RepeatAll),
            "REPEATONE" => Some(LoopMode::RepeatOne),
            "REPEATSHUFFLE" => Some(LoopMode::RepeatShuffle),
            "SHUFFLE" => Some(LoopMode::Shuffle),
            "SEQUENCE" => Some(LoopMode::Sequence),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopMode::RepeatAll => "Repeat All",
            LoopMode::RepeatOne => "Repeat One",
            LoopMode::RepeatShuffle => "Repeat & Shuffle",
            LoopMode::Shuffle => "Shuffle",
            LoopMode::Sequence => "Sequence",
        };
        f.write_str(name)
    }
}
