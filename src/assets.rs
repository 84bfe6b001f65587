// src/assets.rs
//
// Narration asset catalog.
//
// Only the grounded intention has dedicated recordings so far. Every other
// intention falls back to the grounded intro/outro until its own recording
// ships.

use crate::state::Intention;

/// Which of the two narration clips of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipKind {
    Intro,
    Outro,
}

impl ClipKind {
    /// The clip that must not play while this one does.
    #[inline]
    pub fn other(self) -> ClipKind {
        match self {
            ClipKind::Intro => ClipKind::Outro,
            ClipKind::Outro => ClipKind::Intro,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClipKind::Intro => "intro",
            ClipKind::Outro => "outro",
        }
    }

    /// Stable numeric code for host bindings.
    pub fn code(self) -> u8 {
        match self {
            ClipKind::Intro => 0,
            ClipKind::Outro => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ClipKind::Intro),
            1 => Some(ClipKind::Outro),
            _ => None,
        }
    }
}

/// Bundled narration recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetId {
    GroundedIntro,
    GroundedOutro,
}

impl AssetId {
    /// Bundle-relative file name.
    pub fn file_name(self) -> &'static str {
        match self {
            AssetId::GroundedIntro => "grounded_intro.mp3",
            AssetId::GroundedOutro => "grounded_outro.mp3",
        }
    }
}

/// Narration asset for an intention and clip.
pub fn asset_for(intention: Intention, clip: ClipKind) -> AssetId {
    match (intention, clip) {
        (Intention::Grounded, ClipKind::Intro) => AssetId::GroundedIntro,
        (Intention::Grounded, ClipKind::Outro) => AssetId::GroundedOutro,

        // No dedicated recordings yet.
        (Intention::Focus | Intention::Gratitude | Intention::None, ClipKind::Intro) => {
            AssetId::GroundedIntro
        }
        (Intention::Focus | Intention::Gratitude | Intention::None, ClipKind::Outro) => {
            AssetId::GroundedOutro
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_intention_has_assets() {
        for intention in [
            Intention::Grounded,
            Intention::Focus,
            Intention::Gratitude,
            Intention::None,
        ] {
            assert_eq!(asset_for(intention, ClipKind::Intro), AssetId::GroundedIntro);
            assert_eq!(asset_for(intention, ClipKind::Outro), AssetId::GroundedOutro);
        }
    }

    #[test]
    fn test_other_clip() {
        assert_eq!(ClipKind::Intro.other(), ClipKind::Outro);
        assert_eq!(ClipKind::Outro.other(), ClipKind::Intro);
        assert_eq!(AssetId::GroundedIntro.file_name(), "grounded_intro.mp3");
    }
}
