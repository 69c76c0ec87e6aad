//! Voice selection and enumeration
//!
//! The synthesis engine addresses voices by their installed SAPI names.
//! We expose a small closed set of selectors that map to the desktop
//! voices shipped with Windows, plus a parser for the output of the
//! one-shot voice enumeration (`"<name> | Gender: <gender>"` per line).

use log::warn;

/// Closed set of supported voices
///
/// Each selector maps to an installed SAPI desktop voice name.
/// Unknown indices and names resolve to the default rather than
/// surfacing an error to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSelector {
    ChineseFemale,
    EnglishFemale,
    EnglishMale,
}

impl Default for VoiceSelector {
    fn default() -> Self {
        VoiceSelector::ChineseFemale
    }
}

impl VoiceSelector {
    /// SAPI voice name for this selector
    ///
    /// Total mapping - every selector has a name.
    pub fn sapi_name(self) -> &'static str {
        match self {
            VoiceSelector::ChineseFemale => "Microsoft Huihui Desktop",
            VoiceSelector::EnglishFemale => "Microsoft Zira Desktop",
            VoiceSelector::EnglishMale => "Microsoft David Desktop",
        }
    }

    /// Select a voice by dropdown-style index, falling back to the
    /// default for out-of-range values
    pub fn from_index(idx: usize) -> Self {
        const VOICES: &[VoiceSelector] = &[
            VoiceSelector::ChineseFemale,
            VoiceSelector::EnglishFemale,
            VoiceSelector::EnglishMale,
        ];

        VOICES.get(idx).copied().unwrap_or_default()
    }

    /// Parse a selector from its config/CLI name
    ///
    /// Unknown names fall back to the default so a stale config entry
    /// never breaks startup.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "chinese-female" | "huihui" => VoiceSelector::ChineseFemale,
            "english-female" | "zira" => VoiceSelector::EnglishFemale,
            "english-male" | "david" => VoiceSelector::EnglishMale,
            other => {
                if !other.is_empty() {
                    warn!("Unknown voice '{}', using default", other);
                }
                VoiceSelector::default()
            }
        }
    }

    /// Config/CLI name for this selector
    pub fn config_name(self) -> &'static str {
        match self {
            VoiceSelector::ChineseFemale => "chinese-female",
            VoiceSelector::EnglishFemale => "english-female",
            VoiceSelector::EnglishMale => "english-male",
        }
    }
}

/// One installed voice as reported by the enumeration subprocess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub gender: String,
}

/// Separator between name and gender in enumeration output
const GENDER_SEPARATOR: &str = " | Gender: ";

/// Parse voice enumeration output, one entry per line
///
/// Blank lines are skipped; malformed lines are logged and skipped.
/// Zero voices yields an empty list, never an error.
pub fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    let mut voices = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(GENDER_SEPARATOR) {
            Some((name, gender)) if !name.is_empty() => {
                voices.push(VoiceInfo {
                    name: name.trim().to_string(),
                    gender: gender.trim().to_string(),
                });
            }
            _ => {
                warn!("Skipping malformed voice entry: {:?}", line);
            }
        }
    }

    voices
}
