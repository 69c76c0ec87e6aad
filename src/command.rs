//! PowerShell command construction for the SAPI engine
//!
//! Speech happens by handing a System.Speech script to `powershell.exe`.
//! Everything here is pure string work: escape user text, then splice it
//! into a fixed single-line script. No process is touched in this module,
//! which keeps the command grammar unit-testable on any platform.

use crate::voice::VoiceSelector;

/// One-shot script that prints each installed voice as
/// `"<name> | Gender: <gender>"` on its own line
pub const LIST_VOICES_COMMAND: &str = "Add-Type -AssemblyName System.Speech; \
     $synth = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
     $synth.GetInstalledVoices() | ForEach-Object { \
     Write-Output ($_.VoiceInfo.Name + ' | Gender: ' + $_.VoiceInfo.Gender) }";

/// Escape user text for interpolation into a single-quoted PowerShell
/// string literal.
///
/// Fixed substitution list, applied in order:
/// - `'` doubled (PowerShell single-quote literal escaping; must run
///   before the caller wraps the text in quotes)
/// - `$` and `"` backtick-escaped so they stay inert if the literal is
///   ever re-evaluated
/// - CRLF and bare LF collapsed to a space so the script stays one line
///
/// This list is the whole contract. It neutralizes the delimiters of the
/// SAPI script grammar; it is not a general-purpose sanitizer and must
/// not be extended without changing the command format with it.
pub fn escape_text(text: &str) -> String {
    text.replace('\'', "''")
        .replace('$', "`$")
        .replace('"', "`\"")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

/// Build the full speak command for one utterance
///
/// Deterministic and side-effect free: constructs a synthesizer, selects
/// the voice by exact SAPI name, applies volume (0-100) and rate (-10 to
/// 10), and speaks the escaped text. The result is a single line with no
/// raw newlines.
pub fn build_speak_command(voice: VoiceSelector, text: &str, volume: u8, rate: i8) -> String {
    format!(
        "Add-Type -AssemblyName System.Speech; \
         $speak = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
         $speak.SelectVoice('{}'); \
         $speak.Volume = {}; \
         $speak.Rate = {}; \
         $speak.Speak('{}')",
        voice.sapi_name(),
        volume,
        rate,
        escape_text(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("Hello"), "Hello");
        assert_eq!(escape_text("it's"), "it''s");
        assert_eq!(escape_text("$PATH"), "`$PATH");
        assert_eq!(escape_text("say \"hi\""), "say `\"hi`\"");
        assert_eq!(escape_text("Hello\nWorld"), "Hello World");
        assert_eq!(escape_text("Line1\r\nLine2"), "Line1 Line2");
    }

    #[test]
    fn test_escape_text_combined() {
        let escaped = escape_text("don't\r\nrun $cmd \"now\"\n");
        assert_eq!(escaped, "don''t run `$cmd `\"now`\" ");
        assert!(!escaped.contains('\n'));
        assert!(!escaped.contains('\r'));
    }

    #[test]
    fn test_escape_leaves_no_breakout_characters() {
        let hostile = "'; $speak.Speak('pwned'); '\n\"$x\"\r\n";
        let escaped = escape_text(hostile);

        // Every single quote ends up doubled, so the literal cannot be
        // closed early
        let mut chars = escaped.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                assert_eq!(chars.next(), Some('\''), "unpaired quote in {:?}", escaped);
            }
        }
        assert!(!escaped.contains('\n'));

        // Every dollar sign carries its backtick escape
        assert_eq!(escaped.matches('$').count(), escaped.matches("`$").count());
    }

    #[test]
    fn test_escape_is_deterministic() {
        let input = "mixed 'quotes' and $vars\n";
        assert_eq!(escape_text(input), escape_text(input));
    }

    #[test]
    fn test_build_speak_command() {
        let cmd = build_speak_command(VoiceSelector::ChineseFemale, "Hello 'world'", 100, 0);
        assert!(cmd.contains("Microsoft Huihui Desktop"));
        assert!(cmd.contains("$speak.Speak('Hello ''world''')"));
        assert!(cmd.contains("$speak.Volume = 100"));
        assert!(cmd.contains("$speak.Rate = 0"));
        assert!(!cmd.contains('\n'));
    }

    #[test]
    fn test_build_speak_command_voices_and_settings() {
        let cmd = build_speak_command(VoiceSelector::EnglishMale, "test", 60, -3);
        assert!(cmd.contains("SelectVoice('Microsoft David Desktop')"));
        assert!(cmd.contains("$speak.Volume = 60"));
        assert!(cmd.contains("$speak.Rate = -3"));
    }

    #[test]
    fn test_build_speak_command_deterministic() {
        let a = build_speak_command(VoiceSelector::EnglishFemale, "same input", 80, 2);
        let b = build_speak_command(VoiceSelector::EnglishFemale, "same input", 80, 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_list_voices_command_shape() {
        assert!(LIST_VOICES_COMMAND.contains("GetInstalledVoices"));
        assert!(LIST_VOICES_COMMAND.contains("' | Gender: '"));
        assert!(!LIST_VOICES_COMMAND.contains('\n'));
    }
}
