//! Supported languages, script-based detection and target selection.

use anyhow::Result;

use crate::ui::Style;

/// A language by its canonical English name and its native name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub native: &'static str,
}

impl LanguageInfo {
    const fn new(code: &'static str, native: &'static str) -> Self {
        Self { code, native }
    }
}

pub const ENGLISH: LanguageInfo = LanguageInfo::new("English", "English");
pub const CHINESE: LanguageInfo = LanguageInfo::new("Chinese", "中文");
pub const JAPANESE: LanguageInfo = LanguageInfo::new("Japanese", "日本語");
pub const KOREAN: LanguageInfo = LanguageInfo::new("Korean", "한국어");
pub const RUSSIAN: LanguageInfo = LanguageInfo::new("Russian", "Русский");

/// Languages accepted as a configured target.
pub const SUPPORTED_LANGUAGES: &[LanguageInfo] = &[
    ENGLISH,
    CHINESE,
    JAPANESE,
    KOREAN,
    LanguageInfo::new("French", "Français"),
    LanguageInfo::new("German", "Deutsch"),
    LanguageInfo::new("Spanish", "Español"),
    RUSSIAN,
];

/// Looks a language up by its English or native name.
pub fn lookup(name: &str) -> Option<LanguageInfo> {
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|lang| lang.code == name || lang.native == name)
}

/// Resolves a configured target language name.
///
/// # Errors
///
/// Returns an error if the name is not a supported language.
pub fn validate_language(name: &str) -> Result<LanguageInfo> {
    lookup(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid target language: '{name}'\n\n\
             Valid languages: English, Chinese, Japanese, Korean, ...\n\
             Run 'seltl languages' to see all supported languages."
        )
    })
}

/// Guesses the language of `text` from the scripts it contains.
///
/// Checked in order: CJK ideographs, kana, Hangul, Cyrillic. Anything else
/// is treated as English.
pub fn detect(text: &str) -> LanguageInfo {
    let has = |range: &[(char, char)]| {
        text.chars()
            .any(|c| range.iter().any(|&(lo, hi)| (lo..=hi).contains(&c)))
    };

    if has(&[('\u{4e00}', '\u{9fff}')]) {
        CHINESE
    } else if has(&[('\u{3040}', '\u{309f}'), ('\u{30a0}', '\u{30ff}')]) {
        JAPANESE
    } else if has(&[('\u{ac00}', '\u{d7af}')]) {
        KOREAN
    } else if has(&[('\u{0400}', '\u{04ff}')]) {
        RUSSIAN
    } else {
        ENGLISH
    }
}

/// Picks the language to translate `source` into.
///
/// When the configured target is the source language itself, English text
/// goes to Chinese and everything else goes to English. An unknown
/// configured name falls back to English.
pub fn target_for(source: LanguageInfo, configured: &str) -> LanguageInfo {
    let target = lookup(configured);
    let target_code = target.map_or(configured, |lang| lang.code);

    if source.code == target_code {
        return if source == ENGLISH { CHINESE } else { ENGLISH };
    }

    target.unwrap_or(ENGLISH)
}

/// Prints all supported target languages to stdout.
pub fn print_languages() {
    println!("{}", Style::header("Supported target languages"));
    for lang in SUPPORTED_LANGUAGES {
        println!(
            "  {}  {}",
            Style::code(format!("{:10}", lang.code)),
            Style::secondary(lang.native)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scripts() {
        assert_eq!(detect("hello world"), ENGLISH);
        assert_eq!(detect("你好"), CHINESE);
        assert_eq!(detect("こんにちは"), JAPANESE);
        assert_eq!(detect("カタカナ"), JAPANESE);
        assert_eq!(detect("안녕하세요"), KOREAN);
        assert_eq!(detect("Привет"), RUSSIAN);
        assert_eq!(detect(""), ENGLISH);
    }

    #[test]
    fn test_detect_prefers_ideographs_over_kana() {
        // Japanese with kanji is detected as Chinese, as in the script order.
        assert_eq!(detect("日本語です"), CHINESE);
    }

    #[test]
    fn test_target_for_configured_language() {
        assert_eq!(target_for(ENGLISH, "Japanese"), JAPANESE);
        assert_eq!(target_for(ENGLISH, "日本語"), JAPANESE);
        assert_eq!(target_for(CHINESE, "English"), ENGLISH);
    }

    #[test]
    fn test_target_for_swaps_when_same_as_source() {
        assert_eq!(target_for(ENGLISH, "English"), CHINESE);
        assert_eq!(target_for(CHINESE, "中文"), ENGLISH);
        assert_eq!(target_for(RUSSIAN, "Russian"), ENGLISH);
    }

    #[test]
    fn test_target_for_unknown_falls_back_to_english() {
        assert_eq!(target_for(CHINESE, "Klingon"), ENGLISH);
        // Unknown name matching nothing is never "the same" as English source.
        assert_eq!(target_for(ENGLISH, "Klingon"), ENGLISH);
    }

    #[test]
    fn test_validate_language() {
        assert_eq!(validate_language("中文").ok(), Some(CHINESE));
        assert!(validate_language("Klingon").is_err());
        assert!(validate_language("").is_err());
    }

    #[test]
    fn test_lookup_by_either_name() {
        assert_eq!(lookup("French").map(|l| l.native), Some("Français"));
        assert_eq!(lookup("Deutsch").map(|l| l.code), Some("German"));
        assert!(lookup("french").is_none());
    }
}
