use std::sync::LazyLock;

use regex::Regex;

/// Fully-qualified emoji and emoji sequences.
///
/// Text-presentation symbols (`©`, `™`, `♥`) are only emoji when followed by
/// U+FE0F, so a bare one stays in the name. Keycaps take their base
/// character with them, and modifier, ZWJ, and tag sequences are removed
/// whole.
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    let keycap = r"[#*0-9]\x{FE0F}?\x{20E3}";
    let flag = r"[\x{1F1E6}-\x{1F1FF}]{2}";
    let base = r"(?:\p{Emoji_Modifier_Base}\p{Emoji_Modifier}|\p{Emoji_Presentation}|\p{Extended_Pictographic}\x{FE0F})";
    let trailer = r"(?:\p{Emoji_Modifier}|\x{FE0F})*(?:[\x{E0020}-\x{E007E}]+\x{E007F})?";
    let joined = r"(?:\x{200D}\p{Extended_Pictographic}(?:\p{Emoji_Modifier}|\x{FE0F})*)*";
    Regex::new(&format!("{keycap}|{flag}|{base}{trailer}{joined}")).expect("valid emoji pattern")
});

/// Map a track title to a string usable as both a file name and an object
/// key segment.
///
/// Reserved characters `< > : " / \ | * ?` become `-`, then emoji are
/// removed. Runs of hyphens or spaces are left as they are, and a title made
/// only of emoji sanitizes to the empty string.
pub fn sanitize_name(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '*' | '?' => '-',
            other => other,
        })
        .collect();
    EMOJI.replace_all(&replaced, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_title_unchanged() {
        assert_eq!(sanitize_name("My Song"), "My Song");
        assert_eq!(sanitize_name("Café del Mar (Remix) 2"), "Café del Mar (Remix) 2");
        assert_eq!(sanitize_name("#1 Hit"), "#1 Hit");
    }

    #[test]
    fn test_reserved_characters_become_hyphens() {
        assert_eq!(sanitize_name("a<b>c:d\"e/f\\g|h*i?j"), "a-b-c-d-e-f-g-h-i-j");
        assert_eq!(sanitize_name("AC/DC: Live"), "AC-DC- Live");
    }

    #[test]
    fn test_consecutive_hyphens_kept() {
        assert_eq!(sanitize_name("foo//bar"), "foo--bar");
    }

    #[test]
    fn test_emoji_removed() {
        assert_eq!(sanitize_name("Fire 🔥 Track"), "Fire  Track");
        assert_eq!(sanitize_name("love ❤️"), "love ");
        assert_eq!(sanitize_name("wave 👋🏽"), "wave ");
        assert_eq!(sanitize_name("family 👨‍👩‍👧 time"), "family  time");
        assert_eq!(sanitize_name("🇯🇵 mix"), " mix");
    }

    #[test]
    fn test_text_symbols_kept() {
        assert_eq!(sanitize_name("A © B"), "A © B");
        assert_eq!(sanitize_name("Song™"), "Song™");
        assert_eq!(sanitize_name("I ♥ U"), "I ♥ U");
        assert_eq!(sanitize_name("up ↑ down"), "up ↑ down");
    }

    #[test]
    fn test_emoji_presentation_of_text_symbol_removed() {
        assert_eq!(sanitize_name("I ♥\u{FE0F} U"), "I  U");
        assert_eq!(sanitize_name("A ©\u{FE0F} B"), "A  B");
    }

    #[test]
    fn test_keycap_removed_whole() {
        assert_eq!(sanitize_name("#\u{FE0F}\u{20E3} one"), " one");
        assert_eq!(sanitize_name("Top 1\u{FE0F}\u{20E3}0"), "Top 0");
        assert_eq!(sanitize_name("#1 Hit"), "#1 Hit");
    }

    #[test]
    fn test_tag_sequence_flag_removed_whole() {
        let scotland = "\u{1F3F4}\u{E0067}\u{E0062}\u{E0073}\u{E0063}\u{E0074}\u{E007F}";
        assert_eq!(sanitize_name(&format!("{} anthem", scotland)), " anthem");
    }

    #[test]
    fn test_only_emoji_is_empty() {
        assert_eq!(sanitize_name("🎵🎶"), "");
        assert_eq!(sanitize_name(""), "");
    }

    #[test]
    fn test_titles_differing_in_unsafe_chars_collide() {
        assert_eq!(sanitize_name("Song?"), sanitize_name("Song*"));
        assert_eq!(sanitize_name("Song 🔥"), sanitize_name("Song 🎵"));
    }

    #[test]
    fn test_reapplying_keeps_sanitized_name() {
        for title in ["My: Song?", "Fire 🔥 Track", "a/b\\c", "plain"] {
            let once = sanitize_name(title);
            assert_eq!(sanitize_name(&once), once);
        }
    }
}
