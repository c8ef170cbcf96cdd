//! Text cleanup for matching server output.
//!
//! The server decorates chat and lore with `§x` formatting codes and, for
//! some notices, unicode "small caps" letters. Everything we match against
//! goes through here first.

/// Formatting escape marker. Always followed by one code character.
const FORMAT_MARK: char = '§';

/// Stylized small-caps glyph to its plain lowercase letter.
///
/// Letters without a common small-caps form (q, x) are absent.
pub fn fold_small_caps(c: char) -> char {
    match c {
        'ᴀ' => 'a',
        'ʙ' => 'b',
        'ᴄ' => 'c',
        'ᴅ' => 'd',
        'ᴇ' => 'e',
        'ꜰ' => 'f',
        'ɢ' => 'g',
        'ʜ' => 'h',
        'ɪ' => 'i',
        'ᴊ' => 'j',
        'ᴋ' => 'k',
        'ʟ' => 'l',
        'ᴍ' => 'm',
        'ɴ' => 'n',
        'ᴏ' => 'o',
        'ᴘ' => 'p',
        'ʀ' => 'r',
        'ꜱ' => 's',
        'ᴛ' => 't',
        'ᴜ' => 'u',
        'ᴠ' => 'v',
        'ᴡ' => 'w',
        'ʏ' => 'y',
        'ᴢ' => 'z',
        other => other,
    }
}

/// Remove `§` plus the following character everywhere.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == FORMAT_MARK {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Strip formatting and fold small caps, keeping case. Use when the
/// matched text itself is wanted (seller names, buyer names).
pub fn clean(text: &str) -> String {
    strip_formatting(text).chars().map(fold_small_caps).collect()
}

/// `clean` plus lowercase. Use for substring tests.
pub fn normalize(text: &str) -> String {
    clean(text).to_lowercase()
}
