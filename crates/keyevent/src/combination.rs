use crate::error::{Error, Result};
use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A key code plus a modifier set describing one hotkey.
///
/// A combination without a key code is *empty*: it means "no hotkey assigned"
/// and is never installed with the OS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Code>,
    #[serde(
        default = "Modifiers::empty",
        skip_serializing_if = "Modifiers::is_empty"
    )]
    pub modifiers: Modifiers,
}

impl Default for KeyCombination {
    fn default() -> Self {
        Self {
            code: None,
            modifiers: Modifiers::empty(),
        }
    }
}

impl KeyCombination {
    /// Create a combination from a key code and modifier set
    pub fn new(code: Code, modifiers: Modifiers) -> Self {
        Self {
            code: Some(code),
            modifiers,
        }
    }

    /// The "no hotkey assigned" combination
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none()
    }

    /// Parse a combination such as `"cmd+shift+s"`.
    ///
    /// The last `+`-separated part is the key, everything before it is a
    /// modifier. Modifier names are case-insensitive and accept the usual
    /// aliases (`ctrl`/`control`, `alt`/`option`, `cmd`/`command`/`super`,
    /// `fn`/`function`).
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key_part, modifier_parts)) = parts.split_last() else {
            return Err(Error::InvalidKey("Empty key string".to_string()));
        };

        let code = parse_code(key_part)?;
        let mut modifiers = Modifiers::empty();
        for part in modifier_parts {
            modifiers |= parse_modifier(part)?;
        }

        Ok(Self::new(code, modifiers))
    }

    /// Build the `global_hotkey` registration for this combination, if any
    pub fn to_hotkey(&self) -> Option<HotKey> {
        let mods = (!self.modifiers.is_empty()).then_some(self.modifiers);
        self.code.map(|code| HotKey::new(mods, code))
    }

    /// Render with macOS modifier glyphs, e.g. `⌃⌥⇧⌘S`.
    ///
    /// Empty combinations render as an empty string.
    pub fn symbols(&self) -> String {
        let Some(code) = self.code else {
            return String::new();
        };
        let mut out = String::new();
        for (flag, glyph) in MODIFIER_GLYPHS {
            if self.modifiers.contains(*flag) {
                out.push_str(glyph);
            }
        }
        out.push_str(lookup(code).map_or("?", |spec| spec.glyph));
        out
    }

    /// The character a menu item uses as its key equivalent for this
    /// combination. Function and navigation keys map to the AppKit
    /// private-use code points.
    pub fn key_equivalent(&self) -> Option<&'static str> {
        self.code.and_then(lookup).map(|spec| spec.equivalent)
    }
}

impl From<HotKey> for KeyCombination {
    fn from(hotkey: HotKey) -> Self {
        Self::new(hotkey.key, hotkey.mods)
    }
}

impl From<&HotKey> for KeyCombination {
    fn from(hotkey: &HotKey) -> Self {
        Self::new(hotkey.key, hotkey.mods)
    }
}

impl TryFrom<&str> for KeyCombination {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for KeyCombination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(code) = self.code else {
            return Ok(());
        };

        let mut parts: Vec<&str> = MODIFIER_NAMES
            .iter()
            .filter(|(flag, _)| self.modifiers.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        parts.push(lookup(code).map_or("unknown", |spec| spec.name));
        write!(f, "{}", parts.join("+"))
    }
}

const MODIFIER_NAMES: &[(Modifiers, &str)] = &[
    (Modifiers::CONTROL, "ctrl"),
    (Modifiers::ALT, "alt"),
    (Modifiers::SHIFT, "shift"),
    (Modifiers::SUPER, "cmd"),
    (Modifiers::FN, "fn"),
];

const MODIFIER_GLYPHS: &[(Modifiers, &str)] = &[
    (Modifiers::FN, "fn"),
    (Modifiers::CONTROL, "⌃"),
    (Modifiers::ALT, "⌥"),
    (Modifiers::SHIFT, "⇧"),
    (Modifiers::SUPER, "⌘"),
];

fn parse_modifier(part: &str) -> Result<Modifiers> {
    match part.to_lowercase().as_str() {
        "ctrl" | "control" => Ok(Modifiers::CONTROL),
        "alt" | "option" | "opt" => Ok(Modifiers::ALT),
        "shift" => Ok(Modifiers::SHIFT),
        "cmd" | "command" | "super" | "meta" => Ok(Modifiers::SUPER),
        "fn" | "function" => Ok(Modifiers::FN),
        _ => Err(Error::InvalidKey(format!("Unknown modifier: {part}"))),
    }
}

fn parse_code(s: &str) -> Result<Code> {
    let wanted = s.to_lowercase();
    if wanted.is_empty() {
        return Err(Error::InvalidKey("Missing key after modifiers".to_string()));
    }
    KEYS.iter()
        .find(|spec| spec.name == wanted || spec.aliases.contains(&wanted.as_str()))
        .map(|spec| spec.code)
        .ok_or_else(|| Error::InvalidKey(format!("Unknown key code: {s}")))
}

fn lookup(code: Code) -> Option<&'static KeySpec> {
    KEYS.iter().find(|spec| spec.code == code)
}

/// Naming and presentation of one supported key
struct KeySpec {
    code: Code,
    name: &'static str,
    aliases: &'static [&'static str],
    glyph: &'static str,
    equivalent: &'static str,
}

const fn key(
    code: Code,
    name: &'static str,
    aliases: &'static [&'static str],
    glyph: &'static str,
    equivalent: &'static str,
) -> KeySpec {
    KeySpec {
        code,
        name,
        aliases,
        glyph,
        equivalent,
    }
}

const fn letter(code: Code, name: &'static str, glyph: &'static str) -> KeySpec {
    key(code, name, &[], glyph, name)
}

#[rustfmt::skip]
const KEYS: &[KeySpec] = &[
    letter(Code::KeyA, "a", "A"),
    letter(Code::KeyB, "b", "B"),
    letter(Code::KeyC, "c", "C"),
    letter(Code::KeyD, "d", "D"),
    letter(Code::KeyE, "e", "E"),
    letter(Code::KeyF, "f", "F"),
    letter(Code::KeyG, "g", "G"),
    letter(Code::KeyH, "h", "H"),
    letter(Code::KeyI, "i", "I"),
    letter(Code::KeyJ, "j", "J"),
    letter(Code::KeyK, "k", "K"),
    letter(Code::KeyL, "l", "L"),
    letter(Code::KeyM, "m", "M"),
    letter(Code::KeyN, "n", "N"),
    letter(Code::KeyO, "o", "O"),
    letter(Code::KeyP, "p", "P"),
    letter(Code::KeyQ, "q", "Q"),
    letter(Code::KeyR, "r", "R"),
    letter(Code::KeyS, "s", "S"),
    letter(Code::KeyT, "t", "T"),
    letter(Code::KeyU, "u", "U"),
    letter(Code::KeyV, "v", "V"),
    letter(Code::KeyW, "w", "W"),
    letter(Code::KeyX, "x", "X"),
    letter(Code::KeyY, "y", "Y"),
    letter(Code::KeyZ, "z", "Z"),
    key(Code::Digit0, "0", &["digit0"], "0", "0"),
    key(Code::Digit1, "1", &["digit1"], "1", "1"),
    key(Code::Digit2, "2", &["digit2"], "2", "2"),
    key(Code::Digit3, "3", &["digit3"], "3", "3"),
    key(Code::Digit4, "4", &["digit4"], "4", "4"),
    key(Code::Digit5, "5", &["digit5"], "5", "5"),
    key(Code::Digit6, "6", &["digit6"], "6", "6"),
    key(Code::Digit7, "7", &["digit7"], "7", "7"),
    key(Code::Digit8, "8", &["digit8"], "8", "8"),
    key(Code::Digit9, "9", &["digit9"], "9", "9"),
    key(Code::F1, "f1", &[], "F1", "\u{F704}"),
    key(Code::F2, "f2", &[], "F2", "\u{F705}"),
    key(Code::F3, "f3", &[], "F3", "\u{F706}"),
    key(Code::F4, "f4", &[], "F4", "\u{F707}"),
    key(Code::F5, "f5", &[], "F5", "\u{F708}"),
    key(Code::F6, "f6", &[], "F6", "\u{F709}"),
    key(Code::F7, "f7", &[], "F7", "\u{F70A}"),
    key(Code::F8, "f8", &[], "F8", "\u{F70B}"),
    key(Code::F9, "f9", &[], "F9", "\u{F70C}"),
    key(Code::F10, "f10", &[], "F10", "\u{F70D}"),
    key(Code::F11, "f11", &[], "F11", "\u{F70E}"),
    key(Code::F12, "f12", &[], "F12", "\u{F70F}"),
    key(Code::Escape, "escape", &["esc"], "⎋", "\u{1b}"),
    key(Code::Space, "space", &[" "], "Space", " "),
    key(Code::Enter, "enter", &["return"], "↩", "\r"),
    key(Code::Tab, "tab", &[], "⇥", "\t"),
    key(Code::Backspace, "backspace", &[], "⌫", "\u{8}"),
    key(Code::Delete, "delete", &["del"], "⌦", "\u{F728}"),
    key(Code::Insert, "insert", &["ins"], "Ins", "\u{F727}"),
    key(Code::Home, "home", &[], "↖", "\u{F729}"),
    key(Code::End, "end", &[], "↘", "\u{F72B}"),
    key(Code::PageUp, "pageup", &["page_up", "pgup"], "⇞", "\u{F72C}"),
    key(Code::PageDown, "pagedown", &["page_down", "pgdn"], "⇟", "\u{F72D}"),
    key(Code::ArrowLeft, "left", &["arrowleft"], "←", "\u{F702}"),
    key(Code::ArrowRight, "right", &["arrowright"], "→", "\u{F703}"),
    key(Code::ArrowUp, "up", &["arrowup"], "↑", "\u{F700}"),
    key(Code::ArrowDown, "down", &["arrowdown"], "↓", "\u{F701}"),
    key(Code::Minus, "minus", &["-"], "-", "-"),
    key(Code::Equal, "equal", &["equals", "="], "=", "="),
    key(Code::BracketLeft, "bracketleft", &["bracket_left", "["], "[", "["),
    key(Code::BracketRight, "bracketright", &["bracket_right", "]"], "]", "]"),
    key(Code::Backslash, "backslash", &["\\"], "\\", "\\"),
    key(Code::Semicolon, "semicolon", &[";"], ";", ";"),
    key(Code::Quote, "quote", &["'"], "'", "'"),
    key(Code::Comma, "comma", &[","], ",", ","),
    key(Code::Period, "period", &["."], ".", "."),
    key(Code::Slash, "slash", &["/"], "/", "/"),
    key(Code::Backquote, "backquote", &["grave", "`"], "`", "`"),
];
