// Xkbsym Keysym Type
// Represents a symbol produced by a key, with name lookup and case classification

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

include!(concat!(env!("OUT_DIR"), "/keysym_type.rs"));

/// The "no symbol" sentinel
pub const NO_SYMBOL: Keysym = Keysym(0);

/// The "void symbol" keysym, an explicit "does nothing" symbol
pub const VOID_SYMBOL: Keysym = Keysym(0x00ff_ffff);

/// First keypad keysym (KP_Space)
const KP_SPACE: u32 = 0xff80;
/// Last keypad keysym (KP_Equal)
const KP_EQUAL: u32 = 0xffbd;

/// Offset of directly encoded Unicode keysyms
const UNICODE_OFFSET: u32 = 0x0100_0000;

fn keysym_table() -> &'static [(&'static str, u32)] {
    static KEYSYMS: OnceLock<Vec<(&'static str, u32)>> = OnceLock::new();
    KEYSYMS.get_or_init(|| {
        let mut table: Vec<(&'static str, u32)> = vec![
            ("NoSymbol", 0x0000),
            ("VoidSymbol", 0x00ff_ffff),
            // ASCII punctuation
            ("space", 0x0020),
            ("exclam", 0x0021),
            ("quotedbl", 0x0022),
            ("numbersign", 0x0023),
            ("dollar", 0x0024),
            ("percent", 0x0025),
            ("ampersand", 0x0026),
            ("apostrophe", 0x0027),
            ("parenleft", 0x0028),
            ("parenright", 0x0029),
            ("asterisk", 0x002a),
            ("plus", 0x002b),
            ("comma", 0x002c),
            ("minus", 0x002d),
            ("period", 0x002e),
            ("slash", 0x002f),
            ("colon", 0x003a),
            ("semicolon", 0x003b),
            ("less", 0x003c),
            ("equal", 0x003d),
            ("greater", 0x003e),
            ("question", 0x003f),
            ("at", 0x0040),
            ("bracketleft", 0x005b),
            ("backslash", 0x005c),
            ("bracketright", 0x005d),
            ("asciicircum", 0x005e),
            ("underscore", 0x005f),
            ("grave", 0x0060),
            ("braceleft", 0x007b),
            ("bar", 0x007c),
            ("braceright", 0x007d),
            ("asciitilde", 0x007e),
            // Latin-1 supplement
            ("nobreakspace", 0x00a0),
            ("exclamdown", 0x00a1),
            ("cent", 0x00a2),
            ("sterling", 0x00a3),
            ("currency", 0x00a4),
            ("yen", 0x00a5),
            ("brokenbar", 0x00a6),
            ("section", 0x00a7),
            ("diaeresis", 0x00a8),
            ("copyright", 0x00a9),
            ("ordfeminine", 0x00aa),
            ("guillemotleft", 0x00ab),
            ("notsign", 0x00ac),
            ("hyphen", 0x00ad),
            ("registered", 0x00ae),
            ("macron", 0x00af),
            ("degree", 0x00b0),
            ("plusminus", 0x00b1),
            ("twosuperior", 0x00b2),
            ("threesuperior", 0x00b3),
            ("acute", 0x00b4),
            ("mu", 0x00b5),
            ("paragraph", 0x00b6),
            ("periodcentered", 0x00b7),
            ("cedilla", 0x00b8),
            ("onesuperior", 0x00b9),
            ("masculine", 0x00ba),
            ("guillemotright", 0x00bb),
            ("onequarter", 0x00bc),
            ("onehalf", 0x00bd),
            ("threequarters", 0x00be),
            ("questiondown", 0x00bf),
            ("Agrave", 0x00c0),
            ("Aacute", 0x00c1),
            ("Acircumflex", 0x00c2),
            ("Atilde", 0x00c3),
            ("Adiaeresis", 0x00c4),
            ("Aring", 0x00c5),
            ("AE", 0x00c6),
            ("Ccedilla", 0x00c7),
            ("Egrave", 0x00c8),
            ("Eacute", 0x00c9),
            ("Ecircumflex", 0x00ca),
            ("Ediaeresis", 0x00cb),
            ("Igrave", 0x00cc),
            ("Iacute", 0x00cd),
            ("Icircumflex", 0x00ce),
            ("Idiaeresis", 0x00cf),
            ("ETH", 0x00d0),
            ("Ntilde", 0x00d1),
            ("Ograve", 0x00d2),
            ("Oacute", 0x00d3),
            ("Ocircumflex", 0x00d4),
            ("Otilde", 0x00d5),
            ("Odiaeresis", 0x00d6),
            ("multiply", 0x00d7),
            ("Oslash", 0x00d8),
            ("Ugrave", 0x00d9),
            ("Uacute", 0x00da),
            ("Ucircumflex", 0x00db),
            ("Udiaeresis", 0x00dc),
            ("Yacute", 0x00dd),
            ("THORN", 0x00de),
            ("ssharp", 0x00df),
            ("agrave", 0x00e0),
            ("aacute", 0x00e1),
            ("acircumflex", 0x00e2),
            ("atilde", 0x00e3),
            ("adiaeresis", 0x00e4),
            ("aring", 0x00e5),
            ("ae", 0x00e6),
            ("ccedilla", 0x00e7),
            ("egrave", 0x00e8),
            ("eacute", 0x00e9),
            ("ecircumflex", 0x00ea),
            ("ediaeresis", 0x00eb),
            ("igrave", 0x00ec),
            ("iacute", 0x00ed),
            ("icircumflex", 0x00ee),
            ("idiaeresis", 0x00ef),
            ("eth", 0x00f0),
            ("ntilde", 0x00f1),
            ("ograve", 0x00f2),
            ("oacute", 0x00f3),
            ("ocircumflex", 0x00f4),
            ("otilde", 0x00f5),
            ("odiaeresis", 0x00f6),
            ("division", 0x00f7),
            ("oslash", 0x00f8),
            ("ugrave", 0x00f9),
            ("uacute", 0x00fa),
            ("ucircumflex", 0x00fb),
            ("udiaeresis", 0x00fc),
            ("yacute", 0x00fd),
            ("thorn", 0x00fe),
            ("ydiaeresis", 0x00ff),
            // ISO 9995 and dead keys
            ("ISO_Level3_Shift", 0xfe03),
            ("ISO_Level5_Shift", 0xfe11),
            ("ISO_Next_Group", 0xfe08),
            ("ISO_Prev_Group", 0xfe0a),
            ("ISO_Left_Tab", 0xfe20),
            ("dead_grave", 0xfe50),
            ("dead_acute", 0xfe51),
            ("dead_circumflex", 0xfe52),
            ("dead_tilde", 0xfe53),
            ("dead_macron", 0xfe54),
            ("dead_diaeresis", 0xfe57),
            ("dead_cedilla", 0xfe5b),
            // TTY function keys
            ("BackSpace", 0xff08),
            ("Tab", 0xff09),
            ("Linefeed", 0xff0a),
            ("Clear", 0xff0b),
            ("Return", 0xff0d),
            ("Pause", 0xff13),
            ("Scroll_Lock", 0xff14),
            ("Sys_Req", 0xff15),
            ("Escape", 0xff1b),
            ("Multi_key", 0xff20),
            ("Delete", 0xffff),
            // Cursor control
            ("Home", 0xff50),
            ("Left", 0xff51),
            ("Up", 0xff52),
            ("Right", 0xff53),
            ("Down", 0xff54),
            ("Prior", 0xff55),
            ("Page_Up", 0xff55),
            ("Next", 0xff56),
            ("Page_Down", 0xff56),
            ("End", 0xff57),
            ("Begin", 0xff58),
            // Misc functions
            ("Select", 0xff60),
            ("Print", 0xff61),
            ("Execute", 0xff62),
            ("Insert", 0xff63),
            ("Undo", 0xff65),
            ("Redo", 0xff66),
            ("Menu", 0xff67),
            ("Find", 0xff68),
            ("Cancel", 0xff69),
            ("Help", 0xff6a),
            ("Break", 0xff6b),
            ("Mode_switch", 0xff7e),
            ("Num_Lock", 0xff7f),
            // Keypad
            ("KP_Space", 0xff80),
            ("KP_Tab", 0xff89),
            ("KP_Enter", 0xff8d),
            ("KP_F1", 0xff91),
            ("KP_F2", 0xff92),
            ("KP_F3", 0xff93),
            ("KP_F4", 0xff94),
            ("KP_Home", 0xff95),
            ("KP_Left", 0xff96),
            ("KP_Up", 0xff97),
            ("KP_Right", 0xff98),
            ("KP_Down", 0xff99),
            ("KP_Prior", 0xff9a),
            ("KP_Page_Up", 0xff9a),
            ("KP_Next", 0xff9b),
            ("KP_Page_Down", 0xff9b),
            ("KP_End", 0xff9c),
            ("KP_Begin", 0xff9d),
            ("KP_Insert", 0xff9e),
            ("KP_Delete", 0xff9f),
            ("KP_Multiply", 0xffaa),
            ("KP_Add", 0xffab),
            ("KP_Separator", 0xffac),
            ("KP_Subtract", 0xffad),
            ("KP_Decimal", 0xffae),
            ("KP_Divide", 0xffaf),
            ("KP_0", 0xffb0),
            ("KP_1", 0xffb1),
            ("KP_2", 0xffb2),
            ("KP_3", 0xffb3),
            ("KP_4", 0xffb4),
            ("KP_5", 0xffb5),
            ("KP_6", 0xffb6),
            ("KP_7", 0xffb7),
            ("KP_8", 0xffb8),
            ("KP_9", 0xffb9),
            ("KP_Equal", 0xffbd),
            // Function keys
            ("F1", 0xffbe),
            ("F2", 0xffbf),
            ("F3", 0xffc0),
            ("F4", 0xffc1),
            ("F5", 0xffc2),
            ("F6", 0xffc3),
            ("F7", 0xffc4),
            ("F8", 0xffc5),
            ("F9", 0xffc6),
            ("F10", 0xffc7),
            ("F11", 0xffc8),
            ("F12", 0xffc9),
            // Modifiers
            ("Shift_L", 0xffe1),
            ("Shift_R", 0xffe2),
            ("Control_L", 0xffe3),
            ("Control_R", 0xffe4),
            ("Caps_Lock", 0xffe5),
            ("Shift_Lock", 0xffe6),
            ("Meta_L", 0xffe7),
            ("Meta_R", 0xffe8),
            ("Alt_L", 0xffe9),
            ("Alt_R", 0xffea),
            ("Super_L", 0xffeb),
            ("Super_R", 0xffec),
            ("Hyper_L", 0xffed),
            ("Hyper_R", 0xffee),
            // Latin-9 additions
            ("EuroSign", 0x20ac),
            ("Ydiaeresis", 0x13be),
        ];

        // ASCII letters and digits are named after themselves
        const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
        const UPPER: [&str; 26] = [
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
            "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
        ];
        const LOWER: [&str; 26] = [
            "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q",
            "r", "s", "t", "u", "v", "w", "x", "y", "z",
        ];
        for (i, name) in DIGITS.iter().enumerate() {
            table.push((*name, 0x30 + i as u32));
        }
        for (i, name) in UPPER.iter().enumerate() {
            table.push((*name, 0x41 + i as u32));
        }
        for (i, name) in LOWER.iter().enumerate() {
            table.push((*name, 0x61 + i as u32));
        }
        table
    })
}

/// Name of a keysym, if it is in the table
pub fn keysym_name(sym: Keysym) -> Option<&'static str> {
    keysym_table()
        .iter()
        .find(|(_, value)| *value == sym.0)
        .map(|(name, _)| *name)
}

/// Parse a keysym name
///
/// Accepts table names, `U<hex>` Unicode names and `0x<hex>` literals.
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    if let Some((_, value)) = keysym_table().iter().find(|(n, _)| *n == name) {
        return Some(Keysym(*value));
    }

    if let Some(hex) = name.strip_prefix('U') {
        if !hex.is_empty() && hex.len() <= 6 {
            let cp = u32::from_str_radix(hex, 16).ok()?;
            if cp > 0x10ffff {
                return None;
            }
            // Latin-1 code points keep their legacy keysym values
            if (0x20..0x7f).contains(&cp) || (0xa0..=0xff).contains(&cp) {
                return Some(Keysym(cp));
            }
            return Some(Keysym(UNICODE_OFFSET + cp));
        }
    }

    if let Some(hex) = name.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).ok().map(Keysym);
    }

    None
}

/// Resolve a keysym name as written in a symbols list
///
/// `any` and `nosymbol` map to NoSymbol, `none` and `voidsymbol` to
/// VoidSymbol, all case-insensitive. Returns `None` for unknown names.
pub fn lookup_keysym(name: &str) -> Option<Keysym> {
    if name.eq_ignore_ascii_case("any") || name.eq_ignore_ascii_case("nosymbol") {
        return Some(NO_SYMBOL);
    }

    if name.eq_ignore_ascii_case("none") || name.eq_ignore_ascii_case("voidsymbol") {
        return Some(VOID_SYMBOL);
    }

    keysym_from_name(name).filter(|sym| *sym != NO_SYMBOL)
}

/// Character produced by a keysym, for case classification
pub fn keysym_to_char(sym: Keysym) -> Option<char> {
    let value = sym.0;
    match value {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(value),
        0x13be => Some('\u{0178}'),
        0x20ac => Some('\u{20ac}'),
        v if v >= UNICODE_OFFSET + 0x100 && v <= UNICODE_OFFSET + 0x10ffff => {
            char::from_u32(v - UNICODE_OFFSET)
        }
        _ => None,
    }
}

fn single_char(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(first)
}

/// True if the keysym is a lowercase letter with a distinct uppercase form
pub fn is_lower(sym: Keysym) -> bool {
    match keysym_to_char(sym) {
        Some(c) => c.is_lowercase() && single_char(c.to_uppercase()).is_some_and(|u| u != c),
        None => false,
    }
}

/// True if the keysym is an uppercase letter with a distinct lowercase form
pub fn is_upper(sym: Keysym) -> bool {
    match keysym_to_char(sym) {
        Some(c) => c.is_uppercase() && single_char(c.to_lowercase()).is_some_and(|l| l != c),
        None => false,
    }
}

/// True if the keysym lives on the keypad (KP_Space..=KP_Equal)
pub fn is_keypad(sym: Keysym) -> bool {
    (KP_SPACE..=KP_EQUAL).contains(&sym.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keysym_from_name() {
        assert_eq!(keysym_from_name("a"), Some(Keysym(0x61)));
        assert_eq!(keysym_from_name("A"), Some(Keysym(0x41)));
        assert_eq!(keysym_from_name("7"), Some(Keysym(0x37)));
        assert_eq!(keysym_from_name("Caps_Lock"), Some(Keysym(0xffe5)));
        assert_eq!(keysym_from_name("adiaeresis"), Some(Keysym(0xe4)));
        assert_eq!(keysym_from_name("NotAKeysym"), None);
    }

    #[test]
    fn test_keysym_unicode_and_hex_names() {
        assert_eq!(keysym_from_name("U20AC"), Some(Keysym(0x0100_20ac)));
        assert_eq!(keysym_from_name("U0041"), Some(Keysym(0x41)));
        assert_eq!(keysym_from_name("0xffe5"), Some(Keysym(0xffe5)));
    }

    #[test]
    fn test_lookup_keysym_special_names() {
        assert_eq!(lookup_keysym("any"), Some(NO_SYMBOL));
        assert_eq!(lookup_keysym("NoSymbol"), Some(NO_SYMBOL));
        assert_eq!(lookup_keysym("none"), Some(VOID_SYMBOL));
        assert_eq!(lookup_keysym("VoidSymbol"), Some(VOID_SYMBOL));
        assert_eq!(lookup_keysym("q"), Some(Keysym(0x71)));
        assert_eq!(lookup_keysym("bogus_name"), None);
    }

    #[test]
    fn test_keysym_display() {
        assert_eq!(Keysym(0x61).to_string(), "a");
        assert_eq!(Keysym(0xffe5).to_string(), "Caps_Lock");
        assert_eq!(Keysym(0x0123_4567).to_string(), "0x01234567");
    }

    #[test]
    fn test_case_classification() {
        assert!(is_lower(Keysym(0x61)));
        assert!(!is_upper(Keysym(0x61)));
        assert!(is_upper(Keysym(0x41)));
        assert!(is_lower(Keysym(0xe4)));
        assert!(is_upper(Keysym(0xc4)));
        assert!(!is_lower(Keysym(0x31)));
        // ssharp has no single-character uppercase form
        assert!(!is_lower(Keysym(0xdf)));
        assert!(is_lower(Keysym(0xff)));
        assert!(is_upper(Keysym(0x13be)));
    }

    #[test]
    fn test_keypad_classification() {
        assert!(is_keypad(Keysym(0xffb7)));
        assert!(is_keypad(Keysym(0xff80)));
        assert!(is_keypad(Keysym(0xffbd)));
        assert!(!is_keypad(Keysym(0xffbe)));
        assert!(!is_keypad(Keysym(0x37)));
    }

    #[test]
    fn test_keysym_from_str() {
        let sym: Keysym = "Return".parse().unwrap();
        assert_eq!(sym, Keysym(0xff0d));
        assert!("nope".parse::<Keysym>().is_err());
    }
}
