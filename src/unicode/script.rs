//! Unicode script detection and run segmentation.

use crate::tag::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Common,
    Inherited,
    Latin,
    Greek,
    Cyrillic,
    Armenian,
    Hebrew,
    Arabic,
    Syriac,
    Thaana,
    Nko,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Sinhala,
    Thai,
    Lao,
    Tibetan,
    Myanmar,
    Georgian,
    Hangul,
    Ethiopic,
    Cherokee,
    CanadianAboriginal,
    Ogham,
    Runic,
    Khmer,
    Mongolian,
    Hiragana,
    Katakana,
    Bopomofo,
    Han,
    Yi,
}

impl Script {
    pub fn tag(self) -> Tag {
        let bytes: &[u8; 4] = match self {
            Script::Common | Script::Inherited => b"DFLT",
            Script::Latin => b"latn",
            Script::Greek => b"grek",
            Script::Cyrillic => b"cyrl",
            Script::Armenian => b"armn",
            Script::Hebrew => b"hebr",
            Script::Arabic => b"arab",
            Script::Syriac => b"syrc",
            Script::Thaana => b"thaa",
            Script::Nko => b"nko ",
            Script::Devanagari => b"deva",
            Script::Bengali => b"beng",
            Script::Gurmukhi => b"guru",
            Script::Gujarati => b"gujr",
            Script::Oriya => b"orya",
            Script::Tamil => b"taml",
            Script::Telugu => b"telu",
            Script::Kannada => b"knda",
            Script::Malayalam => b"mlym",
            Script::Sinhala => b"sinh",
            Script::Thai => b"thai",
            Script::Lao => b"lao ",
            Script::Tibetan => b"tibt",
            Script::Myanmar => b"mymr",
            Script::Georgian => b"geor",
            Script::Hangul => b"hang",
            Script::Ethiopic => b"ethi",
            Script::Cherokee => b"cher",
            Script::CanadianAboriginal => b"cans",
            Script::Ogham => b"ogam",
            Script::Runic => b"runr",
            Script::Khmer => b"khmr",
            Script::Mongolian => b"mong",
            Script::Hiragana => b"hira",
            Script::Katakana => b"kana",
            Script::Bopomofo => b"bopo",
            Script::Han => b"hani",
            Script::Yi => b"yiii",
        };
        Tag::new(*bytes)
    }

    pub fn of(c: char) -> Self {
        let code = c as u32;
        match code {
            0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x00FF | 0x0100..=0x024F
            | 0x1E00..=0x1EFF | 0x2C60..=0x2C7F | 0xA720..=0xA7FF | 0xAB30..=0xAB6F => Script::Latin,
            0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
            0x0400..=0x04FF | 0x0500..=0x052F | 0x2DE0..=0x2DFF | 0xA640..=0xA69F => Script::Cyrillic,
            0x0530..=0x058F | 0xFB00..=0xFB17 => Script::Armenian,
            0x0590..=0x05FF | 0xFB1D..=0xFB4F => Script::Hebrew,
            0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Script::Arabic,
            0x0700..=0x074F | 0x0860..=0x086F => Script::Syriac,
            0x0780..=0x07BF => Script::Thaana,
            0x07C0..=0x07FF => Script::Nko,
            0x0900..=0x097F | 0xA8E0..=0xA8FF => Script::Devanagari,
            0x0980..=0x09FF => Script::Bengali,
            0x0A00..=0x0A7F => Script::Gurmukhi,
            0x0A80..=0x0AFF => Script::Gujarati,
            0x0B00..=0x0B7F => Script::Oriya,
            0x0B80..=0x0BFF => Script::Tamil,
            0x0C00..=0x0C7F => Script::Telugu,
            0x0C80..=0x0CFF => Script::Kannada,
            0x0D00..=0x0D7F => Script::Malayalam,
            0x0D80..=0x0DFF => Script::Sinhala,
            0x0E00..=0x0E7F => Script::Thai,
            0x0E80..=0x0EFF => Script::Lao,
            0x0F00..=0x0FFF => Script::Tibetan,
            0x1000..=0x109F | 0xAA60..=0xAA7F => Script::Myanmar,
            0x10A0..=0x10FF | 0x2D00..=0x2D2F => Script::Georgian,
            0x1100..=0x11FF | 0xAC00..=0xD7AF | 0x3130..=0x318F | 0xA960..=0xA97F | 0xD7B0..=0xD7FF => Script::Hangul,
            0x1200..=0x137F | 0x1380..=0x139F | 0x2D80..=0x2DDF | 0xAB00..=0xAB2F => Script::Ethiopic,
            0x13A0..=0x13FF | 0xAB70..=0xABBF => Script::Cherokee,
            0x1400..=0x167F | 0x18B0..=0x18FF => Script::CanadianAboriginal,
            0x1680..=0x169F => Script::Ogham,
            0x16A0..=0x16FF => Script::Runic,
            0x1780..=0x17FF | 0x19E0..=0x19FF => Script::Khmer,
            0x1800..=0x18AF => Script::Mongolian,
            0x3040..=0x309F | 0x1B000..=0x1B0FF => Script::Hiragana,
            0x30A0..=0x30FF | 0x31F0..=0x31FF | 0xFF65..=0xFF9F => Script::Katakana,
            0x3100..=0x312F | 0x31A0..=0x31BF => Script::Bopomofo,
            0x2E80..=0x2EFF | 0x2F00..=0x2FDF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF
            | 0x20000..=0x2A6DF | 0x2A700..=0x2B73F | 0x2B740..=0x2B81F | 0x2B820..=0x2CEAF
            | 0x2CEB0..=0x2EBEF | 0x2F800..=0x2FA1F => Script::Han,
            0xA000..=0xA48F | 0xA490..=0xA4CF => Script::Yi,
            0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE00..=0xFE0F | 0xFE20..=0xFE2F => {
                Script::Inherited
            }
            _ => Script::Common,
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Script::Arabic | Script::Hebrew | Script::Syriac | Script::Thaana | Script::Nko)
    }

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            Script::Arabic
                | Script::Hebrew
                | Script::Syriac
                | Script::Thaana
                | Script::Nko
                | Script::Devanagari
                | Script::Bengali
                | Script::Gurmukhi
                | Script::Gujarati
                | Script::Oriya
                | Script::Tamil
                | Script::Telugu
                | Script::Kannada
                | Script::Malayalam
                | Script::Sinhala
                | Script::Thai
                | Script::Lao
                | Script::Tibetan
                | Script::Myanmar
                | Script::Khmer
                | Script::Hangul
        )
    }
}

impl Default for Script {
    fn default() -> Self {
        Script::Common
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScriptRun {
    pub start: usize,
    pub end: usize,
    pub script: Script,
}

/// Segments `text` into runs of a single resolved script. `Common`/`Inherited`
/// codepoints (punctuation, combining marks) join whichever real script run
/// surrounds them.
pub fn itemize(text: &str) -> Vec<ScriptRun> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut runs = Vec::new();
    let mut chars = text.char_indices().peekable();

    let mut current_script = Script::Common;
    let mut run_start = 0;
    let mut last_real_script = Script::Common;

    while let Some((byte_offset, c)) = chars.next() {
        let char_script = Script::of(c);

        let resolved_script = match char_script {
            Script::Common | Script::Inherited => {
                if last_real_script != Script::Common {
                    last_real_script
                } else {
                    let mut lookahead = chars.clone();
                    let mut found = Script::Common;
                    while let Some((_, ahead_c)) = lookahead.next() {
                        let ahead_script = Script::of(ahead_c);
                        if ahead_script != Script::Common && ahead_script != Script::Inherited {
                            found = ahead_script;
                            break;
                        }
                    }
                    found
                }
            }
            _ => {
                last_real_script = char_script;
                char_script
            }
        };

        if resolved_script != current_script && current_script != Script::Common {
            runs.push(ScriptRun { start: run_start, end: byte_offset, script: current_script });
            run_start = byte_offset;
        }

        current_script = resolved_script;
    }

    runs.push(ScriptRun { start: run_start, end: text.len(), script: current_script });
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_latin_and_arabic() {
        assert_eq!(Script::of('A'), Script::Latin);
        assert_eq!(Script::of('ا'), Script::Arabic);
        assert_eq!(Script::of('中'), Script::Han);
    }

    #[test]
    fn itemize_splits_on_script_change() {
        let runs = itemize("Hello مرحبا");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].script, Script::Latin);
        assert_eq!(runs[1].script, Script::Arabic);
    }

    #[test]
    fn itemize_pure_run_is_single_span() {
        let runs = itemize("Hello World");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, 0);
        assert_eq!(runs[0].end, "Hello World".len());
    }

    #[test]
    fn script_tag_round_trips_to_opentype() {
        assert_eq!(Script::Arabic.tag(), Tag::ARAB);
        assert_eq!(Script::Latin.tag(), Tag::LATN);
    }
}
