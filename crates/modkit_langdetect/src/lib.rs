//! modkit_langdetect
//!
//! Language detection. Always returns a value: inputs
//! shorter than 10 characters, or detector failure, fall back to
//! `{"en", 0.0}`.

const MIN_LENGTH: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO-639-1 lowercase code.
    pub language: String,
    pub confidence: f64,
}

impl Detection {
    fn fallback() -> Self {
        Self {
            language: "en".to_string(),
            confidence: 0.0,
        }
    }
}

pub fn detect(text: &str) -> Detection {
    if text.chars().count() < MIN_LENGTH {
        return Detection::fallback();
    }

    match whatlang::detect(text) {
        Some(info) => Detection {
            language: iso_639_1(info.lang()).to_string(),
            confidence: info.confidence(),
        },
        None => Detection::fallback(),
    }
}

/// `whatlang::Lang::code()` returns ISO 639-3 (e.g. `"eng"`); every caller
/// of this crate expects ISO 639-1. Falls back to the 639-3 code for any
/// language this table hasn't been extended to cover.
fn iso_639_1(lang: whatlang::Lang) -> &'static str {
    use whatlang::Lang;
    match lang {
        Lang::Epo => "eo",
        Lang::Eng => "en",
        Lang::Rus => "ru",
        Lang::Cmn => "zh",
        Lang::Spa => "es",
        Lang::Por => "pt",
        Lang::Ita => "it",
        Lang::Ben => "bn",
        Lang::Fra => "fr",
        Lang::Deu => "de",
        Lang::Ukr => "uk",
        Lang::Kat => "ka",
        Lang::Ara => "ar",
        Lang::Hin => "hi",
        Lang::Jpn => "ja",
        Lang::Heb => "he",
        Lang::Yid => "yi",
        Lang::Pol => "pl",
        Lang::Amh => "am",
        Lang::Jav => "jv",
        Lang::Kor => "ko",
        Lang::Nob => "nb",
        Lang::Dan => "da",
        Lang::Swe => "sv",
        Lang::Fin => "fi",
        Lang::Tur => "tr",
        Lang::Nld => "nl",
        Lang::Hun => "hu",
        Lang::Ces => "cs",
        Lang::Ell => "el",
        Lang::Bul => "bg",
        Lang::Bel => "be",
        Lang::Mar => "mr",
        Lang::Kan => "kn",
        Lang::Ron => "ro",
        Lang::Slv => "sl",
        Lang::Hrv => "hr",
        Lang::Srp => "sr",
        Lang::Mkd => "mk",
        Lang::Lit => "lt",
        Lang::Lav => "lv",
        Lang::Est => "et",
        Lang::Tam => "ta",
        Lang::Vie => "vi",
        Lang::Urd => "ur",
        Lang::Tha => "th",
        Lang::Guj => "gu",
        Lang::Uzb => "uz",
        Lang::Pan => "pa",
        Lang::Aze => "az",
        Lang::Ind => "id",
        Lang::Tel => "te",
        Lang::Pes => "fa",
        Lang::Mal => "ml",
        Lang::Ori => "or",
        Lang::Mya => "my",
        Lang::Nep => "ne",
        Lang::Sin => "si",
        Lang::Khm => "km",
        Lang::Tuk => "tk",
        Lang::Aka => "ak",
        Lang::Zul => "zu",
        Lang::Sna => "sn",
        Lang::Afr => "af",
        Lang::Lat => "la",
        Lang::Slk => "sk",
        Lang::Cat => "ca",
        Lang::Tgl => "tl",
        Lang::Hye => "hy",
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_falls_back_to_english() {
        let d = detect("hi");
        assert_eq!(d.language, "en");
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn exactly_nine_chars_still_falls_back() {
        let d = detect("123456789");
        assert_eq!(d.language, "en");
    }

    #[test]
    fn longer_english_text_detects_english() {
        let d = detect("This is a reasonably long piece of English text for detection.");
        assert_eq!(d.language, "en");
        assert!(d.confidence > 0.0);
    }

    #[test]
    fn iso_639_1_maps_three_letter_codes_to_two_letter() {
        assert_eq!(iso_639_1(whatlang::Lang::Eng), "en");
        assert_eq!(iso_639_1(whatlang::Lang::Fra), "fr");
        assert_eq!(iso_639_1(whatlang::Lang::Cmn), "zh");
    }
}
