//! Language tokens of the Whisper v3 vocabulary.

use super::TokenId;
use crate::error::TokenError;
use std::fmt;
use std::str::FromStr;

macro_rules! languages {
    ($($variant:ident => ($id:literal, $code:literal, $name:literal),)*) => {
        /// Spoken language selector.
        ///
        /// [`Language::Auto`] is not a vocabulary entry: it carries no id and
        /// leaves the language position of the prompt to the model.
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub enum Language {
            #[default]
            Auto,
            $($variant,)*
        }

        impl Language {
            /// Every language with a vocabulary entry, `Auto` excluded.
            pub const ALL: &'static [Language] = &[$(Language::$variant,)*];

            pub const fn id(self) -> Option<TokenId> {
                match self {
                    Language::Auto => None,
                    $(Language::$variant => Some($id),)*
                }
            }

            /// ISO 639 code, e.g. `de`.
            pub const fn iso_code(self) -> &'static str {
                match self {
                    Language::Auto => "auto",
                    $(Language::$variant => $code,)*
                }
            }

            /// Lowercase English language name, e.g. `german`.
            pub const fn name(self) -> &'static str {
                match self {
                    Language::Auto => "automatic",
                    $(Language::$variant => $name,)*
                }
            }
        }
    };
}

languages! {
    Afrikaans => (50327, "af", "afrikaans"),
    Amharic => (50334, "am", "amharic"),
    Arabic => (50272, "ar", "arabic"),
    Assamese => (50350, "as", "assamese"),
    Azerbaijani => (50304, "az", "azerbaijani"),
    Bashkir => (50355, "ba", "bashkir"),
    Belarusian => (50330, "be", "belarusian"),
    Bulgarian => (50292, "bg", "bulgarian"),
    Bengali => (50302, "bn", "bengali"),
    Tibetan => (50347, "bo", "tibetan"),
    Breton => (50309, "br", "breton"),
    Bosnian => (50315, "bs", "bosnian"),
    Catalan => (50270, "ca", "catalan"),
    Czech => (50283, "cs", "czech"),
    Welsh => (50297, "cy", "welsh"),
    Danish => (50285, "da", "danish"),
    German => (50261, "de", "german"),
    Greek => (50281, "el", "greek"),
    English => (50259, "en", "english"),
    Spanish => (50262, "es", "spanish"),
    Estonian => (50307, "et", "estonian"),
    Basque => (50310, "eu", "basque"),
    Persian => (50300, "fa", "persian"),
    Finnish => (50277, "fi", "finnish"),
    Faroese => (50338, "fo", "faroese"),
    French => (50265, "fr", "french"),
    Galician => (50319, "gl", "galician"),
    Gujarati => (50333, "gu", "gujarati"),
    Hawaiian => (50352, "haw", "hawaiian"),
    Hausa => (50354, "ha", "hausa"),
    Hebrew => (50279, "he", "hebrew"),
    Hindi => (50276, "hi", "hindi"),
    Croatian => (50291, "hr", "croatian"),
    Haitian => (50339, "ht", "haitian"),
    Hungarian => (50286, "hu", "hungarian"),
    Armenian => (50312, "hy", "armenian"),
    Indonesian => (50275, "id", "indonesian"),
    Icelandic => (50311, "is", "icelandic"),
    Italian => (50274, "it", "italian"),
    Japanese => (50266, "ja", "japanese"),
    Javanese => (50356, "jw", "javanese"),
    Georgian => (50329, "ka", "georgian"),
    Kazakh => (50316, "kk", "kazakh"),
    Khmer => (50323, "km", "khmer"),
    Kannada => (50306, "kn", "kannada"),
    Korean => (50264, "ko", "korean"),
    Latin => (50294, "la", "latin"),
    Luxembourgish => (50345, "lb", "luxembourgish"),
    Lingala => (50353, "ln", "lingala"),
    Lao => (50336, "lo", "lao"),
    Lithuanian => (50293, "lt", "lithuanian"),
    Latvian => (50301, "lv", "latvian"),
    Malagasy => (50349, "mg", "malagasy"),
    Maori => (50295, "mi", "maori"),
    Macedonian => (50308, "mk", "macedonian"),
    Malayalam => (50296, "ml", "malayalam"),
    Mongolian => (50314, "mn", "mongolian"),
    Marathi => (50320, "mr", "marathi"),
    Malay => (50282, "ms", "malay"),
    Maltese => (50343, "mt", "maltese"),
    Myanmar => (50346, "my", "myanmar"),
    Nepali => (50313, "ne", "nepali"),
    Dutch => (50271, "nl", "dutch"),
    Nynorsk => (50342, "nn", "nynorsk"),
    Norwegian => (50288, "no", "norwegian"),
    Occitan => (50328, "oc", "occitan"),
    Punjabi => (50321, "pa", "punjabi"),
    Polish => (50269, "pl", "polish"),
    Pashto => (50340, "ps", "pashto"),
    Portuguese => (50267, "pt", "portuguese"),
    Romanian => (50284, "ro", "romanian"),
    Russian => (50263, "ru", "russian"),
    Sanskrit => (50344, "sa", "sanskrit"),
    Sindhi => (50332, "sd", "sindhi"),
    Sinhala => (50322, "si", "sinhala"),
    Slovak => (50298, "sk", "slovak"),
    Slovenian => (50305, "sl", "slovenian"),
    Shona => (50324, "sn", "shona"),
    Somali => (50326, "so", "somali"),
    Albanian => (50317, "sq", "albanian"),
    Serbian => (50303, "sr", "serbian"),
    Sundanese => (50357, "su", "sundanese"),
    Swedish => (50273, "sv", "swedish"),
    Swahili => (50318, "sw", "swahili"),
    Tamil => (50287, "ta", "tamil"),
    Telugu => (50299, "te", "telugu"),
    Tajik => (50331, "tg", "tajik"),
    Thai => (50289, "th", "thai"),
    Turkmen => (50341, "tk", "turkmen"),
    Tagalog => (50348, "tl", "tagalog"),
    Turkish => (50268, "tr", "turkish"),
    Tatar => (50351, "tt", "tatar"),
    Ukrainian => (50280, "uk", "ukrainian"),
    Urdu => (50290, "ur", "urdu"),
    Uzbek => (50337, "uz", "uzbek"),
    Vietnamese => (50278, "vi", "vietnamese"),
    Yiddish => (50335, "yi", "yiddish"),
    Yoruba => (50325, "yo", "yoruba"),
    Cantonese => (50358, "yue", "cantonese"),
    Chinese => (50260, "zh", "chinese"),
}

impl Language {
    /// Vocabulary symbol, e.g. `<|de|>`.
    pub fn symbol(self) -> Option<String> {
        self.id().map(|_| format!("<|{}|>", self.iso_code()))
    }

    /// Case-insensitive lookup by ISO 639 code.
    pub fn from_iso_code(code: &str) -> Option<Self> {
        Self::iter_with_auto().find(|language| language.iso_code().eq_ignore_ascii_case(code))
    }

    /// Case-insensitive lookup by language name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter_with_auto().find(|language| language.name().eq_ignore_ascii_case(name))
    }

    /// Look up a language by token id.
    pub fn from_id(id: TokenId) -> Option<Self> {
        Self::ALL.iter().copied().find(|language| language.id() == Some(id))
    }

    fn iter_with_auto() -> impl Iterator<Item = Language> {
        std::iter::once(Language::Auto).chain(Self::ALL.iter().copied())
    }
}

impl FromStr for Language {
    type Err = TokenError;

    /// Parse an ISO code or a language name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_iso_code(s)
            .or_else(|| Self::from_name(s))
            .ok_or_else(|| TokenError::UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iso_code())
    }
}
