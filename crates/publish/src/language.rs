//! Canonical language metadata, looked up by language id.

use crate::error::{ErrorKind, Result};
use std::collections::HashMap;
use std::sync::LazyLock;
use studio_export::LanguageRecord;

/// `(id, native name, direction)`
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("aa", "Afaraf", "ltr"),
    ("ab", "аҧсуа бызшәа", "ltr"),
    ("ae", "avesta", "ltr"),
    ("af", "Afrikaans", "ltr"),
    ("ak", "Akan", "ltr"),
    ("am", "አማርኛ", "ltr"),
    ("an", "aragonés", "ltr"),
    ("ar", "العربية", "rtl"),
    ("as", "অসমীয়া", "ltr"),
    ("av", "авар мацӀ", "ltr"),
    ("ay", "aymar aru", "ltr"),
    ("az", "azərbaycan dili", "ltr"),
    ("ba", "башҡорт теле", "ltr"),
    ("be", "беларуская мова", "ltr"),
    ("bg", "български език", "ltr"),
    ("bh", "भोजपुरी", "ltr"),
    ("bi", "Bislama", "ltr"),
    ("bm", "bamanankan", "ltr"),
    ("bn", "বাংলা", "ltr"),
    ("bo", "བོད་ཡིག", "ltr"),
    ("br", "brezhoneg", "ltr"),
    ("bs", "bosanski jezik", "ltr"),
    ("ca", "català", "ltr"),
    ("ce", "нохчийн мотт", "ltr"),
    ("ch", "Chamoru", "ltr"),
    ("co", "corsu", "ltr"),
    ("cr", "ᓀᐦᐃᔭᐍᐏᐣ", "ltr"),
    ("cs", "čeština", "ltr"),
    ("cu", "ѩзыкъ словѣньскъ", "ltr"),
    ("cv", "чӑваш чӗлхи", "ltr"),
    ("cy", "Cymraeg", "ltr"),
    ("da", "dansk", "ltr"),
    ("de", "Deutsch", "ltr"),
    ("dv", "ދިވެހި", "rtl"),
    ("dz", "རྫོང་ཁ", "ltr"),
    ("ee", "Eʋegbe", "ltr"),
    ("el", "Ελληνικά", "ltr"),
    ("en", "English", "ltr"),
    ("en-GB", "English, Britain", "ltr"),
    ("en-US", "English, United States", "ltr"),
    ("eo", "Esperanto", "ltr"),
    ("es", "Español", "ltr"),
    ("es-419", "Español (América Latina)", "ltr"),
    ("es-ES", "Español (España)", "ltr"),
    ("es-MX", "Español (México)", "ltr"),
    ("et", "eesti", "ltr"),
    ("eu", "euskara", "ltr"),
    ("fa", "فارسی", "rtl"),
    ("ff", "Fulfulde", "ltr"),
    ("fi", "suomi", "ltr"),
    ("fj", "vosa Vakaviti", "ltr"),
    ("fo", "føroyskt", "ltr"),
    ("fr", "Français", "ltr"),
    ("fr-CA", "Français (Canada)", "ltr"),
    ("fy", "Frysk", "ltr"),
    ("ga", "Gaeilge", "ltr"),
    ("gd", "Gàidhlig", "ltr"),
    ("gl", "galego", "ltr"),
    ("gn", "Avañe'ẽ", "ltr"),
    ("gu", "ગુજરાતી", "ltr"),
    ("gv", "Gaelg", "ltr"),
    ("ha", "Hausa", "ltr"),
    ("he", "עברית", "rtl"),
    ("hi", "हिन्दी", "ltr"),
    ("ho", "Hiri Motu", "ltr"),
    ("hr", "hrvatski jezik", "ltr"),
    ("ht", "Kreyòl ayisyen", "ltr"),
    ("hu", "magyar", "ltr"),
    ("hy", "Հայերեն", "ltr"),
    ("hz", "Otjiherero", "ltr"),
    ("ia", "Interlingua", "ltr"),
    ("id", "Bahasa Indonesia", "ltr"),
    ("ie", "Interlingue", "ltr"),
    ("ig", "Asụsụ Igbo", "ltr"),
    ("ii", "ꆈꌠ꒿ Nuosuhxop", "ltr"),
    ("ik", "Iñupiaq", "ltr"),
    ("io", "Ido", "ltr"),
    ("is", "Íslenska", "ltr"),
    ("it", "Italiano", "ltr"),
    ("iu", "ᐃᓄᒃᑎᑐᑦ", "ltr"),
    ("ja", "日本語", "ltr"),
    ("jv", "basa Jawa", "ltr"),
    ("ka", "ქართული", "ltr"),
    ("kg", "Kikongo", "ltr"),
    ("ki", "Gĩkũyũ", "ltr"),
    ("kj", "Kuanyama", "ltr"),
    ("kk", "қазақ тілі", "ltr"),
    ("kl", "kalaallisut", "ltr"),
    ("km", "ភាសាខ្មែរ", "ltr"),
    ("kn", "ಕನ್ನಡ", "ltr"),
    ("ko", "한국어", "ltr"),
    ("kr", "Kanuri", "ltr"),
    ("ks", "कश्मीरी", "ltr"),
    ("ku", "Kurdî", "ltr"),
    ("kv", "коми кыв", "ltr"),
    ("kw", "Kernewek", "ltr"),
    ("ky", "Кыргызча", "ltr"),
    ("la", "latine", "ltr"),
    ("lb", "Lëtzebuergesch", "ltr"),
    ("lg", "Luganda", "ltr"),
    ("li", "Limburgs", "ltr"),
    ("ln", "Lingála", "ltr"),
    ("lo", "ພາສາລາວ", "ltr"),
    ("lt", "lietuvių kalba", "ltr"),
    ("lu", "Tshiluba", "ltr"),
    ("lv", "latviešu valoda", "ltr"),
    ("mg", "fiteny malagasy", "ltr"),
    ("mh", "Kajin M̧ajeļ", "ltr"),
    ("mi", "te reo Māori", "ltr"),
    ("mk", "македонски јазик", "ltr"),
    ("ml", "മലയാളം", "ltr"),
    ("mn", "Монгол хэл", "ltr"),
    ("mr", "मराठी", "ltr"),
    ("ms", "bahasa Melayu", "ltr"),
    ("mt", "Malti", "ltr"),
    ("my", "ဗမာစာ", "ltr"),
    ("na", "Dorerin Naoero", "ltr"),
    ("nb", "Norsk bokmål", "ltr"),
    ("nd", "isiNdebele", "ltr"),
    ("ne", "नेपाली", "ltr"),
    ("ng", "Owambo", "ltr"),
    ("nl", "Nederlands", "ltr"),
    ("nn", "Norsk nynorsk", "ltr"),
    ("no", "Norsk", "ltr"),
    ("nr", "isiNdebele", "ltr"),
    ("nv", "Diné bizaad", "ltr"),
    ("ny", "Chichewa", "ltr"),
    ("oc", "occitan", "ltr"),
    ("oj", "ᐊᓂᔑᓈᐯᒧᐎᓐ", "ltr"),
    ("om", "Afaan Oromoo", "ltr"),
    ("or", "ଓଡ଼ିଆ", "ltr"),
    ("os", "ирон æвзаг", "ltr"),
    ("pa", "ਪੰਜਾਬੀ", "ltr"),
    ("pi", "पाऴि", "ltr"),
    ("pl", "Polski", "ltr"),
    ("ps", "پښتو", "rtl"),
    ("pt", "Português", "ltr"),
    ("pt-BR", "Português (Brasil)", "ltr"),
    ("pt-PT", "Português (Portugal)", "ltr"),
    ("qu", "Runa Simi", "ltr"),
    ("rm", "rumantsch grischun", "ltr"),
    ("rn", "Ikirundi", "ltr"),
    ("ro", "Română", "ltr"),
    ("ru", "Русский", "ltr"),
    ("rw", "Ikinyarwanda", "ltr"),
    ("sa", "संस्कृतम्", "ltr"),
    ("sc", "sardu", "ltr"),
    ("sd", "سنڌي", "rtl"),
    ("se", "Davvisámegiella", "ltr"),
    ("sg", "yângâ tî sängö", "ltr"),
    ("si", "සිංහල", "ltr"),
    ("sk", "slovenčina", "ltr"),
    ("sl", "slovenščina", "ltr"),
    ("sm", "gagana fa'a Samoa", "ltr"),
    ("sn", "chiShona", "ltr"),
    ("so", "Soomaaliga", "ltr"),
    ("sq", "Shqip", "ltr"),
    ("sr", "српски језик", "ltr"),
    ("ss", "SiSwati", "ltr"),
    ("st", "Sesotho", "ltr"),
    ("su", "Basa Sunda", "ltr"),
    ("sv", "Svenska", "ltr"),
    ("sw", "Kiswahili", "ltr"),
    ("ta", "தமிழ்", "ltr"),
    ("te", "తెలుగు", "ltr"),
    ("tg", "тоҷикӣ", "ltr"),
    ("th", "ไทย", "ltr"),
    ("ti", "ትግርኛ", "ltr"),
    ("tk", "Türkmen", "ltr"),
    ("tl", "Wikang Tagalog", "ltr"),
    ("tn", "Setswana", "ltr"),
    ("to", "faka Tonga", "ltr"),
    ("tr", "Türkçe", "ltr"),
    ("ts", "Xitsonga", "ltr"),
    ("tt", "татар теле", "ltr"),
    ("tw", "Twi", "ltr"),
    ("ty", "Reo Tahiti", "ltr"),
    ("ug", "ئۇيغۇرچە", "rtl"),
    ("uk", "Українська", "ltr"),
    ("ur", "اردو", "rtl"),
    ("uz", "Oʻzbek", "ltr"),
    ("ve", "Tshivenḓa", "ltr"),
    ("vi", "Tiếng Việt", "ltr"),
    ("vo", "Volapük", "ltr"),
    ("wa", "walon", "ltr"),
    ("wo", "Wollof", "ltr"),
    ("xh", "isiXhosa", "ltr"),
    ("yi", "ייִדיש", "rtl"),
    ("yo", "Yorùbá", "ltr"),
    ("za", "Saɯ cueŋƅ", "ltr"),
    ("zh", "中文", "ltr"),
    ("zh-CN", "中文(中国)", "ltr"),
    ("zh-Hans", "中文(简体)", "ltr"),
    ("zh-Hant", "中文(繁體)", "ltr"),
    ("zh-TW", "中文(台灣)", "ltr"),
    ("zu", "isiZulu", "ltr"),
    ("zul", "isiZulu", "ltr"),
];

static TABLE: LazyLock<HashMap<&'static str, (&'static str, &'static str)>> =
    LazyLock::new(|| LANGUAGES.iter().map(|(id, name, direction)| (*id, (*name, *direction))).collect());

/// Resolve a language id such as `pt-BR` into its export record.
///
/// A regional id missing from the table (`nl-BE`) takes the name and
/// direction of its base language.
pub fn lookup(id: &str) -> Result<LanguageRecord> {
    let (code, subcode) = match id.split_once('-') {
        Some((code, subcode)) => (code, Some(subcode.to_string())),
        None => (id, None),
    };
    let Some((name, direction)) = TABLE.get(id).or_else(|| subcode.as_ref().and_then(|_| TABLE.get(code))) else {
        exn::bail!(ErrorKind::UnknownLanguage(id.to_string()));
    };
    Ok(LanguageRecord {
        id: id.to_string(),
        code: code.to_string(),
        subcode,
        name: name.to_string(),
        direction: direction.to_string(),
    })
}
