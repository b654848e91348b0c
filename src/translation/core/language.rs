//! 语言解析
//!
//! 翻译服务并不可靠地支持自动检测，因此 "auto" 在发出请求前
//! 先按字符集与常见词做一次尽力而为的判断。

use crate::translation::config::constants::{AUTO_LANGUAGE, FALLBACK_SOURCE_LANG};

// 拉丁字母语言的高频且区分度较高的词
const LATIN_MARKERS: &[(&str, &[&str])] = &[
    (
        "es",
        &["hola", "gracias", "que", "por", "favor", "buenos", "estoy", "cómo", "está", "muy", "pero", "nosotros", "usted"],
    ),
    (
        "fr",
        &["bonjour", "merci", "je", "vous", "est", "avec", "pour", "nous", "très", "oui", "c'est", "salut"],
    ),
    (
        "de",
        &["hallo", "danke", "ich", "nicht", "und", "ist", "bitte", "wir", "sie", "auch", "guten"],
    ),
    (
        "pt",
        &["olá", "obrigado", "obrigada", "você", "não", "tudo", "bem", "com", "estou", "muito"],
    ),
    (
        "it",
        &["ciao", "grazie", "sono", "della", "questo", "perché", "molto", "buongiorno", "anche"],
    ),
];

/// 按字符集与常见词推断语言
pub fn detect_language(text: &str) -> Option<String> {
    if !text.chars().any(|c| c.is_alphabetic()) {
        return None;
    }

    let has_chinese = text.chars().any(|c| {
        ('\u{4E00}'..='\u{9FFF}').contains(&c) || // CJK Unified Ideographs
        ('\u{3400}'..='\u{4DBF}').contains(&c) // CJK Extension A
    });

    let has_japanese = text.chars().any(|c| {
        ('\u{3040}'..='\u{309F}').contains(&c) || // Hiragana
        ('\u{30A0}'..='\u{30FF}').contains(&c) // Katakana
    });

    let has_korean = text.chars().any(|c| ('\u{AC00}'..='\u{D7AF}').contains(&c));

    let has_arabic = text.chars().any(|c| {
        ('\u{0600}'..='\u{06FF}').contains(&c) || ('\u{0750}'..='\u{077F}').contains(&c)
    });

    let has_cyrillic = text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));
    let has_devanagari = text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c));

    let detected = if has_japanese {
        "ja"
    } else if has_chinese {
        "zh"
    } else if has_korean {
        "ko"
    } else if has_arabic {
        "ar"
    } else if has_cyrillic {
        "ru"
    } else if has_devanagari {
        "hi"
    } else {
        detect_latin(text)
    };

    Some(detected.to_string())
}

fn detect_latin(text: &str) -> &'static str {
    if text.chars().any(|c| matches!(c, 'ñ' | 'Ñ' | '¿' | '¡')) {
        return "es";
    }
    if text.chars().any(|c| matches!(c, 'ß' | 'ä' | 'ö' | 'Ä' | 'Ö')) {
        return "de";
    }
    if text.chars().any(|c| matches!(c, 'ã' | 'õ' | 'Ã' | 'Õ')) {
        return "pt";
    }

    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphabetic() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();

    let mut best = (FALLBACK_SOURCE_LANG, 0usize);
    for (code, markers) in LATIN_MARKERS {
        let score = words
            .iter()
            .filter(|w| markers.iter().any(|m| m == *w))
            .count();
        if score > best.1 {
            best = (*code, score);
        }
    }
    best.0
}

/// 解析源语言：具体代码原样返回，"auto" 解析为推断结果，推断失败退回英语
pub fn resolve_source_language(text: &str, source_language: &str) -> String {
    if source_language != AUTO_LANGUAGE {
        return source_language.to_string();
    }

    detect_language(text).unwrap_or_else(|| FALLBACK_SOURCE_LANG.to_string())
}

/// 语言代码对应的英文名称
pub fn language_name(code: &str) -> String {
    let name = match code {
        "auto" => "Auto-detect",
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "tr" => "Turkish",
        "pl" => "Polish",
        "nl" => "Dutch",
        other => return other.to_uppercase(),
    };
    name.to_string()
}
