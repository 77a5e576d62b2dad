// src/translate.rs
//! Place-name translation for Japanese feed locations.
//!
//! Feeds report hypocenter names in Japanese. The translator substitutes known
//! prefecture and geographic terms for the target language and leaves anything
//! unknown untouched, so the result is always displayable.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ja,
    Zh,
    En,
}

impl Lang {
    /// Parses a language code (`ja`, `zh`, `en`, case-insensitive, region suffix ignored).
    pub fn parse(code: &str) -> Option<Self> {
        let base = code.trim().split(['-', '_']).next().unwrap_or_default();
        match base.to_ascii_lowercase().as_str() {
            "ja" => Some(Lang::Ja),
            "zh" => Some(Lang::Zh),
            "en" => Some(Lang::En),
            _ => None,
        }
    }
}

// (japanese, chinese, english). Order matters: longer compounds precede their parts.
const TERMS: &[(&str, &str, &str)] = &[
    ("東京", "东京", "Tokyo"),
    ("大阪", "大阪", "Osaka"),
    ("京都", "京都", "Kyoto"),
    ("福岡", "福冈", "Fukuoka"),
    ("札幌", "札幌", "Sapporo"),
    ("仙台", "仙台", "Sendai"),
    ("名古屋", "名古屋", "Nagoya"),
    ("広島", "广岛", "Hiroshima"),
    ("神戸", "神户", "Kobe"),
    ("横浜", "横滨", "Yokohama"),
    ("千葉", "千叶", "Chiba"),
    ("埼玉", "埼玉", "Saitama"),
    ("茨城", "茨城", "Ibaraki"),
    ("栃木", "栃木", "Tochigi"),
    ("群馬", "群马", "Gunma"),
    ("山梨", "山梨", "Yamanashi"),
    ("新潟", "新潟", "Niigata"),
    ("富山", "富山", "Toyama"),
    ("石川", "石川", "Ishikawa"),
    ("福井", "福井", "Fukui"),
    ("山形", "山形", "Yamagata"),
    ("宮城", "宫城", "Miyagi"),
    ("青森", "青森", "Aomori"),
    ("岩手", "岩手", "Iwate"),
    ("秋田", "秋田", "Akita"),
    ("福島", "福岛", "Fukushima"),
    ("長野", "长野", "Nagano"),
    ("岐阜", "岐阜", "Gifu"),
    ("静岡", "静冈", "Shizuoka"),
    ("愛知", "爱知", "Aichi"),
    ("三重", "三重", "Mie"),
    ("滋賀", "滋贺", "Shiga"),
    ("兵庫", "兵库", "Hyogo"),
    ("奈良", "奈良", "Nara"),
    ("和歌山", "和歌山", "Wakayama"),
    ("鳥取", "鸟取", "Tottori"),
    ("島根", "岛根", "Shimane"),
    ("岡山", "冈山", "Okayama"),
    ("山口", "山口", "Yamaguchi"),
    ("徳島", "德岛", "Tokushima"),
    ("香川", "香川", "Kagawa"),
    ("愛媛", "爱媛", "Ehime"),
    ("高知", "高知", "Kochi"),
    ("佐賀", "佐贺", "Saga"),
    ("長崎", "长崎", "Nagasaki"),
    ("熊本", "熊本", "Kumamoto"),
    ("大分", "大分", "Oita"),
    ("宮崎", "宫崎", "Miyazaki"),
    ("鹿児島", "鹿儿岛", "Kagoshima"),
    ("沖縄", "冲绳", "Okinawa"),
    ("北海道", "北海道", "Hokkaido"),
    ("東方", "东方", "East"),
    ("西方", "西方", "West"),
    ("南方", "南方", "South"),
    ("北方", "北方", "North"),
    ("沿岸", "沿岸", "Coast"),
    ("近海", "近海", "Nearshore"),
    ("遠方", "远方", "Distant"),
    ("地方", "地方", "Region"),
    ("半島", "半岛", "Peninsula"),
    ("付近", "附近", "Vicinity"),
    ("沖", "冲", "Offshore"),
    ("県", "县", "Prefecture"),
    ("市", "市", "City"),
    ("町", "町", "Town"),
    ("村", "村", "Village"),
    ("島", "岛", "Island"),
];

/// Pure `original -> translated` mapping for one target language.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationTranslator {
    lang: Lang,
}

impl LocationTranslator {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    pub fn translate(&self, original: &str) -> String {
        if self.lang == Lang::Ja {
            return original.to_string();
        }
        let mut out = original.to_string();
        for (ja, zh, en) in TERMS {
            if out.contains(ja) {
                let target = match self.lang {
                    Lang::Zh => zh,
                    Lang::En => en,
                    Lang::Ja => ja,
                };
                out = out.replacen(ja, target, 1);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn japanese_target_is_identity() {
        let t = LocationTranslator::new(Lang::Ja);
        assert_eq!(t.translate("石川県能登地方"), "石川県能登地方");
    }

    #[test]
    fn chinese_replaces_known_terms() {
        let t = LocationTranslator::new(Lang::Zh);
        assert_eq!(t.translate("福島県沖"), "福岛县冲");
    }

    #[test]
    fn english_keeps_unknown_fragments() {
        let t = LocationTranslator::new(Lang::En);
        assert_eq!(t.translate("能登半島沖"), "能登PeninsulaOffshore");
        assert_eq!(t.translate("Somewhere"), "Somewhere");
    }

    #[test]
    fn lang_codes_parse_loosely() {
        assert_eq!(Lang::parse("EN-us"), Some(Lang::En));
        assert_eq!(Lang::parse("zh_CN"), Some(Lang::Zh));
        assert_eq!(Lang::parse("fr"), None);
    }
}
