use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of display and reply languages.
///
/// The same code drives UI text selection and the language the service is
/// instructed to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    Vi,
    En,
    Fr,
    Ja,
    Zh,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 5] = [
        LanguageCode::Vi,
        LanguageCode::En,
        LanguageCode::Fr,
        LanguageCode::Ja,
        LanguageCode::Zh,
    ];

    pub fn code(self) -> &'static str {
        match self {
            LanguageCode::Vi => "vi",
            LanguageCode::En => "en",
            LanguageCode::Fr => "fr",
            LanguageCode::Ja => "ja",
            LanguageCode::Zh => "zh",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LanguageCode::Vi => "Tiếng Việt",
            LanguageCode::En => "English",
            LanguageCode::Fr => "Français",
            LanguageCode::Ja => "日本語",
            LanguageCode::Zh => "中文",
        }
    }

    /// Generic message shown when a whole analysis batch fails.
    pub fn analysis_error_message(self) -> &'static str {
        match self {
            LanguageCode::Vi => {
                "Không thể phân tích. Vui lòng kiểm tra kết nối mạng hoặc thử lại."
            }
            LanguageCode::En => {
                "Failed to analyze. Please check your internet connection or try again."
            }
            LanguageCode::Fr => "Échec de l'analyse. Veuillez vérifier votre connexion Internet.",
            LanguageCode::Ja => "分析に失敗しました。インターネット接続を確認してください。",
            LanguageCode::Zh => "无法分析。请检查您的互联网连接。",
        }
    }

    /// Opening line of a consultation, addressed about `plant_name`.
    pub fn consultation_welcome(self, plant_name: &str) -> String {
        match self {
            LanguageCode::Vi => format!(
                "Xin chào! Tôi là trợ lý AI. Tôi có thể giúp gì cho cây {plant_name} của bạn?"
            ),
            LanguageCode::En => {
                format!("Hello! I'm your AI assistant. How can I help with your {plant_name}?")
            }
            LanguageCode::Fr => format!(
                "Bonjour! Je suis votre assistant IA. Comment puis-je aider avec votre {plant_name}?"
            ),
            LanguageCode::Ja => {
                format!("こんにちは！AIアシスタントです。{plant_name}についてどうお手伝いできますか？")
            }
            LanguageCode::Zh => format!("你好！我是AI助手。我能为您{plant_name}做什么？"),
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        LanguageCode::ALL
            .into_iter()
            .find(|language| language.code() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unsupported language '{}'; expected one of {}.",
                    raw.trim(),
                    LanguageCode::ALL
                        .iter()
                        .map(|language| language.code())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}
