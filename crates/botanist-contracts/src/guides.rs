use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[serde(rename = "Dễ")]
    De,
    #[serde(rename = "Trung bình")]
    TrungBinh,
    #[serde(rename = "Khó")]
    Kho,
}

impl Difficulty {
    pub const VOCABULARY: [&'static str; 6] = ["Easy", "Medium", "Hard", "Dễ", "Trung bình", "Khó"];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::De => "Dễ",
            Difficulty::TrungBinh => "Trung bình",
            Difficulty::Kho => "Khó",
        }
    }
}

/// Recipe fetched on demand for one dish made from an identified plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub prep_time: String,
    pub cook_time: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub servings: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// Step-by-step arrangement guide for one decoration style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecorationGuide {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub tools_materials: Vec<String>,
    pub steps: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}
