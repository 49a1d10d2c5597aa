use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// One analysis response, either for a single photo or merged across a batch.
///
/// `plant_count` is reported by the service and is not guaranteed to equal
/// `plants.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub language: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub plant_count: u64,
    pub plants: Vec<Plant>,
    pub warnings: Vec<String>,
}

impl AnalysisResult {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    pub name: String,
    pub confidence: String,
    pub scientific_name: String,
    #[serde(default)]
    pub other_possible_species: Vec<String>,
    pub is_poisonous: bool,
    #[serde(default)]
    pub poison_details: String,
    #[serde(default)]
    pub detected_diseases: Vec<Disease>,
    pub plant_information: PlantInformation,
}

impl Plant {
    pub fn life_cycle(&self) -> &[LifeCycleStage] {
        &self.plant_information.life_cycle
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    pub disease_name: String,
    pub confidence: String,
    pub symptoms: Vec<String>,
    pub root_cause: String,
    pub severity: Severity,
    pub treatment: Vec<String>,
    pub prevention: Vec<String>,
}

/// Severity vocabulary accepted from the service: Vietnamese and English
/// spellings of the same three levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "nhẹ")]
    Nhe,
    #[serde(rename = "trung bình")]
    TrungBinh,
    #[serde(rename = "nặng")]
    Nang,
    #[serde(rename = "light")]
    Light,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "severe")]
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityLevel {
    Light,
    Medium,
    Severe,
}

impl Severity {
    pub const VOCABULARY: [&'static str; 6] =
        ["nhẹ", "trung bình", "nặng", "light", "medium", "severe"];

    pub fn level(self) -> SeverityLevel {
        match self {
            Severity::Nhe | Severity::Light => SeverityLevel::Light,
            Severity::TrungBinh | Severity::Medium => SeverityLevel::Medium,
            Severity::Nang | Severity::Severe => SeverityLevel::Severe,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Nhe => "nhẹ",
            Severity::TrungBinh => "trung bình",
            Severity::Nang => "nặng",
            Severity::Light => "light",
            Severity::Medium => "medium",
            Severity::Severe => "severe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantInformation {
    pub description: String,
    pub common_uses: CommonUses,
    pub care_profile: CareProfile,
    pub life_cycle: Vec<LifeCycleStage>,
    pub market_info: MarketInfo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommonUses {
    #[serde(default)]
    pub medical: Vec<String>,
    #[serde(default)]
    pub cooking: Vec<String>,
    #[serde(default)]
    pub decoration: Vec<String>,
    #[serde(default)]
    pub other: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareProfile {
    pub water: String,
    pub light: String,
    pub soil: String,
    pub temperature: String,
    pub fertilizer: String,
    pub pruning: String,
    pub environmental_info: EnvironmentalInfo,
}

/// Numeric growing ranges: temperatures in Celsius, humidity in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalInfo {
    pub min_temp: f64,
    pub max_temp: f64,
    pub min_humidity: f64,
    pub max_humidity: f64,
    pub seasonal_advice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeCycleStage {
    pub stage_name: String,
    pub duration: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub estimated_price: String,
    pub currency: String,
    pub buying_tips: String,
    pub suggested_places: Vec<String>,
}

// NUMBER fields may come back as `3` or `3.0`.
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 {
        return Err(de::Error::custom(format!(
            "plant_count must be a non-negative integer, got {raw}"
        )));
    }
    Ok(raw as u64)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn plant(name: &str, stages: &[&str]) -> Plant {
        Plant {
            name: name.to_string(),
            confidence: "high".to_string(),
            scientific_name: format!("{name} officinalis"),
            other_possible_species: Vec::new(),
            is_poisonous: false,
            poison_details: String::new(),
            detected_diseases: Vec::new(),
            plant_information: PlantInformation {
                description: format!("{name} description"),
                common_uses: CommonUses::default(),
                care_profile: CareProfile {
                    water: "weekly".to_string(),
                    light: "full sun".to_string(),
                    soil: "loam".to_string(),
                    temperature: "18-30C".to_string(),
                    fertilizer: "monthly".to_string(),
                    pruning: "spring".to_string(),
                    environmental_info: EnvironmentalInfo {
                        min_temp: 18.0,
                        max_temp: 30.0,
                        min_humidity: 40.0,
                        max_humidity: 70.0,
                        seasonal_advice: "shade in summer".to_string(),
                    },
                },
                life_cycle: stages
                    .iter()
                    .map(|stage| LifeCycleStage {
                        stage_name: (*stage).to_string(),
                        duration: "2 weeks".to_string(),
                        description: format!("{stage} stage"),
                    })
                    .collect(),
                market_info: MarketInfo {
                    estimated_price: "50.000 - 150.000".to_string(),
                    currency: "VND".to_string(),
                    buying_tips: "pick firm leaves".to_string(),
                    suggested_places: vec!["garden centre".to_string()],
                },
            },
        }
    }
}
