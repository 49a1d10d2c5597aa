use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use botanist_contracts::guides::{DecorationGuide, Difficulty, Recipe};
use botanist_contracts::plants::{
    AnalysisResult, CareProfile, CommonUses, EnvironmentalInfo, LifeCycleStage, MarketInfo, Plant,
    PlantInformation,
};
use botanist_contracts::LanguageCode;

use crate::error::{GatewayError, Result};
use crate::image::ImagePayload;
use crate::{ConsultationSession, PlantGateway};

pub(crate) type Timeline = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
pub(crate) enum StageOutcome {
    NoImage,
    Fail,
}

type StageHook = Arc<dyn Fn(&str) + Send + Sync>;

/// In-process gateway that answers from a script and records every call.
#[derive(Default, Clone)]
pub(crate) struct ScriptedGateway {
    pub timeline: Timeline,
    analyses: HashMap<String, AnalysisResult>,
    failing_images: Vec<String>,
    image_delays: HashMap<String, Duration>,
    stage_outcomes: HashMap<String, StageOutcome>,
    stage_hook: Option<StageHook>,
    fail_guides: bool,
    chat_replies: Arc<Mutex<VecDeque<Result<String>>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analysis(mut self, image_data: &str, result: AnalysisResult) -> Self {
        self.analyses.insert(image_data.to_string(), result);
        self
    }

    pub fn failing_image(mut self, image_data: &str) -> Self {
        self.failing_images.push(image_data.to_string());
        self
    }

    pub fn delayed_image(mut self, image_data: &str, delay: Duration) -> Self {
        self.image_delays.insert(image_data.to_string(), delay);
        self
    }

    pub fn stage_outcome(mut self, stage_name: &str, outcome: StageOutcome) -> Self {
        self.stage_outcomes.insert(stage_name.to_string(), outcome);
        self
    }

    pub fn on_stage(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.stage_hook = Some(Arc::new(hook));
        self
    }

    pub fn failing_guides(mut self) -> Self {
        self.fail_guides = true;
        self
    }

    pub fn chat_reply(self, reply: Result<String>) -> Self {
        self.chat_replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.timeline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, entry: String) {
        self.timeline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
    }
}

impl PlantGateway for ScriptedGateway {
    fn analyze_image(&self, image: &ImagePayload, language: LanguageCode) -> Result<AnalysisResult> {
        self.record(format!("analyze:{}:{}", image.data, language));
        if let Some(delay) = self.image_delays.get(&image.data) {
            thread::sleep(*delay);
        }
        if self.failing_images.contains(&image.data) {
            return Err(GatewayError::AiResponse("No response from AI".to_string()));
        }
        let mut result = self
            .analyses
            .get(&image.data)
            .cloned()
            .unwrap_or_else(|| analysis(language.code(), 1, &[&image.data], &[]));
        result.language = language.code().to_string();
        Ok(result)
    }

    fn generate_recipe(
        &self,
        dish_name: &str,
        plant_name: &str,
        language: LanguageCode,
    ) -> Result<Recipe> {
        self.record(format!("recipe:{dish_name}:{plant_name}:{language}"));
        if self.fail_guides {
            return Err(GatewayError::status("Gemini request failed (503)"));
        }
        Ok(Recipe {
            title: format!("{plant_name} {dish_name}"),
            description: String::new(),
            prep_time: "10 min".to_string(),
            cook_time: "5 min".to_string(),
            difficulty: Difficulty::Easy,
            servings: "2".to_string(),
            ingredients: vec![plant_name.to_string()],
            instructions: vec!["mix".to_string()],
            tips: Vec::new(),
        })
    }

    fn generate_decoration_guide(
        &self,
        style_name: &str,
        plant_name: &str,
        language: LanguageCode,
    ) -> Result<DecorationGuide> {
        self.record(format!("decoration:{style_name}:{plant_name}:{language}"));
        if self.fail_guides {
            return Err(GatewayError::AiResponse("No response from AI".to_string()));
        }
        Ok(DecorationGuide {
            title: format!("{style_name} with {plant_name}"),
            description: "arrangement".to_string(),
            difficulty: Difficulty::Medium,
            tools_materials: vec!["vase".to_string()],
            steps: vec!["arrange".to_string()],
            tips: Vec::new(),
        })
    }

    fn generate_stage_image(
        &self,
        plant_name: &str,
        stage_name: &str,
    ) -> Result<Option<ImagePayload>> {
        self.record(format!("request:{stage_name}"));
        if let Some(hook) = &self.stage_hook {
            hook(stage_name);
        }
        match self.stage_outcomes.get(stage_name) {
            Some(StageOutcome::NoImage) => Ok(None),
            Some(StageOutcome::Fail) => Err(GatewayError::status("Gemini request failed (429)")),
            None => Ok(Some(ImagePayload::new(
                "image/png",
                format!("{plant_name}-{stage_name}"),
            ))),
        }
    }

    fn create_consultation(
        &self,
        plant_context: &str,
        language: LanguageCode,
    ) -> Result<Box<dyn ConsultationSession>> {
        self.record(format!("consult:{plant_context}:{language}"));
        Ok(Box::new(ScriptedConsultation {
            replies: Arc::clone(&self.chat_replies),
            timeline: Arc::clone(&self.timeline),
        }))
    }
}

struct ScriptedConsultation {
    replies: Arc<Mutex<VecDeque<Result<String>>>>,
    timeline: Timeline,
}

impl ConsultationSession for ScriptedConsultation {
    fn send_message(&mut self, text: &str) -> Result<String> {
        self.timeline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(format!("send:{text}"));
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Chat("no scripted reply".to_string())))
    }
}

pub(crate) fn plant(name: &str, stages: &[&str]) -> Plant {
    Plant {
        name: name.to_string(),
        confidence: "high".to_string(),
        scientific_name: format!("{name} sp."),
        other_possible_species: Vec::new(),
        is_poisonous: false,
        poison_details: String::new(),
        detected_diseases: Vec::new(),
        plant_information: PlantInformation {
            description: format!("{name} description"),
            common_uses: CommonUses::default(),
            care_profile: CareProfile {
                water: "weekly".to_string(),
                light: "bright".to_string(),
                soil: "loam".to_string(),
                temperature: "warm".to_string(),
                fertilizer: "monthly".to_string(),
                pruning: "spring".to_string(),
                environmental_info: EnvironmentalInfo {
                    min_temp: 15.0,
                    max_temp: 28.0,
                    min_humidity: 40.0,
                    max_humidity: 70.0,
                    seasonal_advice: "mulch in winter".to_string(),
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
                estimated_price: "2-5".to_string(),
                currency: "USD".to_string(),
                buying_tips: "check roots".to_string(),
                suggested_places: vec!["nursery".to_string()],
            },
        },
    }
}

pub(crate) fn analysis(
    language: &str,
    plant_count: u64,
    names: &[&str],
    warnings: &[&str],
) -> AnalysisResult {
    AnalysisResult {
        language: language.to_string(),
        plant_count,
        plants: names
            .iter()
            .map(|name| plant(name, &["Seedling", "Flowering"]))
            .collect(),
        warnings: warnings.iter().map(|w| (*w).to_string()).collect(),
    }
}
