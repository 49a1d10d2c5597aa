use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use botanist_contracts::chat::{ChatMessage, ChatRole, Transcript};
use botanist_contracts::events::EventWriter;
use botanist_contracts::guides::{DecorationGuide, Recipe};
use botanist_contracts::plants::{AnalysisResult, Plant};
use botanist_contracts::LanguageCode;
use serde_json::json;

use crate::batch::analyze_batch;
use crate::error::{GatewayError, Result};
use crate::illustrator::{
    IllustrationReport, IllustrationTask, SequentialIllustrator, StageGallery, StageState,
};
use crate::image::ImagePayload;
use crate::{log_event, payload, ConsultationSession, PlantGateway};

/// Top-level application state: selected images, display language, the
/// current merged result and one card per identified plant.
pub struct BotanistSession {
    gateway: Arc<dyn PlantGateway>,
    events: EventWriter,
    illustrator: SequentialIllustrator,
    language: LanguageCode,
    images: Vec<ImagePayload>,
    result: Option<AnalysisResult>,
    cards: Vec<PlantCard>,
    error: Option<String>,
}

impl BotanistSession {
    pub fn new(gateway: Arc<dyn PlantGateway>, events: EventWriter) -> Self {
        let illustrator = SequentialIllustrator::new(events.clone());
        Self {
            gateway,
            events,
            illustrator,
            language: LanguageCode::default(),
            images: Vec::new(),
            result: None,
            cards: Vec::new(),
            error: None,
        }
    }

    pub fn with_language(mut self, language: LanguageCode) -> Self {
        self.language = language;
        self
    }

    pub fn with_illustrator(mut self, illustrator: SequentialIllustrator) -> Self {
        self.illustrator = illustrator;
        self
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn images(&self) -> &[ImagePayload] {
        &self.images
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Last user-visible error, already localized.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn plant_cards(&self) -> &[PlantCard] {
        &self.cards
    }

    pub fn card_mut(&mut self, index: usize) -> Option<&mut PlantCard> {
        self.cards.get_mut(index)
    }

    /// Adding images invalidates whatever result is on screen.
    pub fn add_images(&mut self, images: impl IntoIterator<Item = ImagePayload>) -> usize {
        let before = self.images.len();
        self.images.extend(images);
        let added = self.images.len() - before;
        if added > 0 {
            self.clear_result();
            self.error = None;
        }
        added
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImagePayload> {
        if index >= self.images.len() {
            return None;
        }
        let removed = self.images.remove(index);
        if self.images.is_empty() {
            self.clear_result();
        }
        Some(removed)
    }

    /// Analyze every selected image in the current language.
    ///
    /// `Ok(false)` when there is nothing to analyze.
    pub fn analyze(&mut self) -> Result<bool> {
        if self.images.is_empty() {
            return Ok(false);
        }
        self.error = None;
        self.run_batch()?;
        Ok(true)
    }

    /// Switch the display language. When a result is on screen every
    /// selected image is analyzed again in the new language and the result
    /// is replaced wholesale; on failure the result is cleared and the
    /// images are kept. Returns whether a re-analysis ran.
    pub fn set_language(&mut self, language: LanguageCode) -> Result<bool> {
        let previous = self.language;
        self.language = language;
        log_event(
            &self.events,
            "language_changed",
            payload(json!({
                "from": previous.code(),
                "to": language.code(),
                "reanalyze": self.result.is_some() && !self.images.is_empty(),
            })),
        );
        if self.result.is_none() || self.images.is_empty() {
            return Ok(false);
        }
        self.clear_result();
        self.error = None;
        self.run_batch()?;
        Ok(true)
    }

    pub fn reset(&mut self) {
        self.images.clear();
        self.clear_result();
        self.error = None;
    }

    fn run_batch(&mut self) -> Result<()> {
        match analyze_batch(
            self.gateway.as_ref(),
            &self.images,
            self.language,
            &self.events,
        ) {
            Ok(result) => {
                self.cards = result
                    .plants
                    .iter()
                    .map(|plant| {
                        PlantCard::new(
                            plant.clone(),
                            self.language,
                            Arc::clone(&self.gateway),
                            self.events.clone(),
                            self.illustrator.clone(),
                        )
                    })
                    .collect();
                self.result = Some(result);
                Ok(())
            }
            Err(err) => {
                self.clear_result();
                self.error = Some(self.language.analysis_error_message().to_string());
                Err(err)
            }
        }
    }

    fn clear_result(&mut self) {
        self.result = None;
        self.cards.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Info,
    Care,
    Uses,
    Health,
    Market,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Info, Tab::Care, Tab::Uses, Tab::Health, Tab::Market];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Care => "care",
            Self::Uses => "uses",
            Self::Health => "health",
            Self::Market => "market",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Tab::ALL
            .into_iter()
            .find(|tab| tab.as_str() == wanted)
            .ok_or_else(|| {
                format!("Unknown tab '{raw}'; expected one of info, care, uses, health, market.")
            })
    }
}

#[derive(Debug)]
pub enum Overlay {
    Recipe { dish: String, recipe: Recipe },
    Decoration { style: String, guide: DecorationGuide },
    Consultation(ConsultationView),
}

impl Overlay {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Recipe { .. } => "recipe",
            Self::Decoration { .. } => "decoration",
            Self::Consultation(_) => "consultation",
        }
    }

    /// Dish, style or plant name the overlay was opened for.
    pub fn subject(&self) -> &str {
        match self {
            Self::Recipe { dish, .. } => dish,
            Self::Decoration { style, .. } => style,
            Self::Consultation(view) => &view.plant_name,
        }
    }
}

/// Per-plant view state. Cards are independent of each other: each has
/// its own tab, overlay, stage gallery and illustration thread.
pub struct PlantCard {
    plant: Plant,
    language: LanguageCode,
    gateway: Arc<dyn PlantGateway>,
    events: EventWriter,
    illustrator: SequentialIllustrator,
    tab: Tab,
    overlay: Option<Overlay>,
    gallery: Arc<Mutex<StageGallery>>,
    illustration: Option<IllustrationTask>,
}

impl PlantCard {
    pub fn new(
        plant: Plant,
        language: LanguageCode,
        gateway: Arc<dyn PlantGateway>,
        events: EventWriter,
        illustrator: SequentialIllustrator,
    ) -> Self {
        let gallery = StageGallery::new(plant.name.clone(), plant.life_cycle());
        Self {
            plant,
            language,
            gateway,
            events,
            illustrator,
            tab: Tab::default(),
            overlay: None,
            gallery: Arc::new(Mutex::new(gallery)),
            illustration: None,
        }
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn open_recipe(&mut self, dish_name: &str) -> Result<&Recipe> {
        self.close_overlay();
        let recipe = self
            .gateway
            .generate_recipe(dish_name, &self.plant.name, self.language)
            .inspect_err(|err| self.overlay_failed("recipe", err))?;
        self.overlay_opened("recipe", dish_name);
        let overlay = self.overlay.insert(Overlay::Recipe {
            dish: dish_name.to_string(),
            recipe,
        });
        match overlay {
            Overlay::Recipe { recipe, .. } => Ok(&*recipe),
            _ => Err(GatewayError::AiResponse("recipe overlay not open".to_string())),
        }
    }

    pub fn open_decoration(&mut self, style_name: &str) -> Result<&DecorationGuide> {
        self.close_overlay();
        let guide = self
            .gateway
            .generate_decoration_guide(style_name, &self.plant.name, self.language)
            .inspect_err(|err| self.overlay_failed("decoration", err))?;
        self.overlay_opened("decoration", style_name);
        let overlay = self.overlay.insert(Overlay::Decoration {
            style: style_name.to_string(),
            guide,
        });
        match overlay {
            Overlay::Decoration { guide, .. } => Ok(&*guide),
            _ => Err(GatewayError::AiResponse(
                "decoration overlay not open".to_string(),
            )),
        }
    }

    pub fn open_consultation(&mut self) -> Result<&mut ConsultationView> {
        self.close_overlay();
        let context = self.consultation_context();
        let session = self
            .gateway
            .create_consultation(&context, self.language)
            .inspect_err(|err| self.overlay_failed("consultation", err))?;
        self.overlay_opened("consultation", &self.plant.name);
        let view = ConsultationView::new(
            session,
            &self.plant.name,
            self.language,
            self.events.clone(),
        );
        match self.overlay.insert(Overlay::Consultation(view)) {
            Overlay::Consultation(view) => Ok(view),
            _ => Err(GatewayError::Chat("consultation overlay not open".to_string())),
        }
    }

    pub fn consultation_mut(&mut self) -> Option<&mut ConsultationView> {
        match self.overlay.as_mut() {
            Some(Overlay::Consultation(view)) => Some(view),
            _ => None,
        }
    }

    /// Discards whatever the overlay fetched, including the chat session.
    pub fn close_overlay(&mut self) -> bool {
        let Some(overlay) = self.overlay.take() else {
            return false;
        };
        log_event(
            &self.events,
            "overlay_closed",
            payload(json!({
                "plant": self.plant.name,
                "kind": overlay.kind(),
                "subject": overlay.subject(),
            })),
        );
        true
    }

    /// JSON of the plant name and its detected diseases.
    pub fn consultation_context(&self) -> String {
        let context = json!({
            "name": self.plant.name,
            "diseases": self.plant.detected_diseases,
        });
        serde_json::to_string(&context).unwrap_or_else(|_| "{}".to_string())
    }

    /// Start the stage illustration thread. A run that is still going is
    /// left to finish; a finished one is reaped and a new run picks up the
    /// stages that are not illustrated yet.
    pub fn start_illustration(&mut self) -> bool {
        if self.is_illustrating() {
            return true;
        }
        if let Some(finished) = self.illustration.take() {
            finished.join();
        }
        {
            let mut gallery = self.gallery.lock().unwrap_or_else(PoisonError::into_inner);
            gallery.retarget(&self.plant.name, self.plant.life_cycle());
            if gallery.is_empty() {
                return false;
            }
        }
        self.illustration = Some(IllustrationTask::spawn(
            self.illustrator.clone(),
            Arc::clone(&self.gateway),
            Arc::clone(&self.gallery),
        ));
        true
    }

    pub fn is_illustrating(&self) -> bool {
        self.illustration
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Block until the running illustration ends.
    pub fn wait_for_illustration(&mut self) -> Option<IllustrationReport> {
        self.illustration.take().and_then(IllustrationTask::join)
    }

    /// Snapshot of each stage: name, state and image when illustrated.
    pub fn stages(&self) -> Vec<(String, StageState, Option<ImagePayload>)> {
        let gallery = self.gallery.lock().unwrap_or_else(PoisonError::into_inner);
        (0..gallery.len())
            .map(|index| {
                (
                    gallery.stage_name(index).unwrap_or_default().to_string(),
                    gallery.state(index).unwrap_or(StageState::Pending),
                    gallery.image(index).cloned(),
                )
            })
            .collect()
    }

    fn overlay_opened(&self, kind: &str, subject: &str) {
        log_event(
            &self.events,
            "overlay_opened",
            payload(json!({
                "plant": self.plant.name,
                "kind": kind,
                "subject": subject,
            })),
        );
    }

    fn overlay_failed(&self, kind: &str, err: &GatewayError) {
        log_event(
            &self.events,
            "overlay_failed",
            payload(json!({
                "plant": self.plant.name,
                "kind": kind,
                "error": err.to_string(),
            })),
        );
    }
}

/// An open consultation: the chat handle plus the visible transcript.
pub struct ConsultationView {
    session: Box<dyn ConsultationSession>,
    transcript: Transcript,
    plant_name: String,
    events: EventWriter,
}

impl fmt::Debug for ConsultationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsultationView")
            .field("plant_name", &self.plant_name)
            .field("transcript", &self.transcript)
            .finish_non_exhaustive()
    }
}

impl ConsultationView {
    pub fn new(
        session: Box<dyn ConsultationSession>,
        plant_name: &str,
        language: LanguageCode,
        events: EventWriter,
    ) -> Self {
        let mut transcript = Transcript::new();
        transcript.push(ChatRole::Model, language.consultation_welcome(plant_name));
        Self {
            session,
            transcript,
            plant_name: plant_name.to_string(),
            events,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Send one user message. Blank input is ignored (`Ok(None)`).
    ///
    /// The user message is recorded before the request; the reply is
    /// appended only when the request succeeds.
    pub fn send(&mut self, text: &str) -> Result<Option<&ChatMessage>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        self.transcript.push(ChatRole::User, text);
        match self.session.send_message(text) {
            Ok(reply) => Ok(Some(self.transcript.push(ChatRole::Model, reply))),
            Err(err) => {
                let err = match err {
                    GatewayError::Chat(message) => GatewayError::Chat(message),
                    other => GatewayError::Chat(other.to_string()),
                };
                log_event(
                    &self.events,
                    "chat_message_failed",
                    payload(json!({
                        "plant": self.plant_name,
                        "error": err.to_string(),
                    })),
                );
                Err(err)
            }
        }
    }
}
