//! Plant analysis engine: the AI gateway, the parallel analysis batch, the
//! sequential stage illustrator and the application state built on them.

pub mod batch;
pub mod config;
pub mod error;
pub mod gemini;
pub mod illustrator;
pub mod image;
pub mod prompts;
pub mod session;

use botanist_contracts::events::{EventPayload, EventWriter};
use botanist_contracts::guides::{DecorationGuide, Recipe};
use botanist_contracts::plants::AnalysisResult;
use botanist_contracts::LanguageCode;

pub use batch::analyze_batch;
pub use config::{ConfigOverrides, GatewayConfig};
pub use error::{GatewayError, Result};
pub use gemini::GeminiGateway;
pub use illustrator::{
    CancellationToken, IllustrationReport, IllustrationTask, SequentialIllustrator, StageGallery,
    StageState,
};
pub use image::ImagePayload;
pub use session::{BotanistSession, ConsultationView, Overlay, PlantCard, Tab};

/// Every call the application makes against the generative service.
///
/// Implementations must be shareable across threads: one analysis batch
/// calls `analyze_image` concurrently, and each plant card runs its own
/// illustrator thread.
pub trait PlantGateway: Send + Sync {
    fn analyze_image(&self, image: &ImagePayload, language: LanguageCode) -> Result<AnalysisResult>;

    fn generate_recipe(
        &self,
        dish_name: &str,
        plant_name: &str,
        language: LanguageCode,
    ) -> Result<Recipe>;

    fn generate_decoration_guide(
        &self,
        style_name: &str,
        plant_name: &str,
        language: LanguageCode,
    ) -> Result<DecorationGuide>;

    /// `Ok(None)` when the service answered without an image part.
    fn generate_stage_image(&self, plant_name: &str, stage_name: &str)
        -> Result<Option<ImagePayload>>;

    /// Open a conversation seeded with `plant_context` and fixed to
    /// `language`.
    fn create_consultation(
        &self,
        plant_context: &str,
        language: LanguageCode,
    ) -> Result<Box<dyn ConsultationSession>>;
}

/// One open conversation. History lives behind this handle.
pub trait ConsultationSession: Send {
    fn send_message(&mut self, text: &str) -> Result<String>;
}

pub(crate) fn log_event(events: &EventWriter, event_type: &str, payload: EventPayload) {
    if let Err(err) = events.emit(event_type, payload) {
        eprintln!("botanist: failed to record {event_type} event: {err:#}");
    }
}

pub(crate) fn payload(value: serde_json::Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testing;
