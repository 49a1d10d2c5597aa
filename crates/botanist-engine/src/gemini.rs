use botanist_contracts::guides::{DecorationGuide, Recipe};
use botanist_contracts::plants::AnalysisResult;
use botanist_contracts::schemas::{analysis_schema, decoration_guide_schema, recipe_schema};
use botanist_contracts::LanguageCode;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::image::ImagePayload;
use crate::prompts::{
    analysis_prompt, consultation_instruction, decoration_prompt, recipe_prompt,
    stage_image_prompt,
};
use crate::{ConsultationSession, PlantGateway};

const ANALYSIS_TEMPERATURE: f64 = 0.4;
const CREATIVE_TEMPERATURE: f64 = 0.7;

/// Shared HTTP plumbing for `generateContent` calls.
#[derive(Debug, Clone)]
struct GeminiTransport {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl GeminiTransport {
    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint_for_model(model);
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(payload)
            .send()
            .map_err(|err| GatewayError::transport(format!("Gemini request failed ({endpoint})"), err))?;
        response_json_or_error(response)
    }
}

/// [`PlantGateway`] backed by the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    config: GatewayConfig,
    transport: GeminiTransport,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| GatewayError::transport("failed to build HTTP client", err))?;
        let transport = GeminiTransport {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            http,
        };
        Ok(Self { config, transport })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn structured_payload(parts: Vec<Value>, schema: Value, temperature: f64) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
                "temperature": temperature,
            },
        })
    }

    fn analysis_payload(image: &ImagePayload, language: LanguageCode) -> Value {
        Self::structured_payload(
            vec![
                json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                }),
                json!({ "text": analysis_prompt(language) }),
            ],
            analysis_schema(),
            ANALYSIS_TEMPERATURE,
        )
    }

    fn stage_image_payload(plant_name: &str, stage_name: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": stage_image_prompt(plant_name, stage_name) }],
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"],
            },
        })
    }

    fn generate_structured<T: DeserializeOwned>(&self, payload: &Value, what: &str) -> Result<T> {
        let response = self
            .transport
            .generate_content(&self.config.text_model.name, payload)?;
        let text = extract_text(&response).ok_or_else(|| no_text_error(&response))?;
        serde_json::from_str(&text)
            .map_err(|err| GatewayError::AiResponse(format!("{what} did not match the schema: {err}")))
    }
}

impl PlantGateway for GeminiGateway {
    fn analyze_image(&self, image: &ImagePayload, language: LanguageCode) -> Result<AnalysisResult> {
        self.generate_structured(&Self::analysis_payload(image, language), "plant analysis")
    }

    fn generate_recipe(
        &self,
        dish_name: &str,
        plant_name: &str,
        language: LanguageCode,
    ) -> Result<Recipe> {
        let payload = Self::structured_payload(
            vec![json!({ "text": recipe_prompt(dish_name, plant_name, language) })],
            recipe_schema(),
            CREATIVE_TEMPERATURE,
        );
        self.generate_structured(&payload, "recipe")
    }

    fn generate_decoration_guide(
        &self,
        style_name: &str,
        plant_name: &str,
        language: LanguageCode,
    ) -> Result<DecorationGuide> {
        let payload = Self::structured_payload(
            vec![json!({ "text": decoration_prompt(style_name, plant_name, language) })],
            decoration_guide_schema(),
            CREATIVE_TEMPERATURE,
        );
        self.generate_structured(&payload, "decoration guide")
    }

    fn generate_stage_image(
        &self,
        plant_name: &str,
        stage_name: &str,
    ) -> Result<Option<ImagePayload>> {
        let response = self.transport.generate_content(
            &self.config.image_model.name,
            &Self::stage_image_payload(plant_name, stage_name),
        )?;
        Ok(extract_inline_image(&response))
    }

    fn create_consultation(
        &self,
        plant_context: &str,
        language: LanguageCode,
    ) -> Result<Box<dyn ConsultationSession>> {
        Ok(Box::new(GeminiConsultation {
            transport: self.transport.clone(),
            model: self.config.chat_model.name.clone(),
            system_instruction: consultation_instruction(plant_context, language),
            history: Vec::new(),
        }))
    }
}

/// Multi-turn consultation. The REST API is stateless, so completed turns
/// are replayed with every request.
struct GeminiConsultation {
    transport: GeminiTransport,
    model: String,
    system_instruction: String,
    history: Vec<Value>,
}

impl GeminiConsultation {
    fn payload_for(&self, user_turn: &Value) -> Value {
        let mut contents = self.history.clone();
        contents.push(user_turn.clone());
        json!({
            "systemInstruction": { "parts": [{ "text": self.system_instruction }] },
            "contents": contents,
            "generationConfig": { "temperature": CREATIVE_TEMPERATURE },
        })
    }
}

impl ConsultationSession for GeminiConsultation {
    fn send_message(&mut self, text: &str) -> Result<String> {
        let user_turn = json!({ "role": "user", "parts": [{ "text": text }] });
        let response = self
            .transport
            .generate_content(&self.model, &self.payload_for(&user_turn))
            .map_err(|err| GatewayError::Chat(err.to_string()))?;
        let reply = extract_text(&response)
            .ok_or_else(|| GatewayError::Chat(no_text_error(&response).to_string()))?;
        self.history.push(user_turn);
        self.history
            .push(json!({ "role": "model", "parts": [{ "text": reply }] }));
        Ok(reply)
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .map_err(|err| GatewayError::transport("Gemini response body read failed", err))?;
    if !status.is_success() {
        return Err(GatewayError::status(format!(
            "Gemini request failed ({code}): {}",
            truncate_text(&body, 512)
        )));
    }
    serde_json::from_str(&body)
        .map_err(|err| GatewayError::AiResponse(format!("Gemini returned invalid JSON payload: {err}")))
}

fn candidate_parts(payload: &Value) -> Vec<Value> {
    payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Concatenated text of the first candidate, skipping thought parts.
fn extract_text(payload: &Value) -> Option<String> {
    let text = candidate_parts(payload)
        .iter()
        .filter(|part| !part.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<String>();
    if text.trim().is_empty() {
        return None;
    }
    Some(text)
}

fn extract_inline_image(payload: &Value) -> Option<ImagePayload> {
    candidate_parts(payload).iter().find_map(|part| {
        let inline = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))?;
        let data = inline.get("data").and_then(Value::as_str)?;
        if data.is_empty() {
            return None;
        }
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png");
        Some(ImagePayload::new(mime_type, data))
    })
}

fn no_text_error(payload: &Value) -> GatewayError {
    let block_reason = payload
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str);
    let finish_reason = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("finishReason"))
        .and_then(Value::as_str);
    match (block_reason, finish_reason) {
        (Some(reason), _) => GatewayError::AiResponse(format!("prompt blocked ({reason})")),
        (None, Some(reason)) if reason != "STOP" => {
            GatewayError::AiResponse(format!("No response from AI (finish reason {reason})"))
        }
        _ => GatewayError::AiResponse("No response from AI".to_string()),
    }
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use botanist_contracts::LanguageCode;
    use serde_json::{json, Value};

    use super::{
        extract_inline_image, extract_text, no_text_error, truncate_text, GeminiConsultation,
        GeminiGateway,
    };
    use crate::config::{ConfigOverrides, GatewayConfig};
    use crate::error::GatewayError;
    use crate::image::ImagePayload;

    fn gateway_for_test() -> anyhow::Result<GeminiGateway> {
        let config = GatewayConfig::from_overrides(ConfigOverrides {
            api_key: Some("test-key".to_string()),
            api_base: Some("https://example.test/v1beta/".to_string()),
            ..ConfigOverrides::default()
        })?;
        Ok(GeminiGateway::new(config)?)
    }

    #[test]
    fn endpoint_prefixes_models_path_once() -> anyhow::Result<()> {
        let gateway = gateway_for_test()?;
        assert_eq!(
            gateway.transport.endpoint_for_model("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            gateway.transport.endpoint_for_model(" models/gemini-2.5-pro "),
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
        Ok(())
    }

    #[test]
    fn analysis_payload_sends_stripped_image_and_schema() {
        let image = ImagePayload::from_data_url("data:image/png;base64,QUJD");
        let payload = GeminiGateway::analysis_payload(&image, LanguageCode::En);
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["data"], json!("QUJD"));
        assert_eq!(parts[0]["inlineData"]["mimeType"], json!("image/png"));
        assert!(parts[1]["text"]
            .as_str()
            .unwrap_or_default()
            .contains("English (en)"));
        let config = &payload["generationConfig"];
        assert_eq!(config["responseMimeType"], json!("application/json"));
        assert_eq!(config["temperature"], json!(0.4));
        assert_eq!(
            config["responseSchema"]["required"],
            json!(["language", "plant_count", "plants", "warnings"])
        );
    }

    #[test]
    fn stage_image_payload_requests_image_modality() {
        let payload = GeminiGateway::stage_image_payload("Basil", "Flowering");
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );
        assert!(payload["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .contains("Basil at the Flowering stage"));
        assert!(payload.get("responseSchema").is_none());
    }

    #[test]
    fn consultation_replays_history_after_system_instruction() -> anyhow::Result<()> {
        let gateway = gateway_for_test()?;
        let mut session = GeminiConsultation {
            transport: gateway.transport.clone(),
            model: "gemini-2.5-flash".to_string(),
            system_instruction: "be helpful".to_string(),
            history: vec![
                json!({"role": "user", "parts": [{"text": "hi"}]}),
                json!({"role": "model", "parts": [{"text": "hello"}]}),
            ],
        };
        let turn = json!({"role": "user", "parts": [{"text": "water?"}]});
        let payload = session.payload_for(&turn);
        assert_eq!(
            payload["systemInstruction"]["parts"][0]["text"],
            json!("be helpful")
        );
        let contents = payload["contents"].as_array().cloned().unwrap_or_default();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[2], turn);
        session.history.clear();
        assert_eq!(session.payload_for(&turn)["contents"], json!([turn]));
        Ok(())
    }

    #[test]
    fn text_extraction_skips_thoughts_and_joins_parts() {
        let payload = json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "{\"a\":"},
                    {"text": "1}"}
                ]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_text(&payload).as_deref(), Some("{\"a\":1}"));
        assert_eq!(extract_text(&json!({"candidates": []})), None);
    }

    #[test]
    fn missing_text_reports_block_or_finish_reason() {
        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        assert_eq!(
            no_text_error(&blocked).to_string(),
            "AI response error: prompt blocked (SAFETY)"
        );
        let truncated = json!({"candidates": [{"finishReason": "MAX_TOKENS"}]});
        assert!(no_text_error(&truncated).to_string().contains("MAX_TOKENS"));
        assert!(matches!(
            no_text_error(&Value::Null),
            GatewayError::AiResponse(message) if message == "No response from AI"
        ));
    }

    #[test]
    fn inline_image_extraction_accepts_both_casings() {
        let camel = json!({"candidates": [{"content": {"parts": [
            {"text": "Here is the illustration"},
            {"inlineData": {"mimeType": "image/png", "data": "iVBOR"}}
        ]}}]});
        assert_eq!(
            extract_inline_image(&camel),
            Some(ImagePayload::new("image/png", "iVBOR"))
        );

        let snake = json!({"candidates": [{"content": {"parts": [
            {"inline_data": {"mime_type": "image/jpeg", "data": "/9j/"}}
        ]}}]});
        assert_eq!(
            extract_inline_image(&snake).map(|image| image.mime_type),
            Some("image/jpeg".to_string())
        );
    }

    #[test]
    fn text_only_image_response_is_no_image_not_error() {
        let payload = json!({"candidates": [{"content": {"parts": [
            {"text": "I cannot draw that"}
        ]}}]});
        assert_eq!(extract_inline_image(&payload), None);
    }

    #[test]
    fn truncate_text_marks_cut() {
        assert_eq!(truncate_text("abcdef", 3), "abc…");
        assert_eq!(truncate_text("abc", 3), "abc");
    }
}
