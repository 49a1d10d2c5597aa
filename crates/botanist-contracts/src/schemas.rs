//! Response schemas declared on every structured call.
//!
//! The service is constrained to emit JSON of exactly these shapes; the
//! serde types in [`crate::plants`] and [`crate::guides`] parse them back.

use serde_json::{json, Value};

use crate::guides::Difficulty;
use crate::plants::Severity;

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn described(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

fn number(description: &str) -> Value {
    json!({ "type": "NUMBER", "description": description })
}

pub fn disease_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "disease_name": string(),
            "confidence": string(),
            "symptoms": string_list(),
            "root_cause": described("Predicted cause of the disease (fungal, bacterial, environmental, etc.)"),
            "severity": { "type": "STRING", "enum": Severity::VOCABULARY },
            "treatment": string_list(),
            "prevention": string_list(),
        },
        "required": [
            "disease_name", "confidence", "symptoms", "severity",
            "treatment", "root_cause", "prevention"
        ],
    })
}

fn environmental_info_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "min_temp": number("Minimum ideal temperature in Celsius"),
            "max_temp": number("Maximum ideal temperature in Celsius"),
            "min_humidity": number("Minimum ideal humidity percentage (0-100)"),
            "max_humidity": number("Maximum ideal humidity percentage (0-100)"),
            "seasonal_advice": described("Specific growth advice based on weather/season"),
        },
        "required": ["min_temp", "max_temp", "min_humidity", "max_humidity", "seasonal_advice"],
    })
}

fn care_profile_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "water": described("Watering frequency and tips"),
            "light": described("Sunlight requirements"),
            "soil": described("Soil type preferences"),
            "temperature": described("Ideal temperature range description"),
            "fertilizer": described("Fertilizer recommendations"),
            "pruning": described("Pruning advice"),
            "environmental_info": environmental_info_schema(),
        },
        "required": [
            "water", "light", "soil", "temperature", "fertilizer", "pruning", "environmental_info"
        ],
    })
}

fn life_cycle_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "stage_name": described("Name of the stage (e.g., Seedling, Vegetative, Flowering)"),
                "duration": described("Typical duration of this stage"),
                "description": described("Key characteristics of this stage"),
            },
            "required": ["stage_name", "duration", "description"],
        },
    })
}

fn market_info_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "estimated_price": described("Estimated price range for a standard pot size (e.g., '50.000 - 150.000')"),
            "currency": described("Currency code or symbol (e.g., VND, USD)"),
            "buying_tips": described("Tips for selecting a healthy plant at the store"),
            "suggested_places": {
                "type": "ARRAY",
                "items": string(),
                "description": "Specific types of stores, markets, or websites to buy this plant",
            },
        },
        "required": ["estimated_price", "currency", "buying_tips", "suggested_places"],
    })
}

fn common_uses_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "medical": string_list(),
            "cooking": string_list(),
            "decoration": string_list(),
            "other": string_list(),
        },
    })
}

fn plant_information_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "description": string(),
            "common_uses": common_uses_schema(),
            "care_profile": care_profile_schema(),
            "life_cycle": life_cycle_schema(),
            "market_info": market_info_schema(),
        },
        "required": ["description", "common_uses", "care_profile", "life_cycle", "market_info"],
    })
}

pub fn plant_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "name": string(),
            "confidence": string(),
            "scientific_name": string(),
            "other_possible_species": string_list(),
            "is_poisonous": { "type": "BOOLEAN" },
            "poison_details": string(),
            "detected_diseases": { "type": "ARRAY", "items": disease_schema() },
            "plant_information": plant_information_schema(),
        },
        "required": ["name", "confidence", "scientific_name", "is_poisonous", "plant_information"],
    })
}

pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "language": string(),
            "plant_count": { "type": "NUMBER" },
            "plants": { "type": "ARRAY", "items": plant_schema() },
            "warnings": string_list(),
        },
        "required": ["language", "plant_count", "plants", "warnings"],
    })
}

fn difficulty() -> Value {
    json!({ "type": "STRING", "enum": Difficulty::VOCABULARY })
}

pub fn recipe_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": string(),
            "description": string(),
            "prep_time": string(),
            "cook_time": string(),
            "difficulty": difficulty(),
            "servings": string(),
            "ingredients": string_list(),
            "instructions": string_list(),
            "tips": string_list(),
        },
        "required": ["title", "ingredients", "instructions", "prep_time", "cook_time", "difficulty"],
    })
}

pub fn decoration_guide_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": string(),
            "description": string(),
            "difficulty": difficulty(),
            "tools_materials": string_list(),
            "steps": string_list(),
            "tips": string_list(),
        },
        "required": ["title", "description", "tools_materials", "steps", "difficulty"],
    })
}
