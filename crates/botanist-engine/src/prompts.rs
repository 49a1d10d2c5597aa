use botanist_contracts::LanguageCode;

fn language_line(language: LanguageCode) -> String {
    format!(
        "Required response language: {} ({}).",
        language.label(),
        language.code()
    )
}

pub fn analysis_prompt(language: LanguageCode) -> String {
    format!(
        "You are an expert AI botanist.
Task: analyze the image and identify EVERY plant that appears in it.
{}

Follow the JSON structure defined in the response schema.

Detailed requirements:
1. Multiple subjects: when the image contains several different plants (a mixed bouquet, a garden bed with several vegetables), emit one entry per species, not per individual plant, in the \"plants\" array.
2. Care profile: give watering, light, soil, temperature, fertilizer and pruning guidance for each species. Always fill environmental_info with concrete numbers (min/max temperature in Celsius, min/max humidity in percent) plus seasonal advice.
3. Diseases: diagnose visible disease on each plant, with the predicted root_cause and prevention steps.
4. Decoration: for flowers and ornamentals, suggest decoration styles.
5. Life cycle: list the main growth stages in order.
6. Market: estimate the price and where to buy it in the region that speaks this language.
7. Toxicity: warn clearly when the plant is poisonous.

If you are not sure about the species, write 'Uncertain'.",
        language_line(language)
    )
}

pub fn recipe_prompt(dish_name: &str, plant_name: &str, language: LanguageCode) -> String {
    format!(
        "You are a professional chef. Write a recipe for the dish \"{dish_name}\" using \"{plant_name}\" as an ingredient.
{} Return JSON following the schema.",
        language_line(language)
    )
}

pub fn decoration_prompt(style_name: &str, plant_name: &str, language: LanguageCode) -> String {
    format!(
        "You are a florist. Write a step-by-step \"{style_name}\" arrangement guide using \"{plant_name}\".
{} Return JSON following the schema.",
        language_line(language)
    )
}

pub fn stage_image_prompt(plant_name: &str, stage_name: &str) -> String {
    format!(
        "Scientific botanical illustration of {plant_name} at the {stage_name} stage. White background, detailed, realistic, high quality."
    )
}

pub fn consultation_instruction(plant_context: &str, language: LanguageCode) -> String {
    format!(
        "You are \"Botanist AI\", a friendly and knowledgeable plant care assistant.
Current context: the user is asking about this plant: {plant_context}.
{}

Duties:
1. Answer questions about caring for this plant, treating its diseases, or its characteristics.
2. When asked about a disease, explain the cause and how to prevent it.
3. Keep answers short, clear and easy to follow, formatted as Markdown.
4. Stay helpful and encouraging.",
        language_line(language)
    )
}
