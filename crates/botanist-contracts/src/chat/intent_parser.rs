use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, INDEX_COMMANDS, INDEX_TEXT_COMMANDS, MULTI_PATH_COMMANDS, NO_ARG_COMMANDS,
    TEXT_ARG_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }

    fn invalid(raw: &str, command: &str, reason: String) -> Self {
        let mut intent = Intent::new("invalid", raw);
        intent
            .command_args
            .insert("command".to_string(), Value::String(command.to_string()));
        intent
            .command_args
            .insert("reason".to_string(), Value::String(reason));
        intent
    }

    pub fn index(&self) -> Option<usize> {
        self.command_args
            .get("index")
            .and_then(Value::as_u64)
            .map(|value| value as usize)
    }

    pub fn text(&self) -> Option<&str> {
        self.command_args.get("text").and_then(Value::as_str)
    }

    pub fn paths(&self) -> Vec<String> {
        self.command_args
            .get("paths")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_index(token: Option<&String>) -> Result<usize, String> {
    let Some(token) = token else {
        return Err("missing plant or image number".to_string());
    };
    token
        .parse::<usize>()
        .map_err(|_| format!("'{token}' is not a number"))
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, TEXT_ARG_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("text".to_string(), Value::String(arg.to_string()));
                return intent;
            }

            if let Some(action) = find_action(&command, MULTI_PATH_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "paths".to_string(),
                    Value::Array(split_args(arg).into_iter().map(Value::String).collect()),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, INDEX_COMMANDS) {
                let parts = split_args(arg);
                return match parse_index(parts.first()) {
                    Ok(index) => {
                        let mut intent = Intent::new(action, text);
                        intent
                            .command_args
                            .insert("index".to_string(), Value::from(index));
                        intent
                    }
                    Err(reason) => Intent::invalid(text, &command, reason),
                };
            }

            if let Some(action) = find_action(&command, INDEX_TEXT_COMMANDS) {
                let parts = split_args(arg);
                let index = match parse_index(parts.first()) {
                    Ok(index) => index,
                    Err(reason) => return Intent::invalid(text, &command, reason),
                };
                let subject = parts[1..].join(" ");
                if subject.is_empty() {
                    return Intent::invalid(text, &command, "missing argument".to_string());
                }
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("index".to_string(), Value::from(index));
                intent
                    .command_args
                    .insert("text".to_string(), Value::String(subject));
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("message", text);
    intent.prompt = Some(raw_trimmed.to_string());
    intent
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn parse_add_quoted_paths() {
        let intent = parse_intent("/add \"/tmp/a b.jpg\" c.png");
        assert_eq!(intent.action, "add_images");
        assert_eq!(intent.paths(), vec!["/tmp/a b.jpg", "c.png"]);
    }

    #[test]
    fn parse_index_commands() {
        let remove = parse_intent("/remove 2");
        assert_eq!(remove.action, "remove_image");
        assert_eq!(remove.index(), Some(2));

        let illustrate = parse_intent("  /illustrate 0  ");
        assert_eq!(illustrate.action, "illustrate");
        assert_eq!(illustrate.index(), Some(0));

        assert_eq!(parse_intent("/consult 1").action, "consult");
        assert_eq!(parse_intent("/stages 1").action, "show_stages");
        assert_eq!(parse_intent("/close 1").action, "close_overlay");
    }

    #[test]
    fn parse_index_with_subject() {
        let recipe = parse_intent("/recipe 0 \"Basil pesto\" pasta");
        assert_eq!(recipe.action, "open_recipe");
        assert_eq!(recipe.index(), Some(0));
        assert_eq!(recipe.text(), Some("Basil pesto pasta"));

        let tab = parse_intent("/tab 1 care");
        assert_eq!(tab.action, "set_tab");
        assert_eq!(tab.text(), Some("care"));
    }

    #[test]
    fn bad_index_is_reported_as_invalid() {
        let intent = parse_intent("/recipe first pesto");
        assert_eq!(intent.action, "invalid");
        assert_eq!(intent.command_args["command"], json!("recipe"));
        assert_eq!(intent.command_args["reason"], json!("'first' is not a number"));

        let missing = parse_intent("/decorate 0");
        assert_eq!(missing.action, "invalid");
        assert_eq!(missing.command_args["reason"], json!("missing argument"));

        let no_index = parse_intent("/remove");
        assert_eq!(
            no_index.command_args["reason"],
            json!("missing plant or image number")
        );
    }

    #[test]
    fn parse_text_commands() {
        let lang = parse_intent("/lang fr");
        assert_eq!(lang.action, "set_language");
        assert_eq!(lang.text(), Some("fr"));

        let ask = parse_intent("/ask why are the leaves yellow?");
        assert_eq!(ask.action, "ask");
        assert_eq!(ask.text(), Some("why are the leaves yellow?"));
    }

    #[test]
    fn parse_no_arg_and_plain_text() {
        assert_eq!(parse_intent("/analyze").action, "analyze");
        assert_eq!(parse_intent("/QUIT").action, "quit");
        assert_eq!(parse_intent("   ").action, "noop");

        let message = parse_intent("  how often to water?  ");
        assert_eq!(message.action, "message");
        assert_eq!(message.prompt.as_deref(), Some("how often to water?"));
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("magic"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }
}
