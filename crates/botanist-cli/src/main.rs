use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use botanist_contracts::chat::{parse_intent, ChatRole, SESSION_HELP_COMMANDS};
use botanist_contracts::events::{EventPayload, EventWriter};
use botanist_contracts::plants::{AnalysisResult, Plant};
use botanist_contracts::LanguageCode;
use botanist_engine::config::stage_delay_from_env;
use botanist_engine::{
    analyze_batch, BotanistSession, CancellationToken, ConfigOverrides, ConsultationView,
    GatewayConfig, GeminiGateway, ImagePayload, PlantCard, PlantGateway, SequentialIllustrator,
    StageGallery, StageState, Tab,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Debug, Parser)]
#[command(name = "botanist", version, about = "AI plant analysis from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Identify every plant in one or more photos.
    Analyze(AnalyzeArgs),
    Recipe(RecipeArgs),
    Decorate(DecorateArgs),
    /// Generate one illustration per life-cycle stage of a plant.
    Illustrate(IllustrateArgs),
    /// Chat about a plant from a saved analysis.
    Consult(ConsultArgs),
    Languages,
    /// Interactive session with slash commands.
    Session(SessionArgs),
}

#[derive(Debug, Args)]
struct GatewayArgs {
    #[arg(long)]
    api_base: Option<String>,
    /// Model for structured analysis and guides. Registered models without
    /// the needed capability fall back to the default; names the registry
    /// does not list are sent to the API as given.
    #[arg(long)]
    text_model: Option<String>,
    /// Model for stage illustrations; same fallback rules as --text-model.
    #[arg(long)]
    image_model: Option<String>,
    /// Model for consultations; same fallback rules as --text-model.
    #[arg(long)]
    chat_model: Option<String>,
    /// Per-request timeout in seconds; unset means no timeout.
    #[arg(long)]
    timeout: Option<f64>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long = "image", required = true, num_args = 1..)]
    images: Vec<String>,
    #[arg(long, default_value = "vi")]
    lang: LanguageCode,
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Debug, Parser)]
struct RecipeArgs {
    #[arg(long)]
    dish: String,
    #[arg(long)]
    plant: String,
    #[arg(long, default_value = "vi")]
    lang: LanguageCode,
    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Debug, Parser)]
struct DecorateArgs {
    #[arg(long)]
    style: String,
    #[arg(long)]
    plant: String,
    #[arg(long, default_value = "vi")]
    lang: LanguageCode,
    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Debug, Parser)]
struct IllustrateArgs {
    #[arg(long)]
    result: PathBuf,
    /// 1-based plant number within the result.
    #[arg(long, default_value_t = 1)]
    plant: usize,
    #[arg(long)]
    out_dir: PathBuf,
    /// Pause after each illustrated stage; defaults to BOTANIST_STAGE_DELAY_MS or 2000.
    #[arg(long)]
    delay_ms: Option<u64>,
    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Debug, Parser)]
struct ConsultArgs {
    #[arg(long)]
    result: PathBuf,
    #[arg(long, default_value_t = 1)]
    plant: usize,
    #[arg(long, default_value = "vi")]
    lang: LanguageCode,
    #[command(flatten)]
    gateway: GatewayArgs,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long, default_value = "vi")]
    lang: LanguageCode,
    #[command(flatten)]
    gateway: GatewayArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("botanist error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Recipe(args) => run_recipe(args),
        Command::Decorate(args) => run_decorate(args),
        Command::Illustrate(args) => run_illustrate(args),
        Command::Consult(args) => run_consult(args),
        Command::Languages => {
            for language in LanguageCode::ALL {
                println!("{}\t{}", language.code(), language.label());
            }
            Ok(0)
        }
        Command::Session(args) => run_session(args),
    }
}

/// Gateway plus the event writer every command logs through.
fn connect(args: &GatewayArgs) -> Result<(Arc<dyn PlantGateway>, EventWriter)> {
    let flags = ConfigOverrides {
        api_key: None,
        api_base: args.api_base.clone(),
        text_model: args.text_model.clone(),
        image_model: args.image_model.clone(),
        chat_model: args.chat_model.clone(),
        request_timeout_s: args.timeout,
    };
    let config = GatewayConfig::from_overrides(ConfigOverrides::from_env().merged(flags))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let events = match args.events.as_ref() {
        Some(path) => EventWriter::new(path, session_id),
        None => EventWriter::disabled(session_id),
    };
    for model in config.resolved_models() {
        if let Some(reason) = model.fallback_reason.as_deref() {
            eprintln!("{reason} Using {}.", model.name);
            events.emit(
                "model_fallback",
                json_object(json!({
                    "capability": model.capability,
                    "requested": model.requested,
                    "model": model.name,
                    "reason": reason,
                })),
            )?;
        } else if !model.registered {
            eprintln!(
                "Model '{}' is not in the registry; using it as given for {}.",
                model.name, model.capability
            );
        }
    }

    let gateway: Arc<dyn PlantGateway> = Arc::new(GeminiGateway::new(config)?);
    Ok((gateway, events))
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let (gateway, events) = connect(&args.gateway)?;
    let images = load_images(&args.images)?;
    let result = analyze_batch(gateway.as_ref(), &images, args.lang, &events)
        .context(args.lang.analysis_error_message())?;

    let rendered = serde_json::to_string_pretty(&result)?;
    match args.out {
        Some(path) => {
            write_file(&path, rendered.as_bytes())?;
            println!(
                "Identified {} plant(s) across {} species; saved to {}",
                result.plant_count,
                result.plants.len(),
                path.display()
            );
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}

fn run_recipe(args: RecipeArgs) -> Result<i32> {
    let (gateway, _events) = connect(&args.gateway)?;
    let recipe = gateway.generate_recipe(&args.dish, &args.plant, args.lang)?;
    println!("{}", serde_json::to_string_pretty(&recipe)?);
    Ok(0)
}

fn run_decorate(args: DecorateArgs) -> Result<i32> {
    let (gateway, _events) = connect(&args.gateway)?;
    let guide = gateway.generate_decoration_guide(&args.style, &args.plant, args.lang)?;
    println!("{}", serde_json::to_string_pretty(&guide)?);
    Ok(0)
}

fn run_illustrate(args: IllustrateArgs) -> Result<i32> {
    let result = read_result(&args.result)?;
    let plant = pick_plant(&result, args.plant)?;
    if plant.life_cycle().is_empty() {
        println!("{} has no life-cycle stages to illustrate.", plant.name);
        return Ok(0);
    }

    let (gateway, events) = connect(&args.gateway)?;
    let delay = args
        .delay_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(stage_delay_from_env);
    let illustrator = SequentialIllustrator::new(events).with_delay(delay);
    let gallery = Mutex::new(StageGallery::new(plant.name.clone(), plant.life_cycle()));

    let report = illustrator.run(gateway.as_ref(), &gallery, &CancellationToken::new());

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed creating {}", args.out_dir.display()))?;
    let gallery = gallery
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    for index in 0..gallery.len() {
        let stage = gallery.stage_name(index).unwrap_or_default();
        match (gallery.state(index), gallery.image(index)) {
            (Some(StageState::Illustrated), Some(image)) => {
                let path = args
                    .out_dir
                    .join(format!("stage-{index}.{}", image.extension()));
                write_file(&path, &image.decode()?)?;
                println!("{stage}: {}", path.display());
            }
            _ => println!("{stage}: skipped"),
        }
    }
    println!(
        "Illustrated {} of {} stage(s).",
        report.illustrated.len(),
        gallery.len()
    );
    Ok(0)
}

fn run_consult(args: ConsultArgs) -> Result<i32> {
    let result = read_result(&args.result)?;
    let plant = pick_plant(&result, args.plant)?.clone();
    let (gateway, events) = connect(&args.gateway)?;
    let illustrator = SequentialIllustrator::new(events.clone());
    let mut card = PlantCard::new(plant, args.lang, gateway, events, illustrator);
    let view = card.open_consultation()?;
    print_last_reply(view);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }
        let input = line.trim();
        if input == "/quit" || input == "/exit" {
            break;
        }
        send_chat(view, input);
    }
    Ok(0)
}

fn run_session(args: SessionArgs) -> Result<i32> {
    let (gateway, events) = connect(&args.gateway)?;
    let illustrator = SequentialIllustrator::new(events.clone()).with_delay(stage_delay_from_env());
    let mut session = BotanistSession::new(gateway, events)
        .with_language(args.lang)
        .with_illustrator(illustrator);
    let mut active_consultation: Option<usize> = None;

    let stdin = io::stdin();
    let mut line = String::new();
    println!("Botanist session started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        match intent.action.as_str() {
            "noop" => {}
            "help" => println!("Commands: {}", SESSION_HELP_COMMANDS.join(" ")),
            "quit" => break,
            "invalid" => {
                let command = intent
                    .command_args
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                let reason = intent
                    .command_args
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                println!("/{command}: {reason}");
            }
            "unknown" => println!("Unknown command. Type /help for commands."),
            "add_images" => {
                let paths = intent.paths();
                if paths.is_empty() {
                    println!("/add requires at least one path");
                    continue;
                }
                match load_images(&paths) {
                    Ok(images) => {
                        let added = session.add_images(images);
                        active_consultation = None;
                        println!("Added {added} image(s); {} selected.", session.images().len());
                    }
                    Err(err) => println!("Add failed: {err:#}"),
                }
            }
            "remove_image" => {
                let removed = intent
                    .index()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| session.remove_image(index));
                match removed {
                    Some(_) => {
                        if session.result().is_none() {
                            active_consultation = None;
                        }
                        println!("Removed; {} image(s) selected.", session.images().len());
                    }
                    None => println!("No such image."),
                }
            }
            "analyze" => {
                active_consultation = None;
                match session.analyze() {
                    Ok(true) => print_plants(&session),
                    Ok(false) => println!("Add images with /add first."),
                    Err(err) => report_session_error(&session, &err),
                }
            }
            "set_language" => {
                let code = intent.text().unwrap_or_default();
                match code.parse::<LanguageCode>() {
                    Ok(language) => {
                        active_consultation = None;
                        match session.set_language(language) {
                            Ok(true) => {
                                println!("Language set to {}.", language.label());
                                print_plants(&session);
                            }
                            Ok(false) => println!("Language set to {}.", language.label()),
                            Err(err) => report_session_error(&session, &err),
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
            "show_plants" => print_plants(&session),
            "reset" => {
                session.reset();
                active_consultation = None;
                println!("Session cleared.");
            }
            "set_tab" => {
                let Some((index, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                match intent.text().unwrap_or_default().parse::<Tab>() {
                    Ok(tab) => {
                        card.set_tab(tab);
                        print_tab(card);
                    }
                    Err(message) => println!("Plant {}: {message}", index + 1),
                }
            }
            "open_recipe" => {
                let Some((index, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                if active_consultation == Some(index) {
                    active_consultation = None;
                }
                let dish = intent.text().unwrap_or_default().to_string();
                match card.open_recipe(&dish) {
                    Ok(recipe) => print_json(recipe),
                    Err(err) => println!("Recipe failed: {err}"),
                }
            }
            "open_decoration" => {
                let Some((index, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                if active_consultation == Some(index) {
                    active_consultation = None;
                }
                let style = intent.text().unwrap_or_default().to_string();
                match card.open_decoration(&style) {
                    Ok(guide) => print_json(guide),
                    Err(err) => println!("Decoration guide failed: {err}"),
                }
            }
            "close_overlay" => {
                let Some((index, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                if active_consultation == Some(index) {
                    active_consultation = None;
                }
                if card.close_overlay() {
                    println!("Closed.");
                } else {
                    println!("Nothing open for plant {}.", index + 1);
                }
            }
            "illustrate" => {
                let Some((index, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                if card.start_illustration() {
                    println!(
                        "Illustrating plant {} in the background; check progress with /stages {}.",
                        index + 1,
                        index + 1
                    );
                } else {
                    println!("Plant {} has no life-cycle stages.", index + 1);
                }
            }
            "show_stages" => {
                let Some((_, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                print_stages(card);
            }
            "consult" => {
                let Some((index, card)) = card_for(&mut session, intent.index()) else {
                    continue;
                };
                match card.open_consultation() {
                    Ok(view) => {
                        active_consultation = Some(index);
                        print_last_reply(view);
                    }
                    Err(err) => println!("Consultation failed: {err}"),
                }
            }
            "ask" | "message" => {
                let text = intent
                    .prompt
                    .clone()
                    .or_else(|| intent.text().map(str::to_string))
                    .unwrap_or_default();
                let view = active_consultation
                    .and_then(|index| session.card_mut(index))
                    .and_then(PlantCard::consultation_mut);
                match view {
                    Some(view) => send_chat(view, &text),
                    None => println!("Open a consultation with /consult <n> first."),
                }
            }
            other => println!("Unhandled action: {other}"),
        }
    }
    Ok(0)
}

fn card_for(
    session: &mut BotanistSession,
    number: Option<usize>,
) -> Option<(usize, &mut PlantCard)> {
    let Some(index) = number.and_then(|n| n.checked_sub(1)) else {
        println!("Plant numbers start at 1.");
        return None;
    };
    if session.result().is_none() {
        println!("No analysis yet. Use /analyze first.");
        return None;
    }
    match session.card_mut(index) {
        Some(card) => Some((index, card)),
        None => {
            println!("No plant {}.", index + 1);
            None
        }
    }
}

fn send_chat(view: &mut ConsultationView, text: &str) {
    match view.send(text) {
        Ok(Some(reply)) => println!("{}", reply.text),
        Ok(None) => {}
        Err(err) => println!("Message failed: {err}"),
    }
}

fn print_last_reply(view: &ConsultationView) {
    if let Some(message) = view
        .transcript()
        .last()
        .filter(|message| message.role == ChatRole::Model)
    {
        println!("{}", message.text);
    }
}

fn report_session_error(session: &BotanistSession, err: &botanist_engine::GatewayError) {
    println!("{}", session.error().unwrap_or("Analysis failed."));
    eprintln!("detail: {err}");
}

fn print_plants(session: &BotanistSession) {
    let Some(result) = session.result() else {
        println!("No analysis yet.");
        return;
    };
    println!(
        "{} plant(s), {} species:",
        result.plant_count,
        result.plants.len()
    );
    for (index, plant) in result.plants.iter().enumerate() {
        let poison = if plant.is_poisonous { " [poisonous]" } else { "" };
        println!(
            "{}. {} ({}) confidence {}{poison}",
            index + 1,
            plant.name,
            plant.scientific_name,
            plant.confidence
        );
    }
    for warning in &result.warnings {
        println!("warning: {warning}");
    }
}

fn print_tab(card: &PlantCard) {
    let plant = card.plant();
    let info = &plant.plant_information;
    match card.tab() {
        Tab::Info => {
            println!("{}", info.description);
            if plant.is_poisonous {
                println!("Toxicity: {}", plant.poison_details);
            }
        }
        Tab::Care => print_json(&info.care_profile),
        Tab::Uses => print_json(&info.common_uses),
        Tab::Health => {
            if plant.detected_diseases.is_empty() {
                println!("No diseases detected.");
            }
            for disease in &plant.detected_diseases {
                println!(
                    "{} ({}): {}",
                    disease.disease_name,
                    disease.severity.as_str(),
                    disease.root_cause
                );
            }
        }
        Tab::Market => print_json(&info.market_info),
    }
}

fn print_stages(card: &PlantCard) {
    let stages = card.stages();
    if stages.is_empty() {
        println!("No life-cycle stages.");
        return;
    }
    for (index, (name, state, _)) in stages.iter().enumerate() {
        println!("{}. {name}: {}", index + 1, state.as_str());
    }
    if card.is_illustrating() {
        println!("(illustration in progress)");
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => println!("failed rendering output: {err}"),
    }
}

fn load_images(sources: &[String]) -> Result<Vec<ImagePayload>> {
    sources
        .iter()
        .map(|source| {
            ImagePayload::from_source(source)
                .with_context(|| format!("failed loading image {source}"))
        })
        .collect()
}

fn read_result(path: &Path) -> Result<AnalysisResult> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    AnalysisResult::from_json(&text)
        .with_context(|| format!("{} is not an analysis result", path.display()))
}

fn pick_plant(result: &AnalysisResult, number: usize) -> Result<&Plant> {
    if number == 0 {
        bail!("plant numbers start at 1");
    }
    result.plants.get(number - 1).with_context(|| {
        format!(
            "plant {number} not found; the result has {} plant(s)",
            result.plants.len()
        )
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed writing {}", path.display()))
}

fn json_object(value: Value) -> EventPayload {
    value.as_object().cloned().unwrap_or_default()
}
