use std::thread;

use botanist_contracts::aggregate_results;
use botanist_contracts::events::EventWriter;
use botanist_contracts::plants::AnalysisResult;
use botanist_contracts::LanguageCode;
use serde_json::json;

use crate::error::{GatewayError, Result};
use crate::image::ImagePayload;
use crate::{log_event, payload, PlantGateway};

/// Analyze every image concurrently and merge the results.
///
/// One request per image is in flight at the same time. Results are
/// joined in submission order, so the merged plant list follows the order
/// of `images` regardless of which request finished first. The batch is
/// all-or-nothing: if any image fails, no result is produced and the
/// first failure (in submission order) is returned.
pub fn analyze_batch(
    gateway: &dyn PlantGateway,
    images: &[ImagePayload],
    language: LanguageCode,
    events: &EventWriter,
) -> Result<AnalysisResult> {
    let digests: Vec<String> = images.iter().map(ImagePayload::digest).collect();
    log_event(
        events,
        "analysis_started",
        payload(json!({
            "language": language.code(),
            "image_count": images.len(),
            "image_digests": digests,
        })),
    );

    let outcomes: Vec<Result<AnalysisResult>> = thread::scope(|scope| {
        let handles: Vec<_> = images
            .iter()
            .map(|image| scope.spawn(move || gateway.analyze_image(image, language)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(GatewayError::AiResponse(
                        "analysis worker panicked".to_string(),
                    ))
                })
            })
            .collect()
    });

    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<GatewayError> = None;
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => {
                log_event(
                    events,
                    "analysis_image_failed",
                    payload(json!({
                        "index": index,
                        "image_digest": digests.get(index),
                        "error": err.to_string(),
                    })),
                );
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        log_event(
            events,
            "analysis_failed",
            payload(json!({
                "language": language.code(),
                "error": err.to_string(),
            })),
        );
        return Err(err);
    }

    let merged = aggregate_results(language, results);
    log_event(
        events,
        "analysis_finished",
        payload(json!({
            "language": merged.language,
            "plant_count": merged.plant_count,
            "plants": merged.plants.len(),
            "warnings": merged.warnings.len(),
        })),
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use botanist_contracts::events::EventWriter;
    use botanist_contracts::LanguageCode;
    use serde_json::Value;

    use super::analyze_batch;
    use crate::error::GatewayError;
    use crate::image::ImagePayload;
    use crate::testing::{analysis, ScriptedGateway};

    fn images(names: &[&str]) -> Vec<ImagePayload> {
        names
            .iter()
            .map(|name| ImagePayload::new("image/jpeg", *name))
            .collect()
    }

    fn event_types(path: &std::path::Path) -> anyhow::Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        let mut types = Vec::new();
        for line in content.lines() {
            let value: Value = serde_json::from_str(line)?;
            types.push(value["type"].as_str().unwrap_or_default().to_string());
        }
        Ok(types)
    }

    #[test]
    fn merged_result_follows_submission_order() -> anyhow::Result<()> {
        let gateway = ScriptedGateway::new()
            .with_analysis("a", analysis("en", 1, &["Rose"], &["x", "y"]))
            .with_analysis("b", analysis("en", 1, &["Mint", "Basil"], &["y", "z"]))
            .delayed_image("a", Duration::from_millis(120));
        let events = EventWriter::disabled("test");

        let merged = analyze_batch(&gateway, &images(&["a", "b"]), LanguageCode::En, &events)?;

        let names: Vec<&str> = merged.plants.iter().map(|plant| plant.name.as_str()).collect();
        assert_eq!(names, vec!["Rose", "Mint", "Basil"]);
        assert_eq!(merged.warnings, vec!["x", "y", "z"]);
        assert_eq!(merged.language, "en");
        Ok(())
    }

    #[test]
    fn plant_count_is_summed_not_recounted() -> anyhow::Result<()> {
        let gateway = ScriptedGateway::new()
            .with_analysis("a", analysis("fr", 7, &["Tulip"], &[]))
            .with_analysis("b", analysis("fr", 2, &["Daisy"], &[]));
        let events = EventWriter::disabled("test");

        let merged = analyze_batch(&gateway, &images(&["a", "b"]), LanguageCode::Fr, &events)?;
        assert_eq!(merged.plant_count, 9);
        assert_eq!(merged.plants.len(), 2);
        Ok(())
    }

    #[test]
    fn requests_run_concurrently() -> anyhow::Result<()> {
        let gateway = ScriptedGateway::new()
            .delayed_image("a", Duration::from_millis(200))
            .delayed_image("b", Duration::from_millis(200))
            .delayed_image("c", Duration::from_millis(200));
        let events = EventWriter::disabled("test");

        let started = Instant::now();
        analyze_batch(&gateway, &images(&["a", "b", "c"]), LanguageCode::Vi, &events)?;
        assert!(started.elapsed() < Duration::from_millis(550));
        assert_eq!(gateway.calls().len(), 3);
        Ok(())
    }

    #[test]
    fn one_failure_fails_the_whole_batch() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let events = EventWriter::new(&path, "test");
        let gateway = ScriptedGateway::new().failing_image("b");

        let err = analyze_batch(&gateway, &images(&["a", "b", "c"]), LanguageCode::Ja, &events)
            .unwrap_err();
        assert!(matches!(err, GatewayError::AiResponse(_)));

        let mut calls = gateway.calls();
        calls.sort();
        assert_eq!(calls, vec!["analyze:a:ja", "analyze:b:ja", "analyze:c:ja"]);

        let types = event_types(&path)?;
        assert_eq!(
            types,
            vec!["analysis_started", "analysis_image_failed", "analysis_failed"]
        );
        Ok(())
    }

    #[test]
    fn finished_event_reports_merged_counts() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let events = EventWriter::new(&path, "test");
        let gateway =
            ScriptedGateway::new().with_analysis("a", analysis("zh", 3, &["Lotus"], &["w"]));

        analyze_batch(&gateway, &images(&["a"]), LanguageCode::Zh, &events)?;

        let content = fs::read_to_string(&path)?;
        let lines: Vec<Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["image_count"], Value::from(1));
        assert_eq!(
            lines[0]["image_digests"][0].as_str().map(str::len),
            Some(64)
        );
        assert_eq!(lines[1]["type"], Value::from("analysis_finished"));
        assert_eq!(lines[1]["plant_count"], Value::from(3));
        assert_eq!(lines[1]["warnings"], Value::from(1));
        Ok(())
    }
}
