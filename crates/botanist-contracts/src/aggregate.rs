use crate::language::LanguageCode;
use crate::plants::AnalysisResult;

/// Merge the per-photo results of one batch into a single report.
///
/// `results` must be in photo submission order. Plants are concatenated in
/// that order, warnings are concatenated and deduplicated keeping the first
/// occurrence, and `plant_count` is the sum of the reported counts. The sum
/// is kept even when a constituent's count disagrees with its own plant
/// list.
pub fn aggregate_results(language: LanguageCode, results: Vec<AnalysisResult>) -> AnalysisResult {
    let mut plants = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut plant_count = 0u64;

    for result in results {
        plant_count += result.plant_count;
        plants.extend(result.plants);
        for warning in result.warnings {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
    }

    AnalysisResult {
        language: language.code().to_string(),
        plant_count,
        plants,
        warnings,
    }
}
