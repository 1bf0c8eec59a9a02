//! Holdout comparison of forecasters on the tail of a series.

use crate::models::error::ModelError;
use crate::models::forecaster::Forecaster;
use crate::models::metrics::{evaluate_series, MetricReport};
use log::{info, warn};
use polars::prelude::*;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelScore {
    pub model: String,
    pub metrics: MetricReport,
}

/// Scores every model on the last `horizon` values of `series`, predicting
/// them from everything before.
///
/// A model whose prediction fails is logged and left out of the result.
///
/// # Errors
///
/// [`ModelError::InvalidInput`] unless `0 < horizon < series.len()`.
pub fn evaluate_models(
    models: &[(&str, &dyn Forecaster)],
    series: &[f64],
    horizon: usize,
) -> Result<Vec<ModelScore>, ModelError> {
    if horizon == 0 || horizon >= series.len() {
        return Err(ModelError::InvalidInput(format!(
            "horizon {horizon} needs a series longer than itself (got {})",
            series.len()
        )));
    }
    let (context, actual) = series.split_at(series.len() - horizon);

    let mut scores = Vec::with_capacity(models.len());
    for (name, model) in models {
        let outcome = model
            .predict(context, horizon)
            .and_then(|predicted| evaluate_series(actual, &predicted));
        match outcome {
            Ok(metrics) => {
                info!("Evaluated {}", name);
                scores.push(ModelScore {
                    model: name.to_string(),
                    metrics,
                });
            }
            Err(e) => warn!("Evaluation failed for {}: {}", name, e),
        }
    }
    Ok(scores)
}

/// One row per model: `mae`, `rmse`, `mape`, `peak_error`, `model`.
pub fn scores_frame(scores: &[ModelScore]) -> Result<DataFrame, ModelError> {
    let column = |name: &str, pick: fn(&MetricReport) -> f64| {
        Column::new(
            name.into(),
            scores.iter().map(|s| pick(&s.metrics)).collect::<Vec<_>>(),
        )
    };
    let df = DataFrame::new(vec![
        column("mae", |m| m.mae),
        column("rmse", |m| m.rmse),
        column("mape", |m| m.mape),
        column("peak_error", |m| m.peak_error),
        Column::new(
            "model".into(),
            scores.iter().map(|s| s.model.as_str()).collect::<Vec<_>>(),
        ),
    ])?;
    Ok(df)
}

/// Markdown table of the scores under an `# Evaluation Metrics` heading.
pub fn render_markdown(scores: &[ModelScore]) -> String {
    let mut out = String::from("# Evaluation Metrics\n\n");
    out.push_str("| model | mae | rmse | mape | peak_error |\n");
    out.push_str("|:------|----:|-----:|-----:|-----------:|\n");
    for score in scores {
        let m = &score.metrics;
        let _ = writeln!(
            out,
            "| {} | {:.4} | {:.4} | {:.2} | {:.4} |",
            score.model, m.mae, m.rmse, m.mape, m.peak_error
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::features::FeatureMatrix;
    use crate::models::forecaster::ForecasterKind;
    use crate::models::seasonal::SeasonalNaive;
    use std::path::Path;

    /// Always fails to predict.
    struct Broken;

    impl Forecaster for Broken {
        fn kind(&self) -> ForecasterKind {
            ForecasterKind::ZeroShot
        }

        fn fit(&mut self, _: &FeatureMatrix, _: &[f64]) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict(&self, _: &[f64], _: usize) -> Result<Vec<f64>, ModelError> {
            Err(ModelError::NotFitted)
        }

        fn save(&self, _: &Path) -> Result<(), ModelError> {
            Ok(())
        }

        fn load(_: &Path) -> Result<Self, ModelError> {
            Ok(Broken)
        }
    }

    fn daily_pattern(days: usize) -> Vec<f64> {
        (0..days * 24).map(|h| 1.0 + (h % 24) as f64 / 10.0).collect()
    }

    #[test]
    fn test_failing_model_is_skipped() -> Result<(), ModelError> {
        let naive = SeasonalNaive::new(24)?;
        let broken = Broken;
        let series = daily_pattern(3);

        let models: [(&str, &dyn Forecaster); 2] = [("naive", &naive), ("broken", &broken)];

        let scores = evaluate_models(&models, &series, 24)?;

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].model, "naive");
        assert_eq!(scores[0].metrics.mae, 0.0);
        Ok(())
    }

    #[test]
    fn test_horizon_must_leave_context() {
        let naive = SeasonalNaive::new(1).unwrap();
        let models: [(&str, &dyn Forecaster); 1] = [("naive", &naive)];
        let series = [1.0, 2.0];
        for horizon in [0, 2, 3] {
            assert!(matches!(
                evaluate_models(&models, &series, horizon),
                Err(ModelError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_scores_frame_and_markdown() -> Result<(), ModelError> {
        let naive = SeasonalNaive::new(24)?;
        let lagged = SeasonalNaive::new(23)?;
        let series = daily_pattern(2);
        let models: [(&str, &dyn Forecaster); 2] = [("naive_24", &naive), ("naive_23", &lagged)];
        let scores = evaluate_models(&models, &series, 24)?;

        let df = scores_frame(&scores)?;
        assert_eq!(df.shape(), (2, 5));
        assert_eq!(df.column("mae")?.as_materialized_series().f64()?.get(0), Some(0.0));

        let report = render_markdown(&scores);
        assert!(report.starts_with("# Evaluation Metrics"));
        assert!(report.contains("| naive_24 | 0.0000 |"));
        assert_eq!(report.lines().count(), 6);
        Ok(())
    }
}
