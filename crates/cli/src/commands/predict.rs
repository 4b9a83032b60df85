//! Price prediction commands

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::{
    artifact::LoadOptions, predictor::InputCollector, ArtifactPaths, FeatureVector, Outcome,
    PredictionService, Submission, FEATURES,
};
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::client::{ApiClient, PredictResponse};
use crate::output::{
    color_status, format_value, print_error, print_info, print_json, print_success, print_table,
    OutputFormat,
};
use crate::PredictArgs;

/// Row for the submitted features table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    column: String,
    #[tabled(rename = "Description")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Predict through the service's JSON API
pub async fn predict_remote(
    client: &ApiClient,
    args: &PredictArgs,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    // Validate locally first so bad input never leaves the machine
    let features = InputCollector::new().collect_numbers(args.provided())?;
    let body: BTreeMap<&str, f64> = args.provided().into_iter().collect();

    let response = client.predict(&body).await?;
    report(&response, &features, format, verbose)
}

/// Predict from local artifact files without a running service
pub async fn predict_offline(args: &PredictArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let features = InputCollector::new().collect_numbers(args.provided())?;

    let service = PredictionService::new(ArtifactPaths {
        model: args.model.clone(),
        scaler: Some(args.scaler.clone()),
        options: LoadOptions::default(),
    });

    let submission = tokio::task::spawn_blocking(move || service.submit(&features))
        .await
        .context("Prediction task failed")?;

    report(&to_response(&submission), &features, format, verbose)
}

/// Shape a local submission like the service's JSON answer
fn to_response(submission: &Submission) -> PredictResponse {
    let scaler = Some(submission.scaler.label().to_string());
    match &submission.outcome {
        Outcome::Success(quote) => PredictResponse {
            status: "success".to_string(),
            message: quote.message.clone(),
            price: Some(quote.price),
            formatted: Some(quote.formatted.clone()),
            scaled: quote.scaled,
            scaler,
            error_kind: None,
            model: Some(quote.model.clone()),
        },
        Outcome::Failure(diagnostic) => PredictResponse {
            status: "error".to_string(),
            message: diagnostic.message(),
            price: None,
            formatted: None,
            scaled: false,
            scaler,
            error_kind: Some(diagnostic.kind().to_string()),
            model: None,
        },
    }
}

fn report(
    response: &PredictResponse,
    features: &FeatureVector,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(response)?,
        OutputFormat::Table => {
            if verbose {
                println!("{}", "Submitted features".bold());
                let rows: Vec<FeatureRow> = FEATURES
                    .iter()
                    .map(|field| FeatureRow {
                        column: field.column.to_string(),
                        label: field.label.to_string(),
                        value: format_value(features.get(field)),
                    })
                    .collect();
                print_table(&rows);
                println!();
            }

            if response.is_success() {
                print_success(&response.message);
                if verbose {
                    if let Some(model) = &response.model {
                        print_info(&format!("Model: {}", model.kind.cyan()));
                        for (name, value) in &model.params {
                            println!("  {name}: {value}");
                        }
                    }
                }
            } else {
                print_error(&response.message);
            }

            if let Some(scaler) = &response.scaler {
                if verbose || scaler != "applied" {
                    println!("Scaler: {}", color_status(scaler));
                }
            }
        }
    }

    if !response.is_success() {
        anyhow::bail!(
            "prediction failed ({})",
            response.error_kind.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use predictor_lib::{error::ArtifactError, Diagnostic, ScalerStatus};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_failed_submission_maps_to_error_response() {
        let submission = Submission {
            outcome: Outcome::Failure(Diagnostic::ArtifactUnavailable(ArtifactError::NotFound(
                PathBuf::from("model_trained_regressor.pkl.gz"),
            ))),
            scaler: ScalerStatus::NotLoaded,
            elapsed: Duration::ZERO,
        };

        let response = to_response(&submission);
        assert!(!response.is_success());
        assert_eq!(response.error_kind.as_deref(), Some("artifact_unavailable"));
        assert_eq!(response.scaler.as_deref(), Some("not_loaded"));
        assert!(response.message.starts_with("Error loading the model"));
    }

    #[test]
    fn test_report_fails_on_error_response() {
        let response = PredictResponse {
            status: "error".to_string(),
            message: "Error making the prediction: boom".to_string(),
            price: None,
            formatted: None,
            scaled: false,
            scaler: None,
            error_kind: Some("prediction_failure".to_string()),
            model: None,
        };
        let err = report(
            &response,
            &FeatureVector::defaults(),
            OutputFormat::Json,
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("prediction_failure"));
    }
}
