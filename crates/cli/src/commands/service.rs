//! Feature schema, model and health commands

use anyhow::Result;
use colored::Colorize;
use predictor_lib::{Constraint, ModelSummary, FEATURES};
use tabled::Tabled;

use crate::client::{ApiClient, HealthResponse, ReadinessResponse};
use crate::output::{
    color_status, format_value, print_info, print_json, print_table, print_warning, OutputFormat,
};

/// Row for the features table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Flag")]
    flag: String,
    #[tabled(rename = "Column")]
    column: String,
    #[tabled(rename = "Description")]
    label: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Constraint")]
    constraint: String,
}

/// Row for the model parameters table
#[derive(Tabled)]
struct ParamRow {
    #[tabled(rename = "Parameter")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Row for the health table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn describe_constraint(constraint: &Constraint) -> String {
    match constraint {
        Constraint::Minimum { min } => format!(">= {}", format_value(*min)),
        Constraint::Binary => "0 or 1".to_string(),
    }
}

/// List the input features; this needs no service
pub fn show_features(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&FEATURES[..])?,
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = FEATURES
                .iter()
                .map(|field| FeatureRow {
                    flag: format!("--{}", field.key),
                    column: field.column.to_string(),
                    label: field.label.to_string(),
                    default: format_value(field.default),
                    constraint: describe_constraint(&field.constraint),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

/// Describe the estimator the service loads
pub async fn show_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary: ModelSummary = client.get("api/v1/model").await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            println!("{}", "Model".bold());
            println!("{}", "=".repeat(40));
            println!("Kind:    {}", summary.kind.cyan());
            if let Some(sha) = &summary.sha256 {
                println!("SHA-256: {}", sha);
            }
            println!();

            if summary.params.is_empty() {
                print_info("The artifact declares no hyperparameters");
                return Ok(());
            }

            let rows: Vec<ParamRow> = summary
                .params
                .iter()
                .map(|(name, value)| ParamRow {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

/// Show liveness and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (_, HealthResponse) = client.get_with_status("healthz").await?;
    let (_, readiness): (_, ReadinessResponse) = client.get_with_status("readyz").await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "health": health,
            "readiness": readiness,
        }))?,
        OutputFormat::Table => {
            println!("Service: {}", color_status(&health.status));
            let ready = if readiness.ready { "ready" } else { "not ready" };
            println!("Ready:   {}", color_status(ready));
            if let Some(reason) = &readiness.reason {
                print_warning(reason);
            }
            println!();

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&component.status),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_constraint() {
        assert_eq!(describe_constraint(&Constraint::Binary), "0 or 1");
        assert_eq!(describe_constraint(&Constraint::Minimum { min: 0.0 }), ">= 0");
    }

    #[tokio::test]
    async fn test_show_health_against_mock() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/healthz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"degraded","components":{"estimator":{"status":"degraded",
                   "message":"artifact file not found","last_check_timestamp":0}}}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/readyz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ready":true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        show_health(&client, OutputFormat::Json).await.unwrap();
    }

    #[tokio::test]
    async fn test_show_model_propagates_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/model")
            .with_status(503)
            .with_body(r#"{"error":"Error loading the model","kind":"not_found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        assert!(show_model(&client, OutputFormat::Table).await.is_err());
    }
}
