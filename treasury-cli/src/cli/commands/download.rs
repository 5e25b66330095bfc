//! Download command handler

use anyhow::{Context, Result};
use colored::*;
use std::time::Instant;

use crate::api::{DatasetKind, DownloadRequest, RecordLimit, ValidationError, query::parse_field_list};
use crate::cli::{DownloadArgs, notify};
use crate::config::Config;
use crate::export::DownloadPipeline;

pub async fn handle_download_command(config: &Config, args: DownloadArgs) -> Result<()> {
    // Bad input is reported before asking for a password
    let request = build_request(&args, config)?;
    request.validate(&config.download.cash_flow_fields)?;

    let authenticator = super::authenticate(config, args.username).await?;
    let session = authenticator
        .session()
        .context("Login finished without a session")?;

    let path = args
        .workbook
        .unwrap_or_else(|| config.download.workbook.clone());
    let mut workbook = super::open_workbook(&path)?;

    let start = Instant::now();
    let summary = DownloadPipeline::new(authenticator.client(), session)
        .with_field_allow_list(config.download.cash_flow_fields.clone())
        .run(&request, &mut workbook)
        .await?;

    workbook
        .save(&path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;

    notify::success(&format!("{} {} downloaded", summary.records, request.kind));
    println!(
        "Sheet {} in {} ({} columns, {:.2}s)",
        summary.sheet_name.cyan(),
        path.display().to_string().cyan(),
        summary.columns,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Combine arguments and configured defaults into a request
pub fn build_request(args: &DownloadArgs, config: &Config) -> Result<DownloadRequest, ValidationError> {
    let kind: DatasetKind = args.dataset.parse()?;
    let limit: RecordLimit = args
        .limit
        .as_deref()
        .unwrap_or(&config.download.default_limit)
        .parse()?;

    let fields = match &args.fields {
        Some(list) => parse_field_list(list),
        None => config.download.default_cash_flow_fields.clone(),
    };

    Ok(DownloadRequest::new(kind, limit, fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dataset: &str, limit: Option<&str>, fields: Option<&str>) -> DownloadArgs {
        DownloadArgs {
            dataset: dataset.to_string(),
            limit: limit.map(str::to_string),
            fields: fields.map(str::to_string),
            workbook: None,
            username: None,
        }
    }

    #[test]
    fn test_defaults_from_config() {
        let mut config = Config::default();
        config.download.default_cash_flow_fields = vec!["Id".to_string(), "Amount".to_string()];

        let request = build_request(&args("cash-flows", None, None), &config).unwrap();
        assert_eq!(request.kind, DatasetKind::CashFlows);
        assert_eq!(request.limit, RecordLimit::bounded(50).unwrap());
        assert_eq!(request.fields, vec!["Id", "Amount"]);
    }

    #[test]
    fn test_arguments_win() {
        let config = Config::default();
        let request = build_request(&args("flujos", Some("all"), Some("Code, Name,Code")), &config).unwrap();
        assert_eq!(request.kind, DatasetKind::FlowCodes);
        assert_eq!(request.limit, RecordLimit::Unbounded);
        assert_eq!(request.fields, vec!["Code", "Name"]);
    }

    #[test]
    fn test_bad_input() {
        let config = Config::default();
        assert_eq!(
            build_request(&args("budgets", None, None), &config),
            Err(ValidationError::UnknownDataset("budgets".to_string()))
        );
        assert_eq!(
            build_request(&args("accounts", Some("0"), None), &config),
            Err(ValidationError::InvalidLimit("0".to_string()))
        );
    }

    #[tokio::test]
    async fn test_invalid_fields_rejected_before_login() {
        let config = Config::default();
        let mut download = args("cash-flows", None, None);
        download.username = Some("nobody".to_string());

        let err = handle_download_command(&config, download).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::NoFieldsSelected)
        );

        let mut config = Config::default();
        config.download.cash_flow_fields = vec!["Id".to_string()];
        let err = handle_download_command(&config, args("cash-flows", None, Some("Secret")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::FieldNotAllowed(_))
        ));
    }
}
