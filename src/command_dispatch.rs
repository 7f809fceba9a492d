//! Purpose: Hold top-level CLI command dispatch for `kirkpatrick`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Degraded fetches print an empty result plus a notice and exit 0.
//! Invariants: Rejected submissions exit with the `Remote` code after printing the store response.

use super::*;
use kirkpatrick::api::{ExportFormat, Submission};
use std::path::Path;
use super::view_json::{analytics_json, records_json, submit_json};

pub(super) fn dispatch_command(command: Command, store: StoreArgs) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "kirkpatrick", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Submit {
            name,
            score,
            comments,
        } => {
            let submission = Submission::new(name, score, comments)?;
            let dashboard = store.dashboard()?;
            let outcome = dashboard.submit(&submission);
            if outcome.is_success() {
                emit_json(submit_json(&outcome));
            }
            match outcome.into_result() {
                Ok(_) => Ok(RunOutcome::ok()),
                Err(err) => Err(err.with_message("Submission failed.")),
            }
        }
        Command::List { filter, format } => {
            let params = filter.params()?;
            let dashboard = store.dashboard()?;
            let view = dashboard.records(&params);
            if let Some(notice) = &view.notice {
                emit_notice("list", notice.clone());
            }
            match format {
                ListFormat::Json => emit_json(records_json(&view)),
                ListFormat::Csv => emit_bytes(&ExportFormat::Csv.encode(&view.table)?)?,
            }
            Ok(RunOutcome::ok())
        }
        Command::Export {
            filter,
            out_dir,
            csv,
            xlsx,
        } => {
            let params = filter.params()?;
            let targets = export_targets(&out_dir, csv, xlsx);
            let dashboard = store.dashboard()?;
            let view = dashboard.records(&params);
            if let Some(notice) = &view.notice {
                emit_notice("export", notice.clone());
            }
            let mut written = Vec::new();
            for (format, path) in targets {
                let bytes = format.encode(&view.table)?;
                write_artifact(&path, &bytes)?;
                written.push(json!({
                    "format": format.label(),
                    "path": path.display().to_string(),
                    "mime": format.mime_type(),
                    "rows": view.table.len(),
                    "bytes": bytes.len(),
                }));
            }
            emit_json(json!({ "written": written }));
            Ok(RunOutcome::ok())
        }
        Command::Analytics { samples } => {
            let dashboard = store.dashboard()?;
            let view = dashboard.analytics(samples);
            if let Some(notice) = &view.notice {
                emit_notice("analytics", notice.clone());
            }
            emit_json(analytics_json(&view.analytics, view.notice.as_deref()));
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            allow_non_loopback,
            cors_origin,
        } => {
            let bind = bind.parse().map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message("invalid bind address")
                    .with_hint("Use a host:port value like 127.0.0.1:9780.")
            })?;
            let config = serve::ServeConfig {
                bind,
                allow_non_loopback,
                cors_origins: cors_origin,
                dashboard: store.dashboard()?,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start async runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}

/// Explicit paths win; with none given both artifacts land in `out_dir`.
fn export_targets(
    out_dir: &Path,
    csv: Option<PathBuf>,
    xlsx: Option<PathBuf>,
) -> Vec<(ExportFormat, PathBuf)> {
    if csv.is_none() && xlsx.is_none() {
        return [ExportFormat::Csv, ExportFormat::Xlsx]
            .into_iter()
            .map(|format| (format, out_dir.join(format.file_name())))
            .collect();
    }
    let mut targets = Vec::new();
    if let Some(path) = csv {
        targets.push((ExportFormat::Csv, path));
    }
    if let Some(path) = xlsx {
        targets.push((ExportFormat::Xlsx, path));
    }
    targets
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|err| io_error("failed to create export directory", path, err))?;
    }
    std::fs::write(path, bytes).map_err(|err| io_error("failed to write export file", path, err))
}

fn io_error(message: &str, path: &Path, err: io::Error) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    };
    Error::new(kind)
        .with_message(format!("{message}: {}", path.display()))
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::export_targets;
    use kirkpatrick::api::ExportFormat;
    use std::path::{Path, PathBuf};

    #[test]
    fn export_targets_default_to_both_artifacts() {
        let targets = export_targets(Path::new("reports"), None, None);
        assert_eq!(
            targets,
            vec![
                (ExportFormat::Csv, PathBuf::from("reports/feedback_records.csv")),
                (ExportFormat::Xlsx, PathBuf::from("reports/feedback_records.xlsx")),
            ]
        );
    }

    #[test]
    fn explicit_paths_select_formats() {
        let targets = export_targets(Path::new("."), Some(PathBuf::from("a.csv")), None);
        assert_eq!(targets, vec![(ExportFormat::Csv, PathBuf::from("a.csv"))]);
    }
}
