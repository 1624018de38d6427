// crates/server/src/tasks/export.rs
//! EXPORT_PPTX / EXPORT_EDITABLE_PPTX: render every page, then assemble.

use std::sync::Arc;

use serde_json::Value;
use slidegen_core::generation::{ExportOptions, ExportPage, RenderedPage};
use slidegen_server_jobs::fan_out;

use super::TaskError;
use crate::jobs::JobContext;

#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub pages: Vec<ExportPage>,
    pub options: ExportOptions,
    pub max_workers: usize,
}

/// Both export kinds are strict: a document with a missing page is not
/// delivered, so any render failure fails the job before assembly.
pub async fn export_document(ctx: Arc<JobContext>, args: ExportArgs) -> Result<(), TaskError> {
    ctx.reporter.set_step("rendering").await?;

    let total = args.pages.len();
    let exporter = Arc::clone(&ctx.generators.exporter);
    let options = Arc::new(args.options);
    let render_options = Arc::clone(&options);

    let outcomes = fan_out(args.pages, args.max_workers, Arc::clone(&ctx.reporter), move |page| {
        let exporter = Arc::clone(&exporter);
        let options = Arc::clone(&render_options);
        async move { exporter.render_page(&page, &options).await }
    })
    .await?;

    let mut rendered: Vec<RenderedPage> = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(page) => rendered.push(page),
            Err(e) => failures.push(e.to_string()),
        }
    }
    if !failures.is_empty() {
        return Err(TaskError::Units(format!(
            "{} of {} pages failed to render: {}",
            failures.len(),
            total,
            failures.join("; ")
        )));
    }

    ctx.reporter.set_step("assembling").await?;
    let artifact = ctx.generators.exporter.assemble(rendered, &options).await?;
    tracing::info!(
        job_id = %ctx.job_id,
        pages = artifact.page_count,
        editable = options.editable,
        path = %artifact.path.display(),
        "export assembled"
    );

    let file_name = artifact
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| options.file_name.clone());
    ctx.reporter
        .update(|p| {
            p.insert_extra("download_url", Value::from(artifact.url));
            p.insert_extra("filename", Value::from(file_name));
            p.set_step("done");
            Ok(())
        })
        .await?;
    Ok(())
}
