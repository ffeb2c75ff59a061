//! Conversion orchestration: obtain the payload, decode it, run the node
//! pipeline, and render against the selected template. This is the single
//! entry point the HTTP layer and the CLI both call.

use std::time::Duration;

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, DecodeError};
use crate::generator::{self, Document};
use crate::models::{ConversionOptions, ParseFailure, SourceKind};
use crate::parser::{node_manip, subparser, ParseContext};
use crate::settings::Settings;
use crate::template::TemplateStore;
use crate::utils::http::{fetch_subscription, read_subscription_file};

/// One conversion request, as posted to `/convert`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    pub source: SourceKind,
    pub payload: String,
    #[serde(default)]
    pub options: ConversionOptions,
}

/// Non-fatal findings accompanying a successful conversion.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub parse_failures: Vec<ParseFailure>,
    pub info_filtered: usize,
    pub compat_dropped: usize,
    pub render_skipped: Vec<String>,
}

/// A successful conversion: the structured document plus a suggested
/// download filename and the collected diagnostics.
#[derive(Debug)]
pub struct ConvertOutcome {
    pub document: Document,
    pub filename: String,
    pub diagnostics: Diagnostics,
}

/// Runs a full conversion.
///
/// Per-entry problems become diagnostics; a batch with zero usable nodes, an
/// unreachable source, or a missing template is fatal and returns a typed
/// error.
pub async fn convert(
    request: &ConvertRequest,
    templates: &TemplateStore,
    settings: &Settings,
) -> Result<ConvertOutcome, ConvertError> {
    let raw = match request.source {
        SourceKind::Url => {
            fetch_subscription(
                &request.payload,
                Duration::from_secs(settings.fetch_timeout),
            )
            .await?
        }
        SourceKind::File => read_subscription_file(&request.payload).await?,
        SourceKind::Text => request.payload.clone().into_bytes(),
    };

    let ctx = ParseContext::new(settings.secret_key.as_bytes().to_vec(), Utc::now().timestamp());
    let batch = subparser::decode(&raw, &ctx);
    if batch.success_count() == 0 {
        return Err(ConvertError::Decode(DecodeError::EmptyBatch));
    }
    info!(
        "decoded {} nodes ({} entries failed)",
        batch.success_count(),
        batch.failure_count()
    );

    let report = node_manip::apply(batch.nodes(), &request.options, &settings.info_node_keywords);

    let template = templates.get(&request.options.template)?;
    let (document, render_skipped) = generator::render(&report.nodes, &template, &request.options)?;

    let prefix = if request.options.compatible_mode {
        "compatible_config"
    } else {
        "converted_config"
    };
    let filename = format!("{}.{}", prefix, document.file_extension());

    Ok(ConvertOutcome {
        document,
        filename,
        diagnostics: Diagnostics {
            parse_failures: batch.failures(),
            info_filtered: report.info_filtered,
            compat_dropped: report.compat_dropped,
            render_skipped,
        },
    })
}
