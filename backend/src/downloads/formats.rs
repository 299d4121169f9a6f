//! Results exports: JSON, CSV, XML, text report and ZIP bundle

use super::ExportError;
use crate::state::{agent_display_name, ProcessingJob};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::{json, Map, Value};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const GENERATED_BY: &str = "AI Multimedia Production Suite";

/// Everything an export needs, with results already filtered
#[derive(Debug, Clone)]
pub struct ExportContext<'a> {
    /// Job being exported
    pub job: &'a ProcessingJob,
    /// Results to include, in processing order
    pub results: Map<String, Value>,
    /// Whether to add the job metadata block
    pub include_metadata: bool,
    /// Export timestamp
    pub generated_at: DateTime<Utc>,
}

impl<'a> ExportContext<'a> {
    /// Build a context, keeping only `selected_agents` when given
    pub fn new(
        job: &'a ProcessingJob,
        include_metadata: bool,
        selected_agents: Option<&[String]>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let results = match selected_agents {
            Some(selected) if !selected.is_empty() => job
                .results
                .iter()
                .filter(|(agent_id, _)| selected.iter().any(|s| s == *agent_id))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => job.results.clone(),
        };
        Self {
            job,
            results,
            include_metadata,
            generated_at,
        }
    }

    fn progress_label(&self) -> String {
        format!("{}", self.job.progress)
    }
}

/// Render a metric value as plain text (strings unquoted)
fn metric_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn `noise_reduction` into `Noise Reduction`
fn title_case(metric: &str) -> String {
    metric
        .split(|c: char| c == '_' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Make a metric name usable as an XML element name
pub fn sanitize_element_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let starts_ok = out
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        out.insert(0, '_');
    }
    out
}

/// Pretty-printed JSON document
pub fn to_json(ctx: &ExportContext<'_>) -> Result<String, ExportError> {
    let mut output = json!({
        "job": {
            "id": ctx.job.id,
            "fileName": ctx.job.file_name,
            "status": ctx.job.status,
            "progress": ctx.job.progress,
        },
        "results": ctx.results,
    });
    if ctx.include_metadata {
        output["metadata"] = json!({
            "downloadedAt": ctx.generated_at.to_rfc3339(),
            "format": "JSON",
            "totalAgents": ctx.results.len(),
            "generatedBy": GENERATED_BY,
        });
    }
    Ok(serde_json::to_string_pretty(&output)?)
}

/// One row per result metric: agent, metric, value
pub fn to_csv(ctx: &ExportContext<'_>) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(["Agent", "Metric", "Value"])?;

    if ctx.include_metadata {
        writer.write_record(["Metadata", "Job ID", ctx.job.id.as_str()])?;
        writer.write_record(["Metadata", "File Name", ctx.job.file_name.as_str()])?;
        writer.write_record(["Metadata", "Status", ctx.job.status.as_str()])?;
        writer.write_record(["Metadata", "Progress", &format!("{}%", ctx.progress_label())])?;
        writer.write_record(["Metadata", "Downloaded At", &ctx.generated_at.to_rfc3339()])?;
    }

    for (agent_id, agent_results) in &ctx.results {
        let agent_name = agent_display_name(agent_id);
        if let Value::Object(metrics) = agent_results {
            for (metric, value) in metrics {
                writer.write_record([agent_name.as_str(), metric.as_str(), &metric_text(value)])?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), ExportError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// XML document with one element per agent
pub fn to_xml(ctx: &ExportContext<'_>) -> Result<String, ExportError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("ProcessingResults")))?;

    if ctx.include_metadata {
        writer.write_event(Event::Start(BytesStart::new("Metadata")))?;
        write_text_element(&mut writer, "JobId", &ctx.job.id)?;
        write_text_element(&mut writer, "FileName", &ctx.job.file_name)?;
        write_text_element(&mut writer, "Status", ctx.job.status.as_str())?;
        write_text_element(&mut writer, "Progress", &ctx.progress_label())?;
        write_text_element(&mut writer, "DownloadedAt", &ctx.generated_at.to_rfc3339())?;
        writer.write_event(Event::End(BytesEnd::new("Metadata")))?;
    }

    writer.write_event(Event::Start(BytesStart::new("Results")))?;
    for (agent_id, agent_results) in &ctx.results {
        let name = agent_display_name(agent_id);
        let mut agent = BytesStart::new("Agent");
        agent.push_attribute(("id", agent_id.as_str()));
        agent.push_attribute(("name", name.as_str()));
        writer.write_event(Event::Start(agent))?;
        if let Value::Object(metrics) = agent_results {
            for (metric, value) in metrics {
                write_text_element(&mut writer, &sanitize_element_name(metric), &metric_text(value))?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("Agent")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Results")))?;
    writer.write_event(Event::End(BytesEnd::new("ProcessingResults")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Plain text processing report
pub fn to_report(ctx: &ExportContext<'_>) -> String {
    let rule = "=".repeat(60);
    let mut content = String::new();
    content.push_str("AI MULTIMEDIA PRODUCTION SUITE - PROCESSING REPORT\n");
    content.push_str(&rule);
    content.push_str("\n\n");

    if ctx.include_metadata {
        content.push_str("JOB INFORMATION:\n");
        content.push_str(&format!("• Job ID: {}\n", ctx.job.id));
        content.push_str(&format!("• File Name: {}\n", ctx.job.file_name));
        content.push_str(&format!("• Status: {}\n", ctx.job.status.as_str()));
        content.push_str(&format!("• Progress: {}%\n", ctx.progress_label()));
        content.push_str(&format!(
            "• Generated: {}\n\n",
            ctx.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    content.push_str("PROCESSING RESULTS:\n");
    content.push_str(&"-".repeat(30));
    content.push_str("\n\n");

    for (agent_id, agent_results) in &ctx.results {
        content.push_str(&format!("{}:\n", agent_display_name(agent_id).to_uppercase()));
        if let Value::Object(metrics) = agent_results {
            for (metric, value) in metrics {
                content.push_str(&format!("  • {}: {}\n", title_case(metric), metric_text(value)));
            }
        }
        content.push('\n');
    }

    content.push('\n');
    content.push_str(&rule);
    content.push('\n');
    content.push_str(&format!("Generated by {}\n", GENERATED_BY));
    content.push_str(&format!(
        "Report generated on {}\n",
        ctx.generated_at.format("%Y-%m-%d at %H:%M:%S")
    ));
    content
}

/// README placed in the ZIP bundle
pub fn to_readme(ctx: &ExportContext<'_>) -> String {
    format!(
        "AI MULTIMEDIA PRODUCTION SUITE - DOWNLOAD PACKAGE
================================================

This package contains the processing results for:
File: {file}
Job ID: {id}

CONTENTS:
---------
• results.json - Complete results in JSON format
• results.csv  - Results in CSV format for spreadsheet applications
• results.xml  - Results in XML format for structured data processing
• report.txt   - Human-readable processing report
• README.txt   - This file

USAGE:
------
1. Extract all files to a folder
2. Open the format that best suits your needs
3. The JSON format contains the most complete data structure
4. The CSV format is ideal for analysis in Excel or similar tools
5. The XML format is suitable for automated processing
6. The report provides a summary in human-readable format

Generated: {generated}
System: {system} v{version}
",
        file = ctx.job.file_name,
        id = ctx.job.id,
        generated = ctx.generated_at.format("%Y-%m-%d %H:%M:%S"),
        system = GENERATED_BY,
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Bundle every export plus a README into one archive
pub fn to_zip(ctx: &ExportContext<'_>) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries = [
        ("results.json", to_json(ctx)?),
        ("results.csv", to_csv(ctx)?),
        ("results.xml", to_xml(ctx)?),
        ("report.txt", to_report(ctx)),
        ("README.txt", to_readme(ctx)),
    ];
    for (name, content) in entries {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}
