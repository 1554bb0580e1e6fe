//! Instance detail report written after provisioning.

use std::io::Write;

use catalog_client::ServiceInstance;

/// Report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Aligned key/value text.
    #[default]
    Text,
    /// Pretty-printed JSON snapshot.
    Json,
}

/// Write the instance report in the requested format.
pub fn write_report(
    out: &mut dyn Write,
    format: ReportFormat,
    instance: &ServiceInstance,
) -> std::io::Result<()> {
    match format {
        ReportFormat::Text => write_instance_details(out, instance),
        ReportFormat::Json => write_instance_json(out, instance),
    }
}

/// Aligned key/value details followed by parameter and secret listings.
pub fn write_instance_details(out: &mut dyn Write, instance: &ServiceInstance) -> std::io::Result<()> {
    let mut rows = vec![
        ("Name:", instance.name.clone()),
        ("Namespace:", instance.namespace.clone()),
        ("Status:", instance.status_summary()),
        ("Class:", instance.class_name.clone()),
        ("Plan:", instance.plan_name.clone()),
    ];
    if let Some(external_id) = &instance.external_id {
        rows.push(("External ID:", external_id.clone()));
    }
    if let Some(uid) = &instance.uid {
        rows.push(("UID:", uid.clone()));
    }
    for (label, value) in rows {
        writeln!(out, "  {:<13}{}", label, value)?;
    }

    writeln!(out)?;
    writeln!(out, "Parameters:")?;
    if instance.parameters.is_empty() {
        writeln!(out, "  No parameters defined")?;
    }
    for (name, value) in &instance.parameters {
        writeln!(out, "  {}: {}", name, value)?;
    }

    if !instance.secrets.is_empty() {
        writeln!(out)?;
        writeln!(out, "Secrets:")?;
        for (name, reference) in &instance.secrets {
            writeln!(out, "  {}: {}", name, reference)?;
        }
    }
    Ok(())
}

/// Snapshot as pretty JSON.
pub fn write_instance_json(out: &mut dyn Write, instance: &ServiceInstance) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, instance)?;
    writeln!(out)
}
