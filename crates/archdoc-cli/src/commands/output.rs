//! Shared output formatting for models and validation results.

use anyhow::Result;
use archdoc_core::{ContainerModel, Finding, GroupNode, Severity, ValidationResult, WorkspaceModel};
use serde::Serialize;

use crate::{ModelFormat, OutputFormat};

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Prints the architecture model.
pub fn print_model(model: &WorkspaceModel, format: ModelFormat) -> Result<()> {
    match format {
        ModelFormat::Json => println!("{}", serde_json::to_string_pretty(model)?),
        ModelFormat::Text => print_outline(model),
    }
    Ok(())
}

fn print_outline(model: &WorkspaceModel) {
    println!("{}", model.name);
    for container in &model.containers {
        println!(
            "\n  container {} ({} file(s), {} component(s))",
            container.name,
            container.files_checked,
            container.components.len()
        );
        for group in &container.groups {
            print_group(container, group, 2);
        }
    }
    for relation in &model.relations {
        println!("\n  {} -> {}: {}", relation.source, relation.target, relation.description);
    }
}

fn print_group(container: &ContainerModel, group: &GroupNode, depth: usize) {
    if group.is_empty() {
        return;
    }
    let indent = "  ".repeat(depth);
    println!("{indent}[{}]", group.name);
    for name in &group.components {
        let Some(component) = container.components.iter().find(|c| &c.name == name) else {
            continue;
        };
        println!("{indent}  {}: {}", component.name, component.description);
        for relation in &component.relations {
            let tags = if relation.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", relation.tags.join(", "))
            };
            println!(
                "{indent}    -> {}: {}{tags}",
                relation.target, relation.description
            );
        }
    }
    for sub in &group.subgroups {
        print_group(container, sub, depth + 1);
    }
}

/// Prints validation results and findings.
///
/// Only problems are shown unless `all` is set.
pub fn print_validation(model: &WorkspaceModel, format: OutputFormat, all: bool) -> Result<()> {
    let scoped = scoped_results(model, all);
    match format {
        OutputFormat::Text => print_text(model, &scoped),
        OutputFormat::Json => return print_json(model, &scoped),
        OutputFormat::Compact => print_compact(model, &scoped),
    }
    Ok(())
}

/// A validation result with the container it belongs to (`None` for
/// workspace-level relations).
#[derive(Serialize)]
struct Scoped<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<&'a str>,
    #[serde(flatten)]
    result: &'a ValidationResult,
}

fn scoped_results(model: &WorkspaceModel, all: bool) -> Vec<Scoped<'_>> {
    let in_containers = model.containers.iter().flat_map(|c| {
        c.validation.iter().map(move |result| Scoped {
            container: Some(c.name.as_str()),
            result,
        })
    });
    let workspace = model.relations.iter().map(|result| Scoped {
        container: None,
        result,
    });
    in_containers
        .chain(workspace)
        .filter(|s| all || s.result.is_problem())
        .collect()
}

fn findings(model: &WorkspaceModel) -> impl Iterator<Item = &Finding> {
    model.containers.iter().flat_map(|c| c.findings.iter())
}

fn print_text(model: &WorkspaceModel, results: &[Scoped<'_>]) {
    for Scoped { container, result } in results {
        let status = if result.is_problem() {
            format!("{RED}problem{RESET}")
        } else {
            format!("{GREEN}ok{RESET}")
        };
        let scope = container.map(|c| format!("{c}: ")).unwrap_or_default();
        let kind = if result.synthetic { " (undeclared)" } else { "" };
        println!("{status} {scope}{} -> {}{kind}", result.source, result.target);
        if !result.description.is_empty() {
            println!("  description: {}", result.description);
        }
        println!(
            "  target exists: {}, used: {}",
            yes_no(result.target_exists),
            yes_no(result.is_used)
        );
        if let Some(classification) = result.classification {
            match &result.usage_location {
                Some(at) => println!("  usage: {classification} at {at}"),
                None => println!("  usage: {classification}"),
            }
        }
        if let Some(tag) = &result.inferred_tag {
            println!("  = inferred tag: {tag}");
        }
        for error in &result.errors {
            println!("  - {error}");
        }
        println!();
    }

    let mut errors = 0;
    let mut warnings = 0;
    for finding in findings(model) {
        match finding.severity {
            Severity::Error => errors += 1,
            Severity::Warning => warnings += 1,
            Severity::Info => {}
        }
        print!("{}", finding.format());
        println!();
    }

    let problems = results.iter().filter(|s| s.result.is_problem()).count();
    let color = if problems > 0 || errors > 0 {
        RED
    } else if warnings > 0 {
        YELLOW
    } else {
        GREEN
    };
    let files: usize = model.containers.iter().map(|c| c.files_checked).sum();
    println!(
        "{color}Found {problems} relation problem(s), {errors} error(s), {warnings} warning(s) in {files} file(s){RESET}"
    );
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[derive(Serialize)]
struct ValidationOutput<'a> {
    results: &'a [Scoped<'a>],
    findings: Vec<&'a Finding>,
}

fn print_json(model: &WorkspaceModel, results: &[Scoped<'_>]) -> Result<()> {
    let output = ValidationOutput {
        results,
        findings: findings(model).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_compact(model: &WorkspaceModel, results: &[Scoped<'_>]) {
    for Scoped { container, result } in results {
        let location = result
            .usage_location
            .as_ref()
            .map(|l| format!("{}:{}: ", l.file.display(), l.line))
            .unwrap_or_default();
        let message = if result.errors.is_empty() {
            match (result.target_exists, result.is_used) {
                (false, _) => "target does not exist".to_string(),
                (true, false) => "declared but unused".to_string(),
                (true, true) => "ok".to_string(),
            }
        } else {
            result.errors.join("; ")
        };
        println!(
            "{location}{}{} -> {}: {message}",
            container.map(|c| format!("{c}: ")).unwrap_or_default(),
            result.source,
            result.target
        );
    }
    for finding in findings(model) {
        println!("{finding}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(source: &str, target: &str, used: bool) -> ValidationResult {
        ValidationResult {
            source: source.to_string(),
            target: target.to_string(),
            description: "Uses".to_string(),
            relation_index: Some(0),
            target_exists: true,
            is_used: used,
            usage_location: None,
            classification: None,
            inferred_tag: None,
            errors: Vec::new(),
            synthetic: false,
        }
    }

    fn model() -> WorkspaceModel {
        WorkspaceModel {
            name: "Shop".to_string(),
            description: String::new(),
            containers: vec![ContainerModel {
                name: "api".to_string(),
                description: String::new(),
                technology: None,
                tags: Vec::new(),
                properties: std::collections::BTreeMap::new(),
                components: Vec::new(),
                unattached_relations: Vec::new(),
                groups: Vec::new(),
                evidence: Vec::new(),
                validation: vec![result("Orders", "Payments", true), result("Orders", "Mailer", false)],
                findings: Vec::new(),
                files_checked: 2,
            }],
            relations: vec![result("api", "worker", true)],
        }
    }

    #[test]
    fn only_problems_unless_all() {
        let model = model();
        let problems = scoped_results(&model, false);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].result.target, "Mailer");
        assert_eq!(problems[0].container, Some("api"));

        let all = scoped_results(&model, true);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].container, None);
    }

    #[test]
    fn json_output_flattens_results() {
        let model = model();
        let scoped = scoped_results(&model, true);
        let output = ValidationOutput {
            results: &scoped,
            findings: findings(&model).collect(),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["results"][0]["container"], "api");
        assert_eq!(json["results"][0]["source"], "Orders");
        assert!(json["results"][2].get("container").is_none());
    }
}
