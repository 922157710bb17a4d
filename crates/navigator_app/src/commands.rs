// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations.
//!
//! Commands write their human-readable output to the writer they are given;
//! logging goes through `tracing` and never mixes into it.

use navigator_graph::{
    ExecutionReport, Graph, LoadError, NodeContent, NodeKind, PipelineSettings, PortRef,
    SettingsError, TextInput,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Host-level failure
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A pipeline file could not be loaded
    #[error("Failed to load {path}: {source}")]
    Load {
        /// File being loaded
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: LoadError,
    },

    /// A pipeline file could not be written
    #[error("Failed to save {path}: {source}")]
    Save {
        /// File being written
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: io::Error,
    },

    /// Settings could not be read
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Writing command output failed
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),

    /// The demo pipeline could not be wired
    #[error("Failed to build demo pipeline: {0}")]
    Demo(#[from] navigator_graph::ConnectionError),
}

fn load(path: &Path, settings: &PipelineSettings) -> Result<Graph, AppError> {
    let mut graph = settings.new_graph();
    graph.load(path).map_err(|source| AppError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(graph)
}

fn save(graph: &Graph, path: &Path) -> Result<(), AppError> {
    graph.save(path).map_err(|source| AppError::Save {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a pipeline, execute it and print what its sinks ended up holding
pub fn run(
    path: &Path,
    save_to: Option<&Path>,
    settings: &PipelineSettings,
    out: &mut impl Write,
) -> Result<ExecutionReport, AppError> {
    let mut graph = load(path, settings)?;
    let report = graph.execute();
    tracing::info!(
        "Executed {} from {} roots: {} visits, {} cycles cut",
        path.display(),
        report.roots,
        report.visits,
        report.cycles_cut
    );
    if report.truncated {
        writeln!(
            out,
            "warning: stopped after {} node visits",
            settings.execution.max_visits
        )?;
    }

    for node in graph.nodes() {
        match node.content() {
            NodeContent::Label(label) => {
                writeln!(out, "{} [{}]: {}", node.title(), node.id(), label.text())?;
            }
            NodeContent::LoadImage(loader) => match loader.image() {
                Some(image) => writeln!(
                    out,
                    "{} [{}]: {}x{}",
                    node.title(),
                    node.id(),
                    image.width(),
                    image.height()
                )?,
                None => writeln!(out, "{} [{}]: no image", node.title(), node.id())?,
            },
            _ => {}
        }
    }

    if let Some(target) = save_to {
        save(&graph, target)?;
    }
    Ok(report)
}

/// Print a structural summary of a pipeline
pub fn inspect(path: &Path, settings: &PipelineSettings, out: &mut impl Write) -> Result<(), AppError> {
    let graph = load(path, settings)?;

    writeln!(out, "Nodes: {}", graph.node_count())?;
    for node in graph.nodes() {
        write!(
            out,
            "  [{}] {} \"{}\" at ({}, {})",
            node.id(),
            node.kind(),
            node.title(),
            node.position[0],
            node.position[1]
        )?;
        if node.is_root() {
            write!(out, " root")?;
        }
        writeln!(out)?;
        for port in node.ports() {
            writeln!(
                out,
                "    {} {} {}: {}",
                port.direction(),
                port.id(),
                port.name(),
                port.data_type()
            )?;
        }
    }

    writeln!(out, "Connections: {}", graph.connection_count())?;
    for connection in graph.connections() {
        writeln!(
            out,
            "  {}:{} -> {}:{}",
            connection.from_node, connection.from_port, connection.to_node, connection.to_port
        )?;
    }
    Ok(())
}

/// Build the two-node sample pipeline: a text source feeding a label
pub fn demo_graph(settings: &PipelineSettings) -> Result<Graph, AppError> {
    let mut graph = settings.new_graph();
    let source = graph.add_content(NodeContent::TextInput(TextInput::new("hello")), [50.0, 50.0]);
    let label = graph.add_node(NodeKind::Label, [350.0, 50.0]);

    let output = graph
        .node(source)
        .and_then(|n| n.output(0))
        .map(|p| PortRef::new(source, p.id()));
    let input = graph
        .node(label)
        .and_then(|n| n.input(0))
        .map(|p| PortRef::new(label, p.id()));
    if let (Some(output), Some(input)) = (output, input) {
        graph.connect(output, input)?;
    }
    Ok(graph)
}

/// Write the sample pipeline to `path`
pub fn demo(path: &Path, settings: &PipelineSettings, out: &mut impl Write) -> Result<(), AppError> {
    let graph = demo_graph(settings)?;
    save(&graph, path)?;
    writeln!(out, "Wrote demo pipeline to {}", path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("navigator_app_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_demo_then_run() {
        let settings = PipelineSettings::default();
        let path = temp_path("demo.pipeline");
        let mut out = Vec::new();
        demo(&path, &settings, &mut out).unwrap();

        let mut out = Vec::new();
        let report = run(&path, None, &settings, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert_eq!(report.roots, 1);
        assert_eq!(report.visits, 2);
        assert!(printed.contains("Label Node [2]: hello"), "{printed}");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_run_saves_executed_state() {
        let settings = PipelineSettings::default();
        let path = temp_path("run_in.pipeline");
        let saved = temp_path("run_out.pipeline");
        demo(&path, &settings, &mut Vec::new()).unwrap();

        run(&path, Some(&saved), &settings, &mut Vec::new()).unwrap();
        let text = std::fs::read_to_string(&saved).unwrap();
        // The label's received text is persisted as its payload
        assert_eq!(text.matches("Node.Data:\"hello\"").count(), 2);

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(&saved);
    }

    #[test]
    fn test_inspect_lists_structure() {
        let settings = PipelineSettings::default();
        let path = temp_path("inspect.pipeline");
        demo(&path, &settings, &mut Vec::new()).unwrap();

        let mut out = Vec::new();
        inspect(&path, &settings, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();

        assert!(printed.starts_with("Nodes: 2\n"));
        assert!(printed.contains("[1] TextInputNode \"Text Input Node\" at (50, 50) root"));
        assert!(printed.contains("input 2 Input: String"));
        assert!(printed.contains("Connections: 1\n  1:1 -> 2:2"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let path = temp_path("missing.pipeline");
        let err = run(&path, None, &PipelineSettings::default(), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::Load { .. }));
        assert!(err.to_string().contains("missing.pipeline"));
    }

    #[test]
    fn test_run_respects_visit_limit() {
        let mut settings = PipelineSettings::default();
        settings.execution.max_visits = 1;
        let path = temp_path("limited.pipeline");
        demo(&path, &settings, &mut Vec::new()).unwrap();

        let mut out = Vec::new();
        let report = run(&path, None, &settings, &mut out).unwrap();
        assert!(report.truncated);
        assert!(String::from_utf8(out).unwrap().starts_with("warning: stopped after 1"));
        let _ = std::fs::remove_file(&path);
    }
}
