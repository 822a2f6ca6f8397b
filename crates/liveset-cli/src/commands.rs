use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use liveset_codec::{load_document, load_xml, save_document, save_xml};
use liveset_extract::{analyse, split, ProjectSummary};
use liveset_merge::{combine_documents, MergeConfig, MergeReport};
use liveset_tree::Document;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => MergeConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MergeConfig::default(),
    };
    match cli.command {
        Command::Merge(args) => cmd_merge(args, &config, &cli.format),
        Command::Split(args) => cmd_split(args, &config, &cli.format),
        Command::Inspect(args) => cmd_inspect(args, &config, &cli.format),
    }
}

fn load(path: &Path) -> anyhow::Result<Document> {
    load_document(path).with_context(|| format!("reading {}", path.display()))
}

fn cmd_merge(args: MergeArgs, config: &MergeConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let base = load(&args.base)?;
    let incoming = load(&args.incoming)?;
    let destination = match &args.into {
        Some(path) => load(path)?,
        None => base.clone(),
    };

    let (merged, report) = combine_documents(base, incoming, destination, config)
        .context("merging track lists")?;

    // The serialized set must parse again before it replaces anything on disk.
    let xml = merged.to_xml_string()?;
    Document::parse(&xml).context("merged set is not well-formed")?;
    debug!(bytes = xml.len(), "merged set re-parsed");

    save_document(&args.output, &merged)
        .with_context(|| format!("writing {}", args.output.display()))?;
    if let Some(path) = &args.xml {
        save_xml(path, &merged).with_context(|| format!("writing {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_merge_report(&report, &args.output),
    }
    Ok(())
}

fn print_merge_report(report: &MergeReport, output: &Path) {
    println!(
        "{} Merged {} base + {} incoming tracks into {}",
        "✓".green().bold(),
        report.base_tracks.to_string().bold(),
        report.incoming_tracks.to_string().bold(),
        output.display().to_string().bold()
    );
    if report.has_conflicts() {
        println!("  {} {} track(s) renamed:", "!".yellow().bold(), report.conflicts.len());
        for conflict in &report.conflicts {
            println!(
                "    {} → {}  {} → {}",
                conflict.old_id.to_string().dimmed(),
                conflict.new_id.to_string().yellow(),
                conflict.previous_name,
                conflict.name.cyan()
            );
        }
    }
    for (old, new) in report.remap.iter() {
        println!("  Group {} moved to {}", old.to_string().dimmed(), new.to_string().yellow());
    }
    println!("  Next pointee id: {}", report.next_pointee_id.to_string().cyan());
}

fn cmd_split(args: SplitArgs, config: &MergeConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let mut doc = load(&args.project)?;
    let extraction = split(&mut doc, &config.paths).context("splitting set")?;

    let mut written = Vec::with_capacity(extraction.fragments.len());
    for fragment in &extraction.fragments {
        let path = args.out.join(&fragment.key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let xml = doc.subtree_to_xml(fragment.node)?;
        std::fs::write(&path, xml).with_context(|| format!("writing {}", path.display()))?;
        written.push(fragment.key.clone());
    }

    let infos_path = args.out.join("infos.json");
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    std::fs::write(&infos_path, serde_json::to_string_pretty(&extraction.infos)?)
        .with_context(|| format!("writing {}", infos_path.display()))?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({ "fragments": written, "infos": extraction.infos });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            for key in &written {
                println!("  {} {}", "wrote".green(), key);
            }
            println!(
                "{} {} fragment(s) in {}",
                "✓".green().bold(),
                written.len(),
                args.out.display().to_string().bold()
            );
        }
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs, config: &MergeConfig, format: &OutputFormat) -> anyhow::Result<()> {
    if let Some(path) = &args.xml {
        let xml = load_xml(&args.project)
            .with_context(|| format!("reading {}", args.project.display()))?;
        std::fs::write(path, xml).with_context(|| format!("writing {}", path.display()))?;
    }
    let doc = load(&args.project)?;
    let summary = analyse(&doc, &config.paths).context("reading set metadata")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

fn print_summary(summary: &ProjectSummary) {
    println!("Creator: {}", summary.creator().unwrap_or("unknown").bold());
    for (name, value) in summary.version.iter().filter(|(k, _)| k.as_str() != "Creator") {
        println!("  {}: {}", name, value);
    }
    println!("Tempo: {}", summary.tempo.as_deref().unwrap_or("-").cyan());
    println!("Key: {}", summary.key.as_deref().unwrap_or("-").cyan());
    if let Some(next) = summary.next_pointee_id {
        println!("Next pointee id: {}", next.to_string().cyan());
    }
    println!("Tracks ({}):", summary.tracks.len().to_string().bold());
    for track in &summary.tracks {
        let id = track.id.map(|i| i.to_string()).unwrap_or_else(|| "?".into());
        let indent = if track.group_id.is_some_and(|g| g > 0) { "    " } else { "  " };
        println!(
            "{}{} {} {}",
            indent,
            id.yellow(),
            track.kind.dimmed(),
            track.name.as_deref().unwrap_or("")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn track(kind: &str, id: i64, group: i64, name: &str) -> String {
        format!(
            r#"<{kind} Id="{id}"><Name><EffectiveName Value="{id}-{kind}"/><UserName Value="{name}"/></Name><TrackGroupId Value="{group}"/><AutomationTarget Id="{}"/></{kind}>"#,
            3000 + id
        )
    }

    fn set(tracks: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Ableton MajorVersion="5" Creator="Ableton Live 11.3"><LiveSet><NextPointeeId Value="1"/><Tracks>{}</Tracks><MasterTrack><AutomationTarget Id="5000"/></MasterTrack><Tempo Value="120"/></LiveSet></Ableton>"#,
            tracks.concat()
        )
    }

    fn write_set(dir: &Path, name: &str, tracks: &[String]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, set(tracks)).unwrap();
        path
    }

    fn invocation(command: Command) -> Cli {
        Cli { command, verbose: false, format: OutputFormat::Json, config: None }
    }

    #[test]
    fn merge_writes_gzip_output() {
        let dir = tempfile::tempdir().unwrap();
        let base = write_set(dir.path(), "base.xml", &[track("GroupTrack", 81, -1, "Drums"), track("AudioTrack", 1, 81, "Kick")]);
        let incoming = write_set(dir.path(), "incoming.xml", &[track("GroupTrack", 81, -1, "Drums"), track("AudioTrack", 2, 81, "Snare")]);
        let output = dir.path().join("merged.als");
        let xml = dir.path().join("merged.xml");

        run_command(invocation(Command::Merge(MergeArgs {
            base,
            incoming,
            output: output.clone(),
            into: None,
            xml: Some(xml.clone()),
        })))
        .unwrap();

        let raw = std::fs::read(&output).unwrap();
        assert!(liveset_codec::is_gzip(&raw));
        let merged = load_document(&output).unwrap();
        let tracks = merged.select(merged.root(), "/Ableton/LiveSet/Tracks/*").unwrap();
        assert_eq!(tracks.len(), 4);
        let text = std::fs::read_to_string(&xml).unwrap();
        assert!(text.contains("conflict-Snare"));
        assert!(!text.contains("PreviousTrack"));
    }

    #[test]
    fn split_writes_fragments_and_infos() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_set(dir.path(), "set.xml", &[track("AudioTrack", 8, -1, "Bass"), track("MidiTrack", 9, -1, "Keys")]);
        let out = dir.path().join("parts");

        run_command(invocation(Command::Split(SplitArgs { project, out: out.clone() }))).unwrap();

        assert!(out.join("Tracks/AudioTrack-8.xml").exists());
        assert!(out.join("Tracks/MidiTrack-9.xml").exists());
        assert!(out.join("MasterTrack/MasterTrack.xml").exists());
        let infos = std::fs::read_to_string(out.join("infos.json")).unwrap();
        assert!(infos.contains("nextPointer/Value/NextPointeeId"));
    }

    #[test]
    fn inspect_dumps_xml() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_set(dir.path(), "set.xml", &[track("AudioTrack", 8, -1, "Bass")]);
        let dump = dir.path().join("dump.xml");

        run_command(invocation(Command::Inspect(InspectArgs { project, xml: Some(dump.clone()) }))).unwrap();
        assert!(std::fs::read_to_string(&dump).unwrap().contains("Bass"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_set(dir.path(), "set.xml", &[]);
        let mut cli = invocation(Command::Inspect(InspectArgs { project, xml: None }));
        cli.config = Some(dir.path().join("absent.toml"));
        assert!(run_command(cli).is_err());
    }
}
