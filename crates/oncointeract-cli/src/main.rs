use std::fs;
use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use oncointeract_contracts::catalog::{CancerClass, CancerType, ReceptorOption};
use oncointeract_contracts::events::{Event, EventWriter};
use oncointeract_contracts::form::AnalysisForm;
use oncointeract_contracts::models::ModelRegistry;
use oncointeract_contracts::report::{read_report, write_report, DEFAULT_REPORT_FILE_NAME};
use oncointeract_contracts::session::{parse_command, SessionCommand, SESSION_HELP_COMMANDS};
use oncointeract_engine::{connect_oracles, OracleSet};
use oncointeract_engine::orchestrator::GENERIC_ERROR_MESSAGE;
use oncointeract_engine::presentation::{
    export_images, load_images, render_text_report, write_html_report,
};
use oncointeract_engine::{Orchestrator, Outcome, Phase, ViewState};
use uuid::Uuid;

const DEFAULT_HTML_FILE_NAME: &str = "oncointeract_docking_report.html";

#[derive(Debug, Parser)]
#[command(
    name = "oncointeract",
    version,
    about = "Ligand/receptor docking analysis backed by Gemini"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one analysis cycle and write the report and images.
    Analyze(AnalyzeArgs),
    /// Interactive slash-command session.
    Session(SessionArgs),
    /// Re-render a saved report.
    Render(RenderArgs),
    /// List receptors, cancer types/classes and models.
    Catalog,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    ligand: PathBuf,
    #[arg(long)]
    receptor: Option<ReceptorOption>,
    #[arg(long)]
    custom_receptor: Option<PathBuf>,
    #[arg(long)]
    cancer_type: Option<CancerType>,
    #[arg(long)]
    cancer_class: Option<CancerClass>,
    #[arg(long)]
    mutation: Option<String>,
    #[arg(long)]
    experimental: Option<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    image_model: Option<String>,
    #[arg(long)]
    html: bool,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    text_model: Option<String>,
    #[arg(long)]
    image_model: Option<String>,
}

#[derive(Debug, Parser)]
struct RenderArgs {
    #[arg(long)]
    report: PathBuf,
    #[arg(long)]
    images: Option<PathBuf>,
    #[arg(long)]
    html: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("oncointeract error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
        Command::Render(args) => run_render(args),
        Command::Catalog => {
            for line in catalog_lines() {
                println!("{line}");
            }
            Ok(0)
        }
    }
}

fn open_events(out_dir: &Path, events: Option<&Path>) -> EventWriter {
    let path = events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out_dir.join("events.jsonl"));
    EventWriter::new(path, Uuid::new_v4().to_string())
}

/// Session events are diagnostics; a log write failure never stops the tool.
fn record(events: &EventWriter, event: Event) {
    let _ = events.record(&event);
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn build_form(args: &AnalyzeArgs) -> Result<AnalysisForm> {
    let mut form = AnalysisForm::new();
    form.load_ligand(&args.ligand)?;
    if let Some(receptor) = args.receptor {
        form.receptor = receptor;
    }
    if let Some(path) = args.custom_receptor.as_deref() {
        form.load_custom_receptor(path)?;
        if args.receptor.is_none() {
            form.receptor = ReceptorOption::Custom;
        }
    }
    if let Some(cancer_type) = args.cancer_type {
        form.cancer_type = cancer_type;
    }
    if let Some(cancer_class) = args.cancer_class {
        form.cancer_class = cancer_class;
    }
    if let Some(mutation) = args.mutation.as_deref() {
        form.set_mutation(mutation);
    }
    if let Some(path) = args.experimental.as_deref() {
        form.load_experimental(path)?;
    }
    Ok(form)
}

/// One-line summary of where the current cycle is.
fn state_line(state: &ViewState) -> String {
    let images = format!("{}/3 images", state.images().len());
    match state.phase() {
        Phase::Idle => "Idle. Load a ligand and /submit.".to_string(),
        Phase::Submitting | Phase::AwaitingText => state
            .progress()
            .unwrap_or("Submitting...")
            .to_string(),
        Phase::GeneratingImages => format!(
            "{} ({images})",
            state.progress().unwrap_or_default()
        ),
        Phase::Settled(Outcome::Success) => format!("Analysis complete ({images})."),
        Phase::Settled(Outcome::Error) => state
            .error()
            .unwrap_or(GENERIC_ERROR_MESSAGE)
            .to_string(),
    }
}

/// Writes `state_line` when it differs from the last one written.
fn print_progress(out: &mut dyn Write, state: &ViewState, last: &mut String) {
    let line = state_line(state);
    if *last != line {
        let _ = writeln!(out, "{line}");
        *last = line;
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let request = build_form(&args)?.submit()?;
    fs::create_dir_all(&args.out)?;
    let events = open_events(&args.out, args.events.as_deref());
    let oracles = connect_oracles(args.text_model.as_deref(), args.image_model.as_deref())?;
    for warning in &oracles.warnings {
        println!("{warning}");
    }
    record(
        &events,
        Event::SessionStarted {
            mode: "analyze".to_string(),
            out_dir: display_path(&args.out),
            text_model: oracles.text_model.name.clone(),
            image_model: oracles.image_model.name.clone(),
        },
    );

    let mut orchestrator = Orchestrator::new(oracles.text, oracles.image, Some(events.clone()));
    orchestrator.submit(request)?;
    let mut stdout = io::stdout();
    let mut last = String::new();
    print_progress(&mut stdout, orchestrator.state(), &mut last);
    let state = orchestrator.wait(|state| print_progress(&mut stdout, state, &mut last));

    if state.phase() == Phase::Settled(Outcome::Error) {
        eprintln!("{}", state.error().unwrap_or(GENERIC_ERROR_MESSAGE));
        return Ok(1);
    }
    let Some(result) = state.result() else {
        bail!("analysis settled without a result");
    };

    println!("{}", render_text_report(result, state.images()));
    let report_path = args.out.join(DEFAULT_REPORT_FILE_NAME);
    write_report(&report_path, result)?;
    println!("Report: {}", report_path.display());
    record(
        &events,
        Event::ReportExported {
            path: display_path(&report_path),
        },
    );
    let written = export_images(&args.out, state.images())?;
    for path in &written {
        println!("Image: {}", path.display());
    }
    record(
        &events,
        Event::ImagesExported {
            dir: display_path(&args.out),
            count: written.len(),
        },
    );
    if args.html {
        let html_path = args.out.join(DEFAULT_HTML_FILE_NAME);
        write_html_report(&html_path, result, state.images())?;
        println!("HTML: {}", html_path.display());
        record(
            &events,
            Event::HtmlExported {
                path: display_path(&html_path),
            },
        );
    }
    Ok(0)
}

fn run_render(args: RenderArgs) -> Result<i32> {
    let result = read_report(&args.report)?;
    let images = match args.images.as_deref() {
        Some(dir) => load_images(dir)?,
        None => Default::default(),
    };
    println!("{}", render_text_report(&result, &images));
    if let Some(path) = args.html.as_deref() {
        write_html_report(path, &result, &images)?;
        println!("HTML: {}", path.display());
    }
    Ok(0)
}

fn catalog_lines() -> Vec<String> {
    let mut lines = vec!["Receptors:".to_string()];
    lines.extend(
        ReceptorOption::ALL
            .iter()
            .map(|item| format!("  {:<14} {}", item.key(), item.label())),
    );
    lines.push("Cancer types:".to_string());
    lines.extend(
        CancerType::ALL
            .iter()
            .map(|item| format!("  {:<14} {}", item.key(), item.label())),
    );
    lines.push("Cancer classes:".to_string());
    lines.extend(
        CancerClass::ALL
            .iter()
            .map(|item| format!("  {:<14} {}", item.key(), item.label())),
    );
    lines.push("Models:".to_string());
    lines.extend(ModelRegistry::default().list().map(|model| {
        format!(
            "  {:<24} {:<8} {:<7} {}",
            model.name,
            model.capability,
            model.provider.as_str(),
            model.description
        )
    }));
    lines
}

fn run_session(args: SessionArgs) -> Result<()> {
    fs::create_dir_all(&args.out)?;
    let events = open_events(&args.out, args.events.as_deref());
    let mut stdout = io::stdout();
    let mut session = Session::new(
        args.out.clone(),
        events,
        args.text_model.clone(),
        args.image_model.clone(),
        &mut stdout,
    )?;

    let stdin = io::stdin();
    let mut line = String::new();
    writeln!(stdout, "OncoInteract session started. Type /help for commands.")?;

    loop {
        session.poll(&mut stdout);
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        let read = match stdin.lock().read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        if !session.handle(&command, &mut stdout)? {
            break;
        }
    }
    session.finish();
    Ok(())
}

/// Interactive state: the form being filled in and the orchestrator behind
/// it. Output goes to whatever writer the caller hands in.
struct Session {
    out_dir: PathBuf,
    events: EventWriter,
    form: AnalysisForm,
    orchestrator: Orchestrator,
    text_model: Option<String>,
    image_model: Option<String>,
    last_line: String,
}

impl Session {
    fn new(
        out_dir: PathBuf,
        events: EventWriter,
        text_model: Option<String>,
        image_model: Option<String>,
        out: &mut dyn Write,
    ) -> Result<Self> {
        let oracles = Self::connect(text_model.as_deref(), image_model.as_deref(), out)?;
        let orchestrator = Orchestrator::new(oracles.text, oracles.image, Some(events.clone()));
        record(
            &events,
            Event::SessionStarted {
                mode: "session".to_string(),
                out_dir: display_path(&out_dir),
                text_model: orchestrator.text_model().to_string(),
                image_model: orchestrator.image_model().to_string(),
            },
        );
        Ok(Self {
            out_dir,
            events,
            form: AnalysisForm::new(),
            orchestrator,
            text_model,
            image_model,
            last_line: String::new(),
        })
    }

    fn connect(
        text_model: Option<&str>,
        image_model: Option<&str>,
        out: &mut dyn Write,
    ) -> Result<OracleSet> {
        let oracles = connect_oracles(text_model, image_model)?;
        for warning in &oracles.warnings {
            let _ = writeln!(out, "{warning}");
        }
        Ok(oracles)
    }

    /// Applies background progress and reports it if anything changed.
    fn poll(&mut self, out: &mut dyn Write) {
        if self.orchestrator.pump() > 0 {
            print_progress(out, self.orchestrator.state(), &mut self.last_line);
        }
    }

    fn finish(&self) {
        record(&self.events, Event::SessionFinished);
    }

    /// Builds oracles for the new pair and hands them to the orchestrator.
    /// Stored model names only change once the switch has gone through.
    fn switch_models(
        &mut self,
        text_model: Option<String>,
        image_model: Option<String>,
        out: &mut dyn Write,
    ) -> Result<()> {
        if self.orchestrator.state().phase().in_flight() {
            bail!("wait for the current analysis to settle before switching models");
        }
        let oracles = Self::connect(text_model.as_deref(), image_model.as_deref(), out)?;
        let text_name = oracles.text_model.name.clone();
        let image_name = oracles.image_model.name.clone();
        self.orchestrator.set_oracles(oracles.text, oracles.image)?;
        if text_model.is_some() {
            self.text_model = Some(text_name.clone());
        }
        if image_model.is_some() {
            self.image_model = Some(image_name.clone());
        }
        record(
            &self.events,
            Event::ModelsChanged {
                text_model: text_name,
                image_model: image_name,
            },
        );
        Ok(())
    }

    /// Returns `false` when the session should end.
    fn handle(&mut self, command: &SessionCommand, out: &mut dyn Write) -> Result<bool> {
        self.orchestrator.pump();
        let outcome = self.dispatch(command, out);
        match outcome {
            Ok(keep_going) => Ok(keep_going),
            Err(err) => {
                writeln!(out, "{err:#}")?;
                Ok(true)
            }
        }
    }

    fn dispatch(&mut self, command: &SessionCommand, out: &mut dyn Write) -> Result<bool> {
        match command.action.as_str() {
            "noop" => {}
            "help" => writeln!(out, "Commands: {}", SESSION_HELP_COMMANDS.join(" "))?,
            "quit" => return Ok(false),
            "load_ligand" | "load_custom_receptor" | "load_experimental" => {
                let Some(path) = command.arg("path") else {
                    bail!("/{} requires a path", command_name(&command.action));
                };
                let path = Path::new(path);
                let loaded = match command.action.as_str() {
                    "load_ligand" => self.form.load_ligand(path)?,
                    "load_custom_receptor" => {
                        self.form.receptor = ReceptorOption::Custom;
                        self.form.load_custom_receptor(path)?
                    }
                    _ => self.form.load_experimental(path)?,
                };
                writeln!(
                    out,
                    "Loaded {} ({} chars)",
                    loaded.name,
                    loaded.content.chars().count()
                )?;
            }
            "clear_experimental" => {
                self.form.clear_experimental();
                writeln!(out, "Experimental data cleared.")?;
            }
            "set_receptor" => {
                let value = required_value(command)?;
                self.form.receptor = value.parse::<ReceptorOption>().map_err(anyhow::Error::msg)?;
                writeln!(out, "Receptor: {}", self.form.receptor)?;
            }
            "set_cancer_type" => {
                let value = required_value(command)?;
                self.form.cancer_type = value.parse::<CancerType>().map_err(anyhow::Error::msg)?;
                writeln!(out, "Cancer type: {}", self.form.cancer_type)?;
            }
            "set_cancer_class" => {
                let value = required_value(command)?;
                self.form.cancer_class =
                    value.parse::<CancerClass>().map_err(anyhow::Error::msg)?;
                writeln!(out, "Cancer class: {}", self.form.cancer_class)?;
            }
            "set_mutation" => {
                self.form.set_mutation(command.arg("value").unwrap_or_default());
                writeln!(
                    out,
                    "Mutation: {}",
                    if self.form.mutation.is_empty() {
                        "(none)"
                    } else {
                        self.form.mutation.as_str()
                    }
                )?;
            }
            "set_text_model" | "set_image_model" => {
                let value = Some(required_value(command)?.to_string());
                let (text_model, image_model) = if command.action == "set_text_model" {
                    (value, self.image_model.clone())
                } else {
                    (self.text_model.clone(), value)
                };
                self.switch_models(text_model, image_model, out)?;
                writeln!(
                    out,
                    "Models: {} / {}",
                    self.orchestrator.text_model(),
                    self.orchestrator.image_model()
                )?;
            }
            "show_form" => {
                for line in self.form.describe() {
                    writeln!(out, "  {line}")?;
                }
            }
            "submit" => {
                let request = self.form.submit()?;
                record(
                    &self.events,
                    Event::AnalysisRequested {
                        receptor: request.receptor_name(),
                        cancer_type: request.cancer_type.label().to_string(),
                        cancer_class: request.cancer_class.label().to_string(),
                        mutation: request.mutation.clone(),
                        has_experimental_data: request.experimental_data.is_some(),
                    },
                );
                let epoch = self.orchestrator.submit(request)?;
                self.last_line.clear();
                writeln!(out, "Submitted analysis #{epoch}.")?;
                print_progress(out, self.orchestrator.state(), &mut self.last_line);
            }
            "status" => writeln!(out, "{}", state_line(self.orchestrator.state()))?,
            "wait" => {
                let last_line = &mut self.last_line;
                self.orchestrator
                    .wait(|state| print_progress(out, state, last_line));
                print_progress(out, self.orchestrator.state(), &mut self.last_line);
            }
            "show_report" => {
                let state = self.orchestrator.state();
                match state.result() {
                    Some(result) => writeln!(out, "{}", render_text_report(result, state.images()))?,
                    None => writeln!(out, "{}", state_line(state))?,
                }
            }
            "reset" => {
                self.orchestrator.reset();
                self.last_line.clear();
                writeln!(out, "Results cleared.")?;
            }
            "export_report" => {
                let path = self.target_path(command, DEFAULT_REPORT_FILE_NAME);
                let Some(result) = self.orchestrator.state().result() else {
                    bail!("No analysis result to export.");
                };
                write_report(&path, result)?;
                record(
                    &self.events,
                    Event::ReportExported {
                        path: display_path(&path),
                    },
                );
                writeln!(out, "Report written to {}", path.display())?;
            }
            "export_html" => {
                let path = self.target_path(command, DEFAULT_HTML_FILE_NAME);
                let state = self.orchestrator.state();
                let Some(result) = state.result() else {
                    bail!("No analysis result to export.");
                };
                write_html_report(&path, result, state.images())?;
                record(
                    &self.events,
                    Event::HtmlExported {
                        path: display_path(&path),
                    },
                );
                writeln!(out, "HTML written to {}", path.display())?;
            }
            "save_images" => {
                let dir = command
                    .arg("path")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.out_dir.clone());
                let written = export_images(&dir, self.orchestrator.state().images())?;
                if written.is_empty() {
                    writeln!(out, "No images generated yet.")?;
                }
                for path in &written {
                    writeln!(out, "Saved {}", path.display())?;
                }
                record(
                    &self.events,
                    Event::ImagesExported {
                        dir: display_path(&dir),
                        count: written.len(),
                    },
                );
            }
            _ => {
                match command.arg("command") {
                    Some(name) => writeln!(out, "Unknown command: /{name}. Type /help.")?,
                    None => writeln!(out, "Commands start with '/'. Type /help.")?,
                }
            }
        }
        Ok(true)
    }

    fn target_path(&self, command: &SessionCommand, default_name: &str) -> PathBuf {
        command
            .arg("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.out_dir.join(default_name))
    }
}

fn required_value(command: &SessionCommand) -> Result<&str> {
    match command.arg("value") {
        Some(value) => Ok(value),
        None => bail!("/{} requires a value", command_name(&command.action)),
    }
}

fn command_name(action: &str) -> &str {
    match action {
        "load_ligand" => "ligand",
        "load_custom_receptor" => "receptor_file",
        "load_experimental" => "experimental",
        other => other.strip_prefix("set_").unwrap_or(other),
    }
}
