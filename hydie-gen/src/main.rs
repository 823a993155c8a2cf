use std::{
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use ariadne::{ColorGenerator, Config, IndexType, Label, Report, ReportKind, Source};
use clap::{ArgAction, Parser as ClapParser};
use hydie::{
    emit::{Emitter, render},
    resolve::{ResolvedSchema, Resolver},
    schema::{document::SchemaDocument, standard},
    utils::Error,
};
use log::info;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

mod logger;

#[derive(ClapParser)]
#[command(version, about = "Compile a DWARF entry schema into accessor artifacts")]
pub struct Arguments {
    /// Schema document to compile (defaults to the embedded DWARF schema)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Directory the rendered files are written to (stdout if omitted)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Only validate and resolve the schema
    #[arg(long)]
    check: bool,

    /// Fail if resolution produced any diagnostic
    #[arg(long)]
    deny_warnings: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Print a fatal error, with a source excerpt when the error has a span.
fn report(error: &Error, source: Option<&str>) {
    if let (Error::DocumentParse { file, message, span: Some(span) }, Some(source)) = (error, source)
    {
        let mut colors = ColorGenerator::new();
        let a = colors.next();
        let span = (file.clone(), span.clone());

        let printed = Report::build(ReportKind::Error, span.clone())
            .with_config(Config::default().with_index_type(IndexType::Byte))
            .with_message(format!("Failed to parse schema document {file}"))
            .with_label(Label::new(span).with_message(message).with_color(a))
            .finish()
            .eprint((file.clone(), Source::from(source)));
        if printed.is_ok() {
            return;
        }
    }

    print_error(error);
}

fn print_error(message: impl std::fmt::Display) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true));
    let _ = write!(stderr, "error");
    let _ = stderr.reset();
    let _ = writeln!(stderr, ": {message}");
}

fn load(path: Option<&Path>) -> Result<ResolvedSchema, (Error, Option<String>)> {
    let (file, source) = match path {
        Some(path) => {
            let file = path.display().to_string();
            let source = std::fs::read_to_string(path).map_err(|e| {
                let error = Error::DocumentRead {
                    file: file.clone(),
                    message: e.to_string(),
                };
                (error, None)
            })?;
            (file, source)
        }
        None => (
            standard::STANDARD_SCHEMA_NAME.to_string(),
            standard::STANDARD_SCHEMA_SOURCE.to_string(),
        ),
    };

    let graph = SchemaDocument::from_toml_str(&file, &source)
        .and_then(SchemaDocument::into_graph)
        .map_err(|e| (e, Some(source)))?;
    info!("Loaded schema from {file}");
    Ok(Resolver::new(graph).resolve())
}

fn write_files(out_dir: &Path, files: &[render::RenderedFile]) -> std::io::Result<()> {
    std::fs::create_dir_all(out_dir)?;
    for file in files {
        let path = out_dir.join(file.name);
        std::fs::write(&path, &file.contents)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_files(schema: &ResolvedSchema) -> std::io::Result<()> {
    let artifacts = Emitter::new(schema).emit();
    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut stdout = stdout.lock();
    for (name, doc) in render::documents(&artifacts) {
        writeln!(stdout, "// ==> {name} <==")?;
        render::render_colored(&doc, &mut stdout)?;
        writeln!(stdout)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    logger::init(args.verbose);

    let schema = match load(args.schema.as_deref()) {
        Ok(schema) => schema,
        Err((error, source)) => {
            report(&error, source.as_deref());
            return ExitCode::FAILURE;
        }
    };

    let diagnostics = schema.diagnostics().len();
    if args.deny_warnings && diagnostics > 0 {
        print_error(format!(
            "resolution produced {diagnostics} diagnostic(s) and --deny-warnings is set"
        ));
        return ExitCode::FAILURE;
    }

    if args.check {
        println!(
            "{} kinds, {} categories, {} diagnostics",
            schema.kinds().count(),
            schema.categories().count(),
            diagnostics
        );
        return ExitCode::SUCCESS;
    }

    let written = match &args.out_dir {
        Some(out_dir) => {
            let artifacts = Emitter::new(&schema).emit();
            write_files(out_dir, &render::render(&artifacts))
        }
        None => print_files(&schema),
    };

    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(format!("failed to write output: {e}"));
            ExitCode::FAILURE
        }
    }
}
