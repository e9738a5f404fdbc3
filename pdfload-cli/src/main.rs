use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdfload::{ObjectKey, ParseOptions, PdfObject, PdfReader, Severity};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parent links followed when looking for an inherited attribute
const MAX_INHERITANCE_DEPTH: usize = 64;

#[derive(Parser)]
#[command(
    name = "pdfload",
    about = "Inspect the structure of PDF files",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args)]
struct LoadArgs {
    /// Input PDF file
    input: PathBuf,

    /// Fail on streams with a wrong /Length instead of keeping a best-effort payload
    #[arg(long)]
    strict: bool,

    /// Decode Flate, ASCIIHex and ASCII85 streams after loading
    #[arg(short, long)]
    decompress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Get information about a PDF file
    Info {
        #[command(flatten)]
        load: LoadArgs,

        /// List every diagnostic recorded while loading
        #[arg(long)]
        detailed: bool,
    },

    /// List the pages in document order
    Pages {
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Load every object and list them
    Objects {
        #[command(flatten)]
        load: LoadArgs,
    },

    /// Print one indirect object
    Show {
        #[command(flatten)]
        load: LoadArgs,

        /// Object number
        number: u32,

        /// Generation number
        #[arg(default_value_t = 0)]
        generation: u16,

        /// Print the stream payload instead of the dictionary
        #[arg(long)]
        raw: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Info { load, detailed } => {
            let mut reader = open(&load)?;
            print_info(&mut reader, &load.input, detailed)?;
        }
        Commands::Pages { load } => {
            let mut reader = open(&load)?;
            print_pages(&mut reader)?;
        }
        Commands::Objects { load } => {
            let mut reader = open(&load)?;
            reader.read_all().context("Failed to load objects")?;
            for key in reader.object_keys() {
                let Some(object) = reader.get(key) else {
                    println!("{:>6} {:<3} unresolved", key.number, key.generation);
                    continue;
                };
                match object.as_dict().and_then(|dict| dict.stream()) {
                    Some(data) => println!(
                        "{:>6} {:<3} stream ({} bytes)",
                        key.number,
                        key.generation,
                        data.len()
                    ),
                    None => println!("{:>6} {:<3} {}", key.number, key.generation, object.kind()),
                }
            }
            println!("\n{} objects, {} resolved", reader.object_count(), reader.resolved_count());
        }
        Commands::Show {
            load,
            number,
            generation,
            raw,
        } => {
            let mut reader = open(&load)?;
            let key = ObjectKey::new(number, generation);
            let object = reader
                .resolve(key)
                .with_context(|| format!("Failed to load object {key}"))?;

            if raw {
                let data = object
                    .as_dict()
                    .and_then(|dict| dict.stream())
                    .with_context(|| format!("Object {key} is not a stream"))?;
                use std::io::Write;
                std::io::stdout().write_all(data)?;
            } else {
                println!("{number} {generation} obj");
                println!("{}", render(object));
                println!("endobj");
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "pdfload=warn",
        1 => "pdfload=debug",
        _ => "pdfload=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open(load: &LoadArgs) -> Result<PdfReader> {
    let options = if load.strict {
        ParseOptions::strict()
    } else {
        ParseOptions::lenient()
    }
    .with_decompress(load.decompress);

    PdfReader::open_with_options(&load.input, options)
        .with_context(|| format!("Failed to parse PDF {}", load.input.display()))
}

fn print_info(reader: &mut PdfReader, input: &Path, detailed: bool) -> Result<()> {
    println!("PDF Information: {}", input.display());
    println!("========================================");
    println!("Version: {}", reader.version());
    if reader.header().offset > 0 {
        println!("Header offset: {}", reader.header().offset);
    }
    println!("Pages: {}", reader.page_count());
    println!("Xref entries: {}", reader.xref_len());

    let trailer = reader.trailer().clone();
    if let Some(size) = trailer.size() {
        println!("Trailer /Size: {size}");
    }
    if let Some(root) = trailer.root() {
        println!("Root: {}", render(root));
    }
    println!("Encrypted: {}", if trailer.is_encrypted() { "yes" } else { "no" });

    if let Some(info_key) = trailer.info() {
        let info = reader.resolve(info_key)?.clone();
        if let Some(info) = info.as_dict() {
            println!("\nDocument Information:");
            println!("---------------------");
            for (name, value) in info.iter() {
                let value = reader.resolve_value(value)?;
                println!("{}: {}", name.as_str(), render(value));
            }
        }
    }

    let diagnostics = reader.diagnostics();
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    println!(
        "\nDiagnostics: {} warnings, {} errors",
        diagnostics.len() - errors,
        errors
    );
    if detailed {
        for diagnostic in diagnostics {
            println!("  {diagnostic}");
        }
    }

    Ok(())
}

fn print_pages(reader: &mut PdfReader) -> Result<()> {
    let entries = reader.page_entries().to_vec();
    for (index, entry) in entries.iter().enumerate() {
        let label = match entry.as_reference() {
            Some(key) => key.to_string(),
            None => "inline".to_string(),
        };
        let media_box = inherited(reader, entry, "MediaBox")?
            .map(|media_box| render(&media_box))
            .unwrap_or_else(|| "-".to_string());
        println!("Page {}: {label} MediaBox {media_box}", index + 1);
    }
    println!("\n{} pages", entries.len());
    Ok(())
}

/// Look `name` up on a page, then on its ancestors
fn inherited(reader: &mut PdfReader, page: &PdfObject, name: &str) -> Result<Option<PdfObject>> {
    let mut node = page.clone();
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let Some(dict) = reader.resolve_value(&node)?.as_dict() else {
            return Ok(None);
        };
        if let Some(value) = dict.get(name).cloned() {
            return Ok(Some(reader.resolve_value(&value)?.clone()));
        }
        match dict.get("Parent").cloned() {
            Some(parent) => node = parent,
            None => return Ok(None),
        }
    }
    Ok(None)
}

/// PDF-like rendering of a value, with stream payloads summarized
fn render(object: &PdfObject) -> String {
    match object {
        PdfObject::Null => "null".to_string(),
        PdfObject::Boolean(b) => b.to_string(),
        PdfObject::Integer(i) => i.to_string(),
        PdfObject::Real(r) => r.to_string(),
        PdfObject::String(s) => match s.as_str() {
            Ok(text) => format!("({text})"),
            Err(_) => format!(
                "<{}>",
                s.as_bytes().iter().map(|b| format!("{b:02X}")).collect::<String>()
            ),
        },
        PdfObject::Name(name) => name.to_string(),
        PdfObject::Reference(key) => key.to_string(),
        PdfObject::Array(array) => {
            let items: Vec<String> = array.iter().map(render).collect();
            format!("[{}]", items.join(" "))
        }
        PdfObject::Dictionary(dict) => {
            let entries: Vec<String> = dict
                .iter()
                .map(|(name, value)| format!("{name} {}", render(value)))
                .collect();
            let mut text = format!("<< {} >>", entries.join(" "));
            if let Some(data) = dict.stream() {
                text.push_str(&format!("\nstream ({} bytes)", data.len()));
            }
            text
        }
    }
}
