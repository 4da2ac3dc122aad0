use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfcos::parser::{
    Lexer, MemoryStream, ObjectRef, PdfObject, PdfStream, Token, CONTENT_STREAM_OPERATORS,
};
use pdfcos::{CosReader, ParseOptions};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdfcos",
    about = "Inspect the object syntax of PDF files",
    version,
    author
)]
struct Cli {
    /// Log recovered problems (-v warnings, -vv notes, -vvv recovery decisions)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header, linearization and trailer information
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// List every indirect object found in the file
    Objects {
        /// Input PDF file
        input: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one indirect object, with decoded data for streams
    Show {
        /// Input PDF file
        input: PathBuf,

        /// Object number
        num: u32,

        /// Generation number
        #[arg(default_value_t = 0)]
        gen: u16,

        /// Write the encoded stream data instead of decoding it
        #[arg(long)]
        raw: bool,

        /// Write stream data to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the token sequence of a file
    Tokens {
        /// Input file (a PDF file or a bare content stream)
        input: PathBuf,

        /// Use the content stream operator table to split commands
        #[arg(long)]
        content: bool,

        /// Stop after this many tokens
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(input: &Path) -> Result<CosReader> {
    tracing::debug!(path = %input.display(), "opening document");
    CosReader::open(input).with_context(|| format!("Failed to open {}", input.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => info(&input),
        Commands::Objects { input, json } => objects(&input, json),
        Commands::Show {
            input,
            num,
            gen,
            raw,
            output,
        } => show(&input, ObjectRef::new(num, gen), raw, output.as_deref()),
        Commands::Tokens {
            input,
            content,
            limit,
        } => tokens(&input, content, limit),
    }
}

fn info(input: &Path) -> Result<()> {
    let reader = open(input)?;
    let header = reader.header();

    println!("File: {}", input.display());
    println!("Size: {} bytes", reader.len());
    println!("PDF Version: {}", header.version);
    if header.offset > 0 {
        println!("Header offset: {}", header.offset);
    }
    println!("Binary marker: {}", if header.has_binary_marker { "yes" } else { "no" });

    match reader.linearization()? {
        Some(linearization) => {
            println!("Linearized: yes");
            println!("  Pages: {}", linearization.num_pages);
            println!("  First page object: {}", linearization.object_number_first);
            println!("  Hint stream: {:?}", linearization.hints);
        }
        None => println!("Linearized: no"),
    }

    let (objects, warnings) = reader.objects_with_warnings()?;
    println!("Objects: {}", objects.len());
    let streams = objects
        .iter()
        .filter(|(_, obj)| matches!(obj, PdfObject::Stream(_)))
        .count();
    println!("Streams: {streams}");

    if let Some(trailer) = reader.trailer()? {
        println!("Trailer: {trailer}");
    }

    if !warnings.is_empty() {
        println!("\nWarnings: {}", warnings.len());
        for warning in &warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}

fn filter_names(stream: &PdfStream) -> Vec<String> {
    match stream.dict().get2("Filter", "F") {
        Some(PdfObject::Name(name)) => vec![name.to_string()],
        Some(PdfObject::Array(filters)) => filters.iter().map(ToString::to_string).collect(),
        _ => Vec::new(),
    }
}

fn objects(input: &Path, as_json: bool) -> Result<()> {
    let reader = open(input)?;
    let objects = reader.objects()?;

    if as_json {
        let listing: Vec<_> = objects
            .iter()
            .map(|(reference, obj)| {
                let mut entry = json!({
                    "num": reference.num,
                    "gen": reference.gen,
                    "type": obj.type_name(),
                });
                if let PdfObject::Stream(stream) = obj {
                    entry["offset"] = json!(stream.start());
                    entry["length"] = json!(stream.length());
                    entry["filters"] = json!(filter_names(stream));
                }
                if let Some(dict_type) = obj_type(obj) {
                    entry["subtype"] = json!(dict_type);
                }
                entry
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for (reference, obj) in objects.iter() {
        let mut line = format!("{} {} obj  {}", reference.num, reference.gen, obj.type_name());
        if let Some(dict_type) = obj_type(obj) {
            line.push_str(&format!(" /{dict_type}"));
        }
        if let PdfObject::Stream(stream) = obj {
            line.push_str(&format!(" [{} bytes", stream.length()));
            let filters = filter_names(stream);
            if !filters.is_empty() {
                line.push_str(&format!(", {}", filters.join(" ")));
            }
            line.push(']');
        }
        println!("{line}");
    }
    Ok(())
}

/// The /Type of a dictionary or stream dictionary
fn obj_type(obj: &PdfObject) -> Option<&str> {
    match obj {
        PdfObject::Dictionary(dict) => dict.get_type(),
        PdfObject::Stream(stream) => stream.dict().get_type(),
        _ => None,
    }
}

fn show(input: &Path, reference: ObjectRef, raw: bool, output: Option<&Path>) -> Result<()> {
    let reader = open(input)?;
    let obj = reader.object(reference)?;

    let stream = match &obj {
        PdfObject::Stream(stream) => stream,
        other => {
            println!("{} {} obj\n{other}\nendobj", reference.num, reference.gen);
            return Ok(());
        }
    };

    let data = if raw {
        stream.raw_data()?
    } else {
        stream.decode()?
    };
    match output {
        Some(path) => {
            std::fs::write(path, &data)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", stream.dict());
            println!("✓ {} bytes written to {}", data.len(), path.display());
        }
        None => {
            println!("{}", stream.dict());
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn tokens(input: &Path, content: bool, limit: Option<usize>) -> Result<()> {
    let data =
        std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let mut lexer = Lexer::with_options(MemoryStream::new(data), ParseOptions::lenient());
    if content {
        lexer = lexer.with_known_commands(&CONTENT_STREAM_OPERATORS);
    }

    let mut stdout = std::io::stdout().lock();
    let mut count = 0;
    while limit.map_or(true, |limit| count < limit) {
        let position = lexer.position();
        let token = lexer.next_token()?;
        let text = match &token {
            Token::Eof => break,
            Token::Boolean(b) => format!("boolean {b}"),
            Token::Integer(i) => format!("integer {i}"),
            Token::Real(r) => format!("real {r}"),
            Token::String(bytes) => format!("string {}", String::from_utf8_lossy(bytes)),
            Token::Name(name) => format!("name {name}"),
            Token::Command(cmd) => format!("command {cmd}"),
            Token::Null => "null".to_string(),
        };
        writeln!(stdout, "{position:>8}  {text}")?;
        count += 1;
    }
    tracing::debug!(count, warnings = lexer.warnings().len(), "tokenized input");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_show_arguments() {
        let cli = Cli::try_parse_from(["pdfcos", "show", "doc.pdf", "4", "--raw"]).unwrap();
        match cli.command {
            Commands::Show { num, gen, raw, .. } => {
                assert_eq!((num, gen, raw), (4, 0, true));
            }
            _ => panic!("expected the show command"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["pdfcos", "info", "doc.pdf", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_rejects_bad_object_number() {
        assert!(Cli::try_parse_from(["pdfcos", "show", "doc.pdf", "four"]).is_err());
    }
}
