use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "librac", version, about = "The Libra language front end")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and type-check a source file, printing diagnostics
    Check {
        /// Source file path
        file: PathBuf,
        /// Emit diagnostics as JSON
        #[arg(long)]
        json: bool,
        /// Render diagnostics with underlined source snippets
        #[arg(long)]
        pretty: bool,
    },
    /// Parse a source file and print the reconstructed source
    Parse {
        /// Source file path
        file: PathBuf,
    },
    /// Dump the token stream of a source file
    Tokens {
        /// Source file path
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file, json, pretty } => {
            let (_, diagnostics) = match librac::check_file(&file) {
                Ok(result) => result,
                Err(err) => {
                    eprintln!("error: {err}");
                    std::process::exit(1);
                }
            };

            if json {
                match serde_json::to_string_pretty(&diagnostics.diagnostics) {
                    Ok(rendered) => println!("{rendered}"),
                    Err(err) => {
                        eprintln!("error: could not serialize diagnostics: {err}");
                        std::process::exit(1);
                    }
                }
            } else if pretty {
                diagnostics.eprint_pretty();
            } else {
                let mut stdout = std::io::stdout();
                let _ = diagnostics.print_all(&mut stdout);
            }

            if diagnostics.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::Parse { file } => {
            let source = read(&file);
            let name = file.file_stem().and_then(|s| s.to_str()).unwrap_or("main");
            let (program, diagnostics) = librac::parse_source(name, &source);

            print!("{}", librac::pretty::pretty_print(&program));
            let mut stderr = std::io::stderr();
            let _ = diagnostics.print_all(&mut stderr);

            if diagnostics.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::Tokens { file } => {
            let source = read(&file);
            let mut diagnostics = librac::DiagnosticManager::new();
            diagnostics.add_file(file.display().to_string(), &source);
            let tokens = librac::lexer::lex(&source, 0, &mut diagnostics);

            for token in &tokens {
                println!(
                    "{:<24} {:?} at {}:{}{}",
                    format!("{:?}", token.kind),
                    token.lexeme,
                    token.span.line,
                    token.span.column,
                    if token.leading_newline { " (newline)" } else { "" },
                );
            }
            let mut stderr = std::io::stderr();
            let _ = diagnostics.print_all(&mut stderr);

            if diagnostics.has_errors() {
                std::process::exit(1);
            }
        }
    }
}

fn read(path: &PathBuf) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("error: could not read '{}': {err}", path.display());
        std::process::exit(1);
    })
}
