use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use xiaoliuren::clock;
use xiaoliuren::engine::{AnalysisOutcome, OracleEngine, PageView, Reading, SubmissionForm};
use xiaoliuren::error::ANALYSIS_UNAVAILABLE_MESSAGE;
use xiaoliuren::session::{SessionId, SessionStore};
use xiaoliuren::{OracleConfig, OracleError};

#[derive(Parser)]
#[command(name = "xiaoliuren", version, about = "小六壬: three numbers, three elements")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show today's date and the current double-hour
    Now,
    /// Cast one reading
    #[command(allow_negative_numbers = true)]
    Ask {
        n1: Option<String>,
        n2: Option<String>,
        n3: Option<String>,
        /// Topic passed to the analysis backend
        #[arg(long, short)]
        keyword: Option<String>,
        /// Read 12 / month / day instead of the numbers
        #[arg(long)]
        heavenly_union: bool,
    },
    /// Read submissions from stdin within one throttled session
    ///
    /// Each line is `n1 n2 n3 [keyword]`, or `天合` for a heavenly union
    /// reading.
    Session {
        #[arg(long, default_value = "stdin")]
        id: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let config = match OracleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    let engine = match OracleEngine::from_config(&config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    match cli.command.unwrap_or(Command::Now) {
        Command::Now => {
            print_page(&engine.page_view_now());
            ExitCode::SUCCESS
        }
        Command::Ask {
            n1,
            n2,
            n3,
            keyword,
            heavenly_union,
        } => {
            let form = SubmissionForm {
                n1,
                n2,
                n3,
                keyword,
                heavenly_union,
            };
            let store = SessionStore::new();
            let today = clock::local_now().date();
            match engine.submit_in(&store, &SessionId::new("cli"), &form, today) {
                Ok(reading) => {
                    print_page(&engine.page_view_now());
                    print_reading(&reading);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    print_error(&e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Session { id } => match run_session(&engine, SessionId::new(id)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("stdin: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_session(engine: &OracleEngine, id: SessionId) -> io::Result<()> {
    let store = SessionStore::new();
    print_page(&engine.page_view_now());
    prompt()?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }

        let form = parse_line(line);
        let today = clock::local_now().date();
        match engine.submit_in(&store, &id, &form, today) {
            Ok(reading) => print_reading(&reading),
            Err(e) => print_error(&e),
        }
        prompt()?;
    }
    Ok(())
}

fn parse_line(line: &str) -> SubmissionForm {
    if matches!(line, "天合" | "heavenly" | "heavenly_union") {
        return SubmissionForm::heavenly_union();
    }
    let mut parts = line.split_whitespace().map(str::to_string);
    SubmissionForm {
        n1: parts.next(),
        n2: parts.next(),
        n3: parts.next(),
        keyword: {
            let rest: Vec<String> = parts.collect();
            (!rest.is_empty()).then(|| rest.join(" "))
        },
        heavenly_union: false,
    }
}

fn prompt() -> io::Result<()> {
    let mut out = io::stdout();
    write!(out, "> ")?;
    out.flush()
}

fn print_page(view: &PageView) {
    println!("{}  {}", view.date, view.time_period);
}

fn print_reading(reading: &Reading) {
    for (i, element) in reading.elements.as_array().iter().enumerate() {
        println!("{}. {}", i + 1, element);
    }
    match &reading.analysis {
        AnalysisOutcome::NotRequested => {}
        AnalysisOutcome::Generated(text) => println!("\n{}", text),
        AnalysisOutcome::Unavailable(reason) => {
            log::warn!("analysis unavailable: {}", reason);
            println!("\n{}", ANALYSIS_UNAVAILABLE_MESSAGE);
        }
    }
}

fn print_error(err: &OracleError) {
    log::debug!("submission rejected: {}", err);
    println!("{}", err.user_message());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_with_three_numbers() {
        let form = parse_line("12 7 3");
        assert_eq!(form, SubmissionForm::numbers("12", "7", "3"));
        assert_eq!(form.keyword, None);
    }

    #[test]
    fn trailing_words_become_keyword() {
        let form = parse_line("1 2 3 新 工作  機會");
        assert_eq!(form.n3.as_deref(), Some("3"));
        assert_eq!(form.keyword.as_deref(), Some("新 工作 機會"));
    }

    #[test]
    fn missing_fields_stay_unset() {
        let form = parse_line("8");
        assert_eq!(form.n1.as_deref(), Some("8"));
        assert_eq!(form.n2, None);
        assert_eq!(form.n3, None);
        assert!(!form.heavenly_union);
    }

    #[test]
    fn heavenly_union_keywords() {
        for line in ["天合", "heavenly", "heavenly_union"] {
            assert_eq!(parse_line(line), SubmissionForm::heavenly_union());
        }
        assert!(!parse_line("天合 1").heavenly_union);
    }
}
