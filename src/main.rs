use phoneintel::aggregator::Investigator;
use phoneintel::cli::{Cli, OutputFormat};
use phoneintel::config::Config;
use phoneintel::countries::CountryHint;
use phoneintel::errors::Result;
use phoneintel::output::TextFormatter;
use phoneintel::structured_output::InvestigationReport;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();
    init_logging(&cli);

    // Handle schema generation early exit
    if cli.generate_schema {
        match InvestigationReport::generate_json_schema() {
            Ok(schema) => println!("{schema}"),
            Err(e) => eprintln!("Error generating JSON schema: {e}"),
        }
        return Ok(());
    }

    let mut config = Config::from_env();
    config.merge_with_cli(&cli);
    if let Err(e) = config.validate() {
        if cli.error_enabled() {
            eprintln!("Configuration error: {e}");
        }
        return Ok(());
    }

    let hint = match CountryHint::parse(&cli.country) {
        Ok(hint) => hint,
        Err(e) => {
            if cli.error_enabled() {
                eprintln!("Error: {e}");
            }
            return Ok(());
        }
    };

    let number = cli.number.as_deref().unwrap_or_default();
    if cli.is_trace() {
        eprintln!("Investigating {number:?} with country hint {}", hint.label());
    }

    let show_attempts = config.output.show_attempts;
    let investigator = Investigator::new(config);
    let result = match investigator.investigate(number, &hint).await {
        Ok(result) => result,
        Err(e) => {
            if cli.error_enabled() {
                eprintln!("Error: {e}");
            }
            return Ok(());
        }
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(show_attempts);
            print!("{}", formatter.format_result(&result));
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let report = InvestigationReport::from(&result);
            let rendered = match cli.format {
                OutputFormat::Json => report.to_json(),
                OutputFormat::Yaml => report.to_yaml(),
                OutputFormat::Text => unreachable!(),
            };
            match rendered {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("Error formatting structured output: {e}");
                    return Ok(());
                }
            }
        }
    }

    if cli.warn_enabled() {
        for warning in &result.warnings {
            eprintln!("Warning: {warning}");
        }
    }

    Ok(())
}

/// Map the numeric verbosity levels onto the log filter; RUST_LOG still wins
/// when set.
fn init_logging(cli: &Cli) {
    let level = match cli.verbose {
        0 => "off",
        1 => "error",
        2 => "warn",
        3 | 4 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
