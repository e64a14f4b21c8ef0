use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::{Cell, RefCell};
use std::io;
use std::time::Duration;

use chatstream::cli_args::Cli;
use chatstream::config::Config;
use chatstream::logging::init_logger;
use chatstream::render::AnswerPrinter;
use chatstream::setup::{build_decoder, build_payload, build_transport};

fn waiting_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("waiting for answer...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let cfg = Config::from_sources(&cli);
    log::info!("Completion endpoint: {}", cfg.completion_url());

    let payload = build_payload(&cli)?;
    let transport = build_transport(&cfg)?;

    let spinner = waiting_spinner();
    let printer = RefCell::new(AnswerPrinter::new(io::stdout()));
    let write_error: RefCell<Option<io::Error>> = RefCell::new(None);
    let completed = Cell::new(false);

    let mut decoder = build_decoder(&cfg);
    decoder.set_answer_callback(|update| {
        spinner.finish_and_clear();
        if let Err(e) = printer.borrow_mut().update(update) {
            write_error.borrow_mut().get_or_insert(e);
        }
    });
    decoder.set_complete_callback(|| {
        log::debug!("End-of-stream marker received");
        completed.set(true);
    });

    let result = decoder.start_session(&transport, payload);
    decoder.cleanup();
    drop(decoder);
    spinner.finish_and_clear();

    let response = result.context("chat request failed")?;
    if let Some(e) = write_error.into_inner() {
        return Err(e).context("failed to write answer to stdout");
    }

    printer
        .borrow_mut()
        .finish(cli.show_references)
        .context("failed to write answer to stdout")?;

    if !completed.get() {
        log::warn!(
            "Stream closed (HTTP {}) without an end-of-stream marker",
            response.status
        );
    }

    Ok(())
}
