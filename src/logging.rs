use std::io::Write;

use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};

/// Map `-v` occurrences to a level filter.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Error, // default: only errors
        1 => LevelFilter::Info,  // -v: info and up
        2 => LevelFilter::Debug, // -vv: debug and up
        _ => LevelFilter::Trace, // -vvv: trace and up
    }
}

pub fn init_logger(verbosity: u8) {
    let mut builder = Builder::new();
    builder.filter_level(level_for(verbosity));
    builder.target(env_logger::Target::Stderr);

    builder.format(|buf, record| {
        let level_label = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn  => "WARN ".yellow().bold(),
            Level::Info  => "INFO ".white().bold(),
            Level::Debug => "DEBUG".bright_black(),
            Level::Trace => "TRACE".bright_black(),
        };

        writeln!(buf, "{} {}", level_label, record.args())
    });

    builder.try_init().ok();
}
