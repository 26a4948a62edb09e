//! Help text extras: per-command examples and the top-level appendix.

use std::fmt::Write;

use clap::{ColorChoice, Command, CommandFactory};

use crate::Cli;
use crate::commands::{dashboard, normalize, seed, serve};
use crate::style::{ARROW, PALETTE, colors_enabled, help_styles, paint};

/// Titled list of example invocations shown under a subcommand's `--help`.
#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

const ENVIRONMENT: &[(&str, &str)] = &[
    ("CADRURAL_CONFIG", "Path of the config file (default: ./cadrural.toml)"),
    ("REDIS_URL", "Redis URL, referenced from the config as url = \"${REDIS_URL}\""),
    ("RUST_LOG", "Log filter, overrides --verbose / --quiet"),
];

fn examples_for(subcommand: &str) -> Option<&'static [ExampleGroup]> {
    match subcommand {
        "serve" => Some(serve::EXAMPLES),
        "normalize" => Some(normalize::EXAMPLES),
        "seed" => Some(seed::EXAMPLES),
        "dashboard" => Some(dashboard::EXAMPLES),
        _ => None,
    }
}

/// The clap command with styles, appendix and examples attached.
pub fn command() -> Command {
    let colors = colors_enabled();
    let mut command = Cli::command()
        .styles(help_styles())
        .color(if colors { ColorChoice::Auto } else { ColorChoice::Never })
        .after_long_help(appendix(colors));

    for subcommand in command.get_subcommands_mut() {
        if let Some(groups) = examples_for(subcommand.get_name()) {
            *subcommand = subcommand.clone().after_long_help(render_examples(groups, colors));
        }
    }
    command
}

fn render_examples(groups: &[ExampleGroup], colors: bool) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", paint("Examples:", PALETTE.heading, true, colors));
    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            text.push('\n');
        }
        let _ = writeln!(text, "  {}", paint(group.title, PALETTE.title, true, colors));
        for line in group.commands {
            let _ = writeln!(
                text,
                "    {} {}",
                paint(ARROW, PALETTE.command, false, colors),
                paint(line, PALETTE.command, false, colors)
            );
        }
    }
    text
}

fn appendix(colors: bool) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", paint("Environment Variables:", PALETTE.heading, true, colors));
    for (key, description) in ENVIRONMENT {
        let _ = writeln!(
            text,
            "  {}  {}",
            paint(key, PALETTE.env_key, true, colors),
            paint(description, PALETTE.env_text, false, colors)
        );
    }
    let _ = writeln!(
        text,
        "\n{} {}",
        paint("Tip:", PALETTE.heading, true, colors),
        paint("'cadrural <command> --help' lists examples for each command.", PALETTE.command, false, colors)
    );
    text
}
