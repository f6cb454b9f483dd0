//! Filtering log CLI
//!
//! CLI tool for generating candidate patterns, composing and validating
//! filter rules, and replaying recorded filtering logs.

mod render;
mod replay;

use std::fs;

use clap::{Parser, Subcommand};

use fl_core::types::RequestType;
use fl_rules::syntax::AnchorType;
use fl_rules::{
    compose_rule, generate_patterns, parse_rule, ParsedRule, RuleKind, RuleModifiers, RuleValidator, UrlRuleSyntax,
};

use crate::replay::{cmd_replay, ReplayArgs};

#[derive(Parser)]
#[command(name = "fl-cli")]
#[command(about = "Filtering log inspection and rule building tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print candidate patterns for a request URL
    Patterns {
        /// Request URL
        url: String,

        /// Generate exception (@@||) patterns
        #[arg(short, long)]
        exception: bool,
    },

    /// Compose rule text from a pattern and modifiers
    Compose {
        /// Match pattern
        pattern: String,

        /// Restrict the rule to this site ($domain=)
        #[arg(short, long)]
        domain: Option<String>,

        /// Case-sensitive match ($match-case)
        #[arg(long)]
        match_case: bool,

        /// Third-party requests only ($third-party)
        #[arg(long)]
        third_party: bool,
    },

    /// Validate rules given inline or one per line in a file
    Validate {
        /// Rule text
        rules: Vec<String>,

        /// File with one rule per line
        #[arg(short, long)]
        input: Option<String>,
    },

    /// Replay a recorded filtering log and print the log table
    Replay(ReplayArgs),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Patterns { url, exception } => cmd_patterns(&url, exception),
        Commands::Compose {
            pattern,
            domain,
            match_case,
            third_party,
        } => cmd_compose(&pattern, domain.as_deref(), match_case, third_party),
        Commands::Validate { rules, input } => cmd_validate(&rules, input.as_deref()),
        Commands::Replay(args) => cmd_replay(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_patterns(url: &str, exception: bool) -> Result<(), String> {
    let kind = if exception { RuleKind::Exception } else { RuleKind::Block };
    let patterns = generate_patterns(url, kind.pattern_prefix());
    if patterns.is_empty() {
        return Err(format!("No host in '{}'", url));
    }
    for pattern in patterns {
        println!("{pattern}");
    }
    Ok(())
}

fn cmd_compose(pattern: &str, domain: Option<&str>, match_case: bool, third_party: bool) -> Result<(), String> {
    let mut modifiers = RuleModifiers::empty();
    modifiers.set(RuleModifiers::DOMAIN, domain.is_some());
    modifiers.set(RuleModifiers::MATCH_CASE, match_case);
    modifiers.set(RuleModifiers::THIRD_PARTY, third_party);

    let rule = compose_rule(pattern, domain.unwrap_or_default(), modifiers);
    let rule = UrlRuleSyntax.validate(&rule).map_err(|e| format!("Composed rule is invalid: {}", e))?;
    println!("{rule}");
    Ok(())
}

fn cmd_validate(rules: &[String], input: Option<&str>) -> Result<(), String> {
    let mut lines: Vec<String> = rules.to_vec();
    if let Some(path) = input {
        let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
        lines.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('!'))
                .map(String::from),
        );
    }
    if lines.is_empty() {
        return Err("No rules specified".to_string());
    }

    let mut invalid = 0usize;
    for line in &lines {
        match parse_rule(line) {
            Ok(rule) => println!("ok       {}  [{}]", rule.text, describe_rule(&rule)),
            Err(e) => {
                invalid += 1;
                println!("invalid  {line}: {e}");
            }
        }
    }

    println!();
    println!("{} rules, {} invalid", lines.len(), invalid);
    if invalid > 0 {
        return Err(format!("{} invalid rules", invalid));
    }
    Ok(())
}

/// One-line summary of what a rule applies to.
fn describe_rule(rule: &ParsedRule) -> String {
    let options = &rule.options;
    let mut parts = vec![if rule.whitelist { "exception" } else { "block" }.to_string()];

    match rule.anchor_type {
        AnchorType::Hostname => parts.push("host-anchored".to_string()),
        AnchorType::Left => parts.push("start-anchored".to_string()),
        AnchorType::None => {}
    }
    parts.push(format!("pattern {}", rule.pattern));

    if !options.permitted_domains.is_empty() || !options.restricted_domains.is_empty() {
        let domains: Vec<String> = options
            .permitted_domains
            .iter()
            .cloned()
            .chain(options.restricted_domains.iter().map(|d| format!("~{d}")))
            .collect();
        parts.push(format!("domains {}", domains.join("|")));
    }
    match options.third_party {
        Some(true) => parts.push("third-party".to_string()),
        Some(false) => parts.push("first-party".to_string()),
        None => {}
    }
    if !options.types.is_empty() {
        let types: Vec<&str> = RequestType::ALL
            .into_iter()
            .filter(|t| options.types.has(*t))
            .map(RequestType::as_str)
            .collect();
        parts.push(format!("types {}", types.join(",")));
    }
    if options.match_case {
        parts.push("match-case".to_string());
    }
    if options.important {
        parts.push("important".to_string());
    }
    parts.join(", ")
}
