//! Languages subcommand - print the language catalog.

use eyre::Result;
use murmur_asr::token::Language;

pub fn execute() -> Result<()> {
    print!("{}", format_languages());
    Ok(())
}

/// One `code<TAB>name` line per language.
fn format_languages() -> String {
    Language::ALL
        .iter()
        .map(|language| format!("{}\t{}\n", language.iso_code(), language.name()))
        .collect()
}
