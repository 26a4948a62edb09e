use anyhow::Result;
use cadrural::filters::{digits_only, normalize, tokenize};
use clap::Args;
use comfy_table::Table;
use serde::Serialize;

use crate::help::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Text Normalization",
    commands: &[
        "cadrural normalize \"São José do Rio Preto\"   # Accent-free, lowercase form and tokens",
        "cadrural --output json normalize \"123.456.789-00\"",
    ],
}];

#[derive(Args)]
pub struct NormalizeArgs {
    /// Text to normalize
    pub text: String,
}

#[derive(Serialize)]
struct Normalized {
    original: String,
    normalizado: String,
    tokens: Vec<String>,
    digitos: String,
}

impl TableDisplay for Normalized {
    fn to_table(&self, output: &OutputManager) -> Vec<Table> {
        vec![output.key_value_table(
            &["Campo", "Valor"],
            &[
                ("original", self.original.clone()),
                ("normalizado", self.normalizado.clone()),
                ("tokens", self.tokens.join(" | ")),
                ("digitos", self.digitos.clone()),
            ],
        )]
    }
}

pub fn handle_normalize(args: NormalizeArgs, output: &OutputManager) -> Result<()> {
    let normalized = Normalized {
        normalizado: normalize(&args.text),
        tokens: tokenize(&args.text),
        digitos: digits_only(&args.text),
        original: args.text,
    };
    output.display(&normalized)
}
