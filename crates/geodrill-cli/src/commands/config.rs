use crate::cli::{ConfigArgs, ConfigCommand};
use crate::config::load_config;
use crate::output::OutputWriter;
use anyhow::Result;
use geodrill_core::config::CliConfigOverrides;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(args: ConfigArgs, config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(config_path, output),
    }
}

fn show(config_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let config = load_config(config_path, CliConfigOverrides::default())?;

    let mut rows: Vec<ConfigRow> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    output.section("Poll Worker Configuration");
    output.table(rows)
}
