use clap::{Parser, Subcommand};
use dicom_json_tool as tool;
use dimse::DataSet;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dicom-json",
    about = "Convert between DICOM Part 10 files and DICOM JSON"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Convert a DICOM file to DICOM JSON
    ToJson {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Convert a DICOM JSON file to a DICOM file
    FromJson {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::ToJson { input } => {
            let data_set = tool::read_part10(&input)?;
            println!("{}", serde_json::to_string_pretty(&data_set.to_json())?);
            Ok(())
        }
        Cmd::FromJson { input, output } => {
            let text = std::fs::read_to_string(&input)?;
            let v: serde_json::Value = serde_json::from_str(&text)?;
            let data_set = DataSet::from_json(&v)?;
            tool::write_part10(&output, &data_set)?;
            eprintln!("Wrote Part 10 file to {}", output.display());
            Ok(())
        }
    }
}
