//! List command - show available features.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also show how each feature is executed
    #[arg(short, long)]
    pub long: bool,
}

/// Run the list command.
pub async fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let features = vigil_features::all()?;

    if ctx.json_output {
        let names: Vec<&str> = features.iter().map(|f| f.name()).collect();
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    for feature in &features {
        if args.long || ctx.verbose {
            println!(
                "{:<24} {}",
                feature.name(),
                feature.execution().describe()
            );
        } else {
            println!("{}", feature.name());
        }
    }
    Ok(())
}
