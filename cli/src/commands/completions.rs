use std::{fs::File, io};

use clap::CommandFactory;
use clap_complete::generate;

use crate::{
    cli::{Cli, CompletionsArgs},
    error::Result,
    ui,
};

pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();

    match args.output {
        Some(path) => {
            let mut file = File::create(&path)?;
            generate(args.shell, &mut cmd, bin, &mut file);
            ui::success(format!(
                "Wrote {} completions to {}",
                args.shell,
                path.display()
            ));
        }
        None => generate(args.shell, &mut cmd, bin, &mut io::stdout()),
    }
    Ok(())
}
