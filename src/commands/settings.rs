use crate::config::{AppConfig, ConfigCommand};
use std::io::Write;

pub fn run(command: ConfigCommand, config: &AppConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Get => {
            write!(out, "{}", config.to_yaml()?)?;
        }
        ConfigCommand::Set { assignment } => {
            let mut updated = config.clone();
            updated.set(&assignment)?;
            writeln!(out, "Writing configuration to {}", updated.config_file.display())?;
            updated.write(&updated.config_file)?;
        }
    }
    Ok(())
}
