use std::path::Path;

use clap::Parser;

/// 4th-down decision bot
#[derive(Parser, Debug, Clone)]
#[command(name = "fourth-down-bot", version, about)]
pub struct Config {
    /// Directory holding the historical lookup tables (CSV)
    #[arg(long, env = "FOURTH_DOWN_DATA_DIR", default_value = "data")]
    pub data_dir: String,

    /// Win-probability model artifact (JSON: features, coefficients, scaler)
    #[arg(
        long,
        env = "FOURTH_DOWN_MODEL_PATH",
        default_value = "models/win_probability.json"
    )]
    pub model_path: String,

    /// Evaluate a single situation from a JSON file and exit
    #[arg(long)]
    pub situation: Option<String>,

    /// Evaluate one randomly generated situation (debugging) and exit
    #[arg(long, default_value = "false")]
    pub random: bool,

    /// Print the full response as pretty JSON instead of a summary
    #[arg(long, default_value = "false")]
    pub json: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !Path::new(&self.data_dir).is_dir() {
            anyhow::bail!("data directory not found: {}", self.data_dir);
        }
        if !Path::new(&self.model_path).is_file() {
            anyhow::bail!("model artifact not found: {}", self.model_path);
        }
        if self.random && self.situation.is_some() {
            anyhow::bail!("--random and --situation are mutually exclusive");
        }
        if let Some(path) = &self.situation {
            if !Path::new(path).is_file() {
                anyhow::bail!("situation file not found: {}", path);
            }
        }
        Ok(())
    }
}
