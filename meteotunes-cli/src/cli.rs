use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::Password;
use meteotunes_core::{
    Config, Coordinate, LoadService, NoopObserver, ProviderId, config::env_key_for,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteotunes", version, about = "Weather-driven images and songs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider.
    Configure {
        /// Provider short name: "openweather", "limewire" or "gemini".
        provider: String,
    },

    /// Run the HTTP server.
    Serve {
        /// Port to listen on; overrides config and $PORT.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Load weather, image and song for one coordinate and print the result.
    Load {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Serve { port } => {
                let mut config = Config::load()?;
                if let Some(port) = port {
                    config.server.port = port;
                }
                crate::server::run(&config).await
            }
            Command::Load { lat, lon } => {
                let coordinate = Coordinate::new(lat, lon)?;
                let service = LoadService::from_config(&Config::load()?)?;

                let out = service.load_coordinate(coordinate, &NoopObserver).await;
                println!("{}", out.status);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&out.body).context("Failed to render response")?
                );
                Ok(())
            }
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .with_help_message(&format!("Can also be set through ${}", env_key_for(id)))
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(anyhow!("API key for '{id}' must not be empty"));
    }

    config.upsert_provider_api_key(id, api_key);
    let path = config.save()?;
    println!("Saved {id} credentials to {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_with_negative_longitude() {
        let cli = Cli::try_parse_from(["meteotunes", "load", "--lat", "40.7", "--lon", "-74.0"])
            .expect("valid args");

        match cli.command {
            Command::Load { lat, lon } => {
                assert_eq!(lat, 40.7);
                assert_eq!(lon, -74.0);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_serve_port() {
        let cli = Cli::try_parse_from(["meteotunes", "serve", "--port", "9000"]).expect("valid args");
        assert!(matches!(cli.command, Command::Serve { port: Some(9000) }));
    }

    #[test]
    fn configure_rejects_unknown_provider() {
        let err = configure("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }
}
