use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub uploads_dir: String,
    pub database_path: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub transcription_model: String,
    pub enrichment_model: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;

        // OPENAI_API_KEY from the environment fills in when the file leaves
        // the key unset.
        if config.openai.api_key.is_none() {
            config.openai.api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.is_empty());
        }

        Ok(config)
    }
}
