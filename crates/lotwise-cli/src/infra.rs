use lotwise_application::config::Config;
use lotwise_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use lotwise_domain::repositories::market_data::MarketDataRepository;
use lotwise_infrastructure::artifacts::{FilesystemArtifactReader, FilesystemArtifactWriter};
use lotwise_infrastructure::market_data::CsvMarketDataRepository;

pub struct EngineDeps {
    pub market_data: Box<dyn MarketDataRepository>,
    pub artifacts: Box<dyn ArtifactWriter + Sync>,
}

pub fn build_engine_deps(config: &Config) -> EngineDeps {
    EngineDeps {
        market_data: build_market_data_repo(config),
        artifacts: build_artifact_writer(),
    }
}

pub fn build_artifact_writer() -> Box<dyn ArtifactWriter + Sync> {
    Box::new(FilesystemArtifactWriter::new())
}

pub fn build_market_data_repo(config: &Config) -> Box<dyn MarketDataRepository> {
    Box::new(CsvMarketDataRepository::new(config.paths.bars_csv.clone()))
}

pub fn build_artifact_reader() -> Box<dyn ArtifactReader> {
    Box::new(FilesystemArtifactReader::new())
}
