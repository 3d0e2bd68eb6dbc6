#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("failed to build search index client: {source}")]
    Client { source: reqwest::Error },

    #[error("failed to deliver log document: {source}")]
    Delivery {
        #[from]
        source: reqwest::Error,
    },
}
