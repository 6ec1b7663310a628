use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::types::KartuKeluargaData;

/// Turns a photo of a family card into a household record.
///
/// Implementations are constructed once and injected where extraction
/// happens, so tests can substitute a fake.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Provider name (e.g., "gemini", "mock").
    fn name(&self) -> &str;

    /// Extract a record from a base64 data URI (or bare base64 payload).
    ///
    /// Birth dates in the result are already normalized to `DD/MM/YYYY`.
    async fn extract(&self, image_data_uri: &str) -> Result<KartuKeluargaData, ExtractionError>;
}
