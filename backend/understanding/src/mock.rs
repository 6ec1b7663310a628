use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use kkscan_core::{ExtractionError, Extractor, KartuKeluargaData};

use crate::decode::parse_extraction;

/// An extractor that replies with a canned model response. The reply goes
/// through the same decoding as a live one.
pub struct MockExtractor {
    name: String,
    fixed_response: Option<String>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed_response: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_record(self, record: &KartuKeluargaData) -> Self {
        let json = serde_json::to_string(record).unwrap_or_default();
        self.with_response(json)
    }

    /// Every call fails with a transport error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, image_data_uri: &str) -> Result<KartuKeluargaData, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::Request("mock failure".into()));
        }
        if image_data_uri.trim().is_empty() {
            return Err(ExtractionError::InvalidImage("empty image payload".into()));
        }
        parse_extraction(self.fixed_response.as_deref().unwrap_or("{}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_reply_is_decoded() {
        let mock = MockExtractor::new("mock").with_response(
            r#"{"nomorKK":"1","anggotaKeluarga":[{"namaLengkap":"Ani","tanggalLahir":"2012-01-05"}]}"#,
        );
        let record = mock.extract("data:image/png;base64,AA").await.unwrap();
        assert_eq!(record.nomor_kk, "1");
        assert_eq!(record.anggota_keluarga[0].tanggal_lahir, "05/01/2012");
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_default_reply_is_empty_record() {
        let record = MockExtractor::new("mock").extract("AA").await.unwrap();
        assert_eq!(record, KartuKeluargaData::default());
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockExtractor::new("mock").failing();
        assert!(matches!(
            mock.extract("AA").await,
            Err(ExtractionError::Request(_))
        ));
    }
}
