//! Family-card extraction: the instruction and response schema sent to the
//! model, the Gemini client, and decoding of the reply into a record.

pub mod decode;
pub mod gemini;
pub mod mock;
pub mod prompt;

pub use decode::{parse_extraction, validate_shape};
pub use gemini::{GeminiExtractor, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use mock::MockExtractor;
pub use prompt::{response_schema, KK_EXTRACTION_PROMPT, MEMBER_FIELDS};
