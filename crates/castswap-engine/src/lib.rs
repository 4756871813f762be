pub mod config;
pub mod credentials;
pub mod gemini;
pub mod ingest;
pub mod request;
pub mod response;
pub mod studio;

pub use config::StudioConfig;
pub use credentials::{ApiKeyStore, CredentialProvider};
pub use gemini::{CompositeGenerator, GeminiImageClient, GenerationOutcome};
pub use request::CompositeRequest;
pub use studio::{PersonUploadReport, Studio, DEFAULT_RESULT_FILE_NAME};
