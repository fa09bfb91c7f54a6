//! External collaborator interfaces and their reference implementations.

pub mod auth;
pub mod estimator;
pub mod extractor;
pub mod fetcher;

pub use auth::{AuthProvider, AuthSession, SessionArtifacts, StaticCredentialProvider};
pub use estimator::{KeywordEstimator, ValueEstimator};
pub use extractor::{ContentExtractor, ExtractedContent, HtmlExtractor, LinkExtractor, RawLink};
pub use fetcher::{FetchOptions, FetchResponse, Fetcher, ReqwestFetcher};
