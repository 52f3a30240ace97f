pub mod calendar;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pipeline;
pub mod quote;
pub mod text;

pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::fields::{FieldValue, QuotationFields, SubmissionFields};
pub use domain::labels::{CommonItem, DerivedKey};
pub use domain::trial::TrialType;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use pipeline::{
    DeliveryReport, DeliverySettings, DocumentHandle, DocumentWriter, Notification, Notifier,
    QuotationDocument, QuotationPipeline, RetryPolicy, Submission, SubmissionSource,
};
pub use quote::sheets::{InputDataSheet, SetupSheet, TrialSheet};
pub use quote::support::{SupportItem, SupportRange};
pub use quote::{transform, DeterministicQuoteEngine, QuoteEngine};
