pub mod aggregate;
pub mod certificate;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod resolver;

pub use aggregate::{
    generate_report, AggregateStats, CategoryStats, Percentages, Report, ReportRow,
};
pub use certificate::{
    BuildInfo, CategoryOutcome, CategorySummary, CertificateError, CertificateResult,
    DeliveryCertificate, GlobalStatus,
};
pub use ingest::{method_map, parse_unittest_log, IngestError, IngestResult, MethodMap};
pub use pipeline::{build_registry, gather_inputs, run_report, ReportInputs};
pub use render::{render, render_text, RenderError, RenderResult, ReportFormat};
pub use resolver::resolve;
