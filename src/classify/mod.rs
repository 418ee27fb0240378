//! Market classification module
//!
//! Turns opaque per-bet factor ids into semantic market descriptors using a
//! layered set of imperfect sources: the factor catalog, the live per-event
//! detail document, a table of well-known ids, and row-level inference.

mod catalog;
mod classifier;
mod context;
mod detail;
mod keywords;
mod types;

pub use classifier::{ClassifierConfig, MarketClassifier};
pub use detail::MainlineHints;
pub use keywords::{classify_half, classify_kind, infer_from_row, side_from_label};
pub use types::{
    BetSide, DescriptorSource, FactorId, HalfPeriod, MarketDescriptor, MarketKind,
};
