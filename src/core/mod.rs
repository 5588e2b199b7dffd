//! Core value types shared by every reader.
//!
//! - [`SampleKey`](sample_key::SampleKey): `(lane, read, sample)` identifier with wildcard matching
//! - [`MatchCodes`](counts::MatchCodes), [`MappedReads`](counts::MappedReads): alignment counters
//! - [`SummaryValue`](mean_range::SummaryValue): `mean +/- deviation` statistics
//! - [`types`]: flowcell constants and small shared enums
//!
//! ## Match codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | NM   | no match |
//! | QC   | failed quality control |
//! | RM   | repeat masked |
//! | U0/U1/U2 | unique hit with 0/1/2 mismatches |
//! | R0/R1/R2 | repeat hits with 0/1/2 mismatches |

pub mod counts;
pub mod mean_range;
pub mod sample_key;
pub mod types;
