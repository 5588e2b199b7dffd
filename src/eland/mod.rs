//! ELAND alignment results.
//!
//! Six generations of per-lane output are recognized by file name alone:
//!
//! | Family | Line grammar |
//! |--------|--------------|
//! | HiSeq export, export | tab-separated; match field at column 10, mismatch descriptor at 13 |
//! | eland_result | match code at field 2, chromosome file at field 6 |
//! | eland_multi, eland_extended | `QC`/`NM`/`RM` or `n0:n1:n2` at field 2, hit list at field 3 |
//! | sequence | fastq or scarf, no alignment |
//!
//! [`discovery::eland`] finds the files, [`lane::ResultLane`] counts them on
//! demand and [`collection::ElandCollection`] holds the lot.

pub mod collection;
pub mod discovery;
pub mod format;
pub mod lane;

pub use collection::ElandCollection;
pub use discovery::{eland, extract_eland_sequence, ElandMatches};
pub use format::{detect_format, ElandFormat};
pub use lane::{ElandCounts, ElandLane, ResultKind, ResultLane, SequenceLane};
