//! The recursion/iteration ceiling shared by every part of this crate that
//! walks a potentially self-referential structure: `repeat()`'s projection
//! frontier, `descendants()`'s property-graph walk, and (via re-export)
//! `fhirpath-evaluator`'s nested-call-dispatch guard. One constant so a
//! caller can't tighten one path without the others.
pub const MAX_RECURSION_DEPTH: usize = 1000;
