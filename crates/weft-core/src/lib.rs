//! Weft Core Types and Definitions
//!
//! This crate provides the leaf types shared by the Weft interaction graph
//! engine and its front ends. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: Basic geometric types ([`geometry`] module)
//! - **Semantic**: The closed set of sequence-diagram elements the graph
//!   understands ([`semantic`] module)

pub mod geometry;
pub mod identifier;
pub mod semantic;
