//! A sound-change engine core: parsing, matching, and applying
//! phonological rewrite rules, bidirectionally, over a feature-geometry
//! substrate.
//!
//! [`parser`] turns rule text into a [`token::Rule`]; [`matcher`] and
//! [`syllable`] do the work of deciding whether a rule's context holds at a
//! position; [`applier`] drives a rule's [`applier::forward`],
//! [`applier::backward`], or [`applier::apply_gradient`] application over a
//! sequence. [`feature_system`] and [`geometry`] hold the feature inventory
//! a rule's segments are checked and modified against; [`resources`] loads
//! the tables that seed a feature system.

#![warn(missing_docs)]

pub mod applier;
pub mod element;
pub mod error;
pub mod feature_system;
pub mod geometry;
pub mod matcher;
pub mod parser;
pub mod resources;
pub mod syllable;
pub mod token;
