//! Variables module - the curator taxonomy (genres, subgenres, moods, eras).
//!
//! Holds the domain model, the validator, the JSON exchange codec, the store
//! contract and the manager service that ties them together.

mod memory_store;
mod variables_errors;
mod variables_model;
mod variables_service;
mod variables_traits;
mod variables_validator;

pub mod variables_codec;

#[cfg(test)]
mod variables_service_tests;

pub use memory_store::InMemoryVariableStore;
pub use variables_codec::FORMAT_VERSION;
pub use variables_errors::{Severity, VariablesError, Violation, ViolationKind};
pub use variables_model::{
    Category, CategoryListing, CategorySet, CategorySetSnapshot, DeleteOptions, DeleteOutcome,
    ImportOptions, ImportOutcome, NewVariableOption, OptionPatch, Revision, StoreMutation, VariableOption,
};
pub use variables_service::VariablesService;
pub use variables_traits::{VariableStoreTrait, VariablesServiceTrait};
pub use variables_validator::{has_blocking, validate, validate_with_references, ExternalReference};
