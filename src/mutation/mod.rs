//! Mutations and how their results reach the cache

pub mod committer;

pub use committer::{
    DependentQuery, MutationCommitter, MutationOptions, MutationOutcome, MutationResult,
    UpdateRecipe,
};
