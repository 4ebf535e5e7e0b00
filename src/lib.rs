// src/lib.rs

pub mod config;
pub mod cube;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod job;
pub mod operators;
pub mod params;
pub mod poisson;
pub mod scalar_field;
pub mod vec3;
pub mod vector_field;
pub mod vector_potential;
pub mod visualisation;

pub use error::{Result, VecPotError};
pub use vector_potential::{VectorPotential, VectorPotentialSolver, vector_potential_poisson};
