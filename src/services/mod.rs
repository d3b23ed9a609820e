// src/services/mod.rs

pub mod submission;
