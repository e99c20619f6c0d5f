#![doc = "comic-compiler-core: core pipeline library for comic-compiler."]

//! This crate contains the whole compile pipeline: deriving issue URLs from a
//! seed URL, scraping image manifests, downloading images with retries, and
//! assembling PDF and EPUB documents per issue.
//!
//! # Usage
//! Build a [`config::CompileConfig`], construct a [`download::HttpFetcher`] (or
//! any other [`contract::Fetcher`]) and call [`compile::compile_series`].

pub mod compile;
pub mod config;
pub mod contract;
pub mod download;
pub mod epub;
pub mod error;
pub mod images;
pub mod layout;
pub mod manifest;
pub mod pdf;
pub mod sequence;
