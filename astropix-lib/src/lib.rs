#![doc = include_str!("../README.md")]

mod error;

pub mod bits;
pub mod decoder;
pub mod hit;
pub mod scanner;
pub mod tokenizer;
pub mod writer;

pub use decoder::{decode, decode_file, output_path, DecodeOpts, Decoded, Report, Summary};
pub use error::{Error, Result};
pub use hit::{HitRecord, RecordDecoder};
