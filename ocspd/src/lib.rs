#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod alg_oids;
pub mod config;
pub mod error;
pub mod index;
pub mod nonce;
pub mod responder;
pub mod transport;
pub mod util;

pub use crate::{
    alg_oids::*, config::*, error::*, index::*, nonce::*, responder::*, transport::*, util::*,
};
