//! Point of entry for the ocspd application
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;

use std::sync::Arc;

use clap::Parser;
use log::{debug, error, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use ocspd::{serve, OcspResponder};

use crate::args::OcspdArgs;

/// Point of entry for the ocspd application.
#[tokio::main]
async fn main() {
    let args = OcspdArgs::parse();

    let mut logging_configured = false;
    if let Some(logging_config) = &args.logging_config {
        if let Err(e) = log4rs::init_file(logging_config, Default::default()) {
            println!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing without logging.",
                logging_config, e
            );
        } else {
            logging_configured = true;
        }
    }

    if !logging_configured {
        // if there's no config, prepare one using stdout
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{m}{n}")))
            .build();
        match Config::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        {
            Ok(config) => {
                if let Err(e) = log4rs::init_config(config) {
                    println!(
                        "ERROR: failed to configure logging for stdout with {:?}. Continuing without logging.",
                        e
                    );
                }
            }
            Err(e) => {
                println!("ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging", e);
            }
        }
    }
    debug!("ocspd start");

    // the CA and responder material are required invariants for answering any request, so a
    // failure to load them terminates the process
    let responder = match OcspResponder::new(args.to_config()) {
        Ok(responder) => Arc::new(responder),
        Err(e) => {
            error!("Failed to initialize the responder context with {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = serve(responder).await {
        error!("Server terminated with {}", e);
        std::process::exit(1);
    }
}
