#![forbid(unsafe_code)]

//! stockview demo binary entry point.

use std::process;

use stockview_demo::cli::Opts;
use stockview_demo::frame::render_screen;
use stockview_demo::session::Session;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run(opts: &Opts) -> stockview::Result<()> {
    let mut session = Session::open(opts)?;
    session.focus();
    println!("{}", render_screen(&session.view()));

    if opts.refresh {
        session.refresh();
        println!("{}", render_screen(&session.view()));
    }
    for id in &opts.taps {
        println!("-- tap {id}");
        session.tap(id);
        println!("{}", render_screen(&session.view()));
    }
    if opts.scroll != 0.0 {
        println!("-- scroll {}", opts.scroll);
        session.scroll(opts.scroll);
        println!("{}", render_screen(&session.view()));
    }

    session.close();
    Ok(())
}

fn main() {
    let opts = Opts::parse();
    init_tracing(opts.json_logs);
    if let Err(err) = run(&opts) {
        eprintln!("error: {err}");
        process::exit(1);
    }
}
