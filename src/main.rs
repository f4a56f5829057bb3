//! rReplyTracker main entrypoint.

use rreplytracker::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
