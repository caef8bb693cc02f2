use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "atproto-export",
    about = "Tool to export your ATProto account",
    version
)]
pub struct Cli {
    /// Handle or DID to export
    pub handle_or_did: String,

    /// Directory to export to
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,
}
