use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "giffs", version)]
#[command(
    about = "Mount a directory whose files are disguised behind a GIF signature",
    long_about = "Mount a directory whose files are disguised behind a GIF signature.\n\n\
                  Forward mode (default): backing files carry the signature, the mount shows plain content.\n\
                  Reverse mode (-o reverse): backing files are plain, the mount shows them as GIFs."
)]
pub struct Args {
    #[arg(value_name = "ROOT", help = "Backing directory")]
    pub root: PathBuf,

    #[arg(value_name = "MOUNTPOINT", help = "Where the view is mounted")]
    pub mountpoint: PathBuf,

    #[arg(
        short = 'o',
        long = "options",
        value_name = "OPTIONS",
        help = "Comma-separated mount options: reverse, allow_other"
    )]
    pub options: Vec<String>,
}
