use anyhow::Result;
use clap::{Parser, ValueEnum};

use folio::post::ProjectType;

use crate::bootstrap::bootstrap_cmd;
use crate::post::post_cmd;
use crate::validate::validate_cmd;

mod bootstrap;
mod decompress;
mod post;
mod validate;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
enum Args {
    /// Create a post document skeleton
    Post(PostArgs),
    /// Bootstrap a new site directory
    Bootstrap(BootstrapArgs),
    /// Check every stored post document
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct PostArgs {
    /// Title of the post
    #[arg(short, long)]
    title: String,

    /// One line summary shown in listings
    #[arg(short, long, default_value = "")]
    description: String,

    /// personal or professional
    #[arg(short, long, default_value = "personal")]
    project_type: ProjectType,

    /// development and/or design. Repeat for both
    #[arg(short, long)]
    category: Vec<String>,

    /// Where the document goes
    #[arg(short, long, value_enum, default_value_t = PostOutput::Stdout)]
    output: PostOutput,

    /// Data directory of the site. Required with `--output store`
    #[arg(long)]
    data_dir: Option<String>,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct BootstrapArgs {
    /// Directory where the new site will be generated
    #[arg(short, long)]
    out_dir: String,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ValidateArgs {
    /// Data directory of the site
    #[arg(short, long)]
    data_dir: String,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum PostOutput {
    /// Writes the JSON document to the stdout
    Stdout,
    /// Adds the document to the site data directory
    Store,
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args {
        Args::Post(args) => post_cmd(args),
        Args::Bootstrap(args) => bootstrap_cmd(args),
        Args::Validate(args) => validate_cmd(args),
    }
}
