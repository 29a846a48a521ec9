//! Command line for the headless driver.
//!
//! ```text
//! facet <input> [--to FORMAT] [--rotate x|y|z]... [--mirror x|y|z]...
//!       [--center] [--ground] [--scale F] [--weld] [--simplify N]
//!       [--no-compress] [--output PATH]
//! ```
//!
//! Edits are applied in the order given on the command line.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use facet_ipc::{Axis, ConversionOptions, ModelCommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "facet", version, about = "Place, convert and compare 3D models")]
struct Args {
    /// Model to load (stl, obj or glb)
    input: PathBuf,

    /// Target format (glb, stl, obj, ply, usdz)
    #[arg(long = "to", value_name = "FORMAT")]
    target: Option<String>,

    /// Rotate 90 degrees about an axis
    #[arg(long, value_name = "AXIS", value_parser = parse_axis, action = ArgAction::Append)]
    rotate: Vec<Axis>,

    /// Flip the model along an axis
    #[arg(long, value_name = "AXIS", value_parser = parse_axis, action = ArgAction::Append)]
    mirror: Vec<Axis>,

    /// Move the bounding box center to the origin
    #[arg(long, action = ArgAction::Count)]
    center: u8,

    /// Rest the model on the ground plane
    #[arg(long, action = ArgAction::Count)]
    ground: u8,

    /// Scale relative to the normalized size
    #[arg(long, value_name = "F", value_parser = parse_scale, action = ArgAction::Append)]
    scale: Vec<f32>,

    /// Merge duplicate vertices before export
    #[arg(long)]
    weld: bool,

    /// Percentage of geometry to remove (GLB output only)
    #[arg(long, value_name = "N", default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    simplify: u8,

    /// Skip quantization of GLB output
    #[arg(long)]
    no_compress: bool,

    /// Where to write the result (defaults to the download name)
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
}

fn parse_axis(value: &str) -> Result<Axis, String> {
    Axis::parse(value).ok_or_else(|| format!("expected x, y or z, got {value:?}"))
}

fn parse_scale(value: &str) -> Result<f32, String> {
    let factor: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(format!("scale must be positive, got {value}"));
    }
    Ok(factor)
}

/// Pair each occurrence of `id` with its command-line position.
fn positioned<T>(
    matches: &ArgMatches,
    id: &str,
    values: impl IntoIterator<Item = T>,
    edit: impl Fn(T) -> ModelCommand,
) -> Vec<(usize, ModelCommand)> {
    matches
        .indices_of(id)
        .map(|indices| indices.zip(values).map(|(i, v)| (i, edit(v))).collect())
        .unwrap_or_default()
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub input: PathBuf,
    pub target: Option<String>,
    pub edits: Vec<ModelCommand>,
    pub options: ConversionOptions,
    pub output: Option<PathBuf>,
}

impl CliArgs {
    /// Parse the process arguments, exiting with usage on error or `--help`.
    pub fn from_env() -> Self {
        Self::try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse arguments, including the program name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Args::command().try_get_matches_from(args)?;
        let args = Args::from_arg_matches(&matches)?;

        let mut edits = Vec::new();
        edits.extend(positioned(&matches, "rotate", args.rotate, ModelCommand::Rotate));
        edits.extend(positioned(&matches, "mirror", args.mirror, ModelCommand::Mirror));
        edits.extend(positioned(&matches, "center", 0..args.center, |_| ModelCommand::Center));
        edits.extend(positioned(&matches, "ground", 0..args.ground, |_| ModelCommand::Ground));
        edits.extend(positioned(&matches, "scale", args.scale, ModelCommand::Scale));
        edits.sort_by_key(|(index, _)| *index);

        Ok(Self {
            input: args.input,
            target: args.target,
            edits: edits.into_iter().map(|(_, edit)| edit).collect(),
            options: ConversionOptions {
                weld: args.weld,
                simplify_ratio: args.simplify,
                compress: !args.no_compress,
            },
            output: args.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("facet").chain(args.iter().copied()))
    }

    #[test]
    fn test_full_command_line() {
        let args = parse(&[
            "bunny.obj", "--to", "stl", "--rotate", "x", "--mirror", "Z", "--center", "--ground",
            "--scale", "1.5", "--weld", "--simplify", "40", "--no-compress", "-o", "out.stl",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("bunny.obj"));
        assert_eq!(args.target.as_deref(), Some("stl"));
        assert_eq!(
            args.edits,
            vec![
                ModelCommand::Rotate(Axis::X),
                ModelCommand::Mirror(Axis::Z),
                ModelCommand::Center,
                ModelCommand::Ground,
                ModelCommand::Scale(1.5),
            ]
        );
        assert!(args.options.weld);
        assert_eq!(args.options.simplify_ratio, 40);
        assert!(!args.options.compress);
        assert_eq!(args.output, Some(PathBuf::from("out.stl")));
    }

    #[test]
    fn test_interleaved_edits_keep_order() {
        let args = parse(&[
            "--mirror", "y", "--ground", "a.stl", "--rotate", "x", "--mirror", "z", "--ground",
            "--scale", "2",
        ])
        .unwrap();
        assert_eq!(
            args.edits,
            vec![
                ModelCommand::Mirror(Axis::Y),
                ModelCommand::Ground,
                ModelCommand::Rotate(Axis::X),
                ModelCommand::Mirror(Axis::Z),
                ModelCommand::Ground,
                ModelCommand::Scale(2.0),
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["model.glb"]).unwrap();
        assert!(args.edits.is_empty());
        assert_eq!(args.options, ConversionOptions::default());
        assert!(args.target.is_none());
        assert!(args.output.is_none());
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse(&[]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
        assert!(parse(&["a.stl", "--to"]).is_err());
        assert!(parse(&["a.stl", "--rotate", "w"]).is_err());
        assert!(parse(&["a.stl", "--simplify", "150"]).is_err());
        assert!(parse(&["a.stl", "--scale", "0"]).is_err());
        assert!(parse(&["a.stl", "--scale", "nan"]).is_err());
        assert_eq!(
            parse(&["a.stl", "--fast"]).unwrap_err().kind(),
            ErrorKind::UnknownArgument
        );
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }
}
