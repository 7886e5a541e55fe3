use crate::filesystem::directory::MAX_USER;
use clap::{arg, crate_version, value_parser, Arg, ArgAction, ArgGroup, Command, ValueHint};

const LONG_HELP: &str = "dsk is invoked with exactly one subcommand.
Commands that modify an image save it back in place unless `--output` is given.
Set DSK_LOG to control logging (trace,debug,info,warn,error; default warn)
and DSK_LOGFILE to append the log to a file instead of stderr.

Examples:
---------
list files:        `dsk list game.dsk`
export a file:     `dsk export game.dsk LOADER.BIN -o loader.bin`
add a binary:      `dsk add game.dsk code.bin --binary --load 0x4000 --exec 0x4000`
blank system disk: `dsk create new.dsk --type system`";

fn image_arg() -> Arg {
    Arg::new("image")
        .value_name("IMAGE")
        .help("path to the DSK image")
        .value_hint(ValueHint::FilePath)
        .required(true)
}

fn user_arg() -> Arg {
    arg!(-u --user <USER> "AMSDOS user number, 0 to 15")
        .value_parser(value_parser!(u8).range(0..=MAX_USER as i64))
        .required(false)
        .default_value("0")
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PATH")
        .help(help)
        .value_hint(ValueHint::FilePath)
        .required(false)
}

/// Parse a number given in decimal, or in hex with a `0x`, `&` or `$` prefix
pub fn parse_number(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let parsed = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('&'))
        .or_else(|| text.strip_prefix('$'))
    {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse::<u16>()
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", text, e))
}

/// Build the `dsk` command line
pub fn build_cli() -> Command {
    Command::new("dsk")
        .about("Manages Amstrad CPC DSK images and their AMSDOS filesystem.")
        .after_long_help(LONG_HELP)
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("list")
                .about("list the files in the image")
                .arg(image_arg()),
        )
        .subcommand(
            Command::new("info")
                .about("show image and filesystem information")
                .arg(image_arg()),
        )
        .subcommand(
            Command::new("export")
                .about("copy a file out of the image")
                .arg(image_arg())
                .arg(Arg::new("file").value_name("FILE").help("file name on the disk").required(true))
                .arg(user_arg())
                .arg(output_arg("host path to write, defaults to the file name")),
        )
        .subcommand(
            Command::new("delete")
                .about("delete a file from the image")
                .arg(image_arg())
                .arg(Arg::new("file").value_name("FILE").help("file name on the disk").required(true))
                .arg(user_arg())
                .arg(output_arg("save the modified image here")),
        )
        .subcommand(
            Command::new("add")
                .about("copy a host file into the image")
                .arg(image_arg())
                .arg(
                    Arg::new("source")
                        .value_name("SOURCE")
                        .help("host file to add")
                        .value_hint(ValueHint::FilePath)
                        .required(true),
                )
                .arg(arg!(-n --name <NAME> "name on the disk, defaults to the host file name").required(false))
                .arg(user_arg())
                .arg(arg!(-b --binary "store with an AMSDOS binary header").action(ArgAction::SetTrue))
                .arg(arg!(-a --ascii "store without a header, stripping one if present").action(ArgAction::SetTrue))
                .arg(
                    arg!(--load <ADDRESS> "load address of a binary file, 0 when omitted")
                        .value_parser(parse_number)
                        .required(false)
                        .requires("binary"),
                )
                .arg(
                    arg!(--exec <ADDRESS> "execution address of a binary file, the load address when omitted")
                        .value_parser(parse_number)
                        .required(false)
                        .requires("binary"),
                )
                .group(ArgGroup::new("mode").args(["binary", "ascii"]).required(false))
                .arg(output_arg("save the modified image here")),
        )
        .subcommand(
            Command::new("write-device")
                .about("write the image onto a floppy disk")
                .arg(image_arg()),
        )
        .subcommand(
            Command::new("read-device")
                .about("read a floppy disk into a new image")
                .arg(image_arg())
                .arg(
                    arg!(-t --tracks <N> "tracks to read")
                        .value_parser(value_parser!(u8).range(1..))
                        .required(false)
                        .default_value("40"),
                )
                .arg(
                    arg!(-s --sides <N> "sides to read")
                        .value_parser(value_parser!(u8).range(1..=2))
                        .required(false)
                        .default_value("1"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("write a blank formatted image")
                .arg(image_arg())
                .arg(
                    arg!(--tracks <N> "tracks per side")
                        .value_parser(value_parser!(u8).range(1..))
                        .required(false)
                        .default_value("40"),
                )
                .arg(
                    arg!(--sides <N> "number of sides")
                        .value_parser(value_parser!(u8).range(1..=2))
                        .required(false)
                        .default_value("1"),
                )
                .arg(
                    arg!(--sectors <N> "sectors per track, defaults to the disk type's")
                        .value_parser(value_parser!(u8).range(1..=29))
                        .required(false),
                )
                .arg(
                    arg!(--"sector-size" <BYTES> "sector size")
                        .value_parser(value_parser!(u16))
                        .required(false)
                        .default_value("512"),
                )
                .arg(
                    arg!(--"track-length" <BYTES> "track length in the image, header included")
                        .value_parser(parse_number)
                        .required(false)
                        .default_value("0"),
                )
                .arg(
                    arg!(--type <TYPE> "AMSDOS disk type")
                        .value_parser(["data", "system", "ibm"])
                        .required(false)
                        .default_value("data"),
                )
                .arg(arg!(--extended "write an extended (EDSK) image").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("shell")
                .about("interactive console")
                .arg(
                    Arg::new("image")
                        .value_name("IMAGE")
                        .help("image to open at start")
                        .value_hint(ValueHint::FilePath)
                        .required(false),
                ),
        )
}
