use std::path::PathBuf;

use log::LevelFilter;
use structopt::StructOpt;


/// Simulates the CartDisk adapter with a ROM file instead of a cartridge.
///
/// The ROM (and optionally a save file) is loaded into an emulated
/// cartridge. The firmware core then boots against it exactly as it would
/// against real hardware, and the resulting disk can be inspected or
/// exported.
#[derive(Debug, StructOpt)]
pub(crate) struct Args {
    #[structopt(
        parse(from_os_str),
        help = "Path to the ROM that is loaded into the emulated cartridge.",
    )]
    pub(crate) path_to_rom: PathBuf,

    #[structopt(
        long = "save",
        short = "s",
        parse(from_os_str),
        help = "Save file to load into the cartridge RAM. Without it, RAM starts zeroed.",
    )]
    pub(crate) save: Option<PathBuf>,

    #[structopt(
        long = "self-test",
        help = "Run the self-test at boot and add its results to STATUS.TXT.",
    )]
    pub(crate) self_test: bool,

    #[structopt(
        long = "log-level",
        short = "l",
        default_value = "warn",
        parse(try_from_str = parse_log_level),
        help = "Specifies which log messages to display and which to supress. The specified \
            value will show all log messages with the same level or any higher level. So \
            `-l warn` will print errors and warnings and `-l trace` will show all levels. You \
            can also disable all log messages with `-l off`. Valid values: 'off', 'error', \
            'warn', 'info', 'debug' and 'trace'. Note that `trace` messages are statically \
            disabled in release builds and cannot be reenabled by this flag.",
    )]
    pub(crate) log_level: LevelFilter,

    #[structopt(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, StructOpt)]
pub(crate) enum Command {
    /// Prints the cartridge header, the disk layout and STATUS.TXT.
    #[structopt(name = "info")]
    Info,

    /// Prints a hexdump of disk blocks.
    #[structopt(name = "dump")]
    Dump {
        #[structopt(
            long = "lba",
            parse(try_from_str = parse_number),
            help = "First block to dump. Hexadecimal with a `0x` prefix, decimal otherwise.",
        )]
        lba: u32,

        #[structopt(long = "blocks", default_value = "1", help = "Number of blocks to dump.")]
        blocks: u32,
    },

    /// Writes the whole disk into an image file that can be mounted.
    #[structopt(name = "image")]
    Image {
        #[structopt(parse(from_os_str))]
        out: PathBuf,
    },

    /// Reads the save file from the disk and writes it to a file.
    #[structopt(name = "export-save")]
    ExportSave {
        #[structopt(parse(from_os_str))]
        out: PathBuf,
    },
}

fn parse_log_level(src: &str) -> Result<LevelFilter, &'static str> {
    match src {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        _ => Err(
            "invalid log level (valid values: 'off', 'error', 'warn', 'info', 'debug' \
                and 'trace'"
        ),
    }
}

fn parse_number(src: &str) -> Result<u32, String> {
    let res = if src.starts_with("0x") || src.starts_with("0X") {
        u32::from_str_radix(&src[2..], 16)
    } else {
        src.parse()
    };

    res.map_err(|e| format!("failed to parse number '{}': {}", src, e))
}
